use std::collections::HashMap;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use calldesk::api::BackendClient;
use calldesk::chat::ChatSession;
use calldesk::cli::{Cli, Commands};
use calldesk::config;
use calldesk::console;
use calldesk::models::chat::{AssistantReply, Question, ResponseType};
use calldesk::models::dashboard::TaskFilter;
use calldesk::models::hitl::TaskId;
use calldesk::notification::terminal::describe_call;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.global.log_json);

    let mut cfg = config::load_with(args.global.transport)?;
    args.global.apply(&mut cfg);
    let backend = BackendClient::new(&cfg);

    let result = match args.command.unwrap_or(Commands::Watch) {
        Commands::Watch => console::run(&cfg).await,
        Commands::Pending => handle_pending(&backend).await,
        Commands::Respond { task_id, text } => {
            let task_id = TaskId::from(task_id.as_str());
            let ack = backend.submit_response(&task_id, &text).await?;
            println!(
                "{}",
                ack.message.unwrap_or_else(|| "Response sent! Call continuing...".into())
            );
            Ok(())
        }
        Commands::Users => {
            for user in backend.users().await? {
                println!("{:>5}  {}", user.id, user.username);
            }
            Ok(())
        }
        Commands::Tasks {
            user_id,
            page,
            status,
            phone,
            name,
        } => {
            let filter = TaskFilter {
                user_id,
                page,
                status,
                phone,
                name,
            };
            handle_tasks(&backend, &filter).await
        }
        Commands::Calls { task_id } => {
            let calls = backend.task_calls(task_id).await?;
            if calls.is_empty() {
                println!("No call attempts for task {}", task_id);
            }
            for call in calls {
                println!(
                    "#{:<3} {:<12} {}  {}s  {}",
                    call.attempt_number,
                    call.status,
                    call.created_at.as_utc().format("%Y-%m-%d %H:%M"),
                    call.duration_seconds.unwrap_or(0),
                    call.call_conclusion
                        .or(call.hangup_cause)
                        .unwrap_or_default()
                );
            }
            Ok(())
        }
        Commands::DeleteTask { task_id } => {
            backend.delete_task(task_id).await?;
            println!("Task {} deleted", task_id);
            Ok(())
        }
        Commands::ClearDatabase { confirm } => {
            let result = backend.clear_database(&confirm).await?;
            println!(
                "{}",
                result
                    .message
                    .unwrap_or_else(|| "Database cleared".into())
            );
            if let Some(backup) = result.backup_created {
                println!("Backup: {}", backup);
            }
            Ok(())
        }
        Commands::Chat => handle_chat(backend).await,
        Commands::ExecuteCampaign { plan } => {
            let raw = std::fs::read_to_string(&plan)
                .with_context(|| format!("failed to read {}", plan.display()))?;
            let plan: serde_json::Value =
                serde_json::from_str(&raw).context("campaign plan is not valid JSON")?;
            let result = backend.execute_campaign(&plan).await?;
            println!(
                "{}",
                result
                    .message
                    .unwrap_or_else(|| "Campaign scheduled".into())
            );
            Ok(())
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("calldesk=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn handle_pending(backend: &BackendClient) -> anyhow::Result<()> {
    let requests = backend.pending_requests().await?;
    if requests.is_empty() {
        println!("No pending requests.");
    }
    for r in requests {
        println!(
            "#{} {} | {} | {}s budget",
            r.task_id,
            describe_call(&r.call_info),
            r.question,
            r.timeout_seconds
        );
    }
    Ok(())
}

async fn handle_tasks(backend: &BackendClient, filter: &TaskFilter) -> anyhow::Result<()> {
    let page = backend.tasks(filter).await?;
    if page.tasks.is_empty() {
        println!("No tasks found");
    }
    for task in &page.tasks {
        println!(
            "{:>5}  {:<20} {:<16} {:<22} {:>3}%  {}",
            task.id,
            task.person_name,
            task.phone_number,
            task.status_label(),
            task.attempts_percent(),
            task.created_at.as_utc().format("%Y-%m-%d %H:%M")
        );
    }
    if let Some(p) = page.pagination {
        println!(
            "page {}/{} ({} tasks){}{}",
            p.page,
            p.total_pages.max(1),
            p.total_count,
            if p.has_prev() { "  --page for previous" } else { "" },
            if p.has_next() { "  more available" } else { "" },
        );
    }
    Ok(())
}

/// Interactive campaign planning. `/confirm` schedules the finished plan,
/// `/reset` starts over, `/quit` exits.
async fn handle_chat(backend: BackendClient) -> anyhow::Result<()> {
    let mut session = ChatSession::new(backend);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Describe the campaign you want to run. /confirm, /reset, /quit");

    while let Some(line) = lines.next_line().await? {
        let reply = match line.trim() {
            "/quit" | "/q" => break,
            "/reset" => {
                session.reset();
                println!("Conversation cleared.");
                continue;
            }
            "/confirm" => {
                match session.execute_plan().await {
                    Ok(result) => println!(
                        "{}",
                        result
                            .message
                            .unwrap_or_else(|| "Campaign scheduled successfully!".into())
                    ),
                    Err(e) => println!("{}", e.banner_text()),
                }
                continue;
            }
            _ => session.send(&line).await,
        };

        let mut reply = match reply {
            Ok(Some(reply)) => reply,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e.banner_text());
                continue;
            }
        };

        // Keep asking follow-up questions until the assistant is satisfied.
        while let AssistantReply::NeedsMoreInfo { questions } = &reply {
            println!("{}", reply.display_text());
            let Some(answers) = ask_questions(questions, &mut lines).await? else {
                return Ok(());
            };
            reply = match session.answer_questions(&answers).await {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(e) => {
                    println!("{}", e.banner_text());
                    break;
                }
            };
        }
        if !matches!(reply, AssistantReply::NeedsMoreInfo { .. }) {
            println!("{}", reply.display_text());
        }
        if session.plan().is_some() {
            println!("Type /confirm to schedule this campaign.");
        }
    }
    Ok(())
}

/// Prompt for each question on stdin. `None` when input ends.
async fn ask_questions(
    questions: &[Question],
    lines: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<Option<HashMap<String, String>>> {
    let mut answers = HashMap::new();
    for q in questions {
        println!("{}", q.question_text);
        if let (ResponseType::Select, Some(options)) = (q.response_type, q.options.as_ref()) {
            for (i, opt) in options.iter().enumerate() {
                println!("  {}) {}", i + 1, opt.label);
            }
        }
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        let value = match (q.response_type, q.options.as_ref()) {
            (ResponseType::Select, Some(options)) => line
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| options.get(i))
                .map(|o| o.value.clone())
                .unwrap_or_else(|| line.trim().to_string()),
            _ => line.trim().to_string(),
        };
        answers.insert(q.field_name.clone(), value);
    }
    Ok(Some(answers))
}
