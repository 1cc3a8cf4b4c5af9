//! Interactive operator console for `calldesk watch`.
//!
//! Reads commands from stdin while the HITL client runs:
//!
//! ```text
//! <text>                  answer the request shown modally
//! /answer <task> <text>   answer a specific request
//! /dismiss <task>         "I'll call back": end the call and reschedule
//! /close <banner>         close a banner
//! /list                   show every pending request
//! /quit                   stop and exit
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::config::Config;
use crate::hitl::{HitlClient, HitlHandle};
use crate::models::hitl::TaskId;
use crate::notification::terminal::describe_call;
use crate::notification::TerminalPresenter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// `task_id: None` targets the modal request.
    Answer { task_id: Option<TaskId>, text: String },
    Dismiss(TaskId),
    CloseBanner(u64),
    List,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  <text>                  answer the current request
  /answer <task> <text>   answer a specific request
  /dismiss <task>         dismiss a request (call ends and is rescheduled)
  /close <banner>         close a banner by its #id
  /list                   list pending requests
  /quit                   exit";

pub fn parse(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Ok(ConsoleCommand::Answer {
            task_id: None,
            text: line.to_string(),
        });
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    match name {
        "answer" | "a" => {
            let (task, text) = args
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: /answer <task> <text>".to_string())?;
            Ok(ConsoleCommand::Answer {
                task_id: Some(TaskId::from(task)),
                text: text.to_string(),
            })
        }
        "dismiss" | "d" if !args.is_empty() => Ok(ConsoleCommand::Dismiss(TaskId::from(args))),
        "dismiss" | "d" => Err("usage: /dismiss <task>".to_string()),
        "close" | "c" => args
            .trim_start_matches('#')
            .parse()
            .map(ConsoleCommand::CloseBanner)
            .map_err(|_| "usage: /close <banner>".to_string()),
        "list" | "l" => Ok(ConsoleCommand::List),
        "help" | "h" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "q" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command /{} (try /help)", other)),
    }
}

/// Run the client until `/quit`, end of input, or Ctrl-C.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let presenter = Arc::new(TerminalPresenter::new(config.theme));
    let mut client =
        HitlClient::from_config(config, presenter).context("failed to set up hitl client")?;
    let handle = client.start();

    println!(
        "Watching HITL requests for {} via {:?}. Type /help for commands.",
        config.username, config.transport
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => execute(&handle, command).await?,
            Err(usage) => println!("{}", usage),
        }
    }

    info!("operator console exiting");
    client.stop().await;
    Ok(())
}

async fn execute(handle: &HitlHandle, command: ConsoleCommand) -> anyhow::Result<()> {
    match command {
        ConsoleCommand::Answer { task_id: None, text } => {
            if handle.modal().is_none() {
                if !text.trim().is_empty() {
                    println!("No pending requests.");
                }
                return Ok(());
            }
            handle.answer_modal(text).await?;
        }
        ConsoleCommand::Answer {
            task_id: Some(task_id),
            text,
        } => handle.submit(task_id, text).await?,
        ConsoleCommand::Dismiss(task_id) => handle.dismiss(task_id).await?,
        ConsoleCommand::CloseBanner(id) => handle.close_banner(id).await?,
        ConsoleCommand::List => {
            let pending = handle.pending();
            if pending.is_empty() {
                println!("No pending requests.");
            }
            for p in pending {
                println!(
                    "{} #{} {} | {} | {}s left",
                    if p.modal { "*" } else { " " },
                    p.task_id,
                    describe_call(&p.call_info),
                    p.question,
                    p.remaining
                );
            }
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_text_answers_modal() {
        assert_eq!(
            parse("Tuesday at 3pm works\n").unwrap(),
            ConsoleCommand::Answer {
                task_id: None,
                text: "Tuesday at 3pm works".into()
            }
        );
    }

    #[test]
    fn test_answer_specific_task() {
        assert_eq!(
            parse("/answer 7 yes, go ahead").unwrap(),
            ConsoleCommand::Answer {
                task_id: Some(TaskId::Num(7)),
                text: "yes, go ahead".into()
            }
        );
        assert!(parse("/answer 7").is_err());
    }

    #[test]
    fn test_dismiss_and_misc() {
        assert_eq!(
            parse("/dismiss 12").unwrap(),
            ConsoleCommand::Dismiss(TaskId::Num(12))
        );
        assert!(parse("/dismiss").is_err());
        assert_eq!(parse("/list").unwrap(), ConsoleCommand::List);
        assert_eq!(parse("/q").unwrap(), ConsoleCommand::Quit);
        assert!(parse("/frobnicate").is_err());
    }

    #[test]
    fn test_close_banner() {
        assert_eq!(parse("/close 3").unwrap(), ConsoleCommand::CloseBanner(3));
        assert_eq!(parse("/c #12").unwrap(), ConsoleCommand::CloseBanner(12));
        assert!(parse("/close").is_err());
        assert!(parse("/close banner").is_err());
    }
}
