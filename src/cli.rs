use clap::{Args, Parser, Subcommand};

use crate::config::{Config, TransportKind};

/// calldesk: operator console for calls that need a human answer
#[derive(Parser)]
#[command(name = "calldesk", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Backend origin (overrides CALLDESK_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Operator identity (overrides CALLDESK_USERNAME)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// How HITL requests are received (overrides CALLDESK_TRANSPORT)
    #[arg(long, value_enum, global = true)]
    pub transport: Option<TransportKind>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "CALLDESK_LOG_JSON")]
    pub log_json: bool,
}

impl GlobalArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(name) = self.username.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            config.username = name.to_string();
        }
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch for HITL requests and answer them interactively (default)
    Watch,

    /// List HITL requests currently waiting for this operator
    Pending,

    /// Answer a HITL request once and exit
    Respond {
        #[arg(long)]
        task_id: String,
        /// The answer read back to the caller
        text: String,
    },

    /// List users known to the backend
    Users,

    /// List tasks for a user
    Tasks {
        #[arg(long)]
        user_id: i64,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// Show call attempts for a task
    Calls {
        #[arg(long)]
        task_id: i64,
    },

    /// Delete a task
    DeleteTask {
        #[arg(long)]
        task_id: i64,
    },

    /// Delete every task on the backend (a backup is taken first)
    ClearDatabase {
        /// Must be exactly CONFIRM
        #[arg(long)]
        confirm: String,
    },

    /// Plan a campaign with the assistant
    Chat,

    /// Schedule a campaign plan stored as JSON
    ExecuteCampaign {
        /// Path to the plan file
        #[arg(long)]
        plan: std::path::PathBuf,
    },
}
