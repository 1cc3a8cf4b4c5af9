use std::str::FromStr;
use std::time::Duration;

use crate::errors::ClientError;

/// How HITL requests reach the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TransportKind {
    /// Persistent WebSocket at `/ws/hitl/<username>`.
    Push,
    /// Short-interval `GET /api/pending_hitl_requests`.
    Poll,
}

impl FromStr for TransportKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" | "ws" | "websocket" => Ok(TransportKind::Push),
            "poll" | "polling" => Ok(TransportKind::Poll),
            other => Err(ClientError::InvalidConfig(format!(
                "unknown transport '{}' (expected push or poll)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ClientError::InvalidConfig(format!(
                "unknown theme '{}' (expected light or dark)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin, e.g. `http://127.0.0.1:8000`. HTTP and WebSocket
    /// URLs are both derived from it.
    pub base_url: String,
    pub username: String,
    pub transport: TransportKind,
    /// Set via CALLDESK_POLL_INTERVAL_MS. Default: 2000.
    pub poll_interval_ms: u64,
    /// Fixed delay before reopening a closed push channel.
    /// Set via CALLDESK_RECONNECT_DELAY_MS. Default: 3000.
    pub reconnect_delay_ms: u64,
    /// Non-urgent banners disappear after this many seconds.
    pub banner_ttl_secs: u64,
    /// How long a resolved task id is remembered so that late signals
    /// cannot bring its prompt back.
    pub resolved_retention_secs: u64,
    pub http_timeout_secs: u64,
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            username: "APPU".into(),
            transport: TransportKind::Push,
            poll_interval_ms: 2000,
            reconnect_delay_ms: 3000,
            banner_ttl_secs: 5,
            resolved_retention_secs: 300,
            http_timeout_secs: 10,
            theme: Theme::Light,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn banner_ttl(&self) -> Duration {
        Duration::from_secs(self.banner_ttl_secs)
    }

    pub fn resolved_retention(&self) -> Duration {
        Duration::from_secs(self.resolved_retention_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// Backend origin without a trailing slash.
    pub fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

pub fn load() -> anyhow::Result<Config> {
    load_with(None)
}

/// Load configuration from `.env` and the environment. An explicit
/// `transport` wins over CALLDESK_TRANSPORT, which is then not parsed.
pub fn load_with(transport: Option<TransportKind>) -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok(), transport)
}

fn from_lookup(
    var: impl Fn(&str) -> Option<String>,
    transport: Option<TransportKind>,
) -> anyhow::Result<Config> {
    let defaults = Config::default();

    let transport = match (transport, var("CALLDESK_TRANSPORT")) {
        (Some(explicit), _) => explicit,
        (None, Some(v)) => v.parse()?,
        (None, None) => defaults.transport,
    };
    let theme = match var("CALLDESK_THEME") {
        Some(v) => v.parse()?,
        None => defaults.theme,
    };

    let username = var("CALLDESK_USERNAME")
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or(defaults.username);
    let number = |key: &str, default: u64| {
        var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    };

    Ok(Config {
        base_url: var("CALLDESK_BASE_URL").unwrap_or(defaults.base_url),
        username,
        transport,
        poll_interval_ms: number("CALLDESK_POLL_INTERVAL_MS", defaults.poll_interval_ms),
        reconnect_delay_ms: number("CALLDESK_RECONNECT_DELAY_MS", defaults.reconnect_delay_ms),
        banner_ttl_secs: number("CALLDESK_BANNER_TTL_SECS", defaults.banner_ttl_secs),
        resolved_retention_secs: number(
            "CALLDESK_RESOLVED_RETENTION_SECS",
            defaults.resolved_retention_secs,
        ),
        http_timeout_secs: number("CALLDESK_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
        theme,
    })
}
