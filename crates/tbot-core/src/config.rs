use std::{env, fs, path::Path, str::FromStr, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// What the poll loop does with the rest of a batch after routing a callback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallbackBatchPolicy {
    /// Stop after the first callback; later updates are re-fetched next cycle.
    #[default]
    StopAfterCallback,
    /// Route every update of the batch in order.
    ProcessAll,
}

impl FromStr for CallbackBatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "stop-after-callback" | "stop" => Ok(Self::StopAfterCallback),
            "process-all" | "all" => Ok(Self::ProcessAll),
            other => Err(Error::Config(format!(
                "unknown CALLBACK_BATCH_POLICY: {other} \
                 (expected stop-after-callback or process-all)"
            ))),
        }
    }
}

/// Typed configuration for a bot instance.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub api_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub callback_batch_policy: CallbackBatchPolicy,
    /// Call `deleteWebhook(drop_pending_updates=true)` before polling starts.
    pub drop_pending_updates: bool,
}

impl Config {
    /// Defaults for everything but the token.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            callback_batch_policy: CallbackBatchPolicy::default(),
            drop_pending_updates: false,
        }
    }

    /// Load from the process environment, reading `.env` first if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let mut cfg = Self::new(bot_token.trim());

        if let Some(url) = lookup("TELEGRAM_API_URL").and_then(non_empty) {
            cfg.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(ms) = parse_u64(&lookup, "POLL_INTERVAL_MS")? {
            cfg.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_u64(&lookup, "REQUEST_TIMEOUT_SECS")? {
            cfg.request_timeout = Duration::from_secs(secs);
        }
        if let Some(policy) = lookup("CALLBACK_BATCH_POLICY").and_then(non_empty) {
            cfg.callback_batch_policy = policy.parse()?;
        }
        if let Some(v) = lookup("DROP_PENDING_UPDATES") {
            cfg.drop_pending_updates = parse_bool(&v);
        }

        Ok(cfg)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
