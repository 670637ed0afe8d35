use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration for the mini app client.
#[derive(Clone, Debug)]
pub struct Config {
    // Remote data service
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub request_timeout: Duration,
    pub realtime_heartbeat: Duration,

    // Telegram launch context
    pub telegram_bot_token: Option<String>,
    pub telegram_init_data: Option<String>,

    // App
    pub app_url: Option<String>,
    pub page_size: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let supabase_url = env_str("SUPABASE_URL")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("SUPABASE_URL environment variable is required".to_string())
            })?
            .trim_end_matches('/')
            .to_string();
        let supabase_anon_key = env_str("SUPABASE_ANON_KEY").and_then(non_empty).ok_or_else(
            || Error::Config("SUPABASE_ANON_KEY environment variable is required".to_string()),
        )?;

        // With a bot token present the launch payload signature is verified;
        // without one the payload is trusted as-is.
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").and_then(non_empty);
        let telegram_init_data = env_str("TELEGRAM_INIT_DATA").and_then(non_empty);

        let app_url = env_str("APP_URL").and_then(non_empty);
        let page_size = env_usize("PAGE_SIZE").unwrap_or(20);
        let request_timeout = Duration::from_millis(env_u64("REQUEST_TIMEOUT_MS").unwrap_or(10_000));
        let realtime_heartbeat =
            Duration::from_millis(env_u64("REALTIME_HEARTBEAT_MS").unwrap_or(30_000));

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            request_timeout,
            realtime_heartbeat,
            telegram_bot_token,
            telegram_init_data,
            app_url,
            page_size,
        })
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

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
