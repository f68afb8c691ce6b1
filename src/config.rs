//! Runtime configuration, read from `JUKEBOX_*` environment variables

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::connection::ReconnectPolicy;
use crate::error::ConfigError;
use crate::model::RetryPolicy;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_MEDIA_EXTENSION: &str = "mp3";
pub const DEFAULT_STORAGE_PATH: &str = ".cache/jukebox.json";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_millis(3000);
const COMMAND_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub server_url: Url,
    pub api_url: Url,
    pub ws_url: Url,
    pub media_extension: String,
    pub storage_path: PathBuf,
    pub reconnect: ReconnectPolicy,
    pub command_retry: RetryPolicy,
    pub http_timeout: Duration,
    pub token: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let server_raw =
            get("JUKEBOX_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let server_url = parse_url("JUKEBOX_SERVER_URL", &server_raw)?;
        let api_url = join(&server_url, "api/", "JUKEBOX_SERVER_URL")?;

        let ws_url = match get("JUKEBOX_WS_URL") {
            Some(raw) => parse_url("JUKEBOX_WS_URL", &raw)?,
            None => push_url(&server_url)?,
        };

        let max_attempts = match get("JUKEBOX_RECONNECT_MAX_ATTEMPTS") {
            Some(raw) => Some(parse_number::<u32>("JUKEBOX_RECONNECT_MAX_ATTEMPTS", &raw)?),
            None => None,
        };
        let reconnect = match get("JUKEBOX_RECONNECT").as_deref() {
            None | Some("backoff") => {
                let policy = ReconnectPolicy::backoff();
                match max_attempts {
                    Some(0) => policy.with_max_attempts(None),
                    Some(n) => policy.with_max_attempts(Some(n)),
                    None => policy,
                }
            }
            Some("fixed") => ReconnectPolicy::fixed(RECONNECT_DELAY),
            Some(other) => {
                return Err(ConfigError::InvalidChoice {
                    var: "JUKEBOX_RECONNECT",
                    value: other.to_string(),
                })
            }
        };

        let command_retry = match get("JUKEBOX_COMMAND_RETRIES") {
            Some(raw) => {
                let retries = parse_number("JUKEBOX_COMMAND_RETRIES", &raw)?;
                RetryPolicy::new(retries, COMMAND_RETRY_DELAY)
            }
            None => RetryPolicy::disabled(),
        };

        let http_timeout = match get("JUKEBOX_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("JUKEBOX_HTTP_TIMEOUT_SECS", &raw)?),
            None => DEFAULT_HTTP_TIMEOUT,
        };

        Ok(Self {
            server_url,
            api_url,
            ws_url,
            media_extension: get("JUKEBOX_MEDIA_EXTENSION")
                .unwrap_or_else(|| DEFAULT_MEDIA_EXTENSION.to_string()),
            storage_path: get("JUKEBOX_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH)),
            reconnect,
            command_retry,
            http_timeout,
            token: get("JUKEBOX_TOKEN"),
        })
    }

    /// Base for `{base}/static/audio/...` media URLs
    pub fn media_base(&self) -> &str {
        self.server_url.as_str().trim_end_matches('/')
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|_| ConfigError::InvalidUrl {
        var,
        value: raw.to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

fn join(base: &Url, path: &str, var: &'static str) -> Result<Url, ConfigError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(path).map_err(|_| ConfigError::InvalidUrl {
        var,
        value: base.to_string(),
    })
}

/// `http(s)://host/...` becomes `ws(s)://host/.../ws`
fn push_url(server: &Url) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        var: "JUKEBOX_SERVER_URL",
        value: server.to_string(),
    };
    let scheme = match server.scheme() {
        "https" => "wss",
        "http" => "ws",
        _ => return Err(invalid()),
    };
    let mut url = join(server, "ws", "JUKEBOX_SERVER_URL")?;
    url.set_scheme(scheme).map_err(|_| invalid())?;
    Ok(url)
}
