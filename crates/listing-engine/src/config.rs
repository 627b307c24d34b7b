use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const API_KEY_VARS: &[&str] = &["API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(90),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        Self {
            api_key: API_KEY_VARS.iter().find_map(|key| non_empty(key)),
            api_base: non_empty("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            model: non_empty("LISTING_MODEL").unwrap_or(defaults.model),
            request_timeout: non_empty("LISTING_REQUEST_TIMEOUT")
                .and_then(|value| value.parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .map(|value| Duration::from_secs_f64(value.clamp(5.0, 300.0)))
                .unwrap_or(defaults.request_timeout),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model.filter(|value| !value.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
        self
    }
}

/// Reads a `.env` file into a map. A missing or unreadable file yields an empty map.
pub fn parse_dotenv(path: &Path) -> HashMap<String, String> {
    fs::read_to_string(path)
        .map(|content| content.lines().filter_map(dotenv_entry).collect())
        .unwrap_or_default()
}

/// `KEY=value`, optionally prefixed with `export` and with the value in matching quotes.
fn dotenv_entry(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").map_or(line, str::trim_start);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(value)
}
