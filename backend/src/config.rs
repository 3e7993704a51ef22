use std::{fmt::Display, str::FromStr};

use tracing::{info, warn};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const DEFAULT_MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_HASH_ITERATIONS: u32 = 260_000;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub page_size: i64,
    pub max_page_size: i64,
    pub hash_iterations: u32,
    pub allowed_origin: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.into(),
        }
    }
}

impl AppConfig {
    /// Builds the config from any key lookup, such as the Shuttle secret store.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let max_page_size = try_load(&lookup, "POLLS_MAX_PAGE_SIZE", defaults.max_page_size).max(1);

        Self {
            page_size: try_load(&lookup, "POLLS_PAGE_SIZE", defaults.page_size).clamp(1, max_page_size),
            max_page_size,
            hash_iterations: try_load(&lookup, "PASSWORD_HASH_ITERATIONS", defaults.hash_iterations).max(1),
            allowed_origin: lookup("CORS_ALLOWED_ORIGIN").unwrap_or_else(|| {
                info!("CORS_ALLOWED_ORIGIN not set, using default: {}", defaults.allowed_origin);
                defaults.allowed_origin
            }),
        }
    }
}

fn try_load<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}
