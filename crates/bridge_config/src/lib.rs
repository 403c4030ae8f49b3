//! Process-wide settings read once from the environment.

use lazy_static::lazy_static;
use std::net::SocketAddr;

pub const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_BODY_BYTES: usize = 1_048_576;

lazy_static! {
    /// Serve through the serverless runtime instead of an HTTP listener.
    pub static ref LAMBDA: bool = flag(std::env::var("LAMBDA").ok().as_deref());
    pub static ref BIND_HOST: String =
        std::env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    pub static ref MAX_BODY_BYTES: usize =
        parse_or(std::env::var("MAX_BODY_BYTES").ok().as_deref(), DEFAULT_MAX_BODY_BYTES);
    /// Prometheus scrape listener; disabled when unset.
    pub static ref METRICS_ADDR: Option<SocketAddr> =
        std::env::var("METRICS_ADDR").ok().and_then(|v| v.parse().ok());
}

/// Any non-empty value switches a flag on.
pub fn flag(raw: Option<&str>) -> bool {
    raw.map(|v| !v.is_empty()).unwrap_or(false)
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_set_by_any_non_empty_value() {
        assert!(flag(Some("1")));
        assert!(flag(Some("false")));
        assert!(!flag(Some("")));
        assert!(!flag(None));
    }

    #[test]
    fn parse_or_falls_back() {
        assert_eq!(parse_or(Some(" 2048 "), 1usize), 2048);
        assert_eq!(parse_or(Some("lots"), 1usize), 1);
        assert_eq!(parse_or::<usize>(None, 7), 7);
    }
}
