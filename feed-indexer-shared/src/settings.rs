//! Helpers for reading settings from environment-style lookups.

use std::str::FromStr;

use thiserror::Error;

/// A setting that is present but cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidSetting(pub String);

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(InvalidSetting(format!("unknown log format '{}'", other))),
        }
    }
}

/// Parse `key` through `lookup`, falling back to `default` when it is unset.
pub fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, InvalidSetting>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| InvalidSetting(format!("invalid {}='{}': {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(key: &str) -> Option<String> {
        match key {
            "BATCH" => Some(" 25 ".to_string()),
            "FORMAT" => Some("JSON".to_string()),
            "BROKEN" => Some("many".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(parse_var(&lookup, "BATCH", 500usize), Ok(25));
        assert_eq!(parse_var(&lookup, "UNSET", 500usize), Ok(500));
        assert_eq!(parse_var(&lookup, "FORMAT", LogFormat::Pretty), Ok(LogFormat::Json));

        let err = parse_var(&lookup, "BROKEN", 1u32).unwrap_err();
        assert!(err.0.starts_with("invalid BROKEN='many'"));
    }

    #[test]
    fn test_log_format() {
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!(" text".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
