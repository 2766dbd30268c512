//! Load strategies and fallback policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a mediator combines the local cache with the remote service.
///
/// Fixed when the mediator is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Serve only what the repository already holds. Never contacts the service.
    LocalOnly,
    /// Always fetch from the service and persist the result.
    RemoteOnly,
    /// Reuse the cache when a sync check says it is current, fetch otherwise.
    #[default]
    Hybrid,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LocalOnly => "local_only",
            Self::RemoteOnly => "remote_only",
            Self::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

impl FromStr for LoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "local_only" | "localonly" | "local" => Ok(Self::LocalOnly),
            "remote_only" | "remoteonly" | "remote" => Ok(Self::RemoteOnly),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown load mode '{}'", other)),
        }
    }
}

/// What a hybrid load does when the sync check reported a newer revision but
/// the fetch that followed came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleFallback {
    /// Keep serving the cached configuration and report success.
    #[default]
    UseCache,
    /// Report the key as not found. The cache is left in place.
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_hybrid() {
        assert_eq!(LoadMode::default(), LoadMode::Hybrid);
        assert_eq!(StaleFallback::default(), StaleFallback::UseCache);
    }

    #[test]
    fn test_parse_accepts_common_spellings() {
        assert_eq!("local_only".parse::<LoadMode>(), Ok(LoadMode::LocalOnly));
        assert_eq!("Remote-Only".parse::<LoadMode>(), Ok(LoadMode::RemoteOnly));
        assert_eq!("localOnly".parse::<LoadMode>(), Ok(LoadMode::LocalOnly));
        assert_eq!("HYBRID".parse::<LoadMode>(), Ok(LoadMode::Hybrid));
        assert!("eventual".parse::<LoadMode>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for mode in [LoadMode::LocalOnly, LoadMode::RemoteOnly, LoadMode::Hybrid] {
            assert_eq!(mode.to_string().parse::<LoadMode>(), Ok(mode));
        }
    }
}
