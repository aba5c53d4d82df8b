//! Harness configuration
//!
//! Every behaviour switch is an explicit field assembled once at
//! construction; nothing in the harness reads the environment mid-logic, so
//! two runs with equal configurations behave identically.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::clock::Timeouts;
use crate::error::{Error, Result};

/// Which engine's model set the run exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineVariant {
    /// Only models served by the native engine
    Native,
    /// Native-engine models plus the legacy runner set
    #[default]
    All,
}

impl FromStr for EngineVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "all" => Ok(Self::All),
            other => Err(Error::Config(format!(
                "unknown engine variant {other:?}, expected \"native\" or \"all\""
            ))),
        }
    }
}

/// Harness configuration, injected at construction
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Serving endpoint base URL
    pub endpoint: String,
    /// Model set selector
    pub engine: EngineVariant,
    /// Capacity budget in bytes; `None` or zero means unconstrained
    pub capacity_budget: Option<u64>,
    /// Soft-deadline override
    pub soft_timeout: Option<Duration>,
    /// Hard-deadline override
    pub hard_timeout: Option<Duration>,
    /// Per-call budget for a generation request
    pub generate_timeout: Duration,
    /// Inactivity budget between generation fragments
    pub idle_timeout: Duration,
    /// Reference-vector fixture path
    pub fixture_path: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434".to_string(),
            engine: EngineVariant::default(),
            capacity_budget: None,
            soft_timeout: None,
            hard_timeout: None,
            generate_timeout: Duration::from_secs(120),
            idle_timeout: Duration::from_secs(30),
            fixture_path: PathBuf::from("testdata/embeddings.json"),
        }
    }
}

impl HarnessConfig {
    /// Resolve the run-level deadlines, validating their ordering
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the overrides are misordered.
    pub fn timeouts(&self) -> Result<Timeouts> {
        Timeouts::resolve(self.soft_timeout, self.hard_timeout)
    }

    /// The effective capacity budget; a zero budget means unknown capacity
    #[must_use]
    pub fn effective_budget(&self) -> Option<u64> {
        self.capacity_budget.filter(|&bytes| bytes > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_variant_parse() {
        assert_eq!(
            "native".parse::<EngineVariant>().expect("parses"),
            EngineVariant::Native
        );
        assert_eq!(
            "ALL".parse::<EngineVariant>().expect("parses"),
            EngineVariant::All
        );
        assert!("llama".parse::<EngineVariant>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.engine, EngineVariant::All);
        assert!(config.capacity_budget.is_none());
        assert_eq!(config.generate_timeout, Duration::from_secs(120));
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_effective_budget_zero_is_unconstrained() {
        let config = HarnessConfig {
            capacity_budget: Some(0),
            ..Default::default()
        };
        assert!(config.effective_budget().is_none());

        let config = HarnessConfig {
            capacity_budget: Some(8 << 30),
            ..Default::default()
        };
        assert_eq!(config.effective_budget(), Some(8 << 30));
    }

    #[test]
    fn test_timeouts_validated_through_config() {
        let config = HarnessConfig {
            soft_timeout: Some(Duration::from_secs(900)),
            hard_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        };
        assert!(config.timeouts().is_err());
    }
}
