//! GPU sharing strategy configuration.

use std::collections::BTreeSet;
use std::fmt;

use error_stack::Report;
use serde::Deserialize;
use serde::Deserializer;

use crate::error::TimeSharingError;
use crate::error::TimeSharingResult;

/// Strategy token enabling time-sharing of physical GPUs.
pub const TIME_SHARING_STRATEGY: &str = "time-sharing";

/// Returns true when the comma separated strategy list contains `time-sharing`.
///
/// Tokens are trimmed before comparison. An empty or malformed list yields false.
pub fn has_time_sharing_strategy(gpu_sharing_strategy: &str) -> bool {
    gpu_sharing_strategy
        .split(',')
        .any(|strategy| strategy.trim() == TIME_SHARING_STRATEGY)
}

/// Unordered set of sharing strategy tokens, e.g. parsed from `mig,time-sharing`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharingStrategySet(BTreeSet<String>);

impl SharingStrategySet {
    pub fn parse(gpu_sharing_strategy: &str) -> Self {
        Self(
            gpu_sharing_strategy
                .split(',')
                .map(str::trim)
                .filter(|strategy| !strategy.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        )
    }

    pub fn contains(&self, strategy: &str) -> bool {
        self.0.contains(strategy)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for SharingStrategySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.iter().collect::<Vec<_>>().join(",");
        f.write_str(&joined)
    }
}

/// GPU sharing configuration of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharingConfig {
    strategies: SharingStrategySet,
    time_sharing: bool,
    max_shared_clients_per_gpu: u32,
}

impl SharingConfig {
    /// Build a sharing config from a comma separated strategy list, rejecting
    /// time-sharing without any shared clients.
    pub fn new(
        gpu_sharing_strategy: &str,
        max_shared_clients_per_gpu: u32,
    ) -> TimeSharingResult<Self> {
        let time_sharing = has_time_sharing_strategy(gpu_sharing_strategy);
        if time_sharing && max_shared_clients_per_gpu == 0 {
            return Err(Report::new(TimeSharingError::invalid_config(
                "max shared clients per GPU must be at least 1 when time-sharing is enabled",
            )));
        }

        Ok(Self {
            strategies: SharingStrategySet::parse(gpu_sharing_strategy),
            time_sharing,
            max_shared_clients_per_gpu,
        })
    }

    pub fn strategies(&self) -> &SharingStrategySet {
        &self.strategies
    }

    pub fn time_sharing_enabled(&self) -> bool {
        self.time_sharing
    }

    pub fn max_shared_clients_per_gpu(&self) -> u32 {
        self.max_shared_clients_per_gpu
    }
}

/// On-disk shape of [`SharingConfig`], e.g. a node config YAML section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSharingConfig {
    #[serde(default)]
    gpu_sharing_strategy: String,
    #[serde(default = "default_max_shared_clients")]
    max_shared_clients_per_gpu: u32,
}

fn default_max_shared_clients() -> u32 {
    1
}

impl<'de> Deserialize<'de> for SharingConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawSharingConfig::deserialize(deserializer)?;
        Self::new(&raw.gpu_sharing_strategy, raw.max_shared_clients_per_gpu)
            .map_err(|report| serde::de::Error::custom(report.current_context()))
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn detects_time_sharing_among_other_strategies() {
        assert!(has_time_sharing_strategy("mig,time-sharing"));
        assert!(has_time_sharing_strategy(" time-sharing , mps"));
        assert!(has_time_sharing_strategy("time-sharing"));
    }

    #[test]
    fn missing_time_sharing_is_false() {
        assert!(!has_time_sharing_strategy("mig,mps"));
        assert!(!has_time_sharing_strategy(""));
        assert!(!has_time_sharing_strategy(",,"));
        assert!(!has_time_sharing_strategy("time-sharing-v2"));
        assert!(!has_time_sharing_strategy("mig;time-sharing"));
    }

    #[test]
    fn strategy_set_ignores_order_and_duplicates() {
        let a = SharingStrategySet::parse("time-sharing,mig,mig");
        let b = SharingStrategySet::parse(" mig , time-sharing ");

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "mig,time-sharing".to_string());
        assert!(a.contains(TIME_SHARING_STRATEGY));
        assert!(SharingStrategySet::parse(" , ").is_empty());
    }

    #[test]
    fn time_sharing_requires_shared_clients() {
        let err = SharingConfig::new("time-sharing", 0)
            .expect_err("zero clients should be rejected");
        assert!(matches!(
            err.current_context(),
            TimeSharingError::InvalidConfiguration { .. }
        ));

        let config = SharingConfig::new("mig", 0)
            .expect("zero clients is fine without time-sharing");
        assert!(!config.time_sharing_enabled());
    }

    #[test]
    fn config_follows_strategy_list() {
        for strategy in ["mig,time-sharing", "mig,mps", "", " time-sharing ", "time-sharing-v2"] {
            let config = SharingConfig::new(strategy, 2).unwrap();
            assert_eq!(
                config.time_sharing_enabled(),
                has_time_sharing_strategy(strategy)
            );
        }
    }

    #[test]
    fn deserialize_sharing_config() {
        let yaml = r#"
gpuSharingStrategy: "mig, time-sharing"
maxSharedClientsPerGpu: 4
"#;
        let config: SharingConfig = serde_yaml::from_str(yaml).expect("valid config");
        assert!(config.time_sharing_enabled());
        assert_eq!(config.max_shared_clients_per_gpu(), 4);

        let defaults: SharingConfig = serde_yaml::from_str("{}").expect("defaults");
        assert!(defaults.strategies().is_empty());
        assert_eq!(defaults.max_shared_clients_per_gpu(), 1);

        let invalid = serde_yaml::from_str::<SharingConfig>(
            "gpuSharingStrategy: time-sharing\nmaxSharedClientsPerGpu: 0\n",
        );
        assert!(invalid.is_err());
    }
}
