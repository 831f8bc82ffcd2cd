//! MIG device manager capability.
//!
//! Partitioning itself happens elsewhere; admission only needs to know whether a
//! manager is active, how many partitions it serves and which GPU backs each one.

use std::collections::BTreeMap;

use error_stack::Report;
use serde::Deserialize;

use crate::device_id::DeviceId;
use crate::error::TimeSharingError;
use crate::error::TimeSharingResult;

/// Query interface of an active MIG device manager.
pub trait MigDeviceManager: Send + Sync {
    /// Resolve a MIG partition ID (e.g. `nvidia0/gi1`) to its physical GPU ID.
    fn physical_device_id(&self, partition_id: &str) -> Option<String>;

    /// Number of GPU partitions the manager serves on this node.
    fn partition_count(&self) -> usize;
}

/// One entry of a partition table file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MigPartitionSpec {
    /// Partition device ID, e.g. `nvidia0/gi1`
    pub id: String,
    /// MIG profile name, e.g. `1g.5gb`
    #[serde(default)]
    pub profile: Option<String>,
}

/// Static MIG partition layout of a node.
#[derive(Debug, Clone, Default)]
pub struct PartitionTable {
    partitions: BTreeMap<String, MigPartition>,
}

#[derive(Debug, Clone)]
struct MigPartition {
    physical: String,
    profile: Option<String>,
}

impl PartitionTable {
    pub fn new(specs: impl IntoIterator<Item = MigPartitionSpec>) -> TimeSharingResult<Self> {
        let mut partitions = BTreeMap::new();

        for spec in specs {
            let physical = match DeviceId::parse(&spec.id)? {
                DeviceId::MigPartition { physical, .. } => physical,
                other => {
                    return Err(Report::new(TimeSharingError::invalid_config(format!(
                        "{other} is not a MIG partition device ID"
                    ))));
                }
            };

            let partition = MigPartition {
                physical,
                profile: spec.profile,
            };
            if partitions.insert(spec.id.clone(), partition).is_some() {
                return Err(Report::new(TimeSharingError::invalid_config(format!(
                    "duplicate MIG partition {}",
                    spec.id
                ))));
            }
        }

        tracing::debug!("built MIG partition table with {} partitions", partitions.len());

        Ok(Self { partitions })
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// MIG profile of a partition, if one was configured.
    pub fn profile(&self, partition_id: &str) -> Option<&str> {
        self.partitions
            .get(partition_id)
            .and_then(|partition| partition.profile.as_deref())
    }

    pub fn partition_ids(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(String::as_str)
    }
}

impl MigDeviceManager for PartitionTable {
    fn physical_device_id(&self, partition_id: &str) -> Option<String> {
        self.partitions
            .get(partition_id)
            .map(|partition| partition.physical.clone())
    }

    fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

impl<'de> Deserialize<'de> for PartitionTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let specs = Vec::<MigPartitionSpec>::deserialize(deserializer)?;
        Self::new(specs).map_err(|report| serde::de::Error::custom(report.current_context()))
    }
}
