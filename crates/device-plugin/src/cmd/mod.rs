//! Command layer - Entry points for the device plugin operations

pub mod allocate;
pub mod devices;

pub use allocate::{run_resolve, run_validate};
pub use devices::run_list_devices;

use anyhow::Result;
use time_sharing::PartitionTable;

use crate::config::{load_partition_table, NodeArgs};

/// MIG device manager of the node, present only when a partition file is configured
pub(crate) fn mig_device_manager(node: &NodeArgs) -> Result<Option<PartitionTable>> {
    node.mig_partitions
        .as_deref()
        .map(|path| load_partition_table(path).map_err(|e| anyhow::anyhow!("{e:?}")))
        .transpose()
}
