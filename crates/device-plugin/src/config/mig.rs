use std::path::Path;

use error_stack::{Report, ResultExt};
use time_sharing::{PartitionTable, TimeSharingError};

/// load the MIG partition table from a YAML file
///
/// The file holds a list of partitions:
///
/// ```yaml
/// - id: nvidia0/gi1
///   profile: 3g.20gb
/// - id: nvidia0/gi2
/// ```
pub fn load_partition_table(path: &Path) -> Result<PartitionTable, Report<TimeSharingError>> {
    tracing::info!("Loading MIG partitions from {:?}", path);

    let yaml_content =
        std::fs::read_to_string(path).change_context(TimeSharingError::invalid_config(
            format!("failed to read MIG partition file {}", path.display()),
        ))?;

    let table: PartitionTable = serde_yaml::from_str(&yaml_content).change_context(
        TimeSharingError::invalid_config(format!(
            "failed to parse MIG partition file {}",
            path.display()
        )),
    )?;

    if table.is_empty() {
        tracing::warn!("MIG partition file {:?} lists no partitions", path);
    }

    for partition_id in table.partition_ids() {
        tracing::info!(
            "MIG partition {} ({})",
            partition_id,
            table.profile(partition_id).unwrap_or("unknown profile")
        );
    }

    Ok(table)
}
