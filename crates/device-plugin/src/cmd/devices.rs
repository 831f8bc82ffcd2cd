use anyhow::Result;
use serde::Serialize;
use time_sharing::{virtual_device_ids, PartitionTable, SharingConfig};

use crate::cmd::mig_device_manager;
use crate::config::{ListDevicesArgs, NodeArgs};

/// Device list advertised to the kubelet
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListing {
    pub gpu_sharing_strategy: String,
    pub time_sharing: bool,
    pub devices: Vec<String>,
}

pub fn run_list_devices(args: ListDevicesArgs) -> Result<()> {
    let config = args.node.sharing.sharing_config()?;
    let mig = mig_device_manager(&args.node)?;

    let listing = DeviceListing {
        gpu_sharing_strategy: config.strategies().to_string(),
        time_sharing: config.time_sharing_enabled(),
        devices: advertised_device_ids(&args.node, &config, mig.as_ref()),
    };

    tracing::info!(
        "advertising {} devices for {} physical GPUs",
        listing.devices.len(),
        args.node.device_count
    );

    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

/// Device IDs the node advertises.
///
/// In MIG mode the partitions replace the physical GPUs. With time-sharing every
/// device is split into `max_shared_clients_per_gpu` virtual devices.
pub fn advertised_device_ids(
    node: &NodeArgs,
    config: &SharingConfig,
    mig: Option<&PartitionTable>,
) -> Vec<String> {
    let devices: Vec<String> = match mig {
        Some(table) => table.partition_ids().map(ToOwned::to_owned).collect(),
        None => (0..node.device_count)
            .map(|index| format!("{}{index}", node.device_prefix))
            .collect(),
    };

    if !config.time_sharing_enabled() {
        return devices;
    }

    devices
        .iter()
        .flat_map(|device| virtual_device_ids(device, config.max_shared_clients_per_gpu()))
        .collect()
}
