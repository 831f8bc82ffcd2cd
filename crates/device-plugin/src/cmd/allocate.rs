use anyhow::{bail, Result};
use serde::Serialize;
use time_sharing::{
    is_virtual_device_id, resolve_physical_device_ids, virtual_to_physical_device_id,
    MigDeviceManager, SharingConfig,
};

use crate::cmd::mig_device_manager;
use crate::config::{ResolveArgs, ValidateArgs};

/// Outcome of admitting one container's device request
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDecision {
    pub requested: Vec<String>,
    pub devices: Vec<String>,
}

pub fn run_validate(args: ValidateArgs) -> Result<()> {
    let config = args.node.sharing.sharing_config()?;
    let mig = mig_device_manager(&args.node)?;

    let decision = admit_request(
        &args.device_ids,
        args.node.device_count,
        &config,
        mig.as_ref().map(|table| table as &dyn MigDeviceManager),
    )?;

    tracing::info!(
        "admitted request {:?}, backed by {:?}",
        decision.requested,
        decision.devices
    );

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

pub fn run_resolve(args: ResolveArgs) -> Result<()> {
    let physical = virtual_to_physical_device_id(&args.device_id)
        .map_err(|e| anyhow::anyhow!("{e:?}"))?;

    tracing::debug!("{} is backed by {}", args.device_id, physical);

    println!("{physical}");
    Ok(())
}

/// Run the time-sharing gate over a request and resolve the devices backing it.
///
/// Without time-sharing no virtual device is ever advertised, so requesting one
/// is an error and physical IDs pass through as requested.
pub fn admit_request(
    device_ids: &[String],
    physical_device_count: usize,
    config: &SharingConfig,
    mig: Option<&dyn MigDeviceManager>,
) -> Result<AllocationDecision> {
    if !config.time_sharing_enabled() {
        tracing::info!("time-sharing is not enabled, skipping time-sharing validation");

        if let Some(id) = device_ids.iter().find(|id| is_virtual_device_id(id)) {
            bail!("virtual device {id} requested but time-sharing is not enabled");
        }

        return Ok(AllocationDecision {
            requested: device_ids.to_vec(),
            devices: device_ids.to_vec(),
        });
    }

    let devices = resolve_physical_device_ids(device_ids, physical_device_count, mig)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    Ok(AllocationDecision {
        requested: device_ids.to_vec(),
        devices,
    })
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use test_log::test;
    use time_sharing::{MigPartitionSpec, PartitionTable};

    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|id| id.to_string()).collect()
    }

    fn time_sharing(clients: u32) -> SharingConfig {
        SharingConfig::new("time-sharing", clients).unwrap()
    }

    #[test]
    fn admits_slices_of_a_single_gpu() {
        let decision =
            admit_request(&ids(&["nvidia0/vgpu0", "nvidia0/vgpu1"]), 1, &time_sharing(2), None)
                .unwrap();

        assert_eq!(
            decision,
            AllocationDecision {
                requested: ids(&["nvidia0/vgpu0", "nvidia0/vgpu1"]),
                devices: ids(&["nvidia0"]),
            }
        );
    }

    #[test]
    fn rejects_ambiguous_request() {
        let err = admit_request(
            &ids(&["nvidia0/vgpu0", "nvidia1/vgpu1"]),
            2,
            &time_sharing(2),
            None,
        )
        .unwrap_err();

        assert!(err
            .to_string()
            .contains("at most 1 nvidia.com/gpu can be requested"));
    }

    #[test]
    fn mig_requests_need_partition_table() {
        let err = admit_request(&ids(&["nvidia0/gi1/vgpu0"]), 1, &time_sharing(2), None)
            .unwrap_err();
        assert!(err.to_string().contains("can't find MIG device manager"));

        let table = PartitionTable::new([MigPartitionSpec {
            id: "nvidia0/gi1".to_string(),
            profile: None,
        }])
        .unwrap();
        let decision = admit_request(
            &ids(&["nvidia0/gi1/vgpu0"]),
            1,
            &time_sharing(2),
            Some(&table),
        )
        .unwrap();
        assert_eq!(decision.devices, ids(&["nvidia0/gi1"]));
    }

    #[test]
    fn physical_request_without_time_sharing() {
        let config = SharingConfig::new("mps", 1).unwrap();

        let decision = admit_request(&ids(&["nvidia0", "nvidia1"]), 2, &config, None).unwrap();
        assert_eq!(decision.devices, ids(&["nvidia0", "nvidia1"]));

        let err = admit_request(&ids(&["nvidia0/vgpu0"]), 2, &config, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "virtual device nvidia0/vgpu0 requested but time-sharing is not enabled".to_string()
        );
    }
}
