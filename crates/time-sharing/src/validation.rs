//! Admission checks for time-sharing allocation requests.

use error_stack::Report;
use tracing::debug;
use tracing::warn;

use crate::device_id::DeviceId;
use crate::error::SharingScope;
use crate::error::TimeSharingError;
use crate::error::TimeSharingResult;
use crate::mig::MigDeviceManager;

/// Check whether the kubelet's requested device IDs can be served under time-sharing.
///
/// Requests without virtual device IDs are plain GPU allocations and always pass.
/// With virtual IDs, more than one ID may only be requested when the node has a
/// single physical GPU (and a single MIG partition in MIG mode), since the requested
/// slices could otherwise be spread over several devices. MIG virtual IDs need an
/// active MIG device manager. An ID outside the device ID grammar fails the whole
/// request with [`TimeSharingError::InvalidFormat`].
pub fn time_sharing_request_validation<S: AsRef<str>>(
    request_device_ids: &[S],
    physical_device_count: usize,
    mig_device_manager: Option<&dyn MigDeviceManager>,
) -> TimeSharingResult<()> {
    let parsed = request_device_ids
        .iter()
        .map(|id| DeviceId::parse(id.as_ref()))
        .collect::<TimeSharingResult<Vec<_>>>()?;

    if !parsed.iter().any(DeviceId::is_virtual) {
        return Ok(());
    }

    let multiple_requested = request_device_ids.len() > 1;

    if multiple_requested && physical_device_count > 1 {
        warn!(
            "rejecting {} virtual devices on a node with {} physical GPUs",
            request_device_ids.len(),
            physical_device_count
        );
        return Err(Report::new(
            TimeSharingError::AmbiguousTimeSharingRequest {
                scope: SharingScope::PhysicalGpus,
            },
        ));
    }

    if parsed.iter().any(DeviceId::is_mig_virtual) {
        let Some(manager) = mig_device_manager else {
            warn!("MIG virtual devices requested without a MIG device manager");
            return Err(Report::new(TimeSharingError::MissingMigDeviceManager));
        };

        if multiple_requested && manager.partition_count() > 1 {
            warn!(
                "rejecting {} virtual devices on a node with {} GPU partitions",
                request_device_ids.len(),
                manager.partition_count()
            );
            return Err(Report::new(
                TimeSharingError::AmbiguousTimeSharingRequest {
                    scope: SharingScope::GpuPartitions,
                },
            ));
        }
    }

    debug!(
        "time-sharing request for {} devices admitted",
        request_device_ids.len()
    );
    Ok(())
}

/// Validate a request and resolve it to the devices backing it.
///
/// Physical IDs resolve to themselves, virtual IDs to the GPU or MIG partition
/// they slice. The result is de-duplicated, keeping the order of first appearance.
pub fn resolve_physical_device_ids<S: AsRef<str>>(
    request_device_ids: &[S],
    physical_device_count: usize,
    mig_device_manager: Option<&dyn MigDeviceManager>,
) -> TimeSharingResult<Vec<String>> {
    time_sharing_request_validation(
        request_device_ids,
        physical_device_count,
        mig_device_manager,
    )?;

    let mut resolved: Vec<String> = Vec::with_capacity(request_device_ids.len());
    for id in request_device_ids {
        let backing = DeviceId::parse(id.as_ref())?.backing_device();

        if let DeviceId::MigPartition { .. } = backing {
            let partition_id = backing.to_string();
            let known = mig_device_manager
                .and_then(|manager| manager.physical_device_id(&partition_id))
                .is_some();
            if !known {
                return Err(Report::new(TimeSharingError::UnknownMigPartition {
                    partition_id,
                }));
            }
        }

        let backing = backing.to_string();
        if !resolved.contains(&backing) {
            resolved.push(backing);
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::mig::MigPartitionSpec;
    use crate::mig::PartitionTable;

    const AMBIGUOUS_GPUS: &str = "invalid request for time-sharing solution, at most 1 nvidia.com/gpu can be requested when there are more than 1 physical GPUs in a node";
    const MISSING_MIG: &str = "invalid request for time-sharing solution, node suppose to be in MIG mode, but can't find MIG device manager";

    fn partitions(ids: &[&str]) -> PartitionTable {
        PartitionTable::new(ids.iter().map(|id| MigPartitionSpec {
            id: id.to_string(),
            profile: None,
        }))
        .unwrap()
    }

    fn validation_error(
        ids: &[&str],
        device_count: usize,
        mig: Option<&dyn MigDeviceManager>,
    ) -> Option<String> {
        time_sharing_request_validation(ids, device_count, mig)
            .err()
            .map(|report| report.current_context().to_string())
    }

    #[test]
    fn no_virtual_device_ids() {
        assert_eq!(validation_error(&["nvidia0", "nvidia1"], 1, None), None);
        assert_eq!(validation_error(&["nvidia0", "nvidia1"], 8, None), None);
        assert_eq!(validation_error(&[], 2, None), None);
    }

    #[test]
    fn only_one_physical_device() {
        assert_eq!(
            validation_error(&["nvidia0/vgpu0", "nvidia1/vgpu1"], 1, None),
            None
        );
    }

    #[test]
    fn only_one_virtual_device_requested() {
        assert_eq!(validation_error(&["nvidia0/vgpu0"], 2, None), None);
    }

    #[test]
    fn multiple_virtual_devices_on_multiple_physical_devices() {
        assert_eq!(
            validation_error(&["nvidia0/vgpu0", "nvidia1/vgpu1"], 2, None),
            Some(AMBIGUOUS_GPUS.to_string())
        );
        // node-wide count decides, even when every slice is on the same GPU
        assert_eq!(
            validation_error(&["nvidia0/vgpu0", "nvidia0/vgpu1"], 2, None),
            Some(AMBIGUOUS_GPUS.to_string())
        );
    }

    #[test]
    fn mig_mode_without_mig_device_manager() {
        assert_eq!(
            validation_error(&["nvidia0/gi10/vgpu0", "nvidia1/gi11/vgpu1"], 1, None),
            Some(MISSING_MIG.to_string())
        );
        assert_eq!(
            validation_error(&["nvidia0/gi10/vgpu0"], 1, None),
            Some(MISSING_MIG.to_string())
        );
    }

    #[test]
    fn mig_mode_with_any_partition_token() {
        assert_eq!(
            validation_error(&["nvidia0/mig1/vgpu0"], 1, None),
            Some(MISSING_MIG.to_string())
        );

        let table = partitions(&["nvidia0/mig1"]);
        assert_eq!(
            validation_error(&["nvidia0/mig1/vgpu0"], 1, Some(&table)),
            None
        );
    }

    #[test]
    fn malformed_ids_fail_the_request() {
        assert_eq!(
            validation_error(&["nvidia0//vgpu0", "nvidia1//vgpu1"], 2, None),
            Some("virtual device ID (nvidia0//vgpu0) is not valid".to_string())
        );
        assert_eq!(
            validation_error(&["nvidia0/gi0/ci0/vgpu0"], 1, None),
            Some("virtual device ID (nvidia0/gi0/ci0/vgpu0) is not valid".to_string())
        );
        assert_eq!(
            validation_error(&["nvidia0", "nvidia0/vgpu"], 1, None),
            Some("virtual device ID (nvidia0/vgpu) is not valid".to_string())
        );
    }

    #[test]
    fn mig_mode_with_single_partition() {
        let table = partitions(&["nvidia0/gi10"]);
        assert_eq!(
            validation_error(
                &["nvidia0/gi10/vgpu0", "nvidia0/gi10/vgpu1"],
                1,
                Some(&table)
            ),
            None
        );
    }

    #[test]
    fn mig_mode_with_multiple_partitions() {
        let table = partitions(&["nvidia0/gi10", "nvidia0/gi11"]);

        let err = time_sharing_request_validation(
            &["nvidia0/gi10/vgpu0", "nvidia0/gi11/vgpu1"],
            1,
            Some(&table),
        )
        .unwrap_err();
        assert_eq!(
            err.current_context(),
            &TimeSharingError::AmbiguousTimeSharingRequest {
                scope: SharingScope::GpuPartitions
            }
        );

        assert_eq!(
            validation_error(&["nvidia0/gi10/vgpu0"], 1, Some(&table)),
            None
        );
    }

    #[test]
    fn resolves_to_distinct_backing_devices() {
        let resolved =
            resolve_physical_device_ids(&["nvidia0/vgpu0", "nvidia0/vgpu1"], 1, None).unwrap();
        assert_eq!(resolved, vec!["nvidia0".to_string()]);

        let resolved = resolve_physical_device_ids(&["nvidia1", "nvidia0"], 2, None).unwrap();
        assert_eq!(resolved, vec!["nvidia1".to_string(), "nvidia0".to_string()]);
    }

    #[test]
    fn resolves_mig_virtual_devices_through_manager() {
        let table = partitions(&["nvidia0/gi10"]);
        let resolved =
            resolve_physical_device_ids(&["nvidia0/gi10/vgpu3"], 1, Some(&table)).unwrap();
        assert_eq!(resolved, vec!["nvidia0/gi10".to_string()]);

        let err =
            resolve_physical_device_ids(&["nvidia0/gi11/vgpu0"], 1, Some(&table)).unwrap_err();
        assert_eq!(
            err.current_context(),
            &TimeSharingError::UnknownMigPartition {
                partition_id: "nvidia0/gi11".to_string()
            }
        );
    }

    #[test]
    fn resolve_rejects_malformed_ids() {
        let err = resolve_physical_device_ids(&["nvidia0/vgpu0", "nvidia0//x"], 1, None)
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            TimeSharingError::InvalidFormat { .. }
        ));
    }
}
