//! Error types for time-sharing admission.

use core::error::Error;

use derive_more::Display;
use error_stack::Report;

/// Result type for time-sharing operations.
pub type TimeSharingResult<T> = Result<T, Report<TimeSharingError>>;

/// What a rejected request would have had to be unambiguous across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SharingScope {
    #[display("physical GPUs")]
    PhysicalGpus,
    #[display("GPU partitions")]
    GpuPartitions,
}

/// Errors raised while parsing device IDs or admitting a time-sharing request.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum TimeSharingError {
    /// The ID does not follow the virtual device ID grammar
    #[display("virtual device ID ({device_id}) is not valid")]
    InvalidFormat { device_id: String },

    /// Several virtual devices were requested on a node with several GPUs or partitions
    #[display(
        "invalid request for time-sharing solution, at most 1 nvidia.com/gpu can be requested when there are more than 1 {scope} in a node"
    )]
    AmbiguousTimeSharingRequest { scope: SharingScope },

    /// A MIG virtual device was requested but no MIG device manager is available
    #[display(
        "invalid request for time-sharing solution, node suppose to be in MIG mode, but can't find MIG device manager"
    )]
    MissingMigDeviceManager,

    /// The MIG device manager does not know the partition
    #[display("MIG partition ({partition_id}) is not managed on this node")]
    UnknownMigPartition { partition_id: String },

    /// Sharing or partition configuration is inconsistent
    #[display("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

impl Error for TimeSharingError {}

impl TimeSharingError {
    pub fn invalid_format(device_id: impl Into<String>) -> Self {
        Self::InvalidFormat {
            device_id: device_id.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
