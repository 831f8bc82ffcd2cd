//! Time-sharing support for the GPU device plugin.
//!
//! The main components are:
//! - [`has_time_sharing_strategy`]: whether a node's sharing strategy enables time-sharing
//! - [`DeviceId`]: the device identifier grammar (physical, MIG partition and virtual IDs)
//! - [`time_sharing_request_validation`]: admission of an allocation request
//! - [`MigDeviceManager`]: the MIG capability consulted for MIG virtual IDs

pub mod device_id;
pub mod error;
pub mod mig;
pub mod strategy;
pub mod validation;

pub use device_id::is_mig_virtual_device_id;
pub use device_id::is_virtual_device_id;
pub use device_id::virtual_device_ids;
pub use device_id::virtual_to_physical_device_id;
pub use device_id::DeviceId;
pub use error::SharingScope;
pub use error::TimeSharingError;
pub use error::TimeSharingResult;
pub use mig::MigDeviceManager;
pub use mig::MigPartitionSpec;
pub use mig::PartitionTable;
pub use strategy::has_time_sharing_strategy;
pub use strategy::SharingConfig;
pub use strategy::SharingStrategySet;
pub use strategy::TIME_SHARING_STRATEGY;
pub use validation::resolve_physical_device_ids;
pub use validation::time_sharing_request_validation;
