//! Device identifier grammar.
//!
//! Device IDs advertised to the kubelet come in four shapes:
//! - `nvidia0`: a whole physical GPU
//! - `nvidia0/gi0`: a MIG partition of a physical GPU
//! - `nvidia0/vgpu0`: a time-shared slice of a physical GPU
//! - `nvidia0/gi0/vgpu0`: a time-shared slice of a MIG partition
//!
//! Classification is structural: a trailing `vgpu<n>` segment makes an ID virtual,
//! and the segment count tells a MIG slice from a plain one. Partition tokens are
//! not otherwise constrained, `gi0` and `mig1` are both accepted.
//!
//! [`DeviceId::parse`] is the only place the string form is inspected.

use std::fmt;
use std::str::FromStr;

use error_stack::Report;

use crate::error::TimeSharingError;
use crate::error::TimeSharingResult;

/// Separator between device ID segments.
pub const SEGMENT_SEPARATOR: char = '/';
/// Tag of the trailing segment of a virtual device ID.
pub const VGPU_TAG: &str = "vgpu";

/// A parsed device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceId {
    /// Whole GPU as enumerated by the driver
    Physical { id: String },
    /// MIG partition of a physical GPU
    MigPartition { physical: String, partition: String },
    /// Time-shared slice of a physical GPU
    TimeShared { physical: String, slice: String },
    /// Time-shared slice of a MIG partition
    MigVirtual {
        physical: String,
        partition: String,
        slice: String,
    },
}

impl DeviceId {
    /// Parse a device ID.
    ///
    /// Empty segments, more than three segments, and `vgpu`-prefixed segments
    /// that are not in trailing `vgpu<n>` position are [`TimeSharingError::InvalidFormat`].
    pub fn parse(device_id: &str) -> TimeSharingResult<Self> {
        let invalid = || Report::new(TimeSharingError::invalid_format(device_id));

        let segments: Vec<&str> = device_id.split(SEGMENT_SEPARATOR).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(invalid());
        }

        match segments.as_slice() {
            [physical] if is_device_token(physical) => Ok(Self::Physical {
                id: (*physical).to_owned(),
            }),
            [physical, slice] if is_device_token(physical) && is_slice_token(slice) => {
                Ok(Self::TimeShared {
                    physical: (*physical).to_owned(),
                    slice: (*slice).to_owned(),
                })
            }
            [physical, partition] if is_device_token(physical) && is_device_token(partition) => {
                Ok(Self::MigPartition {
                    physical: (*physical).to_owned(),
                    partition: (*partition).to_owned(),
                })
            }
            [physical, partition, slice]
                if is_device_token(physical)
                    && is_device_token(partition)
                    && is_slice_token(slice) =>
            {
                Ok(Self::MigVirtual {
                    physical: (*physical).to_owned(),
                    partition: (*partition).to_owned(),
                    slice: (*slice).to_owned(),
                })
            }
            _ => Err(invalid()),
        }
    }

    /// Virtual IDs name a time-shared slice rather than a whole device.
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::TimeShared { .. } | Self::MigVirtual { .. })
    }

    pub fn is_mig_virtual(&self) -> bool {
        matches!(self, Self::MigVirtual { .. })
    }

    /// ID of the physical GPU underneath, e.g. `nvidia0` for `nvidia0/gi0/vgpu1`.
    pub fn physical_gpu(&self) -> &str {
        match self {
            Self::Physical { id } => id,
            Self::MigPartition { physical, .. }
            | Self::TimeShared { physical, .. }
            | Self::MigVirtual { physical, .. } => physical,
        }
    }

    /// The device backing this ID once the time-shared slice is dropped.
    ///
    /// Non-virtual IDs are returned unchanged.
    pub fn backing_device(&self) -> DeviceId {
        match self {
            Self::TimeShared { physical, .. } => Self::Physical {
                id: physical.clone(),
            },
            Self::MigVirtual {
                physical,
                partition,
                ..
            } => Self::MigPartition {
                physical: physical.clone(),
                partition: partition.clone(),
            },
            Self::Physical { .. } | Self::MigPartition { .. } => self.clone(),
        }
    }
}

/// `vgpu<digits>`
fn is_slice_token(segment: &str) -> bool {
    segment
        .strip_prefix(VGPU_TAG)
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// A physical or partition segment; `vgpu` is reserved for the trailing slice.
fn is_device_token(segment: &str) -> bool {
    !segment.starts_with(VGPU_TAG)
}

impl FromStr for DeviceId {
    type Err = Report<TimeSharingError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physical { id } => write!(f, "{id}"),
            Self::MigPartition {
                physical,
                partition,
            } => write!(f, "{physical}/{partition}"),
            Self::TimeShared { physical, slice } => write!(f, "{physical}/{slice}"),
            Self::MigVirtual {
                physical,
                partition,
                slice,
            } => write!(f, "{physical}/{partition}/{slice}"),
        }
    }
}

/// Returns true if the ID names a time-shared slice.
pub fn is_virtual_device_id(device_id: &str) -> bool {
    DeviceId::parse(device_id).is_ok_and(|id| id.is_virtual())
}

/// Returns true if the ID names a time-shared slice of a MIG partition.
pub fn is_mig_virtual_device_id(device_id: &str) -> bool {
    DeviceId::parse(device_id).is_ok_and(|id| id.is_mig_virtual())
}

/// Strip the trailing `vgpu` segment from a virtual device ID.
///
/// `nvidia0/vgpu0` resolves to `nvidia0` and `nvidia0/gi0/vgpu0` to `nvidia0/gi0`.
/// Whether the resulting device exists on the node is not checked.
pub fn virtual_to_physical_device_id(virtual_device_id: &str) -> TimeSharingResult<String> {
    let device_id = DeviceId::parse(virtual_device_id)?;
    if !device_id.is_virtual() {
        return Err(Report::new(TimeSharingError::invalid_format(
            virtual_device_id,
        )));
    }

    Ok(device_id.backing_device().to_string())
}

/// Virtual device IDs advertised for one time-shared device.
///
/// `("nvidia0", 2)` yields `nvidia0/vgpu0` and `nvidia0/vgpu1`.
pub fn virtual_device_ids(physical_device_id: &str, max_shared_clients: u32) -> Vec<String> {
    (0..max_shared_clients)
        .map(|slice| format!("{physical_device_id}{SEGMENT_SEPARATOR}{VGPU_TAG}{slice}"))
        .collect()
}
