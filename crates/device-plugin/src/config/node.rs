use std::path::PathBuf;

use clap::{Args, Parser};
use time_sharing::SharingConfig;

/// GPU sharing settings of the node
#[derive(Args, Debug, Clone)]
pub struct SharingArgs {
    #[arg(
        long,
        env = "GPU_SHARING_STRATEGY",
        default_value = "",
        help = "Comma separated GPU sharing strategies, e.g. mig,time-sharing"
    )]
    pub gpu_sharing_strategy: String,

    #[arg(
        long,
        env = "MAX_SHARED_CLIENTS_PER_GPU",
        default_value = "1",
        help = "Number of containers that may share one GPU when time-sharing is enabled"
    )]
    pub max_shared_clients_per_gpu: u32,
}

impl SharingArgs {
    pub fn sharing_config(&self) -> anyhow::Result<SharingConfig> {
        SharingConfig::new(&self.gpu_sharing_strategy, self.max_shared_clients_per_gpu)
            .map_err(|e| anyhow::anyhow!("{e:?}"))
    }
}

/// GPU layout of the node
#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    #[arg(
        long,
        env = "GPU_DEVICE_COUNT",
        help = "Number of physical GPUs on the node"
    )]
    pub device_count: usize,

    #[arg(
        long,
        env = "GPU_DEVICE_PREFIX",
        default_value = "nvidia",
        help = "Prefix of physical device IDs, e.g. nvidia for nvidia0"
    )]
    pub device_prefix: String,

    #[arg(
        long,
        env = "MIG_PARTITIONS_PATH",
        value_hint = clap::ValueHint::FilePath,
        help = "YAML list of MIG partitions, enables the MIG device manager, e.g. /etc/device-plugin/mig.yaml"
    )]
    pub mig_partitions: Option<PathBuf>,

    #[command(flatten)]
    pub sharing: SharingArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct ListDevicesArgs {
    #[command(flatten)]
    pub node: NodeArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    #[arg(required = true, help = "Device IDs requested for one container")]
    pub device_ids: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ResolveArgs {
    #[arg(help = "Virtual device ID, e.g. nvidia0/vgpu1")]
    pub device_id: String,
}
