use clap::{Parser, Subcommand};
use utils::version;

use crate::config::node::{ListDevicesArgs, ResolveArgs, ValidateArgs};

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the device IDs advertised to the kubelet
    #[command(name = "list-devices")]
    ListDevices(ListDevicesArgs),
    /// Admit an allocation request and print the devices backing it
    Validate(ValidateArgs),
    /// Resolve a virtual device ID to the device backing it
    Resolve(ResolveArgs),
}
