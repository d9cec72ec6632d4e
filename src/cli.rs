use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vmctl", about = "Manage desktop VM bundles on disk")]
pub struct Cli {
    /// Path to config file (defaults to ~/.config/vmctl/vmctl.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List VM bundles
    List {
        /// Only VMs the control command reports as running
        #[arg(long)]
        running: bool,
    },

    /// Show VM status (all VMs when no name is given)
    Status {
        name: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Power on a VM
    Start {
        name: String,

        /// Open the hypervisor GUI window
        #[arg(long)]
        gui: bool,
    },

    /// Power off a VM
    Stop {
        name: String,

        /// Power off immediately instead of a guest shutdown
        #[arg(long)]
        hard: bool,
    },

    /// Suspend a VM to disk
    Suspend { name: String },

    /// Hard-reset a VM
    Reset { name: String },

    /// Copy a VM bundle under a new name
    Clone { source: String, target: String },

    /// Show the VM's MAC address and DHCP lease
    Ip { name: String },

    /// Manage snapshots
    Snapshot {
        #[command(subcommand)]
        action: SnapshotCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SnapshotCommand {
    /// List snapshots of a VM
    List { name: String },
    /// Take a snapshot
    Create { name: String, snapshot: String },
    /// Revert to a snapshot
    Revert { name: String, snapshot: String },
    /// Delete a snapshot
    Delete { name: String, snapshot: String },
}
