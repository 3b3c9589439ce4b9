//! CLI argument definitions using clap
//!
//! Commands:
//! - driftsync check: detect drift between the two stores
//! - driftsync restore: rebuild search containers from the system of record

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// driftsync - reconciliation and recovery for paired tenant stores
#[derive(Parser, Debug)]
#[command(name = "driftsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect drift between the relational and search stores
    Check {
        /// Restrict the check to one tenant
        #[arg(short = 't', long)]
        tenant: Option<String>,

        /// Search cluster name
        #[arg(short = 'c', long, default_value = "elasticsearch")]
        cluster_name: String,

        /// Search cluster hosts
        #[arg(short = 's', long, default_value = "localhost:9300")]
        cluster_hosts: String,

        /// Relational host
        #[arg(short = 'm', long, default_value = "localhost:3306")]
        relational_host: String,

        /// Relational user
        #[arg(short = 'u', long, default_value = "root")]
        relational_user: String,

        /// Relational password
        #[arg(short = 'p', long, default_value = "password")]
        relational_password: String,

        /// Root of the binary-content tree
        #[arg(short = 'b', long, default_value = "/var/lib/driftsync/dav")]
        content_root: PathBuf,

        /// Directory whose subdirectories name excluded tenants
        #[arg(short = 'x', long)]
        exclude_path: Option<PathBuf>,

        /// Container-name prefix
        #[arg(short = 'f', long, default_value = "u0")]
        container_prefix: String,

        /// Records fetched per page
        #[arg(short = 'n', long, default_value_t = 1000)]
        page_size: usize,
    },

    /// Rebuild search containers from the system of record
    Restore {
        /// Container to restore; repeatable. All prefixed databases when
        /// omitted.
        #[arg(short = 'i', long = "container")]
        containers: Vec<String>,

        /// Properties file path
        #[arg(short = 'p', long)]
        properties: PathBuf,

        /// Delete each target container before restoring it
        #[arg(short = 'c', long)]
        clear: bool,

        /// Replica count applied once a container's restore ends
        #[arg(short = 'r', long)]
        replicas: u32,

        /// Deprecated; accepted for operator-script compatibility and ignored
        #[arg(short = 't', long = "type", hide = true)]
        legacy_type: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
