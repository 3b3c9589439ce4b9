//! CLI command implementations.
//!
//! Both commands follow the same sequence: validate flags and configuration
//! first (fail fast, no side effects), then take the single-run lock, then
//! resolve the store clients and run. Lock contention is not a failure
//! (a concurrent run already owns the work), so it logs and exits 0.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::lock::{LockError, RunLock};
use crate::model::admin_container;
use crate::reconcile::{self, ReconcileOptions};
use crate::recovery::{BulkRecoveryEngine, RecoveryOptions};
use crate::store::{self, RelationalEndpoint, SearchEndpoint};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Lock file of the check command.
const CHECK_LOCK_PATH: &str = "/var/tmp/driftsync/check.lock";

/// Lock file of the restore command.
const RESTORE_LOCK_PATH: &str = "/var/tmp/driftsync/restore.lock";

/// Restore properties file.
///
/// JSON object with dotted keys; the connection keys and the routing flag
/// are required, the rest carry defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Search store hosts
    #[serde(rename = "search.hosts")]
    pub search_hosts: String,

    /// Search cluster name
    #[serde(rename = "search.cluster.name")]
    pub search_cluster_name: String,

    /// Relational connection URL
    #[serde(rename = "relational.url")]
    pub relational_url: String,

    /// Relational user
    #[serde(rename = "relational.user")]
    pub relational_user: String,

    /// Relational password
    #[serde(rename = "relational.password")]
    pub relational_password: String,

    /// Accepted for compatibility with existing deployments; partition
    /// routing is always applied.
    #[serde(rename = "routing.enabled")]
    pub routing_enabled: bool,

    /// Snapshot rows per batch (optional, default 10000)
    #[serde(rename = "execute.count", default = "default_execute_count")]
    pub execute_count: usize,

    /// Batches between bulk acknowledgment checks (optional, default 10)
    #[serde(rename = "bulk.check.count", default = "default_bulk_check_count")]
    pub bulk_check_count: usize,

    /// Container-name prefix (optional, default "u0")
    #[serde(rename = "container.prefix", default = "default_container_prefix")]
    pub container_prefix: String,
}

fn default_execute_count() -> usize {
    10000
}
fn default_bulk_check_count() -> usize {
    10
}
fn default_container_prefix() -> String {
    "u0".to_string()
}

impl RestoreConfig {
    /// Load the properties file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("failed to read properties file: {e}"))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("invalid properties file: {e}")))
    }
}

/// Parse arguments and dispatch.
pub fn run() -> CliResult<()> {
    match Cli::parse_args().command {
        Command::Check {
            tenant,
            cluster_name,
            cluster_hosts,
            relational_host,
            relational_user,
            relational_password,
            content_root,
            exclude_path,
            container_prefix,
            page_size,
        } => check(
            &SearchEndpoint { hosts: cluster_hosts, cluster_name },
            &RelationalEndpoint {
                url: relational_host,
                user: relational_user,
                password: relational_password,
            },
            &ReconcileOptions {
                prefix: container_prefix,
                tenant,
                page_size,
                content_root,
                exclusion_root: exclude_path,
            },
        ),
        Command::Restore { containers, properties, clear, replicas, legacy_type } => {
            if legacy_type.is_some() {
                info!("option --type is deprecated and ignored");
            }
            restore(&properties, containers, clear, replicas)
        }
    }
}

/// Take a run lock, treating contention as an already-owned run.
///
/// Returns `None` when another instance holds the lock; the caller exits 0.
fn acquire_or_yield(path: &Path) -> CliResult<Option<RunLock>> {
    match RunLock::acquire(path) {
        Ok(lock) => Ok(Some(lock)),
        Err(err @ LockError::Contended { .. }) => {
            info!(%err, "already started");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn check(
    search_endpoint: &SearchEndpoint,
    relational_endpoint: &RelationalEndpoint,
    options: &ReconcileOptions,
) -> CliResult<()> {
    let Some(_lock) = acquire_or_yield(Path::new(CHECK_LOCK_PATH))? else {
        return Ok(());
    };

    let (mut search, mut relational) = store::connect(search_endpoint, relational_endpoint)?;
    let report = reconcile::run(search.as_mut(), relational.as_mut(), options)?;

    if !report.is_consistent() {
        warn!(mismatches = report.mismatches.len(), "stores have drifted");
    }
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::io_error(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

/// Reject flag combinations the engine must never see.
fn validate_restore_targets(containers: &[String], clear: bool, prefix: &str) -> CliResult<()> {
    let admin = admin_container(prefix);
    if clear && containers.iter().any(|name| *name == admin) {
        return Err(CliError::config_error(format!(
            "cannot combine --clear with the administrative container {admin}: clearing it \
             would drop every tenant's cells"
        )));
    }
    Ok(())
}

fn restore(
    properties: &Path,
    containers: Vec<String>,
    clear: bool,
    replicas: u32,
) -> CliResult<()> {
    let config = RestoreConfig::load(properties)?;
    validate_restore_targets(&containers, clear, &config.container_prefix)?;

    let Some(_lock) = acquire_or_yield(Path::new(RESTORE_LOCK_PATH))? else {
        return Ok(());
    };

    let (mut search, mut relational) = store::connect(
        &SearchEndpoint {
            hosts: config.search_hosts.clone(),
            cluster_name: config.search_cluster_name.clone(),
        },
        &RelationalEndpoint {
            url: config.relational_url.clone(),
            user: config.relational_user.clone(),
            password: config.relational_password.clone(),
        },
    )?;

    let options = RecoveryOptions {
        prefix: config.container_prefix.clone(),
        batch_size: config.execute_count,
        check_count: config.bulk_check_count,
        replicas,
        clear,
    };
    let mut engine = BulkRecoveryEngine::new(search.as_mut(), relational.as_mut(), options);
    let summary = engine.run(containers)?;
    info!(
        containers = summary.containers.len(),
        rows = summary.restored_rows,
        "restore success"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_defaults_apply() {
        let file = write_config(
            r#"{
                "search.hosts": "es1:9300",
                "search.cluster.name": "prod",
                "relational.url": "mysql://db1",
                "relational.user": "root",
                "relational.password": "secret",
                "routing.enabled": true
            }"#,
        );
        let config = RestoreConfig::load(file.path()).unwrap();
        assert_eq!(config.execute_count, 10000);
        assert_eq!(config.bulk_check_count, 10);
        assert_eq!(config.container_prefix, "u0");
    }

    #[test]
    fn test_missing_required_key_is_a_config_error() {
        let file = write_config(r#"{"search.hosts": "es1:9300"}"#);
        let err = RestoreConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let err = RestoreConfig::load(Path::new("/nonexistent/driftsync.json")).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_clear_cannot_target_the_admin_container() {
        let containers = vec!["u0_ad".to_string()];
        assert!(validate_restore_targets(&containers, true, "u0").is_err());
        assert!(validate_restore_targets(&containers, false, "u0").is_ok());
        assert!(validate_restore_targets(&["u0_acme".to_string()], true, "u0").is_ok());
    }
}
