//! Tenant container enumeration and matching.
//!
//! Tenant-scoped containers follow a prefix convention: search container and
//! relational database for tenant `acme` under prefix `u0` are both named
//! `u0_acme`. The administrative container `u0_ad` holds cross-tenant Cell
//! documents and has no database counterpart.
//!
//! Matching is symmetric and fail-fast: a name present in exactly one store
//! (admin excepted) aborts the run before any comparison work begins.

mod errors;

pub use errors::{CatalogError, CatalogResult};

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::model::{admin_container, container_name, tenant_key, TenantContainerPair};
use crate::store::{RelationalStore, SearchStore};

/// Tenant names excluded from a run, as container/database names.
///
/// The exclusion set is the list of non-hidden subdirectories of the
/// exclusion path, each prefixed. A missing path yields an empty set with a
/// warning, matching a deployment where no tenant is parked.
pub fn list_exclusions(prefix: &str, path: Option<&Path>) -> CatalogResult<Vec<String>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    if !path.is_dir() {
        warn!(path = %path.display(), "exclusion directory does not exist");
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(path).map_err(|source| CatalogError::ExclusionIo {
        path: path.display().to_string(),
        source,
    })?;

    let mut excluded = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CatalogError::ExclusionIo {
            path: path.display().to_string(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if entry.path().is_dir() {
            excluded.push(container_name(prefix, &name));
        }
    }
    excluded.sort();
    Ok(excluded)
}

fn filter_names(
    names: Vec<String>,
    prefix: &str,
    tenant: Option<&str>,
    exclusions: &[String],
) -> Vec<String> {
    let mut out = Vec::new();
    match tenant {
        Some(tenant) => {
            // Single-tenant runs match case-insensitively and ignore the
            // exclusion set.
            let wanted = container_name(prefix, tenant).to_lowercase();
            if let Some(name) = names.into_iter().find(|n| n.to_lowercase() == wanted) {
                out.push(name);
            }
        }
        None => {
            let marker = format!("{prefix}_");
            for name in names {
                if name.starts_with(&marker) && !exclusions.contains(&name) {
                    out.push(name);
                }
            }
        }
    }
    out.sort();
    out
}

/// Search containers in scope for a run.
pub fn enumerate_containers(
    search: &mut dyn SearchStore,
    prefix: &str,
    tenant: Option<&str>,
    exclusions: &[String],
) -> CatalogResult<Vec<String>> {
    Ok(filter_names(search.list_containers()?, prefix, tenant, exclusions))
}

/// Relational databases in scope for a run.
pub fn enumerate_databases(
    relational: &mut dyn RelationalStore,
    prefix: &str,
    tenant: Option<&str>,
    exclusions: &[String],
) -> CatalogResult<Vec<String>> {
    Ok(filter_names(relational.list_databases()?, prefix, tenant, exclusions))
}

/// Match enumerated containers against databases into tenant pairs.
///
/// The administrative container is always considered matched and pairs with
/// no database. Every other name must appear in both lists.
pub fn match_pairs(
    prefix: &str,
    containers: &[String],
    databases: &[String],
) -> CatalogResult<Vec<TenantContainerPair>> {
    let admin = admin_container(prefix);
    let container_set: BTreeSet<&String> = containers.iter().collect();
    let database_set: BTreeSet<&String> = databases.iter().collect();

    let unmatched: Vec<String> = container_set
        .symmetric_difference(&database_set)
        .map(|name| (*name).clone())
        .filter(|name| *name != admin)
        .collect();
    if !unmatched.is_empty() {
        return Err(CatalogError::Unmatched(unmatched));
    }

    let mut pairs = Vec::new();
    for name in container_set.union(&database_set) {
        let Some(tenant) = tenant_key(prefix, name) else {
            continue;
        };
        let is_admin = **name == admin;
        pairs.push(TenantContainerPair {
            tenant_key: tenant,
            search_container: (*name).clone(),
            database: if is_admin { None } else { Some((*name).clone()) },
        });
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemorySearchStore;
    use std::fs::File;
    use tempfile::TempDir;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_matched_sets_produce_pairs() {
        let pairs = match_pairs(
            "u0",
            &names(&["u0_acme", "u0_beta"]),
            &names(&["u0_acme", "u0_beta"]),
        )
        .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].tenant_key, "acme");
        assert_eq!(pairs[0].database.as_deref(), Some("u0_acme"));
    }

    #[test]
    fn test_admin_container_is_exempt_and_database_free() {
        let pairs = match_pairs("u0", &names(&["u0_acme", "u0_ad"]), &names(&["u0_acme"])).unwrap();
        let admin = pairs.iter().find(|p| p.is_admin()).unwrap();
        assert_eq!(admin.search_container, "u0_ad");
        assert_eq!(admin.tenant_key, "ad");
    }

    #[test]
    fn test_one_sided_name_aborts() {
        let err = match_pairs("u0", &names(&["u0_acme"]), &names(&["u0_acme", "u0_beta"]))
            .unwrap_err();
        match err {
            CatalogError::Unmatched(unmatched) => assert_eq!(unmatched, names(&["u0_beta"])),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_enumeration_applies_prefix_and_exclusions() {
        let mut search = MemorySearchStore::new();
        for name in ["u0_acme", "u0_beta", "u0_parked", "other_x"] {
            search.add_container(name);
        }
        let containers = enumerate_containers(
            &mut search,
            "u0",
            None,
            &names(&["u0_parked"]),
        )
        .unwrap();
        assert_eq!(containers, names(&["u0_acme", "u0_beta"]));
    }

    #[test]
    fn test_tenant_filter_is_case_insensitive_and_skips_exclusions() {
        let mut search = MemorySearchStore::new();
        search.add_container("u0_Acme");
        let containers = enumerate_containers(
            &mut search,
            "u0",
            Some("ACME"),
            &names(&["u0_Acme"]),
        )
        .unwrap();
        assert_eq!(containers, names(&["u0_Acme"]));
    }

    #[test]
    fn test_exclusion_listing_skips_hidden_and_plain_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("parked")).unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        let excluded = list_exclusions("u0", Some(dir.path())).unwrap();
        assert_eq!(excluded, names(&["u0_parked"]));
    }

    #[test]
    fn test_missing_exclusion_directory_is_empty() {
        let excluded =
            list_exclusions("u0", Some(Path::new("/nonexistent/driftsync-test"))).unwrap();
        assert!(excluded.is_empty());
    }
}
