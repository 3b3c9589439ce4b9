//! Binary-content directory enumeration.
//!
//! Stored files are laid out under one directory per tenant; the file name
//! is the stored file's identifier at any nesting depth. A trailing
//! tombstone suffix marks logical deletion, and dot-entries are operational
//! artifacts; neither is a stored file.

mod errors;

pub use errors::{ContentError, ContentResult};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::model::TOMBSTONE_SUFFIX;

/// Enumerate stored file identifiers under `root`, each with revision 0.
///
/// A missing root yields an empty map with a warning: a tenant with no
/// binary content has no directory.
pub fn walk(root: &Path) -> ContentResult<BTreeMap<String, i64>> {
    let mut result = BTreeMap::new();
    if !root.is_dir() {
        warn!(path = %root.display(), "content directory does not exist");
        return Ok(result);
    }
    walk_into(root, &mut result)?;
    Ok(result)
}

fn walk_into(dir: &Path, result: &mut BTreeMap<String, i64>) -> ContentResult<()> {
    let entries = fs::read_dir(dir).map_err(|source| ContentError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ContentError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            walk_into(&path, result)?;
        } else if path.is_file() && !name.ends_with(TOMBSTONE_SUFFIX) {
            result.insert(name, 0);
        }
    }
    Ok(())
}
