//! Ghost package metadata from `descript.txt`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::host::PackageInspector;

/// Locations checked for descript.txt, first hit wins.
const DESCRIPT_LOCATIONS: [&str; 2] = ["ghost/master/descript.txt", "descript.txt"];

/// Fields of a ghost's descript.txt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostProfile {
    pub name: Option<String>,
    pub craftman: Option<String>,
    pub version: Option<String>,
    /// Every other `key,value` line.
    pub extra: BTreeMap<String, String>,
}

impl GhostProfile {
    /// Parse `key,value` lines. Lines without a comma are skipped.
    pub fn parse_descript(content: &str) -> Self {
        let mut profile = GhostProfile::default();
        for line in content.lines() {
            let Some((key, value)) = line.split_once(',') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "name" => profile.name = Some(value),
                "craftman" => profile.craftman = Some(value),
                "version" => profile.version = Some(value),
                "" => {}
                other => {
                    profile.extra.insert(other.to_string(), value);
                }
            }
        }
        profile
    }

    /// Read the package's descript.txt, if any.
    pub fn read(inspector: &dyn PackageInspector, ghost_path: &Path) -> io::Result<Option<Self>> {
        for location in DESCRIPT_LOCATIONS {
            if let Some(content) = inspector.read_text(&ghost_path.join(location))? {
                return Ok(Some(Self::parse_descript(&content)));
            }
        }
        Ok(None)
    }
}

/// One installed ghost found by [`scan_ghosts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostEntry {
    /// Directory name of the package, used as the catalog key.
    pub name: String,
    pub path: PathBuf,
    pub profile: GhostProfile,
}

/// Catalog of every ghost package under `root`, keyed by directory name.
/// The first package wins when two share a directory name.
pub fn scan_ghosts(inspector: &dyn PackageInspector, root: &Path) -> io::Result<BTreeMap<String, GhostEntry>> {
    let mut catalog = BTreeMap::new();
    for path in inspector.list_ghost_packages(root)? {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let Some(profile) = GhostProfile::read(inspector, &path)? else {
            continue;
        };
        if catalog.contains_key(&name) {
            tracing::warn!(ghost = %name, path = %path.display(), "duplicate ghost name skipped");
            continue;
        }
        catalog.insert(name.clone(), GhostEntry { name, path, profile });
    }
    Ok(catalog)
}
