//! Host collaborators: package inspection, clock, and random source.
//!
//! The core only reaches the outside world through these traits, so tests can
//! swap in fixed clocks and scripted random sequences.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Directories inside a ghost package searched for engine binaries, in discovery order.
/// The empty entry is the package root.
pub const CANDIDATE_DIRS: [&str; 2] = ["ghost/master", ""];

/// How deep below a ghosts root `descript.txt` files are searched for.
/// Covers `<root>/<ghost>/ghost/master/descript.txt`.
pub const GHOST_SCAN_DEPTH: usize = 4;

/// Read-only view of a ghost package on disk.
pub trait PackageInspector: Send + Sync {
    /// Files found in the candidate directories of `ghost_path`, in discovery order.
    fn list_candidate_paths(&self, ghost_path: &Path) -> io::Result<Vec<PathBuf>>;

    fn file_exists(&self, path: &Path) -> bool;

    /// Contents of a text file, `None` when it does not exist.
    fn read_text(&self, path: &Path) -> io::Result<Option<String>>;

    /// Package roots of every ghost installed under `root`, in discovery order.
    fn list_ghost_packages(&self, root: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Package root owning a descript.txt: `<pkg>/ghost/master/descript.txt` or `<pkg>/descript.txt`.
fn package_root(descript: &Path) -> Option<PathBuf> {
    let dir = descript.parent()?;
    if dir.ends_with("ghost/master") {
        dir.parent()?.parent().map(Path::to_path_buf)
    } else {
        Some(dir.to_path_buf())
    }
}

/// [`PackageInspector`] over the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsInspector;

impl PackageInspector for FsInspector {
    fn list_candidate_paths(&self, ghost_path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for dir in CANDIDATE_DIRS {
            let dir = if dir.is_empty() {
                ghost_path.to_path_buf()
            } else {
                ghost_path.join(dir)
            };
            if !dir.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() {
                    found.push(entry.into_path());
                }
            }
        }
        Ok(found)
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_text(&self, path: &Path) -> io::Result<Option<String>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_ghost_packages(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let mut packages = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(GHOST_SCAN_DEPTH)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() || entry.file_name() != "descript.txt" {
                continue;
            }
            if let Some(package) = package_root(entry.path()) {
                if !packages.contains(&package) {
                    packages.push(package);
                }
            }
        }
        Ok(packages)
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Picks an index into a phrase pool.
pub trait RandomSource: Send + Sync {
    /// Index in `0..pool_size`. Callers treat anything else as a failure.
    fn next_index(&self, pool_size: usize) -> usize;
}

/// Uniform selection via `rand::thread_rng`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_index(&self, pool_size: usize) -> usize {
        if pool_size == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..pool_size)
    }
}

/// Replays a fixed index sequence, cycling when exhausted. Values are returned
/// verbatim (not reduced modulo the pool size).
#[derive(Debug)]
pub struct ScriptedRandom {
    sequence: Vec<usize>,
    cursor: Mutex<usize>,
}

impl ScriptedRandom {
    pub fn new(sequence: Vec<usize>) -> Self {
        Self {
            sequence,
            cursor: Mutex::new(0),
        }
    }

    /// Always returns the same index.
    pub fn constant(index: usize) -> Self {
        Self::new(vec![index])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_index(&self, _pool_size: usize) -> usize {
        if self.sequence.is_empty() {
            return 0;
        }
        let mut cursor = self.cursor.lock();
        let value = self.sequence[*cursor % self.sequence.len()];
        *cursor += 1;
        value
    }
}

/// The three collaborators a manager runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub inspector: Arc<dyn PackageInspector>,
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            inspector: Arc::new(FsInspector),
            clock: Arc::new(SystemClock),
            random: Arc::new(ThreadRandom),
        }
    }
}

impl Collaborators {
    pub fn with_inspector(mut self, inspector: impl PackageInspector + 'static) -> Self {
        self.inspector = Arc::new(inspector);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Arc::new(random);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_random_cycles() {
        let rng = ScriptedRandom::new(vec![2, 0, 1]);
        let picks: Vec<usize> = (0..5).map(|_| rng.next_index(3)).collect();
        assert_eq!(picks, vec![2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_thread_random_stays_in_range() {
        let rng = ThreadRandom;
        for _ in 0..100 {
            assert!(rng.next_index(4) < 4);
        }
        assert_eq!(rng.next_index(0), 0);
    }

    #[test]
    fn test_fs_inspector_lists_master_before_root() {
        let dir = tempfile::tempdir().unwrap();
        let master = dir.path().join("ghost/master");
        std::fs::create_dir_all(&master).unwrap();
        std::fs::write(dir.path().join("shiori.dll"), b"").unwrap();
        std::fs::write(master.join("yaya.dll"), b"").unwrap();
        std::fs::write(master.join("aya5.dll"), b"").unwrap();

        let paths = FsInspector.list_candidate_paths(dir.path()).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["aya5.dll", "yaya.dll", "shiori.dll"]);
    }

    #[test]
    fn test_fs_inspector_lists_ghost_packages() {
        let dir = tempfile::tempdir().unwrap();
        let nanai = dir.path().join("nanai/ghost/master");
        std::fs::create_dir_all(&nanai).unwrap();
        std::fs::write(nanai.join("descript.txt"), "name,Nanai\n").unwrap();
        std::fs::write(dir.path().join("nanai/descript.txt"), "name,Nanai\n").unwrap();
        let flat = dir.path().join("flat");
        std::fs::create_dir_all(&flat).unwrap();
        std::fs::write(flat.join("descript.txt"), "name,Flat\n").unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();

        let packages = FsInspector.list_ghost_packages(dir.path()).unwrap();
        assert_eq!(packages, vec![flat, dir.path().join("nanai")]);
        assert!(FsInspector
            .list_ghost_packages(&dir.path().join("does-not-exist"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_package_root_of_descript() {
        assert_eq!(
            package_root(Path::new("ghosts/a/ghost/master/descript.txt")),
            Some(PathBuf::from("ghosts/a"))
        );
        assert_eq!(package_root(Path::new("ghosts/b/descript.txt")), Some(PathBuf::from("ghosts/b")));
    }

    #[test]
    fn test_fs_inspector_missing_package_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = FsInspector
            .list_candidate_paths(&dir.path().join("does-not-exist"))
            .unwrap();
        assert!(paths.is_empty());
        assert_eq!(FsInspector.read_text(&dir.path().join("nope.txt")).unwrap(), None);
    }
}
