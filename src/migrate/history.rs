//! Applied-migration history.
//!
//! Persisted as one `<name>:<sha256-hex>` line per applied migration, in the
//! order they were applied. Every mutation rewrites the whole file while
//! holding the store's lock, so two writers in one process never interleave.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{MigrateError, MigrateResult};
use crate::migrate::checksum::is_checksum;

#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Mutex<Vec<(String, String)>>,
}

impl HistoryStore {
    /// Load the history at `path`. A missing file is an empty history.
    pub fn open(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => parse(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), applied = entries.len(), "history loaded");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recorded checksum for a migration, if it has been applied.
    pub fn checksum(&self, name: &str) -> Option<String> {
        self.entries
            .lock()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, sum)| sum.clone())
    }

    pub fn is_applied(&self, name: &str) -> bool {
        self.entries.lock().iter().any(|(n, _)| n == name)
    }

    /// Applied migration names, oldest first.
    pub fn applied(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(n, _)| n.clone()).collect()
    }

    /// Migrations applied before `name`, oldest first. Every applied
    /// migration when `name` has not been applied.
    pub fn applied_before(&self, name: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|(n, _)| n.clone())
            .take_while(|n| n != name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Append `name`. A migration already recorded keeps its position.
    pub fn record(&self, name: &str, checksum: &str) -> MigrateResult<()> {
        self.update(|entries| match entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = checksum.to_string(),
            None => entries.push((name.to_string(), checksum.to_string())),
        })
    }

    pub fn remove(&self, name: &str) -> MigrateResult<bool> {
        let mut removed = false;
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|(n, _)| n != name);
            removed = entries.len() != before;
        })?;
        Ok(removed)
    }

    pub fn clear(&self) -> MigrateResult<()> {
        self.update(|entries| entries.clear())
    }

    /// Apply `f` to a copy, persist it, then publish it in memory.
    fn update(&self, f: impl FnOnce(&mut Vec<(String, String)>)) -> MigrateResult<()> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        f(&mut next);
        fs::write(&self.path, render(&next))?;
        *entries = next;
        Ok(())
    }
}

/// Parse history file content, keeping line order. Blank lines are skipped.
pub fn parse(content: &str) -> MigrateResult<Vec<(String, String)>> {
    let mut entries: Vec<(String, String)> = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let (name, sum) = line.rsplit_once(':').ok_or_else(|| MigrateError::CorruptHistory {
            line: idx + 1,
            message: "expected <name>:<checksum>".to_string(),
        })?;
        if name.is_empty() {
            return Err(MigrateError::CorruptHistory {
                line: idx + 1,
                message: "empty migration name".to_string(),
            });
        }
        if !is_checksum(sum) {
            return Err(MigrateError::CorruptHistory {
                line: idx + 1,
                message: format!("invalid checksum '{}'", sum),
            });
        }
        if entries.iter().any(|(n, _)| n == name) {
            return Err(MigrateError::CorruptHistory {
                line: idx + 1,
                message: format!("duplicate entry for '{}'", name),
            });
        }
        entries.push((name.to_string(), sum.to_string()));
    }
    Ok(entries)
}

pub fn render(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .map(|(name, sum)| format!("{}:{}\n", name, sum))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::checksum::checksum;

    #[test]
    fn test_parse_and_render() {
        let a = checksum(b"a");
        let b = checksum(b"b");
        let content = format!("\n002_b:{}\n001_a:{}\n", b, a);
        let entries = parse(&content).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], ("001_a".to_string(), a.clone()));
        assert_eq!(render(&entries), format!("002_b:{}\n001_a:{}\n", b, a));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse("001_a:deadbeef").unwrap_err();
        assert!(matches!(err, MigrateError::CorruptHistory { line: 1, .. }));

        let err = parse(&format!("ok:{}\nno-separator", checksum(b""))).unwrap_err();
        assert!(matches!(err, MigrateError::CorruptHistory { line: 2, .. }));

        let sum = checksum(b"");
        let err = parse(&format!("a:{}\na:{}\n", sum, sum)).unwrap_err();
        assert!(matches!(err, MigrateError::CorruptHistory { line: 2, .. }));
    }

    #[test]
    fn test_application_order_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let store = HistoryStore::open(&path).unwrap();
        store.record("002_b", &checksum(b"b")).unwrap();
        store.record("001_a", &checksum(b"a")).unwrap();
        store.record("003_c", &checksum(b"c")).unwrap();
        store.record("002_b", &checksum(b"b")).unwrap();

        let reopened = HistoryStore::open(&path).unwrap();
        assert_eq!(reopened.applied(), vec!["002_b", "001_a", "003_c"]);
        assert_eq!(reopened.applied_before("001_a"), vec!["002_b"]);
        assert_eq!(reopened.applied_before("004_d"), vec!["002_b", "001_a", "003_c"]);
    }

    #[test]
    fn test_concurrent_records_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let store = HistoryStore::open(&path).unwrap();

        std::thread::scope(|s| {
            for i in 0..16 {
                let store = &store;
                s.spawn(move || {
                    let name = format!("{:03}_step", i);
                    store.record(&name, &checksum(name.as_bytes())).unwrap();
                });
            }
        });

        let reopened = HistoryStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 16);
        for i in 0..16 {
            let name = format!("{:03}_step", i);
            assert_eq!(reopened.checksum(&name), Some(checksum(name.as_bytes())));
        }
    }

    #[test]
    fn test_record_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let sum = checksum(b"x");

        let store = HistoryStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.record("001_init", &sum).unwrap();
        assert!(store.is_applied("001_init"));

        let reopened = HistoryStore::open(&path).unwrap();
        assert_eq!(reopened.checksum("001_init"), Some(sum));
        assert_eq!(reopened.applied(), vec!["001_init".to_string()]);
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("history")).unwrap();
        store.record("a", &checksum(b"a")).unwrap();
        store.record("b", &checksum(b"b")).unwrap();

        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        assert_eq!(store.len(), 1);

        store.clear().unwrap();
        assert!(HistoryStore::open(store.path()).unwrap().is_empty());
    }

    #[test]
    fn test_failed_write_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("missing").join("history")).unwrap();
        assert!(store.record("a", &checksum(b"a")).is_err());
        assert!(store.is_empty());
    }
}
