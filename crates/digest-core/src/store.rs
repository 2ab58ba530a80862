//! The shared buffer of pending records.
//!
//! Ingestion appends and the dispatcher drains. Both go through one mutex, so
//! a drain sees either all or none of a concurrent append.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::record::EventRecord;

/// Pending records between two flushes, optionally backed by an append-only log.
#[derive(Debug)]
pub struct BufferStore {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    records: Vec<EventRecord>,
    log: Option<LogFile>,
}

#[derive(Debug)]
struct LogFile {
    path: PathBuf,
    file: File,
    len: u64,
}

impl BufferStore {
    /// Create a store that keeps records in memory only.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                log: None,
            }),
        }
    }

    /// Open (or create) a durable store backed by the log at `path`.
    ///
    /// Records left over from a previous run are reloaded in their original
    /// order. Undecodable lines are skipped and a torn trailing line is cut off.
    pub fn open_log(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        Self::with_log_file(path, file)
    }

    /// Build a durable store on a log file the caller already opened.
    ///
    /// `file` must be positioned at the start and opened for reading. Appends
    /// and drains fail with [`StoreError::Io`] if it is not also writable.
    pub fn with_log_file(path: impl Into<PathBuf>, mut file: File) -> Result<Self, StoreError> {
        let path = path.into();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        let valid_len = contents
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |pos| pos + 1);
        if valid_len < contents.len() {
            warn!(
                path = %path.display(),
                dropped_bytes = contents.len() - valid_len,
                "Truncating torn tail of buffer log"
            );
            file.set_len(valid_len as u64)?;
            file.sync_all()?;
        }

        let mut records = Vec::new();
        for (index, raw) in contents[..valid_len].split(|b| *b == b'\n').enumerate() {
            if raw.is_empty() {
                continue;
            }
            let decoded = std::str::from_utf8(raw)
                .map_err(|e| e.to_string())
                .and_then(|line| EventRecord::from_log_line(line).map_err(|e| e.to_string()));
            match decoded {
                Ok(record) => records.push(record),
                Err(error) => warn!(line = index + 1, %error, "Skipping unreadable buffer log line"),
            }
        }

        info!(path = %path.display(), recovered = records.len(), "Opened buffer log");

        Ok(Self {
            inner: Mutex::new(Inner {
                records,
                log: Some(LogFile {
                    path,
                    file,
                    len: valid_len as u64,
                }),
            }),
        })
    }

    /// Append a record at the end of the buffer.
    ///
    /// In durable mode the line is written and synced before the record becomes
    /// visible to `drain`. On error the record is not accepted.
    pub fn append(&self, record: EventRecord) -> Result<(), StoreError> {
        let mut inner = self.lock();

        if let Some(log) = inner.log.as_mut() {
            log.write_line(&record.to_log_line())?;
        }

        debug!(title = %record.title(), year = record.year(), "Buffered record");
        inner.records.push(record);
        Ok(())
    }

    /// Take every pending record, in arrival order, and leave the store empty.
    ///
    /// In durable mode the log is truncated and synced first; if that fails the
    /// records stay in the store.
    pub fn drain(&self) -> Result<Vec<EventRecord>, StoreError> {
        let mut inner = self.lock();

        if let Some(log) = inner.log.as_mut() {
            log.clear()?;
        }

        Ok(std::mem::take(&mut inner.records))
    }

    /// Number of pending records. For diagnostics only.
    pub fn snapshot_size(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Path of the backing log, if durable.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.lock().log.as_ref().map(|log| log.path.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves `Inner` consistent: every
        // mutation is a single push/take after its I/O succeeded.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogFile {
    fn write_line(&mut self, line: &str) -> Result<(), StoreError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        let written = self
            .file
            .write_all(&bytes)
            .and_then(|_| self.file.sync_data());

        if let Err(e) = written {
            // Cut off any partial line so the next append starts clean.
            if let Err(rollback) = self.file.set_len(self.len) {
                warn!(path = %self.path.display(), error = %rollback, "Failed to roll back buffer log");
            }
            return Err(e.into());
        }

        self.len += bytes.len() as u64;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.file.set_len(0)?;
        self.len = 0;
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;

    use tempfile::tempdir;

    use super::*;

    fn record(title: &str, year: i32) -> EventRecord {
        EventRecord::new(title, year, None).unwrap()
    }

    #[test]
    fn test_drain_empty_store() {
        let store = BufferStore::in_memory();
        assert!(store.drain().unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let store = BufferStore::in_memory();
        store.append(record("Inception", 2010)).unwrap();
        store.append(record("Dune", 2021)).unwrap();
        store.append(record("Inception", 2010)).unwrap();
        assert_eq!(store.snapshot_size(), 3);

        let drained = store.drain().unwrap();
        let titles: Vec<_> = drained.iter().map(|r| r.title()).collect();
        assert_eq!(titles, ["Inception", "Dune", "Inception"]);
        assert_eq!(store.snapshot_size(), 0);
        assert!(store.drain().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_append_and_drain_loses_nothing() {
        const WRITERS: usize = 8;
        const PER_WRITER: usize = 250;

        let store = Arc::new(BufferStore::in_memory());

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..PER_WRITER {
                        store.append(record(&format!("w{}-{}", w, i), 2000)).unwrap();
                    }
                })
            })
            .collect();

        let drainer = {
            let store = store.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..200 {
                    seen.extend(store.drain().unwrap());
                    thread::yield_now();
                }
                seen
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        let mut seen = drainer.join().unwrap();
        seen.extend(store.drain().unwrap());

        let mut counts: HashMap<String, usize> = HashMap::new();
        for r in &seen {
            *counts.entry(r.title().to_string()).or_default() += 1;
        }
        assert_eq!(seen.len(), WRITERS * PER_WRITER);
        assert!(counts.values().all(|&c| c == 1));

        // Per-writer order survives even when drains split the sequence.
        for w in 0..WRITERS {
            let prefix = format!("w{}-", w);
            let indices: Vec<usize> = seen
                .iter()
                .filter_map(|r| r.title().strip_prefix(&prefix))
                .map(|i| i.parse().unwrap())
                .collect();
            assert_eq!(indices, (0..PER_WRITER).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_log_survives_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("buffer.log");

        {
            let store = BufferStore::open_log(&path).unwrap();
            store.append(record("Inception", 2010)).unwrap();
            store
                .append(EventRecord::new("Dune", 2021, Some("img1".to_string())).unwrap())
                .unwrap();
        }

        let store = BufferStore::open_log(&path).unwrap();
        assert_eq!(store.log_path(), Some(path.clone()));
        let drained = store.drain().unwrap();
        assert_eq!(
            drained,
            vec![
                record("Inception", 2010),
                EventRecord::new("Dune", 2021, Some("img1".to_string())).unwrap(),
            ]
        );
    }

    #[test]
    fn test_drain_clears_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("buffer.log");

        {
            let store = BufferStore::open_log(&path).unwrap();
            store.append(record("Inception", 2010)).unwrap();
            assert_eq!(store.drain().unwrap().len(), 1);
            store.append(record("Dune", 2021)).unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "Dune;2021;\n");
        let store = BufferStore::open_log(&path).unwrap();
        assert_eq!(store.drain().unwrap(), vec![record("Dune", 2021)]);
    }

    #[test]
    fn test_failed_clear_keeps_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("buffer.log");
        {
            let store = BufferStore::open_log(&path).unwrap();
            store.append(record("Inception", 2010)).unwrap();
            store.append(record("Dune", 2021)).unwrap();
        }

        // A read-only handle cannot be truncated.
        let store = BufferStore::with_log_file(&path, File::open(&path).unwrap()).unwrap();
        assert_eq!(store.snapshot_size(), 2);

        assert!(matches!(store.drain(), Err(StoreError::Io(_))));
        assert_eq!(store.snapshot_size(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Inception;2010;\nDune;2021;\n");

        drop(store);
        let store = BufferStore::open_log(&path).unwrap();
        assert_eq!(store.drain().unwrap(), vec![record("Inception", 2010), record("Dune", 2021)]);
    }

    #[test]
    fn test_failed_append_is_not_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("buffer.log");
        fs::write(&path, "Inception;2010;\n").unwrap();

        let store = BufferStore::with_log_file(&path, File::open(&path).unwrap()).unwrap();
        assert!(matches!(store.append(record("Dune", 2021)), Err(StoreError::Io(_))));

        assert_eq!(store.snapshot_size(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Inception;2010;\n");
    }

    #[test]
    fn test_log_len_tracks_file_across_drains() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("buffer.log");
        let store = BufferStore::open_log(&path).unwrap();

        let tracked = |store: &BufferStore| store.lock().log.as_ref().unwrap().len;
        let on_disk = || fs::metadata(&path).unwrap().len();

        store.append(record("Inception", 2010)).unwrap();
        assert_eq!(tracked(&store), on_disk());

        store.drain().unwrap();
        assert_eq!(tracked(&store), 0);
        assert_eq!(on_disk(), 0);

        store.append(record("Dune", 2021)).unwrap();
        assert_eq!(tracked(&store), on_disk());
        assert_eq!(on_disk(), "Dune;2021;\n".len() as u64);
    }

    #[test]
    fn test_open_log_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/state/buffer.log");

        let store = BufferStore::open_log(&path).unwrap();
        assert!(store.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_open_log_skips_bad_lines_and_torn_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("buffer.log");
        fs::write(&path, "Inception;2010;\nnot a record\nDune;2021;img1\nAlien;19").unwrap();

        let store = BufferStore::open_log(&path).unwrap();
        assert_eq!(store.snapshot_size(), 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Inception;2010;\nnot a record\nDune;2021;img1\n"
        );

        store.append(record("Alien", 1979)).unwrap();
        drop(store);

        let store = BufferStore::open_log(&path).unwrap();
        let titles: Vec<_> = store
            .drain()
            .unwrap()
            .into_iter()
            .map(|r| r.title().to_string())
            .collect();
        assert_eq!(titles, ["Inception", "Dune", "Alien"]);
    }
}
