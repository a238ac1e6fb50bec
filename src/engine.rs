//! Bounded-concurrency transfer engine.
//!
//! Runs a batch of independent upload/download tasks on a pool of scoped
//! worker threads. Every submitted task yields exactly one outcome; a
//! failing task never aborts its siblings. Workers report per-chunk
//! progress through a [`ProgressReporter`] and the caller drains the
//! matching receiver.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use walkdir::WalkDir;

use crate::codec;
use crate::error::SkiffError;
use crate::progress::ProgressReporter;
use crate::store::ObjectStore;

/// Default worker count for download batches.
pub const DOWNLOAD_JOBS: usize = 5;
/// Default worker count for upload batches.
pub const UPLOAD_JOBS: usize = 10;

/// Streaming chunk size: 5 MiB.
const CHUNK_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// One unit of transfer work: one file, one direction.
#[derive(Debug)]
pub struct TransferTask {
    pub id: u64,
    pub bucket: String,
    pub key: String,
    pub local_path: PathBuf,
    pub direction: Direction,
    pub status: TaskStatus,
}

impl TransferTask {
    pub fn remote_path(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }
}

/// Terminal record for one task: the task in its final status, plus the
/// error when it failed.
#[derive(Debug)]
pub struct TransferOutcome {
    pub task: TransferTask,
    pub error: Option<SkiffError>,
}

pub struct TransferEngine {
    concurrency: usize,
    chunk_size: usize,
    cancel: Arc<AtomicBool>,
}

impl TransferEngine {
    /// Engine with the given concurrency limit (clamped to at least 1).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            chunk_size: CHUNK_SIZE,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the streaming chunk size. Tests use small chunks to
    /// observe multiple progress events on small payloads.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Handle for cooperative cancellation. Setting the flag stops tasks
    /// at the next chunk boundary; nothing is interrupted mid-chunk and
    /// already-finished tasks are unaffected.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run a batch to completion.
    ///
    /// At most `concurrency` tasks run at once; the rest wait in a shared
    /// queue. Returns one outcome per submitted task, in completion order.
    pub fn run(
        &self,
        store: &dyn ObjectStore,
        tasks: Vec<TransferTask>,
        reporter: ProgressReporter,
    ) -> Vec<TransferOutcome> {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }
        tracing::debug!(tasks = total, workers = self.concurrency.min(total), "starting batch");

        let queue = Mutex::new(VecDeque::from(tasks));
        let (done_tx, done_rx) = mpsc::channel();

        std::thread::scope(|scope| {
            for _ in 0..self.concurrency.min(total) {
                let done_tx = done_tx.clone();
                let reporter = reporter.clone();
                let queue = &queue;
                scope.spawn(move || loop {
                    let mut task = match queue.lock().unwrap().pop_front() {
                        Some(task) => task,
                        None => break,
                    };
                    task.status = TaskStatus::Running;
                    let (bytes, error) = self.run_one(store, &task, &reporter);
                    match &error {
                        None => {
                            task.status = TaskStatus::Done;
                            reporter.finished(
                                task.id,
                                bytes,
                                format!("'{}' done", task.remote_path()),
                            );
                        }
                        Some(err) => {
                            task.status = TaskStatus::Failed;
                            tracing::warn!(path = %task.remote_path(), "transfer failed: {}", err);
                            reporter.failed(
                                task.id,
                                bytes,
                                format!("'{}' failed: {}", task.remote_path(), err),
                            );
                        }
                    }
                    let _ = done_tx.send(TransferOutcome { task, error });
                });
            }
            drop(done_tx);
            drop(reporter);
        });

        // All workers have exited, so the channel is closed and drained
        // without blocking. One outcome per task, always.
        done_rx.iter().collect()
    }

    /// Execute one task, returning the bytes moved and the error if any.
    ///
    /// Bytes are tracked separately from the error so a partial transfer
    /// still reports how far it got.
    fn run_one(
        &self,
        store: &dyn ObjectStore,
        task: &TransferTask,
        reporter: &ProgressReporter,
    ) -> (u64, Option<SkiffError>) {
        let result = match task.direction {
            Direction::Download => self.download(store, task, reporter),
            Direction::Upload => self.upload(store, task, reporter),
        };
        match result {
            Ok(bytes) => (bytes, None),
            Err((bytes, err)) => (bytes, Some(err)),
        }
    }

    fn download(
        &self,
        store: &dyn ObjectStore,
        task: &TransferTask,
        reporter: &ProgressReporter,
    ) -> Result<u64, (u64, SkiffError)> {
        let (mut body, total) = store
            .get_object(&task.bucket, &task.key)
            .map_err(|e| (0, e))?;

        // Safe under concurrent creation of a shared ancestor by two tasks
        if let Some(parent) = task.local_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| (0, self.io_err(task, e)))?;
        }
        let mut file =
            std::fs::File::create(&task.local_path).map_err(|e| (0, self.io_err(task, e)))?;

        let mut buf = vec![0u8; self.chunk_size];
        let mut transferred = 0u64;
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Err((transferred, self.cancelled_err(task)));
            }
            let n = read_chunk(&mut body, &mut buf)
                .map_err(|e| (transferred, self.io_err(task, e)))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])
                .map_err(|e| (transferred, self.io_err(task, e)))?;
            transferred += n as u64;
            reporter.transferred(task.id, transferred, total);
        }
        Ok(transferred)
    }

    fn upload(
        &self,
        store: &dyn ObjectStore,
        task: &TransferTask,
        reporter: &ProgressReporter,
    ) -> Result<u64, (u64, SkiffError)> {
        let file = std::fs::File::open(&task.local_path)
            .map_err(|e| (0, self.io_err(task, e)))?;
        let len = file
            .metadata()
            .map_err(|e| (0, self.io_err(task, e)))?
            .len();

        let mut reader = CountingReader {
            inner: file,
            reporter,
            task_id: task.id,
            total: Some(len),
            transferred: 0,
            cancel: &self.cancel,
        };
        store
            .put_object(&task.bucket, &task.key, &mut reader, Some(len))
            .map_err(|e| (reader.transferred, e))?;
        Ok(reader.transferred)
    }

    fn io_err(&self, task: &TransferTask, err: std::io::Error) -> SkiffError {
        SkiffError::Transfer {
            path: task.remote_path(),
            reason: err.to_string(),
        }
    }

    fn cancelled_err(&self, task: &TransferTask) -> SkiffError {
        SkiffError::Transfer {
            path: task.remote_path(),
            reason: "cancelled".to_string(),
        }
    }
}

/// Fill `buf` as far as the reader allows, stopping at EOF.
///
/// Plain `read` may return short counts; looping keeps download chunks at
/// their fixed size so progress events land once per chunk, not once per
/// short read.
fn read_chunk(reader: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Wraps an upload source and reports cumulative bytes as they are read,
/// checking the cancellation flag between reads.
struct CountingReader<'a, R: Read> {
    inner: R,
    reporter: &'a ProgressReporter,
    task_id: u64,
    total: Option<u64>,
    transferred: u64,
    cancel: &'a AtomicBool,
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "cancelled",
            ));
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.transferred += n as u64;
            self.reporter
                .transferred(self.task_id, self.transferred, self.total);
        }
        Ok(n)
    }
}

/// Map selected remote paths to download tasks.
///
/// Malformed paths and `..` segments are rejected here, before anything
/// is scheduled, so the engine only ever sees local paths inside
/// `output_root`.
pub fn plan_downloads(
    paths: &[String],
    output_root: &Path,
) -> Result<Vec<TransferTask>, SkiffError> {
    let mut tasks = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        let (bucket, key) = codec::split_remote(path)?;
        let local_path = codec::remote_to_local(path, output_root)?;
        tasks.push(TransferTask {
            id: i as u64,
            bucket: bucket.to_string(),
            key: key.to_string(),
            local_path,
            direction: Direction::Download,
            status: TaskStatus::Pending,
        });
    }
    Ok(tasks)
}

/// Map local files and directories to upload tasks.
///
/// Directories are walked recursively; each file's key is its path
/// relative to the directory, `/`-joined, under `prefix`.
pub fn plan_uploads(
    sources: &[PathBuf],
    bucket: &str,
    prefix: &str,
) -> Result<Vec<TransferTask>, SkiffError> {
    let mut tasks = Vec::new();
    let mut next_id = 0u64;
    let mut push = |tasks: &mut Vec<TransferTask>, key: String, local_path: PathBuf| {
        tasks.push(TransferTask {
            id: next_id,
            bucket: bucket.to_string(),
            key,
            local_path,
            direction: Direction::Upload,
            status: TaskStatus::Pending,
        });
        next_id += 1;
    };

    for source in sources {
        let meta = std::fs::metadata(source)?;
        if meta.is_file() {
            let name = source
                .file_name()
                .ok_or_else(|| SkiffError::Transfer {
                    path: source.display().to_string(),
                    reason: "source has no file name".to_string(),
                })?
                .to_string_lossy()
                .to_string();
            push(&mut tasks, join_key(prefix, &name), source.clone());
        } else {
            for entry in WalkDir::new(source) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(source)
                    .expect("walkdir entry under its root");
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                push(&mut tasks, join_key(prefix, &key), entry.path().to_path_buf());
            }
        }
    }
    Ok(tasks)
}

fn join_key(prefix: &str, rest: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", prefix, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::progress_channel;
    use crate::store::memory::MemoryStore;
    use tempfile::TempDir;

    fn download_tasks(paths: &[&str], root: &Path) -> Vec<TransferTask> {
        let owned: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        plan_downloads(&owned, root).unwrap()
    }

    #[test]
    fn batch_downloads_every_file() {
        let store = MemoryStore::new();
        store.insert("b", "a/one.bin", &vec![1u8; 4096]);
        store.insert("b", "a/two.bin", &vec![2u8; 100]);
        store.insert("b", "three.bin", b"");

        let out = TempDir::new().unwrap();
        let tasks = download_tasks(&["b/a/one.bin", "b/a/two.bin", "b/three.bin"], out.path());
        let (reporter, rx) = progress_channel();
        let outcomes = TransferEngine::new(2).run(&store, tasks, reporter);
        drop(rx);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.error.is_none()));
        assert!(outcomes
            .iter()
            .all(|o| o.task.status == TaskStatus::Done));
        assert_eq!(
            std::fs::read(out.path().join("a/one.bin")).unwrap().len(),
            4096
        );
        assert_eq!(
            std::fs::read(out.path().join("a/two.bin")).unwrap().len(),
            100
        );
        assert_eq!(std::fs::read(out.path().join("three.bin")).unwrap().len(), 0);
    }

    #[test]
    fn failures_are_isolated_and_counted() {
        let store = MemoryStore::new();
        store.insert("b", "good1.bin", b"alpha");
        store.insert("b", "bad.bin", b"beta");
        store.insert("b", "good2.bin", b"gamma");
        store.poison("b", "bad.bin");

        let out = TempDir::new().unwrap();
        let tasks = download_tasks(&["b/good1.bin", "b/bad.bin", "b/good2.bin"], out.path());
        let (reporter, rx) = progress_channel();
        let outcomes = TransferEngine::new(3).run(&store, tasks, reporter);
        drop(rx);

        assert_eq!(outcomes.len(), 3);
        let failed: Vec<_> = outcomes.iter().filter(|o| o.error.is_some()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].task.key, "bad.bin");
        assert_eq!(failed[0].task.status, TaskStatus::Failed);
        // Survivors hit disk with the right contents
        assert_eq!(std::fs::read(out.path().join("good1.bin")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(out.path().join("good2.bin")).unwrap(), b"gamma");
    }

    #[test]
    fn missing_object_yields_not_found_outcome() {
        let store = MemoryStore::new();
        store.insert("b", "present.bin", b"x");

        let out = TempDir::new().unwrap();
        let tasks = download_tasks(&["b/absent.bin"], out.path());
        let (reporter, rx) = progress_channel();
        let outcomes = TransferEngine::new(1).run(&store, tasks, reporter);
        drop(rx);

        assert_eq!(outcomes.len(), 1);
        match outcomes[0].error.as_ref().unwrap() {
            SkiffError::ObjectNotFound { key, .. } => assert_eq!(key, "absent.bin"),
            other => panic!("Expected ObjectNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn chunked_download_emits_monotone_progress_and_one_terminal() {
        let store = MemoryStore::new();
        store.insert("b", "file.bin", &vec![7u8; 1000]);

        let out = TempDir::new().unwrap();
        let tasks = download_tasks(&["b/file.bin"], out.path());
        let (reporter, rx) = progress_channel();
        let engine = TransferEngine::new(1).with_chunk_size(64);
        let outcomes = engine.run(&store, tasks, reporter);
        assert!(outcomes[0].error.is_none());

        let events: Vec<_> = rx.iter().collect();
        let terminals = events.iter().filter(|e| e.terminal).count();
        assert_eq!(terminals, 1);
        assert!(events.last().unwrap().terminal);
        // 1000 bytes in 64-byte chunks: more than one chunk event
        assert!(events.len() > 2);
        let mut last = 0u64;
        for event in &events {
            assert!(event.bytes >= last, "progress regressed");
            last = event.bytes;
        }
        assert_eq!(last, 1000);
    }

    #[test]
    fn upload_round_trips_through_store() {
        let store = MemoryStore::new();
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("report.txt");
        std::fs::write(&src, b"quarterly numbers").unwrap();

        let tasks = plan_uploads(&[src], "b", "docs/2024").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].key, "docs/2024/report.txt");

        let (reporter, rx) = progress_channel();
        let outcomes = TransferEngine::new(UPLOAD_JOBS).run(&store, tasks, reporter);
        drop(rx);

        assert!(outcomes[0].error.is_none());
        assert_eq!(
            store.contents("b", "docs/2024/report.txt").unwrap(),
            b"quarterly numbers"
        );
    }

    #[test]
    fn plan_uploads_walks_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("data/sub")).unwrap();
        std::fs::write(dir.path().join("data/a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("data/sub/b.txt"), b"b").unwrap();

        let tasks = plan_uploads(&[dir.path().join("data")], "b", "").unwrap();
        let mut keys: Vec<&str> = tasks.iter().map(|t| t.key.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["a.txt", "sub/b.txt"]);
        assert!(tasks.iter().all(|t| t.direction == Direction::Upload));
    }

    #[test]
    fn plan_downloads_rejects_bad_paths_before_scheduling() {
        let out = TempDir::new().unwrap();
        let paths = vec!["no-separator".to_string()];
        assert!(plan_downloads(&paths, out.path()).is_err());

        let paths = vec!["b/../escape.txt".to_string()];
        assert!(plan_downloads(&paths, out.path()).is_err());
    }

    #[test]
    fn cancellation_stops_queued_tasks() {
        let store = MemoryStore::new();
        for i in 0..8 {
            store.insert("b", &format!("f{}.bin", i), &vec![0u8; 256]);
        }

        let out = TempDir::new().unwrap();
        let paths: Vec<String> = (0..8).map(|i| format!("b/f{}.bin", i)).collect();
        let tasks = plan_downloads(&paths, out.path()).unwrap();

        let engine = TransferEngine::new(1).with_chunk_size(64);
        engine.cancel_flag().store(true, Ordering::SeqCst);
        let (reporter, rx) = progress_channel();
        let outcomes = engine.run(&store, tasks, reporter);
        drop(rx);

        // Still one outcome per task; all cancelled before their first chunk
        assert_eq!(outcomes.len(), 8);
        assert!(outcomes.iter().all(|o| o.error.is_some()));
        assert!(outcomes
            .iter()
            .all(|o| o.task.status == TaskStatus::Failed));
    }

    #[test]
    fn empty_batch_returns_no_outcomes() {
        let store = MemoryStore::new();
        let (reporter, rx) = progress_channel();
        let outcomes = TransferEngine::new(4).run(&store, Vec::new(), reporter);
        assert!(outcomes.is_empty());
        assert_eq!(rx.iter().count(), 0);
    }
}
