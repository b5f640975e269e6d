//! Background transfer worker.
//!
//! A single worker thread drains a bounded FIFO of transfer jobs: bulk
//! copies, ranged reads and fetches through a caller-supplied [`Fetcher`].
//! Callers hold a [`TransferHandle`] to poll progress, wait for completion
//! or request a cooperative abort. Work is chunked so an abort takes effect
//! between chunks, never mid-write.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::paths;

const CHUNK_SIZE: usize = 64 * 1024;

/// Most jobs a queue holds before submission starts failing fast.
const MAX_QUEUED_TRANSFERS: usize = 64;

/// Lifecycle of one background transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Queued, not yet picked up by the worker.
    Pending,
    /// The worker is moving bytes.
    InProgress,
    Done,
    Failed,
    /// The transfer was aborted before completing. Any partial destination
    /// file has been removed.
    Aborted,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Aborted)
    }
}

/// Pluggable byte source for URL fetches. The filesystem itself never
/// speaks any network protocol; a fetcher streams bytes into the sink and
/// reports progress through the callback. Returning `false` from the
/// progress callback tells the fetcher to stop early.
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        sink: &mut dyn Write,
        progress: &mut dyn FnMut(u64, u64) -> bool,
    ) -> io::Result<()>;
}

pub(crate) enum TransferJob {
    /// Copy a whole file between two OS paths.
    Copy { from: PathBuf, to: PathBuf },
    /// Read `length` bytes at `offset` from an OS path into memory.
    Read {
        path: PathBuf,
        offset: u64,
        length: usize,
    },
    /// Stream a URL into a destination file through a fetcher.
    Fetch {
        fetcher: Arc<dyn Fetcher>,
        url: String,
        dest: PathBuf,
    },
}

struct TransferState {
    status: TransferStatus,
    bytes_done: u64,
    bytes_total: u64,
    error: Option<String>,
    data: Option<Vec<u8>>,
}

struct TransferShared {
    state: Mutex<TransferState>,
    done: Condvar,
    abort: AtomicBool,
}

/// Caller-side view of a queued transfer.
#[derive(Clone)]
pub struct TransferHandle {
    shared: Arc<TransferShared>,
}

impl TransferHandle {
    fn new() -> Self {
        Self {
            shared: Arc::new(TransferShared {
                state: Mutex::new(TransferState {
                    status: TransferStatus::Pending,
                    bytes_done: 0,
                    bytes_total: 0,
                    error: None,
                    data: None,
                }),
                done: Condvar::new(),
                abort: AtomicBool::new(false),
            }),
        }
    }

    fn failed(reason: String) -> Self {
        let handle = Self::new();
        {
            let mut state = handle.shared.state.lock();
            state.status = TransferStatus::Failed;
            state.error = Some(reason);
        }
        handle
    }

    pub fn status(&self) -> TransferStatus {
        self.shared.state.lock().status
    }

    /// Bytes moved so far and the expected total (0 when unknown).
    pub fn progress(&self) -> (u64, u64) {
        let state = self.shared.state.lock();
        (state.bytes_done, state.bytes_total)
    }

    /// Request a cooperative abort. The worker notices between chunks.
    pub fn abort(&self) {
        self.shared.abort.store(true, Ordering::Relaxed);
    }

    /// Block until the transfer reaches a terminal status.
    pub fn wait(&self) -> TransferStatus {
        let mut state = self.shared.state.lock();
        while !state.status.is_terminal() {
            self.shared.done.wait(&mut state);
        }
        state.status
    }

    pub fn error(&self) -> Option<String> {
        self.shared.state.lock().error.clone()
    }

    /// Take the bytes produced by a read job, once it is done.
    pub fn take_data(&self) -> Option<Vec<u8>> {
        self.shared.state.lock().data.take()
    }
}

impl TransferShared {
    fn is_aborting(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    fn begin(&self, total: u64) {
        let mut state = self.state.lock();
        state.status = TransferStatus::InProgress;
        state.bytes_total = total;
    }

    fn advance(&self, bytes: u64) {
        self.state.lock().bytes_done += bytes;
    }

    fn finish(&self, status: TransferStatus, error: Option<String>, data: Option<Vec<u8>>) {
        let mut state = self.state.lock();
        state.status = status;
        state.error = error;
        state.data = data;
        self.done.notify_all();
    }
}

struct QueueShared {
    queue: Mutex<VecDeque<(TransferJob, Arc<TransferShared>)>>,
    wake: Condvar,
    shutdown: AtomicBool,
}

/// The owning side of the worker thread. Dropping it drains nothing: the
/// shutdown flag is raised, pending jobs are failed and the thread joined.
pub(crate) struct TransferQueue {
    shared: Arc<QueueShared>,
    worker: Option<JoinHandle<()>>,
}

impl TransferQueue {
    pub(crate) fn start() -> Self {
        let shared = Arc::new(QueueShared {
            queue: Mutex::new(VecDeque::new()),
            wake: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("background-transfer".to_string())
            .spawn(move || worker_loop(worker_shared))
            .ok();
        if worker.is_none() {
            warn!("could not spawn transfer worker, background transfers will fail");
        }
        Self { shared, worker }
    }

    pub(crate) fn submit(&self, job: TransferJob) -> TransferHandle {
        if self.worker.is_none() {
            return TransferHandle::failed("no transfer worker".to_string());
        }
        let mut queue = self.shared.queue.lock();
        if queue.len() >= MAX_QUEUED_TRANSFERS {
            return TransferHandle::failed("transfer queue is full".to_string());
        }
        let handle = TransferHandle::new();
        queue.push_back((job, Arc::clone(&handle.shared)));
        drop(queue);
        self.shared.wake.notify_one();
        handle
    }
}

impl Drop for TransferQueue {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("transfer worker panicked");
        }
    }
}

fn worker_loop(shared: Arc<QueueShared>) {
    loop {
        let next = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if shared.shutdown.load(Ordering::Relaxed) {
                    break None;
                }
                shared.wake.wait(&mut queue);
            }
        };
        let Some((job, transfer)) = next else {
            return;
        };
        if transfer.is_aborting() {
            transfer.finish(TransferStatus::Aborted, None, None);
            continue;
        }
        run_job(job, &transfer);
    }
}

fn run_job(job: TransferJob, transfer: &Arc<TransferShared>) {
    let outcome = match job {
        TransferJob::Copy { from, to } => run_copy(&from, &to, transfer),
        TransferJob::Read {
            path,
            offset,
            length,
        } => run_read(&path, offset, length, transfer),
        TransferJob::Fetch { fetcher, url, dest } => run_fetch(&*fetcher, &url, &dest, transfer),
    };
    match outcome {
        Ok(Some(data)) => transfer.finish(TransferStatus::Done, None, Some(data)),
        Ok(None) => {
            if transfer.is_aborting() {
                transfer.finish(TransferStatus::Aborted, None, None)
            } else {
                transfer.finish(TransferStatus::Done, None, None)
            }
        }
        Err(e) => {
            if transfer.is_aborting() {
                transfer.finish(TransferStatus::Aborted, None, None)
            } else {
                warn!("background transfer failed: {e}");
                transfer.finish(TransferStatus::Failed, Some(e.to_string()), None)
            }
        }
    }
}

fn run_copy(from: &Path, to: &Path, transfer: &Arc<TransferShared>) -> io::Result<Option<Vec<u8>>> {
    debug!("background copy {from:?} -> {to:?}");
    let mut src = File::open(from)?;
    let total = src.metadata()?.len();
    transfer.begin(total);

    paths::create_parents(to)?;
    let mut dst = File::create(to)?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut copied = 0u64;
    loop {
        if transfer.is_aborting() {
            drop(dst);
            let _ = std::fs::remove_file(to);
            return Ok(None);
        }
        let n = src.read(&mut buf)?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n])?;
        copied += n as u64;
        transfer.advance(n as u64);
    }
    if copied != total {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("short copy: expected {total} bytes, moved {copied}"),
        ));
    }
    Ok(None)
}

fn run_read(
    path: &Path,
    offset: u64,
    length: usize,
    transfer: &Arc<TransferShared>,
) -> io::Result<Option<Vec<u8>>> {
    let mut src = File::open(path)?;
    src.seek(SeekFrom::Start(offset))?;
    transfer.begin(length as u64);

    let mut data = vec![0u8; length];
    let mut filled = 0;
    while filled < length {
        if transfer.is_aborting() {
            return Ok(None);
        }
        let end = (filled + CHUNK_SIZE).min(length);
        let n = src.read(&mut data[filled..end])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read: wanted {length} bytes, got {filled}"),
            ));
        }
        filled += n;
        transfer.advance(n as u64);
    }
    Ok(Some(data))
}

fn run_fetch(
    fetcher: &dyn Fetcher,
    url: &str,
    dest: &Path,
    transfer: &Arc<TransferShared>,
) -> io::Result<Option<Vec<u8>>> {
    info!("fetching {url} -> {dest:?}");
    transfer.begin(0);
    paths::create_parents(dest)?;
    let mut sink = File::create(dest)?;

    let progress_transfer = Arc::clone(transfer);
    let mut progress = move |done: u64, total: u64| {
        let mut state = progress_transfer.state.lock();
        state.bytes_done = done;
        state.bytes_total = total;
        drop(state);
        !progress_transfer.is_aborting()
    };

    let result = fetcher.fetch(url, &mut sink, &mut progress);
    if transfer.is_aborting() {
        drop(sink);
        let _ = std::fs::remove_file(dest);
        return Ok(None);
    }
    result.map(|()| None)
}
