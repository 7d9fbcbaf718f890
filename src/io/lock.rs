use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::debug;

/// Name of the lock file inside `.tracker/`
pub const LOCK_FILE: &str = ".lock";

/// How long write commands wait for another `pt` process by default
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive advisory lock on a store directory, held for the duration of
/// one read-modify-write of the document.
///
/// The holder's pid is written into the lock file so a waiting process can
/// say who it is waiting for. Concurrent writers are serialized; the last
/// one to take the lock wins.
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("could not acquire lock on {path} within {waited_ms} ms: {holder}")]
    Timeout {
        path: PathBuf,
        waited_ms: u128,
        holder: String,
    },
}

impl StoreLock {
    /// Lock `dir`, retrying until `timeout` has passed.
    pub fn acquire(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = dir.join(LOCK_FILE);
        let open_err = |source| LockError::Open {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(open_err)?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(()) => break,
                Err(e) if e.kind() != io::ErrorKind::WouldBlock => return Err(open_err(e)),
                Err(_) if start.elapsed() < timeout => std::thread::sleep(RETRY_INTERVAL),
                Err(_) => {
                    return Err(LockError::Timeout {
                        holder: describe_holder(&mut file),
                        waited_ms: start.elapsed().as_millis(),
                        path: path.clone(),
                    });
                }
            }
        }

        record_holder(&mut file).map_err(open_err)?;
        debug!("event=lock_acquire status=ok path={}", path.display());
        Ok(StoreLock { file, path })
    }

    /// Lock `dir` with [`DEFAULT_TIMEOUT`].
    pub fn acquire_default(dir: &Path) -> Result<Self, LockError> {
        Self::acquire(dir, DEFAULT_TIMEOUT)
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // flock is released when the file closes; clear the stale pid first
        let _ = self.file.set_len(0);
        debug!("event=lock_release status=ok path={}", self.path.display());
    }
}

fn record_holder(file: &mut File) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    write!(file, "{}", std::process::id())?;
    file.flush()
}

fn describe_holder(file: &mut File) -> String {
    let mut text = String::new();
    let pid = file
        .seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_string(&mut text))
        .ok()
        .and_then(|_| text.trim().parse::<u32>().ok());
    match pid {
        Some(pid) => format!("held by pt process {}", pid),
        None => "another pt process may be writing".to_string(),
    }
}

/// Try to take an exclusive flock on the file without blocking.
#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> io::Result<()> {
    Ok(())
}
