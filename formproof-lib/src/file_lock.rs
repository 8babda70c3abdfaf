//! Exclusive file locking shared by the file-backed stores.
//!
//! Every read-modify-write cycle runs while holding an fs2 exclusive lock on
//! a sidecar `.lock` file, so concurrent handles (in this process or in
//! another one) never interleave their updates. Data files are replaced
//! with a write-to-temp-then-rename so a crash mid-write leaves the previous
//! state intact.
//!
//! The lock is polled with `try_lock_exclusive` and an async sleep rather
//! than taken with a blocking call, so a caller's timeout can fire while
//! another handle holds it.

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

use crate::{NotaryError, Result};

/// Service name used in dependency errors from file stores.
pub(crate) const STORAGE_SERVICE: &str = "file storage";

/// Delay between attempts to take a contended lock.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) fn io_error(context: &str, path: &Path, e: std::io::Error) -> NotaryError {
    NotaryError::unavailable(
        STORAGE_SERVICE,
        format!("{} {}: {}", context, path.display(), e),
    )
}

/// Run `f` while holding an exclusive lock on `lock_path`.
///
/// Waiting for the lock yields to the runtime; dropping the returned future
/// while it waits leaves nothing locked.
pub(crate) async fn with_exclusive_lock<T>(
    lock_path: &Path,
    f: impl FnOnce() -> Result<T> + Send,
) -> Result<T> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(|e| io_error("cannot open lock file", lock_path, e))?;

    loop {
        match file.try_lock_exclusive() {
            Ok(()) => break,
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                tokio::time::sleep(LOCK_POLL_INTERVAL).await;
            }
            Err(e) => return Err(io_error("cannot lock", lock_path, e)),
        }
    }

    let result = f();

    file.unlock()
        .map_err(|e| io_error("cannot unlock", lock_path, e))?;
    result
}

/// Read a JSON document, returning the default value when the file does not
/// exist or is empty.
pub(crate) fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(T::default()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            NotaryError::Internal(format!("corrupt store file {}: {}", path.display(), e))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(io_error("cannot read", path, e)),
    }
}

/// Atomically replace a JSON document.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json).map_err(|e| io_error("cannot write", &tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_error("cannot replace", path, e))
}
