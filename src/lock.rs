//! Sentinel-file advisory locking for writers.
//!
//! A lock is a small text file next to the data file (`<path>-lock`) holding
//! two lines: an RFC 3339 expiration timestamp and a random key. A process
//! owns the lock only while it holds the matching key. The scheme is
//! cooperative: it excludes nothing from a writer that does not take the
//! lock, and readers never take it.
//!
//! # Known limitation
//!
//! Removing an expired sentinel and creating a fresh one is not atomic
//! across processes. Two writers can both observe the same expired lock,
//! both remove it, and both believe they acquired it. The window is narrow
//! and the format's correctness outside of it does not depend on perfect
//! mutual exclusion, so the race is documented rather than engineered away.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::error::{Result, VhsbError};

/// Interval between polls while a live lock is held by someone else.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Advisory mutual exclusion consumed by the writer.
///
/// The trait exists so a writer can be handed an alternative coordination
/// scheme (or a no-op one in tests); [`FileLock`] is the default
/// implementation used by [`crate::write`].
pub trait LockService {
    /// Tries to take the lock at `path`, polling up to `max_retries` times
    /// while an unexpired lock is present. Returns `Ok(Some(key))` on
    /// success and `Ok(None)` when the lock stayed busy.
    fn acquire(&self, path: &Path, max_retries: u32, expiration: Duration)
        -> Result<Option<String>>;

    /// Releases the lock taken with `key`. Returns `Ok(true)` if the lock
    /// was removed or was already absent, `Ok(false)` on a key mismatch
    /// (someone else holds it now).
    fn release(&self, path: &Path, key: &str) -> Result<bool>;
}

/// The sentinel-file lock service.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use vhsb::lock::{FileLock, LockService};
///
/// let dir = std::env::temp_dir();
/// let path = dir.join("doc_filelock.vhsb-lock");
/// # std::fs::remove_file(&path).ok();
/// let service = FileLock::new();
///
/// let key = service.acquire(&path, 1, Duration::from_secs(60))?.unwrap();
/// // A second acquisition against the live lock reports busy.
/// assert!(service.acquire(&path, 1, Duration::from_secs(60))?.is_none());
///
/// assert!(service.release(&path, &key)?);
/// assert!(!path.exists());
/// # Ok::<(), vhsb::VhsbError>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLock;

impl FileLock {
    pub fn new() -> Self {
        FileLock
    }

    /// Expiration timestamp of an existing sentinel, if its first line
    /// parses as one. An unreadable or vanished file yields `None`.
    fn read_expiration(path: &Path) -> Option<DateTime<Utc>> {
        let contents = fs::read_to_string(path).ok()?;
        let first = contents.lines().next()?;
        DateTime::parse_from_rfc3339(first.trim())
            .map(|t| t.with_timezone(&Utc))
            .ok()
    }
}

impl LockService for FileLock {
    fn acquire(
        &self,
        path: &Path,
        max_retries: u32,
        expiration: Duration,
    ) -> Result<Option<String>> {
        let key = format!("{}_{:016x}", Utc::now().timestamp_micros(), rand::random::<u64>());

        let mut attempt = 0;
        while path.exists() && attempt < max_retries {
            let expired = match Self::read_expiration(path) {
                Some(t) => Utc::now() > t,
                // A sentinel we cannot parse never expires on its own;
                // keep polling instead of stealing it.
                None => false,
            };

            if expired {
                warn!("removing expired lock file {}", path.display());
                // The file may vanish between the check and the remove.
                fs::remove_file(path).ok();
            } else {
                debug!(
                    "lock {} is busy, retry {}/{}",
                    path.display(),
                    attempt + 1,
                    max_retries
                );
                thread::sleep(POLL_INTERVAL);
            }
            attempt += 1;
        }

        if path.exists() && attempt >= max_retries {
            return Ok(None);
        }

        let expires_at = Utc::now()
            + chrono::Duration::from_std(expiration)
                .map_err(|e| VhsbError::InvalidFormat(format!("invalid lock expiration: {}", e)))?;
        fs::write(path, format!("{}\n{}\n", expires_at.to_rfc3339(), key))?;
        Ok(Some(key))
    }

    fn release(&self, path: &Path, key: &str) -> Result<bool> {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<&str> = contents.lines().collect();
        if lines.len() != 2 {
            return Err(VhsbError::InvalidFormat(format!(
                "{} does not appear to be a lock file",
                path.display()
            )));
        }

        if lines[1].trim() == key {
            fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
