//! File-based per-artifact locking.
//!
//! Steps that run concurrently share one artifact directory. Each output a
//! step produces is guarded by an exclusive advisory lock on
//! `<artifact_dir>/.locks/<sha256 of the normalized path>.lock`, held until
//! the [`ArtifactLock`] is dropped. Acquisition never blocks: a held lock is
//! reported as contention.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::consts::LOCKS_DIR;
use crate::graph::ArtifactRef;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub step: String,
  pub artifact: String,
}

#[derive(Debug, Error)]
pub enum ArtifactLockError {
  #[error(
    "artifact '{artifact}' is locked by step '{step}' (PID {pid})\n\
             If you're sure no chisel process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    artifact: String,
    step: String,
    pid: u32,
    lock_path: PathBuf,
  },

  #[error(
    "artifact '{artifact}' is locked (could not read lock metadata)\n\
             If you're sure no chisel process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { artifact: String, lock_path: PathBuf },

  #[error("Failed to create lock directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("Failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("Failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("Failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// An exclusive lock on one output artifact.
pub struct ArtifactLock {
  file: File,
  lock_path: PathBuf,
}

impl ArtifactLock {
  /// Lock `artifact` inside `artifact_dir` on behalf of `step`.
  ///
  /// Paths that normalize to the same artifact share one lock.
  pub fn acquire(artifact_dir: &Path, artifact: &ArtifactRef, step: &str) -> Result<Self, ArtifactLockError> {
    let artifact = &ArtifactRef::normalized(&artifact.0);
    let locks = artifact_dir.join(LOCKS_DIR);
    std::fs::create_dir_all(&locks).map_err(ArtifactLockError::CreateDir)?;

    let lock_path = locks.join(lock_file_name(artifact));

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(ArtifactLockError::OpenFile)?;

    if let Err(err) = try_lock_exclusive(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::read_contention_error(&lock_path, artifact));
      }
      return Err(ArtifactLockError::LockFailed(err));
    }

    Self::write_metadata(&file, step, artifact)?;

    Ok(ArtifactLock { file, lock_path })
  }

  /// Read the metadata through the held handle.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  fn write_metadata(file: &File, step: &str, artifact: &ArtifactRef) -> Result<(), ArtifactLockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      step: step.to_string(),
      artifact: artifact.0.clone(),
    };

    file.set_len(0).map_err(ArtifactLockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata)
      .map_err(|e| ArtifactLockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(ArtifactLockError::WriteMetadata)?;

    Ok(())
  }

  fn read_contention_error(lock_path: &Path, artifact: &ArtifactRef) -> ArtifactLockError {
    if let Ok(mut file) = File::open(lock_path) {
      let mut contents = String::new();
      if file.read_to_string(&mut contents).is_ok()
        && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
      {
        return ArtifactLockError::Contention {
          artifact: artifact.0.clone(),
          step: metadata.step,
          pid: metadata.pid,
          lock_path: lock_path.to_path_buf(),
        };
      }
    }

    ArtifactLockError::ContentionUnknown {
      artifact: artifact.0.clone(),
      lock_path: lock_path.to_path_buf(),
    }
  }
}

/// Lock file name for an already normalized artifact path.
fn lock_file_name(artifact: &ArtifactRef) -> String {
  format!("{}.lock", hex::encode(Sha256::digest(artifact.0.as_bytes())))
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
