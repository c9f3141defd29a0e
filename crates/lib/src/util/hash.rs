//! Content hashing for target fingerprints.
//!
//! All digests are lowercase hexadecimal SHA-256 (64 characters). Tree hashes
//! cover relative paths, file contents and symlink targets, never timestamps
//! or permissions, so touching a file without changing it keeps its hash.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum HashError {
  #[error("failed to walk {path}: {message}")]
  Walk { path: PathBuf, message: String },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read symlink {path}: {source}")]
  ReadLink {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(data);
  format!("{:x}", hasher.finalize())
}

/// Hash a file's contents, streaming it in fixed-size chunks.
pub fn hash_file(path: &Path) -> Result<String, HashError> {
  let read_err = |source| HashError::Read {
    path: path.to_path_buf(),
    source,
  };

  let mut file = fs::File::open(path).map_err(read_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let n = file.read(&mut buffer).map_err(read_err)?;
    if n == 0 {
      break;
    }
    hasher.update(&buffer[..n]);
  }

  Ok(format!("{:x}", hasher.finalize()))
}

/// Compute a deterministic hash of a directory tree.
///
/// Each entry contributes one line: `F:<rel>:<content hash>` for files,
/// `D:<rel>` for directories and `L:<rel>:<target hash>` for symlinks.
/// Lines are sorted by relative path. Special files are skipped.
pub fn hash_tree(root: &Path) -> Result<String, HashError> {
  let mut lines: Vec<(String, String)> = Vec::new();

  for entry in WalkDir::new(root).sort_by_file_name() {
    let entry = entry.map_err(|e| HashError::Walk {
      path: root.to_path_buf(),
      message: e.to_string(),
    })?;
    let path = entry.path();

    let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy().to_string();
    if rel.is_empty() {
      continue;
    }

    let file_type = entry.file_type();
    let line = if file_type.is_symlink() {
      let target = fs::read_link(path).map_err(|source| HashError::ReadLink {
        path: path.to_path_buf(),
        source,
      })?;
      format!("L:{}:{}", rel, hash_bytes(target.to_string_lossy().as_bytes()))
    } else if file_type.is_file() {
      format!("F:{}:{}", rel, hash_file(path)?)
    } else if file_type.is_dir() {
      format!("D:{}", rel)
    } else {
      continue;
    };

    lines.push((rel, line));
  }

  lines.sort_by(|a, b| a.0.cmp(&b.0));

  let mut hasher = Sha256::new();
  for (_, line) in lines {
    hasher.update(line.as_bytes());
    hasher.update(b"\n");
  }

  Ok(format!("{:x}", hasher.finalize()))
}
