//! Mapping between remote `bucket/key` paths and local filesystem paths.
//!
//! Remote keys may contain characters that are illegal in local file names
//! (`:` is rejected by Windows). Those are replaced with `_`, a fixed and
//! documented escape. The mapping is lossy for that character: `c:d` and
//! `c_d` collapse to the same local name.

use std::path::{Path, PathBuf};

use crate::error::SkiffError;

/// Split a full remote path into `(bucket, key)`.
///
/// Both halves must be non-empty; a path without a `/` separator is
/// rejected before it can reach the scheduler.
pub fn split_remote(path: &str) -> Result<(&str, &str), SkiffError> {
    match path.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok((bucket, key)),
        _ => Err(SkiffError::InvalidRemotePath {
            path: path.to_string(),
        }),
    }
}

/// Map a full remote path to a local path under `output_root`.
///
/// The leading bucket segment is stripped, every remaining segment is
/// sanitized with [`sanitize_segment`], and the result is joined under
/// `output_root`. Empty segments (doubled or trailing delimiters) are
/// dropped. A `..` segment is rejected outright so the result can never
/// escape the output root.
pub fn remote_to_local(path: &str, output_root: &Path) -> Result<PathBuf, SkiffError> {
    let (_bucket, key) = split_remote(path)?;

    let mut local = output_root.to_path_buf();
    for segment in key.split('/') {
        if segment.is_empty() {
            continue;
        }
        if segment == ".." {
            return Err(SkiffError::InvalidRemotePath {
                path: path.to_string(),
            });
        }
        local.push(sanitize_segment(segment));
    }
    Ok(local)
}

/// Replace characters that are illegal in local file names with `_`.
///
/// Currently only `:`. Lossy by design; see the module docs.
pub fn sanitize_segment(segment: &str) -> String {
    segment.replace(':', "_")
}
