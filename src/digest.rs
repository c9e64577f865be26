//! File digests computed in parallel.
//!
//! Two runs: one listing files under each root, one hashing every file found.
//! Each unit writes only its own index, and a failure in one file never stops
//! the others.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use fanout::{DispatchResult, Dispatcher, TaskError};
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Digests of every readable file, plus whatever went wrong.
#[derive(Debug)]
pub struct Report {
    /// `(path, hex SHA-256)` in walk order
    pub digests: Vec<(PathBuf, String)>,
    /// Failures in no particular order
    pub failures: Vec<DigestError>,
}

/// Hash every file under `roots` using `dispatcher`'s default cap.
pub fn digest_paths(dispatcher: &Dispatcher, roots: &[PathBuf]) -> Report {
    let mut failures = Vec::new();

    let (listings, walked) =
        dispatcher.map_indexed(|idx| list_files(&roots[idx]), roots.len(), None);
    collect_failures(walked, &mut failures);
    let files: Vec<PathBuf> = listings.into_iter().flatten().flatten().collect();

    let (digests, hashed) = dispatcher.map_indexed(|idx| hash_file(&files[idx]), files.len(), None);
    collect_failures(hashed, &mut failures);

    let digests = files
        .into_iter()
        .zip(digests)
        .filter_map(|(path, digest)| digest.map(|digest| (path, digest)))
        .collect();

    Report { digests, failures }
}

fn collect_failures(outcome: DispatchResult<DigestError>, into: &mut Vec<DigestError>) {
    if let Err(errors) = outcome {
        into.extend(errors.into_iter().map(TaskError::into_source));
    }
}

fn list_files(root: &Path) -> Result<Vec<PathBuf>, DigestError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| DigestError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn hash_file(path: &Path) -> Result<String, DigestError> {
    let read_error = |source: io::Error| DigestError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_error)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(read_error)?;
    Ok(hex::encode(hasher.finalize()))
}
