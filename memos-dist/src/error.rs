use std::{io, path::PathBuf};
use thiserror::Error;
use url::Url;

/// The ways a provisioning run can fail. Every one of these aborts the run.
///
/// Most of the crate returns `anyhow::Result` and wraps these with extra context. Use
/// [`anyhow::Error::downcast_ref`] to get at the specific kind.
#[derive(Debug, Error)]
#[allow(clippy::module_name_repetitions)]
pub enum FetchError {
    #[error("failed to fetch release metadata from {url}: {reason}")]
    MetadataFetch { url: Url, reason: String },

    #[error("could not find a checksum manifest asset ending in `{suffix}` in release {tag}")]
    ManifestNotFound { suffix: String, tag: String },

    #[error("none of the release assets matched the patterns [{patterns}]; available assets: [{assets}]")]
    NoAssetsMatched { patterns: String, assets: String },

    #[error("`{pattern}` is not a valid glob pattern: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("network request to {url} failed")]
    Network {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("the checksum manifest does not contain an entry for {file}")]
    ManifestEntryMissing { file: String },

    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("failed to extract {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("could not find the `{name}` binary in the contents of {asset}")]
    BinaryNotFound { name: String, asset: String },

    #[error("failed to {action} {}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub(crate) fn fs(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        FetchError::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn network(url: &Url, source: reqwest::Error) -> Self {
        FetchError::Network {
            url: url.clone(),
            source,
        }
    }
}
