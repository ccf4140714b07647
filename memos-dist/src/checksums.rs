use crate::error::FetchError;
use anyhow::Result;
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, fs::File, io, path::Path};

/// Maps file names to the hex SHA-256 digest published for them, as parsed from a
/// `*SHA256SUMS.txt` release asset.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ChecksumManifest(HashMap<String, String>);

impl ChecksumManifest {
    // Each line is `<digest>  <file name>`, the format `sha256sum` writes in text mode. Empty lines
    // are skipped and anything else without the two-space separator is ignored.
    pub(crate) fn parse(text: &str) -> Self {
        let mut digests = HashMap::new();
        for line in text.split('\n') {
            if line.trim().is_empty() {
                continue;
            }
            let Some((digest, file_name)) = line.split_once("  ") else {
                warn!("ignoring checksum manifest line without a two-space separator: `{line}`");
                continue;
            };
            debug!("manifest has digest {} for {}", digest.trim(), file_name.trim());
            digests.insert(file_name.trim().to_string(), digest.trim().to_string());
        }

        Self(digests)
    }

    pub(crate) fn get(&self, file_name: &str) -> Option<&str> {
        self.0.get(file_name).map(String::as_str)
    }

    /// Checks the file at `path` against the manifest entry for `file_name`.
    pub(crate) fn verify(&self, file_name: &str, path: &Path) -> Result<()> {
        info!("Checking hash for {file_name}...");

        let expected = self
            .get(file_name)
            .ok_or_else(|| FetchError::ManifestEntryMissing {
                file: file_name.to_string(),
            })?
            .to_ascii_lowercase();

        let actual = sha256_file(path)?;
        info!("Hash: {actual}");

        if actual != expected {
            return Err(FetchError::ChecksumMismatch {
                file: file_name.to_string(),
                expected,
                actual,
            }
            .into());
        }

        debug!("checksum for {} is correct", path.display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| FetchError::fs("open", path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| FetchError::fs("read", path, e))?;
    Ok(hex::encode(hasher.finalize()))
}
