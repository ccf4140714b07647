use crate::error::FetchError;
use anyhow::Result;
use log::debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Where everything lands, relative to the root directory.
pub const OUTPUT_DIR: &str = "server-dist";
/// Holds the front-end assets, which are shared across every platform.
pub const SHARED_DIR: &str = "dist";
/// Archives are unpacked here one at a time. It never survives a successful run.
pub const EXTRACT_DIR: &str = "extracted";

/// The directory layout under a root directory.
///
/// ```text
/// <root>/server-dist/            downloaded archives and installed binaries
/// <root>/server-dist/dist/       shared front-end assets
/// <root>/server-dist/extracted/  transient
/// ```
///
/// Running two instances against the same root at the same time is not supported.
#[derive(Clone, Debug)]
pub struct Workspace {
    output_dir: PathBuf,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            output_dir: root.as_ref().join(OUTPUT_DIR),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn shared_dir(&self) -> PathBuf {
        self.output_dir.join(SHARED_DIR)
    }

    pub fn extract_dir(&self) -> PathBuf {
        self.output_dir.join(EXTRACT_DIR)
    }

    pub(crate) fn download_path(&self, asset_name: &str) -> PathBuf {
        self.output_dir.join(asset_name)
    }

    /// Creates the output directory if needed and removes the shared directory left by a previous
    /// run, which may have come from a different release. Binaries and downloaded archives are
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError::Filesystem`] if a directory cannot be created or removed.
    pub fn prepare(&self) -> Result<()> {
        if !self.output_dir.is_dir() {
            debug!("creating {}", self.output_dir.display());
            create_dir_all(&self.output_dir)
                .map_err(|e| FetchError::fs("create", &self.output_dir, e))?;
        }

        let shared_dir = self.shared_dir();
        if shared_dir.is_dir() {
            debug!("removing {} from a previous run", shared_dir.display());
            fs::remove_dir_all(&shared_dir).map_err(|e| FetchError::fs("remove", &shared_dir, e))?;
        }

        Ok(())
    }
}

#[cfg(target_family = "unix")]
fn create_dir_all(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o755).create(path)
}

#[cfg(not(target_family = "unix"))]
fn create_dir_all(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(target_family = "unix")]
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;
    use test_log::test;

    #[test]
    fn prepare_creates_output_dir() -> Result<()> {
        let td = tempdir()?;
        let root = td.path().join("nested").join("root");
        let workspace = Workspace::new(&root);
        workspace.prepare()?;

        assert!(root.join("server-dist").is_dir());
        // The process umask can only take bits away from 0755.
        #[cfg(target_family = "unix")]
        assert_eq!(
            workspace.output_dir().metadata()?.permissions().mode() & 0o777 & !0o755,
            0,
        );
        Ok(())
    }

    #[test]
    fn prepare_removes_stale_shared_dir_only() -> Result<()> {
        let td = tempdir()?;
        let workspace = Workspace::new(td.path());
        fs::create_dir_all(workspace.shared_dir().join("assets"))?;
        fs::write(workspace.shared_dir().join("index.html"), "old")?;
        let binary = workspace.output_dir().join("memos-x86_64-unknown-linux-gnu");
        fs::write(&binary, "binary")?;
        let archive = workspace.download_path("memos-v1-linux-x86_64.tar.gz");
        fs::write(&archive, "archive")?;

        workspace.prepare()?;

        assert!(!workspace.shared_dir().exists());
        assert!(binary.is_file());
        assert!(archive.is_file());
        Ok(())
    }

    #[test]
    fn prepare_is_repeatable() -> Result<()> {
        let td = tempdir()?;
        let workspace = Workspace::new(td.path());
        workspace.prepare()?;
        workspace.prepare()?;
        assert!(workspace.output_dir().is_dir());
        Ok(())
    }
}
