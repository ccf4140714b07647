use crate::{
    error::FetchError,
    extension::ArchiveFormat,
    triple::{is_windows, target_triple},
    workspace::Workspace,
};
use anyhow::Result;
use binstall_tar::Archive;
use flate2::read::GzDecoder;
use log::{debug, info};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use walkdir::WalkDir;
use zip::ZipArchive;

#[cfg(target_family = "unix")]
use std::fs::{set_permissions, Permissions};
#[cfg(target_family = "unix")]
use std::os::unix::fs::PermissionsExt;

/// Unpacks one downloaded release asset at a time into the extraction directory, then moves the
/// server binary and the shared front-end directory into the output directory.
#[derive(Debug)]
pub(crate) struct Installer {
    extract_dir: PathBuf,
    output_dir: PathBuf,
    shared_dir: PathBuf,
    binary_name: String,
}

impl Installer {
    pub(crate) fn new(workspace: &Workspace, binary_name: String) -> Self {
        Installer {
            extract_dir: workspace.extract_dir(),
            output_dir: workspace.output_dir().to_path_buf(),
            shared_dir: workspace.shared_dir(),
            binary_name,
        }
    }

    /// Installs the binary from the asset and returns the path it was installed to. The first
    /// asset processed also provides the shared front-end directory.
    pub(crate) fn install(&self, asset_name: &str, archive_path: &Path) -> Result<PathBuf> {
        let windows = is_windows(asset_name);
        let exe_suffix = if windows { ".exe" } else { "" };
        let binary_file_name = format!("{}{exe_suffix}", self.binary_name);

        self.extract(asset_name, archive_path, &binary_file_name)?;

        let extracted_binary = self.find_extracted(&binary_file_name, false).ok_or_else(|| {
            FetchError::BinaryNotFound {
                name: binary_file_name.clone(),
                asset: asset_name.to_string(),
            }
        })?;

        let install_path = self.output_dir.join(format!(
            "{}-{}{exe_suffix}",
            self.binary_name,
            target_triple(asset_name),
        ));
        debug!(
            "moving {} to {}",
            extracted_binary.display(),
            install_path.display(),
        );
        fs::rename(&extracted_binary, &install_path)
            .map_err(|e| FetchError::fs("move", &extracted_binary, e))?;
        if !windows {
            make_binary_executable(&install_path)?;
        }

        self.install_shared_dir(asset_name)?;

        info!("Installed {}", install_path.display());
        Ok(install_path)
    }

    fn extract(&self, asset_name: &str, archive_path: &Path, binary_file_name: &str) -> Result<()> {
        // A run that failed part way through can leave another archive's contents behind.
        self.clean()?;
        fs::create_dir_all(&self.extract_dir)
            .map_err(|e| FetchError::fs("create", &self.extract_dir, e))?;

        match ArchiveFormat::from_name(asset_name) {
            Some(format @ (ArchiveFormat::TarGz | ArchiveFormat::Tgz)) => {
                info!("Extracting {asset_name}...");
                self.extract_tarball(archive_path, format)?;
            }
            Some(format @ ArchiveFormat::Zip) => {
                info!("Extracting {asset_name}...");
                self.extract_zip(archive_path, format)?;
            }
            None => {
                debug!("{asset_name} is not an archive, treating it as the binary itself");
                let to = self.extract_dir.join(binary_file_name);
                fs::copy(archive_path, &to).map_err(|e| FetchError::fs("copy", archive_path, e))?;
            }
        }

        let count = WalkDir::new(&self.extract_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        info!("Extracted {count} files");

        Ok(())
    }

    fn extract_tarball(&self, archive_path: &Path, format: ArchiveFormat) -> Result<()> {
        debug!(
            "unpacking {format} at {} into {}",
            archive_path.display(),
            self.extract_dir.display(),
        );
        let mut arch = Archive::new(GzDecoder::new(open_file(archive_path)?));
        arch.unpack(&self.extract_dir)
            .map_err(|e| extraction_error(archive_path, format, &e))?;
        Ok(())
    }

    fn extract_zip(&self, archive_path: &Path, format: ArchiveFormat) -> Result<()> {
        debug!(
            "unpacking {format} at {} into {}",
            archive_path.display(),
            self.extract_dir.display(),
        );
        let mut zip = ZipArchive::new(open_file(archive_path)?)
            .map_err(|e| extraction_error(archive_path, format, &e))?;
        zip.extract(&self.extract_dir)
            .map_err(|e| extraction_error(archive_path, format, &e))?;
        Ok(())
    }

    // Release archives are expected to have the binary and `dist` at the top level, but we also
    // look deeper in case an archive wraps everything in a directory.
    fn find_extracted(&self, name: &str, is_dir: bool) -> Option<PathBuf> {
        let top = self.extract_dir.join(name);
        if (is_dir && top.is_dir()) || (!is_dir && top.is_file()) {
            return Some(top);
        }

        WalkDir::new(&self.extract_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| {
                e.file_name() == name
                    && if is_dir {
                        e.file_type().is_dir()
                    } else {
                        e.file_type().is_file()
                    }
            })
            .map(walkdir::DirEntry::into_path)
    }

    // The front-end assets are the same for every platform, so they're only moved out of the
    // first archive. The workspace removes any stale copy before the run starts.
    fn install_shared_dir(&self, asset_name: &str) -> Result<()> {
        if self.shared_dir.is_dir() {
            debug!(
                "{} already exists, not replacing it with the copy from {asset_name}",
                self.shared_dir.display(),
            );
            return Ok(());
        }

        let name = self
            .shared_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let from = self.find_extracted(&name, true).ok_or_else(|| FetchError::Extraction {
            path: PathBuf::from(asset_name),
            reason: format!("the archive does not contain a `{name}` directory"),
        })?;

        debug!(
            "moving {} to {}",
            from.display(),
            self.shared_dir.display()
        );
        fs::rename(&from, &self.shared_dir).map_err(|e| FetchError::fs("move", &from, e))?;
        Ok(())
    }

    /// Removes the extraction directory and everything in it.
    pub(crate) fn clean(&self) -> Result<()> {
        if self.extract_dir.exists() {
            fs::remove_dir_all(&self.extract_dir)
                .map_err(|e| FetchError::fs("remove", &self.extract_dir, e))?;
        }
        Ok(())
    }
}

fn extraction_error(path: &Path, format: ArchiveFormat, e: &dyn std::error::Error) -> FetchError {
    FetchError::Extraction {
        path: path.to_path_buf(),
        reason: format!("could not unpack {format}: {e}"),
    }
}

fn make_binary_executable(path: &Path) -> Result<()> {
    #[cfg(target_family = "windows")]
    return Ok(());

    #[cfg(target_family = "unix")]
    match set_permissions(path, Permissions::from_mode(0o755)) {
        Ok(()) => Ok(()),
        Err(e) => Err(FetchError::fs("set permissions on", path, e).into()),
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| FetchError::fs("open", path, e).into())
}
