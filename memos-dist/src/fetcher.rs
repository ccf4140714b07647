use crate::{
    checksums::ChecksumManifest,
    error::FetchError,
    github::GitHub,
    installer::Installer,
    matcher::{find_manifest, AssetMatcher},
    release::Asset,
    workspace::Workspace,
};
use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::Client;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

/// `Fetcher` downloads the server builds from the latest release, verifies them, and installs
/// them into the workspace. Use the [`FetcherBuilder`](crate::FetcherBuilder) struct to create a
/// new `Fetcher` instance.
#[derive(Debug)]
pub struct Fetcher {
    github: GitHub,
    matcher: AssetMatcher,
    workspace: Workspace,
    binary_name: String,
    reqwest_client: Client,
}

/// What a successful run produced.
#[derive(Debug, PartialEq, Eq)]
pub struct Report {
    /// The tag of the release the binaries came from.
    pub tag: String,
    /// The installed binaries, in release asset order.
    pub binaries: Vec<PathBuf>,
    /// The shared front-end directory.
    pub shared_dir: PathBuf,
}

impl Fetcher {
    pub(crate) fn new(
        github: GitHub,
        matcher: AssetMatcher,
        workspace: Workspace,
        binary_name: String,
        reqwest_client: Client,
    ) -> Self {
        Fetcher {
            github,
            matcher,
            workspace,
            binary_name,
            reqwest_client,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Prepares the workspace, then downloads, verifies, and installs every matching release
    /// asset.
    ///
    /// Archives that are already in the output directory are reused instead of downloaded, but
    /// they're still verified. Each archive is deleted after its binary is installed.
    ///
    /// # Errors
    ///
    /// Any failure aborts the run. Use `downcast_ref::<FetchError>()` on the returned error to see
    /// which kind of failure it was. Files written before the failure are left in place.
    pub async fn run(&self) -> Result<Report> {
        self.workspace.prepare()?;
        self.fetch().await
    }

    async fn fetch(&self) -> Result<Report> {
        let release = self
            .github
            .fetch_latest_release(&self.reqwest_client)
            .await?;
        info!("Latest {} tag: {}", self.github.project_name(), release.tag_name);

        let manifest_asset = find_manifest(&release.assets, &release.tag_name)?;
        let selected = dedup(self.matcher.matches(&release.assets)?);
        info!("Matched {} files", selected.len());

        for asset in &selected {
            self.download_if_missing(asset).await?;
        }

        let manifest_text = self
            .github
            .fetch_text(&self.reqwest_client, manifest_asset)
            .await
            .with_context(|| format!("failed to fetch {}", manifest_asset.name))?;
        let manifest = ChecksumManifest::parse(&manifest_text);
        for asset in &selected {
            manifest.verify(&asset.name, &self.workspace.download_path(&asset.name))?;
        }

        let installer = Installer::new(&self.workspace, self.binary_name.clone());
        let mut binaries = vec![];
        for asset in &selected {
            let archive_path = self.workspace.download_path(&asset.name);
            let installed = installer
                .install(&asset.name, &archive_path)
                .with_context(|| format!("failed to install {}", asset.name))?;
            binaries.push(installed);

            installer.clean()?;
            remove_file(&archive_path)?;
        }

        Ok(Report {
            tag: release.tag_name,
            binaries,
            shared_dir: self.workspace.shared_dir(),
        })
    }

    async fn download_if_missing(&self, asset: &Asset) -> Result<()> {
        let path = self.workspace.download_path(&asset.name);
        if path.is_file() {
            info!("File {} already exists and will be reused.", asset.name);
            return Ok(());
        }

        info!("Downloading {}...", asset.name);
        self.github
            .download(&self.reqwest_client, asset, &path)
            .await
            .with_context(|| format!("failed to download {}", asset.name))
    }
}

// An asset matched by several patterns only needs to be processed once.
fn dedup(assets: Vec<&Asset>) -> Vec<&Asset> {
    let mut seen = HashSet::new();
    let mut unique = vec![];
    for asset in assets {
        if seen.insert(asset.name.as_str()) {
            unique.push(asset);
        } else {
            debug!("{} matched more than one pattern", asset.name);
        }
    }
    unique
}

fn remove_file(path: &Path) -> Result<()> {
    debug!("removing {}", path.display());
    fs::remove_file(path).map_err(|e| FetchError::fs("remove", path, e).into())
}
