use crate::{
    error::FetchError,
    release::{Asset, Release},
};
use anyhow::{anyhow, Result};
use log::debug;
use reqwest::{
    header::{HeaderValue, ACCEPT, AUTHORIZATION},
    Client, RequestBuilder, Response,
};
use std::{
    env,
    fs::OpenOptions,
    io::Write,
    path::Path,
    sync::LazyLock,
};
use url::Url;

pub(crate) static DEFAULT_API_BASE_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://api.github.com").unwrap());

pub(crate) const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

#[derive(Debug)]
pub(crate) struct GitHub {
    project_name: String,
    api_base_url: Url,
    token: Option<String>,
}

impl GitHub {
    pub(crate) fn new(project_name: String, api_base_url: Option<Url>, token: Option<String>) -> Self {
        let token = token.or_else(|| {
            let t = env::var(TOKEN_ENV_VAR).ok();
            if t.is_some() {
                debug!("Using GitHub token from the {TOKEN_ENV_VAR} environment variable.");
            }
            t
        });

        Self {
            project_name,
            api_base_url: api_base_url.unwrap_or_else(|| DEFAULT_API_BASE_URL.clone()),
            token,
        }
    }

    pub(crate) fn project_name(&self) -> &str {
        &self.project_name
    }

    pub(crate) fn release_info_url(&self) -> Result<Url> {
        let (owner, repo) = self
            .project_name
            .split_once('/')
            .ok_or_else(|| anyhow!("project name `{}` is not owner/repo", self.project_name))?;

        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("{} cannot be used as a base URL", self.api_base_url))?
            .pop_if_empty()
            .push("repos")
            .push(owner)
            .push(repo)
            .push("releases")
            .push("latest");
        Ok(url)
    }

    /// Fetches the latest release. A release without any assets is an error.
    pub(crate) async fn fetch_latest_release(&self, client: &Client) -> Result<Release> {
        let url = self.release_info_url()?;
        debug!("Getting release info from `{url}`");

        let resp = self.get(client, &url, "application/json").await?;
        let release = resp
            .json::<Release>()
            .await
            .map_err(|e| FetchError::MetadataFetch {
                url: url.clone(),
                reason: format!("could not parse the response: {e}"),
            })?;

        if release.assets.is_empty() {
            return Err(FetchError::MetadataFetch {
                url,
                reason: format!("release {} has no assets", release.tag_name),
            }
            .into());
        }

        Ok(release)
    }

    /// Streams the asset to `path`. The file must not already exist.
    pub(crate) async fn download(&self, client: &Client, asset: &Asset, path: &Path) -> Result<()> {
        debug!("downloading asset from {} to {}", asset.url, path.display());

        let mut resp = self
            .get(client, &asset.url, "application/octet-stream")
            .await?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| FetchError::fs("create", path, e))?;
        while let Some(c) = resp
            .chunk()
            .await
            .map_err(|e| FetchError::network(&asset.url, e))?
        {
            file.write_all(c.as_ref())
                .map_err(|e| FetchError::fs("write to", path, e))?;
        }
        file.flush().map_err(|e| FetchError::fs("write to", path, e))?;

        Ok(())
    }

    pub(crate) async fn fetch_text(&self, client: &Client, asset: &Asset) -> Result<String> {
        debug!("fetching {} as text", asset.url);
        let resp = self
            .get(client, &asset.url, "application/octet-stream")
            .await?;
        Ok(resp
            .text()
            .await
            .map_err(|e| FetchError::network(&asset.url, e))?)
    }

    async fn get(&self, client: &Client, url: &Url, accept: &'static str) -> Result<Response> {
        let mut req_builder = client
            .get(url.clone())
            .header(ACCEPT, HeaderValue::from_static(accept));
        req_builder = self.maybe_add_token_header(req_builder)?;

        let resp = req_builder
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;
        resp.error_for_status()
            .map_err(|e| FetchError::network(url, e).into())
    }

    fn maybe_add_token_header(&self, mut req_builder: RequestBuilder) -> Result<RequestBuilder> {
        if let Some(token) = self.token.as_deref() {
            debug!("Adding token to GitHub request.");
            let bearer = format!("Bearer {token}");
            let mut auth_val = HeaderValue::from_str(&bearer)?;
            auth_val.set_sensitive(true);
            req_builder = req_builder.header(AUTHORIZATION, auth_val);
        }
        Ok(req_builder)
    }
}
