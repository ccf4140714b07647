//! The `builder` module contains the `FetcherBuilder` struct which is used to create a `Fetcher`
//! instance.
use crate::{
    fetcher::Fetcher,
    github::GitHub,
    matcher::{AssetMatcher, DEFAULT_PATTERNS},
    workspace::Workspace,
};
use anyhow::{anyhow, Result};
use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    Client,
};
use std::{
    env,
    path::{Path, PathBuf},
};
use url::Url;

/// The project whose releases are fetched when no other project is set.
pub const DEFAULT_PROJECT: &str = "lincolnthalles/memos-builds";
/// The name of the server binary inside release archives.
pub const DEFAULT_BINARY_NAME: &str = "memos";

/// `FetcherBuilder` is used to create a [`Fetcher`] instance.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct FetcherBuilder<'a> {
    project: Option<&'a str>,
    root: Option<PathBuf>,
    api_base_url: Option<&'a str>,
    token: Option<&'a str>,
    patterns: Option<Vec<&'a str>>,
    binary_name: Option<&'a str>,
}

impl<'a> FetcherBuilder<'a> {
    /// Returns a new empty `FetcherBuilder`.
    #[must_use]
    pub fn new() -> Self {
        FetcherBuilder::default()
    }

    /// Set the project to fetch releases from, as `owner/repo`. Defaults to
    /// `lincolnthalles/memos-builds`.
    #[must_use]
    pub fn project(mut self, project: &'a str) -> Self {
        self.project = Some(project);
        self
    }

    /// Set the directory under which `server-dist` is created. Defaults to the current directory.
    #[must_use]
    pub fn root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Set the base URL for the GitHub API. This is useful for testing or for a GitHub Enterprise
    /// install. This should be something like `https://github.my-corp.example.com/api/v3`.
    #[must_use]
    pub fn api_base_url(mut self, api_base_url: &'a str) -> Self {
        self.api_base_url = Some(api_base_url);
        self
    }

    /// Set a token to use for API requests. If this is not set then this will be taken from the
    /// `GITHUB_TOKEN` env var if it is set.
    #[must_use]
    pub fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    /// Set the glob patterns that pick which release assets to install. The default patterns match
    /// macOS ARM64 and x86-64, Linux x86-64, and Windows x86-64 builds.
    #[must_use]
    pub fn patterns(mut self, patterns: &[&'a str]) -> Self {
        self.patterns = Some(patterns.to_vec());
        self
    }

    /// Set the name of the executable to look for in archive files. On Windows builds the `.exe`
    /// suffix is added.
    #[must_use]
    pub fn binary_name(mut self, name: &'a str) -> Self {
        self.binary_name = Some(name);
        self
    }

    /// Builds a new [`Fetcher`] instance and returns it.
    ///
    /// # Errors
    ///
    /// This returns an error if the project is not in `owner/repo` form, the API base URL can't be
    /// parsed, one of the patterns is not a valid glob, or the current directory can't be
    /// determined when no root was set.
    pub fn build(self) -> Result<Fetcher> {
        let project = self.project.unwrap_or(DEFAULT_PROJECT);
        validate_project_name(project)?;

        let api_base_url = self
            .api_base_url
            .map(Url::parse)
            .transpose()
            .map_err(|e| anyhow!("invalid API base URL: {e}"))?;

        let matcher = AssetMatcher::new(self.patterns.as_deref().unwrap_or(DEFAULT_PATTERNS))?;

        let root = match self.root {
            Some(root) => root,
            None => env::current_dir()?,
        };
        debug!("root directory = {}", root.display());

        let binary_name = self.binary_name.unwrap_or(DEFAULT_BINARY_NAME);
        if binary_name.is_empty() {
            return Err(anyhow!("The binary name cannot be empty"));
        }

        Ok(Fetcher::new(
            GitHub::new(
                project.to_string(),
                api_base_url,
                self.token.map(String::from),
            ),
            matcher,
            Workspace::new(root),
            binary_name.to_string(),
            reqwest_client()?,
        ))
    }
}

fn validate_project_name(project: &str) -> Result<()> {
    let parts = project.split('/').collect::<Vec<_>>();
    if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
        return Err(anyhow!(
            "could not parse owner and repo name from `{project}`, expected something like `{DEFAULT_PROJECT}`"
        ));
    }
    Ok(())
}

fn reqwest_client() -> Result<Client> {
    let builder = Client::builder().gzip(true);

    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("memos-dist version {}", super::VERSION))?,
    );
    Ok(builder.default_headers(headers).build()?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::FetchError;
    use rstest::rstest;

    #[rstest]
    #[case::default(DEFAULT_PROJECT, true)]
    #[case::other("some-owner/some-repo", true)]
    #[case::no_slash("memos-builds", false)]
    #[case::too_many_parts("a/b/c", false)]
    #[case::empty_owner("/memos-builds", false)]
    #[case::empty_repo("lincolnthalles/", false)]
    fn project_names(#[case] project: &str, #[case] ok: bool) {
        assert_eq!(validate_project_name(project).is_ok(), ok, "{project}");
    }

    #[test]
    fn build_with_defaults() -> Result<()> {
        let fetcher = FetcherBuilder::new().root("/some/root").build()?;
        assert_eq!(
            fetcher.workspace().output_dir(),
            Path::new("/some/root").join("server-dist"),
        );
        Ok(())
    }

    #[test]
    fn bad_api_base_url() {
        let res = FetcherBuilder::new().api_base_url("not a url").build();
        assert!(res.is_err());
    }

    #[test]
    fn bad_pattern() {
        let res = FetcherBuilder::new().patterns(&["memos-[0-9"]).build();
        assert!(matches!(
            res.unwrap_err().downcast_ref::<FetchError>(),
            Some(FetchError::InvalidPattern { .. }),
        ));
    }

    #[test]
    fn empty_binary_name() {
        let res = FetcherBuilder::new().binary_name("").build();
        assert!(res.is_err());
    }
}
