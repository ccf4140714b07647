use anyhow::anyhow;
use serde::Deserialize;
use url::Url;

/// The parts of GitHub's "latest release" response that we care about.
#[derive(Debug, Deserialize)]
pub(crate) struct Release {
    pub(crate) tag_name: String,
    // A release with no `assets` key is treated the same as one with an empty list. Both are
    // reported as a metadata error by the caller.
    #[serde(default)]
    pub(crate) assets: Vec<Asset>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(try_from = "AssetHelper")]
pub(crate) struct Asset {
    pub(crate) name: String,
    pub(crate) url: Url,
}

#[derive(Debug, Deserialize)]
struct AssetHelper {
    name: String,
    url: Option<Url>,
    browser_download_url: Option<Url>,
}

impl TryFrom<AssetHelper> for Asset {
    type Error = anyhow::Error;

    fn try_from(helper: AssetHelper) -> Result<Self, Self::Error> {
        // The browser download URL serves the raw file without any extra headers. The API `url`
        // only does that when asked for `application/octet-stream`, which we do, so it's a usable
        // fallback.
        let url = helper.browser_download_url.or(helper.url).ok_or(anyhow!(
            "the asset `{}` did not have a `browser_download_url` or `url` field",
            helper.name,
        ))?;

        Ok(Asset {
            name: helper.name,
            url,
        })
    }
}
