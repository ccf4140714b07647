use itertools::Itertools;
use strum::{EnumIter, IntoEnumIterator};

/// The archive formats release assets are shipped in.
#[derive(Clone, Copy, Debug, EnumIter, PartialEq, Eq, strum::Display)]
pub(crate) enum ArchiveFormat {
    #[strum(to_string = "tarball")]
    TarGz,
    #[strum(to_string = "tarball")]
    Tgz,
    #[strum(to_string = "zip file")]
    Zip,
}

impl ArchiveFormat {
    pub(crate) fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::Tgz => ".tgz",
            ArchiveFormat::Zip => ".zip",
        }
    }

    /// Returns `None` for names that don't end in a known archive extension.
    pub(crate) fn from_name(name: &str) -> Option<ArchiveFormat> {
        // Longest first so that ".tar.gz" would win over a shorter suffix of itself.
        ArchiveFormat::iter()
            .sorted_by_key(|f| f.extension().len())
            .rev()
            .find(|f| name.ends_with(f.extension()))
    }
}
