//! A library for provisioning the Memos server binaries that get bundled into a desktop app.
//!
//! It downloads the latest release of a server build project from GitHub, picks out the assets for
//! the platforms being packaged, checks each one against the release's SHA-256 manifest, unpacks
//! them, and gives every binary a name based on its Rust target triple.
//!
//! The main entry point for programmatic use is the [`FetcherBuilder`] struct. Here is an example
//! of its usage:
//!
//! ```ignore
//! use memos_dist::FetcherBuilder;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = FetcherBuilder::new().root("/path/to/repo").build()?;
//!     let report = fetcher.run().await?;
//!     println!("installed {} binaries from {}", report.binaries.len(), report.tag);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## What a Run Does
//!
//! Everything happens under `<root>/server-dist`. Before anything is fetched, that directory is
//! created if needed and any `dist` directory from a previous run is removed. Then:
//!
//! 1. The latest release is fetched from `{api}/repos/{owner}/{repo}/releases/latest`.
//! 2. The release must have an asset whose name ends in `SHA256SUMS.txt`.
//! 3. Assets are selected with glob patterns. By default these are:
//!    - `memos-*-darwin-arm64.tar.gz`
//!    - `memos-*-darwin-x86_64.tar.gz`
//!    - `memos-*-linux-x86_64.tar.gz`
//!    - `memos-*-windows-x86_64.zip`
//! 4. Each selected asset is downloaded into `server-dist`, unless a file with that name is
//!    already there, in which case it is reused.
//! 5. Every selected file is checked against the manifest. A missing entry or a wrong digest stops
//!    the run.
//! 6. Each archive is unpacked into `server-dist/extracted`. The `memos` binary (`memos.exe` for
//!    Windows) is moved to `server-dist/memos-{triple}`, and the `dist` directory from the first
//!    archive is moved to `server-dist/dist`.
//! 7. The extraction directory and the archive are deleted.
//!
//! Any error stops the run. Nothing is cleaned up after a failure, and since downloaded archives
//! are reused, a second run only downloads what's missing.
//!
//! ## Target Triples
//!
//! The triple is derived from the asset name by substring matching, see [`target_triple`]. For
//! example, `memos-v0.22.0-darwin-arm64.tar.gz` becomes `aarch64-apple-darwin` and
//! `memos-v0.22.0-windows-x86_64.zip` becomes `x86_64-pc-windows-msvc`.
//!
//! ## Features
//!
//! This crate offers several features to control the TLS dependency used by `reqwest`:
//!
#![doc = document_features::document_features!()]

mod builder;
mod checksums;
mod error;
mod extension;
mod fetcher;
mod github;
mod installer;
mod matcher;
mod release;
mod triple;
mod workspace;

pub use crate::{
    builder::{FetcherBuilder, DEFAULT_BINARY_NAME, DEFAULT_PROJECT},
    error::FetchError,
    fetcher::{Fetcher, Report},
    matcher::{DEFAULT_PATTERNS, MANIFEST_SUFFIX},
    triple::{is_windows, target_triple},
    workspace::{Workspace, EXTRACT_DIR, OUTPUT_DIR, SHARED_DIR},
};

// The version of the `memos-dist` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(feature = "logging")]
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};

/// This function initializes logging for the application. It's public for the sake of the
/// `memos-dist` binary, but it lives in the library crate so that test code can also enable
/// logging.
///
/// # Errors
///
/// This can return a `log::SetLoggerError` error.
#[cfg(feature = "logging")]
pub fn init_logger(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    let line_colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::BrightBlack)
        .debug(Color::BrightBlack)
        .trace(Color::BrightBlack);
    let level_colors = line_colors.info(Color::Green).debug(Color::Black);

    Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{color_line}[{target}][{level}{color_line}] {message}\x1B[0m",
                color_line = format_args!(
                    "\x1B[{}m",
                    line_colors.get_color(&record.level()).to_fg_str()
                ),
                target = record.target(),
                level = level_colors.color(record.level()),
                message = message,
            ));
        })
        .level(level)
        // These are very noisy.
        .level_for("hyper", log::LevelFilter::Error)
        .level_for("hyper_util", log::LevelFilter::Error)
        .level_for("reqwest", log::LevelFilter::Error)
        .chain(std::io::stderr())
        .apply()
}
