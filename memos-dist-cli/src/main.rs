use anyhow::{Error, Result};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use log::{error, info};
use memos_dist::{Fetcher, FetcherBuilder, DEFAULT_PATTERNS, DEFAULT_PROJECT};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("{0:}")]
    InvalidArgsError(String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cmd = cmd();
    let matches = cmd.get_matches();
    let res = init_logger_from_matches(&matches);
    if let Err(e) = res {
        eprintln!("Error creating logger: {e}");
        std::process::exit(126);
    }

    let status = match make_fetcher(&matches) {
        Ok(f) => match f.run().await {
            Ok(report) => {
                info!(
                    "Installed {} server binaries from {} into {}",
                    report.binaries.len(),
                    report.tag,
                    f.workspace().output_dir().display(),
                );
                0
            }
            Err(e) => {
                print_err(&e);
                1
            }
        },
        Err(e) => {
            print_err(&e);
            127
        }
    };
    std::process::exit(status);
}

const MAX_TERM_WIDTH: usize = 100;

fn cmd() -> Command {
    Command::new("memos-dist")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Downloads and verifies the Memos server builds bundled with the desktop app")
        .arg(Arg::new("root").long("root").short('r').help(concat!(
            "The directory under which `server-dist` is created. Defaults to the current",
            " directory.",
        )))
        .arg(Arg::new("project").long("project").short('p').help(format!(
            "The GitHub project to take the latest release from. Defaults to {DEFAULT_PROJECT}.",
        )))
        .arg(Arg::new("api-base-url").long("api-base-url").help(concat!(
            "The base URL for the GitHub API. This is useful for testing or if you want to",
            " operate against GitHub Enterprise. This should be something like",
            " `https://github.my-corp.example.com/api/v3`.",
        )))
        .arg(
            Arg::new("pattern")
                .long("pattern")
                .action(ArgAction::Append)
                .help(format!(
                    "A glob matched against release asset names. This can be passed more than once. \
                     Defaults to {}.",
                    DEFAULT_PATTERNS.join(", "),
                )),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose output, including progress for each release asset."),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Enable debugging output."),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppresses most output."),
        )
        .group(ArgGroup::new("log-level").args(["verbose", "debug", "quiet"]))
        .max_term_width(MAX_TERM_WIDTH)
}

fn log_level_from_matches(matches: &ArgMatches) -> log::LevelFilter {
    if matches.get_flag("debug") {
        log::LevelFilter::Debug
    } else if matches.get_flag("verbose") {
        log::LevelFilter::Info
    } else if matches.get_flag("quiet") {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Warn
    }
}

fn init_logger_from_matches(matches: &ArgMatches) -> Result<(), log::SetLoggerError> {
    memos_dist::init_logger(log_level_from_matches(matches))
}

fn make_fetcher(matches: &ArgMatches) -> Result<Fetcher> {
    validate_args(matches)?;

    let mut builder = FetcherBuilder::new();
    if let Some(r) = matches.get_one::<String>("root") {
        builder = builder.root(r);
    }
    if let Some(p) = matches.get_one::<String>("project") {
        builder = builder.project(p);
    }
    if let Some(url) = matches.get_one::<String>("api-base-url") {
        builder = builder.api_base_url(url);
    }
    let patterns = matches
        .get_many::<String>("pattern")
        .map(|ps| ps.map(String::as_str).collect::<Vec<_>>());
    if let Some(p) = &patterns {
        builder = builder.patterns(p);
    }

    builder.build()
}

fn validate_args(matches: &ArgMatches) -> Result<()> {
    if let Some(mut patterns) = matches.get_many::<String>("pattern") {
        if patterns.any(|p| p.trim().is_empty()) {
            return Err(CliError::InvalidArgsError(
                "The --pattern option cannot be empty.".to_string(),
            )
            .into());
        }
    }

    if let Some(r) = matches.get_one::<String>("root") {
        if r.is_empty() {
            return Err(
                CliError::InvalidArgsError("The --root option cannot be empty.".to_string()).into(),
            );
        }
    }

    Ok(())
}

fn print_err(e: &Error) {
    error!("{e:#}");
    if let Some(ce) = e.downcast_ref::<CliError>() {
        match ce {
            CliError::InvalidArgsError(_) => {
                println!();
                if let Err(e) = cmd().print_help() {
                    eprintln!("Error printing help: {e}");
                }
            }
        }
    }
}
