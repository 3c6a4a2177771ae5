mod core;
mod error;
mod markdown;
mod nav;
mod report;
mod verify;

use anyhow::{Result, bail};
use argh::FromArgs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Keep a tree of Markdown documentation numbered, indexed and cross-linked.
#[derive(FromArgs)]
struct Args {
    /// documentation root (default: docs)
    #[argh(option, default = "PathBuf::from(\"docs\")")]
    root: PathBuf,

    /// show debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Toc(TocCommand),
    Check(CheckCommand),
}

/// Renumber headings and regenerate tables of contents and footers.
#[derive(FromArgs)]
#[argh(subcommand, name = "toc")]
struct TocCommand {
    /// process only this file
    #[argh(option)]
    file: Option<PathBuf>,

    /// report what would change without writing anything
    #[argh(switch)]
    dry_run: bool,

    /// wrap tables of contents in a <details> element
    #[argh(switch)]
    collapsible: bool,

    /// check links in the processed files afterwards
    #[argh(switch)]
    verify: bool,

    /// date for the "Last updated" footer line
    #[argh(option)]
    date: Option<String>,
}

/// Verify anchor, file and external links.
#[derive(FromArgs)]
#[argh(subcommand, name = "check")]
struct CheckCommand {
    /// file or directory to check (default: the documentation root)
    #[argh(positional)]
    path: Option<PathBuf>,

    /// also check the format of external URLs
    #[argh(switch)]
    external: bool,

    /// only report links inside tables of contents
    #[argh(switch)]
    toc_only: bool,

    /// print only the summary
    #[argh(switch)]
    summary_only: bool,
}

fn toc(root: &Path, cmd: TocCommand) -> Result<ExitCode> {
    let mut config = core::Config::load(root)?;
    config.collapsible |= cmd.collapsible;
    if cmd.date.is_some() {
        config.last_updated = cmd.date;
    }
    let ctx = core::Context::new(root, config)?;

    let files = match cmd.file {
        Some(file) => vec![file],
        None => ctx.find_markdown(root),
    };
    let tally = ctx.regenerate(&files, cmd.dry_run);
    log::info!(
        "{} updated, {} unchanged, {} skipped, {} failed",
        tally.updated,
        tally.unchanged,
        tally.skipped,
        tally.failed
    );
    let mut ok = tally.failed == 0;

    if cmd.verify && !cmd.dry_run {
        let run = ctx.check(&files, false);
        let summary = report::print(&run.reports, &ctx.root, false, false);
        ok &= run.failed == 0 && summary.broken == 0;
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn check(root: &Path, cmd: CheckCommand) -> Result<ExitCode> {
    let config = core::Config::load(root)?;
    let ctx = core::Context::new(root, config)?;

    let path = cmd.path.unwrap_or_else(|| root.to_path_buf());
    if !path.exists() {
        bail!("{} does not exist", path.display());
    }
    let files = ctx.find_markdown(&path);
    log::debug!("checking {} files", files.len());

    let run = ctx.check(&files, cmd.external);
    let summary = report::print(&run.reports, &ctx.root, cmd.toc_only, cmd.summary_only);
    Ok(if run.failed > 0 {
        ExitCode::from(2)
    } else if summary.broken > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    let Args {
        root,
        verbose,
        command,
    } = argh::from_env();

    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match command {
        Command::Toc(cmd) => toc(&root, cmd),
        Command::Check(cmd) => check(&root, cmd),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
