//! claudeline - status line for Claude Code
//!
//! Reads the status JSON Claude Code pipes in on every render and prints one
//! line: model and plan, git branch, context window fill, and the 5-hour and
//! 7-day subscription quota windows.

mod git;
mod input;
mod logging;
mod output;

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use claudeline_core::{
    ClaudeUsageFetcher, CredentialStore, Credentials, Profile, QuotaCache, QuotaService,
    QuotaWindowType,
};
use output::StatusLine;

#[derive(Parser)]
#[command(name = "claudeline")]
#[command(author, version, about = "Status line for Claude Code", long_about = None)]
pub struct Cli {
    /// Append diagnostics to claudeline-debug.log in the temp directory
    #[arg(long)]
    debug: bool,

    /// Show the git tag pointing at HEAD
    #[arg(long)]
    git_tag: bool,

    /// Max display length for the git tag
    #[arg(long, default_value_t = 30)]
    git_tag_max_len: usize,

    /// Claude Code config directory; selects the credential profile
    #[arg(long, env = "CLAUDE_CONFIG_DIR")]
    config_dir: Option<String>,

    /// Auto-compaction threshold in percent (default 85)
    #[arg(long, env = "CLAUDE_AUTOCOMPACT_PCT_OVERRIDE", hide = true)]
    autocompact_pct: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(cli.debug);
    // stdout is a pipe to Claude Code, which renders the escapes itself
    colored::control::set_override(true);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("claudeline: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let input = input::read_stdin()?;
    let profile = Profile::new(cli.config_dir);

    let creds = CredentialStore::new(&profile)
        .resolve()
        .unwrap_or_else(|e| {
            log::warn!("credentials: {}", e);
            Credentials::default()
        });
    let plan = creds.plan();

    let mut line = StatusLine::new();
    if let Some(identity) = output::identity(&input.model.display_name, plan) {
        line.push(identity);
    }

    let cwd = Path::new(".");
    if let Some(branch) = git::current_branch(cwd) {
        line.push(output::branch_segment(&branch));
    }
    if cli.git_tag {
        if let Some(tag) = git::head_tag(cwd) {
            line.push(output::tag_segment(&tag, cli.git_tag_max_len));
        }
    }

    let critical_pct = output::context_critical_pct(cli.autocompact_pct.as_deref());
    line.push(output::context_segment(input.context_percent(), critical_pct));

    if !creds.has_token() {
        log::info!("usage: no access token found");
    } else if plan.is_none() {
        log::info!(
            "usage: unknown subscription type {:?}, expected pro/max/team",
            creds.subscription_type
        );
    } else {
        if creds.is_expired_at(Utc::now()) {
            log::warn!("usage: access token expired, run `claude /login` to renew it");
        }

        let service =
            QuotaService::new(QuotaCache::for_profile(&profile), ClaudeUsageFetcher::new());
        if let Some(snapshot) = service.get_quota(&creds.access_token).await {
            for window_type in [QuotaWindowType::FiveHour, QuotaWindowType::SevenDay] {
                line.push(output::usage_segment(snapshot.window(window_type), window_type));
            }
        }
    }

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line.render()).context("write status line")?;
    Ok(())
}
