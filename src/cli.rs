//! Command-line interface: argument parsing and the `tail` / `ls` commands.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use crossterm::tty::IsTty;
use cwtail_core::config::{Config, FailurePolicy};
use cwtail_core::time::{default_start, parse_time};
use cwtail_core::{LogApi, SourceSpec};
use cwtail_engine::{SessionConfig, SessionReport, TailSession};
use cwtail_remote::HttpLogApi;
use regex::Regex;

use crate::format::LineFormat;

#[derive(Parser, Debug)]
#[command(
    name = "cwtail",
    version,
    about = "Tail remote log groups from your terminal"
)]
pub struct Cli {
    /// Profile sent to the log API.
    #[arg(short = 'p', long, global = true, value_name = "PROFILE")]
    pub profile: Option<String>,

    /// Region sent to the log API.
    #[arg(short = 'r', long, global = true, value_name = "REGION")]
    pub region: Option<String>,

    /// Base URL of the log API (overrides the config file).
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Disable coloured output.
    #[arg(short = 'c', long = "no-color", global = true)]
    pub no_color: bool,

    /// Write debug logs to stderr.
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Config file to use instead of ~/.config/cwtail/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Tail log groups and streams.
    Tail(TailArgs),
    /// List groups or streams.
    #[command(subcommand)]
    Ls(LsCommand),
}

#[derive(Subcommand, Debug)]
pub enum LsCommand {
    /// Show every log group.
    Groups,
    /// Show every stream in a log group.
    Streams {
        /// The log group name.
        group: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct TailArgs {
    /// Log group and optional stream prefix, e.g. `app:web`. When none are
    /// given and stdin is piped, the first stdin line is used.
    #[arg(value_name = "GROUP[:PREFIX]")]
    pub sources: Vec<String>,

    /// Keep waiting for new events instead of stopping at the end.
    #[arg(short = 'f', long)]
    pub follow: bool,

    /// Start time: `2017-02-27[T09[:00[:00]]]`, `hh[:mm]`, `80m`, `4h30m` or
    /// `now`. Defaults to 30 seconds ago.
    #[arg(short = 'b', long = "start", value_name = "TIME")]
    pub start: Option<String>,

    /// End time, same formats as --start. Ignored with --follow.
    #[arg(short = 'e', long = "end", value_name = "TIME")]
    pub end: Option<String>,

    /// Print the event timestamp.
    #[arg(short = 't', long = "timestamp")]
    pub timestamp: bool,

    /// Print the stream name.
    #[arg(short = 's', long = "stream-name")]
    pub stream_name: bool,

    /// Print the group name.
    #[arg(short = 'n', long = "group-name")]
    pub group_name: bool,

    /// Print the event id.
    #[arg(short = 'i', long = "event-id")]
    pub event_id: bool,

    /// Interpret and print times in the local timezone.
    #[arg(short = 'l', long)]
    pub local: bool,

    /// Server-side pattern events must match.
    #[arg(short = 'g', long, value_name = "PATTERN")]
    pub grep: Option<String>,

    /// Drop events whose message matches this regex.
    #[arg(short = 'v', long, value_name = "REGEX")]
    pub grepv: Option<String>,

    /// What to do when one source fails: abort | continue.
    #[arg(long = "on-error", value_name = "POLICY")]
    pub on_error: Option<FailurePolicy>,
}

impl TailArgs {
    pub fn line_format(&self, color: bool) -> LineFormat {
        LineFormat {
            event_id: self.event_id,
            stream: self.stream_name,
            group: self.group_name,
            timestamp: self.timestamp,
            local: self.local,
            color,
        }
    }

    /// Build the session config, validating every expression up front.
    pub fn session_config(&self, config: &Config, now: DateTime<Utc>) -> anyhow::Result<SessionConfig> {
        let start = match &self.start {
            Some(expr) => parse_time(expr, self.local, now).context("invalid start time")?,
            None => default_start(now),
        };
        let end = self
            .end
            .as_deref()
            .map(|expr| parse_time(expr, self.local, now))
            .transpose()
            .context("invalid end time")?;

        let mut session = SessionConfig::from_tail_config(
            &config.tail,
            self.follow,
            start.timestamp_millis(),
            end.map(|e| e.timestamp_millis()),
        );
        if let Some(pattern) = self.grep.as_deref().filter(|p| !p.is_empty()) {
            session = session.with_include(pattern);
        }
        if let Some(pattern) = self.grepv.as_deref().filter(|p| !p.is_empty()) {
            let exclude = Regex::new(pattern)
                .with_context(|| format!("invalid --grepv pattern {pattern:?}"))?;
            session = session.with_exclude(exclude);
        }
        if let Some(policy) = self.on_error {
            session = session.with_policy(policy);
        }
        Ok(session)
    }
}

/// Parse every `group[:prefix]` argument.
pub fn parse_sources(args: &[String]) -> anyhow::Result<Vec<SourceSpec>> {
    if args.is_empty() {
        anyhow::bail!("no log group given");
    }
    args.iter()
        .map(|a| a.parse::<SourceSpec>().map_err(anyhow::Error::from))
        .collect()
}

/// The given sources, or the whitespace-separated words of the first line of
/// `piped` when none were given.
pub fn sources_or_stdin<R: BufRead>(given: Vec<String>, piped: Option<R>) -> io::Result<Vec<String>> {
    if !given.is_empty() {
        return Ok(given);
    }
    let Some(mut reader) = piped else {
        return Ok(given);
    };
    let mut line = String::new();
    reader.read_line(&mut line)?;
    tracing::debug!(input = %line.trim_end(), "sources from stdin");
    Ok(line.split_whitespace().map(str::to_string).collect())
}

/// Load the config file and apply the global flag overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading config")?,
    };
    if let Some(endpoint) = &cli.endpoint {
        config.remote.endpoint = endpoint.clone();
    }
    if cli.profile.is_some() {
        config.remote.profile = cli.profile.clone();
    }
    if cli.region.is_some() {
        config.remote.region = cli.region.clone();
    }
    tracing::debug!(
        endpoint = %config.remote.endpoint,
        profile = ?config.remote.profile,
        region = ?config.remote.region,
        "config loaded"
    );
    Ok(config)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let api: Arc<dyn LogApi> = Arc::new(HttpLogApi::new(&config.remote)?);
    let mut stdout = io::stdout().lock();
    let color = !cli.no_color && io::stdout().is_tty();

    match cli.command {
        Command::Tail(mut args) => {
            let stdin = io::stdin();
            let piped = (!stdin.is_tty()).then(|| stdin.lock());
            args.sources = sources_or_stdin(std::mem::take(&mut args.sources), piped)?;
            tail(api, &config, &args, color, &mut stdout).await?;
        }
        Command::Ls(LsCommand::Groups) => list_groups(api.as_ref(), &mut stdout).await?,
        Command::Ls(LsCommand::Streams { group }) => {
            list_streams(api.as_ref(), &group, &mut stdout).await?
        }
    }
    Ok(())
}

/// Run a tail session, printing one line per event until it ends or Ctrl-C.
pub async fn tail<W: Write>(
    api: Arc<dyn LogApi>,
    config: &Config,
    args: &TailArgs,
    color: bool,
    out: &mut W,
) -> anyhow::Result<SessionReport> {
    let specs = parse_sources(&args.sources)?;
    let session = args.session_config(config, Utc::now())?;
    let format = args.line_format(color);
    for spec in &specs {
        tracing::debug!(source = %spec, "tailing");
    }

    let mut handle = TailSession::start(api, session, specs);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut write_error = None;

    loop {
        tokio::select! {
            _ = &mut ctrl_c, if !interrupted => {
                tracing::debug!("interrupted, stopping");
                interrupted = true;
                handle.cancel();
            }
            event = handle.recv() => {
                let Some(event) = event else { break };
                if let Err(e) = writeln!(out, "{}", format.format(&event)) {
                    write_error = Some(e);
                    handle.cancel();
                    break;
                }
            }
        }
    }

    let report = handle.finish().await?;
    match write_error {
        Some(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
        _ => {
            out.flush().ok();
            Ok(report)
        }
    }
}

pub async fn list_groups<W: Write>(api: &dyn LogApi, out: &mut W) -> anyhow::Result<()> {
    for group in api.list_groups().await? {
        writeln!(out, "{group}")?;
    }
    Ok(())
}

pub async fn list_streams<W: Write>(api: &dyn LogApi, group: &str, out: &mut W) -> anyhow::Result<()> {
    let streams = api
        .list_streams(group, None)
        .await
        .with_context(|| format!("log group {group}"))?;
    for stream in streams {
        writeln!(out, "{}", stream.name)?;
    }
    Ok(())
}
