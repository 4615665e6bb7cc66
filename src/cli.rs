use crate::logging::{self, LogDestination};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use vote_console::api::{ControlPlane, HttpControlPlane};
use vote_console::model::{
    ClientConfig, DedupStrategy, JobForm, JobSnapshot, SessionEvent, SessionState,
};
use vote_console::orchestrator::{parse_vote_count, run_controller, UiCommand};

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DedupArg {
    /// Compare message text (tolerates server resets and reordering)
    Content,
    /// Take the unseen suffix of an append-only server log
    Length,
}

impl From<DedupArg> for DedupStrategy {
    fn from(v: DedupArg) -> Self {
        match v {
            DedupArg::Content => DedupStrategy::Content,
            DedupArg::Length => DedupStrategy::Length,
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "vote-console",
    version,
    about = "Start, watch and stop a remote voting job"
)]
pub struct Cli {
    /// Base URL of the voting server
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Number of votes to request (required for --text/--json, prefills the TUI form)
    #[arg(long)]
    pub votes: Option<String>,

    /// Extra form field forwarded to /start_voting as KEY=VALUE (repeatable)
    #[arg(long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Status polling cadence
    #[arg(long, default_value = "1s")]
    pub poll_interval: humantime::Duration,

    /// Timeout for each HTTP request
    #[arg(long, default_value = "10s")]
    pub request_timeout: humantime::Duration,

    /// Maximum number of log lines kept on screen
    #[arg(long, default_value_t = vote_console::model::DEFAULT_MAX_LOG_LINES)]
    pub max_log_lines: usize,

    /// How server log lines are deduplicated
    #[arg(long, value_enum, default_value_t = DedupArg::Content)]
    pub dedup: DedupArg,

    /// Run one job and print a text summary (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run one job and print the final snapshot as JSON (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Write diagnostics to this file instead of the default location
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,

    /// Enable debug diagnostics
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.text && args.json {
        return Err(anyhow::anyhow!("--text and --json are mutually exclusive"));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            logging::initialize(tui_log_destination(&args), args.verbose);
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            logging::initialize(LogDestination::Terminal, args.verbose);
            return run_text(args).await;
        }
    }

    let destination = match args.log_file.clone() {
        Some(path) => LogDestination::File(path),
        None => LogDestination::Terminal,
    };
    logging::initialize(destination, args.verbose);

    if args.json {
        return run_json(args).await;
    }
    run_text(args).await
}

#[cfg(feature = "tui")]
fn tui_log_destination(args: &Cli) -> LogDestination {
    match args.log_file.clone() {
        Some(path) => LogDestination::File(path),
        None => logging::default_log_path()
            .map(LogDestination::File)
            .unwrap_or(LogDestination::Discard),
    }
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        poll_interval: args.poll_interval.into(),
        request_timeout: args.request_timeout.into(),
        max_log_lines: args.max_log_lines,
        dedup: args.dedup.into(),
        user_agent: format!("vote-console/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Build the start form from CLI arguments, using `votes` for the count.
pub fn build_form(args: &Cli, votes: &str) -> JobForm {
    args.fields
        .iter()
        .fold(JobForm::new(votes), |form, (k, v)| form.with_field(k, v))
}

pub fn build_client(cfg: &ClientConfig) -> Result<Arc<dyn ControlPlane>> {
    let client = HttpControlPlane::new(cfg).context("failed to set up HTTP client")?;
    Ok(Arc::new(client))
}

/// How a non-interactive run ended.
struct JobOutcome {
    started: bool,
    last: Option<JobSnapshot>,
    log: Vec<String>,
}

/// Run one job to a terminal state, streaming log lines to `out` when given.
///
/// Ctrl-C acts as the stop button; a second Ctrl-C quits without waiting.
async fn run_one_job(
    args: &Cli,
    out: Option<&mpsc::UnboundedSender<OutputLine>>,
) -> Result<JobOutcome> {
    let votes = args
        .votes
        .clone()
        .context("--votes is required with --text or --json")?;
    // The session would only log a bad count and wait for the next submit;
    // there is no next submit here, so refuse before anything starts.
    parse_vote_count(&votes).context("invalid --votes")?;
    let cfg = build_config(args);
    let api = build_client(&cfg)?;
    let form = build_form(args, &votes);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let ctrl = tokio::spawn(async move { run_controller(&cfg, api, event_tx, cmd_rx).await });
    let _ = cmd_tx.send(UiCommand::Submit(form));

    let mut outcome = JobOutcome {
        started: false,
        last: None,
        log: Vec::new(),
    };
    let mut last_stats = String::new();
    let mut interrupts = 0u8;
    let mut state = SessionState::Idle;

    loop {
        tokio::select! {
            ev = event_rx.recv() => {
                let Some(ev) = ev else { break };
                match ev {
                    SessionEvent::LogAppended(lines) => {
                        for line in lines {
                            if let Some(tx) = out {
                                let _ = tx.send(OutputLine::Stderr(format!("[{}] {}", clock(), line)));
                            }
                            outcome.log.push(line);
                        }
                    }
                    SessionEvent::LogCleared => outcome.log.clear(),
                    SessionEvent::Progress(u) => {
                        if u.view.stats_text != last_stats {
                            if let Some(tx) = out {
                                let _ = tx.send(OutputLine::Stderr(format!(
                                    "Progress: {} ({:.1}%), {} ok, {} failed",
                                    u.view.stats_text, u.view.percent, u.success_count, u.error_count
                                )));
                            }
                            last_stats = u.view.stats_text;
                        }
                    }
                    SessionEvent::Status(text) => {
                        if let Some(tx) = out {
                            let _ = tx.send(OutputLine::Stderr(text));
                        }
                    }
                    SessionEvent::State(s) => {
                        state = s;
                        if s == SessionState::Running {
                            outcome.started = true;
                        } else if s == SessionState::Idle && !outcome.started {
                            // Start was refused or never reached the server.
                            let _ = cmd_tx.send(UiCommand::Quit);
                        }
                    }
                    SessionEvent::Finished(last) => {
                        outcome.last = last.map(|b| *b);
                        let _ = cmd_tx.send(UiCommand::Quit);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                interrupts = interrupts.saturating_add(1);
                match interrupt_action(state, interrupts) {
                    UiCommand::Stop => {
                        if let Some(tx) = out {
                            let _ = tx.send(OutputLine::Stderr("Interrupt: asking the server to stop (Ctrl-C again to quit)".into()));
                        }
                        let _ = cmd_tx.send(UiCommand::Stop);
                    }
                    cmd => {
                        let _ = cmd_tx.send(cmd);
                    }
                }
            }
        }
    }

    ctrl.await.context("controller task failed")??;
    Ok(outcome)
}

/// What Ctrl-C means: the first one stops a running job, anything else quits.
fn interrupt_action(state: SessionState, interrupts: u8) -> UiCommand {
    if interrupts == 1 && state == SessionState::Running {
        UiCommand::Stop
    } else {
        UiCommand::Quit
    }
}

async fn run_text(args: Cli) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let outcome = run_one_job(&args, Some(&out_tx)).await;

    let res = match outcome {
        Ok(outcome) => {
            if let Some(last) = outcome.last.as_ref() {
                for line in crate::text_summary::build_text_summary(last).lines {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
            if outcome.started {
                Ok(())
            } else {
                Err(anyhow::anyhow!(
                    "job was not started: {}",
                    outcome.log.last().map(String::as_str).unwrap_or("no reply")
                ))
            }
        }
        Err(e) => Err(e),
    };

    drop(out_tx);
    let _ = out_handle.await;
    res
}

async fn run_json(args: Cli) -> Result<()> {
    let outcome = run_one_job(&args, None).await?;
    if !outcome.started {
        return Err(anyhow::anyhow!(
            "job was not started: {}",
            outcome.log.last().map(String::as_str).unwrap_or("no reply")
        ));
    }
    let summary = serde_json::json!({
        "snapshot": outcome.last,
        "log": outcome.log,
    });
    let (out_tx, out_handle) = spawn_output_writer();
    let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&summary)?));
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Local wall-clock time for log line prefixes.
pub(crate) fn clock() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(time::macros::format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "--:--:--".into())
}
