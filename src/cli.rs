use crate::api::{HttpApi, SimulationApi};
use crate::model::{RegistrationSettings, SimStatus, SimulationSettings};
use crate::simulation::{Alert, SimState, SimulationController};
use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

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

#[derive(Debug, Parser, Clone)]
#[command(
    name = "lcc-tutorial",
    version,
    about = "Interactive LCC SDK tutorial with a live simulation dashboard"
)]
pub struct Cli {
    /// Base URL of the tutorial server
    #[arg(long, default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Instance to control (headless modes default to the first registered one)
    #[arg(long)]
    pub instance: Option<String>,

    /// Tutorial step to open, e.g. `limits` or `#runtime`
    #[arg(long)]
    pub page: Option<String>,

    /// Iterations per simulation run
    #[arg(long, default_value_t = 100)]
    pub iterations: u32,

    /// Delay between iterations on the server, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub interval_ms: u64,

    /// Features the simulation calls (comma separated); empty lets the server pick
    #[arg(long, value_delimiter = ',')]
    pub features: Vec<String>,

    /// Calls per iteration for a feature, as `feature=count` (repeatable)
    #[arg(long = "call-pattern", value_parser = parse_call_pattern)]
    pub call_pattern: Vec<(String, u32)>,

    /// Status poll cadence
    #[arg(long, default_value = "500ms")]
    pub status_interval: humantime::Duration,

    /// Events poll cadence
    #[arg(long, default_value = "1s")]
    pub events_interval: humantime::Duration,

    /// Per-request HTTP timeout
    #[arg(long, default_value = "10s")]
    pub request_timeout: humantime::Duration,

    /// Version reported when the setup step registers an instance
    #[arg(long, default_value = "1.0.0")]
    pub product_version: String,

    /// LCC server address sent with registrations (defaults to the tutorial server's own)
    #[arg(long)]
    pub lcc_url: Option<String>,

    /// Directory for exported snapshots (defaults to the downloads directory)
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Log file for the TUI (headless modes log to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the final export snapshot as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print progress and a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.json || self.text || cfg!(not(feature = "tui"))
    }
}

fn parse_call_pattern(raw: &str) -> Result<(String, u32), String> {
    let (feature, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected feature=count, got `{raw}`"))?;
    let feature = feature.trim();
    if feature.is_empty() {
        return Err(format!("missing feature name in `{raw}`"));
    }
    let count = count
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid call count in `{raw}`: {e}"))?;
    Ok((feature.to_string(), count))
}

/// Everything a run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub instance: Option<String>,
    pub initial_page: String,
    pub simulation: SimulationSettings,
    pub registration: RegistrationSettings,
}

impl AppConfig {
    pub fn connect(&self) -> Result<HttpApi> {
        HttpApi::new(&self.base_url, &self.user_agent, self.request_timeout)
            .with_context(|| format!("invalid server address {}", self.base_url))
    }
}

fn default_export_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Build an `AppConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> AppConfig {
    let call_pattern: BTreeMap<String, u32> = args.call_pattern.iter().cloned().collect();
    let features_to_call = args
        .features
        .iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    AppConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("lcc-tutorial/{}", env!("CARGO_PKG_VERSION")),
        request_timeout: Duration::from(args.request_timeout),
        instance: args.instance.clone(),
        initial_page: args.page.clone().unwrap_or_default(),
        simulation: SimulationSettings {
            iterations: args.iterations,
            interval_ms: args.interval_ms,
            features_to_call,
            call_pattern,
            status_interval: Duration::from(args.status_interval),
            events_interval: Duration::from(args.events_interval),
            export_dir: args.export_dir.clone().unwrap_or_else(default_export_dir),
        },
        registration: RegistrationSettings {
            version: args.product_version.trim().to_string(),
            lcc_url: args
                .lcc_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
        },
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(cfg).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(cfg, false).await;
        }
    }
    run_headless(cfg, args.json).await
}

fn alert_error<A: SimulationApi>(ctrl: &SimulationController<A>) -> Option<String> {
    match ctrl.view().alert.as_ref() {
        Some(Alert::Error(msg)) => Some(msg.clone()),
        _ => None,
    }
}

enum Finish {
    Finished,
    Interrupted,
}

/// Start one simulation, follow it until the server reports it finished (or
/// Ctrl-C stops it), then print a summary or the export snapshot.
async fn run_headless(cfg: AppConfig, json: bool) -> Result<()> {
    let api = Arc::new(cfg.connect()?);
    let (out_tx, out_handle) = spawn_output_writer();
    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
    let mut ctrl = SimulationController::new(api.clone(), cfg.simulation.clone(), updates_tx);

    let instance = match cfg.instance.clone() {
        Some(id) => id,
        None => {
            ctrl.load_instances().await;
            if let Some(msg) = alert_error(&ctrl) {
                anyhow::bail!(msg);
            }
            ctrl.view()
                .instances
                .first()
                .map(|i| i.instance_id.clone())
                .context("no registered instances; start an SDK client first")?
        }
    };

    ctrl.select_instance(&instance);
    ctrl.start_simulation().await;
    if ctrl.state() != SimState::Running {
        let msg = alert_error(&ctrl).unwrap_or_else(|| "simulation did not start".into());
        anyhow::bail!(msg);
    }
    let _ = out_tx.send(OutputLine::Stderr(format!(
        "== Simulation on {instance}: {} iterations every {}ms ==",
        cfg.simulation.iterations, cfg.simulation.interval_ms
    )));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_completed = None;
    let finish = loop {
        tokio::select! {
            Some(update) = updates_rx.recv() => {
                if !ctrl.apply_update(update) {
                    continue;
                }
                let view = ctrl.view();
                let Some(status) = view.status else { continue };
                if last_completed != Some(view.metrics.completed_iterations) {
                    last_completed = Some(view.metrics.completed_iterations);
                    let _ = out_tx.send(OutputLine::Stderr(
                        crate::text_summary::progress_line(view),
                    ));
                }
                if status.is_finished() {
                    break Finish::Finished;
                }
            }
            _ = &mut ctrl_c => {
                break Finish::Interrupted;
            }
        }
    };

    if let Finish::Interrupted = finish {
        let _ = out_tx.send(OutputLine::Stderr("Interrupted, stopping simulation".into()));
        ctrl.stop_simulation().await;
    }
    ctrl.teardown();

    if json {
        let snapshot = api
            .export(&instance)
            .await
            .context("failed to export simulation snapshot")?;
        let out = serde_json::to_string_pretty(&snapshot)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        for line in crate::text_summary::build_text_summary(&instance, ctrl.view()).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    if ctrl.view().status == Some(SimStatus::Error) {
        tracing::warn!(instance = %instance, "simulation ended with an error");
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_pattern_parses_feature_and_count() {
        assert_eq!(parse_call_pattern("reports=2").unwrap(), ("reports".into(), 2));
        assert_eq!(parse_call_pattern(" export = 5 ").unwrap(), ("export".into(), 5));
        assert!(parse_call_pattern("reports").is_err());
        assert!(parse_call_pattern("=3").is_err());
        assert!(parse_call_pattern("reports=x").is_err());
    }

    #[test]
    fn config_folds_simulation_flags() {
        let args = Cli::try_parse_from([
            "lcc-tutorial",
            "--iterations",
            "50",
            "--features",
            "reports,export",
            "--call-pattern",
            "reports=2",
            "--call-pattern",
            "export=1",
            "--status-interval",
            "250ms",
            "--export-dir",
            "/tmp/out",
            "--page",
            "#runtime",
        ])
        .unwrap();
        let cfg = build_config(&args);
        assert_eq!(cfg.simulation.iterations, 50);
        assert_eq!(cfg.simulation.features_to_call, vec!["reports", "export"]);
        assert_eq!(cfg.simulation.call_pattern.get("reports"), Some(&2));
        assert_eq!(cfg.simulation.call_pattern.get("export"), Some(&1));
        assert_eq!(cfg.simulation.status_interval, Duration::from_millis(250));
        assert_eq!(cfg.simulation.events_interval, Duration::from_secs(1));
        assert_eq!(cfg.simulation.export_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.initial_page, "#runtime");
        assert!(cfg.user_agent.starts_with("lcc-tutorial/"));
    }

    #[test]
    fn defaults_match_server_defaults() {
        let args = Cli::try_parse_from(["lcc-tutorial"]).unwrap();
        let cfg = build_config(&args);
        assert_eq!(cfg.simulation.iterations, 100);
        assert_eq!(cfg.simulation.interval_ms, 500);
        assert!(cfg.simulation.features_to_call.is_empty());
        assert_eq!(cfg.simulation.status_interval, Duration::from_millis(500));
        assert_eq!(cfg.initial_page, "");
        assert!(cfg.instance.is_none());
        assert_eq!(cfg.registration.version, "1.0.0");
        assert!(cfg.registration.lcc_url.is_none());
    }

    #[test]
    fn registration_flags_reach_the_setup_step() {
        let args = Cli::try_parse_from([
            "lcc-tutorial",
            "--product-version",
            "2.1.0",
            "--lcc-url",
            " http://lcc:7086 ",
        ])
        .unwrap();
        let cfg = build_config(&args);
        assert_eq!(cfg.registration.version, "2.1.0");
        assert_eq!(cfg.registration.lcc_url.as_deref(), Some("http://lcc:7086"));

        let args = Cli::try_parse_from(["lcc-tutorial", "--lcc-url", "  "]).unwrap();
        assert!(build_config(&args).registration.lcc_url.is_none());
    }
}
