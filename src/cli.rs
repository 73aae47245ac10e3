//! Command-line front end: argument parsing, logging setup and the terminal
//! view of a running job.

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use email_verifier_core::core::config::{find_config_file, load_config_file};
use email_verifier_core::presentation::{render_table, status_line};
use email_verifier_core::{
    Config, ConfigBuilder, HttpJobClient, JobController, LifecycleState, Result,
    UploadFile, VerificationOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "email-verifier", version)]
#[command(about = "Submit an address list to an email-verification service and export the results")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config TOML. If omitted, ./email-verifier.toml or ~/.email-verifier/config.toml is used when present.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the verification service.
    #[arg(long, global = true, env = "EMAIL_VERIFIER_SERVER")]
    pub server: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload an address list, wait for the job to finish and write results.csv.
    Verify {
        /// CSV file containing the addresses to verify.
        #[arg(short, long)]
        file: PathBuf,

        /// Probe mailboxes over SMTP.
        #[arg(long)]
        smtp_check: Option<bool>,

        /// Look up a Gravatar for each address.
        #[arg(long)]
        gravatar_check: Option<bool>,

        /// Detect catch-all domains.
        #[arg(long)]
        catch_all_check: Option<bool>,

        /// Directory the CSV export is written to.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Write the CSV as an unescaped plain comma join.
        #[arg(long)]
        legacy_csv: bool,

        /// Milliseconds between progress polls.
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Consecutive failed polls to tolerate before giving up.
        #[arg(long)]
        max_poll_failures: Option<u32>,

        /// Skip printing the result table.
        #[arg(long)]
        no_table: bool,
    },
    /// Print the effective configuration and exit.
    Config,
}

pub fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn,email_verifier_core=info",
        1 => "info,email_verifier_core=debug",
        _ => "debug,email_verifier_core=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 0)
        .init();
}

fn build_config(cli: &Cli, overrides: impl FnOnce(ConfigBuilder) -> ConfigBuilder) -> Result<Config> {
    let mut builder = ConfigBuilder::new();
    if let Some(path) = find_config_file(cli.config.as_deref())? {
        let file = load_config_file(&path)?;
        builder = builder.with_file(file, &path);
    }
    if let Some(server) = &cli.server {
        builder = builder.server_url(server.clone());
    }
    overrides(builder).build()
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Config => {
            let config = build_config(&cli, |b| b)?;
            println!("{:#?}", config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify {
            file,
            smtp_check,
            gravatar_check,
            catch_all_check,
            output,
            legacy_csv,
            poll_interval_ms,
            max_poll_failures,
            no_table,
        } => {
            let config = build_config(&cli, |mut b| {
                if let Some(v) = *smtp_check {
                    b = b.smtp_check(v);
                }
                if let Some(v) = *gravatar_check {
                    b = b.gravatar_check(v);
                }
                if let Some(v) = *catch_all_check {
                    b = b.catch_all_check(v);
                }
                if *legacy_csv {
                    b = b.legacy_csv(true);
                }
                if let Some(ms) = *poll_interval_ms {
                    b = b.poll_interval(Duration::from_millis(ms));
                }
                if let Some(n) = *max_poll_failures {
                    b = b.max_consecutive_poll_failures(n);
                }
                b
            })?;
            verify(&config, file, output, !*no_table).await
        }
    }
}

async fn verify(config: &Config, file: &Path, output: &Path, show_table: bool) -> Result<ExitCode> {
    let upload = UploadFile::from_path(file)
        .await
        .with_context(|| format!("Cannot read address list '{}'", file.display()))?;
    let options: VerificationOptions = config.default_options;

    let client = HttpJobClient::new(config)?;
    tracing::info!("Using verification service at {}", client.base_url());
    let controller = JobController::new(Arc::new(client), config.controller_settings());

    let bar = progress_bar();
    let view = tokio::spawn(follow_progress(controller.subscribe(), bar.clone()));

    let final_state = tokio::select! {
        submitted = controller.submit(Some(upload), options) => match submitted {
            Ok(_) => tokio::select! {
                state = controller.wait_for_settled() => state,
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Interrupted, abandoning job");
                    controller.shutdown().await;
                    controller.state()
                }
            },
            Err(_) => controller.state(),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted during upload");
            controller.shutdown().await;
            controller.state()
        }
    };

    controller.shutdown().await;
    view.abort();
    bar.finish_and_clear();
    println!("{}", status_line(&final_state));

    match &final_state {
        LifecycleState::Completed { results, .. } => {
            if show_table && !results.is_empty() {
                print!("{}", render_table(results));
            }
            let artifact = controller.export()?;
            let path = artifact.write_to(output)?;
            println!("Wrote {} results to {}", results.len(), path.display());
            Ok(ExitCode::SUCCESS)
        }
        LifecycleState::Errored { error, .. } => {
            eprintln!("Verification failed: {}", error);
            Ok(ExitCode::FAILURE)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

async fn follow_progress(mut rx: watch::Receiver<LifecycleState>, bar: ProgressBar) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if let Some(job) = state.job() {
            bar.set_length(job.total);
            bar.set_position(job.progress);
        }
        bar.set_message(status_line(&state));
    }
}
