//! prod-teardown: dependency-ordered teardown of a project's AWS resources
//!
//! Discovers every resource belonging to the project, prints the inventory,
//! asks for confirmation and then deletes it all in dependency order.

use anyhow::{Context, Result};
use clap::Parser;
use prod_teardown::aws::{AwsCloud, AwsContext, FromAwsContext, caller_identity};
use prod_teardown::config::{OutputFormat, PollingConfig, TargetConfig, TeardownConfig};
use prod_teardown::confirm::ConfirmationGate;
use prod_teardown::pipeline::{RunOutcome, TeardownPipeline};
use prod_teardown::report;
use prod_teardown_common::defaults::{
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PROJECT_TAG, DEFAULT_REGION, DEFAULT_WAIT_TIMEOUT_SECS,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "prod-teardown")]
#[command(about = "Tear down every AWS resource belonging to a project")]
#[command(version)]
struct Args {
    /// Only report what would be deleted
    #[arg(long)]
    dry_run: bool,

    /// AWS region
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// Value of the `Project` tag to tear down
    #[arg(long, default_value = DEFAULT_PROJECT_TAG)]
    project_tag: String,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long, env = "AWS_PROFILE")]
    aws_profile: Option<String>,

    /// Seconds between status polls while waiting on a deletion
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval: u64,

    /// Give up waiting on a single deletion after this many seconds
    #[arg(long, default_value_t = DEFAULT_WAIT_TIMEOUT_SECS)]
    wait_timeout: u64,

    /// Output format for the final summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl From<Args> for TeardownConfig {
    fn from(args: Args) -> Self {
        Self {
            target: TargetConfig {
                region: args.region,
                project_tag: args.project_tag,
                aws_profile: args.aws_profile,
            },
            polling: PollingConfig {
                poll_interval_secs: args.poll_interval,
                wait_timeout_secs: args.wait_timeout,
            },
            dry_run: args.dry_run,
            format: args.format,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

fn init_tracing() -> Result<()> {
    // Reduce noise from the AWS SDK (show only warnings and errors)
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into())
        .add_directive("aws_config=warn".parse()?)
        .add_directive("aws_sdk=warn".parse()?)
        .add_directive("aws_smithy=warn".parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run() -> Result<()> {
    let config: TeardownConfig = Args::parse().into();
    init_tracing()?;

    if let Some(profile) = config.aws_profile() {
        info!(profile = %profile, "Using AWS profile");
    }

    let aws = AwsContext::new(config.region(), config.aws_profile()).await;
    let caller = caller_identity(aws.sdk_config())
        .await
        .context("Credential check failed, nothing was discovered or deleted")?;

    let scope = config.scope();
    let mode = config.mode();
    info!(
        account = %caller.account,
        region = %aws.region(),
        project = %scope.project_tag,
        mode = %mode,
        "Starting teardown run"
    );

    let cloud = AwsCloud::from_context(&aws);
    let wait = config.wait();
    let mut pipeline = TeardownPipeline::new(&cloud, &scope, &wait).with_format(config.format);
    let mut gate = ConfirmationGate::terminal(config.format);
    let outcome = pipeline.run(mode, &mut gate).await?;

    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report::outcome_json(&outcome))?);
        }
        OutputFormat::Table => match &outcome {
            RunOutcome::Completed { execution, .. } => report::print_summary(execution),
            RunOutcome::Cancelled { .. } => println!("\nCancelled. Nothing was deleted."),
        },
    }

    Ok(())
}
