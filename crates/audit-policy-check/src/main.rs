mod check;
mod cli;
mod config;

use std::path::Path;

use anyhow::{Context, Result};
use audit_policy::RuleEvaluator;
use clap::Parser;
use decision_log::DecisionSink;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::info;

use crate::cli::Cli;

/// Open the request stream; `-` reads stdin.
async fn open_requests(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open requests file: {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let mut cfg = config::load(&cli.config)?;

    if let Some(ref policy) = cli.policy {
        cfg.policy_file = policy.clone();
    }
    if let Some(ref output) = cli.output {
        cfg.logging.decision_log_path = output.clone();
    }

    // 3. Init tracing-subscriber with JSON format on stderr, keeping stdout
    //    for the summary and rule dump.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        config_file = %cli.config.display(),
        policy_file = %cfg.policy_file.display(),
        decision_log = %cfg.logging.decision_log_path.display(),
        "audit-policy-check starting"
    );

    // 4. Load and normalize the policy.
    let policy = audit_policy::loader::load_policy(&cfg.policy_file)
        .context("failed to load policy file")?;
    let evaluator = RuleEvaluator::new(policy);

    info!(
        policy_file = %cfg.policy_file.display(),
        ?evaluator,
        "audit policy loaded"
    );

    if cli.dump_rules {
        let yaml = serde_yml::to_string(evaluator.rules()).context("failed to render rules")?;
        print!("{yaml}");
        return Ok(());
    }

    // 5. Start the decision log and evaluate the request stream.
    let Some(requests_path) = cli.requests.as_deref() else {
        anyhow::bail!("--requests is required unless --dump-rules is given");
    };
    let input = open_requests(requests_path).await?;

    let (sink, writer_handle) = DecisionSink::start(&cfg.logging.decision_log_path)
        .await
        .context("failed to start decision log")?;

    let summary = check::run(&evaluator, input, &sink).await?;

    // 6. Close the sink so the writer flushes, then report.
    drop(sink);
    writer_handle
        .await
        .context("decision log writer task failed")?;

    info!(
        evaluated = summary.evaluated,
        matched = summary.matched,
        skipped = summary.skipped,
        "audit-policy-check finished"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("failed to render summary")?
    );

    Ok(())
}
