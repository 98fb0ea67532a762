// ABOUTME: Runs one query through a deepmux agent and prints the tool trace.
// ABOUTME: Reads deepmux.json, discovers every server, shows the catalog, then runs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use deepmux::prelude::*;

const DEFAULT_QUERY: &str = "Give me a high-level overview of the database contents. \
List a few tables from the main schema and preview 5 rows from 1-2 relevant tables.";

#[derive(Parser, Debug)]
#[command(about = "Run one query through an MCP tool agent and print its trace")]
struct CliArgs {
    /// The question to ask. Defaults to a database overview.
    query: Option<String>,

    /// Configuration file. Falls back to ./deepmux.json, then ~/.deepmux.json.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Abort the run after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print trace events as JSON lines.
    #[arg(long)]
    json: bool,
}

fn print_catalog(agent: &Agent) {
    println!("Discovered MCP tools:");
    for descriptor in agent.catalog.iter() {
        let status = if agent.runtime.toolbox().get(&descriptor.name).is_some() {
            ""
        } else {
            "  [denied]"
        };
        let description = if descriptor.description.is_empty() {
            "-"
        } else {
            descriptor.description.as_str()
        };
        println!(
            "  {:<28} {:<10} {}{}",
            descriptor.name, descriptor.server, description, status
        );
    }
    for failure in &agent.degraded {
        eprintln!("Warning: {}", failure);
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()?;

    let config = AgentConfig::locate(args.config.as_deref())?.with_env();
    if let Some(path) = &config.source {
        tracing::info!(path = %path.display(), "using config file");
    }

    let agent = build_from_config(&config).await?;
    print_catalog(&agent);

    let query = args.query.unwrap_or_else(|| DEFAULT_QUERY.to_string());
    println!("User query:\n  {}\n", query);

    let mut control = RunControl::new();
    if let Some(secs) = args.timeout_secs {
        control = control.with_deadline(tokio::time::Instant::now() + Duration::from_secs(secs));
    }

    let cancel = control.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut run = agent.runtime.start(query);
    let outcome = run.execute(&control).await;

    println!("Agent trace:");
    for event in render(run.transcript()) {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", event);
        }
    }

    // Connections close even when the run failed.
    agent.shutdown().await;

    let outcome = outcome?;
    tracing::info!(
        run_id = %outcome.run_id,
        iterations = outcome.iterations,
        tool_calls = outcome.tool_call_count,
        input_tokens = outcome.usage.input_tokens,
        output_tokens = outcome.usage.output_tokens,
        "run finished"
    );

    Ok(())
}
