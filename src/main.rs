//! placement-validator - runs placement trials against a live cluster.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Loads the topology and creates the Kubernetes client
//! - Runs the requested number of trials and writes their reports

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use kube::Client;
use tracing::{error, info};

use placement_validator::config::{DEFAULT_EXECUTIONS, DEFAULT_NAMESPACE, DEFAULT_RESULTS_DIR};
use placement_validator::topology::{HopStrategy, REFERENCE_ROOT};
use placement_validator::{
    FileReportWriter, KubeClusterClient, TopologyGraph, TrialKind, TrialOrchestrator,
    ValidatorConfig, load_trial, run_batch,
};

#[derive(Parser, Debug)]
#[command(version, about = "Validate placements of a CU/DU/RU split placement controller")]
struct Args {
    /// Kind of placement request to submit (placer or splits)
    #[arg(long, default_value = "placer")]
    kind: TrialKind,

    /// YAML template of the request
    #[arg(long)]
    template: PathBuf,

    /// Number of sequential trials
    #[arg(long, default_value_t = DEFAULT_EXECUTIONS)]
    number_of_executions: u32,

    /// Namespace the controller deploys into
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// YAML adjacency file replacing the reference topology
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Ingress node hop counts start from
    #[arg(long, default_value = REFERENCE_ROOT)]
    root: String,

    /// Hop counting strategy (shortest-path or reported-path)
    #[arg(long)]
    hops: Option<HopStrategy>,

    /// Directory receiving report files
    #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// Seconds to wait for a request to reach a terminal state
    #[arg(long)]
    terminal_timeout_secs: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("placement_validator=info".parse()?)
        .add_directive("kube=warn".parse()?);
    if args.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let graph = match &args.topology {
        Some(path) => TopologyGraph::from_yaml_file(path)?,
        None => TopologyGraph::reference(),
    };
    if !graph.contains(&args.root) {
        return Err(format!("root node {} is not part of the topology", args.root).into());
    }

    let mut config = ValidatorConfig {
        namespace: args.namespace,
        root: args.root,
        hop_strategy: args.hops,
        results_dir: args.results_dir,
        ..ValidatorConfig::default()
    };
    if let Some(secs) = args.terminal_timeout_secs {
        config = config.with_terminal_timeout(Duration::from_secs(secs));
    }

    let template_name = args
        .template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or("template path has no file name")?;

    info!(
        kind = %args.kind,
        template = %args.template.display(),
        executions = args.number_of_executions,
        namespace = %config.namespace,
        nodes = graph.len(),
        "Starting placement validation"
    );

    let client = Client::try_default().await?;
    let cluster = KubeClusterClient::new(client, &config.namespace);
    let reporter = FileReportWriter::new(&config.results_dir, &template_name);
    let orchestrator = TrialOrchestrator::new(&cluster, &config, &graph);

    let template = args.template.clone();
    let kind = args.kind;
    let summary = run_batch(
        &orchestrator,
        kind,
        args.number_of_executions,
        |_| load_trial(kind, &template),
        &reporter,
    )
    .await;

    for result in summary.results.iter().filter(|r| r.error.is_some()) {
        error!(
            execution = result.execution,
            error = result.error.as_deref().unwrap_or_default(),
            "Trial failed"
        );
    }
    info!(
        results = %reporter.text_path().display(),
        total = summary.total(),
        "Validation finished"
    );
    Ok(())
}
