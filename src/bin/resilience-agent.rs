//! The resilience agent daemon: wires the full pipeline together and runs until Ctrl-C.

use clap::Parser;
use resilience_agent::admission::AutoResurrectionManager;
use resilience_agent::agent::{Agent, AgentPipelineConfig, AdmissionService, ExecutionService, IntelService, MonitorService};
use resilience_agent::config::AgentConfig;
use resilience_agent::decision::DecisionEngine;
use resilience_agent::edge_case::EdgeCaseManager;
use resilience_agent::event::channel::{pub_sub, EventPublisher};
use resilience_agent::executor::{InProcessExecutor, ResurrectionExecutor};
use resilience_agent::ingester::{InProcessStream, InProcessStreamBackend, IngesterConfig, KillStreamIngester};
use resilience_agent::intel::{HttpIntelAdapter, InProcessIntel, ResilientIntelClient};
use resilience_agent::models::KillReport;
use resilience_agent::monitor::{InProcessHealthProbe, InProcessMetricsProbe, MonitorConfig, PostResurrectionMonitor};
use resilience_agent::queue::ApprovalQueue;
use resilience_agent::risk::RiskAssessor;
use resilience_agent::utils::thread_context::NotStartedThreadContext;
use std::process::exit;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, about = "Autonomous resilience agent daemon", long_about = None)]
struct Cli {
    /// Path to the agent YAML config file.
    #[arg(long, default_value = "/etc/resilience-agent/config.yaml")]
    config: std::path::PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let config = match AgentConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config from {}: {err}", cli.config.display());
            exit(1);
        }
    };

    if let Err(err) = resilience_agent::logging::init(&config.log) {
        eprintln!("failed to initialize logging: {err}");
        exit(1);
    }

    if let Err(err) = run(config) {
        error!(error = %err, "resilience agent exited with an error");
        exit(1);
    }
    info!("exiting gracefully");
}

fn run(config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    let risk_assessor = Arc::new(RiskAssessor::new((&config.risk).into()));
    let decision_engine = Arc::new(DecisionEngine::new((&config.decision).into(), risk_assessor.clone()));
    let edge_case_manager = Arc::new(EdgeCaseManager::new((&config.edge_case).into()));
    let queue = Arc::new(ApprovalQueue::new((&config.queue).into(), chrono::Duration::minutes(config.queue.expiry_minutes), None));

    let intel: Arc<dyn IntelService> = match &config.intel.base_url {
        Some(base_url) => {
            let url = url::Url::parse(base_url)?;
            let adapter = HttpIntelAdapter::new(reqwest::blocking::Client::new(), url, config.intel.api_key.clone());
            Arc::new(ResilientIntelClient::with_retry_policy(adapter, (&config.intel).into()))
        }
        None => Arc::new(ResilientIntelClient::with_retry_policy(InProcessIntel::new(), (&config.intel).into())),
    };

    let admission: Arc<dyn AdmissionService> = Arc::new(AutoResurrectionManager::new(
        (&config.admission).into(),
        ResurrectionExecutor::with_retry_policy(InProcessExecutor::always_succeeds(), (&config.executor).into()),
        edge_case_manager.clone(),
    ));
    let execution: Arc<dyn ExecutionService> = Arc::new(ResurrectionExecutor::with_retry_policy(
        InProcessExecutor::always_succeeds(),
        (&config.executor).into(),
    ));
    let monitor: Arc<dyn MonitorService> = Arc::new(PostResurrectionMonitor::new(
        InProcessHealthProbe::healthy(),
        InProcessMetricsProbe::steady(),
        MonitorConfig::default(),
    ));

    let agent = Agent::new(
        AgentPipelineConfig::default(),
        queue,
        risk_assessor,
        decision_engine,
        edge_case_manager,
        intel,
        admission,
        execution,
        monitor,
    );

    let (kill_tx, kill_rx) = crossbeam::channel::unbounded::<KillReport>();
    let stream_backend = InProcessStreamBackend::new();
    let ingester_config: IngesterConfig = (&config.kill_stream).into();
    let stream = InProcessStream::new(stream_backend, ingester_config.group.clone(), ingester_config.consumer.clone());
    let ingester = KillStreamIngester::new(stream, ingester_config);
    let ingester_ctx = NotStartedThreadContext::new("kill-stream-ingester", move |stop| {
        ingester.run(stop, kill_tx);
    })
    .start();

    agent.run(kill_rx);

    let (shutdown_tx, shutdown_rx) = pub_sub::<()>();
    install_shutdown_signal_handler(shutdown_tx)?;
    let _ = shutdown_rx.as_ref().recv();

    info!("shutdown requested, stopping background tasks");
    agent.stop()?;
    ingester_ctx.stop()?;
    Ok(())
}

fn install_shutdown_signal_handler(publisher: EventPublisher<()>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        info!("received SIGINT, stopping resilience agent");
        let _ = publisher.publish(());
    })
}
