//! The approval CLI binary: connects to the same components the daemon uses and runs
//! the interactive REPL from [`resilience_agent::cli`].
//!
//! This binary runs the pipeline components in-process rather than over IPC to the
//! running daemon — a real deployment would front the approval queue with an RPC
//! surface, which is out of scope here.

use clap::Parser;
use resilience_agent::admission::AutoResurrectionManager;
use resilience_agent::agent::{Agent, AgentPipelineConfig, AdmissionService, ExecutionService, IntelService, MonitorService};
use resilience_agent::cli::run_repl;
use resilience_agent::config::AgentConfig;
use resilience_agent::decision::DecisionEngine;
use resilience_agent::edge_case::EdgeCaseManager;
use resilience_agent::executor::{InProcessExecutor, ResurrectionExecutor};
use resilience_agent::intel::{HttpIntelAdapter, InProcessIntel, ResilientIntelClient};
use resilience_agent::monitor::{InProcessHealthProbe, InProcessMetricsProbe, MonitorConfig, PostResurrectionMonitor};
use resilience_agent::queue::ApprovalQueue;
use resilience_agent::risk::RiskAssessor;
use std::process::exit;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, about = "Approval queue CLI for the resilience agent", long_about = None)]
struct Cli {
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

    let operator_id = config.operator_id.clone();
    let agent = build_agent(config);

    if let Err(err) = run_repl(agent, &operator_id) {
        eprintln!("error: {err}");
        exit(1);
    }
}

fn build_agent(config: AgentConfig) -> Arc<Agent> {
    let risk_assessor = Arc::new(RiskAssessor::new((&config.risk).into()));
    let decision_engine = Arc::new(DecisionEngine::new((&config.decision).into(), risk_assessor.clone()));
    let edge_case_manager = Arc::new(EdgeCaseManager::new((&config.edge_case).into()));
    let queue = Arc::new(ApprovalQueue::new(
        (&config.queue).into(),
        chrono::Duration::minutes(config.queue.expiry_minutes),
        None,
    ));

    let intel: Arc<dyn IntelService> = match &config.intel.base_url {
        Some(base_url) => {
            let url = url::Url::parse(base_url).expect("invalid intel.base_url in config");
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

    Agent::new(
        AgentPipelineConfig::default(),
        queue,
        risk_assessor,
        decision_engine,
        edge_case_manager,
        intel,
        admission,
        execution,
        monitor,
    )
}
