//! `turn-engine` binary entry point.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use turn_engine::cli::{Cli, Commands};
use turn_engine::domain::models::turn_configuration::TurnConfiguration;
use turn_engine::domain::ports::collaborator::CollaboratorBundle;
use turn_engine::http;
use turn_engine::http::dto::TurnExecutionResponse;
use turn_engine::infrastructure::collaborators::{MockCollaboratorContext, ReqwestAiGateway};
use turn_engine::infrastructure::config::ConfigLoader;
use turn_engine::infrastructure::logging::LoggerImpl;
use turn_engine::observability::Metrics;
use turn_engine::services::{run_turn_with_id, TurnRegistry};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // `validate-config` never touches the shared service stack.
    if let Commands::ValidateConfig { path } = &cli.command {
        return match ConfigLoader::load_from_file(path) {
            Ok(config) => {
                if cli.json {
                    println!("{}", serde_json::json!({"valid": true, "config": config}));
                } else {
                    println!("configuration at {} is valid", path.display());
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                if cli.json {
                    println!("{}", serde_json::json!({"valid": false, "error": err.to_string()}));
                } else {
                    eprintln!("configuration invalid: {err:#}");
                }
                ExitCode::from(1)
            }
        };
    }

    let config = match ConfigLoader::load().context("failed to load configuration") {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = LoggerImpl::init(&config.logging) {
        eprintln!("failed to initialize logger: {err:#}");
        return ExitCode::from(2);
    }

    let collaborators = match build_collaborators(&config) {
        Ok(bundle) => bundle,
        Err(err) => {
            tracing::error!(error = %err, "failed to wire up collaborators");
            return ExitCode::from(2);
        }
    };

    match cli.command {
        Commands::Serve { bind } => run_serve(config, collaborators, bind).await,
        Commands::Run { participants } => run_one_shot(config, collaborators, participants, cli.json).await,
        Commands::ValidateConfig { .. } => unreachable!("validate-config handled before service wiring"),
    }
}

/// Build the six collaborator targets: a real AI gateway when one is
/// configured, mocks for everything else, since the turn engine ships
/// without the upstream world/interaction/event/agent/narrative services.
fn build_collaborators(config: &turn_engine::infrastructure::config::AppConfig) -> anyhow::Result<CollaboratorBundle> {
    let ai_gateway: Arc<dyn turn_engine::domain::ports::collaborator::CollaboratorContext> =
        match &config.ai_gateway.endpoint {
            Some(endpoint) => Arc::new(ReqwestAiGateway::new(
                endpoint.clone(),
                Duration::from_millis(config.ai_gateway.request_timeout_ms),
            )?),
            None => Arc::new(MockCollaboratorContext::default()),
        };

    Ok(CollaboratorBundle {
        world_context: Arc::new(MockCollaboratorContext::default()),
        interaction_context: Arc::new(MockCollaboratorContext::default()),
        event_context: Arc::new(MockCollaboratorContext::default()),
        ai_gateway,
        agent_context: Arc::new(MockCollaboratorContext::default()),
        narrative_context: Arc::new(MockCollaboratorContext::default()),
    })
}

async fn run_serve(
    config: turn_engine::infrastructure::config::AppConfig,
    collaborators: CollaboratorBundle,
    bind_override: Option<String>,
) -> ExitCode {
    let metrics = match Metrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(err) => {
            tracing::error!(error = %err, "failed to build metrics registry");
            return ExitCode::from(2);
        }
    };

    let registry = TurnRegistry::new();
    let bind_address = bind_override.unwrap_or_else(|| config.http.bind_address.clone());
    let state = http::AppState::new(
        registry,
        collaborators,
        metrics,
        &config.http,
        config.default_turn_configuration.clone(),
    );

    tracing::info!(%bind_address, "starting turn-engine server");

    match http::serve(state, &bind_address, shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server exited with an error");
            ExitCode::from(2)
        }
    }
}

async fn run_one_shot(
    config: turn_engine::infrastructure::config::AppConfig,
    collaborators: CollaboratorBundle,
    participants: Vec<String>,
    json: bool,
) -> ExitCode {
    let mut configuration: TurnConfiguration = config.default_turn_configuration.clone();
    configuration.participants = participants;

    let violations = configuration.validate_constraints();
    if !violations.is_empty() {
        if json {
            println!("{}", serde_json::json!({"success": false, "errors": violations}));
        } else {
            eprintln!("invalid turn configuration: {}", violations.join("; "));
        }
        return ExitCode::from(1);
    }

    match run_turn_with_id(configuration, None, &collaborators).await {
        Ok((turn, result)) => {
            let response = TurnExecutionResponse::from_completed(&turn, &result);
            if json {
                println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
            } else {
                println!(
                    "turn {} finished: success={} phases_completed={:?}",
                    response.turn_id, response.success, response.phases_completed
                );
            }
            if result.overall_success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            if json {
                println!("{}", serde_json::json!({"success": false, "error": err.to_string()}));
            } else {
                eprintln!("turn failed: {err}");
            }
            ExitCode::from(2)
        }
    }
}

/// Resolves once Ctrl+C is received, for [`http::serve`]'s graceful shutdown.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
