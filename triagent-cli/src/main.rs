use clap::{Parser, Subcommand};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use triagent_core::{ToolContext, ToolInputs};
use triagent_llm::{ConfigError, InvocationEngine, LlmConfig, LlmConfigBuilder};
use triagent_tools::{BlockingPool, ToolRegistry, register_default_tools};

mod scoring;

use scoring::score_incident;

#[derive(Parser, Debug)]
#[command(name = "triagent", version)]
#[command(about = "Triagent CLI - invoke incident-triage tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered tools
    Tools,
    /// Invoke a tool and print its result envelope
    Invoke {
        /// Tool name
        name: String,
        /// JSON object passed as the tool inputs
        #[arg(long, default_value = "{}")]
        inputs: String,
        /// Trace identifier (generated when omitted)
        #[arg(long)]
        trace_id: Option<String>,
        /// Cancel the invocation after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
        /// Worker threads available to blocking tools
        #[arg(long, default_value_t = triagent_tools::DEFAULT_MAX_BLOCKING)]
        max_blocking: usize,
    },
    /// Print the effective LLM configuration
    Config,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid --inputs: {0}")]
    Inputs(String),

    #[error("tool registration failed: {0}")]
    Registration(#[from] triagent_core::ToolError),
}

fn load_config() -> Result<LlmConfig, CliError> {
    Ok(LlmConfigBuilder::from_env()?.build()?)
}

fn build_registry(config: &LlmConfig, pool: BlockingPool) -> Result<ToolRegistry, CliError> {
    let engine = InvocationEngine::from_config(config);
    tracing::info!(
        mode = ?engine.mode(),
        backends = ?engine.backend_names(),
        "LLM invocation engine ready"
    );

    let mut registry = ToolRegistry::new();
    register_default_tools(&mut registry, Arc::new(engine), score_incident, pool)?;
    Ok(registry)
}

fn parse_inputs(raw: &str) -> Result<ToolInputs, CliError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CliError::Inputs(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(CliError::Inputs(e.to_string())),
    }
}

async fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Tools => {
            let registry = build_registry(&load_config()?, BlockingPool::default())?;
            for (name, description) in registry.describe() {
                println!("{name:<12} {}", description.unwrap_or_default());
            }
        }
        Commands::Invoke {
            name,
            inputs,
            trace_id,
            deadline_secs,
            max_blocking,
        } => {
            let inputs = parse_inputs(&inputs)?;
            let registry = build_registry(&load_config()?, BlockingPool::new(max_blocking))?;

            let context = match trace_id {
                Some(id) => ToolContext::with_trace_id(id),
                None => ToolContext::new(),
            };

            if let Some(secs) = deadline_secs {
                let token = context.cancellation().clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                    tracing::warn!(deadline_secs = secs, "Deadline reached, cancelling");
                    token.cancel();
                });
            }

            let envelope = registry.invoke_enveloped(&name, inputs, &context).await;
            println!("{}", envelope.to_value());
        }
        Commands::Config => {
            println!("{:#?}", load_config()?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    // Logs go to stderr so stdout stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_inputs() {
        let inputs = parse_inputs(r#"{"features": {"off_hours": true}}"#).unwrap();
        assert!(inputs.contains_key("features"));
    }

    #[test]
    fn rejects_non_object_inputs() {
        assert!(matches!(parse_inputs("[1, 2]"), Err(CliError::Inputs(_))));
        assert!(matches!(parse_inputs("{"), Err(CliError::Inputs(_))));
    }

    #[test]
    fn cli_parses_invoke() {
        let cli = Cli::parse_from([
            "triagent",
            "invoke",
            "triage",
            "--inputs",
            "{}",
            "--trace-id",
            "t-1",
        ]);
        match cli.command {
            Commands::Invoke {
                name,
                trace_id,
                max_blocking,
                ..
            } => {
                assert_eq!(name, "triage");
                assert_eq!(trace_id.as_deref(), Some("t-1"));
                assert_eq!(max_blocking, triagent_tools::DEFAULT_MAX_BLOCKING);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn offline_registry_has_default_tools() {
        let config = LlmConfigBuilder::new().use_stub_llm(true).build().unwrap();
        let registry = build_registry(&config, BlockingPool::new(2)).unwrap();
        assert_eq!(registry.list(), vec!["triage", "explain", "runbook"]);

        let envelope = registry
            .invoke_enveloped(
                "runbook",
                parse_inputs(r#"{"severity": "HIGH"}"#).unwrap(),
                &ToolContext::new(),
            )
            .await;
        let value = envelope.to_value();
        assert_eq!(value["status"], "success");
        assert_eq!(value["runbook"].as_array().unwrap().len(), 5);
    }
}
