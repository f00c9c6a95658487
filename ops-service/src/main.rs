//! ops: command line front end for the action router and alert bridge

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use ops_core::{config, logging, Settings};
use ops_tools::normalize::aws::tool_catalog;
use ops_tools::{ActionRouter, CapabilityRegistry, Params};

#[derive(Parser, Debug)]
#[command(name = "ops")]
#[command(about = "Run ops-assist actions and alerts from the command line")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one operation and print its result
    Dispatch {
        /// Action group, e.g. kubernetes-operations
        action_group: String,
        /// API path, e.g. /kubectl/pod-health
        api_path: String,
        /// Parameter as name=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// Use built-in sample backends instead of AWS and Kubernetes
        #[arg(long)]
        stub: bool,
    },
    /// Answer an action-group invocation read from a JSON file
    Invoke {
        #[arg(short, long)]
        file: PathBuf,
        /// Use built-in sample backends instead of AWS and Kubernetes
        #[arg(long)]
        stub: bool,
    },
    /// Forward an alert event read from a JSON file to the agent
    Alert {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// List every tool grouped by category
    Tools,
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("parameter name is empty in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

fn read_event(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn router(settings: &Settings, stub: bool) -> Result<ActionRouter> {
    if stub {
        Ok(ops_service::stub_router(settings))
    } else {
        ops_service::action_router(settings).await
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    config::load_environment();
    let args = Args::parse();
    let settings = Settings::from_env()?;
    logging::init("warn,ops_service=info", settings.log_format);
    debug!(?args, "Parsed arguments");

    match args.command {
        Commands::Dispatch {
            action_group,
            api_path,
            params,
            stub,
        } => {
            let router = router(&settings, stub).await?;
            let params: Params = params.into_iter().collect();
            let result = router.dispatch(&action_group, &api_path, &params).await?;
            print_json(&result)
        }
        Commands::Invoke { file, stub } => {
            let router = router(&settings, stub).await?;
            let response = ops_service::handle_action(&router, read_event(&file)?).await;
            print_json(&response)
        }
        Commands::Alert { file } => {
            let bridge = ops_service::alert_bridge(&settings).await?;
            let response = ops_service::handle_alert(&bridge, read_event(&file)?).await;
            print_json(&response)
        }
        Commands::Tools => print_json(&tool_catalog(&CapabilityRegistry::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("tail=20").unwrap(), ("tail".into(), "20".into()));
        assert_eq!(
            parse_param("error_patterns=ERROR,a=b").unwrap(),
            ("error_patterns".into(), "ERROR,a=b".into())
        );
        assert!(parse_param("tail").is_err());
        assert!(parse_param("=5").is_err());
    }

    #[test]
    fn test_cli_shape() {
        let args = Args::try_parse_from([
            "ops", "dispatch", "kubernetes-operations", "/kubectl/pod-health", "-p", "namespaces=web", "--stub",
        ])
        .unwrap();
        match args.command {
            Commands::Dispatch {
                action_group,
                api_path,
                params,
                stub,
            } => {
                assert!(stub);
                assert_eq!(params, vec![("namespaces".to_string(), "web".to_string())]);
                assert!(CapabilityRegistry::new().resolve(&action_group, &api_path).is_ok());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
