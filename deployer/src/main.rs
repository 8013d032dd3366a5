//! CVM Deployer - Entry Point
//!
//! Runs as a single CI step: every setting arrives through `INPUT_*`
//! environment variables and results are written to `GITHUB_OUTPUT`.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use cvm_deployer::app::inputs::{self, Inputs};
use cvm_deployer::app::options::{fallback_vm_name, DeployConfig};
use cvm_deployer::app::run::run;
use cvm_deployer::logs::{init_logging, LogOptions};
use cvm_deployer::models::deployment::{operation_for, DeploymentResult};
use cvm_deployer::report::output::ResultReporter;
use cvm_deployer::utils::version_info;

use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Only flags are accepted; configuration comes from the environment
    let args: Vec<String> = env::args().skip(1).collect();

    let version = version_info();
    if args.iter().any(|arg| arg == "--version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return ExitCode::SUCCESS;
    }
    if let Some(arg) = args.first() {
        eprintln!("Unexpected argument '{}': configure the deployer through INPUT_* variables", arg);
        return ExitCode::from(2);
    }

    let inputs = Inputs::from_env();

    let config = match DeployConfig::resolve(&inputs) {
        Ok(config) => config,
        Err(e) => {
            if let Err(log_err) = init_logging(LogOptions::default()) {
                eprintln!("Failed to initialize logging: {log_err}");
            }
            error!("Invalid configuration: {}", e);
            let result = DeploymentResult::failed(
                fallback_vm_name(&inputs),
                operation_for(inputs.get(inputs::VM_ID)),
                e.to_string(),
            );
            reporter_from(&inputs).report(&result).await;
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(config.log.clone()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!(
        "CVM deployer {} ({}, built {})",
        version.version, version.git_hash, version.build_time
    );
    if inputs.get(inputs::GITHUB_ACTIONS).is_none() {
        info!("Running in local mode; ensure the INPUT_* variables are set");
    }

    let result = run(&config).await;

    ResultReporter::new(config.ci.output_file.clone(), config.ci.summary_file.clone())
        .report(&result)
        .await;

    if result.is_success() {
        info!("Deployment finished: {} of '{}'", result.operation, result.vm_name);
        ExitCode::SUCCESS
    } else {
        error!(
            "Deployment failed: {}",
            result.message.as_deref().unwrap_or("unknown error")
        );
        ExitCode::FAILURE
    }
}

fn reporter_from(inputs: &Inputs) -> ResultReporter {
    ResultReporter::new(
        inputs.get(inputs::GITHUB_OUTPUT).map(PathBuf::from),
        inputs.get(inputs::GITHUB_STEP_SUMMARY).map(PathBuf::from),
    )
}
