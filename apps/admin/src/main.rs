//! Keeper role administration command line.

#![forbid(unsafe_code)]

mod admin_config;
mod command;
mod runner;

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use keeper_application::{ReconciliationStatus, RoleAdminService};
use keeper_core::AppError;
use keeper_infrastructure::{HttpRoleAdminGateway, HttpRoleAdminGatewayConfig};
use tracing::{error, info};

use crate::admin_config::{AdminConfig, init_tracing};
use crate::command::{AdminCommand, USAGE};
use crate::runner::run_command;

#[tokio::main]
async fn main() -> Result<ExitCode, AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = match AdminCommand::parse(env::args().skip(1)) {
        Ok(command) => command,
        Err(error) => {
            eprintln!("{error}\n\n{USAGE}");
            return Ok(ExitCode::from(1));
        }
    };

    let config = AdminConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(config.call_timeout())
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let gateway = HttpRoleAdminGateway::new(
        http_client,
        HttpRoleAdminGatewayConfig {
            base_url: config.api_base_url.clone(),
            api_token: config.api_token.clone(),
            tenant_id: config.tenant_id,
        },
    );
    let service = RoleAdminService::from_gateway(Arc::new(gateway), config.reconciler_config());

    info!(
        api_base_url = %config.api_base_url,
        tenant_id = ?config.tenant_id.map(|tenant_id| tenant_id.to_string()),
        call_timeout_ms = config.call_timeout_ms,
        max_concurrency = config.max_concurrency,
        "keeper-admin started"
    );

    let output = match run_command(&service, command).await {
        Ok(output) => output,
        Err(run_error) => {
            error!(error = %run_error, "command failed");
            eprintln!("{run_error}");
            return Ok(ExitCode::from(1));
        }
    };

    for line in &output.lines {
        println!("{line}");
    }

    Ok(match output.status {
        ReconciliationStatus::Succeeded => ExitCode::SUCCESS,
        ReconciliationStatus::PartiallySucceeded => ExitCode::from(2),
        ReconciliationStatus::Failed => ExitCode::from(1),
    })
}
