//! `Taskboard` hub -- in-memory task service and push hub.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:9400
//! cargo run --bin taskboard-hub
//!
//! # Run on custom address, one owner session at a time
//! cargo run --bin taskboard-hub -- --bind 127.0.0.1:8080 --single-session
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use taskboard_hub::config::{HubCliArgs, HubConfig};
use taskboard_hub::server::{self, HubState};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = HubCliArgs::parse();

    let config = match HubConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_env("HUB_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting taskboard hub");

    let state = Arc::new(HubState::with_config(
        config.max_frame_size,
        config.single_session,
    ));
    for draft in config.employees {
        match state.repo.add_employee(draft).await {
            Ok(employee) => tracing::info!(
                employee_id = %employee.id,
                owner_id = %employee.owner_id,
                "seeded employee"
            ),
            Err(e) => tracing::warn!(error = %e, "skipping seeded employee"),
        }
    }

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "hub listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "hub server task failed");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start hub");
            ExitCode::FAILURE
        }
    }
}
