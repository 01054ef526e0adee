// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use image_insight::{
    api::start_server,
    config::{AppConfig, ServerArgs},
    pipeline::AnalysisPipeline,
    version,
};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    // Pick up SECRET_PATH, LISTEN_ADDR etc. from .env when present
    dotenv::dotenv().ok();

    let args = ServerArgs::parse();
    info!("Starting {}", version::get_version_string());

    let addr = args.socket_addr()?;
    let config = AppConfig::from_args(&args.service).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            args.service.secret_path.display()
        )
    })?;
    info!(
        "Container={}, write mode={:?}, request timeout={}s",
        config.container,
        config.write_mode,
        config.request_timeout.as_secs()
    );

    let pipeline = AnalysisPipeline::from_config(&config)?;

    tokio::select! {
        result = start_server(addr, pipeline) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
