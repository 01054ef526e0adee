// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::api::AnalyzeResponse;
use crate::config::{AppConfig, ServiceArgs};
use crate::pipeline::{AnalysisPipeline, ImageAsset};
use crate::storage::{AzureBlobConfig, AzureBlobStorage, BlobStorage};

/// Image Insight CLI
#[derive(Parser, Debug)]
#[command(name = "image-insight-cli")]
#[command(version)]
#[command(about = "Run image analysis from the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a local image, detect and tag it, and write the annotated copy
    Analyze(AnalyzeArgs),

    /// Issue a fresh account SAS token and print it
    Token(TokenArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// JPEG or PNG file to analyze; its file name becomes the blob name
    pub image: PathBuf,

    /// Where to write the annotated PNG
    #[arg(long, short, default_value = "annotated.png")]
    pub output: PathBuf,

    /// Print the full result as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[command(flatten)]
    pub service: ServiceArgs,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => analyze(args).await,
        Commands::Token(args) => token(args).await,
    }
}

async fn analyze(args: AnalyzeArgs) -> Result<()> {
    let config = AppConfig::from_args(&args.service)?;
    let pipeline = AnalysisPipeline::from_config(&config)?;

    let asset = ImageAsset::from_path(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let report = pipeline.run(asset).await?;

    tokio::fs::write(&args.output, &report.annotated_png)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("Annotated image written to {}", args.output.display());

    if args.json {
        let response = AnalyzeResponse::from(report);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!(
        "{} ({}x{}) {}",
        report.blob_name,
        report.width,
        report.height,
        if report.uploaded {
            "uploaded"
        } else {
            "already stored"
        }
    );
    for object in &report.objects {
        let r = object.rectangle;
        println!(
            "  {:<20} x={} y={} w={} h={} ({:.2})",
            object.caption, r.x, r.y, r.w, r.h, object.confidence
        );
    }
    println!("tags: {}", report.tag_line);

    Ok(())
}

async fn token(args: TokenArgs) -> Result<()> {
    let config = AppConfig::from_args(&args.service)?;
    let storage = AzureBlobStorage::new(AzureBlobConfig::from_secrets(
        &config.secrets,
        config.request_timeout,
    )?)?;

    let token = storage.issue_access_token().await?;
    println!("{}", token.query());
    eprintln!(
        "permissions={} resource_types={} expires={}",
        token.permissions(),
        token.resource_types(),
        token.expires_at().to_rfc3339()
    );

    Ok(())
}
