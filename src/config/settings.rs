// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service settings from command-line flags and environment variables

use clap::{Args, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use super::{ConfigError, SecretBundle};

/// How the pipeline makes sure the container and the uploaded blob exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Create-if-absent requests; the storage service arbitrates concurrent uploads
    #[default]
    Conditional,
    /// List, scan for the name, then write. Two concurrent runs with the same
    /// file name can both see "absent" and both upload.
    CheckThenWrite,
}

/// Settings shared by the server and the CLI
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Path of the JSON secret bundle
    #[arg(long, env = "SECRET_PATH", default_value = "secret.json")]
    pub secret_path: PathBuf,

    /// Blob container that receives uploads
    #[arg(long, env = "CONTAINER_NAME", default_value = "img")]
    pub container: String,

    /// TrueType font used for detection captions
    #[arg(long, env = "FONT_PATH", default_value = "./arial.ttf")]
    pub font_path: PathBuf,

    /// Existence-check strategy for the container and blob
    #[arg(long, env = "WRITE_MODE", value_enum, default_value_t = WriteMode::Conditional)]
    pub write_mode: WriteMode,

    /// Timeout for each storage or vision HTTP request
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Parent directory for per-run temporary files (system temp dir if unset)
    #[arg(long, env = "WORK_DIR")]
    pub work_dir: Option<PathBuf>,
}

/// Web server flags
#[derive(Parser, Debug, Clone)]
#[command(name = "image-insight")]
#[command(about = "Image upload, object detection and tagging service", long_about = None)]
pub struct ServerArgs {
    /// Address the HTTP server binds to
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    pub listen_addr: String,

    #[command(flatten)]
    pub service: ServiceArgs,
}

impl ServerArgs {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(self.listen_addr.clone()))
    }
}

/// Fully resolved configuration handed to the gateway constructors
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub secrets: SecretBundle,
    pub container: String,
    pub font_path: PathBuf,
    pub write_mode: WriteMode,
    pub request_timeout: Duration,
    pub work_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load the secret bundle named by `args` and validate the rest
    pub fn from_args(args: &ServiceArgs) -> Result<Self, ConfigError> {
        let secrets = SecretBundle::load(&args.secret_path)?;
        Self::new(secrets, args)
    }

    pub fn new(secrets: SecretBundle, args: &ServiceArgs) -> Result<Self, ConfigError> {
        validate_container_name(&args.container)?;

        Ok(Self {
            secrets,
            container: args.container.clone(),
            font_path: args.font_path.clone(),
            write_mode: args.write_mode,
            request_timeout: Duration::from_secs(args.request_timeout_secs.max(1)),
            work_dir: args.work_dir.clone(),
        })
    }
}

/// Azure container naming rules: 3-63 characters of lowercase letters, digits
/// and single hyphens, starting and ending with a letter or digit.
pub fn validate_container_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidContainerName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.len() < 3 || name.len() > 63 {
        return Err(invalid("length must be between 3 and 63"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("only lowercase letters, digits and '-' are allowed"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a letter or digit"));
    }
    if name.contains("--") {
        return Err(invalid("consecutive hyphens are not allowed"));
    }
    Ok(())
}
