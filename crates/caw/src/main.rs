// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! caw command line tool

use std::io::Write;

use anyhow::{Context, Result};
use caw::{CawConfig, Cli};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the JSON output
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = CawConfig::load(cli.config.as_deref())?;
    let save_dir = cli.save_dir.clone().or_else(|| config.save_dir.clone());
    debug!(command = ?cli.command, save_dir = ?save_dir, "running command");

    let output = caw::run(cli.command, &config, save_dir.as_deref()).await?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &output).context("failed to write output")?;
    writeln!(stdout)?;
    Ok(())
}
