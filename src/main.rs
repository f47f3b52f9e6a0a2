// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::Result;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use tvgrid::{BackendClient, Config};

mod cli;
use cli::{
    ChannelsCommand, CommandContext, GuideCommand, OutputFormat, PlayCommand, RefreshCommand,
    StatusCommand,
};

fn cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
}

#[derive(Parser)]
#[command(name = "tvgrid")]
#[command(about = "A terminal client for an IPTV channel/EPG backend")]
#[command(version)]
#[command(styles = cargo_style())]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging to file (tvgrid_debug.log)
    #[arg(long, global = true)]
    debug_log: bool,

    /// Backend base URL (overrides the config file)
    #[arg(short, long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive TUI (default if no command given)
    Tui,

    /// List channels
    Channels {
        /// Filter by title or group (case-insensitive substring)
        #[arg(short, long)]
        query: Option<String>,
        /// Output format (text, json, m3u)
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Maximum number of channels to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the programme guide for a channel (by index or title)
    Guide { channel: String },

    /// Play a channel by index and block until playback ends
    Play {
        index: usize,
        /// Go straight through the server-side proxy relay
        #[arg(long)]
        proxy: bool,
    },

    /// Ask the backend to re-pull its channel and EPG sources
    Refresh,

    /// Show backend health and cache status
    Status,

    /// Fetch a raw API endpoint and print the JSON
    Api {
        #[arg(value_enum)]
        endpoint: ApiEndpoint,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ApiEndpoint {
    Channels,
    Epg,
    Refresh,
    Health,
}

impl ApiEndpoint {
    fn path(self) -> &'static str {
        match self {
            ApiEndpoint::Channels => "/api/channels",
            ApiEndpoint::Epg => "/api/epg",
            ApiEndpoint::Refresh => "/api/refresh",
            ApiEndpoint::Health => "/api/health",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.debug_log {
        let file = File::create("tvgrid_debug.log")?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_level(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(
                EnvFilter::from_default_env()
                    .add_directive("tvgrid=debug".parse()?)
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(tracing::Level::DEBUG.into())
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("hyper_util=error".parse()?),
            )
            .init();
    }

    // Load configuration, writing the defaults on first run.
    let config_path = Config::default_path();
    let mut config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        let config = Config::default();
        if let Err(e) = config.save(&config_path) {
            tracing::warn!("Could not write default config: {}", e);
        }
        config
    };

    if let Some(server) = cli.server {
        config.server.url = server;
    }

    let client = BackendClient::new(&config.server.url)?;

    match cli.command {
        Some(Commands::Tui) | None => {
            tvgrid::run_tui(config, client).await?;
        }

        Some(Commands::Channels {
            query,
            format,
            limit,
        }) => {
            let cmd = ChannelsCommand {
                query,
                format: OutputFormat::from_str(&format)?,
                limit,
            };
            cmd.execute(CommandContext::new(client)).await?;
        }

        Some(Commands::Guide { channel }) => {
            let cmd = GuideCommand { channel };
            cmd.execute(CommandContext::new(client)).await?;
        }

        Some(Commands::Play { index, proxy }) => {
            let cmd = PlayCommand {
                index,
                force_proxy: proxy,
                player_config: config.player.clone(),
            };
            cmd.execute(CommandContext::new(client)).await?;
        }

        Some(Commands::Refresh) => {
            RefreshCommand.execute(CommandContext::new(client)).await?;
        }

        Some(Commands::Status) => {
            StatusCommand.execute(CommandContext::new(client)).await?;
        }

        Some(Commands::Api { endpoint }) => {
            let result = client.fetch_raw(endpoint.path()).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
