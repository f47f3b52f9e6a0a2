use anyhow::Result;

use tvgrid::api::{BackendClient, Channel, EpgMap};

pub mod channels;
pub mod guide;
pub mod play;

pub use channels::ChannelsCommand;
pub use guide::GuideCommand;
pub use play::PlayCommand;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
    M3u,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "m3u" => Ok(Self::M3u),
            _ => anyhow::bail!("Invalid format: {}. Use 'text', 'json', or 'm3u'", s),
        }
    }
}

/// Shared context for scriptable commands. Unlike the TUI, the CLI fails
/// loudly when the backend is unreachable.
pub struct CommandContext {
    pub client: BackendClient,
}

impl CommandContext {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub async fn load_channels(&self) -> Result<Vec<Channel>> {
        self.client
            .channels()
            .await
            .ok_or_else(|| anyhow::anyhow!("Could not fetch the channel list from the backend"))
    }

    pub async fn load_epg(&self) -> Result<EpgMap> {
        self.client
            .epg()
            .await
            .ok_or_else(|| anyhow::anyhow!("Could not fetch the EPG from the backend"))
    }
}

pub struct RefreshCommand;

impl RefreshCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        match context.client.refresh().await {
            Some(result) if result.ok => {
                println!(
                    "Refreshed: {}",
                    result.message.as_deref().unwrap_or("backend data reloaded")
                );
                Ok(())
            }
            Some(result) => {
                anyhow::bail!(
                    "Backend refused to refresh: {}",
                    result.message.as_deref().unwrap_or("no reason given")
                )
            }
            None => anyhow::bail!("Refresh request failed"),
        }
    }
}

pub struct StatusCommand;

impl StatusCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let health = context
            .client
            .health()
            .await
            .ok_or_else(|| anyhow::anyhow!("Backend is not responding"))?;

        println!("Backend status: {}", health.status);
        for (key, cached) in &health.cached {
            println!("  {:10} cached: {}", key, cached);
        }
        Ok(())
    }
}
