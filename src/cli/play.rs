use super::CommandContext;
use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;

use tvgrid::config::PlayerConfig;
use tvgrid::player::{PlaybackController, PlaybackEvent, PlaybackState};

pub struct PlayCommand {
    pub index: usize,
    /// Skip the direct URL and go straight through the proxy relay.
    pub force_proxy: bool,
    pub player_config: PlayerConfig,
}

impl PlayCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let channels = context.load_channels().await?;
        let channel = channels
            .get(self.index)
            .ok_or_else(|| anyhow::anyhow!("No channel at index {}", self.index))?;

        let proxy_url = context.client.stream_url(self.index);

        eprintln!("Playing [{}] {}", self.index, channel.title);

        let mut controller = PlaybackController::new(self.player_config);
        if self.force_proxy {
            controller.select_via_proxy(self.index, &proxy_url).await?;
        } else {
            controller
                .select(self.index, &channel.url, &proxy_url)
                .await?;
        }

        // Block until the player goes away, reporting recovery steps.
        loop {
            sleep(Duration::from_millis(500)).await;

            if let Some(event) = controller.poll().await {
                match event {
                    PlaybackEvent::Started { .. } => eprintln!("Stream loaded"),
                    PlaybackEvent::RetryingViaProxy { .. } => {
                        eprintln!("Stream failed, retrying via proxy")
                    }
                    PlaybackEvent::Failed { message, .. } => {
                        anyhow::bail!("{}", message);
                    }
                    PlaybackEvent::Stopped { .. } => {
                        eprintln!("Playback finished");
                        return Ok(());
                    }
                }
            }

            if controller.state() == PlaybackState::Idle {
                return Ok(());
            }
        }
    }
}
