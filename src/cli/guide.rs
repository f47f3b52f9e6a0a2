use super::CommandContext;
use anyhow::Result;
use chrono::Local;

use tvgrid::channels::resolve_channel;
use tvgrid::epg::{program_rows, programs_for};

pub struct GuideCommand {
    /// Channel index or title.
    pub channel: String,
}

impl GuideCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let channels = context.load_channels().await?;
        let epg = context.load_epg().await?;

        let (index, channel) = resolve_channel(&channels, &self.channel)
            .ok_or_else(|| anyhow::anyhow!("Channel '{}' not found", self.channel))?;

        println!("Guide for [{}] {}", index, channel.title);

        let rows = program_rows(programs_for(channel, &epg), Local::now().naive_local());
        if rows.is_empty() {
            println!("No programme information available");
            return Ok(());
        }

        for row in rows {
            let marker = if row.airing_now { "▶" } else { " " };
            let time = match &row.stop {
                Some(stop) => format!("{} - {}", row.start, stop),
                None => row.start.clone(),
            };
            println!("{} {:27} {}", marker, time, row.title);
        }

        Ok(())
    }
}
