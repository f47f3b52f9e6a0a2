use super::{CommandContext, OutputFormat};
use anyhow::Result;
use serde_json::json;

use tvgrid::channels::filter_channels;

pub struct ChannelsCommand {
    pub query: Option<String>,
    pub format: OutputFormat,
    pub limit: Option<usize>,
}

impl ChannelsCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let channels = context.load_channels().await?;

        let term = self.query.as_deref().unwrap_or("");
        let indices: Vec<usize> = filter_channels(&channels, term)
            .into_iter()
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();

        match self.format {
            OutputFormat::Json => {
                let results: Vec<_> = indices
                    .iter()
                    .map(|&i| {
                        json!({
                            "index": i,
                            "title": channels[i].title,
                            "group": channels[i].group,
                            "tvg_id": channels[i].tvg_id,
                            "url": channels[i].url,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&results)?);
            }
            OutputFormat::Text => {
                if indices.is_empty() {
                    println!("No channels found");
                } else {
                    for &i in &indices {
                        let group = channels[i].group.as_deref().unwrap_or("-");
                        println!("{:6} | {:40} | {}", i, channels[i].title, group);
                    }
                }
            }
            OutputFormat::M3u => {
                println!("#EXTM3U");
                for &i in &indices {
                    let c = &channels[i];
                    println!(
                        "#EXTINF:-1 tvg-id=\"{}\" tvg-logo=\"{}\" group-title=\"{}\",{}",
                        c.tvg_id.as_deref().unwrap_or(""),
                        c.tvg_logo.as_deref().unwrap_or(""),
                        c.group.as_deref().unwrap_or(""),
                        c.title
                    );
                    println!("{}", c.url);
                }
            }
        }

        Ok(())
    }
}
