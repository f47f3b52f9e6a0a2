// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::api::{BackendClient, Channel, EpgMap};
use crate::channels::filter_channels;
use crate::config::Config;
use crate::epg::{ProgramRow, guide_rows_now};
use crate::player::{PlaybackController, PlaybackEvent, PlaybackState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient toast. Concurrent notifications stack independently;
/// there is no queue.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    created: Instant,
}

#[derive(Debug, Clone)]
pub enum Action {
    Quit,
}

/// All session state: loaded data, search, selection, playback and the
/// ephemeral UI bits. Owned by the run loop; nothing lives in module
/// globals.
pub struct App {
    pub client: BackendClient,
    pub config: Config,
    pub channels: Vec<Channel>,
    pub epg: EpgMap,
    pub search_query: String,
    pub search_active: bool,
    /// Indices into `channels` surviving the current search term.
    pub filtered_indices: Vec<usize>,
    /// Channel tuned by the last selection. Outlives the playback
    /// controller's active stream, so the guide stays on the selected
    /// channel even when playback never starts.
    selected: Option<usize>,
    /// Cursor position within `filtered_indices`.
    pub cursor: usize,
    pub scroll_offset: usize,
    pub visible_height: usize,
    pub loading: bool,
    pub show_help: bool,
    pub notifications: Vec<Notification>,
    pub playback: PlaybackController,
    /// Guide rows for the selected channel, recomputed on selection.
    pub guide_rows: Vec<ProgramRow>,
}

impl App {
    pub fn new(config: Config, client: BackendClient) -> Self {
        let playback = PlaybackController::new(config.player.clone());
        Self {
            client,
            config,
            channels: Vec::new(),
            epg: EpgMap::new(),
            search_query: String::new(),
            search_active: false,
            filtered_indices: Vec::new(),
            selected: None,
            cursor: 0,
            scroll_offset: 0,
            visible_height: 20,
            loading: false,
            show_help: false,
            notifications: Vec::new(),
            playback,
            guide_rows: Vec::new(),
        }
    }

    pub fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        debug!("notification ({:?}): {}", severity, message);
        self.notifications.push(Notification {
            message,
            severity,
            created: Instant::now(),
        });
    }

    /// Fetch channels, then the EPG, then re-render. Either fetch failing
    /// degrades to empty data plus a notification; nothing propagates.
    pub async fn load_all(&mut self) {
        self.loading = true;

        self.channels = match self.client.channels().await {
            Some(channels) => channels,
            None => {
                self.notify(Severity::Error, "Connection error");
                Vec::new()
            }
        };
        self.epg = match self.client.epg().await {
            Some(epg) => epg,
            None => {
                self.notify(Severity::Error, "Connection error");
                EpgMap::new()
            }
        };

        self.apply_filter();
        self.loading = false;

        if self.channels.is_empty() {
            self.notify(Severity::Warning, "No channels found");
        }
    }

    /// Ask the backend to re-pull its sources, then reload on success.
    /// On failure the previously loaded data stays on screen.
    pub async fn refresh(&mut self) {
        self.loading = true;
        match self.client.refresh().await {
            Some(result) if result.ok => {
                self.load_all().await;
                self.notify(Severity::Success, "Data refreshed");
            }
            _ => {
                self.notify(Severity::Error, "Error refreshing data");
            }
        }
        self.loading = false;
    }

    pub fn apply_filter(&mut self) {
        self.filtered_indices = filter_channels(&self.channels, &self.search_query);
        if self.cursor >= self.filtered_indices.len() {
            self.cursor = self.filtered_indices.len().saturating_sub(1);
        }
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        }
        let last_visible = self.scroll_offset + self.visible_height.saturating_sub(1);
        if self.cursor > last_visible {
            self.scroll_offset = self.cursor + 1 - self.visible_height.max(1);
        }
    }

    pub fn update_visible_height(&mut self, height: usize) {
        self.visible_height = height.max(1);
        self.clamp_scroll();
    }

    /// The channel the session last tuned, if any.
    pub fn selected_channel(&self) -> Option<(usize, &Channel)> {
        let index = self.selected?;
        self.channels.get(index).map(|c| (index, c))
    }

    /// Tune a channel by its original (unfiltered) index. Tears down any
    /// previous player instance first. The selection sticks and the
    /// guide renders for it even when the player cannot start.
    pub async fn select_channel(&mut self, index: usize) {
        let Some(channel) = self.channels.get(index) else {
            return;
        };
        let title = channel.title.clone();
        let direct_url = channel.url.clone();
        let proxy_url = self.client.stream_url(index);

        debug!("Selecting channel {} ({})", index, title);
        self.selected = Some(index);

        if let Err(e) = self.playback.select(index, &direct_url, &proxy_url).await {
            self.notify(Severity::Error, format!("{}", e));
        }

        self.refresh_guide();
    }

    fn refresh_guide(&mut self) {
        self.guide_rows = match self.selected_channel() {
            Some((_, channel)) => guide_rows_now(channel, &self.epg),
            None => Vec::new(),
        };
    }

    /// Zap to the adjacent channel by unfiltered index. Returns false
    /// when there is no selection or no valid move, so the key can fall
    /// through to list navigation.
    async fn zap(&mut self, step: isize) -> bool {
        let Some(current) = self.selected else {
            return false;
        };
        let Some(target) = current.checked_add_signed(step) else {
            return false;
        };
        if target >= self.channels.len() {
            return false;
        }
        self.select_channel(target).await;
        true
    }

    fn move_cursor(&mut self, step: isize) {
        if self.filtered_indices.is_empty() {
            return;
        }
        let last = self.filtered_indices.len() - 1;
        self.cursor = self
            .cursor
            .saturating_add_signed(step)
            .min(last);
        self.clamp_scroll();
    }

    /// How long the run loop waits on the event channel before forcing
    /// a poll of toasts and the player.
    pub fn tick_timeout(&self) -> Duration {
        Duration::from_millis(self.config.ui.tick_rate_ms)
    }

    /// Drop notifications past their display window.
    pub fn tick(&mut self) -> bool {
        let ttl = Duration::from_millis(self.config.ui.notification_ttl_ms);
        let before = self.notifications.len();
        self.notifications.retain(|n| n.created.elapsed() < ttl);
        before != self.notifications.len()
    }

    /// Advance the playback state machine and translate its events into
    /// notifications. Returns true when a redraw is warranted.
    pub async fn poll_playback(&mut self) -> bool {
        let Some(event) = self.playback.poll().await else {
            return false;
        };

        match event {
            PlaybackEvent::Started { index } => {
                if let Some(channel) = self.channels.get(index) {
                    let title = channel.title.clone();
                    self.notify(Severity::Success, format!("Playing {}", title));
                }
            }
            PlaybackEvent::RetryingViaProxy { .. } => {
                self.notify(Severity::Warning, "Stream failed, retrying via proxy");
            }
            PlaybackEvent::Failed { message, .. } => {
                self.notify(Severity::Error, message);
                self.refresh_guide();
            }
            PlaybackEvent::Stopped { .. } => {
                self.notify(Severity::Info, "Playback stopped");
                self.refresh_guide();
            }
        }
        true
    }

    pub async fn handle_key_event(&mut self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Action::Quit);
        }

        // Live search input.
        if self.search_active {
            match key.code {
                KeyCode::Esc => {
                    self.search_active = false;
                    self.search_query.clear();
                    self.apply_filter();
                }
                KeyCode::Enter => {
                    self.search_active = false;
                }
                KeyCode::Backspace => {
                    self.search_query.pop();
                    self.apply_filter();
                }
                KeyCode::Char(c) => {
                    self.search_query.push(c);
                    self.apply_filter();
                }
                _ => {}
            }
            return None;
        }

        if self.show_help {
            self.show_help = false;
            return None;
        }

        match key.code {
            KeyCode::Char('q') => return Some(Action::Quit),
            KeyCode::Char('?') | KeyCode::F(1) => self.show_help = true,
            KeyCode::Char('/') => {
                self.search_active = true;
            }
            KeyCode::Char('r') => self.refresh().await,
            KeyCode::Char('s') => {
                self.playback.stop();
                self.refresh_guide();
            }
            // Arrow keys zap when a channel is selected and the move is
            // valid; otherwise they fall through to the list cursor.
            KeyCode::Up => {
                if !self.zap(-1).await {
                    self.move_cursor(-1);
                }
            }
            KeyCode::Down => {
                if !self.zap(1).await {
                    self.move_cursor(1);
                }
            }
            KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::PageUp => self.move_cursor(-(self.visible_height.max(1) as isize)),
            KeyCode::PageDown => self.move_cursor(self.visible_height.max(1) as isize),
            KeyCode::Home => {
                self.cursor = 0;
                self.clamp_scroll();
            }
            KeyCode::End => {
                self.cursor = self.filtered_indices.len().saturating_sub(1);
                self.clamp_scroll();
            }
            KeyCode::Enter => {
                if let Some(&index) = self.filtered_indices.get(self.cursor) {
                    self.select_channel(index).await;
                }
            }
            _ => {}
        }

        None
    }

    pub fn status_line(&self) -> String {
        match self.playback.state() {
            PlaybackState::Idle => "Idle".to_string(),
            PlaybackState::Loading => "Loading stream...".to_string(),
            PlaybackState::Playing => match self.selected_channel() {
                Some((_, c)) => format!("Playing: {}", c.title),
                None => "Playing".to_string(),
            },
            PlaybackState::ErrorRetrying => "Stream error, retrying via proxy...".to_string(),
            PlaybackState::ErrorFallback => "Playback failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Program;
    use crate::config::Config;

    fn app_with_channels(titles: &[&str]) -> App {
        let config = Config::default();
        let client = BackendClient::new(&config.server.url).unwrap();
        let mut app = App::new(config, client);
        // No real player processes in tests.
        app.playback = PlaybackController::without_players(app.config.player.clone());
        app.channels = titles
            .iter()
            .map(|t| Channel {
                title: t.to_string(),
                url: format!("http://example.com/{}.m3u8", t),
                group: None,
                tvg_id: None,
                tvg_logo: None,
            })
            .collect();
        app.apply_filter();
        app
    }

    #[test]
    fn test_filter_keeps_original_indices() {
        let mut app = app_with_channels(&["alpha", "beta", "alphabet"]);
        app.search_query = "alpha".to_string();
        app.apply_filter();
        assert_eq!(app.filtered_indices, vec![0, 2]);
    }

    #[test]
    fn test_cursor_clamps_when_filter_shrinks() {
        let mut app = app_with_channels(&["alpha", "beta", "gamma"]);
        app.cursor = 2;
        app.search_query = "alpha".to_string();
        app.apply_filter();
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn test_notifications_expire_after_ttl() {
        let mut app = app_with_channels(&[]);
        app.config.ui.notification_ttl_ms = 0;
        app.notify(Severity::Info, "hello");
        assert_eq!(app.notifications.len(), 1);
        std::thread::sleep(Duration::from_millis(5));
        assert!(app.tick());
        assert!(app.notifications.is_empty());
    }

    #[test]
    fn test_notifications_stack_without_queueing() {
        let mut app = app_with_channels(&[]);
        app.notify(Severity::Info, "one");
        app.notify(Severity::Error, "two");
        app.notify(Severity::Warning, "three");
        assert_eq!(app.notifications.len(), 3);
    }

    #[tokio::test]
    async fn test_guide_renders_for_selection_even_when_playback_fails() {
        let mut app = app_with_channels(&["alpha"]);
        app.epg.insert(
            "alpha".to_string(),
            vec![Program {
                start: "20231105120000".to_string(),
                stop: Some("20231105130000".to_string()),
                title: "Show".to_string(),
            }],
        );

        // No player installed: select() errors, but the selection and
        // its guide must survive.
        app.select_channel(0).await;

        assert_eq!(app.selected_channel().map(|(i, _)| i), Some(0));
        assert!(!app.guide_rows.is_empty());
        assert_eq!(app.playback.active_index(), None);
    }

    #[tokio::test]
    async fn test_zapping_follows_the_selection() {
        let mut app = app_with_channels(&["alpha", "beta"]);
        app.select_channel(0).await;

        assert!(app.zap(1).await);
        assert_eq!(app.selected_channel().map(|(i, _)| i), Some(1));

        // No channel above the last one.
        assert!(!app.zap(1).await);
    }

    #[test]
    fn test_tick_timeout_follows_config() {
        let mut app = app_with_channels(&[]);
        app.config.ui.tick_rate_ms = 100;
        assert_eq!(app.tick_timeout(), Duration::from_millis(100));
    }
}
