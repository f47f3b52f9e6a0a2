// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

mod ffplay;
mod mpv;

use anyhow::Result;
use ffplay::FfplayPlayer;
use mpv::{EngineStatus, MpvEngine};
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;

#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
enum FakeAction {
    Spawn(String),
    Destroy(String),
}

/// Records spawn/destroy order instead of launching a process.
#[cfg(test)]
struct FakePlayer {
    url: String,
    log: Arc<Mutex<Vec<FakeAction>>>,
}

#[cfg(test)]
impl FakePlayer {
    fn destroy(&mut self) {
        self.log
            .lock()
            .unwrap()
            .push(FakeAction::Destroy(self.url.clone()));
    }
}

/// Upstream playlist sources occasionally leak a mis-encoded `&para;`
/// entity (or the raw pilcrow it decodes to) into stream URLs. Such a
/// URL will never fetch directly; it has to go through the server-side
/// relay, which repairs it.
pub fn has_encoding_corruption(url: &str) -> bool {
    url.contains('¶') || url.contains("&para;")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No channel selected.
    Idle,
    /// Engine attached, nothing loaded yet.
    Loading,
    /// Stream loaded and playing.
    Playing,
    /// Fatal error on the direct URL; proxy attempt in flight.
    ErrorRetrying,
    /// Fatal error on the proxy URL. No further automatic action.
    ErrorFallback,
}

/// What the controller observed since the last poll.
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    Started { index: usize },
    RetryingViaProxy { index: usize },
    Failed { index: usize, message: String },
    Stopped { index: usize },
}

/// The selection currently routed to the player.
#[derive(Debug, Clone)]
struct ActiveStream {
    index: usize,
    proxy_url: String,
    on_proxy: bool,
}

impl ActiveStream {
    /// The URL to retry with after a fatal error, at most once per
    /// selection: direct -> proxy, proxy -> give up.
    fn retry_url_after_fatal(&mut self) -> Option<String> {
        if self.on_proxy {
            None
        } else {
            self.on_proxy = true;
            Some(self.proxy_url.clone())
        }
    }
}

/// Owns the single live engine instance and the retry discipline around
/// it. Selecting a channel always tears the previous engine down before
/// creating the next; that is the only resource-release rule there is.
pub struct PlaybackController {
    state: PlaybackState,
    engine: Option<MpvEngine>,
    fallback: Option<FfplayPlayer>,
    active: Option<ActiveStream>,
    engine_supported: bool,
    native_supported: bool,
    config: PlayerConfig,
    #[cfg(test)]
    fake_log: Option<Arc<Mutex<Vec<FakeAction>>>>,
    #[cfg(test)]
    fake: Option<FakePlayer>,
}

impl PlaybackController {
    pub fn new(config: PlayerConfig) -> Self {
        let engine_supported = MpvEngine::is_available();
        let native_supported = FfplayPlayer::is_available();

        if engine_supported {
            debug!("mpv detected, using IPC-controlled playback");
        } else if native_supported {
            debug!("mpv not found, falling back to plain ffplay playback");
        } else {
            warn!("Neither mpv nor ffplay found; playback will be unavailable");
        }

        Self {
            state: PlaybackState::Idle,
            engine: None,
            fallback: None,
            active: None,
            engine_supported,
            native_supported,
            config,
            #[cfg(test)]
            fake_log: None,
            #[cfg(test)]
            fake: None,
        }
    }

    /// A controller whose engine records spawn/destroy order instead of
    /// launching processes.
    #[cfg(test)]
    fn with_fake_engine(log: Arc<Mutex<Vec<FakeAction>>>) -> Self {
        Self {
            state: PlaybackState::Idle,
            engine: None,
            fallback: None,
            active: None,
            engine_supported: true,
            native_supported: false,
            config: crate::config::Config::default().player,
            fake_log: Some(log),
            fake: None,
        }
    }

    /// A controller behaving as if neither mpv nor ffplay is installed.
    #[cfg(test)]
    pub(crate) fn without_players(config: PlayerConfig) -> Self {
        Self {
            state: PlaybackState::Idle,
            engine: None,
            fallback: None,
            active: None,
            engine_supported: false,
            native_supported: false,
            config,
            fake_log: None,
            fake: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.index)
    }

    pub fn is_supported(&self) -> bool {
        self.engine_supported || self.native_supported
    }

    /// Switch playback to channel `index`.
    ///
    /// A URL carrying the corruption marker is routed to the proxy
    /// immediately, never attempting the direct URL first. Tearing down
    /// the previous engine also cancels any in-flight proxy retry for
    /// the previous channel.
    pub async fn select(&mut self, index: usize, direct_url: &str, proxy_url: &str) -> Result<()> {
        let on_proxy = has_encoding_corruption(direct_url);
        let url = if on_proxy {
            warn!("Channel {} URL looks mis-encoded, using proxy", index);
            proxy_url
        } else {
            direct_url
        };

        self.start(index, url, proxy_url, on_proxy).await
    }

    /// Tune channel `index` straight through the proxy relay, never
    /// attempting the direct URL. The selection counts as already on the
    /// proxy, so a fatal error ends it without a retry.
    pub async fn select_via_proxy(&mut self, index: usize, proxy_url: &str) -> Result<()> {
        self.start(index, proxy_url, proxy_url, true).await
    }

    async fn start(
        &mut self,
        index: usize,
        url: &str,
        proxy_url: &str,
        on_proxy: bool,
    ) -> Result<()> {
        self.teardown();

        if !self.is_supported() {
            self.active = None;
            anyhow::bail!("No supported player found (install mpv or ffplay)");
        }

        self.active = Some(ActiveStream {
            index,
            proxy_url: proxy_url.to_string(),
            on_proxy,
        });

        info!("Tuning channel {} via {}", index, url);
        self.attach(url).await
    }

    async fn attach(&mut self, url: &str) -> Result<()> {
        #[cfg(test)]
        if let Some(log) = self.fake_log.clone() {
            log.lock().unwrap().push(FakeAction::Spawn(url.to_string()));
            self.fake = Some(FakePlayer {
                url: url.to_string(),
                log,
            });
            self.state = PlaybackState::Loading;
            return Ok(());
        }

        if self.engine_supported {
            match MpvEngine::launch(url, self.config.back_buffer_secs, &self.config.extra_args)
                .await
            {
                Ok(engine) => {
                    self.engine = Some(engine);
                    self.state = PlaybackState::Loading;
                    Ok(())
                }
                Err(e) => {
                    self.state = PlaybackState::Idle;
                    self.active = None;
                    Err(e)
                }
            }
        } else {
            // Native path: hand over the URL and hope. No recovery hooks.
            match FfplayPlayer::play(url) {
                Ok(player) => {
                    self.fallback = Some(player);
                    self.state = PlaybackState::Loading;
                    Ok(())
                }
                Err(e) => {
                    self.state = PlaybackState::Idle;
                    self.active = None;
                    Err(e)
                }
            }
        }
    }

    /// Observe the player and advance the state machine. Called from the
    /// UI tick loop.
    pub async fn poll(&mut self) -> Option<PlaybackEvent> {
        let index = self.active.as_ref()?.index;

        if let Some(engine) = self.engine.as_mut() {
            match engine.status() {
                EngineStatus::Starting => None,
                EngineStatus::Playing => {
                    if matches!(
                        self.state,
                        PlaybackState::Loading | PlaybackState::ErrorRetrying
                    ) {
                        self.state = PlaybackState::Playing;
                        return Some(PlaybackEvent::Started { index });
                    }
                    None
                }
                EngineStatus::Exited { clean: true } => {
                    self.teardown();
                    self.state = PlaybackState::Idle;
                    self.active = None;
                    Some(PlaybackEvent::Stopped { index })
                }
                EngineStatus::Exited { clean: false } => self.handle_fatal(index).await,
            }
        } else if let Some(player) = self.fallback.as_mut() {
            match player.exited() {
                None => {
                    if self.state == PlaybackState::Loading {
                        // No manifest insight without IPC; a surviving
                        // process is as close to "playing" as we get.
                        self.state = PlaybackState::Playing;
                        return Some(PlaybackEvent::Started { index });
                    }
                    None
                }
                Some(true) => {
                    self.teardown();
                    self.state = PlaybackState::Idle;
                    self.active = None;
                    Some(PlaybackEvent::Stopped { index })
                }
                Some(false) => {
                    self.teardown();
                    self.state = PlaybackState::ErrorFallback;
                    Some(PlaybackEvent::Failed {
                        index,
                        message: "Playback failed".to_string(),
                    })
                }
            }
        } else {
            None
        }
    }

    async fn handle_fatal(&mut self, index: usize) -> Option<PlaybackEvent> {
        self.teardown();

        let retry_url = self
            .active
            .as_mut()
            .and_then(ActiveStream::retry_url_after_fatal);

        match retry_url {
            Some(url) => {
                warn!("Fatal playback error on channel {}, retrying via proxy", index);
                self.state = PlaybackState::ErrorRetrying;
                match self.attach(&url).await {
                    Ok(()) => {
                        self.state = PlaybackState::ErrorRetrying;
                        Some(PlaybackEvent::RetryingViaProxy { index })
                    }
                    Err(e) => {
                        self.state = PlaybackState::ErrorFallback;
                        Some(PlaybackEvent::Failed {
                            index,
                            message: format!("Proxy retry failed: {}", e),
                        })
                    }
                }
            }
            None => {
                warn!("Fatal playback error on channel {} proxy stream", index);
                self.state = PlaybackState::ErrorFallback;
                Some(PlaybackEvent::Failed {
                    index,
                    message: "Error playing the channel".to_string(),
                })
            }
        }
    }

    /// Destroy whatever player instance exists. Idempotent.
    fn teardown(&mut self) {
        #[cfg(test)]
        if let Some(mut fake) = self.fake.take() {
            fake.destroy();
        }
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }
        if let Some(mut player) = self.fallback.take() {
            player.stop();
        }
    }

    /// Stop playback and return to idle.
    pub fn stop(&mut self) {
        self.teardown();
        self.state = PlaybackState::Idle;
        self.active = None;
    }

    pub fn shutdown(&mut self) {
        debug!("Shutting down playback controller");
        self.stop();
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corruption_marker_detection() {
        assert!(has_encoding_corruption("http://host/list?a=1¶llel=2"));
        assert!(has_encoding_corruption("http://host/list?a=1&para;llel=2"));
        assert!(!has_encoding_corruption(
            "http://host/stream.m3u8?token=abc"
        ));
        assert!(!has_encoding_corruption(""));
    }

    #[test]
    fn test_retry_switches_to_proxy_exactly_once() {
        let mut active = ActiveStream {
            index: 3,
            proxy_url: "http://127.0.0.1:8000/api/stream/3".to_string(),
            on_proxy: false,
        };

        // First fatal error on the direct URL: one proxy retry.
        assert_eq!(
            active.retry_url_after_fatal().as_deref(),
            Some("http://127.0.0.1:8000/api/stream/3")
        );
        assert!(active.on_proxy);

        // Fatal error on the proxy: no further retries.
        assert_eq!(active.retry_url_after_fatal(), None);
        assert_eq!(active.retry_url_after_fatal(), None);
    }

    #[test]
    fn test_corrupted_url_starts_on_proxy() {
        let mut active = ActiveStream {
            index: 0,
            proxy_url: "http://127.0.0.1:8000/api/stream/0".to_string(),
            on_proxy: has_encoding_corruption("http://host/bad¶llel"),
        };
        // Already on the proxy, so a fatal error ends the line.
        assert_eq!(active.retry_url_after_fatal(), None);
    }

    #[tokio::test]
    async fn test_select_destroys_previous_instance_before_spawning_next() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut controller = PlaybackController::with_fake_engine(log.clone());

        controller
            .select(0, "http://host/a.m3u8", "http://host/api/stream/0")
            .await
            .unwrap();
        controller
            .select(1, "http://host/b.m3u8", "http://host/api/stream/1")
            .await
            .unwrap();

        // At most one instance alive: the old one dies before the new
        // one exists.
        let actions = log.lock().unwrap().clone();
        assert_eq!(
            actions,
            vec![
                FakeAction::Spawn("http://host/a.m3u8".to_string()),
                FakeAction::Destroy("http://host/a.m3u8".to_string()),
                FakeAction::Spawn("http://host/b.m3u8".to_string()),
            ]
        );
        assert_eq!(controller.active_index(), Some(1));
    }

    #[tokio::test]
    async fn test_stop_destroys_the_live_instance() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut controller = PlaybackController::with_fake_engine(log.clone());

        controller
            .select(0, "http://host/a.m3u8", "http://host/api/stream/0")
            .await
            .unwrap();
        controller.stop();

        let actions = log.lock().unwrap().clone();
        assert_eq!(
            actions,
            vec![
                FakeAction::Spawn("http://host/a.m3u8".to_string()),
                FakeAction::Destroy("http://host/a.m3u8".to_string()),
            ]
        );
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(controller.active_index(), None);
    }

    #[tokio::test]
    async fn test_proxy_selection_counts_as_already_on_proxy() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut controller = PlaybackController::with_fake_engine(log.clone());

        controller
            .select_via_proxy(2, "http://host/api/stream/2")
            .await
            .unwrap();

        let actions = log.lock().unwrap().clone();
        assert_eq!(
            actions,
            vec![FakeAction::Spawn("http://host/api/stream/2".to_string())]
        );
        // A fatal error would end the selection, not re-fetch the same URL.
        assert_eq!(
            controller.active.as_mut().unwrap().retry_url_after_fatal(),
            None
        );
    }
}
