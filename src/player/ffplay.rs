// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use std::process::{Child, Command, Stdio};
use tracing::debug;

/// Plain playback path used when mpv is not installed: point ffplay at
/// the URL with no remote control, the way a video element plays a
/// natively supported source. No recovery hooks.
#[derive(Default)]
pub(super) struct FfplayPlayer {
    process: Option<Child>,
}

impl FfplayPlayer {
    pub(super) fn is_available() -> bool {
        Command::new("ffplay")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub(super) fn play(url: &str) -> Result<Self> {
        debug!("Starting ffplay with URL: {}", url);

        let mut cmd = Command::new("ffplay");
        cmd.arg(url)
            .arg("-window_title")
            .arg("tvgrid (ffplay)")
            .arg("-autoexit")
            .arg("-infbuf") // reduce buffering for live streams
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());

        let child = cmd.spawn().context("Failed to start ffplay")?;

        Ok(Self {
            process: Some(child),
        })
    }

    /// Some(clean) once the process has exited.
    pub(super) fn exited(&mut self) -> Option<bool> {
        let proc = self.process.as_mut()?;
        match proc.try_wait() {
            Ok(Some(status)) => {
                self.process = None;
                Some(status.success())
            }
            Ok(None) => None,
            Err(_) => {
                self.process = None;
                Some(false)
            }
        }
    }

    pub(super) fn stop(&mut self) {
        if let Some(mut proc) = self.process.take() {
            debug!("Stopping ffplay process");
            let _ = proc.kill();
            let _ = proc.wait();
        }
    }
}

impl Drop for FfplayPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
