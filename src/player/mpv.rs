// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

static ENGINE_SEQ: AtomicU32 = AtomicU32::new(0);

/// Observed engine condition, polled by the playback controller.
#[derive(Debug, Clone)]
pub enum EngineStatus {
    /// Process up, no file loaded yet (manifest still being fetched).
    Starting,
    /// Process up and a file is loaded.
    Playing,
    /// Process gone. `clean` is false for a fatal playback failure.
    Exited { clean: bool },
}

/// One mpv process driven over its JSON IPC socket.
///
/// Each instance owns its own socket and process; the controller enforces
/// that at most one exists at a time. Launched without `--idle` or
/// `--keep-open` so a fatal stream failure surfaces as a process exit.
pub(super) struct MpvEngine {
    socket_path: PathBuf,
    process: Option<Child>,
}

impl MpvEngine {
    pub(super) fn is_available() -> bool {
        Command::new("mpv")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Socket path under XDG state, unique per engine instance.
    fn socket_path() -> PathBuf {
        let state_dir = std::env::var("XDG_STATE_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".local").join("state"))
            });

        let seq = ENGINE_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!("engine-{}-{}.sock", std::process::id(), seq);

        let dir = match state_dir {
            Some(base) => {
                let dir = base.join("tvgrid");
                if let Err(e) = fs::create_dir_all(&dir) {
                    warn!("Failed to create state directory: {}", e);
                    let uid = unsafe { libc::getuid() };
                    return std::env::temp_dir().join(format!("tvgrid-{}-{}", uid, name));
                }
                // Owner-only; the socket accepts arbitrary commands.
                if let Err(e) = fs::set_permissions(&dir, fs::Permissions::from_mode(0o700)) {
                    warn!("Failed to set permissions on state directory: {}", e);
                }
                dir
            }
            None => std::env::temp_dir(),
        };

        dir.join(name)
    }

    /// Launch mpv for `url` and wait for the IPC socket to come up.
    pub(super) async fn launch(
        url: &str,
        back_buffer_secs: u32,
        extra_args: &[String],
    ) -> Result<Self> {
        let socket_path = Self::socket_path();
        if socket_path.exists() {
            let _ = fs::remove_file(&socket_path);
        }

        debug!("Launching mpv for {} (socket {:?})", url, socket_path);

        // Roughly one MiB per second of stream held for seeking back.
        let back_bytes_mib = back_buffer_secs.max(1);

        let mut cmd = Command::new("mpv");
        cmd.arg(url)
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .arg("--no-terminal")
            .arg("--really-quiet")
            .arg("--force-window=yes")
            .arg("--title=tvgrid")
            .arg("--profile=low-latency")
            .arg("--cache=yes")
            .arg(format!("--demuxer-max-back-bytes={}MiB", back_bytes_mib))
            // Advisory, as in any client that force-sets this on requests;
            // most origins simply ignore it.
            .arg("--http-header-fields=Access-Control-Allow-Origin: *")
            .args(extra_args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());

        let child = cmd.spawn().context("Failed to start mpv. Is it installed?")?;

        let mut engine = Self {
            socket_path,
            process: Some(child),
        };

        // Wait up to 5 seconds for the IPC socket, bailing early if the
        // process already died.
        for _ in 0..20 {
            sleep(Duration::from_millis(250)).await;

            if let Some(proc) = engine.process.as_mut()
                && let Ok(Some(status)) = proc.try_wait()
            {
                engine.process = None;
                return Err(anyhow::anyhow!(
                    "mpv exited before its IPC socket came up: {:?}",
                    status
                ));
            }

            if engine.socket_ready() {
                debug!("mpv IPC socket ready");
                return Ok(engine);
            }
        }

        engine.destroy();
        Err(anyhow::anyhow!("mpv IPC socket failed to start"))
    }

    fn socket_ready(&self) -> bool {
        self.socket_path.exists() && UnixStream::connect(&self.socket_path).is_ok()
    }

    fn send_command(&self, command: Value) -> Result<Value> {
        let mut socket = UnixStream::connect(&self.socket_path).with_context(|| {
            format!("Failed to connect to mpv socket at {:?}", self.socket_path)
        })?;

        let command_str = serde_json::to_string(&command)?;
        socket.write_all(command_str.as_bytes())?;
        socket.write_all(b"\n")?;

        let mut reader = BufReader::new(socket);
        // The socket interleaves event notifications with command replies;
        // replies are the lines carrying an "error" field.
        for _ in 0..32 {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            let parsed: Value = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse mpv response: {}", line))?;
            if let Some(error) = parsed.get("error").and_then(|e| e.as_str()) {
                if error != "success" {
                    return Err(anyhow::anyhow!("mpv command failed: {}", error));
                }
                return Ok(parsed);
            }
        }

        Err(anyhow::anyhow!("No reply from mpv"))
    }

    /// Poll the process and, while it lives, whether a file is loaded.
    pub(super) fn status(&mut self) -> EngineStatus {
        if let Some(proc) = self.process.as_mut() {
            match proc.try_wait() {
                Ok(Some(status)) => {
                    debug!("mpv exited with status: {:?}", status);
                    self.process = None;
                    let _ = fs::remove_file(&self.socket_path);
                    return EngineStatus::Exited {
                        clean: status.success(),
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to check mpv process status: {}", e);
                }
            }
        } else {
            return EngineStatus::Exited { clean: true };
        }

        let loaded = self
            .send_command(json!({"command": ["get_property", "filename"]}))
            .map(|reply| !reply.get("data").map(Value::is_null).unwrap_or(true))
            .unwrap_or(false);

        if loaded {
            EngineStatus::Playing
        } else {
            EngineStatus::Starting
        }
    }

    /// Kill the process and remove the socket. Idempotent.
    pub(super) fn destroy(&mut self) {
        if let Some(mut child) = self.process.take() {
            debug!("Tearing down mpv engine");
            if child.try_wait().map(|s| s.is_none()).unwrap_or(true) {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
        if self.socket_path.exists() {
            let _ = fs::remove_file(&self.socket_path);
        }
    }
}

impl Drop for MpvEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}
