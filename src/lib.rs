// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

pub mod api;
pub mod channels;
pub mod config;
pub mod epg;
pub mod player;
pub mod tui;

pub use api::BackendClient;
pub use config::Config;
pub use player::PlaybackController;
pub use tui::run_tui;
