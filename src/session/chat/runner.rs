// Copyright 2025 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Interactive chat session loop

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::commands::{self, CommandOutcome};
use super::{animation, display, input};
use crate::api::{ApiClient, Role};
use crate::config::{loading, Config};
use crate::log_info;
use crate::session::media::{FfmpegRecorder, NullTranscriber, VoiceInput};
use crate::session::{ChatController, PanelNode, SendOutcome, GREETING};

pub async fn run_chat(config: &Config) -> Result<()> {
	crate::config::set_thread_config(config);

	let cookie = loading::load_session_cookie()
		.context("Not logged in. Run `citychat login` first.")?;
	let client = ApiClient::new(&config.base_url, Some(cookie))?;

	let user = client
		.current_user()
		.await
		.context("Session check failed. Log in again with `citychat login`.")?;

	println!("{}", format!("Logged in as {}", user.username).bright_black());
	log_info!("Connected to {}", config.base_url);

	let mut controller = ChatController::new(client);
	controller.load_chats().await;

	// Fresh sessions open on the local greeting, nothing is persisted yet
	controller
		.state
		.panel
		.push(PanelNode::text(Role::Assistant, GREETING));
	display::render_panel(&controller.state);
	println!("{}", "Type /help for commands".bright_black());

	// No speech engine on a bare terminal; capture falls back to ffmpeg
	// when the host has it, and to the unsupported notice otherwise
	let mut voice = VoiceInput::new(NullTranscriber, FfmpegRecorder::detect(), &config.language);

	// Press Ctrl+C twice in a row to force quit
	let interrupted = Arc::new(AtomicBool::new(false));
	{
		let interrupted = interrupted.clone();
		let _ = ctrlc::set_handler(move || {
			if interrupted.swap(true, Ordering::SeqCst) {
				std::process::exit(130);
			}
		});
	}

	let mut prefill: Option<String> = None;

	loop {
		let line = input::read_user_input(prefill.take().as_deref())?;
		interrupted.store(false, Ordering::SeqCst);

		let trimmed = line.trim();
		if trimmed.is_empty() {
			continue;
		}

		if trimmed.starts_with('/') {
			match commands::handle_command(trimmed, &mut controller, &mut voice).await {
				CommandOutcome::Exit => break,
				CommandOutcome::Prefill(text) => prefill = Some(text),
				CommandOutcome::Continue => {}
			}
			continue;
		}

		// The input line stays blocked while the reply is pending
		let cancel_flag = Arc::new(AtomicBool::new(false));
		let animation_task = tokio::spawn(animation::show_loading_animation(cancel_flag.clone()));

		let outcome = controller.send_text(trimmed).await;

		cancel_flag.store(true, Ordering::SeqCst);
		let _ = animation_task.await;

		if let SendOutcome::Replied(reply) = outcome {
			display::print_assistant_reply(&reply);
		}
	}

	println!("{}", "Goodbye!".bright_blue());
	Ok(())
}
