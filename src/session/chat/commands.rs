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

// Slash command handling for the chat loop

use colored::Colorize;
use std::path::Path;

use super::{display, input};
use crate::api::ChatBackend;
use crate::log_error;
use crate::session::controller::ChatController;
use crate::session::media::{self, Recorder, Transcriber, VoiceEvent, VoiceInput};

// Command constants
pub const HELP_COMMAND: &str = "/help";
pub const EXIT_COMMAND: &str = "/exit";
pub const QUIT_COMMAND: &str = "/quit";
pub const NEW_COMMAND: &str = "/new";
pub const LIST_COMMAND: &str = "/list";
pub const OPEN_COMMAND: &str = "/open";
pub const DELETE_COMMAND: &str = "/delete";
pub const ATTACH_COMMAND: &str = "/attach";
pub const VOICE_COMMAND: &str = "/voice";

/// All commands, used for completion and hints
pub const COMMANDS: [&str; 9] = [
	HELP_COMMAND,
	EXIT_COMMAND,
	QUIT_COMMAND,
	NEW_COMMAND,
	LIST_COMMAND,
	OPEN_COMMAND,
	DELETE_COMMAND,
	ATTACH_COMMAND,
	VOICE_COMMAND,
];

/// What the chat loop should do after a command ran.
#[derive(Debug, PartialEq)]
pub enum CommandOutcome {
	Continue,
	Exit,
	/// Pre-fill the next input line (voice transcript).
	Prefill(String),
}

pub async fn handle_command<B, T, R>(
	input: &str,
	controller: &mut ChatController<B>,
	voice: &mut VoiceInput<T, R>,
) -> CommandOutcome
where
	B: ChatBackend,
	T: Transcriber,
	R: Recorder,
{
	// The argument keeps its spaces, /attach takes paths verbatim
	let mut parts = input.splitn(2, ' ');
	let command = parts.next().unwrap_or("");
	let argument = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

	match command {
		HELP_COMMAND => {
			print_help();
			CommandOutcome::Continue
		}
		EXIT_COMMAND | QUIT_COMMAND => CommandOutcome::Exit,
		NEW_COMMAND => {
			match controller.new_chat().await {
				Ok(()) => display::render_panel(&controller.state),
				Err(e) => log_error!("Failed to start a new chat: {}", e),
			}
			CommandOutcome::Continue
		}
		LIST_COMMAND => {
			display::render_history(&controller.state);
			CommandOutcome::Continue
		}
		OPEN_COMMAND => {
			match argument.and_then(|arg| arg.parse::<usize>().ok()) {
				Some(index) => match controller.open_by_index(index).await {
					Ok(()) => display::render_panel(&controller.state),
					Err(e) => log_error!("Failed to open chat: {}", e),
				},
				None => log_error!("Usage: /open <number> (see /list)"),
			}
			CommandOutcome::Continue
		}
		DELETE_COMMAND => {
			if controller.state.current_chat_id.is_none() {
				log_error!("No active chat to delete");
			} else if input::confirm("Delete the active chat?") {
				match controller.delete_chat().await {
					Ok(()) => display::render_panel(&controller.state),
					Err(e) => log_error!("Failed to delete chat: {}", e),
				}
			}
			CommandOutcome::Continue
		}
		ATTACH_COMMAND => {
			match argument {
				Some(path) => match media::load_attachment(Path::new(path)) {
					Ok(attachment) => {
						let name = attachment.name.clone();
						controller.attach(attachment).await;
						println!("{}", format!("Attached {}", name).bright_blue());
					}
					Err(e) => log_error!("Failed to attach file: {}", e),
				},
				None => log_error!("Usage: /attach <path>"),
			}
			CommandOutcome::Continue
		}
		VOICE_COMMAND => handle_voice(controller, voice).await,
		other => {
			log_error!("Unknown command: {}. Type /help for the command list.", other);
			CommandOutcome::Continue
		}
	}
}

async fn handle_voice<B, T, R>(
	controller: &mut ChatController<B>,
	voice: &mut VoiceInput<T, R>,
) -> CommandOutcome
where
	B: ChatBackend,
	T: Transcriber,
	R: Recorder,
{
	match voice.toggle() {
		Ok(VoiceEvent::TranscriptionStarted) => {
			println!(
				"{}",
				"Listening... run /voice again to stop.".bright_blue()
			);
			CommandOutcome::Continue
		}
		Ok(VoiceEvent::Transcript(text)) => CommandOutcome::Prefill(text),
		Ok(VoiceEvent::RecordingStarted) => {
			println!(
				"{}",
				"Recording... run /voice again to stop.".bright_blue()
			);
			CommandOutcome::Continue
		}
		Ok(VoiceEvent::Recorded(recording)) => {
			controller.attach_recording(recording).await;
			println!("{}", "Voice message sent".bright_blue());
			CommandOutcome::Continue
		}
		Ok(VoiceEvent::Unsupported) => {
			log_error!("Voice input is not supported on this system");
			CommandOutcome::Continue
		}
		Err(e) => {
			log_error!("Microphone is not accessible: {}", e);
			CommandOutcome::Continue
		}
	}
}

fn print_help() {
	println!("{}", "Available commands:".bright_blue());
	println!("  /help            Show this help");
	println!("  /new             Start a new chat");
	println!("  /list            List saved chats");
	println!("  /open <number>   Open a chat from the list");
	println!("  /delete          Delete the active chat");
	println!("  /attach <path>   Send a file from disk");
	println!("  /voice           Toggle voice input");
	println!("  /exit, /quit     Leave the session");
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_all_commands_are_registered() {
		assert!(COMMANDS.contains(&HELP_COMMAND));
		assert!(COMMANDS.contains(&VOICE_COMMAND));
		assert!(COMMANDS.iter().all(|cmd| cmd.starts_with('/')));
	}
}
