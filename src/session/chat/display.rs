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

// Terminal rendering of the chat and history panels

use colored::Colorize;

use crate::api::Role;
use crate::session::controller::SessionState;
use crate::session::{NodeBody, PanelNode};

/// Redraw the whole message panel under the chat title.
pub fn render_panel(state: &SessionState) {
	println!();
	println!("{}", format!("── {} ──", state.title).bright_black());
	for node in &state.panel {
		print_node(node);
	}
}

pub fn print_node(node: &PanelNode) {
	match &node.body {
		NodeBody::Text(text) => print_message(node.role, text),
		NodeBody::Image { name, .. } => print_message(
			node.role,
			&format!("[image: {}]", name.as_deref().unwrap_or("attachment")),
		),
		NodeBody::Audio { mime, .. } => {
			print_message(node.role, &format!("[voice message, {}]", mime))
		}
		NodeBody::File { href, name } => {
			print_message(node.role, &format!("[file: {}] {}", name, href))
		}
		// Transient placeholder, the loading animation covers it
		NodeBody::Pending => {}
	}
}

fn print_message(role: Role, text: &str) {
	match role {
		Role::User => println!("{}", format!("> {}", text).bright_blue()),
		Role::Assistant => println!("{}", text.bright_green()),
	}
}

pub fn print_assistant_reply(text: &str) {
	println!("{}", text.bright_green());
}

/// Numbered chat list with the active chat marked.
pub fn render_history(state: &SessionState) {
	if state.history.is_empty() {
		println!("{}", "No saved chats".bright_black());
		return;
	}

	println!("{}", "Chats:".bright_blue());
	for (index, entry) in state.history.iter().enumerate() {
		let marker = if entry.active { "*" } else { " " };
		let line = format!("{} {:>2}. {}", marker, index + 1, entry.label());
		if entry.active {
			println!("{}", line.bright_green());
		} else {
			println!("{}", line);
		}
	}
}
