// User input handling module

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::{CompletionType, Config as RustylineConfig, EditMode, Editor};

// Read one user input line with command completion. A voice transcript
// can be handed in as the initial line content for review before send.
pub fn read_user_input(initial: Option<&str>) -> Result<String> {
	let config = RustylineConfig::builder()
		.completion_type(CompletionType::List)
		.edit_mode(EditMode::Emacs)
		.auto_add_history(true)
		.bell_style(rustyline::config::BellStyle::None)
		.build();

	let mut editor = Editor::with_config(config)?;

	use crate::session::chat::helper::CommandHelper;
	editor.set_helper(Some(CommandHelper::new()));

	let prompt = "> ".bright_blue().to_string();

	let result = match initial {
		Some(text) => editor.readline_with_initial(&prompt, (text, "")),
		None => editor.readline(&prompt),
	};

	match result {
		Ok(line) => {
			let _ = editor.add_history_entry(line.clone());
			Ok(line)
		}
		Err(ReadlineError::Interrupted) => {
			// Ctrl+C
			println!("\nCancelled");
			Ok(String::new())
		}
		Err(ReadlineError::Eof) => {
			// Ctrl+D
			println!("\nExiting session.");
			Ok("/exit".to_string())
		}
		Err(err) => {
			println!("Error: {:?}", err);
			Ok(String::new())
		}
	}
}

/// Read a line without echoing it, for passwords.
pub fn read_password(label: &str) -> Result<String> {
	use crossterm::terminal;
	use std::io::{self, Write};

	print!("{}: ", label);
	io::stdout().flush()?;

	terminal::enable_raw_mode()?;
	let result = read_password_keys();
	terminal::disable_raw_mode()?;
	println!();

	result
}

fn read_password_keys() -> Result<String> {
	use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

	let mut value = String::new();
	loop {
		if let Event::Key(key) = event::read()? {
			if key.kind != KeyEventKind::Press {
				continue;
			}
			match key.code {
				KeyCode::Enter => return Ok(value),
				KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
					return Err(anyhow::anyhow!("Cancelled"));
				}
				KeyCode::Char(c) => value.push(c),
				KeyCode::Backspace => {
					value.pop();
				}
				_ => {}
			}
		}
	}
}

/// Yes/no prompt, defaulting to no.
pub fn confirm(prompt: &str) -> bool {
	use std::io::{self, Write};

	print!("{} [y/N]: ", prompt);
	let _ = io::stdout().flush();

	let mut line = String::new();
	if io::stdin().read_line(&mut line).is_err() {
		return false;
	}

	matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}
