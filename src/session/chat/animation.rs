// Animation module for loading indicators

use anyhow::Result;
use colored::*;
use crossterm::{cursor, execute};
use std::io::{stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Animation frames for loading indicator
const LOADING_FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

// Show loading animation while waiting for the reply
pub async fn show_loading_animation(cancel_flag: Arc<AtomicBool>) -> Result<()> {
	let mut stdout = stdout();
	let mut frame_idx = 0;

	// Save cursor position
	execute!(stdout, cursor::SavePosition)?;

	while !cancel_flag.load(Ordering::SeqCst) {
		execute!(stdout, cursor::RestorePosition)?;

		print!(
			" {} {}",
			LOADING_FRAMES[frame_idx].cyan(),
			"Waiting for reply...".bright_blue()
		);

		stdout.flush()?;

		frame_idx = (frame_idx + 1) % LOADING_FRAMES.len();

		tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
	}

	// Clear loading message completely
	execute!(stdout, cursor::RestorePosition)?;
	print!("                                        ");
	execute!(stdout, cursor::RestorePosition)?;
	stdout.flush()?;

	Ok(())
}
