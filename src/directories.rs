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

// Per-user data directory management

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the per-user data directory for citychat
///
/// - macOS/Linux: ~/.local/share/citychat
/// - Windows: %LOCALAPPDATA%/citychat
pub fn get_citychat_data_dir() -> Result<PathBuf> {
	let data_dir = match dirs::home_dir() {
		Some(home) => {
			#[cfg(target_os = "windows")]
			let path = {
				match dirs::data_local_dir() {
					Some(dir) => dir.join("citychat"),
					None => home.join("AppData").join("Local").join("citychat"),
				}
			};

			#[cfg(not(target_os = "windows"))]
			let path = home.join(".local").join("share").join("citychat");

			path
		}
		None => {
			return Err(anyhow::anyhow!("Unable to determine home directory"));
		}
	};

	if !data_dir.exists() {
		fs::create_dir_all(&data_dir).context(format!(
			"Failed to create citychat data directory: {}",
			data_dir.display()
		))?;
	}

	Ok(data_dir)
}

/// Path of the TOML configuration file.
pub fn get_config_file_path() -> Result<PathBuf> {
	Ok(get_citychat_data_dir()?.join("config.toml"))
}

/// Path of the file holding the backend session cookie.
pub fn get_session_file_path() -> Result<PathBuf> {
	Ok(get_citychat_data_dir()?.join("session"))
}
