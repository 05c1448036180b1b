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

use anyhow::{Context, Result};
use std::fs;

use super::{Config, LogLevel};

impl Config {
	/// Load configuration from the per-user config file
	pub fn load() -> Result<Self> {
		let config_path = crate::directories::get_config_file_path()?;

		let mut config = if config_path.exists() {
			let config_str = fs::read_to_string(&config_path).context(format!(
				"Failed to read config from {}",
				config_path.display()
			))?;
			toml::from_str::<Config>(&config_str)
				.context("Failed to parse TOML configuration")?
		} else {
			Config::default()
		};

		config.config_path = Some(config_path);
		config.apply_env_overrides();

		Ok(config)
	}

	// Environment variables take precedence over config file values
	fn apply_env_overrides(&mut self) {
		if let Ok(base_url) = std::env::var("CITYCHAT_BASE_URL") {
			if !base_url.is_empty() {
				self.base_url = base_url;
			}
		}
		if let Ok(level) = std::env::var("CITYCHAT_LOG_LEVEL") {
			match level.to_lowercase().as_str() {
				"none" => self.log_level = LogLevel::None,
				"info" => self.log_level = LogLevel::Info,
				"debug" => self.log_level = LogLevel::Debug,
				other => {
					eprintln!("Unknown CITYCHAT_LOG_LEVEL value: {}", other);
				}
			}
		}
	}

	/// Save the configuration back to its file
	pub fn save(&self) -> Result<()> {
		let config_path = match &self.config_path {
			Some(path) => path.clone(),
			None => crate::directories::get_config_file_path()?,
		};

		let toml_str =
			toml::to_string_pretty(self).context("Failed to serialize configuration")?;
		fs::write(&config_path, toml_str).context(format!(
			"Failed to write config to {}",
			config_path.display()
		))?;

		Ok(())
	}

	/// Create a default configuration file and return its path
	pub fn create_default_config() -> Result<std::path::PathBuf> {
		let config_path = crate::directories::get_config_file_path()?;
		let config = Config::default();
		let toml_str = toml::to_string_pretty(&config)?;
		fs::write(&config_path, toml_str)?;
		Ok(config_path)
	}
}

/// Read the stored backend session cookie, if any.
pub fn load_session_cookie() -> Option<String> {
	let path = crate::directories::get_session_file_path().ok()?;
	let value = fs::read_to_string(path).ok()?;
	let value = value.trim().to_string();
	if value.is_empty() {
		None
	} else {
		Some(value)
	}
}

/// Persist the backend session cookie for future invocations.
pub fn store_session_cookie(value: &str) -> Result<()> {
	let path = crate::directories::get_session_file_path()?;
	fs::write(&path, value).context(format!(
		"Failed to write session file {}",
		path.display()
	))?;
	Ok(())
}

/// Forget the stored session cookie (logout).
pub fn clear_session_cookie() -> Result<()> {
	let path = crate::directories::get_session_file_path()?;
	if path.exists() {
		fs::remove_file(&path).context("Failed to remove session file")?;
	}
	Ok(())
}
