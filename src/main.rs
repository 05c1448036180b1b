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

use clap::{Args, Parser, Subcommand};

use citychat::commands::{self, LoginArgs, ProfileArgs, RegisterArgs};
use citychat::config::{Config, LogLevel};

#[derive(Parser)]
#[command(name = "citychat")]
#[command(version = "0.1.0")]
#[command(about = "Terminal client for the city assistant chat")]
struct CitychatArgs {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Log in and store the session for later commands
	Login(LoginArgs),

	/// Create an account and log in
	Register(RegisterArgs),

	/// Show or update the user profile
	Profile(ProfileArgs),

	/// Log out and forget the stored session
	Logout,

	/// Start the interactive chat session
	Chat,

	/// Generate or update the configuration file
	Config(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
	/// Set the backend base URL
	#[arg(long)]
	base_url: Option<String>,

	/// Set the log level (none, info or debug)
	#[arg(long)]
	log_level: Option<String>,

	/// Set the voice transcription language (BCP-47 tag)
	#[arg(long)]
	language: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
	let args = CitychatArgs::parse();

	// Load configuration
	let config = Config::load()?;
	citychat::config::set_thread_config(&config);

	// Handle the config command separately
	if let Commands::Config(config_args) = &args.command {
		return handle_config_command(config_args, config);
	}

	// Execute the appropriate command
	match &args.command {
		Commands::Login(login_args) => commands::auth::run_login(login_args, &config).await?,
		Commands::Register(register_args) => {
			commands::auth::run_register(register_args, &config).await?
		}
		Commands::Profile(profile_args) => {
			commands::profile::run_profile(profile_args, &config).await?
		}
		Commands::Logout => commands::profile::run_logout(&config).await?,
		Commands::Chat => citychat::session::chat::run_chat(&config).await?,
		Commands::Config(_) => unreachable!(), // Already handled above
	}

	Ok(())
}

// Handle the configuration command
fn handle_config_command(args: &ConfigArgs, mut config: Config) -> Result<(), anyhow::Error> {
	let mut modified = false;

	if let Some(base_url) = &args.base_url {
		config.base_url = base_url.clone();
		println!("Set base URL to {}", base_url);
		modified = true;
	}

	if let Some(level) = &args.log_level {
		match level.to_lowercase().as_str() {
			"none" => {
				config.log_level = LogLevel::None;
				println!("Set log level to none");
				modified = true;
			}
			"info" => {
				config.log_level = LogLevel::Info;
				println!("Set log level to info");
				modified = true;
			}
			"debug" => {
				config.log_level = LogLevel::Debug;
				println!("Set log level to debug");
				modified = true;
			}
			_ => {
				println!("Unknown log level: {}", level);
				println!("Valid levels are 'none', 'info' or 'debug'.");
			}
		}
	}

	if let Some(language) = &args.language {
		config.language = language.clone();
		println!("Set language to {}", language);
		modified = true;
	}

	// If no modifications were made, create a default config
	if !modified {
		let config_path = Config::create_default_config()?;
		println!(
			"Created default configuration file at: {}",
			config_path.display()
		);
	} else {
		config.save()?;
		println!("Configuration saved successfully");
	}

	// Show current configuration
	println!("\nCurrent configuration:");
	println!("Base URL: {}", config.base_url);
	println!("Log level: {:?}", config.log_level);
	println!("Language: {}", config.language);

	Ok(())
}
