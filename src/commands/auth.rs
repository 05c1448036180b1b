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

// Login and registration commands

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::api::ApiClient;
use crate::config::{loading, Config};
use crate::log_error;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Args, Debug)]
pub struct LoginArgs {
	/// Username
	#[arg(long, short)]
	pub username: Option<String>,

	/// Password
	#[arg(long, short)]
	pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
	/// Username
	#[arg(long, short)]
	pub username: Option<String>,

	/// Password (at least 6 characters)
	#[arg(long, short)]
	pub password: Option<String>,

	/// City of residence
	#[arg(long)]
	pub city: Option<String>,

	/// District within the city
	#[arg(long)]
	pub district: Option<String>,

	/// Age, optional
	#[arg(long)]
	pub age: Option<String>,
}

/// Local check before any network call. Failures never leave the client.
pub fn validate_login(username: &str, password: &str) -> Result<(), String> {
	if username.trim().is_empty() || password.is_empty() {
		return Err("Enter username and password".to_string());
	}
	Ok(())
}

/// First registration step: account credentials. The profile step is not
/// reached until these pass.
pub fn validate_account_step(username: &str, password: &str) -> Result<(), String> {
	if username.trim().is_empty() {
		return Err("Enter a username".to_string());
	}
	if password.chars().count() < MIN_PASSWORD_LENGTH {
		return Err(format!(
			"Password must be at least {} characters",
			MIN_PASSWORD_LENGTH
		));
	}
	Ok(())
}

/// Second registration step: profile details. Age stays optional.
pub fn validate_profile_step(city: &str, district: &str) -> Result<(), String> {
	if city.trim().is_empty() || district.trim().is_empty() {
		return Err("Enter city and district".to_string());
	}
	Ok(())
}

/// Age is digits or nothing; anything else is rejected locally.
pub fn parse_age(input: &str) -> Result<Option<u32>, String> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Ok(None);
	}
	if !trimmed.chars().all(|c| c.is_ascii_digit()) {
		return Err("Age must be a number".to_string());
	}
	trimmed
		.parse()
		.map(Some)
		.map_err(|_| "Age must be a number".to_string())
}

pub async fn run_login(args: &LoginArgs, config: &Config) -> Result<()> {
	let username = value_or_prompt(&args.username, "Username")?;
	let password = secret_or_prompt(&args.password, "Password")?;

	if let Err(message) = validate_login(&username, &password) {
		log_error!("{}", message);
		return Ok(());
	}

	let mut client = ApiClient::new(&config.base_url, None)?;
	match client.login(&username, &password).await {
		Ok(user) => {
			store_session(&client)?;
			println!("{}", format!("Logged in as {}", user.username).bright_green());
		}
		Err(e) => log_error!("{}", e),
	}

	Ok(())
}

pub async fn run_register(args: &RegisterArgs, config: &Config) -> Result<()> {
	// Step 1: account credentials
	let username = value_or_prompt(&args.username, "Username")?;
	let password = secret_or_prompt(&args.password, "Password")?;

	if let Err(message) = validate_account_step(&username, &password) {
		log_error!("{}", message);
		return Ok(());
	}

	// Step 2: profile details
	let city = value_or_prompt(&args.city, "City")?;
	let district = value_or_prompt(&args.district, "District")?;
	let age_input = value_or_prompt(&args.age, "Age (optional)")?;

	if let Err(message) = validate_profile_step(&city, &district) {
		log_error!("{}", message);
		return Ok(());
	}

	let age = match parse_age(&age_input) {
		Ok(age) => age,
		Err(message) => {
			log_error!("{}", message);
			return Ok(());
		}
	};

	let mut client = ApiClient::new(&config.base_url, None)?;
	match client
		.register(&username, &password, &city, &district, age)
		.await
	{
		Ok(user) => {
			store_session(&client)?;
			println!(
				"{}",
				format!("Account created, logged in as {}", user.username).bright_green()
			);
		}
		Err(e) => log_error!("{}", e),
	}

	Ok(())
}

fn store_session(client: &ApiClient) -> Result<()> {
	if let Some(cookie) = client.session_cookie() {
		loading::store_session_cookie(cookie)?;
	}
	Ok(())
}

// Passwords are read without echo when not passed as a flag
fn secret_or_prompt(value: &Option<String>, label: &str) -> Result<String> {
	if let Some(value) = value {
		return Ok(value.clone());
	}
	crate::session::chat::input::read_password(label)
}

fn value_or_prompt(value: &Option<String>, label: &str) -> Result<String> {
	use std::io::{self, Write};

	if let Some(value) = value {
		return Ok(value.clone());
	}

	print!("{}: ", label);
	io::stdout().flush()?;

	let mut line = String::new();
	io::stdin().read_line(&mut line)?;
	Ok(line.trim().to_string())
}
