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

// Profile viewing, editing, password change and logout

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::auth::{parse_age, MIN_PASSWORD_LENGTH};
use crate::api::{ApiClient, User};
use crate::config::{loading, Config};
use crate::session::chat::input::{confirm, read_password};
use crate::{log_debug, log_error};

#[derive(Args, Debug)]
pub struct ProfileArgs {
	/// New city
	#[arg(long)]
	pub city: Option<String>,

	/// New district
	#[arg(long)]
	pub district: Option<String>,

	/// New age; pass an empty value to clear it
	#[arg(long)]
	pub age: Option<String>,

	/// Change the account password interactively
	#[arg(long)]
	pub change_password: bool,
}

/// Local password change check, mirrors what the server enforces so
/// obvious mistakes never reach it.
pub fn validate_password_change(
	current: &str,
	new: &str,
	confirm: &str,
) -> Result<(), String> {
	if current.is_empty() || new.is_empty() || confirm.is_empty() {
		return Err("Fill in all password fields".to_string());
	}
	if new != confirm {
		return Err("New passwords do not match".to_string());
	}
	if new.chars().count() < MIN_PASSWORD_LENGTH {
		return Err(format!(
			"New password must be at least {} characters",
			MIN_PASSWORD_LENGTH
		));
	}
	Ok(())
}

pub async fn run_profile(args: &ProfileArgs, config: &Config) -> Result<()> {
	let client = authenticated_client(config)?;

	if args.change_password {
		return change_password(&client).await;
	}

	if args.city.is_some() || args.district.is_some() || args.age.is_some() {
		return update_profile(args, &client).await;
	}

	let user = client.current_user().await?;
	print_user(&user);
	Ok(())
}

async fn update_profile(args: &ProfileArgs, client: &ApiClient) -> Result<()> {
	let current = client.current_user().await?;

	// Unspecified fields keep their stored values
	let city = args
		.city
		.clone()
		.or_else(|| current.city.clone())
		.unwrap_or_default();
	let district = args
		.district
		.clone()
		.or_else(|| current.district.clone())
		.unwrap_or_default();

	if city.trim().is_empty() || district.trim().is_empty() {
		log_error!("City and district cannot be empty");
		return Ok(());
	}

	let age = match &args.age {
		Some(input) => match parse_age(input) {
			Ok(age) => age,
			Err(message) => {
				log_error!("{}", message);
				return Ok(());
			}
		},
		None => current.age,
	};

	match client.update_user(&city, &district, age).await {
		Ok(user) => {
			println!("{}", "Profile updated".bright_green());
			print_user(&user);
		}
		Err(e) => log_error!("{}", e),
	}

	Ok(())
}

async fn change_password(client: &ApiClient) -> Result<()> {
	let current = read_password("Current password")?;
	let new = read_password("New password")?;
	let confirm_value = read_password("Repeat new password")?;

	if let Err(message) = validate_password_change(&current, &new, &confirm_value) {
		log_error!("{}", message);
		return Ok(());
	}

	match client.change_password(&current, &new, &confirm_value).await {
		Ok(()) => println!("{}", "Password updated".bright_green()),
		Err(e) => log_error!("{}", e),
	}

	Ok(())
}

pub async fn run_logout(config: &Config) -> Result<()> {
	if !confirm("Log out?") {
		return Ok(());
	}

	// The stored session is forgotten even if the server call fails
	if let Some(cookie) = loading::load_session_cookie() {
		let mut client = ApiClient::new(&config.base_url, Some(cookie))?;
		if let Err(e) = client.logout().await {
			log_debug!("Logout request failed: {}", e);
		}
	}
	loading::clear_session_cookie()?;

	println!("{}", "Logged out".bright_blue());
	Ok(())
}

fn authenticated_client(config: &Config) -> Result<ApiClient> {
	let cookie =
		loading::load_session_cookie().context("Not logged in. Run `citychat login` first.")?;
	ApiClient::new(&config.base_url, Some(cookie))
}

fn print_user(user: &User) {
	println!("{}", format!("Profile of {}", user.username).bright_blue());
	println!("  City:     {}", user.city.as_deref().unwrap_or("not set"));
	println!(
		"  District: {}",
		user.district.as_deref().unwrap_or("not set")
	);
	match user.age {
		Some(age) => println!("  Age:      {}", age),
		None => println!("  Age:      not set"),
	}
}
