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

// HTTP client for the backend REST API

pub mod types;

pub use types::{Chat, ChatId, Message, MessageKind, NewMessage, Role, User};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

const SESSION_COOKIE_NAME: &str = "session_id";

/// Backend operations the chat session controller depends on.
///
/// `ApiClient` is the real implementation; tests substitute an in-memory
/// mock that records calls.
#[async_trait]
pub trait ChatBackend: Send + Sync {
	async fn list_chats(&self) -> Result<Vec<Chat>>;
	async fn create_chat(&self, title: &str) -> Result<Chat>;
	async fn get_chat(&self, id: ChatId) -> Result<Chat>;
	async fn rename_chat(&self, id: ChatId, title: &str) -> Result<Chat>;
	async fn delete_chat(&self, id: ChatId) -> Result<()>;
	async fn list_messages(&self, id: ChatId) -> Result<Vec<Message>>;
	async fn create_message(&self, id: ChatId, message: &NewMessage) -> Result<Message>;
}

pub struct ApiClient {
	http: reqwest::Client,
	base_url: Url,
	session_cookie: Option<String>,
}

impl ApiClient {
	pub fn new(base_url: &str, session_cookie: Option<String>) -> Result<Self> {
		let base_url = Url::parse(base_url)
			.with_context(|| format!("Invalid base URL: {}", base_url))?;

		Ok(Self {
			http: reqwest::Client::new(),
			base_url,
			session_cookie,
		})
	}

	pub fn session_cookie(&self) -> Option<&str> {
		self.session_cookie.as_deref()
	}

	fn endpoint(&self, path: &str) -> Result<Url> {
		self.base_url
			.join(path)
			.with_context(|| format!("Invalid API path: {}", path))
	}

	async fn send(
		&self,
		method: Method,
		path: &str,
		body: Option<serde_json::Value>,
	) -> Result<Response> {
		let mut request = self.http.request(method, self.endpoint(path)?);

		if let Some(cookie) = &self.session_cookie {
			request = request.header(
				"Cookie",
				format!("{}={}", SESSION_COOKIE_NAME, cookie),
			);
		}

		if let Some(body) = body {
			request = request.json(&body);
		}

		let response = request
			.send()
			.await
			.with_context(|| format!("Request to {} failed", path))?;

		Ok(response)
	}

	/// Performs a request and decodes the JSON body, turning non-2xx
	/// responses into errors carrying the server's detail message.
	async fn request<T: DeserializeOwned>(
		&self,
		method: Method,
		path: &str,
		body: Option<serde_json::Value>,
	) -> Result<T> {
		let response = self.send(method, path, body).await?;
		let status = response.status();
		let text = response.text().await?;

		if !status.is_success() {
			return Err(anyhow::anyhow!("{}", error_detail(status, &text)));
		}

		serde_json::from_str(&text)
			.with_context(|| format!("Failed to parse response from {}", path))
	}

	// Auth endpoints. Login and register set the session cookie on this
	// client so follow-up calls in the same process are authenticated.

	pub async fn login(&mut self, username: &str, password: &str) -> Result<User> {
		let response = self
			.send(
				Method::POST,
				"/api/login",
				Some(serde_json::json!({
					"username": username,
					"password": password,
				})),
			)
			.await?;

		self.finish_auth(response).await
	}

	pub async fn register(
		&mut self,
		username: &str,
		password: &str,
		city: &str,
		district: &str,
		age: Option<u32>,
	) -> Result<User> {
		let response = self
			.send(
				Method::POST,
				"/api/register",
				Some(serde_json::json!({
					"username": username,
					"password": password,
					"city": city,
					"district": district,
					"age": age,
				})),
			)
			.await?;

		self.finish_auth(response).await
	}

	async fn finish_auth(&mut self, response: Response) -> Result<User> {
		let status = response.status();
		let cookie = extract_session_cookie(&response);
		let text = response.text().await?;

		if !status.is_success() {
			return Err(anyhow::anyhow!("{}", error_detail(status, &text)));
		}

		if cookie.is_some() {
			self.session_cookie = cookie;
		}

		let body: serde_json::Value =
			serde_json::from_str(&text).context("Failed to parse auth response")?;
		let user: User = serde_json::from_value(body["user"].clone())
			.context("Auth response is missing user data")?;

		Ok(user)
	}

	pub async fn logout(&mut self) -> Result<()> {
		let _: serde_json::Value = self.request(Method::POST, "/api/logout", None).await?;
		self.session_cookie = None;
		Ok(())
	}

	pub async fn current_user(&self) -> Result<User> {
		self.request(Method::GET, "/api/user", None).await
	}

	pub async fn update_user(
		&self,
		city: &str,
		district: &str,
		age: Option<u32>,
	) -> Result<User> {
		let body: serde_json::Value = self
			.request(
				Method::PUT,
				"/api/user",
				Some(serde_json::json!({
					"city": city,
					"district": district,
					"age": age,
				})),
			)
			.await?;

		serde_json::from_value(body["user"].clone())
			.context("Update response is missing user data")
	}

	pub async fn change_password(
		&self,
		current: &str,
		new: &str,
		confirm: &str,
	) -> Result<()> {
		let _: serde_json::Value = self
			.request(
				Method::POST,
				"/api/change-password",
				Some(serde_json::json!({
					"currentPassword": current,
					"newPassword": new,
					"confirmPassword": confirm,
				})),
			)
			.await?;
		Ok(())
	}
}

#[async_trait]
impl ChatBackend for ApiClient {
	async fn list_chats(&self) -> Result<Vec<Chat>> {
		self.request(Method::GET, "/api/chats", None).await
	}

	async fn create_chat(&self, title: &str) -> Result<Chat> {
		self.request(
			Method::POST,
			"/api/chats",
			Some(serde_json::json!({ "title": title })),
		)
		.await
	}

	async fn get_chat(&self, id: ChatId) -> Result<Chat> {
		self.request(Method::GET, &format!("/api/chats/{}", id), None)
			.await
	}

	async fn rename_chat(&self, id: ChatId, title: &str) -> Result<Chat> {
		self.request(
			Method::PUT,
			&format!("/api/chats/{}", id),
			Some(serde_json::json!({ "title": title })),
		)
		.await
	}

	async fn delete_chat(&self, id: ChatId) -> Result<()> {
		let _: serde_json::Value = self
			.request(Method::DELETE, &format!("/api/chats/{}", id), None)
			.await?;
		Ok(())
	}

	async fn list_messages(&self, id: ChatId) -> Result<Vec<Message>> {
		self.request(Method::GET, &format!("/api/chats/{}/messages", id), None)
			.await
	}

	async fn create_message(&self, id: ChatId, message: &NewMessage) -> Result<Message> {
		self.request(
			Method::POST,
			&format!("/api/chats/{}/messages", id),
			Some(serde_json::to_value(message)?),
		)
		.await
	}
}

/// Extract the user-facing message from a non-2xx response body.
///
/// The backend answers with `{"detail": ...}`; older endpoints used
/// `{"error": ...}`. Anything unparseable falls back to the status line.
pub fn error_detail(status: StatusCode, body: &str) -> String {
	if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
		for key in ["detail", "error"] {
			if let Some(detail) = json.get(key).and_then(|v| v.as_str()) {
				return detail.to_string();
			}
		}
	}
	format!("Request failed with status {}", status)
}

fn extract_session_cookie(response: &Response) -> Option<String> {
	for header in response.headers().get_all(SET_COOKIE) {
		if let Ok(raw) = header.to_str() {
			let pair = raw.split(';').next().unwrap_or("").trim();
			if let Some(value) = pair.strip_prefix(&format!("{}=", SESSION_COOKIE_NAME)) {
				if !value.is_empty() {
					return Some(value.to_string());
				}
			}
		}
	}
	None
}
