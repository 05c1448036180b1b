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

// Wire types for the backend REST API

use serde::{Deserialize, Serialize};

pub type ChatId = i64;

/// A persisted conversation as the backend reports it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Chat {
	pub id: ChatId,
	pub title: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	User,
	Assistant,
}

/// Message payload discriminator. The backend stores it as the `type` field.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
	Text,
	Image,
	Audio,
	File,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Message {
	pub id: i64,
	pub chat_id: ChatId,
	pub role: Role,
	#[serde(rename = "type", default = "default_kind")]
	pub kind: MessageKind,
	pub content: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<serde_json::Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
}

fn default_kind() -> MessageKind {
	MessageKind::Text
}

/// Body of `POST /api/chats/:id/messages`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewMessage {
	pub role: Role,
	pub content: String,
	#[serde(rename = "type")]
	pub kind: MessageKind,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
	pub id: i64,
	pub username: String,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub district: Option<String>,
	#[serde(default)]
	pub age: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
}
