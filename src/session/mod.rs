// Session module for the interactive chat client

pub mod chat; // Interactive loop, input and rendering
pub mod controller; // Chat session controller
pub mod media; // Attachment and voice capture

pub use controller::{ChatController, SendOutcome, ASSISTANT_REPLY_DELAY_MS};

use crate::api::{Message, MessageKind, Role};

/// Default title for a chat that has not been named yet.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Greeting seeded into a fresh chat panel. Local only, never persisted.
pub const GREETING: &str = "Hello! I am a local prototype. Ask me anything or write a task.";

/// Local notice shown after the active chat is deleted.
pub const DELETED_NOTICE: &str = "Conversation deleted.";

/// Maximum number of characters taken from the last user message when a
/// chat is renamed on the way out.
pub const TITLE_MAX_CHARS: usize = 40;

/// History panel labels are truncated to this many characters.
pub const HISTORY_LABEL_MAX_CHARS: usize = 30;

/// One side-panel item projecting a persisted chat. At most one entry is
/// marked active at a time.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
	pub id: crate::api::ChatId,
	pub title: String,
	pub active: bool,
}

impl HistoryEntry {
	pub fn label(&self) -> String {
		if self.title.chars().count() > HISTORY_LABEL_MAX_CHARS {
			let short: String = self.title.chars().take(HISTORY_LABEL_MAX_CHARS).collect();
			format!("{}…", short)
		} else {
			self.title.clone()
		}
	}
}

/// Local render model of one message in the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelNode {
	pub role: Role,
	pub body: NodeBody,
}

/// Panel node payload, one variant per message kind plus the transient
/// placeholder shown while a reply is pending.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
	Text(String),
	Image { src: String, name: Option<String> },
	Audio { src: String, mime: String },
	File { href: String, name: String },
	Pending,
}

impl PanelNode {
	pub fn text(role: Role, content: &str) -> Self {
		Self {
			role,
			body: NodeBody::Text(content.to_string()),
		}
	}

	pub fn pending() -> Self {
		Self {
			role: Role::Assistant,
			body: NodeBody::Pending,
		}
	}

	/// Project a persisted message into its panel representation.
	pub fn from_message(msg: &Message) -> Self {
		let name = msg
			.metadata
			.as_ref()
			.and_then(|m| m.get("name"))
			.and_then(|n| n.as_str())
			.map(|n| n.to_string());

		let body = match msg.kind {
			MessageKind::Text => NodeBody::Text(msg.content.clone()),
			MessageKind::Image => NodeBody::Image {
				src: msg.content.clone(),
				name,
			},
			MessageKind::Audio => NodeBody::Audio {
				src: msg.content.clone(),
				mime: msg
					.metadata
					.as_ref()
					.and_then(|m| m.get("mime"))
					.and_then(|m| m.as_str())
					.unwrap_or("audio/webm")
					.to_string(),
			},
			MessageKind::File => NodeBody::File {
				name: name.unwrap_or_else(|| {
					// Fall back to the last path segment, like a download link
					msg.content
						.rsplit('/')
						.next()
						.unwrap_or(&msg.content)
						.to_string()
				}),
				href: msg.content.clone(),
			},
		};

		Self {
			role: msg.role,
			body,
		}
	}
}
