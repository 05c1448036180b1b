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

// Attachment loading and voice capture

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::api::MessageKind;

/// Maximum attachment size accepted from disk
pub const MAX_ATTACHMENT_SIZE: u64 = 5 * 1024 * 1024; // 5MB

/// Audio container candidates in preference order. The first one the
/// recorder supports wins; opus in webm gives the best quality per byte.
pub const PREFERRED_AUDIO_MIMES: &[&str] =
	&["audio/webm;codecs=opus", "audio/webm", "audio/mp4"];

/// A file prepared for sending: images are inlined as data URLs, other
/// files are referenced by a file:// URL.
#[derive(Debug, Clone)]
pub struct Attachment {
	pub kind: MessageKind,
	pub content: String,
	pub name: String,
}

/// Load a file from disk into an attachment.
pub fn load_attachment(path: &Path) -> Result<Attachment> {
	let metadata = std::fs::metadata(path)
		.with_context(|| format!("Cannot read file {}", path.display()))?;
	if !metadata.is_file() {
		return Err(anyhow::anyhow!("Not a file: {}", path.display()));
	}
	if metadata.len() > MAX_ATTACHMENT_SIZE {
		return Err(anyhow::anyhow!(
			"File too large: {}MB (max 5MB)",
			metadata.len() / 1024 / 1024
		));
	}

	let name = path
		.file_name()
		.and_then(|n| n.to_str())
		.map(|n| n.to_string())
		.unwrap_or_else(|| path.display().to_string());

	if let Some(media_type) = image_media_type(path) {
		let bytes = std::fs::read(path)
			.with_context(|| format!("Failed to read {}", path.display()))?;
		let encoded = general_purpose::STANDARD.encode(&bytes);
		return Ok(Attachment {
			kind: MessageKind::Image,
			content: format!("data:{};base64,{}", media_type, encoded),
			name,
		});
	}

	let absolute = path
		.canonicalize()
		.with_context(|| format!("Failed to resolve {}", path.display()))?;
	let href = url::Url::from_file_path(&absolute)
		.map_err(|_| anyhow::anyhow!("Cannot build file URL for {}", absolute.display()))?;

	Ok(Attachment {
		kind: MessageKind::File,
		content: href.to_string(),
		name,
	})
}

/// MIME type for files rendered inline as images, by extension.
fn image_media_type(path: &Path) -> Option<&'static str> {
	let ext = path.extension()?.to_str()?;
	match ext.to_lowercase().as_str() {
		"png" => Some("image/png"),
		"jpg" | "jpeg" => Some("image/jpeg"),
		"gif" => Some("image/gif"),
		"webp" => Some("image/webp"),
		"bmp" => Some("image/bmp"),
		_ => None,
	}
}

/// A finished voice recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
	pub mime: String,
	pub data: Vec<u8>,
}

impl Recording {
	pub fn to_data_url(&self) -> String {
		format!(
			"data:{};base64,{}",
			self.mime,
			general_purpose::STANDARD.encode(&self.data)
		)
	}
}

/// Pick the first preferred audio container the recorder supports.
pub fn negotiate_mime<R: Recorder + ?Sized>(recorder: &R) -> Option<String> {
	PREFERRED_AUDIO_MIMES
		.iter()
		.find(|mime| recorder.supports_mime(mime))
		.map(|mime| mime.to_string())
}

/// Speech-to-text capture. `stop` must release the microphone even when
/// it returns an error.
pub trait Transcriber {
	fn is_available(&self) -> bool;
	fn start(&mut self, language: &str) -> Result<()>;
	fn stop(&mut self) -> Result<String>;
}

/// Raw audio capture into a container format. `stop` must release the
/// microphone even when it returns an error.
pub trait Recorder {
	fn is_available(&self) -> bool;
	fn supports_mime(&self, mime: &str) -> bool;
	fn start(&mut self, mime: &str) -> Result<()>;
	fn stop(&mut self) -> Result<Vec<u8>>;
}

/// Placeholder transcriber for hosts without a speech engine.
#[derive(Default)]
pub struct NullTranscriber;

impl Transcriber for NullTranscriber {
	fn is_available(&self) -> bool {
		false
	}

	fn start(&mut self, _language: &str) -> Result<()> {
		Err(anyhow::anyhow!("Speech recognition is not available"))
	}

	fn stop(&mut self) -> Result<String> {
		Err(anyhow::anyhow!("Speech recognition is not available"))
	}
}

/// Placeholder recorder for hosts without audio capture.
#[derive(Default)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
	fn is_available(&self) -> bool {
		false
	}

	fn supports_mime(&self, _mime: &str) -> bool {
		false
	}

	fn start(&mut self, _mime: &str) -> Result<()> {
		Err(anyhow::anyhow!("Audio recording is not available"))
	}

	fn stop(&mut self) -> Result<Vec<u8>> {
		Err(anyhow::anyhow!("Audio recording is not available"))
	}
}

/// Recorder backed by the ffmpeg capture utility. Audio from the
/// default input device is written as opus in webm to a temporary file
/// and read back on stop.
pub struct FfmpegRecorder {
	binary: Option<PathBuf>,
	active: Option<FfmpegCapture>,
}

struct FfmpegCapture {
	child: Child,
	path: PathBuf,
}

impl FfmpegRecorder {
	/// Probe the host for ffmpeg.
	pub fn detect() -> Self {
		let binary = Command::new("ffmpeg")
			.arg("-version")
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.status()
			.ok()
			.filter(|status| status.success())
			.map(|_| PathBuf::from("ffmpeg"));

		Self {
			binary,
			active: None,
		}
	}

	#[cfg(test)]
	fn with_binary(binary: Option<PathBuf>) -> Self {
		Self {
			binary,
			active: None,
		}
	}

	fn capture_args() -> &'static [&'static str] {
		if cfg!(target_os = "macos") {
			&["-f", "avfoundation", "-i", ":0"]
		} else if cfg!(target_os = "windows") {
			&["-f", "dshow", "-i", "audio=default"]
		} else {
			&["-f", "pulse", "-i", "default"]
		}
	}
}

impl Recorder for FfmpegRecorder {
	fn is_available(&self) -> bool {
		self.binary.is_some()
	}

	fn supports_mime(&self, mime: &str) -> bool {
		// Only webm can be finalized on a polite quit; mp4 cannot
		self.binary.is_some() && matches!(mime, "audio/webm;codecs=opus" | "audio/webm")
	}

	fn start(&mut self, _mime: &str) -> Result<()> {
		let binary = self.binary.as_ref().context("ffmpeg is not installed")?;
		let path = std::env::temp_dir().join(format!("citychat-voice-{}.webm", std::process::id()));

		let child = Command::new(binary)
			.args(["-y", "-hide_banner", "-loglevel", "error"])
			.args(Self::capture_args())
			.args(["-ac", "1", "-c:a", "libopus"])
			.arg(&path)
			.stdin(Stdio::piped())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.spawn()
			.context("Failed to start ffmpeg")?;

		self.active = Some(FfmpegCapture { child, path });
		Ok(())
	}

	fn stop(&mut self) -> Result<Vec<u8>> {
		let mut capture = self.active.take().context("No recording in progress")?;

		// 'q' asks ffmpeg to finalize the container before exiting
		if let Some(mut stdin) = capture.child.stdin.take() {
			let _ = stdin.write_all(b"q");
		}
		if capture.child.wait().is_err() {
			let _ = capture.child.kill();
			let _ = capture.child.wait();
		}

		let data = std::fs::read(&capture.path);
		let _ = std::fs::remove_file(&capture.path);

		let data = data.context("Recording file could not be read")?;
		if data.is_empty() {
			return Err(anyhow::anyhow!("Recording is empty"));
		}
		Ok(data)
	}
}

/// What a voice toggle did.
#[derive(Debug, PartialEq)]
pub enum VoiceEvent {
	TranscriptionStarted,
	Transcript(String),
	RecordingStarted,
	Recorded(Recording),
	/// Neither transcription nor recording is available on this host.
	Unsupported,
}

enum ActiveCapture {
	Transcription,
	Recording { mime: String },
}

/// Toggle-style voice input: one call starts a capture, the next one
/// stops it. Transcription is preferred, recording is the fallback.
pub struct VoiceInput<T: Transcriber, R: Recorder> {
	transcriber: T,
	recorder: R,
	language: String,
	active: Option<ActiveCapture>,
}

impl<T: Transcriber, R: Recorder> VoiceInput<T, R> {
	pub fn new(transcriber: T, recorder: R, language: &str) -> Self {
		Self {
			transcriber,
			recorder,
			language: language.to_string(),
			active: None,
		}
	}

	pub fn is_active(&self) -> bool {
		self.active.is_some()
	}

	pub fn toggle(&mut self) -> Result<VoiceEvent> {
		// Taking the state first guarantees a failed stop still leaves
		// the toggle in the idle position.
		match self.active.take() {
			Some(ActiveCapture::Transcription) => {
				let text = self.transcriber.stop()?;
				Ok(VoiceEvent::Transcript(text))
			}
			Some(ActiveCapture::Recording { mime }) => {
				let data = self.recorder.stop()?;
				Ok(VoiceEvent::Recorded(Recording { mime, data }))
			}
			None => self.start_capture(),
		}
	}

	/// Stop any capture still running, discarding its result. Keeps the
	/// microphone from staying open past the session.
	pub fn release(&mut self) {
		match self.active.take() {
			Some(ActiveCapture::Transcription) => {
				let _ = self.transcriber.stop();
			}
			Some(ActiveCapture::Recording { .. }) => {
				let _ = self.recorder.stop();
			}
			None => {}
		}
	}

	fn start_capture(&mut self) -> Result<VoiceEvent> {
		if self.transcriber.is_available() {
			self.transcriber.start(&self.language)?;
			self.active = Some(ActiveCapture::Transcription);
			return Ok(VoiceEvent::TranscriptionStarted);
		}

		if self.recorder.is_available() {
			if let Some(mime) = negotiate_mime(&self.recorder) {
				self.recorder.start(&mime)?;
				self.active = Some(ActiveCapture::Recording { mime });
				return Ok(VoiceEvent::RecordingStarted);
			}
		}

		Ok(VoiceEvent::Unsupported)
	}
}

impl<T: Transcriber, R: Recorder> Drop for VoiceInput<T, R> {
	fn drop(&mut self) {
		self.release();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	struct FakeTranscriber {
		available: bool,
		started: bool,
		fail_stop: bool,
	}

	impl FakeTranscriber {
		fn new(available: bool) -> Self {
			Self {
				available,
				started: false,
				fail_stop: false,
			}
		}
	}

	impl Transcriber for FakeTranscriber {
		fn is_available(&self) -> bool {
			self.available
		}

		fn start(&mut self, language: &str) -> Result<()> {
			assert_eq!(language, "ru-RU");
			self.started = true;
			Ok(())
		}

		fn stop(&mut self) -> Result<String> {
			self.started = false;
			if self.fail_stop {
				return Err(anyhow::anyhow!("no speech detected"));
			}
			Ok("купить хлеб".to_string())
		}
	}

	struct FakeRecorder {
		available: bool,
		supported: Vec<&'static str>,
		recording: bool,
	}

	impl Recorder for FakeRecorder {
		fn is_available(&self) -> bool {
			self.available
		}

		fn supports_mime(&self, mime: &str) -> bool {
			self.supported.contains(&mime)
		}

		fn start(&mut self, _mime: &str) -> Result<()> {
			self.recording = true;
			Ok(())
		}

		fn stop(&mut self) -> Result<Vec<u8>> {
			self.recording = false;
			Ok(vec![0xAA, 0xBB])
		}
	}

	#[test]
	fn test_toggle_prefers_transcription() {
		let mut voice = VoiceInput::new(
			FakeTranscriber::new(true),
			FakeRecorder {
				available: true,
				supported: vec!["audio/webm"],
				recording: false,
			},
			"ru-RU",
		);

		assert_eq!(voice.toggle().unwrap(), VoiceEvent::TranscriptionStarted);
		assert!(voice.is_active());
		assert_eq!(
			voice.toggle().unwrap(),
			VoiceEvent::Transcript("купить хлеб".to_string())
		);
		assert!(!voice.is_active());
	}

	#[test]
	fn test_toggle_falls_back_to_recording() {
		let mut voice = VoiceInput::new(
			FakeTranscriber::new(false),
			FakeRecorder {
				available: true,
				supported: vec!["audio/mp4"],
				recording: false,
			},
			"ru-RU",
		);

		assert_eq!(voice.toggle().unwrap(), VoiceEvent::RecordingStarted);
		match voice.toggle().unwrap() {
			VoiceEvent::Recorded(recording) => {
				assert_eq!(recording.mime, "audio/mp4");
				assert_eq!(recording.data, vec![0xAA, 0xBB]);
			}
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[test]
	fn test_toggle_unsupported_host() {
		let mut voice = VoiceInput::new(NullTranscriber, NullRecorder, "ru-RU");
		assert_eq!(voice.toggle().unwrap(), VoiceEvent::Unsupported);
		assert!(!voice.is_active());
	}

	#[test]
	fn test_failed_stop_resets_toggle() {
		let mut transcriber = FakeTranscriber::new(true);
		transcriber.fail_stop = true;
		let mut voice = VoiceInput::new(transcriber, NullRecorder, "ru-RU");

		voice.toggle().unwrap();
		assert!(voice.toggle().is_err());
		// The next toggle starts a fresh capture instead of stopping again
		assert!(!voice.is_active());
	}

	#[test]
	fn test_release_stops_active_capture() {
		let mut voice = VoiceInput::new(FakeTranscriber::new(true), NullRecorder, "ru-RU");
		voice.toggle().unwrap();
		assert!(voice.is_active());

		voice.release();
		assert!(!voice.is_active());
	}

	#[test]
	fn test_mime_preference_order() {
		let recorder = FakeRecorder {
			available: true,
			supported: vec!["audio/mp4", "audio/webm"],
			recording: false,
		};
		// webm outranks mp4 even though both are supported
		assert_eq!(negotiate_mime(&recorder), Some("audio/webm".to_string()));

		let opus = FakeRecorder {
			available: true,
			supported: vec!["audio/webm;codecs=opus", "audio/webm"],
			recording: false,
		};
		assert_eq!(
			negotiate_mime(&opus),
			Some("audio/webm;codecs=opus".to_string())
		);

		let none = FakeRecorder {
			available: true,
			supported: vec![],
			recording: false,
		};
		assert_eq!(negotiate_mime(&none), None);
	}

	#[test]
	fn test_ffmpeg_recorder_requires_binary() {
		let recorder = FfmpegRecorder::with_binary(None);
		assert!(!recorder.is_available());
		assert!(!recorder.supports_mime("audio/webm"));

		let mut voice = VoiceInput::new(NullTranscriber, recorder, "ru-RU");
		assert_eq!(voice.toggle().unwrap(), VoiceEvent::Unsupported);
	}

	#[test]
	fn test_ffmpeg_recorder_negotiates_webm_opus() {
		let recorder = FfmpegRecorder::with_binary(Some(PathBuf::from("/usr/bin/ffmpeg")));
		assert!(recorder.is_available());
		assert!(recorder.supports_mime("audio/webm;codecs=opus"));
		assert!(recorder.supports_mime("audio/webm"));
		assert!(!recorder.supports_mime("audio/mp4"));
		assert_eq!(
			negotiate_mime(&recorder),
			Some("audio/webm;codecs=opus".to_string())
		);
	}

	#[test]
	fn test_recording_data_url() {
		let recording = Recording {
			mime: "audio/webm".to_string(),
			data: vec![1, 2, 3, 4],
		};
		assert_eq!(recording.to_data_url(), "data:audio/webm;base64,AQIDBA==");
	}

	#[test]
	fn test_load_attachment_image_inlined() {
		let dir = std::env::temp_dir().join("citychat-media-test");
		std::fs::create_dir_all(&dir).unwrap();
		let path = dir.join("pixel.png");
		let mut file = std::fs::File::create(&path).unwrap();
		file.write_all(&[0x89, 0x50, 0x4E, 0x47]).unwrap();
		drop(file);

		let attachment = load_attachment(&path).unwrap();
		assert_eq!(attachment.kind, MessageKind::Image);
		assert!(attachment.content.starts_with("data:image/png;base64,"));
		assert_eq!(attachment.name, "pixel.png");

		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn test_load_attachment_other_file_by_reference() {
		let dir = std::env::temp_dir().join("citychat-media-test");
		std::fs::create_dir_all(&dir).unwrap();
		let path = dir.join("notes.txt");
		std::fs::write(&path, "hello").unwrap();

		let attachment = load_attachment(&path).unwrap();
		assert_eq!(attachment.kind, MessageKind::File);
		assert!(attachment.content.starts_with("file://"));
		assert!(attachment.content.ends_with("notes.txt"));

		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn test_load_attachment_missing_file() {
		assert!(load_attachment(Path::new("/nonexistent/file.bin")).is_err());
	}
}
