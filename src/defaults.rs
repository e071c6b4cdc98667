//! Default configuration constants for voxledger.
//!
//! Shared by the config layer, the pipeline, and the CLI so every entry point
//! agrees on the same fallbacks.

/// Default listen address.
pub const HOST: &str = "0.0.0.0";

/// Default listen port.
pub const PORT: u16 = 8080;

/// Default value for the `Access-Control-Allow-Origin` header.
pub const ALLOW_ORIGINS: &str = "*";

/// Deadline covering transcription and extraction together, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest accepted audio upload, in megabytes.
pub const MAX_UPLOAD_MB: u64 = 15;

/// Base URL of the OpenAI-compatible API.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Completion model used for structured extraction.
pub const LLM_MODEL: &str = "gpt-4o-mini";

/// Speech-to-text model.
pub const WHISPER_MODEL: &str = "whisper-1";

/// Zone used when neither the request nor the configuration names a loadable one.
pub const FALLBACK_TIMEZONE: &str = "Asia/Kolkata";

/// Offset of the last-resort fixed zone (IST, +05:30), in seconds east of UTC.
pub const FALLBACK_OFFSET_SECS: i32 = 5 * 3600 + 1800;

/// Calendar format of the `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Headroom added on top of the audio ceiling for the other multipart fields.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Bytes in one configured megabyte.
pub const BYTES_PER_MB: u64 = 1024 * 1024;
