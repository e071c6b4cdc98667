//! Structured extraction stage.

pub mod extractor;
pub mod openai;
pub mod prompt;

pub use extractor::{Extractor, MockExtractor};
pub use openai::OpenAiExtractor;
pub use prompt::{InstructionTemplate, context_message};
