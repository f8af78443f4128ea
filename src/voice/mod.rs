//! Voice input (recorder + transcription API) and output (TTS command).

pub mod input;
pub mod output;
pub mod speech_text;

pub use input::Listener;
pub use output::{SpeechOutcome, Speaker};
pub use speech_text::{clean_markdown, prepare_speech};

pub const TEST_PHRASE: &str = "Voice output is working. Hello from ASK LLAMA!";
