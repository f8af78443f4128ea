pub mod agents;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod github;
pub mod index;
pub mod llm;
pub mod repl;
pub mod session;
pub mod tui;
pub mod voice;
pub mod worker;

#[doc(hidden)]
pub mod testing;
