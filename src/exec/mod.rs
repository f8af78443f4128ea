pub mod process;

pub use process::{ExecResult, kill_process_group, run_command, terminate_process};
