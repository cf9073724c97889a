// src/runner/mod.rs

//! Command execution modes: in-process, watchdog child, supervised child.

pub mod command;
pub mod mode;
pub mod shutdown;

pub use command::CommandRunner;
pub use mode::{RunMode, reexec_args, reexec_command_line};
pub use shutdown::{ShutdownHook, ShutdownReport};
