//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod data;
pub mod devices;
pub mod info;
pub mod redact;
pub mod registers;
pub mod util;
pub mod watch;

use thermly_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::handle(controller, global).await,
        Command::Info(args) => info::handle(controller, args, global).await,
        Command::Data(args) => data::handle(controller, args, global).await,
        Command::Registers(args) => registers::handle(controller, args, global).await,
        Command::Watch(args) => watch::handle(controller, args, global).await,
        // Handled in main before a controller exists
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
