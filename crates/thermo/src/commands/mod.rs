//! Command handlers, one module per command family.

pub mod config_cmd;
pub mod dial;
pub mod position;
pub mod status;

use crate::Surface;
use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a device command to its handler.
pub async fn dispatch(cmd: Command, surface: &Surface, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(surface, global).await,
        Command::Set(args) => position::handle_set(surface, args.position, global).await,
        Command::Warmer => position::handle_intent(surface, thermo_core::Intent::Warmer, global).await,
        Command::Cooler => position::handle_intent(surface, thermo_core::Intent::Cooler, global).await,
        Command::Dial => dial::handle(surface, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command does not use the device".into(),
        }),
    }
}
