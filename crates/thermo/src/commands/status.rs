//! `thermo status` and the shared connect-and-read step.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use thermo_core::SurfaceState;

use crate::Surface;
use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Activate the surface and wait for the first settled state, with a
/// spinner on interactive terminals.
pub async fn settle(surface: &Surface, global: &GlobalOpts) -> SurfaceState {
    let spinner = (!global.quiet && std::io::stderr().is_terminal()).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Connecting to dial…");
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    });

    let state = surface.environment_ready().await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    state
}

/// Turn a non-ready state into the matching CLI error.
pub fn require_ready(state: SurfaceState) -> Result<SurfaceState, CliError> {
    match state {
        SurfaceState::NoCredentials => Err(CliError::NoCredentials),
        SurfaceState::DeviceError { error } | SurfaceState::PositionError { error } => {
            Err(error.into())
        }
        ready @ SurfaceState::Ready { .. } => Ok(ready),
        other => Err(CliError::NotReady {
            state: other.label().replace('_', " "),
        }),
    }
}

pub async fn handle(surface: &Surface, global: &GlobalOpts) -> Result<(), CliError> {
    let state = require_ready(settle(surface, global).await)?;
    let out = output::render_status(&global.output, &state);
    output::print_output(&out, global.quiet);
    Ok(())
}
