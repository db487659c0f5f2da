//! `thermo set`, `thermo warmer`, `thermo cooler`.

use tracing::info;

use thermo_core::{Intent, MutationOutcome};

use crate::Surface;
use crate::cli::GlobalOpts;
use crate::commands::status::{require_ready, settle};
use crate::error::CliError;
use crate::output;

pub async fn handle_set(surface: &Surface, requested: i64, global: &GlobalOpts) -> Result<(), CliError> {
    require_ready(settle(surface, global).await)?;
    let outcome = surface.set_position(requested).await?;
    report(surface, outcome, global)
}

pub async fn handle_intent(surface: &Surface, intent: Intent, global: &GlobalOpts) -> Result<(), CliError> {
    require_ready(settle(surface, global).await)?;
    let outcome = surface.dispatch(intent).await?;
    report(surface, outcome, global)
}

fn report(surface: &Surface, outcome: MutationOutcome, global: &GlobalOpts) -> Result<(), CliError> {
    if let MutationOutcome::Applied {
        requested,
        submitted,
    } = outcome
    {
        if i64::from(submitted.degrees()) != requested {
            info!(requested, %submitted, "request clamped");
            if !global.quiet {
                eprintln!("Requested {requested} is out of range, moved to {submitted}");
            }
        }
    }

    // The move invalidated the position, and set_position refetched it.
    let state = require_ready(surface.state())?;
    let out = output::render_status(&global.output, &state);
    output::print_output(&out, global.quiet);
    Ok(())
}
