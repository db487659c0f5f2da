//! `thermo dial`: interactive control surface on stdin.
//!
//! Re-renders whenever the cache changes, so the refetch that follows a
//! move shows up without another keypress.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use thermo_core::{Intent, SurfaceState};

use crate::Surface;
use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

const KEYS: &str = "+ warmer   - cooler   r retry   q quit";

pub async fn handle(surface: &Surface, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut changes = surface.subscribe();
    let mut last = String::new();

    let state = surface.environment_ready().await;
    if matches!(state, SurfaceState::NoCredentials) {
        return Err(CliError::NoCredentials);
    }
    render(&state, color, &mut last);
    if !global.quiet {
        eprintln!("{KEYS}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "+" => apply(surface, Intent::Warmer).await,
                    "-" => apply(surface, Intent::Cooler).await,
                    "r" => {
                        surface.retry().await;
                    }
                    "q" => break,
                    "" => {}
                    other => eprintln!("unknown key '{other}' ({KEYS})"),
                }
                render(&surface.state(), color, &mut last);
            }
            alive = changes.changed() => {
                if !alive {
                    break;
                }
                render(&surface.state(), color, &mut last);
            }
        }
    }
    Ok(())
}

async fn apply(surface: &Surface, intent: Intent) {
    if let Err(e) = surface.dispatch(intent).await {
        warn!(error = %e, %intent, "intent not applied");
        eprintln!("{e}");
    }
}

/// Print the state line unless it is unchanged since the last print.
fn render(state: &SurfaceState, color: bool, last: &mut String) {
    let line = output::dial_line(state, color);
    if *last != line {
        println!("{line}");
        *last = line;
    }
}
