//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders the dial status in the format selected by `--output`. Table uses
//! `tabled`, structured formats use serde, plain emits one line for scripts.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use thermo_core::SurfaceState;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Status view ──────────────────────────────────────────────────────

/// Serializable snapshot of a surface state.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_f: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_deg: Option<f64>,
    pub refreshing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&SurfaceState> for StatusView {
    fn from(state: &SurfaceState) -> Self {
        let mut view = Self {
            state: state.label(),
            position: None,
            temperature_f: None,
            rotation_deg: None,
            refreshing: false,
            error: state.error().map(ToString::to_string),
        };
        if let SurfaceState::Ready {
            position,
            display,
            refreshing,
        } = state
        {
            view.position = Some(position.degrees());
            view.temperature_f = Some(display.rounded_temperature());
            view.rotation_deg = Some(display.rotation_deg);
            view.refreshing = *refreshing;
        }
        view
    }
}

#[derive(Tabled)]
struct DetailRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn status_table(view: &StatusView) -> String {
    let mut rows = vec![DetailRow {
        field: "State",
        value: view.state.replace('_', " "),
    }];
    if let Some(t) = view.temperature_f {
        rows.push(DetailRow {
            field: "Temperature",
            value: format!("{t}°F"),
        });
    }
    if let Some(p) = view.position {
        rows.push(DetailRow {
            field: "Servo position",
            value: p.to_string(),
        });
    }
    if let Some(r) = view.rotation_deg {
        rows.push(DetailRow {
            field: "Dial rotation",
            value: format!("{r:.1}°"),
        });
    }
    if let Some(ref e) = view.error {
        rows.push(DetailRow {
            field: "Error",
            value: e.clone(),
        });
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

fn status_plain(view: &StatusView) -> String {
    match (view.temperature_f, view.position) {
        (Some(t), Some(p)) => format!("{t}\t{p}"),
        _ => view.state.to_owned(),
    }
}

/// Render a status in the chosen format.
pub fn render_status(format: &OutputFormat, state: &SurfaceState) -> String {
    render_single(format, &StatusView::from(state), status_table, status_plain)
}

/// One-line summary for the interactive dial.
pub fn dial_line(state: &SurfaceState, color: bool) -> String {
    match state {
        SurfaceState::Ready {
            position,
            display,
            refreshing,
        } => {
            let temp = format!("{}°F", display.rounded_temperature());
            let temp = if color {
                temp.bold().to_string()
            } else {
                temp
            };
            let marker = if *refreshing { " …" } else { "" };
            format!(
                "{temp}  (servo {position}, dial {:.0}°){marker}",
                display.rotation_deg
            )
        }
        SurfaceState::DeviceError { error } | SurfaceState::PositionError { error } => {
            let text = format!("error: {error} (r to retry)");
            if color {
                text.red().to_string()
            } else {
                text
            }
        }
        SurfaceState::NoCredentials => "no API key configured".into(),
        SurfaceState::Idle => "idle".into(),
        SurfaceState::Connecting => {
            if color {
                "connecting…".dimmed().to_string()
            } else {
                "connecting…".into()
            }
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> String
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => plain_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\":\"serialization failed: {e}\"}}"))
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use thermo_core::{CoreError, DisplayValues, Position};

    use super::*;

    fn ready(p: u32) -> SurfaceState {
        let position = Position::from_device(p);
        SurfaceState::Ready {
            position,
            display: DisplayValues::of(position),
            refreshing: false,
        }
    }

    #[test]
    fn json_carries_rounded_temperature() {
        let out = render_status(&OutputFormat::JsonCompact, &ready(95));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["state"], "ready");
        assert_eq!(value["temperature_f"], 68);
        assert_eq!(value["position"], 95);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn plain_is_tab_separated() {
        assert_eq!(render_status(&OutputFormat::Plain, &ready(180)), "56\t180");
    }

    #[test]
    fn errors_show_up_in_the_view() {
        let state = SurfaceState::DeviceError {
            error: CoreError::AuthenticationFailed {
                message: "Invalid API key".into(),
            },
        };
        let view = StatusView::from(&state);
        assert_eq!(view.state, "device_error");
        assert!(view.error.unwrap().contains("Invalid API key"));
        assert_eq!(render_status(&OutputFormat::Plain, &state), "device_error");
    }

    #[test]
    fn dial_line_without_color() {
        assert_eq!(dial_line(&ready(95), false), "68°F  (servo 95, dial -20°)");
    }
}
