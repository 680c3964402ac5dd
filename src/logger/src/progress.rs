use std::sync::Mutex;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::Logger;

/// How progress and completion events reach the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other  => Err(format!("invalid log format '{other}' (expected 'text' or 'json')")),
        }
    }
}

pub struct JsonState {
    count: u64,
    last_emit: Instant,
}

/// A task progress reporter. In text mode this is an indicatif bar attached
/// to the global [`Logger`]; in json mode it emits one JSON object per line,
/// throttled to one event per second plus a final `done` event.
pub enum Progress {
    Bar(ProgressBar),
    Json {
        op: String,
        description: String,
        total: u64,
        state: Mutex<JsonState>,
    },
}

const JSON_EMIT_INTERVAL: Duration = Duration::from_secs(1);

impl Progress {
    #[must_use]
    pub fn new(format: LogFormat, op: &str, description: &str, total: u64) -> Self {
        match format {
            LogFormat::Text => {
                let style = ProgressStyle::with_template(
                    "{msg:<35} {wide_bar} [{pos:>8}/{len:>8}]"
                ).unwrap_or_else(|_| ProgressStyle::default_bar());
                let bar = ProgressBar::new(total).with_style(style);
                bar.set_message(format!("Processing {description}"));
                let bar = if Logger::is_initialized() {
                    Logger::multi().add(bar)
                } else {
                    bar
                };
                Self::Bar(bar)
            }
            LogFormat::Json => Self::Json {
                op: op.to_string(),
                description: description.to_string(),
                total,
                state: Mutex::new(JsonState { count: 0, last_emit: Instant::now() }),
            },
        }
    }

    pub fn update(&self, delta: u64) {
        match self {
            Self::Bar(bar) => bar.inc(delta),
            Self::Json { op, description, total, state } => {
                let Ok(mut state) = state.lock() else { return };
                state.count += delta;
                if state.last_emit.elapsed() >= JSON_EMIT_INTERVAL {
                    state.last_emit = Instant::now();
                    Self::emit(op, "working", description, state.count, *total);
                }
            }
        }
    }

    pub fn close(&self) {
        match self {
            Self::Bar(bar) => bar.finish_and_clear(),
            Self::Json { op, description, total, state } => {
                let Ok(state) = state.lock() else { return };
                Self::emit(op, "done", description, state.count, *total);
            }
        }
    }

    fn emit(op: &str, status: &str, description: &str, count: u64, total: u64) {
        let event = serde_json::json!({
            "op": op,
            "status": status,
            "description": description,
            "count": count,
            "total": total,
        });
        println!("{event}");
    }
}
