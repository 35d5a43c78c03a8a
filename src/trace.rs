//! Phase-gated diagnostics on stderr, controlled by the `BRACKEN_TRACE`
//! environment variable: `1` enables every phase, otherwise a comma-separated
//! list of phase names (`parse`, `dispatch`, `call`).

use std::sync::OnceLock;

struct Trace {
    all: bool,
    phases: Vec<String>,
}

static CONFIG: OnceLock<Trace> = OnceLock::new();

pub(crate) fn is_enabled(phase: &str) -> bool {
    let cfg = CONFIG.get_or_init(|| {
        let val = std::env::var("BRACKEN_TRACE").unwrap_or_default();
        match val.as_str() {
            "" | "0" => Trace {
                all: false,
                phases: Vec::new(),
            },
            "1" => Trace {
                all: true,
                phases: Vec::new(),
            },
            _ => Trace {
                all: false,
                phases: val.split(',').map(str::to_string).collect(),
            },
        }
    });
    cfg.all || cfg.phases.iter().any(|p| p == phase)
}

macro_rules! trace_log {
    ($phase:expr, $($arg:tt)*) => {
        if $crate::trace::is_enabled($phase) {
            eprintln!("[TRACE:{}] {}", $phase, format!($($arg)*));
        }
    };
}
pub(crate) use trace_log;
