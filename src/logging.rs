//! Numeric log levels of the historian framework, mapped onto the `log`
//! facade.
//!
//! The framework addresses log levels as small integers; native endpoints
//! receive them over their control channels and from the `RVPF_LOG_LEVEL`
//! environment variable. This module keeps that numeric contract while the
//! actual sink stays whatever the embedding program installed (the tests use
//! `flexi_logger`).

use std::sync::Mutex;

/// Name of the environment variable consulted by [`set_level`].
pub const LOG_LEVEL_ENV: &str = "RVPF_LOG_LEVEL";

const DEFAULT_LEVEL: Level = Level::Warn;

/// The framework's log levels.
///
/// `Fatal` and `All` have no direct `log` counterpart; they map to
/// [`log::LevelFilter::Error`] and [`log::LevelFilter::Trace`].
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[repr(i32)]
pub enum Level {
    /// Logging disabled.
    None = 0,
    /// Unrecoverable conditions.
    Fatal = 1,
    /// Recoverable errors.
    Error = 2,
    /// Suspicious but tolerated input.
    Warn = 3,
    /// Life-cycle messages.
    Info = 4,
    /// Request-level detail.
    Debug = 5,
    /// Line and field detail.
    Trace = 6,
    /// Everything, including per-field traces.
    All = 7,
}

impl Level {
    fn from_number(number: i32) -> Option<Self> {
        Some(match number {
            0 => Self::None,
            1 => Self::Fatal,
            2 => Self::Error,
            3 => Self::Warn,
            4 => Self::Info,
            5 => Self::Debug,
            6 => Self::Trace,
            7 => Self::All,
            _ => return None,
        })
    }

    fn filter(self) -> log::LevelFilter {
        match self {
            Self::None => log::LevelFilter::Off,
            Self::Fatal | Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace | Self::All => log::LevelFilter::Trace,
        }
    }
}

struct LevelState {
    level: Level,
    explicit: bool,
}

lazy_static! {
    static ref LEVEL: Mutex<LevelState> = Mutex::new(LevelState {
        level: DEFAULT_LEVEL,
        explicit: false,
    });
}

/// Sets the process-wide level.
///
/// A value in `0..=7` is applied directly. A negative value is a *default*
/// request: on the first such call, `RVPF_LOG_LEVEL` is consulted and wins
/// when set, otherwise the absolute value is applied; once a level has been
/// set explicitly, default requests are ignored. Values above 7 are ignored.
pub fn set_level(level: i32) {
    let mut state = match LEVEL.lock() {
        Ok(state) => state,
        Err(poisoned) => poisoned.into_inner(),
    };

    if level < 0 {
        if state.explicit {
            return;
        }
        let requested = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|value| value.parse::<i32>().ok())
            .unwrap_or(-level);
        if let Some(level) = Level::from_number(requested) {
            state.level = level;
            state.explicit = true;
            log::set_max_level(level.filter());
        }
    } else if let Some(level) = Level::from_number(level) {
        state.level = level;
        state.explicit = true;
        log::set_max_level(level.filter());
    }
}

/// The current process-wide level.
pub fn level() -> Level {
    match LEVEL.lock() {
        Ok(state) => state.level,
        Err(poisoned) => poisoned.into_inner().level,
    }
}

/// Whether messages at `level` would currently be logged.
pub fn is_enabled(at: Level) -> bool {
    level() >= at
}
