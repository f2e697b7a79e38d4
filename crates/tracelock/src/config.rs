//! The process-wide trace switch.
//!
//! Locks built with [`TracePolicy::Inherit`](crate::TracePolicy::Inherit)
//! consult this switch on every operation. It is resolved exactly once:
//! either by an explicit [`configure`] call during startup, or, failing
//! that, from the [`TRACE_ENV_VAR`] environment variable the first time any
//! lock asks. After that it never changes.

use std::error::Error;
use std::fmt;
use std::sync::OnceLock;

/// Environment variable read when the switch has not been configured.
pub const TRACE_ENV_VAR: &str = "TRACELOCK_TRACE";

static PROCESS_SWITCH: OnceLock<bool> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The switch was already resolved, by [`configure`] or by a lock reading it.
    AlreadyConfigured { enabled: bool },
    InvalidValue { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyConfigured { enabled } => write!(
                f,
                "lock tracing switch is already set (enabled={enabled}); configure it before the first lock operation"
            ),
            Self::InvalidValue { var, value } => write!(
                f,
                "invalid value {value:?} for {var}; expected one of 1/0, true/false, on/off, yes/no"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Sets the process-wide switch.
///
/// Must run before any `Inherit` lock is used; afterwards the switch is
/// frozen and this returns [`ConfigError::AlreadyConfigured`].
pub fn configure(enabled: bool) -> Result<(), ConfigError> {
    let mut won = false;
    let current = *PROCESS_SWITCH.get_or_init(|| {
        won = true;
        enabled
    });
    if won {
        tracing::debug!(target: crate::TRACE_TARGET, enabled, "lock tracing configured");
        Ok(())
    } else {
        Err(ConfigError::AlreadyConfigured { enabled: current })
    }
}

/// Whether `Inherit` locks trace, resolving the switch on first use.
#[inline]
pub fn process_tracing_enabled() -> bool {
    *PROCESS_SWITCH.get_or_init(switch_from_env)
}

/// Parses a switch value: `1`, `true`, `on`, `yes`, `enabled` and their
/// negations, case-insensitively. An empty value means off.
pub fn parse_switch(value: &str) -> Result<bool, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(false);
    }
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" | "enabled" => Ok(true),
        "0" | "false" | "off" | "no" | "disabled" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: TRACE_ENV_VAR,
            value: value.to_owned(),
        }),
    }
}

fn switch_from_env() -> bool {
    let Some(value) = std::env::var_os(TRACE_ENV_VAR) else {
        return false;
    };
    match parse_switch(&value.to_string_lossy()) {
        Ok(enabled) => enabled,
        Err(err) => {
            tracing::warn!(target: crate::TRACE_TARGET, "{err}; lock tracing stays disabled");
            false
        }
    }
}
