//! Runtime configuration for the VM.

/// Environment variable that toggles execution tracing.
pub const TRACE_ENV: &str = "SMED_TRACE";

/// Options that change how the VM runs, not what it computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Print the stack and the next instruction before each dispatch.
    pub trace_execution: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            trace_execution: cfg!(feature = "trace-execution"),
        }
    }
}

impl VmConfig {
    /// Defaults, overridden by `SMED_TRACE` when it is set.
    pub fn from_env() -> Self {
        Self::from_var(std::env::var(TRACE_ENV).ok().as_deref())
    }

    /// Defaults, overridden by a `SMED_TRACE` value. Unset or unrecognised
    /// values keep the default.
    pub fn from_var(trace: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(enabled) = trace.and_then(parse_flag) {
            config.trace_execution = enabled;
        }
        config
    }

    pub fn with_trace(mut self, trace_execution: bool) -> Self {
        self.trace_execution = trace_execution;
        self
    }
}

/// Accepts `1`/`true`/`on`/`yes` and `0`/`false`/`off`/`no`, any case.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
