//! Output mode selection for the CLI
//!
//! Every command writes its result either as themed text, as a single JSON
//! document, or not at all. Logs go to stderr in every mode.

use std::sync::OnceLock;

use serde::Serialize;

/// Environment variable that silences human-readable output
pub const QUIET_ENV: &str = "GWH_QUIET";

static QUIET: OnceLock<bool> = OnceLock::new();

/// How command results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Themed text, tables and a spinner around sync
    Human,
    /// One pretty-printed JSON document per command
    Json,
    /// Nothing on stdout
    Quiet,
}

impl OutputMode {
    /// Pick the mode for this process from the `--json` flag and `GWH_QUIET`.
    pub fn select(json: bool) -> Self {
        Self::from_flags(json, is_quiet())
    }

    fn from_flags(json: bool, quiet: bool) -> Self {
        match (json, quiet) {
            (true, _) => OutputMode::Json,
            (false, true) => OutputMode::Quiet,
            (false, false) => OutputMode::Human,
        }
    }

    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }

    /// Print `value` as JSON when in JSON mode; other modes print nothing.
    pub fn emit_json<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<()> {
        if self == OutputMode::Json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }
}

/// Whether human-readable output is suppressed (`GWH_QUIET=1`)
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| parse_quiet(std::env::var(QUIET_ENV).ok().as_deref()))
}

fn parse_quiet(value: Option<&str>) -> bool {
    matches!(value, Some(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}
