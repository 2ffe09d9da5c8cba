//! Execution options shared by the importer and the exporter

use serde::Deserialize;
use tracing::warn;

/// Default ceiling on bound parameters per store statement
pub const DEFAULT_MAX_PARAMS_PER_SQL: usize = 65000;

/// Environment variable overriding [`ExecOptions::max_params_per_sql`]
pub const MAX_PARAMS_PER_SQL_ENV: &str = "EXCHANGE_MAX_PARAMS_PER_SQL";

/// Configuration for one `exec` call
///
/// Bounds how many placeholders a single store statement may carry. The
/// exporter divides it by the number of primary-key metas to size its fetch
/// batches; the importer uses it to size keyed preload queries and batched
/// upserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecOptions {
    /// Maximum bound parameters per statement
    pub max_params_per_sql: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            max_params_per_sql: DEFAULT_MAX_PARAMS_PER_SQL,
        }
    }
}

impl ExecOptions {
    /// Create options with a custom parameter ceiling
    ///
    /// A zero ceiling is rejected with a warning and the default is used.
    pub fn new(max_params_per_sql: usize) -> Self {
        if max_params_per_sql == 0 {
            warn!(
                default = DEFAULT_MAX_PARAMS_PER_SQL,
                "Invalid max_params_per_sql (0), using default"
            );
            return Self::default();
        }

        Self { max_params_per_sql }
    }

    /// Builder form of [`ExecOptions::new`]
    pub fn with_max_params_per_sql(self, max_params_per_sql: usize) -> Self {
        Self::new(max_params_per_sql)
    }

    /// Read options from the process environment
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(MAX_PARAMS_PER_SQL_ENV).ok())
    }

    fn from_env_value(value: Option<String>) -> Self {
        match value {
            None => Self::default(),
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) => Self::new(n),
                Err(_) => {
                    warn!(
                        env = MAX_PARAMS_PER_SQL_ENV,
                        value = %raw,
                        "Unparseable parameter ceiling, using default"
                    );
                    Self::default()
                }
            },
        }
    }

    /// Ceiling actually applied; guards against a zero set directly on the field
    pub(crate) fn effective_max_params(&self) -> usize {
        if self.max_params_per_sql == 0 {
            DEFAULT_MAX_PARAMS_PER_SQL
        } else {
            self.max_params_per_sql
        }
    }
}
