// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Configuration for query compilation, dispatch and logging

use crate::error::{EvidexError, Result};
use crate::evidence::DateField;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Evidex configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EvidexConfig {
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Timestamp filtered on when the criteria carry no `date`
    #[serde(default)]
    pub default_date_field: DateField,

    /// Address-like prefixes stripped from free text before keyword
    /// extraction (e.g. "to:")
    #[serde(default = "default_structural_prefixes")]
    pub structural_prefixes: Vec<String>,

    /// Keywords shorter than this are dropped
    #[serde(default = "default_min_keyword_len")]
    pub min_keyword_len: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Capacity of each channel-backed downstream queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

// Default values
fn default_structural_prefixes() -> Vec<String> {
    ["to", "from", "cc", "bcc"]
        .iter()
        .map(|prefix| prefix.to_string())
        .collect()
}

fn default_min_keyword_len() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    4096
}

fn default_log_filter() -> String {
    "evidex_query=info,evidex_dispatch=info".to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_date_field: DateField::default(),
            structural_prefixes: default_structural_prefixes(),
            min_keyword_len: default_min_keyword_len(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl EvidexConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - EVIDEX_DEFAULT_DATE_FIELD: "da" or "dr" (default: da)
    /// - EVIDEX_STRUCTURAL_PREFIXES: Comma-separated prefixes (default: to,from,cc,bcc)
    /// - EVIDEX_MIN_KEYWORD_LEN: Minimum keyword length (default: 1)
    /// - EVIDEX_QUEUE_CAPACITY: Downstream queue capacity (default: 4096)
    /// - EVIDEX_LOG_FILTER: Log filter when RUST_LOG is unset
    ///
    /// Unparsable values keep their default; the result is validated.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(field) = std::env::var("EVIDEX_DEFAULT_DATE_FIELD") {
            if let Some(field) = DateField::from_name(&field) {
                config.query.default_date_field = field;
            }
        }

        if let Ok(prefixes) = std::env::var("EVIDEX_STRUCTURAL_PREFIXES") {
            config.query.structural_prefixes = prefixes
                .split(',')
                .map(|prefix| prefix.trim().to_string())
                .filter(|prefix| !prefix.is_empty())
                .collect();
        }

        if let Ok(len) = std::env::var("EVIDEX_MIN_KEYWORD_LEN") {
            if let Ok(val) = len.parse() {
                config.query.min_keyword_len = val;
            }
        }

        if let Ok(capacity) = std::env::var("EVIDEX_QUEUE_CAPACITY") {
            if let Ok(val) = capacity.parse() {
                config.dispatch.queue_capacity = val;
            }
        }

        if let Ok(filter) = std::env::var("EVIDEX_LOG_FILTER") {
            config.logging.filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.query.min_keyword_len == 0 {
            return Err(EvidexError::Config(
                "query.min_keyword_len must be at least 1".to_string(),
            ));
        }

        if self.dispatch.queue_capacity == 0 {
            return Err(EvidexError::Config(
                "dispatch.queue_capacity must be greater than 0".to_string(),
            ));
        }

        if let Some(prefix) = self
            .query
            .structural_prefixes
            .iter()
            .find(|prefix| prefix.is_empty() || !prefix.chars().all(char::is_alphanumeric))
        {
            return Err(EvidexError::Config(format!(
                "structural prefix {:?} must be a non-empty alphanumeric word",
                prefix
            )));
        }

        Ok(())
    }
}
