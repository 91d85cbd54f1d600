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

//! Error types shared by the evidex crates

use thiserror::Error;

/// Result type for evidex operations
pub type Result<T> = std::result::Result<T, EvidexError>;

/// Errors surfaced by the filter compiler, histogram builder and dispatcher.
///
/// Only `MalformedCriteria` originates in the core itself. The collaborator
/// variants carry whatever the registry, policy, queue or store reported and
/// are passed through untouched.
#[derive(Debug, Error)]
pub enum EvidexError {
    /// Criteria payload could not be parsed into the expected structure
    #[error("Malformed criteria: {0}")]
    MalformedCriteria(String),

    /// A scope node violates the hierarchy invariants
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Entity registry failure
    #[error("Registry error: {0}")]
    Registry(String),

    /// Policy evaluator failure
    #[error("Policy error: {0}")]
    Policy(String),

    /// Downstream queue failure
    #[error("Queue error: {0}")]
    Queue(String),

    /// Evidence store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for EvidexError {
    fn from(e: serde_json::Error) -> Self {
        EvidexError::MalformedCriteria(e.to_string())
    }
}

impl From<toml::de::Error> for EvidexError {
    fn from(e: toml::de::Error) -> Self {
        EvidexError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_is_malformed_criteria() {
        let err = serde_json::from_str::<serde_json::Value>("invalid_json").unwrap_err();
        let err: EvidexError = err.into();
        assert!(matches!(err, EvidexError::MalformedCriteria(_)));
    }

    #[test]
    fn test_display() {
        let err = EvidexError::Queue("channel closed".to_string());
        assert_eq!(err.to_string(), "Queue error: channel closed");
    }
}
