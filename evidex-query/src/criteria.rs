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

//! Criteria normalization
//!
//! Criteria arrive as an untyped JSON object, usually serialized to text by
//! the UI. Recognized keys:
//!
//! - `from` / `to`: unix seconds, `0` for "no bound", or a relative token
//!   (`"24h"`, `"3d"`, `"2w"`, `"week"`, `"month"`, `"total"`)
//! - `target`, `agent`: scope ids (string or integer)
//! - `date`: `"da"` or `"dr"`
//! - `type`: string or list of strings
//! - `info`, `note`: string or list of strings
//!
//! Unknown keys are ignored. A recognized key with a value of the wrong shape
//! is a `MalformedCriteria` error, as is text that is not a JSON object.

use chrono::{DateTime, Duration, Utc};
use evidex_core::{DateField, EvidexError, Result, ScopeId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static RELATIVE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,9})\s*([hdw])$").expect("relative range pattern is valid"));

/// Raw criteria as handed over by the caller
#[derive(Debug, Clone)]
pub enum CriteriaPayload {
    /// Serialized JSON text
    Text(String),
    /// Already parsed mapping
    Value(Value),
}

impl From<&str> for CriteriaPayload {
    fn from(text: &str) -> Self {
        CriteriaPayload::Text(text.to_string())
    }
}

impl From<String> for CriteriaPayload {
    fn from(text: String) -> Self {
        CriteriaPayload::Text(text)
    }
}

impl From<Value> for CriteriaPayload {
    fn from(value: Value) -> Self {
        CriteriaPayload::Value(value)
    }
}

impl From<&Value> for CriteriaPayload {
    fn from(value: &Value) -> Self {
        CriteriaPayload::Value(value.clone())
    }
}

/// One end of a time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeBound {
    #[default]
    Open,
    /// Absolute unix seconds
    At(i64),
    /// Relative to the compile time
    Ago(Duration),
}

impl TimeBound {
    /// Unix seconds of this bound, `None` when open
    pub fn resolve(self, now: DateTime<Utc>) -> Option<i64> {
        match self {
            TimeBound::Open => None,
            TimeBound::At(ts) => Some(ts),
            TimeBound::Ago(span) => now.checked_sub_signed(span).map(|t| t.timestamp()),
        }
    }

    fn parse_token(key: &str, token: &str) -> Result<Self> {
        let token = token.trim().to_ascii_lowercase();
        match token.as_str() {
            "" | "0" | "total" => return Ok(TimeBound::Open),
            "week" => return Ok(TimeBound::Ago(Duration::weeks(1))),
            "month" => return Ok(TimeBound::Ago(Duration::days(30))),
            _ => {}
        }

        if let Ok(ts) = token.parse::<i64>() {
            return Ok(TimeBound::At(ts));
        }

        let caps = RELATIVE_RANGE.captures(&token).ok_or_else(|| {
            EvidexError::MalformedCriteria(format!("unrecognized time range {:?} for {:?}", token, key))
        })?;
        // at most nine digits, always fits
        let amount: i64 = caps[1].parse().unwrap_or_default();
        let span = match &caps[2] {
            "h" => Duration::try_hours(amount),
            "d" => Duration::try_days(amount),
            _ => Duration::try_weeks(amount),
        };

        span.map(TimeBound::Ago).ok_or_else(|| {
            EvidexError::MalformedCriteria(format!("time range {:?} is out of bounds", token))
        })
    }
}

/// Typed criteria
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    from: TimeBound,
    to: TimeBound,
    target: Option<ScopeId>,
    agent: Option<ScopeId>,
    date: Option<DateField>,
    types: Vec<String>,
    info: Vec<String>,
    note: Vec<String>,
}

impl Criteria {
    /// Parse and validate a payload
    pub fn normalize(payload: impl Into<CriteriaPayload>) -> Result<Self> {
        let value = match payload.into() {
            CriteriaPayload::Text(text) => serde_json::from_str::<Value>(&text)?,
            CriteriaPayload::Value(value) => value,
        };
        let map = value.as_object().ok_or_else(|| {
            EvidexError::MalformedCriteria(format!(
                "criteria must be an object, got {}",
                json_kind(&value)
            ))
        })?;

        Ok(Self {
            from: time_bound(map, "from")?,
            to: time_bound(map, "to")?,
            target: scope_id(map, "target")?,
            agent: scope_id(map, "agent")?,
            date: date_field(map)?,
            types: string_list(map, "type")?,
            info: string_list(map, "info")?,
            note: string_list(map, "note")?,
        })
    }

    /// Extract the criteria from request parameters, where they live under
    /// the `"filter"` key. `Ok(None)` when there is no such key.
    pub fn from_params(params: &Value) -> Result<Option<Self>> {
        match params.get("filter") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Self::normalize(text.as_str()).map(Some),
            Some(value @ Value::Object(_)) => Self::normalize(value).map(Some),
            Some(other) => Err(EvidexError::MalformedCriteria(format!(
                "\"filter\" must be a string or an object, got {}",
                json_kind(other)
            ))),
        }
    }

    pub fn from(&self) -> TimeBound {
        self.from
    }

    pub fn to(&self) -> TimeBound {
        self.to
    }

    pub fn target(&self) -> Option<&ScopeId> {
        self.target.as_ref()
    }

    pub fn agent(&self) -> Option<&ScopeId> {
        self.agent.as_ref()
    }

    /// Requested date field, `None` when the criteria do not name one
    pub fn date(&self) -> Option<DateField> {
        self.date
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn info(&self) -> &[String] {
        &self.info
    }

    pub fn note(&self) -> &[String] {
        &self.note
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|value| !value.is_null())
}

fn malformed(key: &str, expected: &str, value: &Value) -> EvidexError {
    EvidexError::MalformedCriteria(format!(
        "{:?} must be {}, got {}",
        key,
        expected,
        json_kind(value)
    ))
}

fn time_bound(map: &Map<String, Value>, key: &str) -> Result<TimeBound> {
    match field(map, key) {
        None => Ok(TimeBound::Open),
        Some(value @ Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(TimeBound::Open),
            Some(ts) => Ok(TimeBound::At(ts)),
            None => Err(malformed(key, "an integer timestamp", value)),
        },
        Some(Value::String(token)) => TimeBound::parse_token(key, token),
        Some(other) => Err(malformed(key, "a timestamp or a range token", other)),
    }
}

fn scope_id(map: &Map<String, Value>, key: &str) -> Result<Option<ScopeId>> {
    match field(map, key) {
        None => Ok(None),
        Some(Value::String(id)) if id.trim().is_empty() => Ok(None),
        Some(Value::String(id)) => Ok(Some(ScopeId::new(id.trim()))),
        Some(Value::Number(n)) => Ok(Some(ScopeId::new(n.to_string()))),
        Some(other) => Err(malformed(key, "an id", other)),
    }
}

fn date_field(map: &Map<String, Value>) -> Result<Option<DateField>> {
    match field(map, "date") {
        None => Ok(None),
        Some(Value::String(name)) => DateField::from_name(name).map(Some).ok_or_else(|| {
            EvidexError::MalformedCriteria(format!("unknown date field {:?}", name))
        }),
        Some(other) => Err(malformed("date", "\"da\" or \"dr\"", other)),
    }
}

fn string_list(map: &Map<String, Value>, key: &str) -> Result<Vec<String>> {
    let strings = match field(map, key) {
        None => return Ok(Vec::new()),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(malformed(key, "a list of strings", other)),
            })
            .collect::<Result<Vec<_>>>()?,
        Some(other) => return Err(malformed(key, "a string or a list of strings", other)),
    };

    Ok(strings
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_text_payload() {
        let criteria = Criteria::normalize(
            r#"{"from":"24h","target":"4f86902a2afb6512a700006f","agent":"5008225c2afb654a4f003b9b","date":"dr"}"#,
        )
        .unwrap();

        assert_eq!(criteria.from(), TimeBound::Ago(Duration::hours(24)));
        assert_eq!(criteria.to(), TimeBound::Open);
        assert_eq!(criteria.target().unwrap().as_str(), "4f86902a2afb6512a700006f");
        assert_eq!(criteria.agent().unwrap().as_str(), "5008225c2afb654a4f003b9b");
        assert_eq!(criteria.date(), Some(DateField::Dr));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = Criteria::normalize("invalid_json").unwrap_err();
        assert!(matches!(err, EvidexError::MalformedCriteria(_)));
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(
            Criteria::normalize("[1, 2]"),
            Err(EvidexError::MalformedCriteria(_))
        ));
        assert!(matches!(
            Criteria::normalize(json!("target")),
            Err(EvidexError::MalformedCriteria(_))
        ));
    }

    #[test]
    fn test_value_pass_through_and_unknown_keys() {
        let criteria = Criteria::normalize(json!({
            "target": 42,
            "columns": ["a", "b"],
            "agent": null,
        }))
        .unwrap();
        assert_eq!(criteria.target().unwrap().as_str(), "42");
        assert!(criteria.agent().is_none());
    }

    #[test]
    fn test_unchecked_received_means_open_window() {
        let criteria = Criteria::normalize(
            r#"{"from":0,"target":"t","to":0,"agent":"a","date":"da"}"#,
        )
        .unwrap();
        assert_eq!(criteria.from(), TimeBound::Open);
        assert_eq!(criteria.to(), TimeBound::Open);
        assert_eq!(criteria.date(), Some(DateField::Da));
    }

    #[test]
    fn test_type_and_info_lists() {
        let criteria = Criteria::normalize(json!({
            "type": ["device", "file", "keylog"],
            "info": "pippo pluto",
            "note": ["", "lol"],
        }))
        .unwrap();
        assert_eq!(criteria.types(), ["device", "file", "keylog"]);
        assert_eq!(criteria.info(), ["pippo pluto"]);
        assert_eq!(criteria.note(), ["lol"]);

        let single = Criteria::normalize(json!({ "type": "chat" })).unwrap();
        assert_eq!(single.types(), ["chat"]);
    }

    #[test]
    fn test_wrong_shapes_are_malformed() {
        for bad in [
            json!({ "info": 42 }),
            json!({ "info": ["ok", 1] }),
            json!({ "date": "xx" }),
            json!({ "date": 1 }),
            json!({ "from": "yesterday-ish" }),
            json!({ "from": 1.5 }),
            json!({ "target": ["a"] }),
        ] {
            assert!(
                matches!(Criteria::normalize(bad.clone()), Err(EvidexError::MalformedCriteria(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_relative_tokens() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let resolve = |token: &str| {
            TimeBound::parse_token("from", token)
                .unwrap()
                .resolve(now)
        };

        assert_eq!(resolve("24h"), Some(now.timestamp() - 86_400));
        assert_eq!(resolve("3d"), Some(now.timestamp() - 3 * 86_400));
        assert_eq!(resolve("2w"), Some(now.timestamp() - 14 * 86_400));
        assert_eq!(resolve("week"), Some(now.timestamp() - 7 * 86_400));
        assert_eq!(resolve("month"), Some(now.timestamp() - 30 * 86_400));
        assert_eq!(resolve("total"), None);
        assert_eq!(resolve("1700000000"), Some(1_700_000_000));
    }

    #[test]
    fn test_from_params() {
        assert!(Criteria::from_params(&json!({})).unwrap().is_none());

        let nested = Criteria::from_params(&json!({ "filter": "{\"target\":\"t\"}" }))
            .unwrap()
            .unwrap();
        assert_eq!(nested.target().unwrap().as_str(), "t");

        let object = Criteria::from_params(&json!({ "filter": { "agent": "a" } }))
            .unwrap()
            .unwrap();
        assert_eq!(object.agent().unwrap().as_str(), "a");

        assert!(Criteria::from_params(&json!({ "filter": "invalid_json" })).is_err());
        assert!(Criteria::from_params(&json!({ "filter": 3 })).is_err());
    }
}
