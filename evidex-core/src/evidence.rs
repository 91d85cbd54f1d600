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

//! Captured evidence records.
//!
//! A record is created once by the ingestion path and is immutable from the
//! point of view of this workspace. The keyword index (`kw`) is derived from
//! `info` at construction time.

use crate::error::{EvidexError, Result};
use crate::scope::{ScopeId, ScopeKind, ScopeNode};
use crate::tokenize::keyword_set;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Which of the two record timestamps a time window applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateField {
    /// Date received by the collection pipeline
    Dr,
    /// Date the event happened on the agent
    #[default]
    Da,
}

impl DateField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dr" => Some(DateField::Dr),
            "da" => Some(DateField::Da),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateField::Dr => "dr",
            DateField::Da => "da",
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free text attached to a record: one string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoText {
    Single(String),
    Many(Vec<String>),
}

impl InfoText {
    pub fn lines(&self) -> Vec<&str> {
        match self {
            InfoText::Single(line) => vec![line.as_str()],
            InfoText::Many(lines) => lines.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for InfoText {
    fn default() -> Self {
        InfoText::Many(Vec::new())
    }
}

impl From<&str> for InfoText {
    fn from(line: &str) -> Self {
        InfoText::Single(line.to_string())
    }
}

impl From<String> for InfoText {
    fn from(line: String) -> Self {
        InfoText::Single(line)
    }
}

impl From<Vec<String>> for InfoText {
    fn from(lines: Vec<String>) -> Self {
        InfoText::Many(lines)
    }
}

/// A point on the earth surface, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in meters (haversine)
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// Reference to a record handed to downstream queues
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub id: String,
    pub aid: ScopeId,
    pub target_id: ScopeId,
    #[serde(rename = "type")]
    pub evidence_type: String,
}

/// One captured record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    /// Owning agent
    pub aid: ScopeId,
    /// Owning target (denormalized from the agent)
    pub target_id: ScopeId,
    /// Operation, target and agent ids
    pub path: Vec<ScopeId>,
    /// Raw type tag as reported by the agent
    #[serde(rename = "type")]
    pub evidence_type: String,
    /// Date received, unix seconds
    pub dr: i64,
    /// Date on agent, unix seconds
    pub da: i64,
    #[serde(default)]
    pub info: InfoText,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<GeoPoint>,
    /// Keyword index over `info`
    #[serde(default)]
    pub kw: Vec<String>,
}

impl Evidence {
    /// Create a record owned by `agent`. The agent must be a valid agent node.
    pub fn new(
        id: impl Into<String>,
        agent: &ScopeNode,
        evidence_type: impl Into<String>,
        da: i64,
        dr: i64,
    ) -> Result<Self> {
        if agent.kind != ScopeKind::Agent {
            return Err(EvidexError::InvalidScope(format!(
                "evidence must belong to an agent, got {} {}",
                agent.kind, agent.id
            )));
        }
        agent.validate()?;
        let target_id = agent
            .parent_id()
            .cloned()
            .ok_or_else(|| EvidexError::InvalidScope(format!("agent {} has no target", agent.id)))?;

        Ok(Self {
            id: id.into(),
            aid: agent.id.clone(),
            target_id,
            path: agent.lineage().cloned().collect(),
            evidence_type: evidence_type.into(),
            dr,
            da,
            info: InfoText::default(),
            note: Vec::new(),
            position: None,
            kw: Vec::new(),
        })
    }

    pub fn with_info(mut self, info: impl Into<InfoText>) -> Self {
        self.info = info.into();
        self.kw = keyword_set(self.info.lines());
        self
    }

    pub fn with_note(mut self, note: Vec<String>) -> Self {
        self.note = note;
        self
    }

    pub fn with_position(mut self, position: GeoPoint) -> Self {
        self.position = Some(position);
        self
    }

    pub fn timestamp(&self, field: DateField) -> i64 {
        match field {
            DateField::Dr => self.dr,
            DateField::Da => self.da,
        }
    }

    /// Keyword set over the operator notes
    pub fn note_keywords(&self) -> Vec<String> {
        keyword_set(self.note.iter().map(String::as_str))
    }

    pub fn reference(&self) -> EvidenceRef {
        EvidenceRef {
            id: self.id.clone(),
            aid: self.aid.clone(),
            target_id: self.target_id.clone(),
            evidence_type: self.evidence_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> ScopeNode {
        ScopeNode::operation("op", "op")
            .child("target", "target")
            .unwrap()
            .child("agent", "agent")
            .unwrap()
    }

    #[test]
    fn test_new_denormalizes_target() {
        let ev = Evidence::new("e1", &agent(), "chat", 20, 10).unwrap();
        assert_eq!(ev.aid, ScopeId::from("agent"));
        assert_eq!(ev.target_id, ScopeId::from("target"));
        assert_eq!(ev.path.len(), 3);
        assert_eq!(ev.timestamp(DateField::Da), 20);
        assert_eq!(ev.timestamp(DateField::Dr), 10);
    }

    #[test]
    fn test_new_requires_agent() {
        let target = ScopeNode::operation("op", "op").child("t", "t").unwrap();
        assert!(Evidence::new("e1", &target, "chat", 0, 0).is_err());
    }

    #[test]
    fn test_info_builds_keyword_index() {
        let ev = Evidence::new("e1", &agent(), "chat", 0, 0)
            .unwrap()
            .with_info("Skype: John Dorian");
        assert_eq!(ev.kw, vec!["dorian", "john", "skype"]);
    }

    #[test]
    fn test_info_deserializes_string_or_list() {
        let single: InfoText = serde_json::from_str(r#""asd lol""#).unwrap();
        assert_eq!(single.lines(), vec!["asd lol"]);

        let many: InfoText = serde_json::from_str(r#"["asd", "lol"]"#).unwrap();
        assert_eq!(many.lines(), vec!["asd", "lol"]);
    }

    #[test]
    fn test_date_field_names() {
        assert_eq!(DateField::default(), DateField::Da);
        assert_eq!(DateField::from_name("DR"), Some(DateField::Dr));
        assert_eq!(DateField::from_name("xx"), None);
    }

    #[test]
    fn test_distance() {
        let rome = GeoPoint::new(41.9028, 12.4964);
        let milan = GeoPoint::new(45.4642, 9.19);
        let d = rome.distance_m(&milan);
        assert!((470_000.0..490_000.0).contains(&d), "distance was {}", d);
        assert!(rome.distance_m(&rome) < 1e-6);
    }
}
