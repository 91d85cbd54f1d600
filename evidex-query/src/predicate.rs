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

//! Compiled predicates
//!
//! A compiled predicate is a conjunction of per-slot clauses plus at most one
//! proximity constraint. Clauses are trees of field conditions combined with
//! `And` / `Or`. The same structure can be rendered as a document-store query
//! (`to_document`) or evaluated against a record in memory (`matches`).

use evidex_core::{DateField, Evidence, GeoPoint};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Key under which the proximity constraint is rendered
pub const PROXIMITY_KEY: &str = "geoNear_coordinates";

/// Record attribute a condition applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Lineage of the record (operation, target, agent ids)
    Path,
    /// Owning agent id
    Agent,
    /// Raw evidence type
    Type,
    /// Date received
    Dr,
    /// Date on agent
    Da,
    /// Keyword index over `info`
    Keywords,
    /// Keywords of the operator notes
    Note,
}

impl Field {
    /// Attribute name in the stored document
    pub fn name(self) -> &'static str {
        match self {
            Field::Path => "path",
            Field::Agent => "aid",
            Field::Type => "type",
            Field::Dr => "dr",
            Field::Da => "da",
            Field::Keywords => "kw",
            Field::Note => "note",
        }
    }
}

impl From<DateField> for Field {
    fn from(field: DateField) -> Self {
        match field {
            DateField::Dr => Field::Dr,
            DateField::Da => Field::Da,
        }
    }
}

/// Operator and operand(s) of a leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Equal to the value; on list attributes, contains it
    Eq(String),
    /// Equal to one of the values
    In(Vec<String>),
    /// List attribute contains every value
    All(Vec<String>),
    /// Inclusive bounds, either may be open
    Range { gte: Option<i64>, lte: Option<i64> },
}

/// Predicate tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Where { field: Field, condition: Condition },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

/// Values of a record attribute, as seen by the evaluator
enum FieldValues {
    Text(Vec<String>),
    Time(i64),
}

impl FieldValues {
    fn of(record: &Evidence, field: Field) -> Self {
        match field {
            Field::Path => FieldValues::Text(record.path.iter().map(|id| id.to_string()).collect()),
            Field::Agent => FieldValues::Text(vec![record.aid.to_string()]),
            // type tags compare case-insensitively, as in the histogram
            Field::Type => {
                FieldValues::Text(vec![record.evidence_type.trim().to_ascii_lowercase()])
            }
            Field::Dr => FieldValues::Time(record.dr),
            Field::Da => FieldValues::Time(record.da),
            Field::Keywords => FieldValues::Text(record.kw.clone()),
            Field::Note => FieldValues::Text(record.note_keywords()),
        }
    }

    fn has(&self, value: &str) -> bool {
        match self {
            FieldValues::Text(values) => values.iter().any(|v| v == value),
            FieldValues::Time(ts) => value.parse::<i64>().map_or(false, |v| v == *ts),
        }
    }
}

impl Predicate {
    pub fn field(field: Field, condition: Condition) -> Self {
        Predicate::Where { field, condition }
    }

    /// Whether any leaf of the tree constrains `field`
    pub fn references(&self, field: Field) -> bool {
        match self {
            Predicate::Where { field: f, .. } => *f == field,
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().any(|child| child.references(field))
            }
        }
    }

    /// Evaluate against a record
    pub fn matches(&self, record: &Evidence) -> bool {
        match self {
            Predicate::Where { field, condition } => {
                let values = FieldValues::of(record, *field);
                match condition {
                    Condition::Eq(value) => values.has(value),
                    Condition::In(candidates) => candidates.iter().any(|c| values.has(c)),
                    Condition::All(required) => required.iter().all(|r| values.has(r)),
                    Condition::Range { gte, lte } => match values {
                        FieldValues::Time(ts) => {
                            gte.map_or(true, |lower| ts >= lower) && lte.map_or(true, |upper| ts <= upper)
                        }
                        FieldValues::Text(_) => false,
                    },
                }
            }
            Predicate::And(children) => children.iter().all(|child| child.matches(record)),
            Predicate::Or(children) => children.iter().any(|child| child.matches(record)),
        }
    }

    /// Render in the document-store query dialect
    pub fn to_document(&self) -> Value {
        match self {
            Predicate::Where { field, condition } => {
                let operand = match condition {
                    Condition::Eq(value) => json!(value),
                    Condition::In(values) => json!({ "$in": values }),
                    Condition::All(values) => json!({ "$all": values }),
                    Condition::Range { gte: None, lte: None } => json!({ "$exists": true }),
                    Condition::Range { gte, lte } => {
                        let mut bounds = Map::new();
                        if let Some(lower) = gte {
                            bounds.insert("$gte".to_string(), json!(lower));
                        }
                        if let Some(upper) = lte {
                            bounds.insert("$lte".to_string(), json!(upper));
                        }
                        Value::Object(bounds)
                    }
                };
                json!({ field.name(): operand })
            }
            Predicate::And(children) => {
                json!({ "$and": children.iter().map(Predicate::to_document).collect::<Vec<_>>() })
            }
            Predicate::Or(children) => {
                json!({ "$or": children.iter().map(Predicate::to_document).collect::<Vec<_>>() })
            }
        }
    }
}

/// Proximity sub-constraint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    pub center: GeoPoint,
    /// Radius in meters
    pub radius_m: f64,
}

impl Proximity {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.distance_m(point) <= self.radius_m
    }

    pub fn to_document(&self) -> Value {
        json!({
            "$near": {
                "$geometry": {
                    "type": "Point",
                    "coordinates": [self.center.lon, self.center.lat],
                },
                "$maxDistance": self.radius_m,
            }
        })
    }
}

/// Reserved accumulator keys. Each slot holds at most one clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterSlot {
    Scope,
    Window,
    Agent,
    Type,
    /// Disjunction of keyword clauses from `info` and `note`
    Keywords,
}

/// Accumulator for one compile call.
///
/// `set` replaces whatever the slot held. `push_any_of` unions alternatives
/// into the slot's disjunction instead, which is how several free-text
/// sources share the `Keywords` slot.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    clauses: BTreeMap<FilterSlot, Predicate>,
    proximity: Option<Proximity>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a clause, returning the one it replaced
    pub fn set(&mut self, slot: FilterSlot, predicate: Predicate) -> Option<Predicate> {
        self.clauses.insert(slot, predicate)
    }

    /// Add alternatives to the slot's disjunction
    pub fn push_any_of(&mut self, slot: FilterSlot, alternatives: Vec<Predicate>) {
        if alternatives.is_empty() {
            return;
        }

        let merged = match self.clauses.remove(&slot) {
            None => alternatives,
            Some(Predicate::Or(mut existing)) => {
                existing.extend(alternatives);
                existing
            }
            Some(other) => std::iter::once(other).chain(alternatives).collect(),
        };
        self.clauses.insert(slot, Predicate::Or(merged));
    }

    pub fn set_proximity(&mut self, proximity: Proximity) -> Option<Proximity> {
        self.proximity.replace(proximity)
    }

    pub fn get(&self, slot: FilterSlot) -> Option<&Predicate> {
        self.clauses.get(&slot)
    }

    pub fn proximity(&self) -> Option<&Proximity> {
        self.proximity.as_ref()
    }

    /// Number of accumulated entries, proximity included
    pub fn len(&self) -> usize {
        self.clauses.len() + usize::from(self.proximity.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn build(self) -> CompiledPredicate {
        CompiledPredicate {
            clauses: self.clauses,
            proximity: self.proximity,
        }
    }
}

/// Storage-ready predicate: all clauses must hold, and the record must lie
/// within the proximity constraint when there is one.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    clauses: BTreeMap<FilterSlot, Predicate>,
    proximity: Option<Proximity>,
}

impl CompiledPredicate {
    pub fn clause(&self, slot: FilterSlot) -> Option<&Predicate> {
        self.clauses.get(&slot)
    }

    pub fn clauses(&self) -> impl Iterator<Item = (FilterSlot, &Predicate)> {
        self.clauses.iter().map(|(slot, predicate)| (*slot, predicate))
    }

    pub fn proximity(&self) -> Option<&Proximity> {
        self.proximity.as_ref()
    }

    /// Number of entries, proximity included
    pub fn len(&self) -> usize {
        self.clauses.len() + usize::from(self.proximity.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn references(&self, field: Field) -> bool {
        self.clauses.values().any(|clause| clause.references(field))
    }

    pub fn matches(&self, record: &Evidence) -> bool {
        let within = match (&self.proximity, &record.position) {
            (None, _) => true,
            (Some(proximity), Some(position)) => proximity.contains(position),
            (Some(_), None) => false,
        };
        within && self.clauses.values().all(|clause| clause.matches(record))
    }

    /// Render as one query document. Clause keys are merged into a single
    /// object; colliding keys fall back to an explicit `$and`.
    pub fn to_document(&self) -> Value {
        let mut document = Map::new();
        let mut overflow = Vec::new();

        for clause in self.clauses.values() {
            match clause.to_document() {
                Value::Object(entries) => {
                    for (key, value) in entries {
                        if document.contains_key(&key) {
                            overflow.push(json!({ key: value }));
                        } else {
                            document.insert(key, value);
                        }
                    }
                }
                other => overflow.push(other),
            }
        }

        if let Some(proximity) = &self.proximity {
            document.insert(PROXIMITY_KEY.to_string(), proximity.to_document());
        }
        if !overflow.is_empty() {
            document.insert("$and".to_string(), Value::Array(overflow));
        }

        Value::Object(document)
    }
}
