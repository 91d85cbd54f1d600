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

//! Keyword extraction from free text
//!
//! Each source string becomes one "all of these keywords" clause; the clauses
//! of all source strings are alternatives of one disjunction stored in the
//! `Keywords` slot.

use crate::position::{locate_position, segments};
use crate::predicate::{Condition, Field, FilterBuilder, FilterSlot, Predicate};
use evidex_core::{tokenize, QueryConfig};
use std::collections::BTreeSet;

/// Strip a leading address-like prefix such as `to:`
fn strip_structural_prefix<'a>(segment: &'a str, prefixes: &[String]) -> &'a str {
    match segment.split_once(':') {
        Some((head, rest)) if prefixes.iter().any(|p| p.eq_ignore_ascii_case(head.trim())) => {
            rest
        }
        _ => segment,
    }
}

/// Sorted, de-duplicated keywords of one source string.
///
/// Only the three segments forming a valid position are dropped, so the
/// position and keyword extractors partition the tokens.
pub fn line_keywords(line: &str, config: &QueryConfig) -> Vec<String> {
    let used = locate_position(line).map(|(_, used)| used);

    segments(line)
        .enumerate()
        .filter(|(index, _)| !used.map_or(false, |used| used.contains(index)))
        .map(|(_, segment)| segment)
        .map(|segment| strip_structural_prefix(segment, &config.structural_prefixes))
        .flat_map(tokenize)
        .filter(|token| token.chars().count() >= config.min_keyword_len)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One `All` clause on `field` per source string that yields keywords
pub fn keyword_clauses(lines: &[String], field: Field, config: &QueryConfig) -> Vec<Predicate> {
    lines
        .iter()
        .map(|line| line_keywords(line, config))
        .filter(|keywords| !keywords.is_empty())
        .map(|keywords| Predicate::field(field, Condition::All(keywords)))
        .collect()
}

/// Add the `info` keyword disjunction. Returns the number of clauses added.
pub fn filter_for_keywords(
    lines: &[String],
    builder: &mut FilterBuilder,
    config: &QueryConfig,
) -> usize {
    let clauses = keyword_clauses(lines, Field::Keywords, config);
    let added = clauses.len();
    builder.push_any_of(FilterSlot::Keywords, clauses);
    added
}

/// Add `note` keyword clauses to the same disjunction as `info`.
///
/// The clauses are appended to whatever the `Keywords` slot already holds:
/// a record matches when it satisfies any info clause or any note clause.
pub fn filter_for_notes(
    notes: &[String],
    builder: &mut FilterBuilder,
    config: &QueryConfig,
) -> usize {
    let clauses = keyword_clauses(notes, Field::Note, config);
    let added = clauses.len();
    builder.push_any_of(FilterSlot::Keywords, clauses);
    added
}
