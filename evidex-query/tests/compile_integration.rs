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

//! End-to-end compilation against the in-memory registry and store

use chrono::{DateTime, TimeZone, Utc};
use evidex_core::{Evidence, EvidexError, GeoPoint, ScopeNode, TypeFamily};
use evidex_query::{
    count_by_type, CompileOutcome, Condition, EvidenceStore, Field, FilterCompiler, FilterSlot,
    InMemoryEvidenceStore, InMemoryRegistry, Predicate, PROXIMITY_KEY,
};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

const NOW: i64 = 1_700_000_000;

struct Fixture {
    op: ScopeNode,
    target: ScopeNode,
    agent: ScopeNode,
    other_agent: ScopeNode,
    compiler: FilterCompiler<InMemoryRegistry>,
}

fn now() -> DateTime<Utc> {
    Utc.timestamp_opt(NOW, 0).unwrap()
}

fn fixture() -> Fixture {
    let registry = InMemoryRegistry::new();
    let op = ScopeNode::operation("op", "Operation");
    let target = op.child("t1", "Target").unwrap();
    let other_target = op.child("t2", "Other target").unwrap();
    let agent = target.child("a1", "Agent").unwrap();
    let other_agent = other_target.child("a2", "Other agent").unwrap();

    for node in [&op, &target, &other_target, &agent, &other_agent] {
        registry.insert(node.clone()).unwrap();
    }

    Fixture {
        op,
        target,
        agent,
        other_agent,
        compiler: FilterCompiler::new(Arc::new(registry)),
    }
}

fn compiled(outcome: CompileOutcome) -> evidex_query::CompiledPredicate {
    match outcome {
        CompileOutcome::Compiled(compiled) => compiled.predicate,
        CompileOutcome::NoScope => panic!("expected a compiled predicate"),
    }
}

#[test]
fn test_missing_target_is_no_scope() {
    let fx = fixture();
    let outcome = fx
        .compiler
        .compile_at(r#"{"from":"24h","agent":"a1","date":"dr"}"#, now())
        .unwrap();
    assert_eq!(outcome, CompileOutcome::NoScope);
}

#[test]
fn test_unknown_target_is_no_scope() {
    let fx = fixture();
    let outcome = fx
        .compiler
        .compile_at(
            r#"{"from":"24h","target":"a_target_id","agent":"5008225c2afb654a4f003b9b","date":"dr"}"#,
            now(),
        )
        .unwrap();
    assert!(outcome.is_no_scope());
}

#[test]
fn test_invalid_json_is_an_error() {
    let fx = fixture();
    let err = fx.compiler.compile_at("invalid_json", now()).unwrap_err();
    assert!(matches!(err, EvidexError::MalformedCriteria(_)));
}

#[test]
fn test_scope_clause_restricts_to_target() {
    let fx = fixture();
    let outcome = fx
        .compiler
        .compile_at(json!({ "target": "t1" }), now())
        .unwrap();
    assert_eq!(outcome.scope(), Some(&fx.target));

    let predicate = compiled(outcome);
    assert_eq!(
        predicate.clause(FilterSlot::Scope),
        Some(&Predicate::field(Field::Path, Condition::Eq("t1".into())))
    );
    assert_eq!(predicate.to_document()["path"], json!("t1"));
}

#[test]
fn test_date_defaults_to_da() {
    let fx = fixture();
    let predicate = compiled(
        fx.compiler
            .compile_at(json!({ "target": "t1", "agent": "a1" }), now())
            .unwrap(),
    );
    assert!(predicate.references(Field::Da));
    assert!(!predicate.references(Field::Dr));
}

#[test]
fn test_date_dr_selects_dr() {
    let fx = fixture();
    let predicate = compiled(
        fx.compiler
            .compile_at(
                r#"{"from":"24h","target":"t1","agent":"a1","date":"dr"}"#,
                now(),
            )
            .unwrap(),
    );
    assert!(predicate.references(Field::Dr));
    assert!(!predicate.references(Field::Da));
    assert_eq!(
        predicate.to_document()["dr"],
        json!({ "$gte": NOW - 24 * 3600 })
    );
}

#[test]
fn test_agent_clause_for_unknown_agent() {
    let fx = fixture();
    let predicate = compiled(
        fx.compiler
            .compile_at(
                json!({ "target": "t1", "agent": "5008225c2afb654a4f003b9b" }),
                now(),
            )
            .unwrap(),
    );
    assert_eq!(
        predicate.to_document()["aid"],
        json!("5008225c2afb654a4f003b9b")
    );
}

#[test]
fn test_keyword_and_position_coexist() {
    let fx = fixture();
    let predicate = compiled(
        fx.compiler
            .compile_at(
                json!({ "target": "t1", "info": "to:prova@gmail.com,lat:30,lon:30,r:100" }),
                now(),
            )
            .unwrap(),
    );

    let document = predicate.to_document();
    assert_eq!(
        document["$or"],
        json!([{ "kw": { "$all": ["com", "gmail", "prova"] } }])
    );
    assert!(document[PROXIMITY_KEY]["$near"].is_object());
    assert!(predicate.proximity().is_some());
}

#[test]
fn test_info_and_note_are_united() {
    let fx = fixture();
    let predicate = compiled(
        fx.compiler
            .compile_at(
                json!({ "target": "t1", "info": ["asd"], "note": ["lol"] }),
                now(),
            )
            .unwrap(),
    );
    assert_eq!(
        predicate.to_document()["$or"],
        json!([
            { "kw": { "$all": ["asd"] } },
            { "note": { "$all": ["lol"] } },
        ])
    );
}

#[test]
fn test_compiled_predicate_selects_records() {
    let fx = fixture();
    let store = InMemoryEvidenceStore::new();
    let recent = NOW - 3600;
    let old = NOW - 7 * 86_400;

    store.insert(
        Evidence::new("1", &fx.agent, "chat", recent, recent)
            .unwrap()
            .with_info("john dorian skype"),
    );
    store.insert(
        Evidence::new("2", &fx.agent, "chat", old, old)
            .unwrap()
            .with_info("john dorian skype"),
    );
    store.insert(
        Evidence::new("3", &fx.agent, "position", recent, recent)
            .unwrap()
            .with_position(GeoPoint::new(30.0, 30.0)),
    );
    store.insert(
        Evidence::new("4", &fx.other_agent, "chat", recent, recent)
            .unwrap()
            .with_info("john dorian skype"),
    );
    store.insert(
        Evidence::new("5", &fx.agent, "file", recent, recent)
            .unwrap()
            .with_note(vec!["Check this".to_string()]),
    );

    let ids = |payload: serde_json::Value| -> Vec<String> {
        let predicate = compiled(fx.compiler.compile_at(payload, now()).unwrap());
        let mut ids: Vec<String> = store
            .find(&predicate)
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect();
        ids.sort();
        ids
    };

    assert_eq!(ids(json!({ "target": "t1" })), vec!["1", "2", "3", "5"]);
    assert_eq!(
        ids(json!({ "target": "t1", "from": "24h", "info": "skype john" })),
        vec!["1"]
    );
    assert_eq!(
        ids(json!({ "target": "op", "info": "dorian" })),
        vec!["1", "2", "4"]
    );
    assert_eq!(
        ids(json!({ "target": "t1", "info": "lat:30.0001,lon:30,r:50" })),
        vec!["3"]
    );
    assert_eq!(
        ids(json!({ "target": "t1", "from": "24h", "info": "skype", "note": "check" })),
        vec!["1", "5"]
    );
    assert_eq!(
        ids(json!({ "target": "t1", "type": ["file", "position"] })),
        vec!["3", "5"]
    );
    assert_eq!(ids(json!({ "target": "t1", "agent": "ghost" })), Vec::<String>::new());
}

#[test]
fn test_histogram_over_target() {
    let fx = fixture();
    let store = InMemoryEvidenceStore::new();
    let mut seq = 0;
    let mut add = |agent: &ScopeNode, kind: &str| {
        seq += 1;
        store.insert(Evidence::new(seq.to_string(), agent, kind, NOW, NOW).unwrap());
    };
    for _ in 0..3 {
        add(&fx.agent, "chat");
    }
    for _ in 0..2 {
        add(&fx.agent, "position");
        add(&fx.agent, "ip");
    }
    add(&fx.other_agent, "file");

    let histogram = count_by_type(&store, &fx.target).unwrap();
    assert_eq!(histogram.get("chat"), Some(3));
    assert_eq!(histogram.get("position"), Some(2));
    assert_eq!(histogram.get("file"), Some(0));
    assert_eq!(histogram.get("ip"), None);
    assert_eq!(histogram.total(), 5);

    let document = serde_json::to_value(&histogram).unwrap();
    let map = document.as_object().unwrap();
    assert_eq!(map.len(), TypeFamily::ALL.len());
    assert!(!map.contains_key("ip"));

    let whole = count_by_type(&store, &fx.op).unwrap();
    assert_eq!(whole.count(TypeFamily::File), 1);
}

#[test]
fn test_type_names_are_case_insensitive() {
    let fx = fixture();
    let store = InMemoryEvidenceStore::new();
    store.insert(Evidence::new("1", &fx.agent, "CHAT", NOW, NOW).unwrap());
    store.insert(Evidence::new("2", &fx.agent, "chat", NOW, NOW).unwrap());
    store.insert(Evidence::new("3", &fx.agent, "file", NOW, NOW).unwrap());

    let predicate = compiled(
        fx.compiler
            .compile_at(json!({ "target": "t1", "type": "Chat" }), now())
            .unwrap(),
    );
    let mut ids: Vec<String> = store
        .find(&predicate)
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);

    let histogram = count_by_type(&store, &fx.target).unwrap();
    assert_eq!(histogram.count(TypeFamily::Chat), ids.len() as u64);
}

proptest! {
    #[test]
    fn prop_without_target_is_no_scope(
        agent in "[a-f0-9]{1,24}",
        info in proptest::collection::vec("[a-z ]{0,16}", 0..4),
        date in prop_oneof![Just("da"), Just("dr")],
    ) {
        let fx = fixture();
        let outcome = fx
            .compiler
            .compile_at(json!({ "agent": agent, "info": info, "date": date }), now())
            .unwrap();
        prop_assert!(outcome.is_no_scope());
    }

    #[test]
    fn prop_unregistered_target_is_no_scope(target in "x[g-z]{0,23}") {
        let fx = fixture();
        let outcome = fx
            .compiler
            .compile_at(json!({ "target": target }), now())
            .unwrap();
        prop_assert!(outcome.is_no_scope());
    }
}
