//! Knowledge base behavior against a real SQLite file.

use std::sync::Arc;
use std::thread;

use serde_json::json;
use tempfile::TempDir;
use wf_kb::{
    signature, IncidentStore, KbError, KnowledgeBase, NewIncident, Patch, PromptStore,
    SaveOutcome, SessionLedger, SessionStatus, DEFAULT_CONFIDENCE_FLOOR, DEFAULT_PENALTY,
};

fn incident(sig: &str, file: &str) -> NewIncident {
    NewIncident {
        signature: sig.to_string(),
        raw_log: format!("log for {}", sig),
        fix_context: json!({ "root_cause_analysis": "missing import" }),
        patch: Patch::new(file, "export default function X() { return null }"),
        agent: "AI_RootCauseAnalysis".to_string(),
        attempts: 2,
    }
}

fn open_temp() -> (TempDir, KnowledgeBase) {
    let dir = TempDir::new().unwrap();
    let kb = KnowledgeBase::open(dir.path().join("kb").join("wf.sqlite")).unwrap();
    (dir, kb)
}

#[test]
fn test_save_then_lookup_known_solution() {
    let (_dir, kb) = open_temp();
    let sig = "build_error:Module not found: Can't resolve './Hero'";

    assert!(kb.find_known_solution(sig).unwrap().is_none());
    assert_eq!(
        kb.save_incident(&incident(sig, "app/page.tsx")).unwrap(),
        SaveOutcome::Inserted
    );

    let patch = kb.find_known_solution(sig).unwrap().unwrap();
    assert_eq!(patch.file_path, "app/page.tsx");

    let stored = kb.get_incident(sig).unwrap().unwrap();
    assert_eq!(stored.confidence, 1.0);
    assert_eq!(stored.attempts, 2);
    assert_eq!(stored.agent, "AI_RootCauseAnalysis");
}

#[test]
fn test_repeat_save_reinforces_instead_of_duplicating() {
    let (_dir, kb) = open_temp();
    let sig = "jest_error:ComponentX renders:expected true";

    kb.save_incident(&incident(sig, "components/X.tsx")).unwrap();
    kb.reinforce(sig, 2.0).unwrap();
    assert_eq!(kb.get_incident(sig).unwrap().unwrap().confidence, 3.0);

    let outcome = kb.save_incident(&incident(sig, "components/Other.tsx")).unwrap();
    assert_eq!(outcome, SaveOutcome::Reinforced { confidence: 4.0 });

    let similar = kb.find_similar_incidents(sig, 10).unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].patch.file_path, "components/X.tsx");
}

#[test]
fn test_similar_incidents_ordered_and_limited() {
    let (_dir, kb) = open_temp();
    kb.save_incident(&incident("jest_error:A renders:expected true", "a.tsx")).unwrap();
    kb.save_incident(&incident("jest_error:B renders:expected true", "b.tsx")).unwrap();
    kb.save_incident(&incident("jest_error:C renders:expected true", "c.tsx")).unwrap();
    kb.save_incident(&incident("build_error:unrelated", "d.tsx")).unwrap();
    kb.reinforce("jest_error:B renders:expected true", 2.0).unwrap();

    let similar = kb
        .find_similar_incidents("jest_error:Z renders:expected true", 2)
        .unwrap();
    assert_eq!(similar.len(), 2);
    assert_eq!(similar[0].patch.file_path, "b.tsx");
    assert!(similar.iter().all(|i| i.signature.ends_with("expected true")));
    assert!(similar[0].confidence >= similar[1].confidence);
}

#[test]
fn test_similar_search_escapes_wildcards() {
    let (_dir, kb) = open_temp();
    kb.save_incident(&incident("build_error:coverage 100 percent", "x.ts")).unwrap();

    let similar = kb.find_similar_incidents("build_error:100%", 5).unwrap();
    assert!(similar.is_empty());
}

#[test]
fn test_penalize_respects_floor() {
    let (_dir, kb) = open_temp();
    let sig = "build_error:Type error";
    kb.save_incident(&incident(sig, "a.ts")).unwrap();

    assert_eq!(kb.penalize(sig, DEFAULT_PENALTY, DEFAULT_CONFIDENCE_FLOOR).unwrap(), Some(0.5));
    let after = kb.penalize(sig, DEFAULT_PENALTY, DEFAULT_CONFIDENCE_FLOOR).unwrap().unwrap();
    assert!((after - DEFAULT_CONFIDENCE_FLOOR).abs() < 1e-9);
    let again = kb.penalize(sig, 5.0, DEFAULT_CONFIDENCE_FLOOR).unwrap().unwrap();
    assert!(again > 0.0);

    assert!(matches!(
        kb.penalize(sig, 0.5, 0.0),
        Err(KbError::InvalidArgument(_))
    ));
    assert_eq!(kb.penalize("build_error:unknown", 0.5, 0.1).unwrap(), None);
}

#[test]
fn test_failed_solutions_only_below_initial_confidence() {
    let (_dir, kb) = open_temp();
    let sig = "build_error:Hydration failed";
    kb.save_incident(&incident(sig, "app/layout.tsx")).unwrap();
    assert!(kb.failed_solutions(sig, 3).unwrap().is_empty());

    kb.penalize(sig, 0.5, 0.1).unwrap();
    let failed = kb.failed_solutions(sig, 3).unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].file_path, "app/layout.tsx");
}

#[test]
fn test_session_terminal_status_is_write_once() {
    let (_dir, kb) = open_temp();
    let id = kb.begin(&json!({ "pages": [] })).unwrap();

    let record = kb.get_session(&id).unwrap().unwrap();
    assert_eq!(record.status, SessionStatus::InProgress);
    assert!(record.ended_at.is_none());

    assert!(kb.complete(&id, SessionStatus::Success, Some("output/site-1")).unwrap());
    assert!(!kb.complete(&id, SessionStatus::Failed, None).unwrap());

    let record = kb.get_session(&id).unwrap().unwrap();
    assert_eq!(record.status, SessionStatus::Success);
    assert_eq!(record.output_location.as_deref(), Some("output/site-1"));
    assert!(record.ended_at.is_some());

    assert!(matches!(
        kb.complete("missing", SessionStatus::Failed, None),
        Err(KbError::SessionNotFound(_))
    ));
    assert!(matches!(
        kb.complete(&id, SessionStatus::InProgress, None),
        Err(KbError::InvalidArgument(_))
    ));
}

#[test]
fn test_recent_sessions_and_stats() {
    let (_dir, kb) = open_temp();
    let a = kb.begin(&json!({ "n": 1 })).unwrap();
    let b = kb.begin(&json!({ "n": 2 })).unwrap();
    kb.complete(&a, SessionStatus::Failed, None).unwrap();
    kb.complete(&b, SessionStatus::Success, Some("out")).unwrap();
    kb.begin(&json!({ "n": 3 })).unwrap();
    kb.save_incident(&incident("build_error:x", "x.ts")).unwrap();

    assert_eq!(kb.recent_sessions(2).unwrap().len(), 2);

    let stats = kb.stats().unwrap();
    assert_eq!(stats.incidents, 1);
    assert_eq!(stats.sessions_failed, 1);
    assert_eq!(stats.sessions_success, 1);
    assert_eq!(stats.sessions_in_progress, 1);
    assert_eq!(stats.average_confidence, Some(1.0));
}

#[test]
fn test_prompt_overrides_version_up() {
    let (_dir, kb) = open_temp();
    assert!(kb.active_prompt("debugger").unwrap().is_none());

    let first = kb.set_prompt("debugger", "You are a debugger.").unwrap();
    let second = kb.set_prompt("debugger", "You are a careful debugger.").unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);

    let active = kb.active_prompt("debugger").unwrap().unwrap();
    assert_eq!(active.prompt_text, "You are a careful debugger.");
    assert_eq!(kb.stats().unwrap().active_prompts, 1);
}

#[test]
fn test_concurrent_saves_do_not_lose_updates() {
    let (_dir, kb) = open_temp();
    let kb = Arc::new(kb);
    let sig = "build_error:race";
    kb.save_incident(&incident(sig, "r.ts")).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let kb = Arc::clone(&kb);
            thread::spawn(move || {
                kb.save_incident(&incident(sig, "r.ts")).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(kb.get_incident(sig).unwrap().unwrap().confidence, 9.0);
}

#[test]
fn test_reopen_preserves_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wf.sqlite");
    let sig = signature("Error: persisted failure\n").unwrap();
    {
        let kb = KnowledgeBase::open(&path).unwrap();
        kb.save_incident(&incident(&sig, "p.ts")).unwrap();
    }
    let kb = KnowledgeBase::open(&path).unwrap();
    assert!(kb.find_known_solution(&sig).unwrap().is_some());
}

#[test]
fn test_concurrent_connections_share_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.sqlite");
    let first = KnowledgeBase::open(&path).unwrap();
    let second = KnowledgeBase::open(&path).unwrap();
    let sig = "build_error:shared";

    first.save_incident(&incident(sig, "s.ts")).unwrap();
    assert_eq!(
        second.save_incident(&incident(sig, "s.ts")).unwrap(),
        SaveOutcome::Reinforced { confidence: 2.0 }
    );
}
