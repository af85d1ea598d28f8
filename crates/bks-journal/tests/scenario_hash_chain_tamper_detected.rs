//! Scenario: journal hash chain
//!
//! GREEN when:
//! - A chained journal of one full cycle verifies as valid.
//! - Editing the payload of a middle line is reported at that line.
//! - Reopening an existing journal continues the chain (seq and hash_prev)
//!   and the combined file still verifies.

use bks_journal::{
    read_entries, verify_hash_chain, JournalWriter, VerifyResult, EVENT_ACTION_RESULT,
    EVENT_CYCLE_FINISHED, EVENT_CYCLE_STARTED,
};
use serde_json::json;
use uuid::Uuid;

fn write_cycle(w: &mut JournalWriter) {
    let cycle = Uuid::new_v4();
    w.append(cycle, EVENT_CYCLE_STARTED, json!({"strategy": "higher"}))
        .unwrap();
    for (i, key) in ["3001:5", "3622:11", "973pb1:0"].iter().enumerate() {
        w.append(
            cycle,
            EVENT_ACTION_RESULT,
            json!({"side": "side_b", "key": key, "quantity": i + 1, "outcome": "applied"}),
        )
        .unwrap();
    }
    w.append(cycle, EVENT_CYCLE_FINISHED, json!({"applied": 3, "failed": 0}))
        .unwrap();
}

#[test]
fn untampered_journal_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.jsonl");

    let mut w = JournalWriter::open(&path, true).unwrap();
    write_cycle(&mut w);

    assert_eq!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Valid { lines: 5 }
    );
}

#[test]
fn tampered_payload_detected_at_its_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.jsonl");

    let mut w = JournalWriter::open(&path, true).unwrap();
    write_cycle(&mut w);

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    lines[2] = lines[2].replace("\"quantity\":2", "\"quantity\":200");
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3);
            assert!(reason.contains("hash_self mismatch"), "reason: {reason}");
        }
        other => panic!("expected Broken, got {other:?}"),
    }
}

#[test]
fn reopened_journal_continues_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.jsonl");

    {
        let mut w = JournalWriter::open(&path, true).unwrap();
        write_cycle(&mut w);
    }

    let mut w = JournalWriter::open(&path, true).unwrap();
    assert_eq!(w.seq(), 5);
    let head = w.last_hash().map(str::to_string);
    assert!(head.is_some());

    let e = w
        .append(Uuid::new_v4(), EVENT_CYCLE_STARTED, json!({"strategy": "lower"}))
        .unwrap();
    assert_eq!(e.seq, 5);
    assert_eq!(e.hash_prev, head);

    assert_eq!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Valid { lines: 6 }
    );
    assert_eq!(read_entries(&path).unwrap().len(), 6);
}
