//! Session behaviour over the share-trading test game.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{Market, MarketConfig, Trade, buy, init_tracing, sell};
use session::repository;
use session::{Game, LogEntry, ReplayFailure, Session, SessionConfig, SessionError};
use state_kernel::KernelError;
use tempfile::TempDir;

fn new_session() -> Session<Market> {
    init_tracing();
    Session::new(SessionConfig::new("test"), MarketConfig::default())
        .expect("session should build")
}

#[test]
fn initial_state_cannot_be_undone() {
    let mut session = new_session();

    assert_eq!(session.game().cash(0), 300);
    assert!(!session.is_undoable());
    assert!(!session.undo());
    assert!(session.report().is_empty());
}

#[test]
fn process_undo_redo_keeps_state_and_log_aligned() {
    let mut session = new_session();
    session.process(buy(0, "PRR")).expect("buy should succeed");
    session.process(buy(1, "PRR")).expect("buy should succeed");

    assert_eq!(session.game().cash(0), 200);
    assert_eq!(session.game().cash(1), 190);
    assert_eq!(session.game().president("PRR").as_deref(), Some("alice"));

    assert!(session.undo());
    assert_eq!(session.game().cash(1), 300);
    assert_eq!(session.game().price("PRR"), Some(110));
    assert_eq!(session.action_count(), 1);
    assert!(session.is_redoable());

    assert!(session.redo());
    assert_eq!(session.game().cash(1), 190);
    assert_eq!(session.action_count(), 2);
    assert!(!session.redo());
}

#[test]
fn new_action_after_undo_discards_the_redo_tail() {
    let mut session = new_session();
    session.process(buy(0, "PRR")).unwrap();
    session.process(buy(0, "B&O")).unwrap();
    assert!(session.undo());

    session.process(sell(0, "PRR")).unwrap();

    assert!(!session.is_redoable());
    assert_eq!(
        session.entries(),
        &[LogEntry::Action(buy(0, "PRR")), LogEntry::Action(sell(0, "PRR"))]
    );
}

#[test]
fn rejected_action_is_cancelled_completely() {
    let mut session = new_session();
    session.process(buy(0, "PRR")).unwrap();
    session.process(buy(0, "PRR")).unwrap();
    let before = session.state_hash().unwrap();

    // price is now 120 and alice holds 90: shares move, then payment fails
    let err = session.process(buy(0, "PRR")).unwrap_err();

    assert!(matches!(err, SessionError::ActionRejected { step: 3, .. }));
    assert_eq!(err.error_code(), "SESSION_ACTION_REJECTED");
    assert_eq!(session.state_hash().unwrap(), before);
    assert_eq!(session.game().shares(0, "PRR"), 2);
    assert_eq!(session.action_count(), 2);
    assert_eq!(session.manager().stack().len(), 2);
    assert!(!session.manager().stack().is_open());
}

#[test]
fn report_log_records_commits_undos_and_annotations() {
    let mut session = new_session();
    session.process(Trade::Pass { player: 1 }).unwrap();
    session.undo();
    session.redo();
    session.annotate("bob is thinking");

    assert_eq!(
        session.report().lines(),
        vec![
            "player 1 passes: passes: 0 -> 1",
            "undo player 1 passes",
            "redo player 1 passes",
            "bob is thinking",
        ]
    );
}

#[test]
fn barrier_blocks_undo_but_stays_in_the_log() {
    let mut session = new_session();
    session.process(buy(0, "PRR")).unwrap();
    session.barrier();

    assert!(!session.undo());
    assert_eq!(session.game().shares(0, "PRR"), 1);

    session.process(buy(1, "B&O")).unwrap();
    assert!(session.undo());
    assert!(!session.undo());
    assert_eq!(
        session.entries(),
        &[LogEntry::Action(buy(0, "PRR")), LogEntry::Barrier]
    );
}

#[test]
fn save_and_load_reproduce_the_same_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("game.save");
    let mut session = new_session();
    for trade in [buy(0, "PRR"), buy(1, "PRR"), sell(0, "PRR"), buy(1, "B&O")] {
        session.process(trade).unwrap();
    }
    session.barrier();
    session.process(Trade::Pass { player: 0 }).unwrap();
    session.process(buy(0, "B&O")).unwrap();
    // undone actions are not persisted
    assert!(session.undo());
    session.annotate("saved mid-round");
    session.save(&path).expect("save should succeed");

    let loaded = Session::<Market>::load(&path, SessionConfig::default()).expect("load");

    assert_eq!(loaded.state_hash().unwrap(), session.state_hash().unwrap());
    assert_eq!(loaded.game().snapshot(), session.game().snapshot());
    assert_eq!(loaded.config().session_id, "test");
    assert_eq!(loaded.action_count(), 5);
    assert_eq!(loaded.annotations(), &["saved mid-round".to_string()]);
    assert!(loaded.is_undoable());
    assert!(!loaded.is_redoable());
}

#[test]
fn replay_failure_reports_the_step() {
    let mut session = new_session();
    session.process(buy(0, "PRR")).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("game.save");
    session.save(&path).unwrap();

    // a save whose second action cannot apply to the rebuilt state
    let mut save = repository::read::<MarketConfig, Trade>(&path).unwrap();
    save.entries.push(LogEntry::Action(sell(1, "PRR")));
    repository::write(&path, &save).unwrap();

    let err = Session::<Market>::load(&path, SessionConfig::default()).unwrap_err();
    match &err {
        SessionError::Replay(ReplayFailure { step, reason }) => {
            assert_eq!(*step, 2);
            assert!(reason.contains("holds no PRR"));
        }
        other => panic!("expected replay failure, got {other:?}"),
    }
    assert!(err.to_string().starts_with("replay interrupted at step 2"));
}

#[test]
fn checksum_mismatch_is_detected_unless_disabled() {
    let mut session = new_session();
    session.process(buy(0, "PRR")).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("game.save");
    session.save(&path).unwrap();

    let mut save = repository::read::<MarketConfig, Trade>(&path).unwrap();
    save.checksum = "0".repeat(64);
    repository::write(&path, &save).unwrap();

    let err = Session::<Market>::load(&path, SessionConfig::default()).unwrap_err();
    assert!(matches!(err, SessionError::ChecksumMismatch { .. }));

    let relaxed = SessionConfig {
        verify_checksum: false,
        ..SessionConfig::default()
    };
    assert!(Session::<Market>::load(&path, relaxed).is_ok());
}

#[test]
fn autosave_writes_after_every_action() {
    let dir = TempDir::new().unwrap();
    let config = SessionConfig::new("auto")
        .with_save_dir(dir.path())
        .with_autosave(true);
    let path = config.save_path().unwrap();
    let mut session = Session::<Market>::new(config, MarketConfig::default()).unwrap();

    session.process(buy(0, "PRR")).unwrap();
    let first = Session::<Market>::load(&path, SessionConfig::default()).unwrap();
    assert_eq!(first.action_count(), 1);

    session.process(buy(1, "B&O")).unwrap();
    let second = Session::<Market>::load(&path, SessionConfig::default()).unwrap();
    assert_eq!(second.state_hash().unwrap(), session.state_hash().unwrap());
}

#[test]
fn in_memory_replay_is_deterministic() {
    let mut session = new_session();
    for trade in [buy(0, "B&O"), buy(1, "B&O"), sell(1, "B&O")] {
        session.process(trade).unwrap();
    }

    let replayed = session.replay().unwrap();
    assert_eq!(replayed.state_hash().unwrap(), session.state_hash().unwrap());
}

#[test]
fn subscribers_follow_undo_and_redo() {
    let mut session = new_session();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    session
        .game()
        .cash_cell(0)
        .subscribe(Rc::new(move |text: &str| sink.borrow_mut().push(text.to_string())));

    session.process(buy(0, "PRR")).unwrap();
    session.undo();
    session.redo();

    assert_eq!(*seen.borrow(), vec!["200", "300", "200"]);
}

#[test]
fn json_summary_is_inspectable() {
    let mut session = new_session();
    session.process(buy(0, "PRR")).unwrap();

    let json: serde_json::Value = serde_json::from_str(&session.to_json().unwrap()).unwrap();

    assert_eq!(json["session_id"], "test");
    assert_eq!(json["applied_actions"], 1);
    assert_eq!(json["undoable"], true);
    assert_eq!(json["snapshot"]["cash"][0], 200);
    assert_eq!(json["state_hash"], session.state_hash().unwrap());
}

#[test]
fn unknown_company_is_rejected_without_history() {
    let mut session = new_session();
    let err = session.process(buy(0, "NYC")).unwrap_err();

    assert_eq!(err.severity(), state_kernel::ErrorSeverity::Validation);
    assert!(!session.is_undoable());
    assert_eq!(session.action_count(), 0);
}
