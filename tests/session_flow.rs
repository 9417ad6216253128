mod support;

use chrono::{Duration, Utc};

use onshift::models::{AttendanceSession, BreakEntry, BreakType};
use onshift::session::SessionPhase;
use onshift::store::AttendanceStore;
use onshift::{ClockOutOutcome, SessionError};

use support::harness;

/// Seeds the store with an already-running session so tests can control
/// how long ago the user clocked in, then resumes it into the controller.
async fn seed_and_resume(
    h: &support::Harness,
    user_id: &str,
    minutes_ago: i64,
) -> AttendanceSession {
    let clock_in = Utc::now() - Duration::minutes(minutes_ago);
    let session = AttendanceSession::begin(user_id, clock_in);
    h.store.insert_session(&session).await.unwrap();
    h.controller
        .resume(user_id, false)
        .await
        .unwrap()
        .expect("seeded session should resume");
    session
}

#[tokio::test]
async fn clock_in_rejects_a_second_session() {
    let h = harness();
    let snapshot = h.controller.clock_in("user-1", false).await.unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Working);
    assert_eq!(h.store.active_session_count("user-1"), 1);

    assert!(matches!(
        h.controller.clock_in("user-1", false).await,
        Err(SessionError::DuplicateSession)
    ));
    assert_eq!(h.store.active_session_count("user-1"), 1);
}

#[tokio::test]
async fn clock_in_pre_checks_the_store_for_other_devices() {
    let h = harness();

    // same user, already active from "another device"
    let other = AttendanceSession::begin("user-1", Utc::now());
    h.store.insert_session(&other).await.unwrap();

    assert!(matches!(
        h.controller.clock_in("user-1", false).await,
        Err(SessionError::DuplicateSession)
    ));
}

#[tokio::test]
async fn clock_out_preconditions_apply_in_order() {
    let h = harness();
    let snapshot = h.controller.clock_in("user-1", false).await.unwrap();
    let session_id = snapshot.session.unwrap().id;

    h.controller.start_break(BreakType::Coffee).await.unwrap();
    assert!(matches!(
        h.controller.clock_out(false).await,
        Err(SessionError::OnBreak)
    ));

    h.controller.end_break().await.unwrap();
    assert!(matches!(
        h.controller.clock_out(false).await,
        Err(SessionError::MissingEodReport)
    ));

    // with the report on file the early gate takes over
    h.eod.submit(&session_id);
    match h.controller.clock_out(false).await.unwrap() {
        ClockOutOutcome::ConfirmationRequired(report) => {
            assert_eq!(report.required_minutes, 480);
            assert!(report.shortfall_minutes > 0);
        }
        ClockOutOutcome::Completed(_) => panic!("fresh session must not clear the gate"),
    }
    // nothing was mutated by the deferred attempt
    assert_eq!(h.store.active_session_count("user-1"), 1);
}

#[tokio::test]
async fn early_clock_out_completes_only_after_confirmation() {
    let h = harness();
    let seeded = seed_and_resume(&h, "user-1", 30).await;
    h.eod.submit(&seeded.id);

    match h.controller.clock_out(false).await.unwrap() {
        ClockOutOutcome::ConfirmationRequired(report) => {
            assert_eq!(report.elapsed_minutes, 30);
            assert_eq!(report.required_minutes, 480);
            assert_eq!(report.shortfall_minutes, 450);
        }
        ClockOutOutcome::Completed(_) => panic!("expected confirmation step"),
    }

    match h.controller.clock_out(true).await.unwrap() {
        ClockOutOutcome::Completed(session) => {
            let total = session.total_hours.unwrap();
            assert!((total - 0.5).abs() < 0.011, "total_hours was {total}");
        }
        ClockOutOutcome::ConfirmationRequired(_) => panic!("confirmation should complete"),
    }

    assert_eq!(h.store.active_session_count("user-1"), 0);
    let stored = h.store.session(&seeded.id).unwrap();
    assert!(!stored.is_active());
    assert!(stored.clock_out.is_some());
}

#[tokio::test]
async fn full_shift_clears_the_gate_without_confirmation() {
    let h = harness();
    let seeded = seed_and_resume(&h, "user-1", 541).await;
    h.eod.submit(&seeded.id);

    match h.controller.clock_out(false).await.unwrap() {
        ClockOutOutcome::Completed(session) => {
            let total = session.total_hours.unwrap();
            assert!((total - 9.02).abs() < 0.011, "total_hours was {total}");
        }
        ClockOutOutcome::ConfirmationRequired(_) => panic!("9h elapsed must clear the gate"),
    }
}

#[tokio::test]
async fn lunch_overrun_extends_the_required_shift() {
    // 485 minutes elapsed, but a 75-minute lunch pushes the requirement to
    // 495 minutes.
    let h = harness();
    let seeded = seed_and_resume(&h, "user-1", 485).await;

    let mut lunch = BreakEntry::begin(&seeded.id, BreakType::Lunch, seeded.clock_in + Duration::minutes(180));
    lunch.close(seeded.clock_in + Duration::minutes(255));
    h.store.insert_break(&lunch).await.unwrap();
    // re-resume so the controller picks the seeded break up
    h.controller.resume("user-1", false).await.unwrap().unwrap();
    h.eod.submit(&seeded.id);

    match h.controller.clock_out(false).await.unwrap() {
        ClockOutOutcome::ConfirmationRequired(report) => {
            assert_eq!(report.required_minutes, 495);
            assert_eq!(report.excess.lunch_excess_minutes, 15);
            assert_eq!(report.excess.other_excess_minutes, 0);
        }
        ClockOutOutcome::Completed(_) => panic!("excess must defer the clock-out"),
    }
}

#[tokio::test]
async fn non_lunch_breaks_share_one_allowance() {
    // bathroom 5 min + personal 12 min = 17 min, 2 over the shared bucket
    let h = harness();
    let seeded = seed_and_resume(&h, "user-1", 481).await;

    let mut bathroom =
        BreakEntry::begin(&seeded.id, BreakType::Bathroom, seeded.clock_in + Duration::minutes(60));
    bathroom.close(seeded.clock_in + Duration::minutes(65));
    h.store.insert_break(&bathroom).await.unwrap();

    let mut personal =
        BreakEntry::begin(&seeded.id, BreakType::Personal, seeded.clock_in + Duration::minutes(120));
    personal.close(seeded.clock_in + Duration::minutes(132));
    h.store.insert_break(&personal).await.unwrap();

    h.controller.resume("user-1", false).await.unwrap().unwrap();
    h.eod.submit(&seeded.id);

    let report = match h.controller.clock_out(false).await.unwrap() {
        ClockOutOutcome::ConfirmationRequired(report) => report,
        ClockOutOutcome::Completed(_) => panic!("2 excess minutes must defer the clock-out"),
    };
    assert_eq!(report.excess.other_minutes, 17);
    assert_eq!(report.excess.other_excess_minutes, 2);
    assert_eq!(report.required_minutes, 482);

    // confirm, then check the recorded hours against an independent
    // recomputation from the same break entries
    let completed = match h.controller.clock_out(true).await.unwrap() {
        ClockOutOutcome::Completed(session) => session,
        ClockOutOutcome::ConfirmationRequired(_) => panic!("confirmation should complete"),
    };

    let entries = h.store.breaks_for_session(&seeded.id).await.unwrap();
    let break_minutes: i64 = entries.iter().map(|e| e.duration_minutes.unwrap()).sum();
    let elapsed = completed.clock_out.unwrap() - completed.clock_in;
    let expected_hours = (elapsed.num_minutes() - break_minutes) as f64 / 60.0;
    let recorded = completed.total_hours.unwrap();
    assert!(
        (recorded - expected_hours).abs() < 0.011,
        "recorded {recorded}, recomputed {expected_hours}"
    );
}

#[tokio::test]
async fn at_most_one_open_break_per_session() {
    let h = harness();
    let snapshot = h.controller.clock_in("user-1", false).await.unwrap();
    let session_id = snapshot.session.unwrap().id;

    h.controller.start_break(BreakType::Bathroom).await.unwrap();
    assert!(matches!(
        h.controller.start_break(BreakType::Coffee).await,
        Err(SessionError::BreakAlreadyOpen)
    ));

    let open = h.store.open_break_for_session(&session_id).await.unwrap();
    assert_eq!(open.unwrap().break_type, BreakType::Bathroom);

    h.controller.end_break().await.unwrap();
    assert!(matches!(
        h.controller.end_break().await,
        Err(SessionError::NoOpenBreak)
    ));
    assert!(h
        .store
        .open_break_for_session(&session_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn a_new_session_can_start_after_clock_out() {
    let h = harness();
    let seeded = seed_and_resume(&h, "user-1", 500).await;
    h.eod.submit(&seeded.id);
    assert!(matches!(
        h.controller.clock_out(false).await.unwrap(),
        ClockOutOutcome::Completed(_)
    ));

    // ledger starts empty for the fresh session
    let snapshot = h.controller.clock_in("user-1", false).await.unwrap();
    assert_eq!(h.store.active_session_count("user-1"), 1);
    let breaks = h
        .store
        .breaks_for_session(&snapshot.session.unwrap().id)
        .await
        .unwrap();
    assert!(breaks.is_empty());
}
