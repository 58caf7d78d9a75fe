//! Integration tests for admission under concurrency.

mod helpers;

use chrono::Duration;
use futures::future::join_all;

use bookhub::AdmissionError;
use bookhub::entity::user::Requester;
use bookhub::types::UserId;

use helpers::TestCore;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_admits_never_exceed_capacity() {
    let app = TestCore::memory();
    let session_id = app.session(7, Duration::days(1)).await.id;

    let tasks = (0..50).map(|_| {
        let engine = app.core.engine.clone();
        tokio::spawn(async move { engine.admit(UserId::new(), session_id).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 7);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AdmissionError::Full { .. }))
    );
    assert_eq!(app.core.engine.occupancy(session_id).await.unwrap(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_seat_two_subjects() {
    let app = TestCore::memory();
    let session = app.session(1, Duration::hours(6)).await;

    let (first, second) = tokio::join!(
        app.core.engine.admit(UserId::new(), session.id),
        app.core.engine.admit(UserId::new(), session.id),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| matches!(r, Err(AdmissionError::Full { .. })))
            .count(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_duplicate_admits_hold_one_seat() {
    let app = TestCore::memory();
    let session_id = app.session(10, Duration::days(1)).await.id;
    let subject = UserId::new();

    let tasks = (0..20).map(|_| {
        let engine = app.core.engine.clone();
        tokio::spawn(async move { engine.admit(subject, session_id).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AdmissionError::DuplicateReservation { .. }))
    );
    assert_eq!(app.core.engine.occupancy(session_id).await.unwrap(), 1);

    let mine = app
        .core
        .queries
        .my_reservations(&Requester::employee(subject))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_reregistration_after_cancel() {
    let app = TestCore::memory();
    let session = app.session(1, Duration::days(2)).await;
    let subject = UserId::new();

    let first = app.core.engine.admit(subject, session.id).await.unwrap();
    app.core
        .lifecycle
        .cancel(first.id, &Requester::employee(subject))
        .await
        .unwrap();

    let second = app.core.engine.admit(subject, session.id).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_reregistration_after_status_cancelled() {
    let app = TestCore::memory();
    let session = app.session(3, Duration::days(2)).await;
    let subject = UserId::new();

    let first = app.core.engine.admit(subject, session.id).await.unwrap();
    app.core
        .lifecycle
        .set_status(first.id, "cancelled", &app.admin)
        .await
        .unwrap();

    app.core.engine.admit(subject, session.id).await.unwrap();
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_past_and_starting_sessions_are_closed() {
    let app = TestCore::memory();
    let session = app.session(5, Duration::minutes(10)).await;

    app.clock.advance(Duration::minutes(10));
    let at_start = app.core.engine.admit(UserId::new(), session.id).await;
    assert!(matches!(at_start, Err(AdmissionError::Closed { .. })));

    app.clock.advance(Duration::days(1));
    let after = app.core.engine.admit(UserId::new(), session.id).await;
    assert!(matches!(after, Err(AdmissionError::Closed { .. })));
}

#[tokio::test]
async fn test_admission_reports_outage_as_unavailable() {
    let app = TestCore::memory();
    let session = app.session(5, Duration::days(1)).await;

    app.set_offline(true);
    let err = app
        .core
        .engine
        .admit(UserId::new(), session.id)
        .await
        .unwrap_err();
    assert!(err.is_unavailable());

    app.set_offline(false);
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_cancels_racing_admits_keep_occupancy_consistent() {
    let app = TestCore::memory();

    for _ in 0..25 {
        let session_id = app.session(3, Duration::days(1)).await.id;
        let mut held = Vec::new();
        for _ in 0..3 {
            let owner = UserId::new();
            let reservation = app.core.engine.admit(owner, session_id).await.unwrap();
            held.push((reservation.id, owner));
        }

        let cancels: Vec<_> = held
            .into_iter()
            .map(|(id, owner)| {
                let lifecycle = app.core.lifecycle.clone();
                tokio::spawn(async move { lifecycle.cancel(id, &Requester::employee(owner)).await })
            })
            .collect();
        let admits: Vec<_> = (0..10)
            .map(|_| {
                let engine = app.core.engine.clone();
                tokio::spawn(async move { engine.admit(UserId::new(), session_id).await })
            })
            .collect();

        let (cancelled, admitted) = tokio::join!(join_all(cancels), join_all(admits));
        let cancelled = cancelled.into_iter().filter(|r| r.as_ref().unwrap().is_ok()).count() as i64;
        let admitted: Vec<_> = admitted.into_iter().map(|r| r.unwrap()).collect();
        let admitted_ok = admitted.iter().filter(|r| r.is_ok()).count() as i64;

        assert_eq!(cancelled, 3);
        assert!(
            admitted
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, AdmissionError::Full { .. }))
        );

        let occupancy = app.core.engine.occupancy(session_id).await.unwrap();
        assert_eq!(occupancy, 3 - cancelled + admitted_ok);
        assert!(occupancy <= 3);
    }
}
