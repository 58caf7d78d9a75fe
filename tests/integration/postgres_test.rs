//! Integration tests against PostgreSQL.
//!
//! Run only when `BOOKHUB_TEST_DATABASE_URL` points at a disposable database.
//! Every test works on freshly created sessions and users, so the suite
//! tolerates parallel runs on a shared database.

mod helpers;

use chrono::Duration;
use futures::future::join_all;

use bookhub::entity::user::Requester;
use bookhub::types::UserId;
use bookhub::{AdmissionError, LifecycleError};

use helpers::TestCore;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_pg_concurrent_admits_never_exceed_capacity() {
    let Some(app) = TestCore::postgres().await else {
        return;
    };
    let session_id = app.session(5, Duration::days(1)).await.id;

    let tasks = (0..30).map(|_| {
        let engine = app.core.engine.clone();
        tokio::spawn(async move { engine.admit(UserId::new(), session_id).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AdmissionError::Full { .. }))
    );
    assert_eq!(app.core.engine.occupancy(session_id).await.unwrap(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_pg_concurrent_duplicates_hold_one_seat() {
    let Some(app) = TestCore::postgres().await else {
        return;
    };
    let session_id = app.session(10, Duration::days(1)).await.id;
    let subject = UserId::new();

    let tasks = (0..10).map(|_| {
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
}

#[tokio::test]
async fn test_pg_lifecycle_round_trip() {
    let Some(app) = TestCore::postgres().await else {
        return;
    };
    let session = app.session(1, Duration::days(2)).await;
    let owner = UserId::new();

    let first = app.core.engine.admit(owner, session.id).await.unwrap();
    app.core
        .lifecycle
        .set_status(first.id, "cancelled", &app.admin)
        .await
        .unwrap();

    let second = app.core.engine.admit(owner, session.id).await.unwrap();
    let err = app
        .core
        .lifecycle
        .set_status(first.id, "confirmed", &app.admin)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::DuplicateReservation { .. } | LifecycleError::Full { .. }
    ));

    app.core
        .lifecycle
        .cancel(second.id, &Requester::employee(owner))
        .await
        .unwrap();
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), 0);

    let mine = app
        .core
        .queries
        .my_reservations(&Requester::employee(owner))
        .await
        .unwrap();
    assert!(mine.is_empty());
}

#[tokio::test]
async fn test_pg_session_directory() {
    let Some(app) = TestCore::postgres().await else {
        return;
    };
    let session = app.session(3, Duration::days(4)).await;
    let subject = UserId::new();
    app.core.engine.admit(subject, session.id).await.unwrap();

    let summary = app.core.directory.availability(session.id).await.unwrap();
    assert_eq!(summary.label(), "1/3");
    assert!(
        app.core
            .directory
            .list_sessions()
            .await
            .unwrap()
            .iter()
            .any(|s| s.session.id == session.id)
    );

    app.core
        .directory
        .delete_session(&app.admin, session.id)
        .await
        .unwrap();
    let mine = app
        .core
        .queries
        .my_reservations(&Requester::employee(subject))
        .await
        .unwrap();
    assert!(mine.is_empty());

    let err = app.core.engine.admit(subject, session.id).await.unwrap_err();
    assert!(matches!(err, AdmissionError::NotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_pg_cancels_racing_admits_keep_occupancy_consistent() {
    let Some(app) = TestCore::postgres().await else {
        return;
    };

    for _ in 0..5 {
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
        let admitted_ok = admitted
            .into_iter()
            .filter(|r| r.as_ref().unwrap().is_ok())
            .count() as i64;

        assert_eq!(cancelled, 3);
        let occupancy = app.core.engine.occupancy(session_id).await.unwrap();
        assert_eq!(occupancy, 3 - cancelled + admitted_ok);
        assert!(occupancy <= 3);
    }
}

#[tokio::test]
async fn test_pg_lock_wait_is_bounded() {
    let Some(app) = TestCore::postgres_with_lock_timeout(200).await else {
        return;
    };
    let session_id = app.session(2, Duration::days(1)).await.id;
    let db = app.db.as_ref().unwrap();

    let mut holder = db.pool().begin().await.unwrap();
    sqlx::query("SELECT id FROM training_sessions WHERE id = $1 FOR UPDATE")
        .bind(session_id)
        .execute(&mut *holder)
        .await
        .unwrap();

    let err = app
        .core
        .engine
        .admit(UserId::new(), session_id)
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
    assert_eq!(err.kind(), bookhub::error::ErrorKind::ServiceUnavailable);

    holder.rollback().await.unwrap();
    app.core.engine.admit(UserId::new(), session_id).await.unwrap();
}

#[tokio::test]
async fn test_pg_sessions_with_equal_start_list_by_id() {
    let Some(app) = TestCore::postgres().await else {
        return;
    };
    let a = app.session(2, Duration::days(6)).await.id;
    let b = app.session(2, Duration::days(6)).await.id;

    let listed: Vec<_> = app
        .core
        .directory
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.session.id)
        .filter(|id| *id == a || *id == b)
        .collect();

    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn test_pg_health_check_goes_through_pool() {
    let Some(app) = TestCore::postgres().await else {
        return;
    };
    assert!(app.core.health_check().await.unwrap());
    assert!(app.db.as_ref().unwrap().health_check().await.unwrap());
}
