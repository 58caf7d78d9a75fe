//! Integration tests for cancellation, status changes and occupancy accounting.

mod helpers;

use chrono::Duration;

use bookhub::AdmissionError;

use bookhub::LifecycleError;
use bookhub::entity::reservation::ReservationStatus;
use bookhub::entity::user::Requester;
use bookhub::types::UserId;
use bookhub_admission::ReservationStore;

use helpers::TestCore;

#[tokio::test]
async fn test_only_owner_or_admin_may_cancel() {
    let app = TestCore::memory();
    let session = app.session(4, Duration::days(1)).await;
    let owner = UserId::new();
    let reservation = app.core.engine.admit(owner, session.id).await.unwrap();

    let err = app
        .core
        .lifecycle
        .cancel(reservation.id, &Requester::employee(UserId::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Forbidden { .. }));
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), 1);

    app.core
        .lifecycle
        .cancel(reservation.id, &app.admin)
        .await
        .unwrap();
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), 0);

    let err = app
        .core
        .lifecycle
        .cancel(reservation.id, &app.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound { .. }));
}

#[tokio::test]
async fn test_cancel_closes_at_session_start() {
    let app = TestCore::memory();
    let session = app.session(4, Duration::hours(1)).await;
    let owner = UserId::new();
    let reservation = app.core.engine.admit(owner, session.id).await.unwrap();

    app.clock.advance(Duration::hours(1));
    let err = app
        .core
        .lifecycle
        .cancel(reservation.id, &Requester::employee(owner))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::SessionStarted { .. }));

    let err = app
        .core
        .lifecycle
        .cancel(reservation.id, &app.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::SessionStarted { .. }));
}

#[tokio::test]
async fn test_set_status_rules() {
    let app = TestCore::memory();
    let session = app.session(1, Duration::days(3)).await;
    let owner = UserId::new();
    let reservation = app.core.engine.admit(owner, session.id).await.unwrap();

    let err = app
        .core
        .lifecycle
        .set_status(reservation.id, "cancelled", &Requester::employee(owner))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Forbidden { .. }));

    let err = app
        .core
        .lifecycle
        .set_status(reservation.id, "waitlisted", &app.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidStatus { .. }));

    let err = app
        .core
        .lifecycle
        .set_status(bookhub::types::ReservationId::new(), "pending", &app.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound { .. }));

    app.core
        .lifecycle
        .set_status(reservation.id, "pending", &app.admin)
        .await
        .unwrap();
    let stored = app
        .core
        .store()
        .find_reservation(reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ReservationStatus::Pending);
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_reactivation_respects_capacity() {
    let app = TestCore::memory();
    let session = app.session(1, Duration::days(3)).await;
    let dropped = app.core.engine.admit(UserId::new(), session.id).await.unwrap();

    app.core
        .lifecycle
        .set_status(dropped.id, "cancelled", &app.admin)
        .await
        .unwrap();
    app.core.engine.admit(UserId::new(), session.id).await.unwrap();

    let err = app
        .core
        .lifecycle
        .set_status(dropped.id, "confirmed", &app.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Full { .. }));
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_occupancy_tracks_every_mutation() {
    let app = TestCore::memory();
    let session = app.session(10, Duration::days(3)).await;
    let users: Vec<UserId> = (0..6).map(|_| UserId::new()).collect();

    let mut reservations = Vec::new();
    for user in &users {
        reservations.push(app.core.engine.admit(*user, session.id).await.unwrap());
    }
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), 6);

    app.core
        .lifecycle
        .cancel(reservations[0].id, &Requester::employee(users[0]))
        .await
        .unwrap();
    app.core
        .lifecycle
        .set_status(reservations[1].id, "cancelled", &app.admin)
        .await
        .unwrap();
    app.core
        .lifecycle
        .set_status(reservations[2].id, "pending", &app.admin)
        .await
        .unwrap();
    app.core
        .lifecycle
        .set_status(reservations[1].id, "confirmed", &app.admin)
        .await
        .unwrap();
    app.core
        .lifecycle
        .set_status(reservations[3].id, "cancelled", &app.admin)
        .await
        .unwrap();

    let expected = app
        .core
        .queries
        .upcoming_reservations(&app.admin)
        .await
        .unwrap()
        .into_iter()
        .filter(|d| d.reservation.is_active())
        .count() as i64;
    assert_eq!(expected, 4);
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), expected);

    let summary = app.core.directory.availability(session.id).await.unwrap();
    assert_eq!(summary.label(), "4/10");
}

#[tokio::test]
async fn test_lifecycle_reports_outage_as_unavailable() {
    let app = TestCore::memory();
    let session = app.session(2, Duration::days(1)).await;
    let reservation = app.core.engine.admit(UserId::new(), session.id).await.unwrap();

    app.set_offline(true);
    let err = app
        .core
        .lifecycle
        .set_status(reservation.id, "cancelled", &app.admin)
        .await
        .unwrap_err();
    assert!(err.is_unavailable());

    app.set_offline(false);
    assert_eq!(app.core.engine.occupancy(session.id).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reactivation_races_admit_for_last_seat() {
    let app = TestCore::memory();

    for _ in 0..25 {
        let session_id = app.session(1, Duration::days(1)).await.id;
        let dropped = app.core.engine.admit(UserId::new(), session_id).await.unwrap();
        app.core
            .lifecycle
            .set_status(dropped.id, "cancelled", &app.admin)
            .await
            .unwrap();

        let reactivate = tokio::spawn({
            let lifecycle = app.core.lifecycle.clone();
            let admin = app.admin;
            async move { lifecycle.set_status(dropped.id, "confirmed", &admin).await }
        });
        let admit = tokio::spawn({
            let engine = app.core.engine.clone();
            async move { engine.admit(UserId::new(), session_id).await }
        });

        let reactivated = reactivate.await.unwrap();
        let admitted = admit.await.unwrap();

        match (&reactivated, &admitted) {
            (Ok(()), Err(AdmissionError::Full { .. })) => {}
            (Err(LifecycleError::Full { .. }), Ok(_)) => {}
            other => panic!("expected exactly one winner, got {other:?}"),
        }
        assert_eq!(app.core.engine.occupancy(session_id).await.unwrap(), 1);
    }
}
