//! End-to-end exercise of the session lifecycle and the correction-review
//! workflow against a mock backend, with real file-backed persistence.

use std::sync::Arc;

use chrono::{Duration, Utc};
use factkit_store::{CredentialStore, FileStore};
use factkit_core::{Client, Config, CorrectionStatus, Role};
use serde_json::json;
use uuid::Uuid;

fn auth_body(role: &str) -> serde_json::Value {
    json!({
        "user": {
            "id": Uuid::new_v4(),
            "email": "admin@example.com",
            "role": role,
            "is_active": true
        },
        "access_token": "access-1",
        "refresh_token": "refresh-1"
    })
}

fn correction_body(id: Uuid, status: &str, sla_offset_hours: i64) -> serde_json::Value {
    let now = Utc::now();
    json!({
        "id": id,
        "fact_check_id": Uuid::new_v4(),
        "correction_type": "substantial",
        "request_details": "the cited study was retracted",
        "status": status,
        "sla_deadline": now + Duration::hours(sla_offset_hours),
        "created_at": now - Duration::days(2),
        "updated_at": now
    })
}

#[tokio::test]
async fn admin_reviews_a_correction_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let overdue_id = Uuid::new_v4();
    let fresh_id = Uuid::new_v4();

    server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(auth_body("ADMIN").to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/admin/corrections/pending")
        .match_header("authorization", "Bearer access-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "corrections": [
                    correction_body(overdue_id, "pending", -6),
                    correction_body(fresh_id, "pending", 24),
                ],
                // Deliberately wrong server-side counts: the client must
                // derive its own from the list.
                "total_count": 99,
                "overdue_count": 99
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("POST", format!("/admin/corrections/{overdue_id}/accept").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(correction_body(overdue_id, "accepted", -6).to_string())
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", format!("/admin/corrections/{overdue_id}/apply").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(correction_body(overdue_id, "applied", -6).to_string())
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let client = Client::new(
        Config::with_base_url(&server.url()),
        Arc::clone(&store) as Arc<dyn CredentialStore>,
    );
    client.session().bootstrap().unwrap();

    client.login("admin@example.com", "password123").await.unwrap();
    assert!(client.session().is_admin());

    // The queue classifies the overdue item and ignores the bogus counts.
    let queue = client.list_pending_corrections().await.unwrap();
    assert_eq!(queue.total_count(), 2);
    assert_eq!(queue.overdue_count(), 1);
    let overdue = queue
        .corrections()
        .iter()
        .find(|c| c.id == overdue_id)
        .unwrap();
    assert!(overdue.is_overdue(Utc::now()));

    // Each transition applies the server's record, never a local flip.
    let accepted = client.accept_correction(overdue).await.unwrap();
    assert_eq!(accepted.status, CorrectionStatus::Accepted);
    let applied = client.apply_correction(&accepted).await.unwrap();
    assert_eq!(applied.status, CorrectionStatus::Applied);
    // A reviewed record can no longer be overdue.
    assert!(!applied.is_overdue(Utc::now()));

    // Applying again is forbidden by the state machine, before any request.
    assert!(client.apply_correction(&applied).await.is_err());
}

#[tokio::test]
async fn persisted_session_survives_a_new_process() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(auth_body("REVIEWER").to_string())
        .create_async()
        .await;

    {
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let client = Client::new(
            Config::with_base_url(&server.url()),
            store as Arc<dyn CredentialStore>,
        );
        client.session().bootstrap().unwrap();
        client.login("reviewer@example.com", "password123").await.unwrap();
    }

    // A fresh client over the same directory picks the session back up.
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let client = Client::new(
        Config::with_base_url(&server.url()),
        store as Arc<dyn CredentialStore>,
    );
    client.session().bootstrap().unwrap();
    assert!(client.session().is_authenticated());
    assert_eq!(
        client.session().current_user().unwrap().role,
        Role::Reviewer
    );
    assert!(!client.session().is_admin());

    // Logout in this "process" removes the durable keys for all of them.
    client.logout().await.unwrap();
    let reopened = FileStore::open(dir.path()).unwrap();
    assert!(!reopened.load().unwrap().is_complete());
}
