//! End-to-end tests for the typed client against a live listener.

use std::{net::SocketAddr, sync::Arc};

use nexus_crm::{
    app::build_app,
    auth::dto::ProfileRequest,
    client::{
        Board, ClientError, CrmClient, FileSessionStore, MoveOutcome, Session, SessionManager,
    },
    models::{
        Deal, DealStage, Invoice, InvoicePatch, InvoiceStatus, NewDeal, NewInvoice, PublicUser,
        Task, TaskStage,
    },
    seed::{seed, DEMO_EMAIL, DEMO_PASSWORD},
    AppState,
};
use reqwest::StatusCode;

async fn spawn_server() -> SocketAddr {
    let state = AppState::fake();
    seed(state.store.as_ref()).await.unwrap();
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn client() -> CrmClient {
    let addr = spawn_server().await;
    CrmClient::new(format!("http://{addr}"), Arc::new(SessionManager::in_memory())).unwrap()
}

#[tokio::test]
async fn login_starts_a_session_used_by_later_requests() {
    let client = client().await;
    let err = client.list::<Deal>().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized { .. }));
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

    let session = client.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();
    assert_eq!(session.user.role, "Admin");
    assert_eq!(client.sessions().current(), Some(session));

    let deals = client.list::<Deal>().await.unwrap();
    assert_eq!(deals.len(), 4);

    let invoices = client.list::<Invoice>().await.unwrap();
    assert_eq!(invoices[0].id, "INV-001");
}

#[tokio::test]
async fn rejected_token_clears_the_session() {
    let client = client().await;
    client
        .sessions()
        .begin(Session {
            token: "forged".into(),
            user: PublicUser {
                name: "John Doe".into(),
                email: DEMO_EMAIL.into(),
                role: "Admin".into(),
            },
        })
        .unwrap();

    let err = client.dashboard_stats().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert!(!client.sessions().is_logged_in());
}

#[tokio::test]
async fn failed_login_is_unauthorized() {
    let client = client().await;
    match client.login(DEMO_EMAIL, "wrong").await {
        Err(ClientError::Unauthorized { message, .. }) => {
            assert_eq!(message, "Invalid credentials")
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!client.sessions().is_logged_in());
}

#[tokio::test]
async fn crud_round_through_the_client() {
    let client = client().await;
    client.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();

    let created = client
        .create::<Deal>(&NewDeal {
            title: "Support Plan".into(),
            company: "Hooli".into(),
            value: 900.0,
            stage: DealStage::Negotiation,
        })
        .await
        .unwrap();
    assert_eq!(created.stage, DealStage::Negotiation);

    client.delete::<Deal>(&created.id).await.unwrap();
    let err = client.delete::<Deal>(&created.id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert!(client.sessions().is_logged_in());

    let recent = client.recent_deals().await.unwrap();
    assert_eq!(recent.len(), 4);
}

#[tokio::test]
async fn invoice_ids_with_reserved_characters_survive_the_path() {
    let client = client().await;
    client.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();

    for id in ["Q1/2024", "INV 7?x", "INV#9"] {
        let created = client
            .create::<Invoice>(&NewInvoice {
                id: Some(id.into()),
                client: "Initech".into(),
                amount: 75.0,
                date: Some("2024-03-31".into()),
                status: InvoiceStatus::Pending,
            })
            .await
            .unwrap();
        assert_eq!(created.id, id);

        let patch = InvoicePatch {
            status: Some(InvoiceStatus::Paid),
            ..Default::default()
        };
        let updated = client.update::<Invoice>(&created.id, &patch).await.unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.status, InvoiceStatus::Paid);

        client.delete::<Invoice>(&created.id).await.unwrap();
    }

    let ids: Vec<String> = client
        .list::<Invoice>()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, ["INV-001", "INV-002", "INV-003"]);
}

#[tokio::test]
async fn board_moves_are_confirmed_by_the_server() {
    let client = client().await;
    client.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();

    let mut board = Board::<Task>::load(&client).await.unwrap();
    assert_eq!(board.column(TaskStage::Done).len(), 1);

    let outcome = board.move_card(&client, 1, TaskStage::Done).await.unwrap();
    assert!(matches!(outcome, MoveOutcome::Confirmed));

    let fresh = client.list::<Task>().await.unwrap();
    assert_eq!(board.cards(), fresh.as_slice());
    assert_eq!(board.column(TaskStage::Done).len(), 2);
}

#[tokio::test]
async fn board_move_after_logout_is_reverted() {
    let client = client().await;
    client.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();
    let mut board = Board::<Deal>::load(&client).await.unwrap();

    client.logout().unwrap();
    let outcome = board.move_card(&client, 1, DealStage::Won).await.unwrap();
    match outcome {
        MoveOutcome::Reverted { error } => assert!(error.is_unauthorized()),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(board.card(1).unwrap().stage, DealStage::Discussion);
}

#[tokio::test]
async fn session_file_is_kept_in_step_with_the_profile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let addr = spawn_server().await;

    let sessions = Arc::new(SessionManager::new(Box::new(FileSessionStore::new(&path))));
    let client = CrmClient::new(format!("http://{addr}"), sessions).unwrap();
    client.login(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();

    let user = client
        .update_profile(&ProfileRequest {
            name: Some("Jonathan Doe".into()),
            email: None,
        })
        .await
        .unwrap();
    assert_eq!(user.name, "Jonathan Doe");

    let restored = SessionManager::new(Box::new(FileSessionStore::new(&path)));
    let session = restored.restore().unwrap().unwrap();
    assert_eq!(session.user.name, "Jonathan Doe");
}
