//! The HITL client end to end over the polling transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use calldesk::config::{Config, TransportKind};
use calldesk::hitl::dispatch::{
    MSG_ANSWERED, MSG_EMPTY_RESPONSE, MSG_LOCAL_TIMEOUT, MSG_NEW_REQUEST,
};
use calldesk::hitl::HitlClient;
use calldesk::models::hitl::{HitlStatus, TaskId};
use calldesk::notification::banner::Level;
use common::{eventually, pending_body, RecordingPresenter};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

fn poll_config(server: &MockServer) -> Config {
    Config {
        base_url: server.uri(),
        transport: TransportKind::Poll,
        poll_interval_ms: 100,
        http_timeout_secs: 2,
        ..Config::default()
    }
}

async fn mount_pending(server: &MockServer, timeout_seconds: u64) {
    Mock::given(method("GET"))
        .and(path("/api/pending_hitl_requests"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(pending_body(7, "Is Tuesday at 3pm fine?", timeout_seconds)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_repeated_polls_show_one_prompt_and_answer_sticks() {
    let server = MockServer::start().await;
    mount_pending(&server, 30).await;
    Mock::given(method("POST"))
        .and(path("/api/hitl_response"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let presenter = Arc::new(RecordingPresenter::default());
    let mut client = HitlClient::from_config(&poll_config(&server), presenter.clone()).unwrap();
    let handle = client.start();

    assert!(eventually(WAIT, || handle.pending().len() == 1).await);
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(presenter.shown_prompts(), 1);
    assert_eq!(handle.modal(), Some(TaskId::Num(7)));
    assert_eq!(
        presenter
            .banner_messages()
            .iter()
            .filter(|m| m.as_str() == MSG_NEW_REQUEST)
            .count(),
        1
    );

    handle.answer_modal("yes").await.unwrap();
    assert!(eventually(WAIT, || presenter.removals(HitlStatus::Answered) == 1).await);
    assert!(presenter.banner_messages().iter().any(|m| m == MSG_ANSWERED));

    // The backend keeps listing the task for a while; it must stay answered.
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(presenter.shown_prompts(), 1);
    assert!(handle.pending().is_empty());

    client.stop().await;
}

#[tokio::test]
async fn test_urgent_banner_is_removed_with_its_request() {
    let server = MockServer::start().await;
    mount_pending(&server, 30).await;
    Mock::given(method("POST"))
        .and(path("/api/hitl_response"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .mount(&server)
        .await;

    let cfg = Config {
        banner_ttl_secs: 1,
        ..poll_config(&server)
    };
    let presenter = Arc::new(RecordingPresenter::default());
    let mut client = HitlClient::from_config(&cfg, presenter.clone()).unwrap();
    let handle = client.start();

    assert!(eventually(WAIT, || handle.pending().len() == 1).await);
    let urgent: Vec<_> = presenter
        .banners_on_board()
        .into_iter()
        .filter(|b| b.level == Level::Urgent)
        .collect();
    assert_eq!(urgent.len(), 1);
    assert_eq!(urgent[0].about, Some(TaskId::Num(7)));

    handle.answer_modal("yes").await.unwrap();
    assert!(eventually(WAIT, || presenter.removals(HitlStatus::Answered) == 1).await);
    assert!(
        eventually(WAIT, || presenter
            .banners_on_board()
            .iter()
            .all(|b| b.level != Level::Urgent))
        .await
    );

    // Ordinary banners still leave on their own.
    assert!(eventually(WAIT, || presenter.banners_on_board().is_empty()).await);

    client.stop().await;
}

#[tokio::test]
async fn test_operator_closes_banner_by_id() {
    let server = MockServer::start().await;
    mount_pending(&server, 30).await;

    let presenter = Arc::new(RecordingPresenter::default());
    let mut client = HitlClient::from_config(&poll_config(&server), presenter.clone()).unwrap();
    let handle = client.start();

    assert!(eventually(WAIT, || handle.pending().len() == 1).await);
    let id = presenter
        .banners_on_board()
        .iter()
        .find(|b| b.level == Level::Urgent)
        .map(|b| b.id)
        .unwrap();

    handle.close_banner(id).await.unwrap();
    handle.close_banner(9_999).await.unwrap();
    assert!(
        eventually(WAIT, || presenter
            .banners_on_board()
            .iter()
            .all(|b| b.id != id))
        .await
    );
    // Closing the banner does not touch the request.
    assert_eq!(handle.pending().len(), 1);

    client.stop().await;
}

#[tokio::test]
async fn test_blank_answer_never_reaches_backend() {
    let server = MockServer::start().await;
    mount_pending(&server, 30).await;
    Mock::given(method("POST"))
        .and(path("/api/hitl_response"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let presenter = Arc::new(RecordingPresenter::default());
    let mut client = HitlClient::from_config(&poll_config(&server), presenter.clone()).unwrap();
    let handle = client.start();
    assert!(eventually(WAIT, || handle.pending().len() == 1).await);

    handle.submit(TaskId::Num(7), "   ").await.unwrap();
    assert!(
        eventually(WAIT, || presenter
            .banner_messages()
            .iter()
            .any(|m| m == MSG_EMPTY_RESPONSE))
        .await
    );
    assert_eq!(handle.pending().len(), 1);

    client.stop().await;
}

#[tokio::test]
async fn test_rejected_answer_leaves_request_pending() {
    let server = MockServer::start().await;
    mount_pending(&server, 30).await;
    Mock::given(method("POST"))
        .and(path("/api/hitl_response"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "message": "Task not awaiting input"
        })))
        .mount(&server)
        .await;

    let presenter = Arc::new(RecordingPresenter::default());
    let mut client = HitlClient::from_config(&poll_config(&server), presenter.clone()).unwrap();
    let handle = client.start();
    assert!(eventually(WAIT, || handle.pending().len() == 1).await);

    handle.submit(TaskId::Num(7), "yes").await.unwrap();
    assert!(
        eventually(WAIT, || presenter
            .banner_messages()
            .iter()
            .any(|m| m == "Error: Task not awaiting input"))
        .await
    );
    assert_eq!(handle.pending().len(), 1);
    assert_eq!(presenter.removals(HitlStatus::Answered), 0);

    client.stop().await;
}

#[tokio::test]
async fn test_poll_errors_do_not_stop_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/pending_hitl_requests"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_pending(&server, 30).await;

    let presenter = Arc::new(RecordingPresenter::default());
    let mut client = HitlClient::from_config(&poll_config(&server), presenter.clone()).unwrap();
    let handle = client.start();

    assert!(eventually(WAIT, || handle.pending().len() == 1).await);
    client.stop().await;
}

#[tokio::test]
async fn test_local_expiry_notifies_once_when_polling() {
    let server = MockServer::start().await;
    mount_pending(&server, 1).await;

    let presenter = Arc::new(RecordingPresenter::default());
    let mut client = HitlClient::from_config(&poll_config(&server), presenter.clone()).unwrap();
    let handle = client.start();

    assert!(eventually(WAIT, || presenter.removals(HitlStatus::TimedOut) == 1).await);
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(handle.pending().is_empty());
    assert_eq!(presenter.shown_prompts(), 1);
    assert_eq!(
        presenter
            .banner_messages()
            .iter()
            .filter(|m| m.as_str() == MSG_LOCAL_TIMEOUT)
            .count(),
        1
    );

    client.stop().await;
}

#[tokio::test]
async fn test_stop_hides_surface_and_start_is_idempotent() {
    let server = MockServer::start().await;
    mount_pending(&server, 30).await;

    let presenter = Arc::new(RecordingPresenter::default());
    let mut client = HitlClient::from_config(&poll_config(&server), presenter.clone()).unwrap();
    let handle = client.start();
    let again = client.start();
    assert!(eventually(WAIT, || handle.pending().len() == 1).await);
    assert_eq!(again.modal(), Some(TaskId::Num(7)));

    client.stop().await;
    assert!(!client.is_running());
    assert!(handle.pending().is_empty());
    assert!(handle.submit(TaskId::Num(7), "late").await.is_err());
}
