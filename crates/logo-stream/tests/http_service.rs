//! HTTP-level tests for the generation and saved-logo clients.
//!
//! These tests use wiremock to stand in for the generation service
//! (`/api/generate`, `/api/stream-logos/{id}`, `/api/abort-generation/{id}`)
//! and the saved-logo service (`/api/saving/...`).

use logo_stream::{
    ClientConfig, CompletionSignal, DEFAULT_EXPECTED_TOTAL, Gallery, HttpLogoService, LogoClient,
    LogoService, LogoStreamError, RemoteError, SavedLogo, SavedLogoClient, SavedLogoConfig,
    StreamEvent, StreamOptions, TaskId, TaskState,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse(frames: &[&str]) -> String {
    frames.iter().map(|frame| format!("{frame}\n\n")).collect()
}

fn logo_frame(index: u32) -> String {
    format!(
        r#"data: {{"status":"success","logo":"/images/acme_{index}.png","index":{index}}}"#
    )
}

async fn mount_generate(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(json!({"uInput": "Acme"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "logo": "/images/acme_0.png",
            "task_id": "abc"
        })))
        .mount(server)
        .await;
}

async fn mount_stream(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/api/stream-logos/abc"))
        .and(query_param("company_name", "Acme"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> LogoClient {
    LogoClient::http(ClientConfig::new(format!("{}/api", server.uri()))).expect("client")
}

#[tokio::test]
async fn full_generation_shows_all_logos() {
    let server = MockServer::start().await;
    mount_generate(&server).await;
    let frames = [logo_frame(1), logo_frame(2), logo_frame(3)];
    let mut body_frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    body_frames.push("event: done\ndata: ");
    mount_stream(&server, sse(&body_frames)).await;

    let client = client_for(&server);
    let task = client.start_generation("Acme").await.expect("start");
    assert_eq!(task.id(), &TaskId::new("abc"));
    assert_eq!(task.first_image(), "/images/acme_0.png");

    let mut gallery = Gallery::new(task.first_image(), 4);
    let mut stream = client.open_stream(task).await.expect("open");
    while let Some(event) = stream.next_event().await {
        gallery.apply(&event);
    }

    assert_eq!(stream.task().state(), TaskState::Completed);
    assert_eq!(gallery.items().len(), 4);
    assert_eq!(gallery.placeholder_count(), 0);
    assert_eq!(gallery.status_line(), "All 4 logos generated successfully");
}

#[tokio::test]
async fn last_flag_contract_completes_without_done_event() {
    let server = MockServer::start().await;
    mount_generate(&server).await;
    let body = sse(&[
        &logo_frame(1),
        r#"data: {"status":"success","logo":"/images/acme_2.png","index":2,"is_last":true}"#,
    ]);
    Mock::given(method("GET"))
        .and(path("/api/stream-logos/abc"))
        .and(query_param("total_logos", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server).with_options(
        StreamOptions::default()
            .completion(CompletionSignal::LastFlag)
            .total_logos(3),
    );
    let task = client.start_generation("Acme").await.expect("start");
    let mut gallery = Gallery::new(task.first_image(), 3);
    let outcome = client
        .open_stream(task)
        .await
        .expect("open")
        .drive(&mut gallery)
        .await
        .expect("drive");

    assert!(matches!(
        outcome.terminal,
        StreamEvent::Completed { generated: 2, .. }
    ));
    assert_eq!(gallery.status_line(), "All 3 logos generated successfully");
}

#[tokio::test]
async fn body_ending_without_done_is_reported_as_error() {
    let server = MockServer::start().await;
    mount_generate(&server).await;
    mount_stream(&server, sse(&[&logo_frame(1)])).await;

    let client = client_for(&server);
    let task = client.start_generation("Acme").await.expect("start");
    let mut gallery = Gallery::new(task.first_image(), DEFAULT_EXPECTED_TOTAL);
    let outcome = client
        .open_stream(task)
        .await
        .expect("open")
        .drive(&mut gallery)
        .await
        .expect("drive");

    assert_eq!(outcome.state, TaskState::Errored);
    assert_eq!(gallery.items().len(), 2);
    assert!(gallery.status_line().starts_with("Error generating logos"));
}

#[tokio::test]
async fn generate_error_status_surfaces_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "Error generating logo: model not loaded"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .start_generation("Acme")
        .await
        .expect_err("should fail");
    assert_eq!(
        err,
        LogoStreamError::Remote(RemoteError::Service {
            message: "Error generating logo: model not loaded".into()
        })
    );
}

#[tokio::test]
async fn stream_http_failure_is_returned_from_open() {
    let server = MockServer::start().await;
    mount_generate(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/stream-logos/abc"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown task"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let task = client.start_generation("Acme").await.expect("start");
    let err = match client.open_stream(task).await {
        Ok(_) => panic!("open should fail"),
        Err(err) => err,
    };
    assert!(matches!(
        err,
        LogoStreamError::Remote(RemoteError::Status { code: 404, .. })
    ));
}

#[tokio::test]
async fn abort_request_parses_acknowledgment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/abort-generation/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Generation task abc aborted",
            "total_generated": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service =
        HttpLogoService::new(ClientConfig::new(format!("{}/api", server.uri()))).expect("service");
    let reply = service.abort(&TaskId::new("abc")).await.expect("abort");
    assert!(reply.is_acknowledged());
    assert_eq!(reply.total_generated, Some(2));
}

fn saved_client(server: &MockServer, token: Option<&str>) -> SavedLogoClient {
    let mut config = SavedLogoConfig::new(format!("{}/api", server.uri()));
    if let Some(token) = token {
        config = config.token(token);
    }
    SavedLogoClient::new(config).expect("saved client")
}

#[tokio::test]
async fn save_and_list_saved_logos() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/saving/save-image"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({"ImagePath": "/images/acme_1.png", "Name": "Acme"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "Acme",
            "imagePath": "/images/acme_1.png"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/saving/saved-images"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 7, "name": "Acme", "imagePath": "/images/acme_1.png"}
        ])))
        .mount(&server)
        .await;

    let client = saved_client(&server, Some("secret"));
    let saved = client
        .save(" Acme ", "/images/acme_1.png")
        .await
        .expect("save");
    let expected = SavedLogo {
        id: 7,
        name: "Acme".into(),
        image_path: "/images/acme_1.png".into(),
    };
    assert_eq!(saved, expected);
    assert_eq!(client.list().await.expect("list"), vec![expected]);
}

#[tokio::test]
async fn rejected_token_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/saving/saved-images"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = saved_client(&server, Some("expired"))
        .list()
        .await
        .expect_err("should fail");
    assert_eq!(err, LogoStreamError::Unauthorized);
}

#[tokio::test]
async fn removing_unknown_logo_reports_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/saving/remove-image/99"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string("Image not found or you don't have permission to delete it."),
        )
        .mount(&server)
        .await;

    let err = saved_client(&server, Some("secret"))
        .remove(99)
        .await
        .expect_err("should fail");
    assert!(matches!(
        err,
        LogoStreamError::Remote(RemoteError::Status { code: 404, .. })
    ));
}

#[tokio::test]
async fn login_token_is_used_for_saved_logo_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"username": "ada", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "issued",
            "user": {"id": "u-1", "username": "ada", "name": "Ada"},
            "message": "Login successful"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/saving/saved-images"))
        .and(header("authorization", "Bearer issued"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = saved_client(&server, None);
    assert_eq!(client.list().await, Err(LogoStreamError::Unauthorized));

    let session = client.login(" ada ", "hunter2").await.expect("login");
    assert_eq!(session.user.name, "Ada");
    assert_eq!(client.token(), Ok("issued"));
    assert!(client.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn wrong_password_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": "Invalid username or password"})),
        )
        .mount(&server)
        .await;

    let mut client = saved_client(&server, None);
    let err = client.login("ada", "wrong").await.expect_err("should fail");
    assert_eq!(err, LogoStreamError::Unauthorized);
    assert_eq!(client.token(), Err(LogoStreamError::Unauthorized));
}
