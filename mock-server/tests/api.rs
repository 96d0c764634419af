use axum::http::{self, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine};
use http_body_util::BodyExt;
use mock_server::{app, DirectMessage, Status, User, PASSWORD, USERNAME};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn authed_get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, basic(USERNAME, PASSWORD))
        .body(String::new())
        .unwrap()
}

fn form_post(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::AUTHORIZATION, basic(USERNAME, PASSWORD))
        .header(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(body.to_string())
        .unwrap()
}

// --- anonymous ---

#[tokio::test]
async fn public_timeline_needs_no_auth() {
    let resp = app()
        .oneshot(get("/statuses/public_timeline.json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "application/json"
    );
    let statuses: Vec<Status> = body_json(resp).await;
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].text, "hello from bob");
}

#[tokio::test]
async fn public_timeline_filters_since_id() {
    let resp = app()
        .oneshot(get("/statuses/public_timeline.json?since_id=101"))
        .await
        .unwrap();

    let statuses: Vec<Status> = body_json(resp).await;
    assert!(statuses.is_empty());
}

#[tokio::test]
async fn featured_users_are_public() {
    let resp = app().oneshot(get("/statuses/featured.json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let users: Vec<User> = body_json(resp).await;
    assert_eq!(users.len(), 2);
}

#[tokio::test]
async fn rss_timeline_wraps_items() {
    let resp = app()
        .oneshot(get("/statuses/public_timeline.rss"))
        .await
        .unwrap();

    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "application/rss+xml"
    );
    let body = body_bytes(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert!(text.starts_with("<rss"));
    assert!(text.contains("<item><title>bob: hello from bob</title>"));
}

// --- authentication ---

#[tokio::test]
async fn friends_timeline_without_auth_returns_401() {
    let resp = app()
        .oneshot(get("/statuses/friends_timeline.json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp
        .headers()
        .contains_key(http::header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn wrong_password_returns_401() {
    let req = Request::builder()
        .uri("/statuses/friends_timeline.json")
        .header(http::header::AUTHORIZATION, basic(USERNAME, "nope"))
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn verify_credentials_bare_format() {
    let resp = app()
        .oneshot(authed_get("/account/verify_credentials"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"Authorized");
}

#[tokio::test]
async fn verify_credentials_json_returns_user() {
    let resp = app()
        .oneshot(authed_get("/account/verify_credentials.json"))
        .await
        .unwrap();

    let user: User = body_json(resp).await;
    assert_eq!(user.screen_name, USERNAME);
}

#[tokio::test]
async fn end_session_logs_out() {
    let resp = app()
        .oneshot(authed_get("/account/end_session"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"Logged out.");
}

// --- statuses ---

#[tokio::test]
async fn update_requires_status_field() {
    let resp = app()
        .oneshot(form_post("/statuses/update.json", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_rejects_long_status() {
    let body = format!("status={}", "a".repeat(141));
    let resp = app()
        .oneshot(form_post("/statuses/update.json", &body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn show_unknown_status_returns_404() {
    let resp = app()
        .oneshot(authed_get("/statuses/show/999.json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_and_extension_return_404() {
    let resp = app().oneshot(authed_get("/nope/nothing.json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app().oneshot(authed_get("/help/test.yaml")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- users and friendships ---

#[tokio::test]
async fn show_user_decodes_path_segment() {
    let resp = app()
        .oneshot(authed_get("/users/show/%62ob.json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let user: User = body_json(resp).await;
    assert_eq!(user.screen_name, "bob");
}

#[tokio::test]
async fn friendship_exists_reports_follow_pair() {
    let resp = app()
        .oneshot(authed_get("/friendships/exists.json?user_a=alice&user_b=bob"))
        .await
        .unwrap();
    assert_eq!(&body_bytes(resp).await[..], b"true");

    let resp = app()
        .oneshot(authed_get("/friendships/exists.json?user_a=bob&user_b=alice"))
        .await
        .unwrap();
    assert_eq!(&body_bytes(resp).await[..], b"false");
}

#[tokio::test]
async fn direct_message_reads_form_body() {
    let resp = app()
        .oneshot(form_post(
            "/direct_messages/new.json",
            "user=bob&text=lunch%3F+12%3A30",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let message: DirectMessage = body_json(resp).await;
    assert_eq!(message.text, "lunch? 12:30");
    assert_eq!(message.recipient_screen_name, "bob");
    assert_eq!(message.sender_screen_name, USERNAME);
}

#[tokio::test]
async fn help_test_returns_true() {
    let resp = app().oneshot(authed_get("/help/test.json")).await.unwrap();
    assert_eq!(&body_bytes(resp).await[..], b"true");
}

// --- full status lifecycle ---

#[tokio::test]
async fn status_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // update
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_post("/statuses/update.json", "status=Walking+the+dog"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created: Status = body_json(resp).await;
    assert_eq!(created.text, "Walking the dog");
    assert_eq!(created.user.screen_name, USERNAME);
    let id = created.id;

    // show
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed_get(&format!("/statuses/show/{id}.json")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let shown: Status = body_json(resp).await;
    assert_eq!(shown, created);

    // friends timeline, newest first
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed_get("/statuses/friends_timeline.json"))
        .await
        .unwrap();
    let timeline: Vec<Status> = body_json(resp).await;
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].id, id);

    // destroy
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_post(&format!("/statuses/destroy/{id}.json"), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // show after destroy
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed_get(&format!("/statuses/show/{id}.json")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
