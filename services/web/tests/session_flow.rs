//! End-to-end checks of the session pipeline through the full router,
//! backed by the in-memory store.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use listings_core::AccountStore;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;
use web_lib::{
    adapters::InMemoryStore,
    config::SessionConfig,
    credentials::hash_password,
    web::{app, state::AppState, App},
};

const SECRET: &str = "integration-secret";

/// Minimal cookie-carrying client.
struct Browser {
    app: App,
    cookie: Option<String>,
}

impl Browser {
    fn new(app: App) -> Self {
        Self { app, cookie: None }
    }

    async fn send(&mut self, mut req: Request<Body>) -> Response {
        if let Some(cookie) = &self.cookie {
            req.headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }
        let response = self.app.clone().oneshot(req).await.unwrap();
        if let Some(cookie) = set_cookie(&response) {
            self.cookie = Some(cookie);
        }
        response
    }

    async fn get(&mut self, path: &str) -> Response {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        self.send(req).await
    }

    async fn post_form(&mut self, path: &str, form: &str) -> Response {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(req).await
    }
}

fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn setup() -> (App, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let state = Arc::new(AppState::new(
        store.clone(),
        store.clone(),
        SessionConfig::with_secret(SECRET),
    ));
    (app(state, Path::new("./public")), store)
}

async fn with_account(store: &InMemoryStore, username: &str, password: &str) {
    let hash = hash_password(password).unwrap();
    store
        .create_account(username, &format!("{}@example.com", username), &hash)
        .await
        .unwrap();
}

#[tokio::test]
async fn first_visit_issues_a_session_cookie() {
    let (app, store) = setup();
    let mut browser = Browser::new(app);

    let response = browser.get("/listings").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response).expect("new session cookie");
    assert!(cookie.starts_with("session="));
    assert_eq!(store.session_count(), 1);
}

#[tokio::test]
async fn forged_cookie_gets_a_fresh_session() {
    let (app, store) = setup();
    let mut browser = Browser::new(app);
    browser.cookie = Some("session=made-up-id.bm90LWEtdGFn".to_string());

    let response = browser.get("/listings").await;
    let cookie = set_cookie(&response).expect("replacement cookie");
    assert!(!cookie.contains("made-up-id"));
    assert!(store.session("made-up-id").is_none());
}

#[tokio::test]
async fn root_redirects_to_listings() {
    let (app, _) = setup();
    let response = Browser::new(app).get("/").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/listings");
}

#[tokio::test]
async fn valid_login_binds_identity_and_flashes_once() {
    let (app, store) = setup();
    with_account(&store, "maya", "pa55word").await;
    let mut browser = Browser::new(app);

    let response = browser
        .post_form("/login", "username=maya&password=pa55word")
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/listings");

    let page = body_text(browser.get("/listings").await).await;
    assert!(page.contains("Welcome back to Wanderlust!"));
    assert!(page.contains("maya"));
    assert!(page.contains("Log out"));

    let again = body_text(browser.get("/listings").await).await;
    assert!(!again.contains("Welcome back to Wanderlust!"));
    assert!(again.contains("Log out"));
}

#[tokio::test]
async fn invalid_login_redirects_back_with_one_error() {
    let (app, store) = setup();
    with_account(&store, "maya", "pa55word").await;
    let mut browser = Browser::new(app);

    let response = browser
        .post_form("/login", "username=maya&password=wrong")
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    let page = body_text(browser.get("/login").await).await;
    assert_eq!(page.matches("incorrect username or password").count(), 1);
    assert!(!page.contains("Log out"));

    let unknown = browser
        .post_form("/login", "username=nobody&password=pa55word")
        .await;
    assert_eq!(location(&unknown), "/login");
}

#[tokio::test]
async fn protected_page_requires_login_then_resumes() {
    let (app, store) = setup();
    with_account(&store, "maya", "pa55word").await;
    let mut browser = Browser::new(app);

    let response = browser.get("/listings/new").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    let body = body_text(response).await;
    assert!(!body.contains("Create a new listing"));

    let page = body_text(browser.get("/login").await).await;
    assert_eq!(page.matches("You must be logged in to do that!").count(), 1);

    let response = browser
        .post_form("/login", "username=maya&password=pa55word")
        .await;
    assert_eq!(location(&response), "/listings/new");

    let page = body_text(browser.get("/listings/new").await).await;
    assert!(page.contains("Create a new listing"));
}

#[tokio::test]
async fn logout_rejects_the_next_protected_request() {
    let (app, store) = setup();
    with_account(&store, "maya", "pa55word").await;
    let mut browser = Browser::new(app.clone());
    browser
        .post_form("/login", "username=maya&password=pa55word")
        .await;
    let logged_in_cookie = browser.cookie.clone();

    let response = browser.get("/logout").await;
    assert_eq!(location(&response), "/listings");

    let response = browser.get("/listings/new").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    // Replaying the pre-logout cookie does not restore the identity.
    let mut replay = Browser::new(app);
    replay.cookie = logged_in_cookie;
    let response = replay.get("/listings/new").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn logout_message_is_shown_after_redirect() {
    let (app, store) = setup();
    with_account(&store, "maya", "pa55word").await;
    let mut browser = Browser::new(app);
    browser
        .post_form("/login", "username=maya&password=pa55word")
        .await;
    browser.get("/listings").await;

    browser.get("/logout").await;
    let page = body_text(browser.get("/listings").await).await;
    assert!(page.contains("You are logged out!"));
    assert!(!page.contains("Log out"));
}

#[tokio::test]
async fn signup_logs_the_new_account_in() {
    let (app, _) = setup();
    let mut browser = Browser::new(app);

    let response = browser
        .post_form("/signup", "username=kai&email=kai%40example.com&password=secret1")
        .await;
    assert_eq!(location(&response), "/listings");

    let page = body_text(browser.get("/listings/new").await).await;
    assert!(page.contains("Posting as kai"));
}

#[tokio::test]
async fn duplicate_signup_returns_to_the_form() {
    let (app, store) = setup();
    with_account(&store, "kai", "secret1").await;
    let mut browser = Browser::new(app);

    let response = browser
        .post_form("/signup", "username=kai&email=other%40example.com&password=x")
        .await;
    assert_eq!(location(&response), "/signup");

    let page = body_text(browser.get("/signup").await).await;
    assert!(page.contains("already registered"));
    assert!(!page.contains("Log out"));
}

#[tokio::test]
async fn deleted_account_leaves_an_anonymous_session() {
    let (app, store) = setup();
    with_account(&store, "maya", "pa55word").await;
    let mut browser = Browser::new(app);
    browser
        .post_form("/login", "username=maya&password=pa55word")
        .await;

    let account = store.get_credentials_by_username("maya").await.unwrap();
    store.remove_account(account.account_id);

    let response = browser.get("/listings/new").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn unknown_path_renders_not_found_page() {
    let (app, _) = setup();
    let response = Browser::new(app).get("/no/such/page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let page = body_text(response).await;
    assert!(page.contains("Page Not Found"));
    assert!(page.contains("<html>"));
}

#[tokio::test]
async fn store_outage_is_a_server_error_not_an_anonymous_page() {
    let (app, store) = setup();
    let mut browser = Browser::new(app);
    browser.get("/listings").await;

    store.set_available(false);
    let response = browser.get("/listings").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let page = body_text(response).await;
    assert!(page.contains("Something went wrong!"));
}

#[tokio::test]
async fn malformed_login_form_renders_an_error_page() {
    let (app, _) = setup();
    let response = Browser::new(app)
        .post_form("/login", "username=only")
        .await;
    assert!(response.status().is_client_error());
    let page = body_text(response).await;
    assert!(page.contains("<html>"));
}

#[tokio::test]
async fn unsupported_method_renders_not_found_page() {
    let (app, _) = setup();
    let mut browser = Browser::new(app);

    let response = browser.post_form("/listings", "title=x").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(set_cookie(&response).is_some());
    let page = body_text(response).await;
    assert!(page.contains("Page Not Found"));
    assert!(page.contains("<html>"));

    let req = Request::builder()
        .method("DELETE")
        .uri("/login")
        .body(Body::empty())
        .unwrap();
    let response = browser.send(req).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page Not Found"));
}

#[tokio::test]
async fn form_logs_out_through_method_override() {
    let (app, store) = setup();
    with_account(&store, "maya", "pa55word").await;
    let mut browser = Browser::new(app);
    browser
        .post_form("/login", "username=maya&password=pa55word")
        .await;

    // Without the override, POST has no /logout route.
    let response = browser.post_form("/logout", "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = browser.get("/listings/new").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = browser.post_form("/logout?_method=DELETE", "").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/listings");

    let response = browser.get("/listings/new").await;
    assert_eq!(location(&response), "/login");
}
