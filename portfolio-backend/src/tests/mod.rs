use crate::document::tests::{png_bytes, shown_text};
use crate::portfolio::{CsrfTokenResponse, PDF_CONTENT_TYPE};
use crate::{build_app, store, AppState, SharedState};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::*;
use std::path::Path;
use std::sync::{Arc, Once};
use tempfile::TempDir;
use tokio::sync::RwLock;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static INIT: Once = Once::new();

struct TestApp {
    server: TestServer,
    state: SharedState,
    // held so the scratch directories outlive the server
    dir: TempDir,
}

impl TestApp {
    fn uploads(&self) -> std::path::PathBuf {
        self.dir.path().join("uploads")
    }

    async fn token(&self) -> String {
        let res = self.server.get("/csrftoken/").await;
        res.assert_status_ok();
        res.json::<CsrfTokenResponse>().csrf_token
    }

    async fn portfolio_count(&self) -> usize {
        store::list(&self.state.read().await.conn)
            .await
            .expect("Failed to list portfolios")
            .len()
    }
}

async fn setup_test_server() -> TestApp {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                "portfolio_backend=debug,tower_http=debug",
            ))
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let appstate = AppState::test(dir.path()).await;
    let dbpool: sqlx::Pool<sqlx::Sqlite> = appstate.conn.get_sqlite_connection_pool().clone();
    let state = Arc::new(RwLock::new(appstate));
    let app = build_app(&state, dbpool)
        .await
        .expect("Failed to build app");

    let config = TestServerConfig {
        // Preserve cookies across requests
        // for the session cookie to work.
        save_cookies: true,

        expect_success_by_default: false,
        restrict_requests_with_http_schema: false,
        default_content_type: None,
        default_scheme: Some("http".into()),
        ..Default::default()
    };

    TestApp {
        server: TestServer::new_with_config(app, config).expect("Failed to start test server"),
        state,
        dir,
    }
}

fn ada_form(token: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("fname", "Ada")
        .add_text("lname", "Lovelace")
        .add_text("email", "ada@x.com")
        .add_text("phone", "+12345678901")
        .add_text("bio", "Mathematician")
        .add_text("skills", "Math, Computing")
        .add_text("linkedin", "li/ada")
        .add_text("github", "gh/ada")
        .add_text("csrf_token", token)
        .add_part(
            "profile_picture",
            Part::bytes(png_bytes())
                .file_name("ada.png")
                .mime_type("image/png"),
        )
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path)
        .expect("Failed to read dir")
        .next()
        .is_none()
}

#[tokio::test]
async fn test_failing_setup_server() {
    // I sure hope this path isn't writeable!
    crate::storage::start_db(Some(Path::new("/asdfasdf/portfolio/nope.db")))
        .await
        .expect_err("Should fail to open DB");
}

#[tokio::test]
async fn test_submit_view_download() {
    let app = setup_test_server().await;

    let token = app.token().await;
    let res = app
        .server
        .post("/submit-portfolio/")
        .multipart(ada_form(&token))
        .await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(res.header(LOCATION), "/portfolio/1");

    // stored picture, named after the person
    let asset = app.uploads().join("Ada_Lovelace_ada.png");
    assert_eq!(std::fs::read(&asset).expect("read asset"), png_bytes());

    let saved = store::get(&app.state.read().await.conn, 1)
        .await
        .expect("Failed to get portfolio");
    assert_eq!(saved.full_name(), "Ada Lovelace");
    assert_eq!(saved.github.as_deref(), Some("gh/ada"));

    let res = app.server.get("/portfolio/1").await;
    res.assert_status_ok();
    let page = res.text();
    assert!(page.contains("Ada Lovelace"));
    assert!(page.contains("/static/uploads/Ada_Lovelace_ada.png"));

    let res = app.server.get("/static/uploads/Ada_Lovelace_ada.png").await;
    res.assert_status_ok();
    assert_eq!(res.as_bytes().as_ref(), png_bytes().as_slice());

    let res = app.server.get("/download-portfolio/1").await;
    res.assert_status_ok();
    assert_eq!(res.header(CONTENT_TYPE), PDF_CONTENT_TYPE);
    assert_eq!(
        res.header(CONTENT_DISPOSITION),
        "attachment; filename=\"portfolio_1.pdf\""
    );
    let pdf = res.as_bytes();
    assert!(pdf.starts_with(b"%PDF-"));
    let text = shown_text(pdf);
    for expected in ["Ada Lovelace", "ada@x.com", "+12345678901", "Mathematician"] {
        assert!(text.iter().any(|t| t == expected), "missing {expected}");
    }
    assert!(app.dir.path().join("downloads/portfolio_1.pdf").exists());

    let res = app.server.get("/").await;
    res.assert_status_ok();
    assert!(res.text().contains("/portfolio/1"));
}

#[tokio::test]
async fn test_form_page_token() {
    let app = setup_test_server().await;

    let res = app.server.get("/create-portfolio/").await;
    res.assert_status_ok();
    let page = res.text();
    let marker = r#"name="csrf_token" value=""#;
    let start = page.find(marker).expect("no token in form") + marker.len();
    let token = &page[start..start + crate::csrf::TOKEN_LENGTH];
    debug!("form token {}", token);

    let res = app
        .server
        .post("/submit-portfolio/")
        .multipart(ada_form(token))
        .await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_invalid_phone_persists_nothing() {
    let app = setup_test_server().await;

    let token = app.token().await;
    let res = app
        .server
        .post("/submit-portfolio/")
        .multipart(ada_form(&token).add_text("phone", "abc"))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json();
    let message = body["error"].as_str().expect("error message");
    assert!(message.contains("phone"), "{message}");

    assert_eq!(app.portfolio_count().await, 0);
    assert!(is_empty_dir(&app.uploads()));
}

#[tokio::test]
async fn test_missing_fields_are_all_reported() {
    let app = setup_test_server().await;

    let token = app.token().await;
    let form = MultipartForm::new()
        .add_text("fname", "Ada")
        .add_text("csrf_token", token);
    let res = app.server.post("/submit-portfolio/").multipart(form).await;
    assert_eq!(res.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: serde_json::Value = res.json();
    let message = body["error"].as_str().expect("error message");
    for field in ["lname", "email", "phone", "bio", "skills", "profile_picture"] {
        assert!(message.contains(field), "{field} not reported in {message}");
    }
    assert!(!message.contains("fname"));
    assert_eq!(app.portfolio_count().await, 0);
}

#[tokio::test]
async fn test_csrf_rejections() {
    let app = setup_test_server().await;

    // nothing issued yet
    let res = app
        .server
        .post("/submit-portfolio/")
        .multipart(ada_form("not-a-token"))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    // issued, but a different value submitted
    app.token().await;
    let res = app
        .server
        .post("/submit-portfolio/")
        .multipart(ada_form("not-a-token"))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    // issued, but left out of the form
    app.token().await;
    let form = MultipartForm::new().add_text("fname", "Ada");
    let res = app.server.post("/submit-portfolio/").multipart(form).await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    assert_eq!(app.portfolio_count().await, 0);
    assert!(is_empty_dir(&app.uploads()));

    // a token only works once
    let token = app.token().await;
    let res = app
        .server
        .post("/submit-portfolio/")
        .multipart(ada_form(&token))
        .await;
    assert_eq!(res.status_code(), StatusCode::SEE_OTHER);
    let res = app
        .server
        .post("/submit-portfolio/")
        .multipart(ada_form(&token))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json();
    assert!(body["error"].is_string());

    assert_eq!(app.portfolio_count().await, 1);
}

#[tokio::test]
async fn test_unknown_portfolio() {
    let app = setup_test_server().await;

    let res = app.server.get("/portfolio/999").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json();
    assert_eq!(body["error"], "Portfolio 999 not found");

    let res = app.server.get("/download-portfolio/999").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_without_picture_file() {
    let app = setup_test_server().await;

    let token = app.token().await;
    app.server
        .post("/submit-portfolio/")
        .multipart(ada_form(&token))
        .await
        .assert_status(StatusCode::SEE_OTHER);

    std::fs::remove_file(app.uploads().join("Ada_Lovelace_ada.png"))
        .expect("Failed to remove picture");

    let res = app.server.get("/download-portfolio/1").await;
    res.assert_status_ok();
    let pdf = res.as_bytes();
    assert!(!String::from_utf8_lossy(pdf).contains("/Subtype /Image"));
    assert!(shown_text(pdf).iter().any(|t| t == "Ada Lovelace"));
}

#[tokio::test]
async fn test_home_lists_in_order() {
    let app = setup_test_server().await;

    let res = app.server.get("/").await;
    res.assert_status_ok();
    assert!(res.text().contains("No portfolios yet."));

    for _ in 0..2 {
        let token = app.token().await;
        app.server
            .post("/submit-portfolio/")
            .multipart(ada_form(&token))
            .await
            .assert_status(StatusCode::SEE_OTHER);
    }

    let page = app.server.get("/").await.text();
    let first = page.find("/portfolio/1").expect("first listed");
    let second = page.find("/portfolio/2").expect("second listed");
    assert!(first < second);
}

#[tokio::test]
async fn test_api_docs() {
    let app = setup_test_server().await;

    let res = app.server.get(crate::openapi::OPENAPI_PATH).await;
    res.assert_status_ok();
    let doc: serde_json::Value = res.json();
    assert!(doc["paths"]["/submit-portfolio/"]["post"].is_object());
}

#[tokio::test]
async fn test_picture_name_needing_escapes() {
    let app = setup_test_server().await;

    let token = app.token().await;
    let form = ada_form(&token).add_part(
        "profile_picture",
        Part::bytes(png_bytes())
            .file_name("me#1.png")
            .mime_type("image/png"),
    );
    app.server
        .post("/submit-portfolio/")
        .multipart(form)
        .await
        .assert_status(StatusCode::SEE_OTHER);
    assert!(app.uploads().join("Ada_Lovelace_me#1.png").exists());

    let page = app.server.get("/portfolio/1").await.text();
    let url = "/static/uploads/Ada_Lovelace_me%231.png";
    assert!(page.contains(url));

    let res = app.server.get(url).await;
    res.assert_status_ok();
    assert_eq!(res.as_bytes().as_ref(), png_bytes().as_slice());
}

#[tokio::test]
async fn test_oversized_submission() {
    let app = setup_test_server().await;

    let token = app.token().await;
    let form = ada_form(&token).add_part(
        "profile_picture",
        Part::bytes(vec![0u8; crate::SUBMIT_BODY_LIMIT + 1024])
            .file_name("huge.png")
            .mime_type("image/png"),
    );
    let res = app.server.post("/submit-portfolio/").multipart(form).await;
    assert_eq!(res.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(app.portfolio_count().await, 0);
    assert!(is_empty_dir(&app.uploads()));
}

#[tokio::test]
async fn test_home_page_assets_and_headers() {
    let app = setup_test_server().await;

    let res = app.server.get("/").await;
    res.assert_status_ok();
    assert_eq!(
        res.header(CACHE_CONTROL),
        crate::middleware::CACHE_CONTROL_VALUE
    );
    assert!(res.text().contains(crate::view::BACKGROUND_IMAGE_PATH));

    let res = app.server.get(crate::view::BACKGROUND_IMAGE_PATH).await;
    res.assert_status_ok();
    assert_eq!(res.header(CONTENT_TYPE), "image/svg+xml");
    assert!(res.text().starts_with("<svg"));

    // errors are not given the no-cache header
    let res = app.server.get("/portfolio/999").await;
    assert!(res.headers().get(CACHE_CONTROL).is_none());
}
