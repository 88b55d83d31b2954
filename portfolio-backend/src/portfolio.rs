use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use portfolio_shared::error::PortfolioError;
use portfolio_shared::intake::{PortfolioForm, PortfolioSubmission, Upload};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::document::DocumentRenderer;
use crate::view::BACKGROUND_IMAGE;
use crate::{csrf, store, SharedState};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug)]
pub struct WebError {
    status: StatusCode,
    message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: String) -> Self {
        WebError { status, message }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        let mut response = Response::new(body.to_string().into());
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl From<PortfolioError> for WebError {
    fn from(err: PortfolioError) -> Self {
        let status = match &err {
            PortfolioError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PortfolioError::NotFound(_) => StatusCode::NOT_FOUND,
            PortfolioError::Security(_) => StatusCode::FORBIDDEN,
            PortfolioError::Io(_)
            | PortfolioError::Database(_)
            | PortfolioError::Configuration(_)
            | PortfolioError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        WebError {
            status,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

/// Landing page listing every stored portfolio.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Home page", body = String, content_type = "text/html"))
)]
pub async fn home(State(state): State<SharedState>) -> Result<Html<String>, WebError> {
    let state = state.read().await;
    let portfolios = store::list(&state.conn).await?;
    Ok(Html(state.views.index(&portfolios)?))
}

/// Intake form. Each visit issues a fresh anti-forgery token.
#[utoipa::path(
    get,
    path = "/create-portfolio/",
    responses((status = 200, description = "Portfolio form", body = String, content_type = "text/html"))
)]
pub async fn create_portfolio_form(
    State(state): State<SharedState>,
    session: Session,
) -> Result<Html<String>, WebError> {
    let token = csrf::issue(&session).await?;
    Ok(Html(state.read().await.views.create_form(&token)?))
}

#[utoipa::path(
    get,
    path = "/csrftoken/",
    responses((status = 200, description = "A fresh anti-forgery token", body = CsrfTokenResponse))
)]
pub async fn csrf_token(session: Session) -> Result<Json<CsrfTokenResponse>, WebError> {
    let csrf_token = csrf::issue(&session).await?;
    Ok(Json(CsrfTokenResponse { csrf_token }))
}

/// Hero image on the home page.
pub async fn background_image() -> impl IntoResponse {
    ([(CONTENT_TYPE, "image/svg+xml")], BACKGROUND_IMAGE)
}

/// Keeps the status axum assigns, so an oversized body is a 413 rather than a 400.
fn multipart_error(err: MultipartError) -> WebError {
    error!("Failed to read multipart field: {}", err.body_text());
    WebError::new(
        err.status(),
        format!("Failed to read multipart field: {}", err.body_text()),
    )
}

async fn field_text(field: Field<'_>) -> Result<Option<String>, WebError> {
    field.text().await.map(Some).map_err(multipart_error)
}

/// Collect the submitted fields, plus the anti-forgery token which isn't part of the form proper.
async fn read_submission(
    mut multipart: Multipart,
) -> Result<(PortfolioForm, Option<String>), WebError> {
    let mut form = PortfolioForm::default();
    let mut token = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();
        debug!("Processing field: {}", field_name);

        match field_name.as_str() {
            "fname" => form.fname = field_text(field).await?,
            "lname" => form.lname = field_text(field).await?,
            "email" => form.email = field_text(field).await?,
            "phone" => form.phone = field_text(field).await?,
            "bio" => form.bio = field_text(field).await?,
            "skills" => form.skills = field_text(field).await?,
            "linkedin" => form.linkedin = field_text(field).await?,
            "github" => form.github = field_text(field).await?,
            "csrf_token" => token = field_text(field).await?,
            "profile_picture" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(multipart_error)?;
                // browsers send an empty, unnamed part when no file was chosen
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                debug!(
                    "Profile picture {:?} ({:?}), {} bytes",
                    filename,
                    content_type,
                    data.len()
                );
                form.profile_picture = Some(Upload {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            _ => {
                debug!("Ignoring unknown multipart field: {}", field_name);
            }
        }
    }

    Ok((form, token))
}

/// Accept a submitted form: check the token, validate, store the picture then the row.
#[utoipa::path(
    post,
    path = "/submit-portfolio/",
    request_body(content = PortfolioSubmission, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Created, redirects to the portfolio page"),
        (status = 403, description = "Missing or invalid anti-forgery token"),
        (status = 413, description = "Submission larger than the body limit"),
        (status = 422, description = "One or more fields failed validation")
    )
)]
pub async fn submit_portfolio(
    State(state): State<SharedState>,
    session: Session,
    multipart: Multipart,
) -> Result<Redirect, WebError> {
    let (form, token) = read_submission(multipart).await?;

    csrf::verify(&session, token.as_deref())
        .await
        .inspect_err(|err| warn!("Rejected submission: {}", err))?;

    let candidate = form
        .validate()
        .inspect_err(|err| debug!("Invalid submission: {}", err))?;

    let state = state.read().await;
    let picture = state.assets.save(&candidate).await?;
    let saved = store::create(
        &state.conn,
        &candidate,
        Some(picture.to_string_lossy().into_owned()),
    )
    .await?;

    info!("Created portfolio {} for {}", saved.id, saved.full_name());
    Ok(Redirect::to(&format!("/portfolio/{}", saved.id)))
}

#[utoipa::path(
    get,
    path = "/portfolio/{id}",
    params(("id" = i32, Path, description = "Portfolio id")),
    responses(
        (status = 200, description = "Portfolio page", body = String, content_type = "text/html"),
        (status = 404, description = "No such portfolio")
    )
)]
pub async fn view_portfolio(
    Path(id): Path<i32>,
    State(state): State<SharedState>,
) -> Result<Html<String>, WebError> {
    let state = state.read().await;
    let portfolio = store::get(&state.conn, id).await?;
    Ok(Html(state.views.portfolio(&portfolio)?))
}

/// Render the portfolio to PDF, keep a copy in the output directory and send it as a download.
#[utoipa::path(
    get,
    path = "/download-portfolio/{id}",
    params(("id" = i32, Path, description = "Portfolio id")),
    responses(
        (status = 200, description = "PDF document", body = Vec<u8>, content_type = "application/pdf"),
        (status = 404, description = "No such portfolio")
    )
)]
pub async fn download_portfolio(
    Path(id): Path<i32>,
    State(state): State<SharedState>,
) -> Result<Response, WebError> {
    let (portfolio, documents) = {
        let state = state.read().await;
        (store::get(&state.conn, id).await?, state.documents.clone())
    };

    let pdf = tokio::task::spawn_blocking(move || documents.render(&portfolio))
        .await
        .map_err(|err| {
            error!("PDF rendering task failed: {:?}", err);
            WebError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render portfolio {}", id),
            )
        })??;

    debug!("Sending {} bytes for portfolio {}", pdf.len(), id);

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DocumentRenderer::filename(id)),
            ),
        ],
        pdf,
    )
        .into_response())
}
