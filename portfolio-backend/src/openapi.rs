use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub const DOCS_PATH: &str = "/api/docs";
pub const OPENAPI_PATH: &str = "/api/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(description = "Portfolio Builder: collect a professional profile, view it and download it as a PDF", license(name = "MIT or Apache2", identifier="MIT Apache2.0"), title = "Portfolio Builder", version = env!("CARGO_PKG_VERSION")),
    paths(
        crate::portfolio::home,
        crate::portfolio::create_portfolio_form,
        crate::portfolio::csrf_token,
        crate::portfolio::submit_portfolio,
        crate::portfolio::view_portfolio,
        crate::portfolio::download_portfolio
    ),
    components(schemas(crate::entity::portfolio::Model))
)]
pub struct ApiDoc;

pub(crate) fn api_route<T: Clone + Sync + Send + 'static>() -> Router<T> {
    let doc = ApiDoc::openapi();
    Router::new().merge(SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/",
            "/create-portfolio/",
            "/csrftoken/",
            "/submit-portfolio/",
            "/portfolio/{id}",
            "/download-portfolio/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
