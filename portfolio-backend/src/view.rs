//! HTML pages, rendered with Tera from templates compiled into the binary.

use portfolio_shared::error::PortfolioError;
use tera::{Context, Tera};
use tracing::error;

use crate::asset::AssetStore;
use crate::entity::portfolio;

const TEMPLATES: [(&str, &str); 4] = [
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    (
        "create_portfolio.html",
        include_str!("../templates/create_portfolio.html"),
    ),
    ("portfolio.html", include_str!("../templates/portfolio.html")),
];

pub const BACKGROUND_IMAGE_PATH: &str = "/static/images/background.svg";
pub const BACKGROUND_IMAGE: &str = include_str!("../static/images/background.svg");

/// Like Tera's default escaping but leaves `/` alone, so paths and links read as typed.
fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }
    output
}

pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, PortfolioError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES).map_err(|err| {
            PortfolioError::Configuration(format!("Failed to load templates: {err}"))
        })?;
        tera.set_escape_fn(escape_html);
        Ok(Self { tera })
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, PortfolioError> {
        self.tera.render(name, context).map_err(|err| {
            error!("Failed to render {}: {:?}", name, err);
            PortfolioError::Template(format!("Failed to render {name}: {err}"))
        })
    }

    pub fn index(&self, portfolios: &[portfolio::Model]) -> Result<String, PortfolioError> {
        let mut context = Context::new();
        context.insert("portfolios", portfolios);
        self.render("index.html", &context)
    }

    pub fn create_form(&self, csrf_token: &str) -> Result<String, PortfolioError> {
        let mut context = Context::new();
        context.insert("csrf_token", csrf_token);
        self.render("create_portfolio.html", &context)
    }

    pub fn portfolio(&self, portfolio: &portfolio::Model) -> Result<String, PortfolioError> {
        let mut context = Context::new();
        context.insert("portfolio", portfolio);
        context.insert(
            "picture_url",
            &portfolio
                .profile_picture
                .as_deref()
                .and_then(AssetStore::public_url),
        );
        self.render("portfolio.html", &context)
    }
}
