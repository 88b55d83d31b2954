pub mod error;
pub mod intake;

pub const DEFAULT_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// Where the server listens. It only speaks plain HTTP.
#[derive(Debug, PartialEq, Eq)]
pub struct AddrInfo {
    pub addr: String,
    pub port: u16,
}

impl AddrInfo {
    pub fn as_url(&self) -> String {
        format!("http://{}:{}", self.addr, self.port)
    }

    pub fn as_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    /// Unset or unparseable values fall back to the defaults.
    pub fn from_vars(addr: Option<String>, port: Option<String>) -> Self {
        Self {
            addr: addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            port: port
                .and_then(|val| val.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }

    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("PORTFOLIO_ADDR").ok(),
            std::env::var("PORTFOLIO_PORT").ok(),
        )
    }
}
