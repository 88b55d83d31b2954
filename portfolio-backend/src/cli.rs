//! Cli things
//!

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_DB_PATH: &str = "./portfolio_database.db";
pub const DEFAULT_UPLOAD_DIR: &str = "./static/uploads";
pub const DEFAULT_OUTPUT_DIR: &str = "./static/downloads";

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[derive(Parser, Debug)]
pub struct CliOpts {
    #[clap(
        long,
        help = "Path to the database file",
        env = "PORTFOLIO_DB_PATH",
        default_value = DEFAULT_DB_PATH
    )]
    pub db_path: String,

    #[clap(
        long,
        help = "Directory profile pictures are stored in",
        env = "PORTFOLIO_UPLOAD_DIR",
        default_value = DEFAULT_UPLOAD_DIR
    )]
    pub upload_dir: String,

    #[clap(
        long,
        help = "Directory rendered PDFs are written to",
        env = "PORTFOLIO_OUTPUT_DIR",
        default_value = DEFAULT_OUTPUT_DIR
    )]
    pub output_dir: String,

    #[clap(long, help = "Enable debug logging", env = "PORTFOLIO_DEBUG")]
    pub debug: bool,
}

impl CliOpts {
    pub fn db_path(&self) -> PathBuf {
        expand(&self.db_path)
    }

    pub fn upload_dir(&self) -> PathBuf {
        expand(&self.upload_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        expand(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = CliOpts::parse_from(["portfolio"]);
        assert_eq!(cli.db_path(), PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(cli.upload_dir(), PathBuf::from(DEFAULT_UPLOAD_DIR));
        assert_eq!(cli.output_dir(), PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn test_tilde_is_expanded() {
        let cli = CliOpts::parse_from(["portfolio", "--db-path", "~/portfolio.db"]);
        assert!(!cli.db_path().starts_with("~"));
        assert!(cli.db_path().ends_with("portfolio.db"));
    }
}
