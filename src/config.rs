use clap::Parser;
use std::path::PathBuf;

/// Server settings, read from flags with environment fallbacks
#[derive(Parser, Clone, Debug)]
#[command(
    name = "data-vision",
    version,
    about = "Upload CSV/Excel tables and compute chart-ready aggregates"
)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3456)]
    pub port: u16,

    /// Directory holding the built front end (index.html and assets)
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// Largest accepted request body, in MiB
    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = 50)]
    pub max_upload_mb: usize,
}

impl Config {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3456,
            static_dir: PathBuf::from("public"),
            max_upload_mb: 50,
        }
    }
}

/// Install the global logger (`RUST_LOG` overrides the default `info`)
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
