//! Serves the httpbin handler set.
//!
//! ```text
//! cargo run --example httpbin -- --bind 127.0.0.1:8080 --realm Staging
//! RUST_LOG=routebin=debug cargo run --example httpbin
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use routebin::{Config, HttpBin, Server};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "httpbin")]
#[command(about = "HTTP request and response service", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// JSON settings file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Title of the route index page
    #[arg(long)]
    title: Option<String>,

    /// Realm announced by /basic-auth
    #[arg(long)]
    realm: Option<String>,

    /// Smallest body /gzip will compress, in bytes
    #[arg(long)]
    gzip_min_size: Option<usize>,
}

impl Args {
    fn load_config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => Config::default(),
        };
        if let Some(title) = &self.title {
            config = config.with_title(title);
        }
        if let Some(realm) = &self.realm {
            config = config.with_realm(realm);
        }
        if let Some(min_size) = self.gzip_min_size {
            config = config.with_gzip_min_size(min_size);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.load_config()?;
    tracing::info!(
        title = %config.title,
        realm = %config.realm,
        gzip_min_size = config.gzip_min_size,
        "configuration loaded"
    );

    let app = Arc::new(HttpBin::new(config)?);
    let server = Server::bind(&args.bind).await?;
    server
        .run(move |request| {
            let app = Arc::clone(&app);
            async move { app.handle(request).await }
        })
        .await?;
    Ok(())
}
