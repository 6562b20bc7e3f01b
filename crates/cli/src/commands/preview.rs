use anyhow::{Context, Result};
use axum::Router;
use pagesnap_core::{ERROR_PAGE_FILE, INDEX_FILE};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Serve a built snapshot the way a static host would.
///
/// Unknown paths get 404.html with a 404 status, so the interception shim's
/// fallback can be exercised locally.
pub async fn run(path: Option<PathBuf>, port: u16, config_path: Option<PathBuf>) -> Result<()> {
    let root = match path {
        Some(path) => path,
        None => super::load_config(config_path.as_deref())?.paths.output_dir,
    };

    if !root.join(INDEX_FILE).exists() {
        anyhow::bail!(
            "No {} in {}\nRun 'pagesnap build' first",
            INDEX_FILE,
            root.display()
        );
    }

    println!("🌐 Starting preview server...");
    println!("   Snapshot: {}", root.display());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to port")?;

    println!("\n🚀 Preview ready at: http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    axum::serve(listener, router(&root))
        .await
        .context("Server error")?;

    Ok(())
}

fn router(root: &Path) -> Router {
    let site = ServeDir::new(root).not_found_service(ServeFile::new(root.join(ERROR_PAGE_FILE)));

    Router::new()
        .fallback_service(site)
        .layer(TraceLayer::new_for_http())
}
