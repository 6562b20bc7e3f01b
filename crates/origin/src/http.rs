use crate::{Origin, OriginError, Page};
use async_trait::async_trait;
use pagesnap_core::SourceConfig;
use std::error::Error as _;
use std::time::Duration;

/// HTTP origin backed by reqwest
pub struct HttpOrigin {
    client: reqwest::Client,
    source: SourceConfig,
}

impl HttpOrigin {
    /// Create a client for the server described by `source`.
    ///
    /// Proxies are bypassed; the source server is expected to be local.
    pub fn new(source: &SourceConfig) -> Result<Self, OriginError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .user_agent(concat!("pagesnap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OriginError::Transport(describe(&e)))?;

        Ok(Self {
            client,
            source: source.clone(),
        })
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    fn base_url(&self) -> &str {
        &self.source.base_url
    }

    async fn get(&self, path: &str, timeout: Duration) -> Result<Page, OriginError> {
        let url = self.source.url_for(path);

        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| OriginError::Transport(describe(&e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| OriginError::Transport(describe(&e)))?;

        Ok(Page {
            status,
            body: body.to_vec(),
        })
    }
}

/// reqwest's top-level message omits the cause ("connection refused" etc.)
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fetch_json, wait_until_ready};
    use axum::{Json, Router, http::StatusCode, routing::get};
    use pagesnap_core::SnapshotConfig;
    use serde_json::json;

    async fn spawn_server() -> String {
        let app = Router::new()
            .route("/", get(|| async { "<html><head></head></html>" }))
            .route(
                "/api/check-adb",
                get(|| async { Json(json!({"success": true, "adb": true})) }),
            )
            .route("/api/broken", get(|| async { "not json" }))
            .route(
                "/api/gone",
                get(|| async { (StatusCode::NOT_FOUND, Json(json!({"success": false}))) }),
            )
            .route(
                "/api/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Json(json!({}))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn origin_at(base_url: &str) -> HttpOrigin {
        let mut source = SnapshotConfig::default().source;
        source.base_url = base_url.to_string();
        HttpOrigin::new(&source).unwrap()
    }

    /// An address nothing listens on
    async fn closed_address() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_get_root_and_json() {
        let base = spawn_server().await;
        let origin = origin_at(&base);

        let page = origin.get("", Duration::from_secs(5)).await.unwrap();
        assert!(page.is_ok());
        assert_eq!(page.body, b"<html><head></head></html>");

        let value = fetch_json(&origin, "/api/check-adb", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(value, json!({"success": true, "adb": true}));
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let base = spawn_server().await;
        let origin = origin_at(&format!("{}/", base));

        let page = origin.get("", Duration::from_secs(5)).await.unwrap();
        assert_eq!(page.body, b"<html><head></head></html>");
        let page = origin.get("/api/check-adb", Duration::from_secs(5)).await.unwrap();
        assert!(page.is_ok());
    }

    #[tokio::test]
    async fn test_error_status_is_a_page() {
        let base = spawn_server().await;
        let origin = origin_at(&base);
        let page = origin.get("/api/gone", Duration::from_secs(5)).await.unwrap();
        assert_eq!(page.status, 404);
        assert_eq!(page.json().unwrap(), json!({"success": false}));
    }

    #[tokio::test]
    async fn test_non_json_body_is_an_error() {
        let base = spawn_server().await;
        let origin = origin_at(&base);
        let err = fetch_json(&origin, "/api/broken", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, OriginError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let base = spawn_server().await;
        let origin = origin_at(&base);
        let err = origin
            .get("/api/slow", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, OriginError::Transport(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let origin = origin_at(&closed_address().await);
        let err = origin.get("/api/devices", Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, OriginError::Transport(_)));
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn test_wait_until_ready_against_live_server() {
        let base = spawn_server().await;
        let origin = origin_at(&base);
        let mut source = SnapshotConfig::default().source;
        source.ready_timeout = Duration::from_secs(5);
        assert!(wait_until_ready(&origin, &source).await);
    }

    #[tokio::test]
    async fn test_wait_until_ready_times_out_without_server() {
        let origin = origin_at(&closed_address().await);
        let mut source = SnapshotConfig::default().source;
        source.ready_timeout = Duration::from_millis(300);
        source.poll_interval = Duration::from_millis(100);
        assert!(!wait_until_ready(&origin, &source).await);
    }
}
