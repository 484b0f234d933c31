mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;

pub use self::state::*;

use crate::embed::Embedder;

#[derive(OpenApi)]
#[openapi(
    paths(api::search_handler,),
    components(schemas(types::SearchRequest, types::SearchResponse, crate::store::QueryResult,),)
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app<E: Embedder + 'static>(state: Arc<AppState<E>>) -> Router {
    Router::new()
        .route("/", axum::routing::get(api::index_handler))
        .route("/search", axum::routing::post(api::search_handler::<E>))
        .route("/api-docs/openapi.json", axum::routing::get(api::openapi_handler))
        .route("/metrics", axum::routing::get(api::metrics_handler))
        .nest_service("/static", ServeDir::new(&state.static_dir))
        // 请求体限制：1M
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use clap::Parser;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::cli::server::ServerCommand;
    use crate::config::{ConfDir, StoreOptions};
    use crate::embed::mock::MockEmbedder;
    use crate::service::SearchService;
    use crate::store::{EmbeddingRecord, VectorStore};

    const E1: &[f64] = &[1.0, 0.0, 0.0];
    const E2: &[f64] = &[0.0, 1.0, 0.0];

    fn record(rel_path: &str, embedding: &[f64]) -> EmbeddingRecord {
        EmbeddingRecord {
            image_name: rel_path.to_string(),
            rel_path: rel_path.to_string(),
            embedding: embedding.to_vec(),
            embedding_dim: embedding.len(),
            model_name: "mock-embedder".to_string(),
        }
    }

    /// 构造已写入 red.jpg/green.jpg 两条记录的测试应用，conf 目录与图片目录共用
    async fn test_app(dir: &TempDir) -> Router {
        let conf_dir: ConfDir = dir.path().to_string_lossy().parse().unwrap();
        let opts = StoreOptions {
            dataset: "embeddings".to_string(),
            table: "image_embeddings".to_string(),
        };
        let store = VectorStore::open(&conf_dir, &opts).await.unwrap();
        store.ensure_schema(false).await.unwrap();
        store.bulk_load(&[record("red.jpg", E1), record("green.jpg", E2)], false).await.unwrap();

        std::fs::write(dir.path().join("red.jpg"), "red").unwrap();

        let embedder = MockEmbedder::new(&[("red", E1)]);
        let service = SearchService::new(embedder, store);

        let static_dir = dir.path().to_string_lossy();
        let opts = ServerCommand::parse_from(["server", "--static-dir", static_dir.as_ref()]);
        create_app(AppState::new(service, &opts))
    }

    fn search_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/search")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_search_route() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;

        let response = app.oneshot(search_request(json!({"query": "red"}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert!(body["time"].is_number());
        assert_eq!(body["result"].as_array().unwrap().len(), 2);
        assert_eq!(body["result"][0]["rel_path"], "red.jpg");
        assert_eq!(body["result"][0]["image_name"], "red.jpg");
    }

    #[tokio::test]
    async fn test_search_count_override() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;

        let response =
            app.oneshot(search_request(json!({"query": "red", "count": 1}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["result"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_embed_failure_is_500() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;

        let response = app.oneshot(search_request(json!({"query": "nonsense"}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_index_page() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("图片搜索"));
    }

    #[tokio::test]
    async fn test_static_serving() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;

        let request = Request::builder().uri("/static/red.jpg").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"red");
    }

    #[tokio::test]
    async fn test_openapi_doc() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;

        let request =
            Request::builder().uri("/api-docs/openapi.json").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert!(body["paths"]["/search"].is_object());
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir).await;

        let response =
            app.clone().oneshot(search_request(json!({"query": "red"}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("mm_search_count"));
    }
}
