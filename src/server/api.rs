use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::response::Html;
use log::info;
use prometheus::{Encoder, TextEncoder};
use serde_json::{Value, json};
use utoipa::OpenApi;

use super::error::Result;
use super::state::AppState;
use super::types::*;
use crate::embed::Embedder;
use crate::metrics;

/// 搜索页面
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// 根据文本描述搜索图片
#[utoipa::path(
    post,
    path = "/search",
    request_body = SearchRequest,
    responses(
        (status = 200, body = SearchResponse),
    )
)]
pub async fn search_handler<E: Embedder>(
    State(state): State<Arc<AppState<E>>>,
    Json(data): Json<SearchRequest>,
) -> Result<Json<Value>> {
    let top_k = data.count.unwrap_or(state.top_k);

    let start = Instant::now();

    info!("正在搜索: {}", data.query);

    let result = state.service.search(&data.query, top_k).await?;

    let elapsed = start.elapsed();
    metrics::observe_search(elapsed.as_secs_f64(), result.first().map(|r| r.cosine_sim));

    Ok(Json(json!({
        "time": elapsed.as_millis(),
        "result": result,
    })))
}

/// OpenAPI 文档
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(super::ApiDoc::openapi())
}

/// Prometheus 指标
pub async fn metrics_handler() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<title>mmsearch</title>
<style>
body { font-family: sans-serif; max-width: 960px; margin: 2em auto; padding: 0 1em; }
form { display: flex; gap: 0.5em; }
input { flex: 1; padding: 0.5em; font-size: 1em; }
button { padding: 0.5em 1.5em; font-size: 1em; }
figure { display: inline-block; margin: 0.5em; text-align: center; }
figure img { max-width: 280px; max-height: 280px; display: block; }
figcaption { font-size: 0.85em; color: #555; margin-top: 0.25em; }
</style>
</head>
<body>
<h1>图片搜索</h1>
<form id="form">
<input id="query" type="text" placeholder="输入描述，例如：海边的日落" autofocus>
<button type="submit">搜索</button>
</form>
<p id="status" hidden>搜索中……</p>
<div id="results"></div>
<script>
const form = document.getElementById('form');
const query = document.getElementById('query');
const status = document.getElementById('status');
const results = document.getElementById('results');

form.addEventListener('submit', async (ev) => {
  ev.preventDefault();
  const text = query.value.trim();
  if (!text) {
    results.textContent = '请输入查询内容';
    return;
  }
  status.hidden = false;
  results.textContent = '';
  try {
    const resp = await fetch('/search', {
      method: 'POST',
      headers: {'Content-Type': 'application/json'},
      body: JSON.stringify({query: text}),
    });
    if (!resp.ok) {
      throw new Error(await resp.text());
    }
    const data = await resp.json();
    if (data.result.length === 0) {
      results.textContent = '没有找到匹配的图片';
      return;
    }
    for (const item of data.result) {
      const figure = document.createElement('figure');
      const img = document.createElement('img');
      img.src = '/static/' + item.rel_path;
      img.loading = 'lazy';
      const caption = document.createElement('figcaption');
      caption.textContent = item.cosine_sim.toFixed(4) + ' ' + item.image_name;
      figure.appendChild(img);
      figure.appendChild(caption);
      results.appendChild(figure);
    }
  } catch (e) {
    results.textContent = '搜索失败: ' + e.message;
  } finally {
    status.hidden = true;
  }
});
</script>
</body>
</html>
"#;
