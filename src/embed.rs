use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::EmbedOptions;

/// 嵌入服务错误
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("读取文件失败: {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("请求嵌入服务失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("嵌入服务返回 {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("嵌入服务响应缺少 {0}")]
    MissingVector(&'static str),
    #[error("未配置嵌入服务，需要 --project 或 --endpoint")]
    Unconfigured,
}

/// 嵌入模型后端
pub trait Embedder: Send + Sync {
    /// 模型名称，写入记录的 model_name 字段
    fn model_name(&self) -> &str;

    /// 计算图片文件的嵌入向量，`dim` 为空时使用默认维数
    fn embed_image(
        &self,
        path: &Path,
        dim: Option<usize>,
    ) -> impl std::future::Future<Output = Result<Vec<f64>, EmbedError>> + Send;

    /// 计算文本的嵌入向量，`dim` 为空时使用默认维数
    fn embed_text(
        &self,
        text: &str,
        dim: Option<usize>,
    ) -> impl std::future::Future<Output = Result<Vec<f64>, EmbedError>> + Send;
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    text_embedding: Vec<f64>,
    #[serde(default)]
    image_embedding: Vec<f64>,
}

/// multimodalembedding 协议的 REST 客户端
pub struct MMEClient {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    model: String,
    default_dim: usize,
}

impl MMEClient {
    /// 根据配置构造客户端，endpoint 未指定时按 Vertex AI 规则推导
    pub fn new(opts: &EmbedOptions) -> Result<Self, EmbedError> {
        let endpoint = match &opts.endpoint {
            Some(url) => url.clone(),
            None => {
                if opts.project.is_empty() {
                    return Err(EmbedError::Unconfigured);
                }
                format!(
                    "https://{loc}-aiplatform.googleapis.com/v1/projects/{proj}/locations/{loc}/publishers/google/models/{model}:predict",
                    loc = opts.location,
                    proj = opts.project,
                    model = opts.model,
                )
            }
        };

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            token: opts.token.clone(),
            model: opts.model.clone(),
            default_dim: opts.dim,
        })
    }

    async fn predict(&self, instance: Value, dim: Option<usize>) -> Result<Prediction, EmbedError> {
        let dim = dim.unwrap_or(self.default_dim);
        let payload = json!({
            "instances": [instance],
            "parameters": { "dimension": dim },
        });

        let mut req = self.client.post(&self.endpoint).json(&payload);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Api { status, body });
        }

        let mut resp: PredictResponse = resp.json().await?;
        resp.predictions.pop().ok_or(EmbedError::MissingVector("predictions"))
    }
}

impl Embedder for MMEClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_image(&self, path: &Path, dim: Option<usize>) -> Result<Vec<f64>, EmbedError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| EmbedError::Read { path: path.display().to_string(), source })?;
        let encoded = STANDARD.encode(&data);

        let prediction =
            self.predict(json!({ "image": { "bytesBase64Encoded": encoded } }), dim).await?;
        if prediction.image_embedding.is_empty() {
            return Err(EmbedError::MissingVector("imageEmbedding"));
        }
        Ok(prediction.image_embedding)
    }

    async fn embed_text(&self, text: &str, dim: Option<usize>) -> Result<Vec<f64>, EmbedError> {
        let result = self.predict(json!({ "text": text }), dim).await;
        let prediction = match result {
            // 部分模型版本不认识 text 字段，改用 contextual_text 再试一次
            Err(EmbedError::Api { status, .. }) if status == StatusCode::BAD_REQUEST => {
                debug!("text 字段被拒绝，改用 contextual_text 重试");
                self.predict(json!({ "contextual_text": text }), dim).await?
            }
            other => other?,
        };
        if prediction.text_embedding.is_empty() {
            return Err(EmbedError::MissingVector("textEmbedding"));
        }
        Ok(prediction.text_embedding)
    }
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::path::Path;

    use super::{EmbedError, Embedder};

    /// 按内容查表返回固定向量的测试后端
    ///
    /// embed_image 以文件内容为键，embed_text 以文本为键，
    /// 查不到的键视为嵌入失败
    pub struct MockEmbedder {
        vectors: HashMap<String, Vec<f64>>,
    }

    impl MockEmbedder {
        pub fn new(vectors: &[(&str, &[f64])]) -> Self {
            let vectors = vectors.iter().map(|(k, v)| (k.to_string(), v.to_vec())).collect();
            Self { vectors }
        }

        fn lookup(&self, key: &str) -> Result<Vec<f64>, EmbedError> {
            self.vectors.get(key).cloned().ok_or(EmbedError::MissingVector("textEmbedding"))
        }
    }

    impl Embedder for MockEmbedder {
        fn model_name(&self) -> &str {
            "mock-embedder"
        }

        async fn embed_image(
            &self,
            path: &Path,
            _dim: Option<usize>,
        ) -> Result<Vec<f64>, EmbedError> {
            let data = std::fs::read(path)
                .map_err(|source| EmbedError::Read { path: path.display().to_string(), source })?;
            self.lookup(String::from_utf8_lossy(&data).trim())
        }

        async fn embed_text(&self, text: &str, _dim: Option<usize>) -> Result<Vec<f64>, EmbedError> {
            self.lookup(text)
        }
    }
}
