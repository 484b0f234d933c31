use anyhow::Result;

use crate::embed::Embedder;
use crate::store::{QueryResult, VectorStore};

/// 搜索服务，把自然语言查询翻译为向量库的 top-K 查询
pub struct SearchService<E> {
    embedder: E,
    store: VectorStore,
}

impl<E: Embedder> SearchService<E> {
    pub fn new(embedder: E, store: VectorStore) -> Self {
        Self { embedder, store }
    }

    /// 用自然语言查询最相似的图片，结果按相似度降序
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        let embedding = self.embedder.embed_text(query, None).await?;
        let results = self.store.query_top_k(&embedding, top_k).await?;
        Ok(results)
    }
}
