use std::sync::LazyLock;

use log::info;
use regex::Regex;
use serde::Serialize;
use sqlx::sqlite::*;
use sqlx::{Row, SqlitePool};
use utoipa::ToSchema;

use crate::config::{ConfDir, StoreOptions};

static RE_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("failed to build regex"));

/// 向量库错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("无效的标识符: {0}")]
    InvalidIdent(String),
    #[error("创建配置目录失败: {0}")]
    CreateDir(#[from] std::io::Error),
    #[error("连接数据库失败: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("建表失败: {0}")]
    Provision(#[source] sqlx::Error),
    #[error("批量写入失败: {0}")]
    BulkLoad(#[source] sqlx::Error),
    #[error("查询失败: {0}")]
    Query(#[source] sqlx::Error),
    #[error("记录 {rel_path} 的向量为空")]
    InvalidRecord { rel_path: String },
    #[error("记录 {rel_path} 的维数不一致: 期望 {expected}，实际 {actual}")]
    DimensionMismatch { rel_path: String, expected: usize, actual: usize },
    #[error("记录 {rel_path} 的向量数据损坏: {len} 字节不是 8 的倍数")]
    InvalidVector { rel_path: String, len: usize },
    #[error("top_k 必须大于 0")]
    InvalidTopK,
}

/// 一条图片向量记录
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    /// 图片文件名
    pub image_name: String,
    /// 相对图片目录的 POSIX 风格路径
    pub rel_path: String,
    /// 嵌入向量
    pub embedding: Vec<f64>,
    /// 向量维数
    pub embedding_dim: usize,
    /// 生成向量的模型名称
    pub model_name: String,
}

/// 一条查询结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueryResult {
    /// 图片文件名
    pub image_name: String,
    /// 相对图片目录的 POSIX 风格路径
    pub rel_path: String,
    /// 与查询向量的余弦相似度
    pub cosine_sim: f64,
}

/// 向量库，负责图片向量的存取与余弦相似度查询
#[derive(Debug)]
pub struct VectorStore {
    pool: SqlitePool,
    table: String,
}

impl VectorStore {
    /// 打开向量库，数据库文件不存在时自动创建
    pub async fn open(conf_dir: &ConfDir, opts: &StoreOptions) -> Result<Self, StoreError> {
        check_ident(&opts.dataset)?;
        check_ident(&opts.table)?;

        std::fs::create_dir_all(conf_dir.path())?;

        let filename = conf_dir.database(&opts.dataset);
        info!("初始化数据库连接: {}", filename.display());

        let options = SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .filename(&filename)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await.map_err(StoreError::Connect)?;

        Ok(Self { pool, table: opts.table.clone() })
    }

    /// 确保向量表存在
    ///
    /// `recreate` 为真时先删除旧表，已有记录全部丢弃
    pub async fn ensure_schema(&self, recreate: bool) -> Result<(), StoreError> {
        if recreate {
            info!("重建向量表: {}", self.table);
            sqlx::query(&format!("DROP TABLE IF EXISTS {}", self.table))
                .execute(&self.pool)
                .await
                .map_err(StoreError::Provision)?;
        }

        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                image_name TEXT NOT NULL,
                rel_path TEXT NOT NULL,
                embedding BLOB,
                embedding_dim INTEGER NOT NULL,
                model_name TEXT NOT NULL,
                inserted_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await.map_err(StoreError::Provision)?;

        Ok(())
    }

    /// 批量写入记录，整批一个事务，返回写入的行数
    ///
    /// `truncate` 为真时先清空旧记录。写入前校验每条记录的向量，
    /// 任何一条不合法则整批失败。不做 rel_path 去重，重复写入会产生重复记录
    pub async fn bulk_load(
        &self,
        records: &[EmbeddingRecord],
        truncate: bool,
    ) -> Result<u64, StoreError> {
        for record in records {
            if record.embedding.is_empty() {
                return Err(StoreError::InvalidRecord { rel_path: record.rel_path.clone() });
            }
            if record.embedding.len() != record.embedding_dim {
                return Err(StoreError::DimensionMismatch {
                    rel_path: record.rel_path.clone(),
                    expected: record.embedding_dim,
                    actual: record.embedding.len(),
                });
            }
        }

        let mut tx = self.pool.begin().await.map_err(StoreError::BulkLoad)?;

        if truncate {
            sqlx::query(&format!("DELETE FROM {}", self.table))
                .execute(&mut *tx)
                .await
                .map_err(StoreError::BulkLoad)?;
        }

        let sql = format!(
            r#"
            INSERT INTO {} (image_name, rel_path, embedding, embedding_dim, model_name)
            VALUES (?, ?, ?, ?, ?)
            "#,
            self.table
        );
        let mut written = 0;
        for record in records {
            sqlx::query(&sql)
                .bind(&record.image_name)
                .bind(&record.rel_path)
                .bind(encode_vector(&record.embedding))
                .bind(record.embedding_dim as i64)
                .bind(&record.model_name)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::BulkLoad)?;
            written += 1;
        }

        tx.commit().await.map_err(StoreError::BulkLoad)?;

        Ok(written)
    }

    /// 余弦相似度 top-K 查询，结果按相似度降序
    ///
    /// 全表扫描逐行计算相似度，跳过 embedding 为 NULL 的行
    pub async fn query_top_k(
        &self,
        query: &[f64],
        top_k: usize,
    ) -> Result<Vec<QueryResult>, StoreError> {
        if top_k == 0 {
            return Err(StoreError::InvalidTopK);
        }

        let sql = format!(
            "SELECT image_name, rel_path, embedding FROM {} WHERE embedding IS NOT NULL",
            self.table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(StoreError::Query)?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let image_name: String = row.try_get("image_name").map_err(StoreError::Query)?;
            let rel_path: String = row.try_get("rel_path").map_err(StoreError::Query)?;
            let blob: Vec<u8> = row.try_get("embedding").map_err(StoreError::Query)?;

            let embedding = decode_vector(&blob, &rel_path)?;
            if embedding.len() != query.len() {
                return Err(StoreError::DimensionMismatch {
                    rel_path,
                    expected: query.len(),
                    actual: embedding.len(),
                });
            }

            let cosine_sim = cosine_similarity(query, &embedding);
            results.push(QueryResult { image_name, rel_path, cosine_sim });
        }

        // 相同相似度按 rel_path 排序，保证结果稳定
        results.sort_by(|a, b| {
            b.cosine_sim.total_cmp(&a.cosine_sim).then_with(|| a.rel_path.cmp(&b.rel_path))
        });
        results.truncate(top_k);

        Ok(results)
    }

    /// 表中记录总数，包括 embedding 为 NULL 的行
    pub async fn count(&self) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) AS count FROM {}", self.table);
        let row = sqlx::query(&sql).fetch_one(&self.pool).await.map_err(StoreError::Query)?;
        let count: i64 = row.try_get("count").map_err(StoreError::Query)?;
        Ok(count as u64)
    }
}

fn check_ident(name: &str) -> Result<(), StoreError> {
    if RE_IDENT.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdent(name.to_string()))
    }
}

/// 余弦相似度，零向量按 0 处理
fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// 向量编码为小端 f64 字节序列
fn encode_vector(v: &[f64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(v.len() * 8);
    for x in v {
        buf.extend_from_slice(&x.to_le_bytes());
    }
    buf
}

fn decode_vector(blob: &[u8], rel_path: &str) -> Result<Vec<f64>, StoreError> {
    if blob.len() % 8 != 0 {
        return Err(StoreError::InvalidVector { rel_path: rel_path.to_string(), len: blob.len() });
    }
    let mut out = Vec::with_capacity(blob.len() / 8);
    for chunk in blob.chunks_exact(8) {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(chunk);
        out.push(f64::from_le_bytes(arr));
    }
    Ok(out)
}
