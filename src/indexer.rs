use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use log::{info, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::embed::Embedder;
use crate::store::{EmbeddingRecord, VectorStore};
use crate::utils::{pb_style, posix_rel_path};

/// 一次索引运行的统计
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexReport {
    /// 扫描到的图片数量
    pub found: usize,
    /// 嵌入失败被跳过的数量
    pub skipped: usize,
    /// 实际写入的记录数量
    pub loaded: u64,
}

/// 扫描目录下所有后缀匹配的图片文件
pub fn collect_images(root: &Path, re_suf: &Regex) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| {
            entry.ok().and_then(|entry| {
                let path = entry.path();
                if path.is_file() {
                    if let Some(ext) = path.extension() {
                        if re_suf.is_match(&ext.to_string_lossy()) {
                            return Some(path.to_path_buf());
                        }
                    }
                }
                None
            })
        })
        .collect()
}

/// 扫描 `root` 下的图片，逐张嵌入后批量写入向量库
///
/// 单张图片嵌入失败只告警跳过，不会中断整个流程。
/// `recreate` 为真时重建表并清空旧记录，否则追加写入
pub async fn index_directory<E: Embedder>(
    embedder: &E,
    store: &VectorStore,
    root: &Path,
    re_suf: &Regex,
    recreate: bool,
) -> anyhow::Result<IndexReport> {
    store.ensure_schema(recreate).await?;

    info!("开始扫描目录: {}", root.display());
    let images = collect_images(root, re_suf);
    info!("扫描完成，共 {} 张图片", images.len());

    let mut report = IndexReport { found: images.len(), ..Default::default() };
    let mut records = Vec::with_capacity(images.len());

    let pb = ProgressBar::new(images.len() as u64).with_style(pb_style());
    for path in &images {
        match embedder.embed_image(path, None).await {
            Ok(embedding) => {
                let rel_path = posix_rel_path(path, root)?;
                let image_name = path
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| rel_path.clone());
                records.push(EmbeddingRecord {
                    image_name,
                    rel_path,
                    embedding_dim: embedding.len(),
                    embedding,
                    model_name: embedder.model_name().to_string(),
                });
            }
            Err(e) => {
                warn!("嵌入失败，跳过 {}: {}", path.display(), e);
                report.skipped += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("嵌入完成");

    if records.is_empty() {
        warn!("没有可写入的记录，向量库保持不变");
        return Ok(report);
    }

    report.loaded = store.bulk_load(&records, recreate).await?;
    Ok(report)
}
