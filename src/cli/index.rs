use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use log::info;
use regex::Regex;

use crate::cli::SubCommandExtend;
use crate::config::{EmbedOptions, Opts, StoreOptions};
use crate::embed::MMEClient;
use crate::indexer::index_directory;
use crate::store::VectorStore;

/// 扫描图片目录并写入向量库
///
/// 默认追加写入且不对 rel_path 去重，重复运行会产生重复记录，
/// 需要重新构建时使用 --recreate
#[derive(Parser, Debug, Clone)]
pub struct IndexCommand {
    #[command(flatten)]
    pub embed: EmbedOptions,
    #[command(flatten)]
    pub store: StoreOptions,
    /// 图片所在目录
    #[arg(long, value_name = "DIR", env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, env = "IMAGE_EXTS", default_value = "jpg,jpeg,png,bmp,gif")]
    pub suffix: String,
    /// 重建向量表，清空已有记录后再写入
    #[arg(long)]
    pub recreate: bool,
}

impl SubCommandExtend for IndexCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        if !self.static_dir.is_dir() {
            bail!("图片目录不存在: {}", self.static_dir.display());
        }

        let re_suf = format!("(?i)^({})$", self.suffix.replace(',', "|"));
        let re_suf = Regex::new(&re_suf).expect("failed to build regex");

        let embedder = MMEClient::new(&self.embed)?;
        let store = VectorStore::open(&opts.conf_dir, &self.store).await?;

        let report =
            index_directory(&embedder, &store, &self.static_dir, &re_suf, self.recreate).await?;

        info!(
            "索引完成：共 {} 张图片，跳过 {}，写入 {} 条记录",
            report.found, report.skipped, report.loaded
        );
        Ok(())
    }
}
