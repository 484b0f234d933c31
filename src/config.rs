use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "", "mmsearch").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

#[derive(Parser, Debug, Clone)]
pub struct EmbedOptions {
    /// GCP 项目 ID
    #[arg(long, value_name = "PROJECT", env = "GCP_PROJECT", default_value = "")]
    pub project: String,
    /// Vertex AI 区域
    #[arg(long, value_name = "LOCATION", env = "VERTEX_LOCATION", default_value = "us-central1")]
    pub location: String,
    /// 多模态嵌入模型名称
    #[arg(long, value_name = "MODEL", env = "MME_MODEL", default_value = "multimodalembedding@001")]
    pub model: String,
    /// 嵌入向量维数
    #[arg(long, value_name = "N", env = "EMBEDDING_DIM", default_value_t = 1408)]
    pub dim: usize,
    /// 嵌入服务地址，不填则根据 project/location/model 推导
    #[arg(long, value_name = "URL", env = "MME_ENDPOINT")]
    pub endpoint: Option<String>,
    /// 请求认证 token，即 `gcloud auth print-access-token` 的输出
    #[arg(long, value_name = "TOKEN", env = "GCP_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct StoreOptions {
    /// 向量库名称，对应配置目录下的同名数据库文件
    #[arg(long, value_name = "NAME", env = "MMSEARCH_DATASET", default_value = "embeddings")]
    pub dataset: String,
    /// 向量表名称
    #[arg(long, value_name = "NAME", env = "MMSEARCH_TABLE", default_value = "image_embeddings")]
    pub table: String,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 返回的结果数量
    #[arg(short = 'k', long, value_name = "K", env = "TOP_K", default_value_t = 5)]
    pub top_k: usize,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "mmsearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// mmsearch 配置文件目录
    #[arg(short, long, env = "MMSEARCH_CONF_DIR", default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 扫描图片目录并写入向量库
    Index(IndexCommand),
    /// 用自然语言描述搜索图片
    Search(SearchCommand),
    /// 启动 HTTP 搜索服务
    Server(ServerCommand),
}

/// 配置目录
#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回向量库对应的数据库文件路径
    pub fn database(&self, dataset: &str) -> PathBuf {
        self.path.join(format!("{dataset}.db"))
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}
