use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::server::ServerCommand;
use crate::embed::Embedder;
use crate::service::SearchService;

/// 应用状态
pub struct AppState<E> {
    /// 搜索服务
    pub service: SearchService<E>,
    /// 图片目录，对应 /static 路径
    pub static_dir: PathBuf,
    /// 默认返回的结果数量
    pub top_k: usize,
}

impl<E: Embedder> AppState<E> {
    pub fn new(service: SearchService<E>, opts: &ServerCommand) -> Arc<Self> {
        Arc::new(Self {
            service,
            static_dir: opts.static_dir.clone(),
            top_k: opts.search.top_k,
        })
    }
}
