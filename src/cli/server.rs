use std::path::PathBuf;

use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use crate::cli::SubCommandExtend;
use crate::config::{EmbedOptions, Opts, SearchOptions, StoreOptions};
use crate::embed::MMEClient;
use crate::server;
use crate::service::SearchService;
use crate::store::VectorStore;

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub embed: EmbedOptions,
    #[command(flatten)]
    pub store: StoreOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 图片所在目录，对应 /static 路径
    #[arg(long, value_name = "DIR", env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: String,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let embedder = MMEClient::new(&self.embed)?;
        let store = VectorStore::open(&opts.conf_dir, &self.store).await?;
        let service = SearchService::new(embedder, store);

        // 创建应用状态
        let state = server::AppState::new(service, self);

        // 创建应用
        let app = server::create_app(state);

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
