use std::convert::Infallible;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::warn;

use crate::cli::SubCommandExtend;
use crate::config::{EmbedOptions, Opts, SearchOptions, StoreOptions};
use crate::embed::MMEClient;
use crate::service::SearchService;
use crate::store::{QueryResult, VectorStore};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub embed: EmbedOptions,
    #[command(flatten)]
    pub store: StoreOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 查询文本
    pub query: String,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let embedder = MMEClient::new(&self.embed)?;
        let store = VectorStore::open(&opts.conf_dir, &self.store).await?;
        let service = SearchService::new(embedder, store);

        let result = service.search(&self.query, self.search.top_k).await?;
        if result.is_empty() {
            warn!("没有找到匹配的图片");
        }

        print_result(&result, self)
    }
}

fn print_result(result: &[QueryResult], opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for item in result {
                println!("{:.4}\t{}", item.cosine_sim, item.rel_path);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone)]
pub enum OutputFormat {
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            _ => unreachable!(),
        }
    }
}
