use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::cli::SubCommandExtend;
use crate::config::{ExtractOptions, Opts, SearchOptions, VerifyOptions};
use crate::extractor::{Extractor, create_extractor};
use crate::{IMDBBuilder, SearchResult};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    #[command(flatten)]
    pub verify: VerifyOptions,
    /// 被搜索的图片路径
    pub image: PathBuf,
    /// 输出格式
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let extractor: Arc<dyn Extractor> = Arc::from(create_extractor(&self.extract)?);
        let bytes = tokio::fs::read(&self.image).await?;

        let db = IMDBBuilder::new(opts.conf_dir.clone()).open().await?;
        let result = db.search_image(bytes, extractor, &self.search, &self.verify).await?;

        print_result(&result, self.output_format)
    }
}

fn print_result(result: &[SearchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for r in result {
                println!("{}\t{:.4}\t{}", r.score, r.distance, r.path);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
