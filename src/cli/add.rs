use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::IMDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{ExtractOptions, Opts};
use crate::extractor::{Extractor, create_extractor};
use crate::imdb::AddOutcome;
use crate::utils::suffix_regex;

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    /// 图片或目录的路径
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,png,webp")]
    pub suffix: String,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let extractor: Arc<dyn Extractor> = Arc::from(create_extractor(&self.extract)?);
        let db = IMDBBuilder::new(opts.conf_dir.clone())
            .corpus_path(&self.path)
            .descriptor_count(self.extract.descriptor_count)
            .open()
            .await?;

        if self.path.is_file() {
            let bytes = tokio::fs::read(&self.path).await?;
            let name = self.path.to_string_lossy();
            match db.add_image(&name, bytes, extractor).await? {
                AddOutcome::Added(id) => info!("添加图片 {id}: {name}"),
                AddOutcome::Updated(id) => info!("更新图片路径 {id}: {name}"),
            }
            return Ok(());
        }

        let report = db.add_corpus(extractor, &suffix_regex(&self.suffix)).await?;
        println!(
            "added: {}\tupdated: {}\tfailed: {}",
            report.added, report.updated, report.failed
        );
        Ok(())
    }
}
