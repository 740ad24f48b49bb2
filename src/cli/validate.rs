use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::task::spawn_blocking;

use crate::IMDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{ExtractOptions, Opts};
use crate::extractor::create_extractor;
use crate::imdb::{remove_files, validate_corpus};
use crate::utils::suffix_regex;

#[derive(Parser, Debug, Clone)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    /// 图片所在目录
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,png,webp")]
    pub suffix: String,
    /// 删除无法提取特征点的图片
    #[arg(long)]
    pub remove: bool,
}

impl SubCommandExtend for ValidateCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let extractor = create_extractor(&self.extract)?;
        let path = self.path.clone();
        let suffix = suffix_regex(&self.suffix);
        let unreadable =
            spawn_blocking(move || validate_corpus(&path, &suffix, extractor.as_ref())).await?;

        for path in &unreadable {
            println!("{}", path.display());
        }
        info!("共 {} 张无法读取的图片", unreadable.len());

        if self.remove && !unreadable.is_empty() {
            let db = IMDBBuilder::new(opts.conf_dir.clone()).open().await?;
            let forgotten = db.remove_images(&unreadable).await?;
            let removed = spawn_blocking(move || remove_files(&unreadable)).await??;
            info!("已删除 {removed} 张图片，其中 {forgotten} 张已入库");
        }
        Ok(())
    }
}
