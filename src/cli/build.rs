use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::index::IndexKind;
use crate::{IMDBBuilder, Opts};

#[derive(Parser, Debug, Clone)]
pub struct BuildCommand {
    /// 近邻索引类型
    #[arg(long, value_enum, default_value_t = IndexKind::Flat)]
    pub backend: IndexKind,
    /// 将 VLAD 向量 PCA 降维到指定维度
    #[arg(long, value_name = "DIM")]
    pub signature_pca: Option<usize>,
    /// 跳过 VLAD 向量计算，直接使用数据库中已有的向量构建索引
    #[arg(long)]
    pub index_only: bool,
}

impl SubCommandExtend for BuildCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = IMDBBuilder::new(opts.conf_dir.clone())
            .signature_reduction(self.signature_pca)
            .open()
            .await?;
        if !self.index_only {
            let report = db.compute_signatures().await?;
            println!("computed: {}\tskipped: {}", report.computed, report.skipped);
        }
        db.build_index(self.backend).await?;
        info!("构建索引成功");
        Ok(())
    }
}
