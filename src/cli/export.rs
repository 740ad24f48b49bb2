use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use ndarray::Array1;
use ndarray_npy::write_npy;

use crate::cli::SubCommandExtend;
use crate::{IMDBBuilder, Opts};

#[derive(Parser, Debug, Clone)]
pub struct ExportCommand {
    /// VLAD 向量输出路径
    #[arg(short, long, default_value = "signatures.npy")]
    pub output: PathBuf,
    /// 图片 ID 输出路径，行顺序与 VLAD 向量一致
    #[arg(long, value_name = "PATH")]
    pub ids: Option<PathBuf>,
}

impl SubCommandExtend for ExportCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = IMDBBuilder::new(opts.conf_dir.clone()).open().await?;
        let (ids, data) = db.export_signatures().await?;
        write_npy(&self.output, &data)?;
        if let Some(path) = &self.ids {
            write_npy(path, &Array1::from(ids))?;
        }
        info!("导出成功：{} x {}", data.nrows(), data.ncols());
        Ok(())
    }
}
