use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::vocab::KMeans;
use crate::{IMDBBuilder, Opts};

#[derive(Parser, Debug, Clone)]
pub struct TrainCommand {
    /// 聚类中心点数量，即视觉词典大小
    #[arg(short = 'k', long, default_value_t = 128)]
    pub clusters: usize,
    /// 最大迭代次数
    #[arg(short, long, default_value_t = 25)]
    pub max_iter: usize,
    /// 用于训练的最大描述符数量，不填则使用全部描述符
    #[arg(long, value_name = "N")]
    pub samples: Option<usize>,
    /// 训练前将描述符 PCA 降维到指定维度
    #[arg(long, value_name = "DIM")]
    pub descriptor_pca: Option<usize>,
    /// 随机种子
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

impl SubCommandExtend for TrainCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = IMDBBuilder::new(opts.conf_dir.clone())
            .descriptor_reduction(self.descriptor_pca)
            .open()
            .await?;
        let kmeans = KMeans {
            max_iter: self.max_iter,
            max_samples: self.samples,
            seed: self.seed,
            ..KMeans::new(self.clusters)
        };
        db.train_vocabulary(kmeans).await?;
        info!("训练视觉词典成功");
        Ok(())
    }
}
