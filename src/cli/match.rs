use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::task::spawn_blocking;

use crate::cli::SubCommandExtend;
use crate::config::{ExtractOptions, Opts, VerifyOptions};
use crate::error::Error;
use crate::extractor::create_extractor;
use crate::verify::Verifier;

#[derive(Parser, Debug, Clone)]
pub struct MatchCommand {
    #[command(flatten)]
    pub extract: ExtractOptions,
    #[command(flatten)]
    pub verify: VerifyOptions,
    /// 图片1
    pub image1: PathBuf,
    /// 图片2
    pub image2: PathBuf,
}

impl SubCommandExtend for MatchCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let extractor = create_extractor(&self.extract)?;
        let verifier = Verifier::new(self.verify.clone());
        let (image1, image2) = (self.image1.clone(), self.image2.clone());

        let score = spawn_blocking(move || -> crate::Result<usize> {
            let f1 = extractor.extract_file(&image1)?;
            let f2 = extractor.extract_file(&image2)?;
            info!("特征点数量: {} / {}", f1.len(), f2.len());
            match verifier.score(&f1, &f2) {
                Err(Error::InsufficientCorrespondences(n)) => {
                    info!("匹配点不足: {n}");
                    Ok(0)
                }
                r => r,
            }
        })
        .await??;

        println!("{score}");
        Ok(())
    }
}
