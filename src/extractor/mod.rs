mod precomputed;
#[cfg(feature = "opencv")]
mod sift;

use std::path::Path;

pub use self::precomputed::*;
#[cfg(feature = "opencv")]
pub use self::sift::*;
use crate::config::{ExtractOptions, ExtractorKind};
use crate::error::{Error, Result};
use crate::features::Features;

/// 局部特征提取器
pub trait Extractor: Send + Sync {
    /// 从图片文件内容提取特征点和描述符，无法解码时返回 [`Error::ExtractionFailed`]
    fn extract(&self, bytes: &[u8]) -> Result<Features>;

    fn extract_file(&self, path: &Path) -> Result<Features> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::extraction(format!("{}: {e}", path.display())))?;
        self.extract(&bytes)
    }
}

pub fn create_extractor(opts: &ExtractOptions) -> Result<Box<dyn Extractor>> {
    match opts.extractor {
        ExtractorKind::Precomputed => Ok(Box::new(PrecomputedExtractor)),
        #[cfg(feature = "opencv")]
        ExtractorKind::Sift => Ok(Box::new(SiftExtractor::new(opts.clone()))),
        #[cfg(not(feature = "opencv"))]
        ExtractorKind::Sift => {
            Err(Error::Unsupported("SIFT 需要启用 opencv feature 重新编译".to_string()))
        }
    }
}
