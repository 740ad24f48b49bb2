use serde::{Deserialize, Serialize};

use super::Extractor;
use crate::error::{Error, Result};
use crate::features::{Features, KeyPoint};

/// 由外部工具提前计算好的特征点，JSON 格式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturesFile {
    /// 描述符维度，没有描述符时用于确定维度
    #[serde(default)]
    pub dim: Option<usize>,
    pub keypoints: Vec<KeyPoint>,
    pub descriptors: Vec<Vec<f32>>,
}

impl FeaturesFile {
    pub fn into_features(self) -> Result<Features> {
        if self.keypoints.len() != self.descriptors.len() {
            return Err(Error::extraction(format!(
                "特征点数量 {} 与描述符数量 {} 不一致",
                self.keypoints.len(),
                self.descriptors.len()
            )));
        }
        let dim = self.dim.or_else(|| self.descriptors.first().map(Vec::len)).unwrap_or(0);
        if let Some(row) = self.descriptors.iter().find(|row| row.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, actual: row.len() });
        }
        let descriptors = self.descriptors.into_iter().flatten().collect();
        Features::new(dim, self.keypoints, descriptors)
    }
}

impl From<&Features> for FeaturesFile {
    fn from(f: &Features) -> Self {
        Self {
            dim: Some(f.dim()),
            keypoints: f.keypoints().to_vec(),
            descriptors: f.rows().map(<[f32]>::to_vec).collect(),
        }
    }
}

/// 读取 [`FeaturesFile`] 的提取器
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputedExtractor;

impl Extractor for PrecomputedExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Features> {
        let file: FeaturesFile = serde_json::from_slice(bytes).map_err(Error::extraction)?;
        file.into_features()
    }
}
