mod kmeans;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub use self::kmeans::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::l2_sq;

/// 视觉词典：K 个 D 维聚类中心
pub trait Vocabulary: Send + Sync {
    /// 聚类中心数量 K
    fn len(&self) -> usize;

    /// 描述符维度 D
    fn dim(&self) -> usize;

    /// 按顺序排列的所有聚类中心，长度为 K * D
    fn centers(&self) -> &[f32];

    /// 返回描述符所属的聚类中心编号
    fn assign(&self, descriptor: &[f32]) -> usize;

    fn center(&self, i: usize) -> &[f32] {
        let d = self.dim();
        &self.centers()[i * d..(i + 1) * d]
    }
}

/// 聚类算法，从一组描述符训练出视觉词典
pub trait Clusterer {
    /// data 为按行连续存放的 n 个 dim 维向量
    fn train(&self, data: &[f32], dim: usize) -> Result<CentroidVocabulary>;
}

/// 以最近中心作为分配规则的视觉词典
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidVocabulary {
    dim: usize,
    centers: Vec<f32>,
}

impl CentroidVocabulary {
    pub fn new(dim: usize, centers: Vec<f32>) -> Result<Self> {
        if dim == 0 || centers.is_empty() || centers.len() % dim != 0 {
            return Err(Error::DimensionMismatch { expected: dim, actual: centers.len() });
        }
        Ok(Self { dim, centers })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let vocab: Self = bincode::deserialize_from(reader)?;
        Ok(vocab)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }
}

impl Vocabulary for CentroidVocabulary {
    fn len(&self) -> usize {
        self.centers.len() / self.dim
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn centers(&self) -> &[f32] {
        &self.centers
    }

    fn assign(&self, descriptor: &[f32]) -> usize {
        nearest_center(descriptor, &self.centers, self.dim).0
    }
}

/// 返回最近的中心编号与平方距离，距离相同时取编号较小者
pub(crate) fn nearest_center(x: &[f32], centers: &[f32], dim: usize) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (i, c) in centers.chunks_exact(dim).enumerate() {
        let d = l2_sq(x, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_nearest() {
        let vocab = CentroidVocabulary::new(2, vec![0., 0., 10., 0., 0., 10.]).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.assign(&[1., 1.]), 0);
        assert_eq!(vocab.assign(&[9., -1.]), 1);
        assert_eq!(vocab.assign(&[2., 8.]), 2);
        assert_eq!(vocab.center(1), &[10., 0.]);
    }

    #[test]
    fn test_assign_tie_prefers_lower_id() {
        let vocab = CentroidVocabulary::new(1, vec![-1., 1.]).unwrap();
        assert_eq!(vocab.assign(&[0.]), 0);
    }

    #[test]
    fn test_invalid_centers() {
        assert!(CentroidVocabulary::new(3, vec![0.; 4]).is_err());
        assert!(CentroidVocabulary::new(0, vec![]).is_err());
    }

    #[test]
    fn test_save_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabulary.bin");
        let vocab = CentroidVocabulary::new(2, vec![0.5, 1.5, -2., 3.]).unwrap();
        vocab.save(&path).unwrap();
        assert_eq!(CentroidVocabulary::open(&path).unwrap(), vocab);
    }
}
