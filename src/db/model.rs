use sqlx::FromRow;

use crate::error::{Error, Result};
use crate::features::{Features, KeyPoint};

/// 图片记录
#[derive(Debug, Clone, FromRow)]
pub struct ImageRecord {
    /// 图片 ID
    pub id: i64,
    /// 图片路径
    pub path: String,
}

/// 图片特征点记录
#[derive(Debug, Clone, FromRow)]
pub struct FeaturesRecord {
    /// 图片 ID
    pub id: i64,
    /// 描述符维度
    pub dim: i64,
    /// 特征点数量
    pub count: i64,
    /// bincode 编码的特征点列表
    pub keypoints: Vec<u8>,
    /// 按行连续存放的 f32 描述符
    pub descriptors: Vec<u8>,
}

impl FeaturesRecord {
    pub fn encode(id: i64, features: &Features) -> Result<Self> {
        Ok(Self {
            id,
            dim: features.dim() as i64,
            count: features.len() as i64,
            keypoints: bincode::serialize(features.keypoints())?,
            descriptors: bytemuck::cast_slice(features.descriptors()).to_vec(),
        })
    }

    pub fn decode(&self) -> Result<Features> {
        let keypoints: Vec<KeyPoint> = bincode::deserialize(&self.keypoints)?;
        if keypoints.len() != self.count as usize {
            return Err(Error::DimensionMismatch {
                expected: self.count as usize,
                actual: keypoints.len(),
            });
        }
        // blob 不保证 4 字节对齐，不能直接 cast
        let descriptors = bytemuck::pod_collect_to_vec::<u8, f32>(&self.descriptors);
        Features::new(self.dim as usize, keypoints, descriptors)
    }
}

/// VLAD 向量记录
#[derive(Debug, Clone, FromRow)]
pub struct SignatureRecord {
    /// 图片 ID
    pub id: i64,
    /// 按 f32 存放的 VLAD 向量
    pub vector: Vec<u8>,
}

impl SignatureRecord {
    pub fn encode(id: i64, vector: &[f32]) -> Self {
        Self { id, vector: bytemuck::cast_slice(vector).to_vec() }
    }

    pub fn decode(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(&self.vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_record() {
        let kps = vec![KeyPoint::new(1., 2.), KeyPoint { octave: 3, ..KeyPoint::new(4., 5.) }];
        let f = Features::new(3, kps, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        let record = FeaturesRecord::encode(9, &f).unwrap();
        assert_eq!(record.count, 2);
        assert_eq!(record.descriptors.len(), 6 * 4);
        assert_eq!(record.decode().unwrap(), f);
    }

    #[test]
    fn test_signature_record() {
        let record = SignatureRecord::encode(1, &[0.5, -0.25]);
        assert_eq!(record.decode(), vec![0.5, -0.25]);
    }
}
