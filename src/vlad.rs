//! VLAD 聚合
//!
//! 将一张图片的局部描述符按视觉词典聚合为 K * D 维的定长向量：
//! 对每个聚类中心累加残差，再依次做幂归一化和 L2 归一化。

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::features::Features;
use crate::vocab::Vocabulary;

/// 计算一张图片的 VLAD 向量
///
/// 描述符为空或者归一化前范数为 0 时返回 [`Error::EmptySignature`]
pub fn aggregate<V: Vocabulary + ?Sized>(features: &Features, vocab: &V) -> Result<Vec<f32>> {
    if features.is_empty() {
        return Err(Error::EmptySignature);
    }
    let (k, d) = (vocab.len(), vocab.dim());
    if features.dim() != d {
        return Err(Error::DimensionMismatch { expected: d, actual: features.dim() });
    }

    // 使用 f64 累加，降低描述符顺序对结果的影响
    let mut residuals = vec![0f64; k * d];
    for x in features.rows() {
        let i = vocab.assign(x);
        let block = &mut residuals[i * d..(i + 1) * d];
        for ((r, x), c) in block.iter_mut().zip(x).zip(vocab.center(i)) {
            *r += (*x - *c) as f64;
        }
    }

    let mut v = residuals.into_iter().map(|x| x as f32).collect::<Vec<_>>();
    power_normalize(&mut v);
    l2_normalize(&mut v)?;
    Ok(v)
}

/// 并行计算多张图片的 VLAD 向量，每张图片的结果互不影响
pub fn aggregate_batch<V: Vocabulary + ?Sized>(
    features: &[Features],
    vocab: &V,
) -> Vec<Result<Vec<f32>>> {
    features.par_iter().map(|f| aggregate(f, vocab)).collect()
}

/// 幂归一化：v ← sign(v) * sqrt(|v|)
pub fn power_normalize(v: &mut [f32]) {
    for x in v.iter_mut() {
        *x = x.abs().sqrt().copysign(*x);
    }
}

/// L2 归一化，范数为 0 时返回 [`Error::EmptySignature`]
pub fn l2_normalize(v: &mut [f32]) -> Result<()> {
    let norm = v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(Error::EmptySignature);
    }
    for x in v.iter_mut() {
        *x = (*x as f64 / norm) as f32;
    }
    Ok(())
}
