use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 降维器，索引与查询必须使用同一个实例
pub trait Reducer: Send + Sync {
    fn input_dim(&self) -> usize;

    fn output_dim(&self) -> usize;

    fn transform(&self, x: &[f32]) -> Result<Vec<f32>>;
}

/// 主成分分析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    input_dim: usize,
    output_dim: usize,
    mean: Vec<f32>,
    /// output_dim 行 input_dim 列的主成分矩阵
    components: Vec<f32>,
}

impl Pca {
    /// 在按行连续存放的 n 个 dim 维向量上拟合，保留 min(n_components, n, dim) 个主成分
    pub fn fit(data: &[f32], dim: usize, n_components: usize) -> Result<Self> {
        if dim == 0 || data.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if data.len() % dim != 0 {
            return Err(Error::DimensionMismatch { expected: dim, actual: data.len() % dim });
        }
        let n = data.len() / dim;
        let r = n_components.min(n).min(dim);
        info!("对 {n} 组 {dim} 维向量进行 PCA，保留 {r} 个主成分");

        let data = data.iter().map(|v| *v as f64).collect::<Vec<_>>();
        let mut x = DMatrix::<f64>::from_row_slice(n, dim, &data);
        let mean = x.row_mean();
        for j in 0..dim {
            x.column_mut(j).add_scalar_mut(-mean[j]);
        }

        let components = if dim <= n {
            // 协方差矩阵 dim x dim
            let cov = x.transpose() * &x;
            top_eigenvectors(cov, r).into_iter().map(|(_, v)| v).collect::<Vec<_>>()
        } else {
            // 样本数少于维度时改用 n x n 的 Gram 矩阵，u 为其特征向量时 X^T u 为主成分方向
            let gram = &x * x.transpose();
            let top = top_eigenvectors(gram, r);
            let lmax = top.first().map(|(l, _)| *l).unwrap_or(0.0);
            top.into_iter()
                .map(|(l, u)| {
                    if l <= 1e-10 * lmax {
                        return DVector::zeros(dim);
                    }
                    let v = x.transpose() * u;
                    let norm = v.norm();
                    v / norm
                })
                .collect()
        };

        let mut flat = Vec::with_capacity(r * dim);
        for mut c in components {
            // 固定符号，使得绝对值最大的分量为正
            let imax = c.iamax();
            if c[imax] < 0.0 {
                c.neg_mut();
            }
            flat.extend(c.iter().map(|v| *v as f32));
        }

        debug!("PCA 拟合完成");
        Ok(Self {
            input_dim: dim,
            output_dim: r,
            mean: mean.iter().map(|v| *v as f32).collect(),
            components: flat,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(reader)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }
}

impl Reducer for Pca {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn transform(&self, x: &[f32]) -> Result<Vec<f32>> {
        if x.len() != self.input_dim {
            return Err(Error::DimensionMismatch { expected: self.input_dim, actual: x.len() });
        }
        let y = self
            .components
            .chunks_exact(self.input_dim)
            .map(|c| c.iter().zip(x).zip(&self.mean).map(|((c, x), m)| c * (x - m)).sum())
            .collect();
        Ok(y)
    }
}

/// 对称矩阵按特征值从大到小排列的前 r 个特征值与特征向量
fn top_eigenvectors(m: DMatrix<f64>, r: usize) -> Vec<(f64, DVector<f64>)> {
    let eig = m.symmetric_eigen();
    let mut order = (0..eig.eigenvalues.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));
    order
        .into_iter()
        .take(r)
        .map(|i| (eig.eigenvalues[i], eig.eigenvectors.column(i).into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 分布在直线 y = 2x 附近的二维点
    fn line_points() -> Vec<f32> {
        let mut x = vec![];
        for i in 0..20 {
            let t = i as f32 - 10.;
            let noise = if i % 2 == 0 { 0.05 } else { -0.05 };
            x.push(t + 1.);
            x.push(2. * t + 3. + noise);
        }
        x
    }

    #[test]
    fn test_pca_main_direction() {
        let pca = Pca::fit(&line_points(), 2, 1).unwrap();
        assert_eq!(pca.output_dim(), 1);
        let c = &pca.components;
        let expected = [1. / 5f32.sqrt(), 2. / 5f32.sqrt()];
        assert!((c[0] - expected[0]).abs() < 1e-2, "{c:?}");
        assert!((c[1] - expected[1]).abs() < 1e-2, "{c:?}");
    }

    #[test]
    fn test_pca_transform_centers_data() {
        let pca = Pca::fit(&line_points(), 2, 2).unwrap();
        // 均值为 (0.5, 2)，投影应接近 0
        let y = pca.transform(&[0.5, 2.]).unwrap();
        assert!(y.iter().all(|v| v.abs() < 1e-4), "{y:?}");
    }

    #[test]
    fn test_pca_preserves_distances_in_full_rank() {
        let data = line_points();
        let pca = Pca::fit(&data, 2, 2).unwrap();
        let a = pca.transform(&data[0..2]).unwrap();
        let b = pca.transform(&data[10..12]).unwrap();
        let d1 = crate::utils::l2_sq(&data[0..2], &data[10..12]);
        let d2 = crate::utils::l2_sq(&a, &b);
        assert!((d1 - d2).abs() < 1e-2);
    }

    #[test]
    fn test_pca_fewer_samples_than_dim() {
        // 3 个 6 维样本，最多只有 3 个主成分
        let data = vec![
            1., 0., 0., 0., 0., 0., //
            0., 1., 0., 0., 0., 0., //
            0., 0., 1., 0., 0., 0.,
        ];
        let pca = Pca::fit(&data, 6, 16).unwrap();
        assert_eq!(pca.output_dim(), 3);
        let y = pca.transform(&data[0..6]).unwrap();
        assert_eq!(y.len(), 3);
        // 降维前后样本间距离不变
        let z = pca.transform(&data[6..12]).unwrap();
        assert!((crate::utils::l2_sq(&y, &z) - 2.).abs() < 1e-4);
    }

    #[test]
    fn test_pca_dimension_mismatch() {
        let pca = Pca::fit(&line_points(), 2, 1).unwrap();
        assert!(matches!(
            pca.transform(&[1., 2., 3.]),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_pca_save_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pca.bin");
        let pca = Pca::fit(&line_points(), 2, 1).unwrap();
        pca.save(&path).unwrap();
        assert_eq!(Pca::open(&path).unwrap(), pca);
    }
}
