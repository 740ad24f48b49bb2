use ::kmeans::{EuclideanDistance, KMeansConfig, KMeansState};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

use super::{CentroidVocabulary, Clusterer};
use crate::error::{Error, Result};

/// SIMD 宽度，输入会补零到它的整数倍
const LANES: usize = 16;

/// K-means 聚类，从随机采样的向量出发做 Lloyd 迭代
#[derive(Debug, Clone)]
pub struct KMeans {
    /// 聚类中心数量
    pub k: usize,
    /// 最大迭代次数
    pub max_iter: usize,
    /// 参与训练的最大向量数量，超过时随机采样
    pub max_samples: Option<usize>,
    pub seed: u64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self { k, max_iter: 100, max_samples: None, seed: 0 }
    }
}

impl Clusterer for KMeans {
    fn train(&self, data: &[f32], dim: usize) -> Result<CentroidVocabulary> {
        if dim == 0 || data.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if data.len() % dim != 0 {
            return Err(Error::DimensionMismatch { expected: dim, actual: data.len() % dim });
        }
        let n = data.len() / dim;
        if n < self.k || self.k == 0 {
            return Err(Error::NotEnoughSamples { samples: n, clusters: self.k });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);

        let rows = match self.max_samples {
            Some(m) if m < n && m >= self.k => {
                info!("从 {n} 组向量中随机采样 {m} 组用于训练");
                let mut idx = sample(&mut rng, n, m).into_vec();
                idx.sort_unstable();
                idx
            }
            _ => (0..n).collect(),
        };
        let n = rows.len();

        // 补零不改变欧氏距离和均值
        let stride = dim.next_multiple_of(LANES);
        let mut x = vec![0f32; n * stride];
        for (dst, &i) in x.chunks_exact_mut(stride).zip(&rows) {
            dst[..dim].copy_from_slice(&data[i * dim..(i + 1) * dim]);
        }

        let init = sample(&mut rng, n, self.k)
            .into_iter()
            .flat_map(|i| x[i * stride..(i + 1) * stride].iter().copied())
            .collect::<Vec<_>>();

        info!("对 {n} 组 {dim} 维向量进行聚类，中心点数量 = {}", self.k);
        let km: ::kmeans::KMeans<_, LANES, _> =
            ::kmeans::KMeans::new(&x, n, stride, EuclideanDistance);
        let conf = KMeansConfig::build()
            .init_done(&|_s: &KMeansState<f32>| debug!("KMeans 初始化完成"))
            .iteration_done(&|s: &KMeansState<f32>, nr: usize, new_distsum: f32| {
                debug!(
                    "第 {} 轮 - 不平衡度：{:.2} | 距离和变化：{:+.2}",
                    nr,
                    imbalance_factor(&s.centroid_frequency),
                    new_distsum - s.distsum
                );
            })
            .build();
        let state = km.kmeans_lloyd(
            self.k,
            self.max_iter,
            ::kmeans::KMeans::<f32, LANES, EuclideanDistance>::init_precomputed(init.clone()),
            &conf,
        );
        info!(
            "聚类完成，距离和：{:.2}，不平衡度：{:.2}",
            state.distsum,
            imbalance_factor(&state.centroid_frequency)
        );

        // 空聚类的中心会变成 NaN，退回初始中心
        let centroids = state.centroids.to_vec();
        let mut centers = Vec::with_capacity(self.k * dim);
        for (c, c0) in centroids.chunks_exact(stride).zip(init.chunks_exact(stride)) {
            let c = if c[..dim].iter().all(|v| v.is_finite()) { c } else { c0 };
            centers.extend_from_slice(&c[..dim]);
        }
        CentroidVocabulary::new(dim, centers)
    }
}

/// 不平衡度，1 表示完全均匀
pub fn imbalance_factor(hist: &[usize]) -> f32 {
    let (mut tot, mut uf) = (0.0, 0.0);
    for h in hist {
        let h = *h as f32;
        tot += h;
        uf += h.powf(2.0);
    }
    uf * hist.len() as f32 / tot.powf(2.0)
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::vocab::Vocabulary;

    fn blobs() -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(7);
        let centers = [[0., 0.], [20., 20.]];
        let mut x = vec![];
        for i in 0..90 {
            let c = centers[i % 2];
            x.push(c[0] + rng.random_range(-1.0..1.0));
            x.push(c[1] + rng.random_range(-1.0..1.0));
        }
        x
    }

    #[test]
    fn test_kmeans_separated_blobs() {
        let x = blobs();
        let vocab = KMeans::new(2).train(&x, 2).unwrap();
        assert_eq!(vocab.len(), 2);

        let mut centers = vocab.centers().chunks(2).map(|c| [c[0], c[1]]).collect::<Vec<_>>();
        centers.sort_by(|a, b| a[0].total_cmp(&b[0]));
        let expected = [[0., 0.], [20., 20.]];
        for (c, e) in centers.iter().zip(expected) {
            assert!((c[0] - e[0]).abs() < 1. && (c[1] - e[1]).abs() < 1., "{c:?} != {e:?}");
        }
    }

    #[test]
    fn test_kmeans_deterministic() {
        let x = blobs();
        let a = KMeans::new(2).train(&x, 2).unwrap();
        let b = KMeans::new(2).train(&x, 2).unwrap();
        for (u, v) in a.centers().iter().zip(b.centers()) {
            assert!((u - v).abs() < 1e-5);
        }
    }

    #[test]
    fn test_kmeans_sampling() {
        let x = blobs();
        let km = KMeans { max_samples: Some(30), ..KMeans::new(2) };
        let vocab = km.train(&x, 2).unwrap();
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn test_kmeans_duplicate_points() {
        let x = vec![1.0f32; 2 * 10];
        let vocab = KMeans::new(2).train(&x, 2).unwrap();
        assert_eq!(vocab.len(), 2);
        assert!(vocab.centers().iter().all(|v| v.is_finite()));
        assert_eq!(vocab.center(0), &[1., 1.]);
    }

    #[test]
    fn test_kmeans_not_enough_samples() {
        let x = vec![0.0f32; 4];
        assert!(matches!(
            KMeans::new(3).train(&x, 2),
            Err(Error::NotEnoughSamples { samples: 2, clusters: 3 })
        ));
        assert!(matches!(KMeans::new(3).train(&[], 2), Err(Error::EmptyCorpus)));
    }

    #[test]
    fn test_imbalance_factor() {
        assert!((imbalance_factor(&[2, 2, 1]) - 1.08).abs() < 0.01);
        assert!((imbalance_factor(&[5, 5]) - 1.0).abs() < 1e-6);
    }
}
