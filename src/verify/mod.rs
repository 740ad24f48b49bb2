//! 几何校验
//!
//! 对近邻搜索返回的候选图片逐一做比率测试匹配和 RANSAC 单应矩阵拟合，
//! 以内点数量作为分数重新排序。

mod homography;
mod matcher;

use std::time::Instant;

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

pub use self::homography::*;
pub use self::matcher::*;
use crate::config::VerifyOptions;
use crate::error::{Error, Result};
use crate::features::Features;
use crate::index::ImageId;

/// 待校验的候选图片
#[derive(Debug, Clone)]
pub struct Candidate {
    pub image_id: ImageId,
    pub features: Features,
}

/// 通过校验的候选图片及其分数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verified {
    pub image_id: ImageId,
    pub score: usize,
}

pub struct Verifier {
    opts: VerifyOptions,
}

impl Verifier {
    pub fn new(opts: VerifyOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.opts
    }

    /// 通过比率测试得到的 (查询点坐标, 候选点坐标)
    pub fn correspondences(
        &self,
        query: &Features,
        candidate: &Features,
    ) -> (Vec<Point>, Vec<Point>) {
        ratio_match(query, candidate, self.opts.ratio)
            .into_iter()
            .map(|(qi, ti)| (query.keypoints()[qi].pt(), candidate.keypoints()[ti].pt()))
            .unzip()
    }

    /// 单个候选的分数，即单应矩阵的内点数量
    ///
    /// 匹配点少于 4 对时返回 [`Error::InsufficientCorrespondences`]
    pub fn score(&self, query: &Features, candidate: &Features) -> Result<usize> {
        if query.dim() != candidate.dim() {
            return Err(Error::DimensionMismatch { expected: query.dim(), actual: candidate.dim() });
        }
        let (src, dst) = self.correspondences(query, candidate);
        let opts = RansacOptions {
            threshold: self.opts.reproj_threshold,
            max_iters: self.opts.max_iters,
            confidence: self.opts.confidence,
            seed: self.opts.seed,
        };
        let fit = ransac_homography(&src, &dst, &opts)?;
        Ok(fit.inlier_count())
    }

    /// 匹配点不足的候选记为 0 分，维度不一致等结构性错误直接返回
    fn score_candidate(&self, query: &Features, candidate: &Candidate) -> Result<usize> {
        match self.score(query, &candidate.features) {
            Err(Error::InsufficientCorrespondences(n)) => {
                debug!("候选 {} 匹配点不足：{n}", candidate.image_id);
                Ok(0)
            }
            other => other,
        }
    }

    /// 校验所有候选，保留分数大于 min_score 的结果并按分数降序排列，分数相同时保持候选原有顺序
    pub fn verify(&self, query: &Features, candidates: &[Candidate]) -> Result<Vec<Verified>> {
        let scored = candidates
            .par_iter()
            .map(|c| {
                let score = self.score_candidate(query, c)?;
                Ok(Some(Verified { image_id: c.image_id, score }))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.rank(scored))
    }

    /// 与 [`Verifier::verify`] 相同，但超过截止时间后不再开始新的候选
    pub fn verify_until(
        &self,
        query: &Features,
        candidates: &[Candidate],
        deadline: Instant,
    ) -> Result<Vec<Verified>> {
        let scored = candidates
            .par_iter()
            .map(|c| {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                let score = self.score_candidate(query, c)?;
                Ok(Some(Verified { image_id: c.image_id, score }))
            })
            .collect::<Result<Vec<_>>>()?;
        let skipped = scored.iter().filter(|v| v.is_none()).count();
        if skipped > 0 {
            debug!("超过截止时间，跳过 {skipped} 个候选");
        }
        Ok(self.rank(scored))
    }

    fn rank(&self, scored: Vec<Option<Verified>>) -> Vec<Verified> {
        let mut result = scored
            .into_iter()
            .flatten()
            .filter(|v| v.score > self.opts.min_score)
            .collect::<Vec<_>>();
        result.sort_by(|a, b| b.score.cmp(&a.score));
        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::prelude::*;
    use rand::rngs::StdRng;

    use super::*;
    use crate::features::KeyPoint;

    fn random_features(seed: u64, n: usize) -> Features {
        let mut rng = StdRng::seed_from_u64(seed);
        let kps = (0..n)
            .map(|_| KeyPoint::new(rng.random_range(0.0..320.0), rng.random_range(0.0..240.0)))
            .collect();
        let des = (0..n * 8).map(|_| rng.random_range(0.0..1.0)).collect();
        Features::new(8, kps, des).unwrap()
    }

    #[test]
    fn test_identical_candidate_scores_all() {
        let verifier = Verifier::new(VerifyOptions::default());
        let f = random_features(1, 40);
        assert_eq!(verifier.score(&f, &f).unwrap(), 40);
        let candidates = vec![Candidate { image_id: 7, features: f.clone() }];
        let verified = verifier.verify(&f, &candidates).unwrap();
        assert_eq!(verified, vec![Verified { image_id: 7, score: 40 }]);
    }

    #[test]
    fn test_below_threshold_filtered() {
        let verifier = Verifier::new(VerifyOptions::default());
        let f = random_features(2, 20);
        assert_eq!(verifier.score(&f, &f).unwrap(), 20);
        let candidates = vec![Candidate { image_id: 1, features: f.clone() }];
        assert!(verifier.verify(&f, &candidates).unwrap().is_empty());
    }

    #[test]
    fn test_insufficient_correspondences() {
        let verifier = Verifier::new(VerifyOptions::default());
        let f = random_features(3, 3);
        assert!(matches!(verifier.score(&f, &f), Err(Error::InsufficientCorrespondences(3))));
        let empty = Features::empty(8);
        assert!(matches!(verifier.score(&empty, &f), Err(Error::InsufficientCorrespondences(0))));
    }

    #[test]
    fn test_verify_sorted_and_stable() {
        let opts = VerifyOptions { min_score: 8, ..Default::default() };
        let verifier = Verifier::new(opts);
        let q = random_features(4, 30);
        // 候选 2 只保留查询的前 10 个特征点
        let (dim, kps, des) = q.clone().into_parts();
        let part = Features::new(dim, kps[..10].to_vec(), des[..10 * dim].to_vec()).unwrap();
        let candidates = vec![
            Candidate { image_id: 1, features: random_features(5, 30) },
            Candidate { image_id: 2, features: part },
            Candidate { image_id: 3, features: q.clone() },
            Candidate { image_id: 4, features: q.clone() },
        ];
        let result = verifier.verify(&q, &candidates).unwrap();
        let ids = result.iter().map(|v| v.image_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![3, 4, 2]);
        assert_eq!(result[0].score, 30);
    }

    #[test]
    fn test_verify_until_expired() {
        let verifier = Verifier::new(VerifyOptions::default());
        let f = random_features(6, 40);
        let candidates = vec![Candidate { image_id: 1, features: f.clone() }];
        let past = Instant::now() - Duration::from_millis(1);
        assert!(verifier.verify_until(&f, &candidates, past).unwrap().is_empty());
        let future = Instant::now() + Duration::from_secs(60);
        assert_eq!(verifier.verify_until(&f, &candidates, future).unwrap().len(), 1);
    }

    #[test]
    fn test_dimension_mismatch_aborts() {
        let verifier = Verifier::new(VerifyOptions::default());
        let q = random_features(7, 30);
        let other = Features::new(4, vec![KeyPoint::new(1., 2.)], vec![0.; 4]).unwrap();
        let candidates = vec![
            Candidate { image_id: 1, features: q.clone() },
            Candidate { image_id: 2, features: other },
        ];
        assert!(matches!(
            verifier.verify(&q, &candidates),
            Err(Error::DimensionMismatch { expected: 8, actual: 4 })
        ));
        let future = Instant::now() + Duration::from_secs(60);
        assert!(matches!(
            verifier.verify_until(&q, &candidates, future),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
