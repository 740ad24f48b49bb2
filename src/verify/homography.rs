use log::trace;
use nalgebra::{DMatrix, Matrix3, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

use crate::error::{Error, Result};

pub type Point = [f64; 2];

/// 3x3 单应矩阵
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(pub Matrix3<f64>);

impl Homography {
    /// 投影一个点，落在无穷远处时返回 None
    pub fn project(&self, p: Point) -> Option<Point> {
        let v = self.0 * Vector3::new(p[0], p[1], 1.0);
        if v.z.abs() < f64::EPSILON {
            return None;
        }
        Some([v.x / v.z, v.y / v.z])
    }

    /// 使用归一化 DLT 从至少 4 对点拟合单应矩阵，退化时返回 None
    pub fn estimate(src: &[Point], dst: &[Point]) -> Option<Self> {
        let n = src.len();
        if n < 4 || dst.len() != n {
            return None;
        }
        let ts = normalization(src)?;
        let td = normalization(dst)?;

        let mut a = DMatrix::<f64>::zeros(2 * n, 9);
        for (i, (s, d)) in src.iter().zip(dst).enumerate() {
            let s = ts * Vector3::new(s[0], s[1], 1.0);
            let d = td * Vector3::new(d[0], d[1], 1.0);
            let (x, y) = (s.x, s.y);
            let (u, v) = (d.x, d.y);
            let r1 = [-x, -y, -1., 0., 0., 0., u * x, u * y, u];
            let r2 = [0., 0., 0., -x, -y, -1., v * x, v * y, v];
            for j in 0..9 {
                a[(2 * i, j)] = r1[j];
                a[(2 * i + 1, j)] = r2[j];
            }
        }

        // A^T A 最小特征值对应的特征向量即为 Ah = 0 的最小二乘解
        let ata = a.transpose() * &a;
        let eig = ata.symmetric_eigen();
        let imin = eig.eigenvalues.imin();
        let h = eig.eigenvectors.column(imin);
        let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

        let m = td.try_inverse()? * hn * ts;
        let scale = if m[(2, 2)].abs() > f64::EPSILON { m[(2, 2)] } else { m.norm() };
        let m = m / scale;
        m.iter().all(|v| v.is_finite()).then_some(Self(m))
    }

    /// 重投影误差的平方
    fn error_sq(&self, s: Point, d: Point) -> f64 {
        match self.project(s) {
            Some(p) => (p[0] - d[0]).powi(2) + (p[1] - d[1]).powi(2),
            None => f64::INFINITY,
        }
    }
}

/// Hartley 归一化：平移到质心，缩放使平均距离为 sqrt(2)
fn normalization(points: &[Point]) -> Option<Matrix3<f64>> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean = points.iter().map(|p| (p[0] - cx).hypot(p[1] - cy)).sum::<f64>() / n;
    if mean < f64::EPSILON {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean;
    Some(Matrix3::new(s, 0., -s * cx, 0., s, -s * cy, 0., 0., 1.))
}

/// 三点是否共线
fn collinear(a: Point, b: Point, c: Point) -> bool {
    let (ux, uy) = (b[0] - a[0], b[1] - a[1]);
    let (vx, vy) = (c[0] - a[0], c[1] - a[1]);
    let cross = (ux * vy - uy * vx).abs();
    cross <= 1e-6 * (ux.hypot(uy) * vx.hypot(vy)).max(f64::MIN_POSITIVE)
}

/// 4 个点中任意 3 个共线时无法确定单应矩阵
fn degenerate(points: &[Point; 4]) -> bool {
    [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)]
        .iter()
        .any(|&(i, j, k)| collinear(points[i], points[j], points[k]))
}

#[derive(Debug, Clone, Copy)]
pub struct RansacOptions {
    /// 内点允许的最大重投影误差，单位为像素
    pub threshold: f64,
    pub max_iters: usize,
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self { threshold: 3.0, max_iters: 2000, confidence: 0.995, seed: 0 }
    }
}

#[derive(Debug, Clone)]
pub struct HomographyFit {
    pub model: Option<Homography>,
    /// 与输入点对一一对应的内点标记
    pub inliers: Vec<bool>,
}

impl HomographyFit {
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|v| **v).count()
    }
}

fn find_inliers(
    h: &Homography,
    src: &[Point],
    dst: &[Point],
    threshold: f64,
) -> (Vec<bool>, usize) {
    let t2 = threshold * threshold;
    let mask = src.iter().zip(dst).map(|(s, d)| h.error_sq(*s, *d) <= t2).collect::<Vec<_>>();
    let count = mask.iter().filter(|v| **v).count();
    (mask, count)
}

/// 根据当前内点比例估算达到置信度所需的迭代次数
fn update_num_iters(confidence: f64, inlier_ratio: f64, max_iters: usize) -> usize {
    let num = (1.0 - confidence).max(f64::MIN_POSITIVE).ln();
    let denom = 1.0 - inlier_ratio.powi(4);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }
    let denom = denom.ln();
    if denom >= 0.0 || -num >= max_iters as f64 * -denom {
        return max_iters;
    }
    (num / denom).round() as usize
}

/// 使用 RANSAC 拟合单应矩阵
///
/// 少于 4 对点时返回 [`Error::InsufficientCorrespondences`]，找不到有效模型时 model 为 None
pub fn ransac_homography(
    src: &[Point],
    dst: &[Point],
    opts: &RansacOptions,
) -> Result<HomographyFit> {
    let n = src.len().min(dst.len());
    if n < 4 {
        return Err(Error::InsufficientCorrespondences(n));
    }
    let (src, dst) = (&src[..n], &dst[..n]);

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut best: Option<(Homography, Vec<bool>, usize)> = None;
    let mut niters = opts.max_iters;
    let mut iter = 0;

    while iter < niters {
        iter += 1;
        let idx = sample(&mut rng, n, 4);
        let s = [src[idx.index(0)], src[idx.index(1)], src[idx.index(2)], src[idx.index(3)]];
        let d = [dst[idx.index(0)], dst[idx.index(1)], dst[idx.index(2)], dst[idx.index(3)]];
        if degenerate(&s) || degenerate(&d) {
            continue;
        }
        let Some(h) = Homography::estimate(&s, &d) else {
            continue;
        };
        let (mask, count) = find_inliers(&h, src, dst, opts.threshold);
        if best.as_ref().is_none_or(|b| count > b.2) {
            let ratio = count as f64 / n as f64;
            niters = niters.min(update_num_iters(opts.confidence, ratio, opts.max_iters));
            best = Some((h, mask, count));
        }
    }
    trace!("RANSAC 迭代 {iter} 次");

    let Some((mut h, mut mask, count)) = best else {
        return Ok(HomographyFit { model: None, inliers: vec![false; n] });
    };

    // 使用所有内点重新拟合，内点数量不减少时才采用
    if count >= 4 {
        let (s, d): (Vec<_>, Vec<_>) =
            src.iter().zip(dst).zip(&mask).filter(|(_, m)| **m).map(|((s, d), _)| (*s, *d)).unzip();
        if let Some(refined) = Homography::estimate(&s, &d) {
            let (m, c) = find_inliers(&refined, src, dst, opts.threshold);
            if c >= count {
                h = refined;
                mask = m;
            }
        }
    }

    Ok(HomographyFit { model: Some(h), inliers: mask })
}
