use std::slice::ChunksExact;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reduce::Reducer;

/// 特征点
///
/// 除了坐标外的字段只做保存，不参与聚合与评分
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub angle: f32,
    pub response: f32,
    pub octave: i32,
    pub class_id: i32,
}

impl KeyPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, class_id: -1, ..Default::default() }
    }

    pub fn pt(&self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }
}

/// 一张图片的特征点与描述符，描述符按行连续存放
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    dim: usize,
    keypoints: Vec<KeyPoint>,
    descriptors: Vec<f32>,
}

impl Features {
    pub fn new(dim: usize, keypoints: Vec<KeyPoint>, descriptors: Vec<f32>) -> Result<Self> {
        if descriptors.len() != keypoints.len() * dim {
            return Err(Error::DimensionMismatch {
                expected: keypoints.len() * dim,
                actual: descriptors.len(),
            });
        }
        Ok(Self { dim, keypoints, descriptors })
    }

    pub fn empty(dim: usize) -> Self {
        Self { dim, keypoints: vec![], descriptors: vec![] }
    }

    /// 描述符维度
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[KeyPoint] {
        &self.keypoints
    }

    /// 所有描述符，长度为 len * dim
    pub fn descriptors(&self) -> &[f32] {
        &self.descriptors
    }

    pub fn descriptor(&self, i: usize) -> &[f32] {
        &self.descriptors[i * self.dim..(i + 1) * self.dim]
    }

    pub fn rows(&self) -> ChunksExact<'_, f32> {
        // chunks_exact 不接受 0
        self.descriptors.chunks_exact(self.dim.max(1))
    }

    /// 对每个描述符降维，特征点保持不变
    pub fn transform<R: Reducer + ?Sized>(&self, reducer: &R) -> Result<Self> {
        let mut descriptors = Vec::with_capacity(self.len() * reducer.output_dim());
        for row in self.rows() {
            descriptors.extend(reducer.transform(row)?);
        }
        Ok(Self { dim: reducer.output_dim(), keypoints: self.keypoints.clone(), descriptors })
    }

    /// 只保留响应值最高的 n 个特征点，保持原有顺序
    pub fn retain_strongest(self, n: usize) -> Self {
        if self.len() <= n {
            return self;
        }
        let mut order = (0..self.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| self.keypoints[b].response.total_cmp(&self.keypoints[a].response));
        order.truncate(n);
        order.sort_unstable();

        let keypoints = order.iter().map(|&i| self.keypoints[i]).collect();
        let descriptors = order.iter().flat_map(|&i| self.descriptor(i).iter().copied()).collect();
        Self { dim: self.dim, keypoints, descriptors }
    }

    pub fn into_parts(self) -> (usize, Vec<KeyPoint>, Vec<f32>) {
        (self.dim, self.keypoints, self.descriptors)
    }
}

/// RootSIFT：先做 L1 归一化，再逐元素开方
pub fn rootsift(descriptors: &mut [f32], dim: usize) {
    const EPS: f32 = 1e-7;
    for row in descriptors.chunks_exact_mut(dim.max(1)) {
        let l1 = row.iter().map(|x| x.abs()).sum::<f32>() + EPS;
        for x in row.iter_mut() {
            let v = *x / l1;
            *x = v.abs().sqrt().copysign(v);
        }
    }
}
