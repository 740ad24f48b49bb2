#![allow(dead_code)]

use vladsearch::extractor::FeaturesFile;
use vladsearch::{CentroidVocabulary, Features, KeyPoint};

pub const DIM: usize = 4;
pub const CLUSTERS: usize = 8;

/// 每张图片的特征点数量
pub const COUNT: usize = 60;
/// 裁剪后保留的特征点数量
pub const CROPPED: usize = 50;

/// 靠近某个坐标轴中心的描述符，偏移量互不相同
fn descriptor(i: usize, sign: f32, phase: f32) -> [f32; DIM] {
    let t = i as f32 + phase;
    let mut d = [
        (1.3 * t).sin(),
        (0.7 * t).cos(),
        (2.1 * t + 0.5).sin(),
        (1.7 * t).cos(),
    ];
    d[i % DIM] += 10. * sign;
    d
}

fn image(
    sign: f32,
    phase: f32,
    point: impl Fn(usize) -> (f32, f32),
    range: std::ops::Range<usize>,
) -> Features {
    let mut keypoints = vec![];
    let mut descriptors = vec![];
    for i in range {
        let (x, y) = point(i);
        keypoints.push(KeyPoint::new(x, y));
        descriptors.extend(descriptor(i, sign, phase));
    }
    Features::new(DIM, keypoints, descriptors).unwrap()
}

fn point_a(i: usize) -> (f32, f32) {
    (20. + (i * 37 % 280) as f32, 20. + (i * 61 % 200) as f32)
}

/// 描述符集中在正半轴的图片
pub fn image_a() -> Features {
    image(1., 0., point_a, 0..COUNT)
}

/// A 旋转、缩放、平移后裁掉一部分的副本，描述符与 A 相同
pub fn image_a_prime() -> Features {
    let (s, c) = 20f32.to_radians().sin_cos();
    image(
        1.,
        0.,
        |i| {
            let (x, y) = point_a(i);
            (0.8 * (c * x - s * y) + 15., 0.8 * (s * x + c * y) - 5.)
        },
        0..CROPPED,
    )
}

/// 描述符集中在负半轴的图片
pub fn image_b() -> Features {
    image(-1., 100., |i| (20. + (i * 83 % 290) as f32, 20. + (i * 29 % 190) as f32), 0..COUNT)
}

pub fn image_c() -> Features {
    image(-1., 200., |i| (20. + (i * 47 % 250) as f32, 20. + (i * 71 % 230) as f32), 0..COUNT)
}

/// 8 个中心分别位于各坐标轴的 ±10 处
pub fn vocabulary() -> CentroidVocabulary {
    let mut centers = vec![0.; CLUSTERS * DIM];
    for axis in 0..DIM {
        centers[axis * 2 * DIM + axis] = 10.;
        centers[(axis * 2 + 1) * DIM + axis] = -10.;
    }
    CentroidVocabulary::new(DIM, centers).unwrap()
}

pub fn to_json(features: &Features) -> String {
    serde_json::to_string(&FeaturesFile::from(features)).unwrap()
}
