use std::cell::RefCell;
use std::collections::HashMap;

use opencv::core::{Mat, Ptr, Size, Vector};
use opencv::features2d::SIFT;
use opencv::imgproc::InterpolationFlags;
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};

use super::Extractor;
use crate::config::ExtractOptions;
use crate::error::{Error, Result};
use crate::features::{Features, KeyPoint, rootsift};

thread_local! {
    // 按特征点数量缓存 SIFT 实例
    static SIFT_CACHE: RefCell<HashMap<i32, Ptr<SIFT>>> = RefCell::new(HashMap::new());
}

/// OpenCV SIFT 提取器
pub struct SiftExtractor {
    opts: ExtractOptions,
}

impl SiftExtractor {
    pub fn new(opts: ExtractOptions) -> Self {
        Self { opts }
    }

    /// 解码为灰度图，并等比缩放到工作宽度
    fn decode(&self, bytes: &[u8]) -> opencv::Result<Mat> {
        let buf = Vector::<u8>::from_slice(bytes);
        let img = imgcodecs::imdecode(&buf, imgcodecs::IMREAD_GRAYSCALE)?;
        if img.empty() || img.cols() == self.opts.work_width {
            return Ok(img);
        }
        let scale = self.opts.work_width as f64 / img.cols() as f64;
        let mut output = Mat::default();
        imgproc::resize(
            &img,
            &mut output,
            Size::default(),
            scale,
            scale,
            InterpolationFlags::INTER_AREA as i32,
        )?;
        Ok(output)
    }

    fn detect(&self, img: &Mat) -> opencv::Result<(Vector<opencv::core::KeyPoint>, Mat)> {
        let nfeatures = self.opts.descriptor_count as i32;
        SIFT_CACHE.with(|cache| {
            let mut cache = cache.borrow_mut();
            let sift = match cache.entry(nfeatures) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(SIFT::create(nfeatures, 3, 0.04, 10., 1.6, false)?)
                }
            };
            let mask = Mat::default();
            let mut kps = Vector::<opencv::core::KeyPoint>::new();
            let mut des = Mat::default();
            sift.detect_and_compute(img, &mask, &mut kps, &mut des, false)?;
            Ok((kps, des))
        })
    }
}

impl Extractor for SiftExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Features> {
        let img = self.decode(bytes).map_err(Error::extraction)?;
        if img.empty() {
            return Err(Error::extraction("无法解码图片"));
        }
        let (kps, des) = self.detect(&img).map_err(Error::extraction)?;
        if kps.is_empty() {
            return Ok(Features::empty(128));
        }

        let dim = des.cols() as usize;
        let mut descriptors = des.data_typed::<f32>().map_err(Error::extraction)?.to_vec();
        if !self.opts.no_rootsift {
            rootsift(&mut descriptors, dim);
        }
        let keypoints = kps
            .iter()
            .map(|kp| KeyPoint {
                x: kp.pt().x,
                y: kp.pt().y,
                size: kp.size(),
                angle: kp.angle(),
                response: kp.response(),
                octave: kp.octave(),
                class_id: kp.class_id(),
            })
            .collect();
        Features::new(dim, keypoints, descriptors)
    }
}
