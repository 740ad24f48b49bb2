use axum::body::Bytes;
use axum_typed_multipart::TryFromMultipart;
use serde::Serialize;
use utoipa::ToSchema;

use crate::SearchResult;

/// 搜索请求参数
#[derive(TryFromMultipart)]
pub struct SearchRequest {
    #[form_data(limit = "10MiB")]
    pub file: Bytes,
    pub top_k: Option<usize>,
    pub min_score: Option<usize>,
    pub ratio: Option<f32>,
}

/// 搜索表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct SearchForm {
    /// 上传的图片文件
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// 近邻搜索返回的候选数量
    pub top_k: Option<usize>,
    /// 内点数量必须大于该值才会出现在结果中
    pub min_score: Option<usize>,
    /// 比率测试阈值
    pub ratio: Option<f32>,
}

/// 搜索响应
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    /// 搜索耗时，单位为毫秒
    pub time: u64,
    /// 按分数从高到低排序的搜索结果
    pub result: Vec<SearchResult>,
}
