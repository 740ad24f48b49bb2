use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_auth::AuthBearer;
use axum_typed_multipart::TypedMultipart;
use log::{info, warn};

use super::error::Result;
use super::state::AppState;
use super::types::*;
use crate::config::{SearchOptions, VerifyOptions};
use crate::metrics;

/// 搜索一张图片
#[utoipa::path(
    post,
    path = "/search",
    request_body(content = SearchForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, description = "图片无法解码或特征维度不匹配"),
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    TypedMultipart(data): TypedMultipart<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    // 处理上传的文件和参数
    let search = SearchOptions {
        top_k: data.top_k.unwrap_or(state.search.top_k),
        ..state.search.clone()
    };
    let verify = VerifyOptions {
        min_score: data.min_score.unwrap_or(state.verify.min_score),
        ratio: data.ratio.unwrap_or(state.verify.ratio),
        ..state.verify.clone()
    };

    let start = Instant::now();
    info!("正在搜索上传图片");

    let result = state
        .db
        .search_image(data.file.to_vec(), state.extractor.clone(), &search, &verify)
        .await?;

    Ok(Json(SearchResponse { time: start.elapsed().as_millis() as u64, result }))
}

/// 从磁盘重新加载索引
#[utoipa::path(
    post,
    path = "/reload",
    responses(
        (status = 200),
        (status = 401, description = "token 错误"),
    )
)]
pub async fn reload_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
) -> Result<StatusCode> {
    if token != state.token {
        warn!("reload 鉴权失败");
        return Ok(StatusCode::UNAUTHORIZED);
    }
    state.db.reload().await?;
    Ok(StatusCode::OK)
}

/// 导出 prometheus 指标
#[utoipa::path(get, path = "/metrics", responses((status = 200, body = String)))]
pub async fn metrics_handler() -> String {
    metrics::gather_text()
}
