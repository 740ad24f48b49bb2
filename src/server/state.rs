use std::sync::Arc;

use crate::IMDB;
use crate::cli::server::ServerCommand;
use crate::config::{SearchOptions, VerifyOptions};
use crate::extractor::Extractor;

/// 应用状态
pub struct AppState {
    /// 数据库与正在使用的索引
    pub db: IMDB,
    /// 特征点提取器
    pub extractor: Arc<dyn Extractor>,
    /// 搜索配置选项
    pub search: SearchOptions,
    /// 几何校验配置选项
    pub verify: VerifyOptions,
    /// 鉴权 token
    pub token: String,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(db: IMDB, extractor: Arc<dyn Extractor>, opts: ServerCommand) -> Arc<Self> {
        Arc::new(AppState {
            db,
            extractor,
            search: opts.search,
            verify: opts.verify,
            token: opts.token,
        })
    }
}
