use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// 单张图片无法解码或提取特征点，批量处理时应跳过该图片
    #[error("特征点提取失败: {0}")]
    ExtractionFailed(String),

    /// 描述符集合为空，或 VLAD 向量范数为 0
    #[error("VLAD 向量为空")]
    EmptySignature,

    #[error("向量维度不匹配: 期望 {expected}，实际 {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("语料库为空")]
    EmptyCorpus,

    #[error("索引为空或尚未构建")]
    EmptyIndex,

    /// 匹配点不足 4 对，无法拟合单应矩阵
    #[error("匹配点数量不足: {0}")]
    InsufficientCorrespondences(usize),

    #[error("视觉词典尚未训练")]
    MissingVocabulary,

    #[error("样本数量 {samples} 少于聚类中心数量 {clusters}")]
    NotEnoughSamples { samples: usize, clusters: usize },

    #[error("不支持的操作: {0}")]
    Unsupported(String),

    #[error("索引错误: {0}")]
    Index(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移错误: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("序列化错误: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("后台任务失败: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn index(msg: impl ToString) -> Self {
        Error::Index(msg.to_string())
    }

    pub fn extraction(msg: impl ToString) -> Self {
        Error::ExtractionFailed(msg.to_string())
    }

    /// 是否为只影响单张图片的错误
    pub fn is_per_image(&self) -> bool {
        matches!(self, Error::ExtractionFailed(_) | Error::EmptySignature)
    }
}
