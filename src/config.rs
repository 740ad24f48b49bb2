use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::cli::*;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let path = ProjectDirs::from("", "", "vladsearch")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".vladsearch"));
    ConfDir { path }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap_or(".vladsearch")
}

#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    /// OpenCV SIFT，需要启用 opencv feature
    Sift,
    /// 读取 JSON 格式的预计算特征点
    Precomputed,
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractOptions {
    /// 每张图片保留的最大特征点数量
    #[arg(short = 'n', long, value_name = "N", default_value_t = 500)]
    pub descriptor_count: u32,
    /// 提取特征点前将图片等比缩放到该宽度
    #[arg(long, value_name = "WIDTH", default_value_t = 320)]
    pub work_width: i32,
    /// 特征点提取方式
    #[arg(long, value_enum, default_value_t = ExtractorKind::Sift)]
    pub extractor: ExtractorKind,
    /// 不对 SIFT 描述符做 RootSIFT 处理
    #[arg(long)]
    pub no_rootsift: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            descriptor_count: 500,
            work_width: 320,
            extractor: ExtractorKind::Sift,
            no_rootsift: false,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 近邻搜索返回的候选数量，这些候选会进入几何校验
    #[arg(short = 'k', long, value_name = "K", default_value_t = 30)]
    pub top_k: usize,
    /// 最多返回的结果数量，不填则返回所有通过校验的候选
    #[arg(long, value_name = "COUNT")]
    pub count: Option<usize>,
    /// 几何校验的时间上限，单位为毫秒，超时后未校验的候选会被丢弃
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { top_k: 30, count: None, timeout: None }
    }
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct VerifyOptions {
    /// 比率测试阈值，最近距离必须小于次近距离的该倍数
    #[arg(long, value_name = "RATIO", default_value_t = 0.7)]
    pub ratio: f32,
    /// RANSAC 内点允许的最大重投影误差，单位为像素
    #[arg(long, value_name = "PX", default_value_t = 3.0)]
    pub reproj_threshold: f64,
    /// 内点数量必须大于该值才会出现在结果中
    #[arg(long, value_name = "N", default_value_t = 20)]
    pub min_score: usize,
    /// RANSAC 最大迭代次数
    #[arg(long, value_name = "N", default_value_t = 2000)]
    pub max_iters: usize,
    /// RANSAC 置信度
    #[arg(long, value_name = "P", default_value_t = 0.995)]
    pub confidence: f64,
    /// RANSAC 随机种子
    #[arg(long, value_name = "SEED", default_value_t = 0)]
    pub seed: u64,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            ratio: 0.7,
            reproj_threshold: 3.0,
            min_score: 20,
            max_iters: 2000,
            confidence: 0.995,
            seed: 0,
        }
    }
}

/// 构建流水线的配置
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 图片所在目录
    pub corpus_path: Option<PathBuf>,
    /// 数据库、词典和索引所在目录
    pub work_dir: PathBuf,
    /// 每张图片的最大特征点数量
    pub descriptor_count: u32,
    /// 训练词典前是否对描述符做 PCA 降维
    pub use_descriptor_reduction: bool,
    /// 建立索引前是否对 VLAD 向量做 PCA 降维
    pub use_signature_reduction: bool,
    pub descriptor_components: usize,
    pub signature_components: usize,
}

impl PipelineConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus_path: None,
            work_dir: work_dir.into(),
            descriptor_count: 500,
            use_descriptor_reduction: false,
            use_signature_reduction: false,
            descriptor_components: 64,
            signature_components: 512,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "vladsearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 工作目录，保存数据库、词典和索引
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 提取图片特征点并添加到数据库
    Add(AddCommand),
    /// 检查图片能否正常提取特征点
    Validate(ValidateCommand),
    /// 训练视觉词典
    Train(TrainCommand),
    /// 计算 VLAD 向量并构建索引
    Build(BuildCommand),
    /// 从数据库中搜索图片
    Search(SearchCommand),
    /// 对两张图片做几何校验并输出分数
    Match(MatchCommand),
    /// 导出所有 VLAD 向量
    Export(ExportCommand),
    /// 启动 HTTP 搜索服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("imsearch.db")
    }

    /// 返回视觉词典文件的路径
    pub fn vocabulary(&self) -> PathBuf {
        self.path.join("vocabulary.bin")
    }

    /// 返回描述符 PCA 文件的路径
    pub fn descriptor_pca(&self) -> PathBuf {
        self.path.join("descriptor_pca.bin")
    }

    /// 返回 VLAD 向量 PCA 文件的路径
    pub fn signature_pca(&self) -> PathBuf {
        self.path.join("signature_pca.bin")
    }

    /// 返回索引文件的路径
    pub fn index(&self) -> PathBuf {
        self.path.join("index.bin")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_options_defaults_match_cli() {
        let opts = VerifyOptions::parse_from(["verify"]);
        assert_eq!(opts, VerifyOptions::default());
    }

    #[test]
    fn test_conf_dir_paths() {
        let dir = ConfDir::from_str("/tmp/work").unwrap();
        assert_eq!(dir.index(), PathBuf::from("/tmp/work/index.bin"));
        assert_eq!(dir.database(), PathBuf::from("/tmp/work/imsearch.db"));
    }
}
