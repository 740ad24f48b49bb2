mod flat;
mod hnsw;

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub use self::flat::FlatIndex;
pub use self::hnsw::HnswIndex;
use crate::error::{Error, Result};

/// 图片在数据库中的 ID
pub type ImageId = i64;

/// 一次近邻搜索的结果
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Neighbor {
    pub id: ImageId,
    /// 欧氏距离
    pub distance: f32,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    /// 距离从小到大，距离相同时 ID 较小者在前
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then(self.id.cmp(&other.id))
    }
}

#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexKind {
    /// 暴力搜索，结果精确
    #[default]
    Flat,
    /// usearch HNSW 图，结果近似
    Usearch,
}

/// 近邻搜索后端
pub trait AnnBackend: Send + Sync {
    fn dim(&self) -> usize;

    fn len(&self) -> usize;

    fn add(&mut self, id: ImageId, vector: &[f32]) -> Result<()>;

    /// 返回最多 k 个近邻，不要求有序
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    fn to_bytes(&self) -> Result<Vec<u8>>;

    fn from_bytes(dim: usize, bytes: &[u8]) -> Result<Self>
    where
        Self: Sized;

    /// 结果是否精确
    fn is_exact(&self) -> bool;
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    kind: IndexKind,
    dim: usize,
    data: Vec<u8>,
}

/// VLAD 向量索引
pub struct SignatureIndex {
    kind: IndexKind,
    backend: Box<dyn AnnBackend>,
}

impl SignatureIndex {
    fn empty(kind: IndexKind, dim: usize, capacity: usize) -> Result<Self> {
        let backend: Box<dyn AnnBackend> = match kind {
            IndexKind::Flat => Box::new(FlatIndex::with_capacity(dim, capacity)),
            IndexKind::Usearch => Box::new(HnswIndex::with_capacity(dim, capacity)?),
        };
        Ok(Self { kind, backend })
    }

    /// 使用一组 (图片 ID, VLAD 向量) 构建索引，所有向量维度必须一致
    pub fn build(signatures: Vec<(ImageId, Vec<f32>)>, kind: IndexKind) -> Result<Self> {
        let Some((_, first)) = signatures.first() else {
            return Err(Error::EmptyCorpus);
        };
        let dim = first.len();
        // 零维向量无法搜索
        if dim == 0 {
            return Err(Error::DimensionMismatch { expected: 1, actual: 0 });
        }
        if let Some((_, v)) = signatures.iter().find(|(_, v)| v.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, actual: v.len() });
        }

        info!("构建 {kind:?} 索引：{} 个 {dim} 维向量", signatures.len());
        let mut index = Self::empty(kind, dim, signatures.len())?;
        for (id, v) in &signatures {
            index.backend.add(*id, v)?;
        }
        Ok(index)
    }

    /// 搜索最接近的 k 个向量，按距离升序排列，距离相同时按 ID 升序
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim() {
            return Err(Error::DimensionMismatch { expected: self.dim(), actual: query.len() });
        }
        if k == 0 || self.is_empty() {
            return Ok(vec![]);
        }
        let mut neighbors = self.backend.search(query, k.min(self.len()))?;
        neighbors.sort_unstable();
        neighbors.truncate(k);
        debug!("索引返回 {} 个候选", neighbors.len());
        Ok(neighbors)
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn dim(&self) -> usize {
        self.backend.dim()
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 近似索引的结果可能与暴力搜索不同
    pub fn is_exact(&self) -> bool {
        self.backend.is_exact()
    }

    pub fn persist(&self) -> Result<Vec<u8>> {
        let file = IndexFile { kind: self.kind, dim: self.dim(), data: self.backend.to_bytes()? };
        Ok(bincode::serialize(&file)?)
    }

    pub fn restore(bytes: &[u8]) -> Result<Self> {
        let file: IndexFile = bincode::deserialize(bytes)?;
        let backend: Box<dyn AnnBackend> = match file.kind {
            IndexKind::Flat => Box::new(FlatIndex::from_bytes(file.dim, &file.data)?),
            IndexKind::Usearch => Box::new(HnswIndex::from_bytes(file.dim, &file.data)?),
        };
        if backend.dim() != file.dim {
            return Err(Error::DimensionMismatch { expected: file.dim, actual: backend.dim() });
        }
        Ok(Self { kind: file.kind, backend })
    }

    /// 先写入临时文件再重命名，读取方不会看到写了一半的索引
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let tmp = tmp_path(path);
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            writer.write_all(&self.persist()?)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        info!("索引已保存到 {}", path.display());
        Ok(())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("加载索引: {}", path.display());
        let bytes = std::fs::read(path)?;
        Self::restore(&bytes)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_order() {
        let mut v = vec![
            Neighbor { id: 3, distance: 0.5 },
            Neighbor { id: 1, distance: 0.5 },
            Neighbor { id: 2, distance: 0.1 },
        ];
        v.sort();
        assert_eq!(v.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 1, 3]);
    }

    #[test]
    fn test_tmp_path() {
        assert_eq!(tmp_path(Path::new("/a/index.bin")), PathBuf::from("/a/index.bin.tmp"));
    }
}
