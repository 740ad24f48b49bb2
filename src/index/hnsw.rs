use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use super::{AnnBackend, ImageId, Neighbor};
use crate::error::{Error, Result};

/// usearch HNSW 索引，度量为平方欧氏距离
pub struct HnswIndex {
    index: Index,
    dim: usize,
}

impl HnswIndex {
    fn new(dim: usize) -> Result<Self> {
        let options = IndexOptions {
            dimensions: dim,
            metric: MetricKind::L2sq,
            quantization: ScalarKind::F32,
            connectivity: 32,
            expansion_add: 128,
            expansion_search: 64,
            ..Default::default()
        };
        let index = Index::new(&options).map_err(Error::index)?;
        Ok(Self { index, dim })
    }

    pub fn with_capacity(dim: usize, capacity: usize) -> Result<Self> {
        let s = Self::new(dim)?;
        s.index.reserve(capacity.max(1)).map_err(Error::index)?;
        Ok(s)
    }
}

impl AnnBackend for HnswIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn add(&mut self, id: ImageId, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        if id < 0 {
            return Err(Error::index(format!("无效的图片 ID: {id}")));
        }
        if self.index.size() >= self.index.capacity() {
            let capacity = (self.index.capacity() * 2).max(16);
            self.index.reserve(capacity).map_err(Error::index)?;
        }
        self.index.add(id as u64, vector).map_err(Error::index)?;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let m = self.index.search(query, k).map_err(Error::index)?;
        let neighbors = m
            .keys
            .into_iter()
            .zip(m.distances)
            .map(|(key, d)| Neighbor { id: key as ImageId, distance: d.max(0.).sqrt() })
            .collect();
        Ok(neighbors)
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; self.index.serialized_length()];
        self.index.save_to_buffer(&mut buffer).map_err(Error::index)?;
        Ok(buffer)
    }

    fn from_bytes(dim: usize, bytes: &[u8]) -> Result<Self> {
        let s = Self::new(dim)?;
        s.index.load_from_buffer(bytes).map_err(Error::index)?;
        if s.index.dimensions() != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: s.index.dimensions() });
        }
        Ok(s)
    }

    fn is_exact(&self) -> bool {
        false
    }
}
