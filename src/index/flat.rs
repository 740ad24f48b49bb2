use std::collections::BinaryHeap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{AnnBackend, ImageId, Neighbor};
use crate::error::{Error, Result};
use crate::utils::l2_sq;

/// 保留距离最小的 k 个邻居，堆顶为当前最远者
pub struct TopKNeighbors {
    heap: BinaryHeap<Neighbor>,
    k: usize,
}

impl TopKNeighbors {
    pub fn new(k: usize) -> Self {
        Self { heap: BinaryHeap::with_capacity(k + 1), k }
    }

    pub fn push(&mut self, neighbor: Neighbor) {
        if self.heap.len() < self.k {
            self.heap.push(neighbor);
        } else if self.heap.peek().is_some_and(|top| neighbor < *top) {
            self.heap.pop();
            self.heap.push(neighbor);
        }
    }

    pub fn extend(&mut self, neighbors: impl IntoIterator<Item = Neighbor>) {
        for n in neighbors {
            self.push(n);
        }
    }

    pub fn into_vec(self) -> Vec<Neighbor> {
        self.heap.into_vec()
    }
}

/// 暴力搜索索引
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: usize,
    ids: Vec<ImageId>,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn with_capacity(dim: usize, capacity: usize) -> Self {
        Self { dim, ids: Vec::with_capacity(capacity), data: Vec::with_capacity(capacity * dim) }
    }
}

impl AnnBackend for FlatIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn add(&mut self, id: ImageId, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        self.ids.push(id);
        self.data.extend_from_slice(vector);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let top = self
            .data
            .par_chunks_exact(self.dim)
            .zip(self.ids.par_iter())
            .fold(
                || TopKNeighbors::new(k),
                |mut top, (x, &id)| {
                    top.push(Neighbor { id, distance: l2_sq(x, query).sqrt() });
                    top
                },
            )
            .reduce(
                || TopKNeighbors::new(k),
                |mut a, b| {
                    a.extend(b.into_vec());
                    a
                },
            );
        Ok(top.into_vec())
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(dim: usize, bytes: &[u8]) -> Result<Self> {
        let index: Self = bincode::deserialize(bytes)?;
        if index.dim != dim || index.data.len() != index.ids.len() * dim {
            return Err(Error::index("索引文件损坏"));
        }
        Ok(index)
    }

    fn is_exact(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topk_keeps_smallest() {
        let mut top = TopKNeighbors::new(2);
        for (id, d) in [(1, 3.), (2, 1.), (3, 2.), (4, 0.5)] {
            top.push(Neighbor { id, distance: d });
        }
        let mut v = top.into_vec();
        v.sort();
        assert_eq!(v.iter().map(|n| n.id).collect::<Vec<_>>(), vec![4, 2]);
    }

    #[test]
    fn test_topk_zero() {
        let mut top = TopKNeighbors::new(0);
        top.push(Neighbor { id: 1, distance: 0. });
        assert!(top.into_vec().is_empty());
    }

    #[test]
    fn test_flat_search() {
        let mut index = FlatIndex::with_capacity(2, 3);
        index.add(10, &[0., 0.]).unwrap();
        index.add(11, &[3., 4.]).unwrap();
        index.add(12, &[1., 0.]).unwrap();
        let mut v = index.search(&[0., 0.], 2).unwrap();
        v.sort();
        assert_eq!(v[0].id, 10);
        assert_eq!(v[1].id, 12);
        assert!((v[1].distance - 1.).abs() < 1e-6);
        assert!(index.add(13, &[1.]).is_err());
    }
}
