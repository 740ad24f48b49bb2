use crate::features::Features;
use crate::utils::l2_sq;

/// 在 vb 中寻找与 va 最接近的 k 个向量（k 最大为 8），返回按距离升序排列的下标与欧氏距离
///
/// 距离相同时下标较小者在前
pub fn knn_l2(va: &[f32], vb: &[f32], dim: usize, k: usize) -> (Vec<usize>, Vec<f32>) {
    let k = k.min(8);
    if k == 0 || dim == 0 {
        return (vec![], vec![]);
    }
    let mut dis = [f32::INFINITY; 8];
    let mut idx = [usize::MAX; 8];
    for (i, chunk) in vb.chunks_exact(dim).enumerate() {
        let d = l2_sq(va, chunk);
        if d >= dis[0] {
            continue;
        }
        // dis[..k] 单调递减，最远的在最前面
        for j in (0..k).rev() {
            if d < dis[j] {
                dis[..=j].rotate_left(1);
                dis[j] = d;
                idx[..=j].rotate_left(1);
                idx[j] = i;
                break;
            }
        }
    }
    idx[..k]
        .iter()
        .zip(&dis[..k])
        .filter(|(i, _)| **i != usize::MAX)
        .rev()
        .map(|(i, d)| (*i, d.sqrt()))
        .unzip()
}

/// 比率测试匹配，返回 (查询下标, 候选下标)
///
/// 只有当最近距离小于 ratio 倍的次近距离时才接受匹配，候选描述符少于 2 个时没有匹配
pub fn ratio_match(query: &Features, train: &Features, ratio: f32) -> Vec<(usize, usize)> {
    if train.len() < 2 || query.dim() != train.dim() {
        return vec![];
    }
    query
        .rows()
        .enumerate()
        .filter_map(|(qi, q)| {
            let (idx, dis) = knn_l2(q, train.descriptors(), train.dim(), 2);
            (dis.len() == 2 && dis[0] < ratio * dis[1]).then(|| (qi, idx[0]))
        })
        .collect()
}
