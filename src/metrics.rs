use std::sync::LazyLock;

use prometheus::*;

static METRIC_QUERY_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("vlad_query_count", "count of the image queries", &["top_k"])
        .expect("failed to register vlad_query_count")
});

static METRIC_QUERY_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "vlad_query_duration",
        "duration of the per-image query in seconds",
        &["top_k"]
    )
    .expect("failed to register vlad_query_duration")
});

static METRIC_QUERY_MAX_SCORE: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "vlad_query_max_score",
        "inlier count of the best match per query",
        &["top_k"],
        (0..=200).step_by(10).map(|x| x as f64).collect()
    )
    .expect("failed to register vlad_query_max_score")
});

pub fn inc_query_count(top_k: usize) {
    METRIC_QUERY_COUNT.with_label_values(&[top_k.to_string().as_str()]).inc();
}

pub fn observe_query_duration(top_k: usize, seconds: f64) {
    METRIC_QUERY_DURATION.with_label_values(&[top_k.to_string().as_str()]).observe(seconds);
}

/// 没有结果时记为 0 分
pub fn observe_query_max_score(top_k: usize, score: usize) {
    METRIC_QUERY_MAX_SCORE.with_label_values(&[top_k.to_string().as_str()]).observe(score as f64);
}

/// 以文本格式导出所有指标
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    encoder.encode_to_string(&prometheus::gather()).unwrap_or_default()
}
