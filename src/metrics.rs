use std::sync::LazyLock;

use prometheus::*;

static METRIC_SEARCH_COUNT: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("mm_search_count", "count of the text search requests").unwrap()
});

static METRIC_SEARCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!("mm_search_duration", "duration of the text search in seconds").unwrap()
});

static METRIC_SEARCH_MAX_SCORE: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "mm_search_max_score",
        "max cosine similarity of the search results",
        (0..=20).map(|x| x as f64 / 20.0).collect()
    )
    .unwrap()
});

/// 记录一次搜索的指标
pub fn observe_search(duration: f64, max_score: Option<f64>) {
    METRIC_SEARCH_COUNT.inc();
    METRIC_SEARCH_DURATION.observe(duration);
    if let Some(score) = max_score {
        METRIC_SEARCH_MAX_SCORE.observe(score);
    }
}
