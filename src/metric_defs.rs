use metrics::{describe_counter, describe_histogram, Unit};

/// Optional but adds description/help message to the metrics emitted to metric
/// sink.
pub(crate) fn install_metrics() {
    // API Server
    describe_counter!(
        "cinema.api.http_requests_total",
        Unit::Count,
        "Total HTTP API requests processed"
    );
    describe_histogram!(
        "cinema.api.http_requests_duration_seconds",
        Unit::Seconds,
        "Total HTTP API processing in seconds"
    );

    // Reactions
    describe_counter!(
        "cinema.likes.toggles_total",
        Unit::Count,
        "Like and dislike toggles applied, labelled by reaction"
    );
}
