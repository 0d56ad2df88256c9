use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::sync::LazyLock;

pub static TIP_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "streamtip_tip_requests_total",
        "Tip endpoint requests by response status",
        &["status"]
    )
    .expect("metric registers once")
});

pub static SETTLEMENTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "streamtip_settlements_total",
        "Facilitator settlement outcomes",
        &["result"]
    )
    .expect("metric registers once")
});

pub static SETTLEMENT_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "streamtip_settlement_duration_seconds",
        "Time spent waiting on the facilitator",
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .expect("metric registers once")
});

pub fn record_status(status: u16) {
    TIP_REQUESTS
        .with_label_values(&[status.to_string().as_str()])
        .inc();
}

pub fn metrics_output() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&prometheus::gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
