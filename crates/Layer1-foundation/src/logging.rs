//! Logging 초기화
//!
//! `RUST_LOG`가 있으면 그대로 쓰고, 없으면 debug 플래그에 따라 info/debug.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 기본 로그 레벨
pub fn default_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// 전역 subscriber 설치
///
/// 이미 설치되어 있으면 false (두 번째 호출은 무시된다).
pub fn init(debug: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}
