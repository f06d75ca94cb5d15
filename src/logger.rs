//! 日志初始化

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化 tracing 日志
///
/// 默认级别 info，可通过 RUST_LOG 覆盖（如 RUST_LOG=lms_task_crawler=debug）。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
