// ==========================================
// 枪托生产流水排程系统 - 日志初始化
// ==========================================
// 宿主层在装配 API 前调用一次 init();
// 集成测试用 init_test(),输出交给测试框架捕获
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 默认日志过滤器: 本库 info,其余 warn
const DEFAULT_FILTER: &str = "warn,gunstock_aps=info";

/// 初始化日志系统
///
/// RUST_LOG 优先于默认过滤器,例如:
/// RUST_LOG=debug 或 RUST_LOG=gunstock_aps=trace
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 初始化测试日志(幂等,重复调用安全)
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("gunstock_aps=debug"))
        .with_test_writer()
        .try_init();
}
