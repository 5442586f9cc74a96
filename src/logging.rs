// ==========================================
// 库存补货调拨系统 - 日志初始化
// ==========================================
// 输出到 stderr (stdout 留给运行结果 JSON)
// 级别由 RUST_LOG 控制,默认 info
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人读格式 (终端)
    Pretty,
    /// 每行一个 JSON 对象 (采集)
    Json,
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// 按格式初始化全局 subscriber
///
/// 重复调用不会报错,以首次初始化为准。
///
/// # 示例
/// ```no_run
/// use fc_replenishment::logging::{self, LogFormat};
/// logging::init_with(LogFormat::Json);
/// ```
pub fn init_with(format: LogFormat) {
    let builder = fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(std::io::stderr)
        .with_target(true);

    let _ = match format {
        LogFormat::Pretty => builder.with_line_number(true).try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
}

/// 终端日志 (RUST_LOG=fc_replenishment=debug,perf=info 之类)
pub fn init() {
    init_with(LogFormat::Pretty);
}

/// JSON 日志
pub fn init_json() {
    init_with(LogFormat::Json);
}

/// 测试日志: debug 级别,写入测试捕获
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
