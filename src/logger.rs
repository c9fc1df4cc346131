use tracing_subscriber::EnvFilter;

/// 初始化全局日志。RUST_LOG 可覆盖默认级别。
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,model_relay=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
