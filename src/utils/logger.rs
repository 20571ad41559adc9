use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CLI_FILTER: &str = "wp_content_sync=info";
const CLI_VERBOSE_FILTER: &str = "wp_content_sync=debug,info";
const LAMBDA_FILTER: &str = "wp_content_sync=info,lambda=info";

/// RUST_LOG 有設定時優先
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// 日誌寫到 stderr，stdout 只留給 JSON 結果
pub fn init_cli_logger(verbose: bool) {
    let filter = env_filter(if verbose { CLI_VERBOSE_FILTER } else { CLI_FILTER });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

pub fn init_lambda_logger() {
    tracing_subscriber::registry()
        .with(env_filter(LAMBDA_FILTER))
        .with(
            fmt::layer()
                .json()
                .with_current_span(false)
                .with_target(false)
                .without_time(), // CloudWatch 自帶時間戳
        )
        .init();
}
