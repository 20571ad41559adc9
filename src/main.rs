use clap::Parser;
use wp_content_sync::app::runner::run;
use wp_content_sync::config::CliConfig;
use wp_content_sync::utils::error::{ErrorSeverity, Result};
use wp_content_sync::utils::logger;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting wp-content-sync {}", cli.action());
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run_and_print(&cli).await {
        tracing::error!(
            "❌ {} failed: {} (Severity: {:?})",
            cli.action(),
            e,
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 1,      // 輸入錯誤
            ErrorSeverity::Medium => 2,   // 可重試
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 配置或系統錯誤
        };
        std::process::exit(exit_code);
    }
}

async fn run_and_print(cli: &CliConfig) -> Result<()> {
    let output = run(cli).await?;
    println!("{}", serde_json::to_string_pretty(&output.payload()?)?);
    tracing::info!("✅ {} completed successfully!", cli.action());
    Ok(())
}
