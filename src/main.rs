use clap::Parser;
use ecoexlab::utils::error::ErrorSeverity;
use ecoexlab::utils::{logger, validation::Validate};
use ecoexlab::{CliArgs, ExperimentConfig, LabEngine};

fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("Starting ecoexlab CLI");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    // 載入實驗設定,未指定時跑內建示範實驗
    let mut config = match &args.config {
        Some(path) => match ExperimentConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("❌ Failed to load configuration {}: {}", path, e);
                tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("📋 No configuration given, running the built-in demo experiment");
            ExperimentConfig::demo()
        }
    };

    // CLI 參數覆蓋設定檔
    if let Some(output) = &args.output {
        config.output.directory = output.clone();
    }
    if let Some(rounds) = args.rounds {
        config.session.rounds = rounds;
    }
    if let Some(seed) = args.seed {
        config.session.seed = Some(seed);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if args.dry_run {
        println!("✅ Configuration is valid");
        println!("🧪 {}", config.experiment.title);
        println!(
            "👥 {} agents over {} rounds",
            config.total_agents(),
            config.session.rounds
        );
        println!("📁 Output directory: {}", config.output.directory);
        return;
    }

    let monitor_enabled = args.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建引擎並運行實驗
    let engine = LabEngine::new_with_monitoring(config, monitor_enabled);

    match engine.run() {
        Ok(output_dir) => {
            tracing::info!("✅ Experiment completed successfully!");
            println!("✅ Experiment completed successfully!");
            println!("📁 Output saved to: {}", output_dir);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Experiment failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,      // 警告,但成功
                ErrorSeverity::Medium => 2,   // 設定錯誤
                ErrorSeverity::High => 1,     // 處理錯誤
                ErrorSeverity::Critical => 3, // 模擬錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}
