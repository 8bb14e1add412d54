use anyhow::Context;
use clap::Parser;
use receipt_classifier::utils::error::{ClassifierError, ErrorSeverity};
use receipt_classifier::utils::{logger, validation::Validate};
use receipt_classifier::{CliConfig, OllamaClient, Orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting receipt-classifier CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    let settings = match config.validate().and_then(|_| config.resolve_settings()) {
        Ok(settings) => settings,
        Err(e) => exit_with(&e),
    };

    if config.check_model {
        let client = OllamaClient::new(&settings.model_endpoint, &settings.model_name);
        match client.has_model().await {
            Ok(true) => {
                println!(
                    "✅ Model '{}' is available at {}",
                    settings.model_name,
                    client.endpoint()
                );
                return Ok(());
            }
            Ok(false) => {
                eprintln!(
                    "❌ Model server at {} is up but '{}' is not pulled",
                    client.endpoint(),
                    settings.model_name
                );
                eprintln!("💡 Suggestion: ollama pull {}", settings.model_name);
                std::process::exit(2);
            }
            Err(e) => exit_with(&e),
        }
    }

    let text = match config.read_input(settings.min_line_confidence) {
        Ok(text) => text,
        Err(e) => exit_with(&e),
    };
    tracing::info!("Classifying {} characters of receipt text", text.as_str().len());

    let orchestrator = match Orchestrator::from_settings(&settings) {
        Ok(orchestrator) => orchestrator,
        Err(e) => exit_with(&e),
    };

    let result = orchestrator.classify(text.as_str()).await;

    let output = if config.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .context("failed to serialize classification result")?;

    println!("{}", output);
    Ok(())
}

fn exit_with(e: &ClassifierError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
