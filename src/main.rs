use clap::Parser;
use ewaste_classifier::utils::error::ClassifyError;
use ewaste_classifier::utils::{logger, validation::Validate};
use ewaste_classifier::{
    ClassificationPipeline, ClassificationReport, ClassificationResult, CliConfig,
    GeminiClassifier,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    let file_config = match config.load_file_config() {
        Ok(file_config) => file_config,
        Err(e) => {
            logger::init_cli_logger(config.verbose);
            exit_with(&e);
        }
    };

    // 初始化日誌
    if config.json_logs || file_config.output.json_logs.unwrap_or(false) {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting ewaste-classify");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    let classifier_config = match config
        .classifier_config(&file_config)
        .and_then(|c| c.validate().map(|_| c))
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            exit_with(&e);
        }
    };
    tracing::debug!("Classifier config: {:?}", classifier_config);

    let classifier = match GeminiClassifier::new(&classifier_config) {
        Ok(classifier) => classifier,
        Err(e) => exit_with(&e),
    };

    let (storage, asset) = config.image_asset();
    let pipeline = ClassificationPipeline::new(storage, classifier);

    // Ctrl-C 取消進行中的分類
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupted, cancelling classification");
            trigger.cancel();
        }
    });

    let result = pipeline.run(asset.as_ref(), &cancel).await;

    let file_name = config
        .image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.image.display().to_string());
    let report = ClassificationReport::new(file_name, pipeline.classifier().model(), result);

    if let Some(path) = &config.output {
        let written = report
            .to_json()
            .map_err(ClassifyError::from)
            .and_then(|json| std::fs::write(path, json).map_err(ClassifyError::from));
        match written {
            Ok(()) => tracing::info!("📁 Report saved to: {}", path.display()),
            Err(e) => tracing::error!("❌ Could not save report to {}: {}", path.display(), e),
        }
    }

    println!("{}", config.output_format(&file_config).render(&report));

    if let ClassificationResult::Failure { kind, .. } = &report.result {
        tracing::error!("❌ Classification failed ({})", kind);
        std::process::exit(kind.severity().exit_code());
    }
}

fn exit_with(error: &ClassifyError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );
    eprintln!("❌ {}", error.user_friendly_message());
    eprintln!("💡 Suggestion: {}", error.recovery_suggestion());

    std::process::exit(error.severity().exit_code());
}
