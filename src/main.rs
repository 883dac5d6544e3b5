// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use textlens::{
    api::{start_server, AppState},
    config::AppConfig,
    version,
    vision::{LanguageIdentifier, OcrModelManager},
};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = AppConfig::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ort=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;
    let addr = config.socket_addr().await?;

    info!("🚀 Starting {}", version::get_version_string());
    info!("📂 Model directory: {}", config.model_dir.display());

    let languages = config.detection_languages()?;
    if languages.is_empty() {
        info!("🌐 Language detection over all supported languages");
    } else {
        info!("🌐 Language detection restricted to {:?}", languages);
    }
    let language = Arc::new(LanguageIdentifier::new(
        &languages,
        config.language_min_chars,
    ));

    let models = Arc::new(OcrModelManager::new(config.model_config(), language).await);
    for model in models.list_models() {
        if model.available {
            info!("✅ {} ({}) available", model.name, model.model_type);
        } else {
            warn!("⚠️ {} ({}) not available", model.name, model.model_type);
        }
    }
    if !models.is_ready() {
        warn!("⚠️ OCR requests will fail until every model artifact is present");
    }

    let state = Arc::new(AppState::new(models).with_max_upload_bytes(config.max_upload_bytes));
    start_server(state, addr).await
}
