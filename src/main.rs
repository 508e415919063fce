use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::json;

mod catalog;
mod cli;
mod config;
mod corpus;
mod engine;
mod semantic;
mod web;

use config::Config;
use engine::{RecommendationEngine, RecommendationQuery};
use semantic::EmbeddingModel;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = cli::Args::parse();

    let base_path = Config::base_path()?;
    let config = Config::load_with(&base_path)?;
    let engine = Arc::new(build_engine(&config)?);

    match args.command {
        cli::Command::Daemon {} => {
            web::start_daemon(engine, &config.listen_addr);
            Ok(())
        }

        cli::Command::Recommend {
            text,
            category,
            tone,
            limit,
        } => {
            let query = RecommendationQuery {
                text,
                category,
                tone,
            };

            let books = match limit {
                Some(limit) => engine.recommend_capped(&query, limit)?,
                None => engine.recommend(&query)?,
            };

            println!("{}", serde_json::to_string_pretty(&books)?);
            Ok(())
        }

        cli::Command::Stats {} => {
            engine.initialize()?;

            let stats = json!({
                "documents": engine.document_count(),
                "records": engine.record_count(),
                "categories": engine.categories()?,
            });

            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

fn build_engine(config: &Config) -> anyhow::Result<RecommendationEngine> {
    let model = EmbeddingModel::new(
        &config.embedding.model,
        config.model_cache_path(),
        Some(Duration::from_secs(config.embedding.download_timeout_secs)),
    )?;

    Ok(RecommendationEngine::new(
        config.corpus_path(),
        config.catalog_path(),
        Arc::new(model),
        config.initial_k,
        config.final_k,
    ))
}
