use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod db;
mod engine;
mod error;
mod models;
mod providers;

use config::Config;
use db::Repository;
use engine::{check_exclusion_capacity, Pipeline, SourceTrustEngine, TrustPolicy};
use error::{AppError, Result};
use models::NewExclusion;
use providers::{AnthropicClient, HttpEmbedder};

const USAGE: &str = "Usage:
  curator --run <user_id> [provider_label]       score new articles and assemble a digest
  curator --learn <user_id>                      distill feedback into learned preferences
  curator --learn-force <user_id>                learning with the lowered gate (debugging)
  curator --trust <user_id>                      recompute and print source trust factors
  curator --exclude <user_id> <category> [desc]  add an exclusion for a user
  curator --reset-digest <digest_id>             detach a digest so its articles re-score";

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<()> {
    let (Some(flag), Some(id_arg)) = (args.get(1), args.get(2)) else {
        eprintln!("{}", USAGE);
        return Err(AppError::Validation("missing arguments".to_string()));
    };
    let id: i64 = id_arg
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid id: {}", id_arg)))?;

    let config = Config::load()?;
    let repo = Arc::new(Repository::new(&config.db_path).await?);

    match flag.as_str() {
        "--run" => {
            let pipeline = build_pipeline(&config, repo)?;
            let provider_label = args.get(3).cloned().unwrap_or_else(|| config.model.clone());
            let summary = pipeline.run(id, &provider_label).await?;
            println!(
                "Scored {} articles for user {} ({} by model, {} fallback, {} excluded) in {:.2}s{}",
                summary.scored,
                summary.user_id,
                summary.model_scored,
                summary.fallbacks,
                summary.excluded,
                summary.elapsed.as_secs_f64(),
                if summary.partial { " [partial]" } else { "" },
            );
            if summary.degraded_batches > 0 {
                println!(
                    "{} batch(es) fell back to embedding-only scoring",
                    summary.degraded_batches
                );
            }
            match summary.digest_id {
                Some(digest_id) => println!("Created digest {}", digest_id),
                None => println!("No digest created"),
            }
        }
        "--learn" | "--learn-force" => {
            let pipeline = build_pipeline(&config, repo)?;
            let force = flag == "--learn-force";
            if pipeline.learn(id, force).await? {
                println!("Updated learned preferences for user {}", id);
            } else {
                println!("Preference learning skipped for user {}", id);
            }
        }
        "--trust" => {
            let engine = SourceTrustEngine::new(
                repo.clone(),
                TrustPolicy {
                    trust_min: config.trust_min,
                    trust_max: config.trust_max,
                    window_days: config.trust_window_days,
                    min_samples: config.trust_min_samples,
                },
            );
            let updated = engine.recompute(id).await?;
            println!("Updated trust for {} sources", updated);
            for row in repo.get_source_trust_rows(id).await? {
                println!(
                    "  source {}: factor {:.2} ({} samples)",
                    row.source_id, row.factor, row.sample_size
                );
            }
        }
        "--exclude" => {
            let category = args
                .get(3)
                .cloned()
                .ok_or_else(|| AppError::Validation("missing exclusion category".to_string()))?;
            let current = repo.count_active_exclusions(id).await?;
            check_exclusion_capacity(current, config.exclusion_cap)?;
            repo.insert_exclusion(NewExclusion {
                user_id: id,
                category: category.clone(),
                description: args.get(4).cloned(),
            })
            .await?;
            println!("Added exclusion \"{}\" for user {}", category, id);
        }
        "--reset-digest" => {
            let detached = repo.reset_digest(id).await?;
            println!("Reset digest {}: {} articles detached", id, detached);
        }
        other => {
            eprintln!("{}", USAGE);
            return Err(AppError::Validation(format!("unknown flag: {}", other)));
        }
    }
    Ok(())
}

fn build_pipeline(config: &Config, repo: Arc<Repository>) -> Result<Pipeline> {
    let api_key = config
        .anthropic_api_key
        .clone()
        .ok_or_else(|| AppError::Config("anthropic_api_key is not set".to_string()))?;
    let scoring = Arc::new(AnthropicClient::new(
        api_key.clone(),
        config.model.clone(),
        config.provider_max_retries,
    )?);

    let embedding_url = config
        .embedding_api_url
        .clone()
        .ok_or_else(|| AppError::Config("embedding_api_url is not set".to_string()))?;
    let embedding_key = config.embedding_api_key.clone().unwrap_or(api_key);
    let embedding = Arc::new(HttpEmbedder::new(
        embedding_url,
        embedding_key,
        config.embedding_model.clone(),
        config.provider_max_retries,
    )?);

    Ok(Pipeline::new(config, repo, scoring, embedding))
}
