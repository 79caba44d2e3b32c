//! Demo command - runs prompts through a cached simulated backend

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Args;
use serde::Serialize;
use tokio::time::Instant;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::backend::Backend;
use crate::domain::cache::HitSource;
use crate::domain::CacheError;
use crate::infrastructure::embedding::HashingEmbedder;
use crate::infrastructure::logging;
use crate::infrastructure::services::SemanticCacheService;

const DEFAULT_PROMPTS: &[&str] = &[
    "What is the capital of France?",
    "what is the capital of france?",
    "Tell me the capital of France",
    "How do I bake sourdough bread?",
    "What is the capital of France?",
];

#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Prompts to send, in order; a built-in sequence is used when empty
    pub prompts: Vec<String>,

    /// Simulated backend latency in milliseconds
    #[arg(long, default_value_t = 250)]
    pub latency_ms: u64,

    /// Override the configured similarity threshold
    #[arg(long)]
    pub threshold: Option<f32>,
}

/// Backend standing in for a slow model
#[derive(Debug)]
pub struct SimulatedBackend {
    latency: Duration,
    answers: HashMap<&'static str, &'static str>,
}

impl SimulatedBackend {
    pub fn new(latency: Duration) -> Self {
        let answers = HashMap::from([
            ("capital", "The capital of France is Paris."),
            ("bread", "Mix flour, water, salt and starter, then proof overnight."),
        ]);

        Self { latency, answers }
    }
}

#[async_trait]
impl Backend for SimulatedBackend {
    async fn invoke(&self, request: &str) -> Result<String, CacheError> {
        tokio::time::sleep(self.latency).await;

        let lowered = request.to_lowercase();
        let answer = self
            .answers
            .iter()
            .find(|(topic, _)| lowered.contains(*topic))
            .map(|(_, answer)| answer.to_string())
            .unwrap_or_else(|| format!("Simulated answer to: {}", request.trim()));

        Ok(answer)
    }
}

#[derive(Debug, Serialize)]
struct DemoLine<'a> {
    prompt: &'a str,
    source: &'static str,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    similarity: Option<f32>,
    elapsed_ms: u128,
    response: &'a str,
}

fn describe(source: HitSource) -> (&'static str, Option<f32>) {
    match source {
        HitSource::Exact => ("exact", None),
        HitSource::Semantic { similarity } => ("semantic", Some(similarity)),
        HitSource::Computed => ("computed", None),
        HitSource::Joined => ("joined", None),
        HitSource::Bypassed => ("bypassed", None),
    }
}

/// Run the demo
pub async fn run(args: DemoArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    if let Some(threshold) = args.threshold {
        config.cache = config.cache.with_similarity_threshold(threshold);
    }

    let cache = SemanticCacheService::new(
        Arc::new(SimulatedBackend::new(Duration::from_millis(args.latency_ms))),
        Arc::new(HashingEmbedder::default()),
        config.cache,
    )?;
    let _sweeper = cache.start_sweeper();

    let prompts: Vec<String> = if args.prompts.is_empty() {
        DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect()
    } else {
        args.prompts
    };

    info!(prompts = prompts.len(), "Running cache demo");

    for prompt in &prompts {
        let started = Instant::now();
        let outcome = cache.call_detailed(prompt).await?;
        let (source, similarity) = describe(outcome.source);

        let line = DemoLine {
            prompt,
            source,
            cached: outcome.source.is_cache_hit(),
            similarity,
            elapsed_ms: started.elapsed().as_millis(),
            response: &outcome.response,
        };

        println!("{}", serde_json::to_string(&line)?);
    }

    println!("{}", serde_json::to_string_pretty(&cache.statistics())?);

    Ok(())
}
