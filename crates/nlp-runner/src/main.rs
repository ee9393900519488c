// nlpworker: command-line extraction worker
//
// Design Decision: The work channel is stdin, one JSON envelope per line;
// NLP_DONE notices (when enabled) go to stdout. Logs go to stderr.
// Design Decision: Documents are files under <documents>/<index>/<id>.
// Design Decision: Runner settings come from RunnerConfig::from_env; a flag given on the
// command line overrides its env var.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nlpworker_bus::LineBus;
use nlpworker_core::{Channel, User};
use nlpworker_pipeline::PatternPipeline;
use nlpworker_runner::{config::parse_languages, ExtractionRunner, RunnerConfig};
use nlpworker_store::FsDocumentSource;

#[derive(Parser)]
#[command(name = "nlpworker")]
#[command(about = "Extract named entities from documents announced on a message bus")]
#[command(version)]
struct Cli {
    /// Number of concurrent workers (1 = standalone) [env: NLP_PARALLELISM]
    #[arg(long, short)]
    parallelism: Option<usize>,

    /// Root directory holding <index>/<document id> files
    #[arg(long, short, env = "NLP_DOCUMENTS", default_value = ".")]
    documents: PathBuf,

    /// Capacity of the intake queue [env: NLP_QUEUE_CAPACITY]
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// User the worker runs for; decides the default index [env: DS_USER]
    #[arg(long, short)]
    user: Option<String>,

    /// Channel name expected on stdin [env: NLP_CHANNEL]
    #[arg(long)]
    channel: Option<String>,

    /// Index the pipeline reads document content from (defaults to the user index)
    #[arg(long, env = "NLP_INDEX")]
    index: Option<String>,

    /// Write an NLP_DONE line to stdout for every processed document
    #[arg(long, env = "NLP_PUBLISH_RESULTS")]
    publish_results: bool,

    /// Languages to load before reading stdin, comma separated [env: NLP_PRELOAD_LANGUAGES]
    #[arg(long)]
    preload: Option<String>,
}

impl Cli {
    /// Apply command-line overrides on top of the env config
    fn runner_config(&self) -> RunnerConfig {
        let mut config = RunnerConfig::from_env();
        if let Some(parallelism) = self.parallelism {
            config = config.with_parallelism(parallelism);
        }
        if let Some(capacity) = self.queue_capacity {
            config = config.with_queue_capacity(capacity);
        }
        if let Some(user) = &self.user {
            config = config.with_user(User::new(user.clone()));
        }
        if let Some(channel) = &self.channel {
            config = config.with_channel(Channel::new(channel.clone()));
        }
        if let Some(preload) = &self.preload {
            config = config.with_preload_languages(parse_languages(preload));
        }
        if self.publish_results {
            let channel = config.channel.clone();
            config = config.with_results_channel(Some(channel));
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nlpworker_runner=info,nlpworker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.runner_config();
    let index = cli
        .index
        .clone()
        .unwrap_or_else(|| config.user.default_index());
    let channel = config.channel.clone();

    tracing::info!(
        run_id = %config.run_id,
        parallelism = config.parallelism,
        documents = %cli.documents.display(),
        %index,
        "nlpworker starting"
    );

    let source = Arc::new(FsDocumentSource::new(cli.documents));
    let pipeline = Arc::new(PatternPipeline::new(source.clone(), index));
    let bus = Arc::new(LineBus::stdio(channel));

    let summary = ExtractionRunner::new(config, bus, pipeline, source)
        .run()
        .await
        .map_err(|e| {
            if e.is_bus_failure() {
                tracing::error!(error = %e, "Work channel lost before SHUTDOWN");
            }
            e
        })
        .context("extraction run failed")?;

    tracing::info!(
        processed = summary.processed,
        failed = summary.failed,
        dropped = summary.dropped,
        progress = summary.ratio(),
        "nlpworker finished"
    );
    Ok(())
}
