// Worker pool
//
// Decision: Workers are tokio tasks in a JoinSet; each loops on the shared
// intake receiver until it claims a termination token or the queue closes.
// Decision: A unit failure (lookup miss, unsupported language, pipeline error or
// panic) is logged with the document identity and never stops the worker.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use nlpworker_core::{
    Annotations, Channel, CoreError, DocumentSource, Message, MessageBus, NlpDone, Pipeline,
    WorkUnit,
};

use crate::events::{self, RunnerEvent};
use crate::intake::{IntakeItem, IntakeReceiver};
use crate::progress::ProgressMonitor;

/// Collaborators and counters shared by every worker of a run
pub(crate) struct WorkerShared {
    pub pipeline: Arc<dyn Pipeline>,
    pub source: Arc<dyn DocumentSource>,
    pub bus: Arc<dyn MessageBus>,
    pub monitor: Arc<ProgressMonitor>,
    pub events: broadcast::Sender<RunnerEvent>,
    pub results_channel: Option<Channel>,
    pub failed: AtomicU64,
}

impl WorkerShared {
    /// Resolve the document language, warm the pipeline up and annotate
    async fn extract(&self, unit: &WorkUnit) -> nlpworker_core::Result<Annotations> {
        let document = self
            .source
            .get(&unit.index_name, &unit.document_id, &unit.routing_id)
            .await?;
        let language = document.language;

        if !self.pipeline.initialize(language).await? {
            return Err(CoreError::pipeline(format!(
                "{} pipeline does not support language {}",
                self.pipeline.kind(),
                language
            )));
        }

        self.pipeline
            .process_in(
                &unit.index_name,
                &unit.document_id,
                &unit.routing_id,
                language,
            )
            .await
    }

    async fn handle(&self, worker: usize, unit: WorkUnit) {
        let outcome = AssertUnwindSafe(self.extract(&unit)).catch_unwind().await;
        let outcome = match outcome {
            Ok(result) => result,
            Err(panic) => Err(CoreError::pipeline(format!(
                "panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };

        match outcome {
            Ok(annotations) => {
                let entities = annotations.entities.len() as u64;
                let processed = self.monitor.record_processed();
                info!(
                    worker,
                    document_id = %unit.document_id,
                    routing_id = %unit.routing_id,
                    index = %unit.index_name,
                    language = %annotations.language,
                    entities,
                    processed,
                    "Document processed"
                );
                events::emit(
                    &self.events,
                    RunnerEvent::UnitCompleted {
                        worker,
                        document_id: unit.document_id.clone(),
                        entities,
                    },
                );
                self.publish_done(unit, &annotations, entities).await;
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::AcqRel);
                warn!(
                    worker,
                    document_id = %unit.document_id,
                    routing_id = %unit.routing_id,
                    index = %unit.index_name,
                    error = %e,
                    "Document extraction failed"
                );
                events::emit(
                    &self.events,
                    RunnerEvent::UnitFailed {
                        worker,
                        document_id: unit.document_id,
                        error: e.to_string(),
                    },
                );
            }
        }
    }

    async fn publish_done(&self, unit: WorkUnit, annotations: &Annotations, entities: u64) {
        let Some(channel) = &self.results_channel else {
            return;
        };
        let done = Message::NlpDone(NlpDone {
            document_id: unit.document_id,
            routing_id: unit.routing_id,
            index_name: unit.index_name,
            pipeline: annotations.pipeline,
            entities,
        });
        if let Err(e) = self.bus.publish(channel, done).await {
            warn!(channel = %channel, error = %e, "Failed to publish NLP_DONE");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Fixed set of workers consuming one intake queue
pub(crate) struct WorkerPool {
    tasks: JoinSet<usize>,
}

impl WorkerPool {
    /// Start `parallelism` workers
    pub fn spawn(parallelism: usize, intake: IntakeReceiver, shared: Arc<WorkerShared>) -> Self {
        let mut tasks = JoinSet::new();
        for worker in 0..parallelism.max(1) {
            let intake = intake.clone();
            let shared = shared.clone();
            tasks.spawn(async move { worker_loop(worker, intake, shared).await });
        }
        debug!(parallelism, "Worker pool started");
        Self { tasks }
    }

    /// Wait for every worker to exit
    pub async fn join(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(worker) => debug!(worker, "Worker exited"),
                Err(e) => error!(error = ?e, "Worker task panicked"),
            }
        }
    }
}

async fn worker_loop(worker: usize, intake: IntakeReceiver, shared: Arc<WorkerShared>) -> usize {
    debug!(worker, "Worker started");
    loop {
        match intake.claim().await {
            Some(IntakeItem::Work(unit)) => shared.handle(worker, unit).await,
            Some(IntakeItem::Terminate) => {
                debug!(worker, "Worker claimed termination token");
                break;
            }
            None => {
                debug!(worker, "Intake closed");
                break;
            }
        }
    }
    worker
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nlpworker_bus::InMemoryBus;
    use nlpworker_core::{Document, Language, PipelineKind};
    use nlpworker_store::InMemoryDocumentStore;

    use crate::intake::intake;

    struct PanickyPipeline;

    #[async_trait]
    impl Pipeline for PanickyPipeline {
        fn kind(&self) -> PipelineKind {
            PipelineKind::Test
        }

        async fn initialize(&self, language: Language) -> nlpworker_core::Result<bool> {
            Ok(language != Language::Unknown)
        }

        async fn process(
            &self,
            document_id: &str,
            _routing_id: &str,
            language: Language,
        ) -> nlpworker_core::Result<Annotations> {
            if document_id == "boom" {
                panic!("engine crashed");
            }
            Ok(Annotations::new(document_id, PipelineKind::Test, language))
        }
    }

    async fn shared(store: InMemoryDocumentStore) -> Arc<WorkerShared> {
        Arc::new(WorkerShared {
            pipeline: Arc::new(PanickyPipeline),
            source: Arc::new(store),
            bus: Arc::new(InMemoryBus::new()),
            monitor: Arc::new(ProgressMonitor::new()),
            events: events::channel(),
            results_channel: None,
            failed: AtomicU64::new(0),
        })
    }

    #[tokio::test]
    async fn test_panic_is_a_unit_failure() {
        let store = InMemoryDocumentStore::new();
        for id in ["boom", "fine"] {
            store
                .insert("idx", Document::new(id, id, "", Language::English))
                .await;
        }
        let shared = shared(store).await;
        let (tx, rx) = intake(4);
        let pool = WorkerPool::spawn(1, rx, shared.clone());

        tx.submit(WorkUnit::new("boom", "boom", "idx")).await.unwrap();
        tx.submit(WorkUnit::new("fine", "fine", "idx")).await.unwrap();
        tx.terminate(1).await.unwrap();
        pool.join().await;

        assert_eq!(shared.monitor.processed(), 1);
        assert_eq!(shared.failed.load(Ordering::Acquire), 1);
    }

    #[tokio::test]
    async fn test_unsupported_language_is_a_unit_failure() {
        let store = InMemoryDocumentStore::new();
        store
            .insert("idx", Document::new("d", "d", "", Language::Unknown))
            .await;
        let shared = shared(store).await;
        let mut events = shared.events.subscribe();
        let (tx, rx) = intake(4);
        let pool = WorkerPool::spawn(1, rx, shared.clone());

        tx.submit(WorkUnit::new("d", "d", "idx")).await.unwrap();
        drop(tx);
        pool.join().await;

        assert_eq!(shared.monitor.processed(), 0);
        match events.recv().await.unwrap() {
            RunnerEvent::UnitFailed { document_id, error, .. } => {
                assert_eq!(document_id, "d");
                assert!(error.contains("does not support language"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
