// End-to-end run: JSON lines in, pattern pipeline over stored documents, NLP_DONE lines out

use std::sync::Arc;
use tokio::io::AsyncReadExt;

use nlpworker_bus::LineBus;
use nlpworker_core::{Channel, Document, Envelope, Language, Message, PipelineKind};
use nlpworker_pipeline::PatternPipeline;
use nlpworker_runner::{ExtractionRunner, RunnerConfig};
use nlpworker_store::InMemoryDocumentStore;

const INPUT: &[u8] = br#"{"type":"INIT_MONITORING","fields":{"VALUE":"2"}}
{"type":"EXTRACT_NLP","fields":{"DOC_ID":"memo","R_ID":"memo","INDEX_NAME":"local-datashare"}}
this line is not an envelope
{"type":"EXTRACT_NLP","fields":{"DOC_ID":"missing","R_ID":"missing"}}
{"type":"SHUTDOWN"}
"#;

#[test_log::test(tokio::test)]
async fn test_line_worker_end_to_end() {
    let store = InMemoryDocumentStore::new();
    store
        .insert(
            "local-datashare",
            Document::new(
                "memo",
                "/memo.txt",
                "Dr. Ada Lovelace of Analytical Engines Ltd wrote to ada@example.org",
                Language::English,
            ),
        )
        .await;
    let source = Arc::new(store);

    let (writer, mut output) = tokio::io::duplex(64 * 1024);
    let bus = Arc::new(LineBus::new(Channel::nlp(), INPUT, writer));
    let pipeline = Arc::new(PatternPipeline::new(source.clone(), "local-datashare"));

    let summary = ExtractionRunner::new(
        RunnerConfig::new()
            .with_parallelism(2)
            .with_results_channel(Some(Channel::nlp())),
        bus.clone(),
        pipeline.clone(),
        source,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.ratio(), 0.5);
    assert_eq!(pipeline.loaded_languages(), vec![Language::English]);

    drop(bus);
    let mut written = String::new();
    output.read_to_string(&mut written).await.unwrap();

    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 1);
    let envelope: Envelope = serde_json::from_str(lines[0]).unwrap();
    match Message::try_from(envelope).unwrap() {
        Message::NlpDone(done) => {
            assert_eq!(done.document_id, "memo");
            assert_eq!(done.pipeline, PipelineKind::Pattern);
            assert_eq!(done.entities, 3);
        }
        other => panic!("unexpected message {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn test_line_worker_reads_the_message_index() {
    let store = InMemoryDocumentStore::new();
    store
        .insert(
            "other-index",
            Document::new("doc", "/doc.txt", "Reply to desk@example.org", Language::English),
        )
        .await;
    let source = Arc::new(store);

    let input: &'static [u8] = br#"{"type":"EXTRACT_NLP","fields":{"DOC_ID":"doc","R_ID":"doc","INDEX_NAME":"other-index"}}
{"type":"SHUTDOWN"}
"#;
    let (writer, _output) = tokio::io::duplex(64 * 1024);
    let bus = Arc::new(LineBus::new(Channel::nlp(), input, writer));
    let pipeline = Arc::new(PatternPipeline::new(source.clone(), "local-datashare"));

    let summary = ExtractionRunner::new(RunnerConfig::new(), bus, pipeline, source)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);
}
