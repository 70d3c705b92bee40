//! End-to-end pipeline behaviour with scripted providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use recap::embedding::EmbeddingProvider;
use recap::llm::prompts::{DEFAULT_INITIAL_TEMPLATE, DEFAULT_REFINE_TEMPLATE};
use recap::llm::{LanguageModelProvider, PromptTemplate};
use recap::segment::{BreakpointStrategy, SemanticSegmenter};
use recap::summary::{RefineOrchestrator, SummaryPipeline};
use recap::RecapError;

const TOPICS: [&str; 4] = ["rust", "cooking", "football", "unrelated"];

/// Embeds text as keyword counts over `TOPICS`, with an optional failure
/// and optional per-batch delays that make later batches finish first.
struct KeywordEmbedder {
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
    reverse_latency: bool,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on_call: None,
            reverse_latency: false,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = TOPICS
        .iter()
        .map(|t| lower.matches(t).count() as f32)
        .collect();
    // Keeps keyword-free sentences from being zero vectors.
    v.push(0.01);
    v
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            anyhow::bail!("embedding service unavailable");
        }
        if self.reverse_latency {
            let delay = 40u64.saturating_sub(call as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Records prompts and answers call N with "summary N".
struct RecordingModel {
    prompts: Mutex<Vec<String>>,
    fail_on_call: Option<usize>,
}

impl RecordingModel {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail_on_call: None,
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModelProvider for RecordingModel {
    async fn complete(&self, prompt: &str) -> AnyResult<String> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        if self.fail_on_call == Some(call) {
            anyhow::bail!("request timed out");
        }
        Ok(format!("summary {}", call))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn segmenter() -> SemanticSegmenter {
    SemanticSegmenter::new(BreakpointStrategy::Percentile(0.95)).with_buffer_size(0)
}

fn pipeline(
    segmenter: SemanticSegmenter,
    embedder: Arc<KeywordEmbedder>,
    model: Arc<RecordingModel>,
) -> SummaryPipeline {
    let orchestrator = RefineOrchestrator::new(
        model,
        PromptTemplate::initial("INITIAL: {text}").unwrap(),
        PromptTemplate::refine("REFINE: {existing_answer} || {text}").unwrap(),
    );
    SummaryPipeline::new(segmenter, embedder, orchestrator)
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[tokio::test]
async fn unrelated_sentence_becomes_second_chunk() {
    let transcript = "Sentence one. Sentence two. Totally unrelated sentence three.";
    let embedder = Arc::new(KeywordEmbedder::new());

    let chunks = segmenter()
        .segment(transcript, embedder.as_ref())
        .await
        .unwrap();
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["Sentence one. Sentence two.", "Totally unrelated sentence three."]
    );

    let model = Arc::new(RecordingModel::new());
    let summary = pipeline(segmenter(), embedder, model.clone())
        .run(transcript, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.chunk_count, 2);
    assert_eq!(summary.text, "summary 2");
    let prompts = model.prompts();
    assert_eq!(
        prompts,
        vec![
            "INITIAL: Sentence one. Sentence two.".to_string(),
            "REFINE: summary 1 || Totally unrelated sentence three.".to_string(),
        ]
    );
}

#[tokio::test]
async fn empty_transcript_makes_no_provider_calls() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let model = Arc::new(RecordingModel::new());
    let pipeline = pipeline(segmenter(), embedder.clone(), model.clone());

    for transcript in ["", "   \n\t "] {
        let err = pipeline.summarize(transcript).await.unwrap_err();
        assert!(matches!(err, RecapError::InvalidInput(_)), "{err:?}");
    }
    assert_eq!(embedder.calls(), 0);
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn embedding_failure_prevents_model_calls() {
    let mut embedder = KeywordEmbedder::new();
    embedder.fail_on_call = Some(2);
    let embedder = Arc::new(embedder);
    let model = Arc::new(RecordingModel::new());

    let pipeline = pipeline(
        segmenter().with_batching(1, 1),
        embedder.clone(),
        model.clone(),
    );
    let err = pipeline
        .summarize("Rust is fast. Cooking is fun. Football is loud.")
        .await
        .unwrap_err();

    assert!(matches!(err, RecapError::EmbeddingFailure(_)), "{err:?}");
    assert!(err.to_string().contains("embedding service unavailable"));
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn model_is_called_once_per_chunk() {
    let transcript = "Rust has ownership. Rust has borrowing. \
        Cooking needs salt. Cooking needs heat. \
        Football has goals. Football has fans.";
    let embedder = Arc::new(KeywordEmbedder::new());
    let model = Arc::new(RecordingModel::new());

    let seg = SemanticSegmenter::new(BreakpointStrategy::Percentile(0.5)).with_buffer_size(0);
    let summary = pipeline(seg, embedder, model.clone())
        .run(transcript, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.chunk_count, 3);
    let prompts = model.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].starts_with("INITIAL: Rust has ownership. Rust has borrowing."));
    assert!(prompts[1].starts_with("REFINE: summary 1 || Cooking"));
    assert!(prompts[2].starts_with("REFINE: summary 2 || Football"));
    assert_eq!(summary.text, "summary 3");
}

#[tokio::test]
async fn model_failure_surfaces_partial_summary() {
    let transcript = "Rust has ownership. Rust has borrowing. \
        Cooking needs salt. Cooking needs heat. \
        Football has goals. Football has fans.";
    let embedder = Arc::new(KeywordEmbedder::new());
    let mut model = RecordingModel::new();
    model.fail_on_call = Some(2);
    let model = Arc::new(model);

    let seg = SemanticSegmenter::new(BreakpointStrategy::Percentile(0.5)).with_buffer_size(0);
    let err = pipeline(seg, embedder, model.clone())
        .summarize(transcript)
        .await
        .unwrap_err();

    match &err {
        RecapError::SummarizationFailure {
            chunk_index,
            partial_summary,
            ..
        } => {
            assert_eq!(*chunk_index, 2);
            assert_eq!(partial_summary, "summary 1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.partial_summary(), Some("summary 1"));
    assert_eq!(model.prompts().len(), 2);
}

#[tokio::test]
async fn chunks_cover_transcript_in_order() {
    let transcript = "Rust compiles slowly.  Rust is safe!\n\
        Is cooking an art? Cooking is chemistry.\n\n\
        Football, again. Football forever. Then something unrelated happened.   \
        Rust again at the end.";
    let embedder = KeywordEmbedder::new();

    for strategy in [
        BreakpointStrategy::Percentile(0.3),
        BreakpointStrategy::Percentile(0.95),
        BreakpointStrategy::StandardDeviation(0.5),
        BreakpointStrategy::Interquartile(0.5),
        BreakpointStrategy::Gradient(0.8),
    ] {
        let chunks = SemanticSegmenter::new(strategy)
            .with_buffer_size(1)
            .segment(transcript, &embedder)
            .await
            .unwrap();

        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
        assert!(chunks.windows(2).all(|w| w[0].spans.end == w[1].spans.start));
        assert_eq!(chunks[0].spans.start, 0);

        let rejoined = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(normalize(&rejoined), normalize(transcript), "{strategy:?}");
    }
}

#[tokio::test]
async fn segmentation_is_repeatable() {
    let transcript = "Rust one. Rust two. Cooking one. Football one. Football two.";
    let embedder = KeywordEmbedder::new();
    let seg = SemanticSegmenter::new(BreakpointStrategy::Percentile(0.6));

    let first = seg.segment(transcript, &embedder).await.unwrap();
    let second = seg.segment(transcript, &embedder).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn concurrent_batches_rejoin_in_span_order() {
    let transcript = "Rust one. Rust two. Rust three. Cooking one. Cooking two. \
        Cooking three. Football one. Football two.";

    let sequential = SemanticSegmenter::new(BreakpointStrategy::Percentile(0.7))
        .with_buffer_size(0)
        .with_batching(2, 1)
        .segment(transcript, &KeywordEmbedder::new())
        .await
        .unwrap();

    let mut slow_first = KeywordEmbedder::new();
    slow_first.reverse_latency = true;
    let concurrent = SemanticSegmenter::new(BreakpointStrategy::Percentile(0.7))
        .with_buffer_size(0)
        .with_batching(2, 4)
        .segment(transcript, &slow_first)
        .await
        .unwrap();

    assert_eq!(slow_first.calls(), 4);
    assert_eq!(sequential, concurrent);
    assert_eq!(concurrent.len(), 3);
}

#[tokio::test]
async fn single_sentence_skips_embeddings() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let model = Arc::new(RecordingModel::new());

    let summary = pipeline(segmenter(), embedder.clone(), model.clone())
        .run("Just one sentence without a break", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.chunk_count, 1);
    assert_eq!(embedder.calls(), 0);
    let prompts = model.prompts();
    assert_eq!(prompts, vec!["INITIAL: Just one sentence without a break".to_string()]);
}

#[tokio::test]
async fn cancelled_run_makes_no_model_calls() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let model = Arc::new(RecordingModel::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline(segmenter(), embedder, model.clone())
        .run("Rust one. Cooking two.", &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RecapError::Cancelled {
            completed_chunks: 0,
            ..
        }
    ));
    assert!(model.prompts().is_empty());
}

/// Never answers within the lifetime of a test.
struct StalledEmbedder;

#[async_trait]
impl EmbeddingProvider for StalledEmbedder {
    async fn embed(&self, _texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        anyhow::bail!("embedding request timed out")
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

#[tokio::test]
async fn cancel_interrupts_pending_embeddings() {
    let model = Arc::new(RecordingModel::new());
    let orchestrator = RefineOrchestrator::new(
        model.clone(),
        PromptTemplate::initial("INITIAL: {text}").unwrap(),
        PromptTemplate::refine("REFINE: {existing_answer} || {text}").unwrap(),
    );
    let pipeline = SummaryPipeline::new(segmenter(), Arc::new(StalledEmbedder), orchestrator);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.run("Rust one. Cooking two. Football three.", &cancel),
    )
    .await
    .expect("cancellation should not wait for embeddings")
    .unwrap_err();

    match err {
        RecapError::Cancelled {
            completed_chunks,
            partial_summary,
        } => {
            assert_eq!(completed_chunks, 0);
            assert!(partial_summary.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn independent_transcripts_run_concurrently() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let model = Arc::new(RecordingModel::new());
    let pipeline = pipeline(segmenter(), embedder, model.clone());

    let (a, b) = tokio::join!(
        pipeline.summarize("Rust one. Rust two."),
        pipeline.summarize("Cooking one. Cooking two.")
    );

    assert!(a.unwrap().starts_with("summary"));
    assert!(b.unwrap().starts_with("summary"));
    assert_eq!(model.prompts().len(), 2);
}

#[tokio::test]
async fn default_prompts_are_rendered_for_each_step() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let model = Arc::new(RecordingModel::new());
    let orchestrator = RefineOrchestrator::new(
        model.clone(),
        PromptTemplate::initial(DEFAULT_INITIAL_TEMPLATE).unwrap(),
        PromptTemplate::refine(DEFAULT_REFINE_TEMPLATE).unwrap(),
    );
    let pipeline = SummaryPipeline::new(segmenter(), embedder, orchestrator);

    let summary = pipeline
        .summarize("Sentence one. Sentence two. Totally unrelated sentence three.")
        .await
        .unwrap();

    assert!(!summary.is_empty());
    let prompts = model.prompts();
    assert!(prompts[0].contains("key takeaways for the audience"));
    assert!(prompts[1].contains("existing summary up to a certain point: summary 1"));
    assert!(prompts[1].contains("Totally unrelated sentence three."));
}
