//! Per-channel processing pipelines: optional filter, transformer, terminal handler.
//!
//! A [`Pipeline`] is a single subscriber that runs its stages as a linear
//! chain with direct hand-off. The even and odd pipelines are structurally
//! identical; only their stage labels (and the channel they are bound to)
//! differ.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use oddeven_core::{
    ChannelRegistry, DeliveryError, Message, Parity, Payload, PayloadKind, Subscriber,
};

use super::observer::{Stage, StageEvent, StageObserver, StageOutput};

// ---------------------------------------------------------------------------
// Stage traits
// ---------------------------------------------------------------------------

/// Converts one payload into another.
pub trait Transformer: Send + Sync {
    /// # Errors
    ///
    /// Returns `DeliveryError::UnexpectedPayload` if `input` is not a kind
    /// this transformer accepts.
    fn transform(&self, stage: Stage, input: &Payload) -> Result<Payload, DeliveryError>;
}

/// Terminal stage: consumes a payload and returns nothing.
pub trait Handler: Send + Sync {
    /// # Errors
    ///
    /// Returns `DeliveryError::UnexpectedPayload` if `input` is not a kind
    /// this handler accepts.
    fn handle(&self, stage: Stage, input: &Payload) -> Result<(), DeliveryError>;
}

/// Predicate deciding whether a message continues down the pipeline.
pub type Filter = Arc<dyn Fn(&Payload) -> bool + Send + Sync>;

/// A filter that passes only integers of the given parity.
#[must_use]
pub fn parity_filter(parity: Parity) -> Filter {
    Arc::new(move |payload: &Payload| payload.as_int().is_some_and(|n| Parity::of(n) == parity))
}

// ---------------------------------------------------------------------------
// NumberTransformer / TerminalHandler
// ---------------------------------------------------------------------------

/// `Int(n)` -> `Text("Number {n}")`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumberTransformer;

impl NumberTransformer {
    #[must_use]
    pub fn describe(n: i64) -> String {
        format!("Number {n}")
    }
}

impl Transformer for NumberTransformer {
    fn transform(&self, stage: Stage, input: &Payload) -> Result<Payload, DeliveryError> {
        match input {
            Payload::Int(n) => Ok(Payload::Text(Self::describe(*n))),
            Payload::Text(_) => Err(DeliveryError::UnexpectedPayload {
                stage: stage.as_str(),
                expected: PayloadKind::Integer,
                found: input.kind(),
            }),
        }
    }
}

/// Accepts text payloads only and counts what it processed.
///
/// Anything else is rejected loudly so a mis-wired chain shows up as a
/// delivery failure instead of a misleading log line.
#[derive(Debug, Default)]
pub struct TerminalHandler {
    processed: AtomicU64,
}

impl TerminalHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

impl Handler for TerminalHandler {
    fn handle(&self, stage: Stage, input: &Payload) -> Result<(), DeliveryError> {
        if input.as_text().is_none() {
            return Err(DeliveryError::UnexpectedPayload {
                stage: stage.as_str(),
                expected: PayloadKind::String,
                found: input.kind(),
            });
        }
        self.processed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Which side of the topology a pipeline serves. Determines stage labels only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Even,
    Odd,
}

impl PipelineKind {
    fn stages(self) -> (Stage, Stage, Stage) {
        match self {
            Self::Even => (Stage::EvenFilter, Stage::EvenTransformer, Stage::EvenHandler),
            Self::Odd => (Stage::OddFilter, Stage::OddTransformer, Stage::OddHandler),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Even => "even-pipeline",
            Self::Odd => "odd-pipeline",
        }
    }
}

/// Linear transform-then-handle chain bound to one channel.
pub struct Pipeline {
    kind: PipelineKind,
    filter: Option<Filter>,
    transformer: Box<dyn Transformer>,
    handler: Arc<dyn Handler>,
    observer: Arc<dyn StageObserver>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        kind: PipelineKind,
        transformer: Box<dyn Transformer>,
        handler: Arc<dyn Handler>,
        observer: Arc<dyn StageObserver>,
    ) -> Self {
        Self {
            kind,
            filter: None,
            transformer,
            handler,
            observer,
        }
    }

    /// Even pipeline: `NumberTransformer` then `handler`.
    #[must_use]
    pub fn even(handler: Arc<dyn Handler>, observer: Arc<dyn StageObserver>) -> Self {
        Self::new(PipelineKind::Even, Box::new(NumberTransformer), handler, observer)
    }

    /// Odd pipeline: `NumberTransformer` then `handler`.
    #[must_use]
    pub fn odd(handler: Arc<dyn Handler>, observer: Arc<dyn StageObserver>) -> Self {
        Self::new(PipelineKind::Odd, Box::new(NumberTransformer), handler, observer)
    }

    /// Adds a filter stage in front of the transformer.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    #[must_use]
    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    fn report(&self, stage: Stage, channel: &str, input: &Payload, output: StageOutput) {
        self.observer
            .on_stage(&StageEvent::new(stage, channel, input.clone(), output));
    }
}

impl Subscriber for Pipeline {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn on_message(&self, msg: &Message, _bus: &dyn ChannelRegistry) -> Result<(), DeliveryError> {
        let (filter_stage, transform_stage, handle_stage) = self.kind.stages();
        let input = msg.payload();

        if let Some(filter) = &self.filter {
            if !(**filter)(input) {
                self.report(filter_stage, msg.channel(), input, StageOutput::Dropped);
                return Ok(());
            }
        }

        let output = self.transformer.transform(transform_stage, input)?;
        self.report(
            transform_stage,
            msg.channel(),
            input,
            StageOutput::Transformed(output.clone()),
        );

        self.handler.handle(handle_stage, &output)?;
        self.report(handle_stage, msg.channel(), &output, StageOutput::Consumed);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::service::observer::RecordingObserver;
    use crate::service::registry::InMemoryChannelRegistry;

    fn odd_fixture() -> (InMemoryChannelRegistry, Arc<TerminalHandler>, Arc<RecordingObserver>) {
        let registry = InMemoryChannelRegistry::new();
        let handler = Arc::new(TerminalHandler::new());
        let recorder = Arc::new(RecordingObserver::new());
        registry.subscribe(
            "oddChannel",
            Arc::new(Pipeline::odd(handler.clone(), recorder.clone())),
        );
        (registry, handler, recorder)
    }

    #[test]
    fn transformer_formats_number() {
        let out = NumberTransformer
            .transform(Stage::EvenTransformer, &Payload::Int(4))
            .unwrap();
        assert_eq!(out, Payload::Text("Number 4".to_string()));
    }

    #[test]
    fn transformer_formats_negative_number() {
        let out = NumberTransformer
            .transform(Stage::OddTransformer, &Payload::Int(-7))
            .unwrap();
        assert_eq!(out, Payload::Text("Number -7".to_string()));
    }

    #[test]
    fn transformer_rejects_text() {
        let err = NumberTransformer
            .transform(Stage::OddTransformer, &Payload::Text("x".into()))
            .unwrap_err();
        assert_eq!(
            err,
            DeliveryError::UnexpectedPayload {
                stage: "odd-transformer",
                expected: PayloadKind::Integer,
                found: PayloadKind::String,
            }
        );
    }

    #[test]
    fn handler_rejects_integer_loudly() {
        let handler = TerminalHandler::new();
        let err = handler.handle(Stage::EvenHandler, &Payload::Int(3)).unwrap_err();
        assert_eq!(err.stage(), "even-handler");
        assert_eq!(handler.processed(), 0);
    }

    #[test]
    fn pipeline_transforms_then_handles() {
        let (registry, handler, recorder) = odd_fixture();
        let outcome = registry.publish("oddChannel", Payload::Int(7));

        assert_eq!(outcome.delivered, 1);
        assert_eq!(handler.processed(), 1);

        let stages: Vec<_> = recorder.events().into_iter().map(|e| e.stage).collect();
        assert_eq!(stages, vec![Stage::OddTransformer, Stage::OddHandler]);

        let handled = recorder.for_stage(Stage::OddHandler);
        assert_eq!(handled[0].input, Payload::Text("Number 7".to_string()));
        assert_eq!(handled[0].channel, "oddChannel");
    }

    #[test]
    fn pipeline_without_filter_processes_whatever_arrives() {
        // The odd pipeline trusts upstream routing: an even value published
        // straight to its channel is still processed.
        let (registry, handler, recorder) = odd_fixture();
        let _ = registry.publish("oddChannel", Payload::Int(4));

        assert_eq!(handler.processed(), 1);
        assert_eq!(recorder.count(Stage::OddFilter), 0);
    }

    #[test]
    fn filter_stops_chain_without_error() {
        let registry = InMemoryChannelRegistry::new();
        let handler = Arc::new(TerminalHandler::new());
        let recorder = Arc::new(RecordingObserver::new());
        let pipeline = Pipeline::odd(handler.clone(), recorder.clone())
            .with_filter(parity_filter(Parity::Odd));
        assert!(pipeline.has_filter());
        registry.subscribe("oddChannel", Arc::new(pipeline));

        let outcome = registry.publish("oddChannel", Payload::Int(4));
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(handler.processed(), 0);
        assert_eq!(recorder.count(Stage::OddFilter), 1);

        let _ = registry.publish("oddChannel", Payload::Int(-5));
        assert_eq!(handler.processed(), 1);
    }

    #[test]
    fn text_payload_fails_delivery() {
        let (registry, handler, _recorder) = odd_fixture();
        let outcome = registry.publish("oddChannel", Payload::Text("Number 1".into()));
        assert_eq!(outcome.failed, 1);
        assert_eq!(handler.processed(), 0);
    }

    #[test]
    fn even_and_odd_differ_only_in_labels() {
        let recorder = Arc::new(RecordingObserver::new());
        let handler = Arc::new(TerminalHandler::new());
        let even = Pipeline::even(handler.clone(), recorder.clone());
        let odd = Pipeline::odd(handler, recorder);
        assert_eq!(even.kind(), PipelineKind::Even);
        assert_eq!(odd.kind(), PipelineKind::Odd);
        assert_eq!(even.name(), "even-pipeline");
        assert_eq!(odd.name(), "odd-pipeline");
        assert!(!even.has_filter() && !odd.has_filter());
    }

    proptest! {
        #[test]
        fn transformer_output_is_exact(n in any::<i64>()) {
            let out = NumberTransformer.transform(Stage::EvenTransformer, &Payload::Int(n)).unwrap();
            prop_assert_eq!(out, Payload::Text(format!("Number {n}")));
        }
    }
}
