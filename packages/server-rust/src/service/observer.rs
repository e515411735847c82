//! Stage observers: the diagnostic side channel of the flow.
//!
//! Every stage (sources, router, pipeline steps, service activator) reports a
//! [`StageEvent`] to a [`StageObserver`]. [`TracingObserver`] turns events into
//! structured log lines, [`RecordingObserver`] keeps them in memory, and
//! [`CompositeStageObserver`] fans each event out to several observers.

use std::fmt;
use std::sync::Arc;

use oddeven_core::Payload;
use parking_lot::Mutex;

/// A processing stage of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Source,
    Gateway,
    Router,
    EvenFilter,
    EvenTransformer,
    EvenHandler,
    OddFilter,
    OddTransformer,
    OddHandler,
    ServiceActivator,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Gateway => "gateway",
            Self::Router => "router",
            Self::EvenFilter => "even-filter",
            Self::EvenTransformer => "even-transformer",
            Self::EvenHandler => "even-handler",
            Self::OddFilter => "odd-filter",
            Self::OddTransformer => "odd-transformer",
            Self::OddHandler => "odd-handler",
            Self::ServiceActivator => "service-activator",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage did with its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput {
    /// The value was published to the event's channel.
    Emitted,
    /// The router forwarded the value to the named channel.
    Routed { to: String },
    /// A transformer produced a new payload.
    Transformed(Payload),
    /// A terminal stage consumed the value.
    Consumed,
    /// A filter stopped the chain.
    Dropped,
}

impl fmt::Display for StageOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emitted => f.write_str("emitted"),
            Self::Routed { to } => write!(f, "-> {to}"),
            Self::Transformed(payload) => write!(f, "'{payload}'"),
            Self::Consumed => f.write_str("consumed"),
            Self::Dropped => f.write_str("dropped"),
        }
    }
}

/// One observation: which stage saw what on which channel, and what it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEvent {
    pub stage: Stage,
    pub channel: String,
    pub input: Payload,
    pub output: StageOutput,
}

impl StageEvent {
    #[must_use]
    pub fn new(stage: Stage, channel: &str, input: Payload, output: StageOutput) -> Self {
        Self {
            stage,
            channel: channel.to_string(),
            input,
            output,
        }
    }
}

/// Receives stage events. Used as `Arc<dyn StageObserver>`.
pub trait StageObserver: Send + Sync {
    fn on_stage(&self, event: &StageEvent);
}

/// Emits one structured `tracing` line per stage event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_stage(&self, event: &StageEvent) {
        tracing::info!(
            stage = event.stage.as_str(),
            channel = %event.channel,
            input = %event.input,
            kind = %event.input.kind(),
            output = %event.output,
            "stage"
        );
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<StageEvent>>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<StageEvent> {
        self.events.lock().clone()
    }

    /// Recorded events of a single stage.
    #[must_use]
    pub fn for_stage(&self, stage: Stage) -> Vec<StageEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.stage == stage)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn count(&self, stage: Stage) -> usize {
        self.events.lock().iter().filter(|e| e.stage == stage).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl StageObserver for RecordingObserver {
    fn on_stage(&self, event: &StageEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Composite observer that fans out to multiple observers.
#[derive(Default)]
pub struct CompositeStageObserver {
    observers: Vec<Arc<dyn StageObserver>>,
}

impl CompositeStageObserver {
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn StageObserver>>) -> Self {
        Self { observers }
    }

    /// Adds an observer after construction.
    pub fn add(&mut self, observer: Arc<dyn StageObserver>) {
        self.observers.push(observer);
    }
}

impl StageObserver for CompositeStageObserver {
    fn on_stage(&self, event: &StageEvent) {
        for observer in &self.observers {
            observer.on_stage(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(stage: Stage, n: i64) -> StageEvent {
        StageEvent::new(stage, "oddChannel", Payload::Int(n), StageOutput::Consumed)
    }

    #[test]
    fn recording_observer_keeps_arrival_order() {
        let recorder = RecordingObserver::new();
        recorder.on_stage(&event(Stage::Router, 1));
        recorder.on_stage(&event(Stage::OddHandler, 2));
        recorder.on_stage(&event(Stage::Router, 3));

        let inputs: Vec<_> = recorder.events().into_iter().map(|e| e.input).collect();
        assert_eq!(inputs, vec![Payload::Int(1), Payload::Int(2), Payload::Int(3)]);
        assert_eq!(recorder.count(Stage::Router), 2);
        assert_eq!(recorder.for_stage(Stage::OddHandler).len(), 1);

        recorder.clear();
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn composite_fans_out_to_every_observer() {
        let first = Arc::new(RecordingObserver::new());
        let second = Arc::new(RecordingObserver::new());
        let mut composite = CompositeStageObserver::new(vec![first.clone()]);
        composite.add(second.clone());

        composite.on_stage(&event(Stage::ServiceActivator, 7));

        assert_eq!(first.events(), second.events());
        assert_eq!(first.count(Stage::ServiceActivator), 1);
    }

    #[test]
    fn empty_composite_does_not_panic() {
        CompositeStageObserver::default().on_stage(&event(Stage::Source, 0));
    }

    #[test]
    fn tracing_observer_accepts_every_output() {
        let observer = TracingObserver;
        for output in [
            StageOutput::Emitted,
            StageOutput::Routed { to: "evenChannel".into() },
            StageOutput::Transformed(Payload::Text("Number 4".into())),
            StageOutput::Consumed,
            StageOutput::Dropped,
        ] {
            observer.on_stage(&StageEvent::new(
                Stage::Router,
                "NumberChannel",
                Payload::Int(4),
                output,
            ));
        }
    }

    #[test]
    fn output_display() {
        assert_eq!(
            StageOutput::Routed { to: "oddChannel".into() }.to_string(),
            "-> oddChannel"
        );
        assert_eq!(
            StageOutput::Transformed(Payload::Text("Number 7".into())).to_string(),
            "'Number 7'"
        );
    }
}
