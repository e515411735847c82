//! The odd/even message flow.
//!
//! Numbers travel through these stages:
//!
//! 1. **Producers** (`producer`, `gateway`): a sequential counter and a
//!    random negative source, each ticked by the `worker` scheduler
//! 2. **Registry** (`registry`): named publish/subscribe channels
//! 3. **Routing** (`router`): parity split of the ingress channel
//! 4. **Pipelines** (`pipeline`): transform to text, then a terminal handler
//! 5. **Service activator** (`activator`): second consumer of the odd channel
//!
//! `topology` wires all of the above from a `FlowConfig`; `observer` sees
//! every stage; `shutdown` coordinates stopping the workers.

pub mod activator;
pub mod config;
pub mod gateway;
pub mod observer;
pub mod pipeline;
pub mod producer;
pub mod registry;
pub mod router;
pub mod shutdown;
pub mod topology;
pub mod worker;

// Re-export key types for convenient access.
pub use activator::ServiceActivator;
pub use config::{ConfigError, FlowConfig};
pub use gateway::ChannelGateway;
pub use observer::{
    CompositeStageObserver, RecordingObserver, Stage, StageEvent, StageObserver, StageOutput,
    TracingObserver,
};
pub use pipeline::{
    parity_filter, Filter, Handler, NumberTransformer, Pipeline, PipelineKind, TerminalHandler,
    Transformer,
};
pub use producer::{GatewayProducer, SequentialProducer};
pub use registry::{InMemoryChannelRegistry, StatsSnapshot};
pub use router::ParityRouter;
pub use shutdown::{LifecycleState, ShutdownController, TickGuard};
pub use topology::FlowTopology;
pub use worker::{PeriodicTask, PeriodicWorker, Scheduler};
