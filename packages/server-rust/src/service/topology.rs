//! Topology wiring: builds the registry, binds subscribers, creates producers.
//!
//! Everything is constructed once, here, and handed its collaborators
//! explicitly. Bindings are never changed after `build`.

use std::sync::Arc;

use oddeven_core::{ChannelRegistry, NumberGateway, Parity};

use super::activator::ServiceActivator;
use super::config::{ConfigError, FlowConfig};
use super::gateway::ChannelGateway;
use super::observer::StageObserver;
use super::pipeline::{parity_filter, Pipeline, TerminalHandler};
use super::producer::{GatewayProducer, SequentialProducer};
use super::registry::{InMemoryChannelRegistry, StatsSnapshot};
use super::router::ParityRouter;
use super::shutdown::ShutdownController;
use super::worker::Scheduler;

/// The wired odd/even flow.
///
/// Subscriptions, in registration order:
/// - ingress: `ParityRouter`
/// - even: even `Pipeline`
/// - odd: odd `Pipeline`, then `ServiceActivator`
pub struct FlowTopology {
    config: FlowConfig,
    registry: Arc<InMemoryChannelRegistry>,
    gateway: Arc<ChannelGateway>,
    sequential: Arc<SequentialProducer>,
    gateway_producer: Arc<GatewayProducer>,
    even_handler: Arc<TerminalHandler>,
    odd_handler: Arc<TerminalHandler>,
}

impl FlowTopology {
    /// Validate `config` and wire the topology it describes.
    ///
    /// # Errors
    ///
    /// Returns the first `FlowConfig::validate` violation; nothing is wired
    /// in that case.
    pub fn build(config: FlowConfig, observer: Arc<dyn StageObserver>) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = Arc::new(InMemoryChannelRegistry::new());
        let bus: Arc<dyn ChannelRegistry> = registry.clone();

        let router = ParityRouter::new(
            config.even_channel.clone(),
            config.odd_channel.clone(),
            Arc::clone(&observer),
        );
        bus.subscribe(&config.ingress_channel, Arc::new(router));

        let even_handler = Arc::new(TerminalHandler::new());
        bus.subscribe(
            &config.even_channel,
            Arc::new(Pipeline::even(even_handler.clone(), Arc::clone(&observer))),
        );

        let odd_handler = Arc::new(TerminalHandler::new());
        let mut odd_pipeline = Pipeline::odd(odd_handler.clone(), Arc::clone(&observer));
        if config.odd_filter {
            odd_pipeline = odd_pipeline.with_filter(parity_filter(Parity::Odd));
        }
        bus.subscribe(&config.odd_channel, Arc::new(odd_pipeline));
        bus.subscribe(
            &config.odd_channel,
            Arc::new(ServiceActivator::new(Arc::clone(&observer))),
        );

        let sequential = Arc::new(SequentialProducer::new(
            Arc::clone(&bus),
            config.sequential_target.clone(),
            config.sequential_period(),
            Arc::clone(&observer),
        ));

        let gateway = Arc::new(ChannelGateway::new(
            Arc::clone(&bus),
            config.gateway_target.clone(),
            observer,
        ));
        let gateway_producer = Arc::new(GatewayProducer::new(
            gateway.clone(),
            config.gateway_bound,
            config.gateway_period(),
        )?);

        for (field, target) in config.targets_bypassing_router() {
            tracing::warn!(
                field,
                target,
                ingress = %config.ingress_channel,
                subscribers = bus.subscriber_count(target),
                "producer target is not the router input"
            );
        }

        Ok(Self {
            config,
            registry,
            gateway,
            sequential,
            gateway_producer,
            even_handler,
            odd_handler,
        })
    }

    /// Start both producers on a new scheduler.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(&self, shutdown: Arc<ShutdownController>) -> Scheduler {
        let mut scheduler = Scheduler::new(Arc::clone(&shutdown));
        scheduler.schedule(self.sequential.clone());
        scheduler.schedule(self.gateway_producer.clone());
        shutdown.set_running();
        scheduler
    }

    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> Arc<InMemoryChannelRegistry> {
        Arc::clone(&self.registry)
    }

    /// The gateway entry point, for callers outside the scheduler.
    #[must_use]
    pub fn gateway(&self) -> Arc<dyn NumberGateway> {
        self.gateway.clone()
    }

    #[must_use]
    pub fn sequential(&self) -> Arc<SequentialProducer> {
        Arc::clone(&self.sequential)
    }

    #[must_use]
    pub fn gateway_producer(&self) -> Arc<GatewayProducer> {
        Arc::clone(&self.gateway_producer)
    }

    /// Messages fully handled by the even and odd pipelines.
    #[must_use]
    pub fn processed(&self) -> (u64, u64) {
        (self.even_handler.processed(), self.odd_handler.processed())
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.registry.stats()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use oddeven_core::Payload;

    use super::*;
    use crate::service::observer::{RecordingObserver, Stage};
    use crate::service::worker::PeriodicTask;

    fn build(config: FlowConfig) -> (FlowTopology, Arc<RecordingObserver>) {
        let recorder = Arc::new(RecordingObserver::new());
        (FlowTopology::build(config, recorder.clone()).unwrap(), recorder)
    }

    #[test]
    fn invalid_config_is_an_error_not_a_panic() {
        let recorder = Arc::new(RecordingObserver::new());
        let bad_bound = FlowTopology::build(
            FlowConfig {
                gateway_bound: 0,
                ..FlowConfig::default()
            },
            recorder.clone(),
        );
        assert!(matches!(bad_bound, Err(ConfigError::InvalidGatewayBound(0))));

        let zero_period = FlowTopology::build(
            FlowConfig {
                sequential_period_ms: 0,
                ..FlowConfig::default()
            },
            recorder.clone(),
        );
        assert!(matches!(zero_period, Err(ConfigError::ZeroPeriod { .. })));

        let self_routing = FlowTopology::build(
            FlowConfig {
                even_channel: "NumberChannel".to_string(),
                ..FlowConfig::default()
            },
            recorder.clone(),
        );
        assert!(matches!(self_routing, Err(ConfigError::AliasedChannels { .. })));
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn default_bindings() {
        let (topology, _) = build(FlowConfig::default());
        let registry = topology.registry();

        assert_eq!(registry.subscriber_names("NumberChannel"), vec!["router"]);
        assert_eq!(registry.subscriber_names("evenChannel"), vec!["even-pipeline"]);
        assert_eq!(
            registry.subscriber_names("oddChannel"),
            vec!["odd-pipeline", "service-activator"]
        );
    }

    #[test]
    fn producers_target_router_input_by_default() {
        let (topology, recorder) = build(FlowConfig::default());
        topology.sequential().tick();
        topology.gateway_producer().tick();

        assert_eq!(recorder.count(Stage::Router), 2);
        assert_eq!(topology.stats().dropped, 0);
    }

    #[test]
    fn gateway_value_reaches_a_pipeline() {
        let (topology, _) = build(FlowConfig::default());
        topology.gateway().send_number(-7);

        assert_eq!(topology.processed(), (0, 1));
    }

    #[test]
    fn odd_filter_is_opt_in() {
        let (topology, recorder) = build(FlowConfig {
            odd_filter: true,
            ..FlowConfig::default()
        });
        let _ = topology
            .registry()
            .publish("oddChannel", Payload::Int(4));

        assert_eq!(recorder.count(Stage::OddFilter), 1);
        assert_eq!(topology.processed(), (0, 0));
        // The activator is not behind the filter.
        assert_eq!(recorder.count(Stage::ServiceActivator), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn started_topology_emits_and_stops() {
        let (topology, recorder) = build(FlowConfig {
            sequential_period_ms: 10,
            gateway_period_ms: 20,
            ..FlowConfig::default()
        });
        let shutdown = Arc::new(ShutdownController::new());
        let mut scheduler = topology.start(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(85)).await;
        shutdown.trigger_shutdown();
        scheduler.stop_all().await;
        assert!(shutdown.wait_for_drain(Duration::from_secs(1)).await);

        // Ticks at 0, 10, ..., 80 and 0, 20, ..., 80.
        assert_eq!(recorder.count(Stage::Source), 9);
        assert_eq!(recorder.count(Stage::Gateway), 5);
        let (even, odd) = topology.processed();
        assert_eq!(even + odd, 14);
    }
}
