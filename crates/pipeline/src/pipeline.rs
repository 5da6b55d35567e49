//! The event-facing pipeline surface
//!
//! A [`Pipeline`] ties the router to a set of destinations, each owning a
//! buffer and a flush controller. Producers call [`emit`](Pipeline::emit)
//! or [`emit_batch`](Pipeline::emit_batch); the tag picks a destination,
//! the destination's chunking config derives the chunk key, and the event
//! lands in that destination's buffer.
//!
//! Tags that match no rule are counted and logged once per tag, then
//! dropped; an unmatched tag is a configuration gap, not a producer error.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use relay_buffer::{
    Buffer, BufferConfig, ChunkingConfig, Clock, EventTime, Record, SystemClock,
};
use relay_routing::{Pattern, Router, RouterBuilder};

use crate::controller::{FlushConfig, FlushController};
use crate::error::{PipelineError, Result};
use crate::metrics::PipelineMetrics;
use crate::retry::RetryConfig;
use crate::sink::Sink;

/// One destination for routed events
struct Destination {
    name: String,
    buffer: Arc<Buffer>,
}

/// Tag-routed event pipeline
pub struct Pipeline {
    router: Router,
    destinations: Vec<Destination>,
    controllers: Vec<Arc<FlushController>>,
    warned_tags: Mutex<HashSet<String>>,
    metrics: Arc<PipelineMetrics>,
    shutdown: CancellationToken,
}

impl Pipeline {
    /// Start building a pipeline
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Route and buffer one event
    pub async fn emit(&self, tag: &str, time: EventTime, record: Record) -> Result<()> {
        self.emit_batch(tag, vec![(time, record)]).await
    }

    /// Route and buffer an ordered batch of events sharing one tag
    ///
    /// Events are appended in batch order. A batch may span multiple chunk
    /// keys (timekey boundaries, extracted variables); each contiguous run
    /// of one key is written as a unit so per-key ordering holds.
    pub async fn emit_batch(&self, tag: &str, events: Vec<(EventTime, Record)>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let Some(id) = self.router.route(tag) else {
            self.metrics.record_unmatched(events.len() as u64);
            if self.warned_tags.lock().insert(tag.to_string()) {
                tracing::warn!(tag, "no routing rule matches tag, events dropped");
            }
            return Ok(());
        };

        let destination = &self.destinations[id.as_usize()];
        let count = events.len() as u64;

        let mut run: Vec<(EventTime, Record)> = Vec::new();
        let mut run_key = None;
        for (time, record) in events {
            let key = destination.buffer.metadata_for(tag, time, &record);
            if run_key.as_ref() != Some(&key) {
                if let Some(prev) = run_key.take() {
                    destination.buffer.write(prev, &run).await?;
                    run.clear();
                }
                run_key = Some(key);
            }
            run.push((time, record));
        }
        if let Some(key) = run_key {
            destination.buffer.write(key, &run).await?;
        }

        self.metrics.record_emitted(count);
        Ok(())
    }

    /// Run every destination's flush loop until shutdown, then drain
    ///
    /// Returns the first drain error if any destination failed to empty.
    pub async fn run(&self) -> Result<()> {
        let mut loops = JoinSet::new();
        for controller in &self.controllers {
            let controller = Arc::clone(controller);
            loops.spawn(async move { controller.run().await });
        }

        let mut first_err = None;
        while let Some(joined) = loops.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "destination failed to drain");
                    first_err.get_or_insert(e);
                }
                Err(e) => tracing::error!(error = %e, "flush loop panicked"),
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Signal shutdown to producers and flush loops
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Per-destination flush controllers, in registration order
    pub fn controllers(&self) -> &[Arc<FlushController>] {
        &self.controllers
    }

    /// Look up a destination's controller by name
    pub fn controller(&self, name: &str) -> Option<&Arc<FlushController>> {
        self.controllers.iter().find(|c| c.name() == name)
    }

    /// Emission metrics
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }
}

/// Everything one destination needs: a sink plus its buffering, chunking,
/// flush, and retry parameters
pub struct DestinationSpec {
    pub name: String,
    pub sink: Arc<dyn Sink>,
    pub secondary: Option<Arc<dyn Sink>>,
    pub buffer: BufferConfig,
    pub chunking: ChunkingConfig,
    pub flush: FlushConfig,
    pub retry: RetryConfig,
}

impl DestinationSpec {
    /// A destination with default buffering and retry behavior
    pub fn new(name: impl Into<String>, sink: Arc<dyn Sink>) -> Self {
        Self {
            name: name.into(),
            sink,
            secondary: None,
            buffer: BufferConfig::default(),
            chunking: ChunkingConfig::default(),
            flush: FlushConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Builder assembling destinations and routing rules into a [`Pipeline`]
pub struct PipelineBuilder {
    destinations: Vec<DestinationSpec>,
    rules: Vec<(Vec<String>, String)>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            destinations: Vec::new(),
            rules: Vec::new(),
            clock: Arc::new(SystemClock),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register a destination
    pub fn destination(mut self, spec: DestinationSpec) -> Self {
        self.destinations.push(spec);
        self
    }

    /// Add a routing rule: any matching pattern sends the tag to `destination`
    ///
    /// Rules match in insertion order, first match wins.
    pub fn route(mut self, patterns: &[&str], destination: &str) -> Self {
        self.rules.push((
            patterns.iter().map(|p| (*p).to_string()).collect(),
            destination.to_string(),
        ));
        self
    }

    /// Override the clock (tests)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use an externally owned shutdown token
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Compile patterns, resolve destination names, and wire everything up
    ///
    /// # Errors
    ///
    /// Fails on malformed patterns, duplicate or unknown destination names,
    /// and an empty destination set. All of these are configuration errors;
    /// nothing here fails at runtime.
    pub fn build(self) -> Result<Pipeline> {
        if self.destinations.is_empty() {
            return Err(PipelineError::NoDestinations);
        }

        let mut names: HashSet<&str> = HashSet::new();
        for spec in &self.destinations {
            if !names.insert(&spec.name) {
                return Err(PipelineError::DuplicateDestination(spec.name.clone()));
            }
        }

        let mut router = RouterBuilder::new();
        for (patterns, target) in &self.rules {
            let index = self
                .destinations
                .iter()
                .position(|spec| spec.name == *target)
                .ok_or_else(|| PipelineError::UnknownDestination(target.clone()))?;

            let compiled = patterns
                .iter()
                .map(|p| Pattern::compile(p))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            router = router.rule(compiled, relay_routing::DestinationId::new(index as u16))?;
        }
        let router = router.build();

        let mut destinations = Vec::with_capacity(self.destinations.len());
        let mut controllers = Vec::with_capacity(self.destinations.len());
        for spec in self.destinations {
            let buffer = Arc::new(Buffer::new(
                spec.buffer,
                spec.chunking,
                Arc::clone(&self.clock),
                self.shutdown.clone(),
            ));
            controllers.push(Arc::new(FlushController::new(
                spec.name.clone(),
                Arc::clone(&buffer),
                spec.sink,
                spec.secondary,
                spec.flush,
                spec.retry,
                Arc::clone(&self.clock),
                self.shutdown.clone(),
            )));
            destinations.push(Destination {
                name: spec.name,
                buffer,
            });
        }

        tracing::info!(
            destinations = destinations.len(),
            rules = self.rules.len(),
            "pipeline assembled"
        );

        Ok(Pipeline {
            router,
            destinations,
            controllers,
            warned_tags: Mutex::new(HashSet::new()),
            metrics: Arc::new(PipelineMetrics::new()),
            shutdown: self.shutdown,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "destinations",
                &self
                    .destinations
                    .iter()
                    .map(|d| d.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
