//! One generation cycle: simulated time in, published entity out
//!
//! ```text
//! ensure loaded ─► lap index ─► resolve ─► lap telemetry
//!               ─► select ─► format ─► publish
//! ```
//!
//! Every step that can fail is folded into a [`CycleOutcome`]; nothing escapes a tick.
//! Only errors that mean the dataset itself is bad reset the cache.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::CacheState;
use crate::clock::clamp_elapsed;
use crate::entity::{Entity, EntityContext, format_entity};
use crate::provider::Provider;
use crate::resolver::resolve;
use crate::selector::{Selection, select};
use crate::sink::{Sink, SinkError};
use crate::types::{ResolveStatus, SessionKey};
use crate::{ReplayError, Result};

/// Result of one tick of the generator.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Entity accepted by the sink
    Published { lap_number: u32, status: ResolveStatus },
    /// Sink rejected the update or could not be reached; not retried
    PublishFailed(SinkError),
    /// Lap resolved but no telemetry to sample; nothing published
    PartialSkipped { lap_number: u32, reason: String },
    /// Sample could not be formatted; nothing published
    FormatSkipped,
    Failed(ReplayError),
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published { .. })
    }
}

enum Step {
    Ready { entity: Box<Entity>, status: ResolveStatus },
    Partial { lap_number: u32, reason: String },
    Unformattable,
}

/// Everything a tick needs besides the cache it runs against.
pub struct GenerationCycle {
    provider: Arc<dyn Provider>,
    sink: Arc<dyn Sink>,
    key: SessionKey,
    subject: String,
    ctx: EntityContext,
}

impl GenerationCycle {
    pub fn new(
        provider: Arc<dyn Provider>,
        sink: Arc<dyn Sink>,
        key: SessionKey,
        subject: impl Into<String>,
        ctx: EntityContext,
    ) -> Self {
        Self { provider, sink, key, subject: subject.into(), ctx }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn context(&self) -> &EntityContext {
        &self.ctx
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Run a single tick against `cache`.
    #[tracing::instrument(
        name = "generation_cycle",
        skip(self, cache, observed_at),
        fields(subject = %self.subject, session = %self.key)
    )]
    pub async fn run(
        &self,
        cache: &mut CacheState,
        elapsed: f64,
        observed_at: DateTime<Utc>,
    ) -> CycleOutcome {
        let elapsed = clamp_elapsed(elapsed);
        debug!(elapsed, "Generating data point");

        let (entity, status) = match self.prepare(cache, elapsed, observed_at).await {
            Ok(Step::Ready { entity, status }) => (entity, status),
            Ok(Step::Partial { lap_number, reason }) => {
                warn!(elapsed, lap_number, %reason, "Partial data point. Skipping send");
                return CycleOutcome::PartialSkipped { lap_number, reason };
            }
            Ok(Step::Unformattable) => {
                warn!(elapsed, "Formatted entity is empty. Skipping send");
                return CycleOutcome::FormatSkipped;
            }
            Err(e) => {
                error!(elapsed, error = %e, "Generation cycle failed");
                if e.invalidates_cache() {
                    cache.reset();
                }
                return CycleOutcome::Failed(e);
            }
        };

        let lap_number = entity.lap_number.value;
        match self.sink.publish(std::slice::from_ref(entity.as_ref())).await {
            Ok(()) => {
                info!(elapsed, lap_number, %status, "Published data point");
                CycleOutcome::Published { lap_number, status }
            }
            Err(e) => {
                error!(elapsed, lap_number, error = %e, "Failed to publish data point");
                CycleOutcome::PublishFailed(e)
            }
        }
    }

    async fn prepare(
        &self,
        cache: &mut CacheState,
        elapsed: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Step> {
        let dataset = cache.ensure_loaded(self.provider.as_ref(), &self.key).await?;
        let index = cache.ensure_lap_index(&dataset, &self.subject)?;
        let resolution = resolve(&index, elapsed)?;

        let telemetry = cache
            .lap_telemetry(
                self.provider.as_ref(),
                &self.key,
                &self.subject,
                resolution.lap.lap_number,
            )
            .await;

        let sample = match select(&telemetry, &resolution)? {
            Selection::Selected(sample) => sample,
            Selection::PartialNoTelemetry { lap_number, reason, .. } => {
                return Ok(Step::Partial { lap_number, reason });
            }
        };

        let point = resolution.with_sample(elapsed, sample);
        let source = dataset.source_session();
        Ok(match format_entity(&point, &self.subject, &source, &self.ctx, observed_at) {
            Some(entity) => Step::Ready { entity: Box::new(entity), status: resolution.status },
            None => Step::Unformattable,
        })
    }
}
