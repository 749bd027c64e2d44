// SPDX-License-Identifier: MIT OR Apache-2.0
//! Request processing chain.
//!
//! A [`Pipeline`] chains zero or more [`RequestStage`] implementations that
//! inspect and mutate a [`RequestContext`]. Stages run in insertion order;
//! any fault short-circuits the remaining stages. Wrap the chain with
//! [`Pipeline::into_boundary`] so faults never escape to the caller.

use crate::boundary::NormalizationStage;
use crate::context::RequestContext;
use crate::fault::Fault;
use crate::handler::ErrorHandler;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// A single unit of request processing (parse, validate, execute, ...).
#[async_trait]
pub trait RequestStage: Send + Sync {
    /// Process the request.
    ///
    /// Return `Ok(())` to continue to the next stage, or `Err` to
    /// short-circuit the pipeline.
    async fn invoke(&self, ctx: &mut RequestContext) -> Result<(), Fault>;

    /// Human-readable name used in tracing output.
    fn name(&self) -> &str;
}

#[async_trait]
impl<S: RequestStage + ?Sized> RequestStage for Arc<S> {
    async fn invoke(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        (**self).invoke(ctx).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// An ordered chain of [`RequestStage`]s executed sequentially.
///
/// A pipeline is itself a stage, so chains nest.
///
/// ```
/// use qeb_pipeline::{DefaultErrorHandler, Pipeline};
///
/// let boundary = Pipeline::new().into_boundary(DefaultErrorHandler::default());
/// assert_eq!(boundary.next_name(), "pipeline");
/// ```
pub struct Pipeline {
    stages: Vec<Box<dyn RequestStage>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create an empty pipeline with no stages.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage to the pipeline (builder pattern).
    #[must_use]
    pub fn stage<S: RequestStage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Return the number of stages in the pipeline.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Return `true` if the pipeline contains no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Wrap this chain in a [`NormalizationStage`] using `handler`.
    #[must_use]
    pub fn into_boundary(self, handler: impl ErrorHandler + 'static) -> NormalizationStage {
        NormalizationStage::new(Arc::new(self), Arc::new(handler))
    }
}

#[async_trait]
impl RequestStage for Pipeline {
    async fn invoke(&self, ctx: &mut RequestContext) -> Result<(), Fault> {
        for stage in &self.stages {
            debug!(target: "qeb.pipeline", request_id = %ctx.id(), stage = %stage.name(), "executing");
            stage.invoke(ctx).await?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "pipeline"
    }
}
