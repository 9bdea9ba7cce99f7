//! Fixed-order middleware pipeline.
//!
//! Every cirrus function runs the same four stages, in this order:
//!
//! 1. **CORS** - write the CORS header table, answer preflights
//! 2. **Body parse** - decode the raw body in place
//! 3. **Handler** - the user function (which may call the validator)
//! 4. **Error translation** - only on failure, renders the error response
//!
//! The order is fixed when the pipeline is built. Callers choose the CORS
//! table, the translator policy and the metadata, never the sequence.

use crate::chain::{Chain, Completion};
use crate::middleware::BoxedMiddleware;
use crate::stages::{BodyParser, CorsStage, ErrorTranslator, Handler, HandlerStage};
use cirrus_core::{RequestContext, ResponseContext};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Pipeline stage identifiers, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: CORS headers
    Cors = 1,
    /// Stage 2: Body parsing
    BodyParse = 2,
    /// Stage 3: User handler
    Handler = 3,
    /// Stage 4: Error translation (failure path only)
    ErrorTranslation = 4,
}

impl Stage {
    /// Returns the stage name as reported by its middleware.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cors => "cors",
            Self::BodyParse => "body_parser",
            Self::Handler => "handler",
            Self::ErrorTranslation => "error_translator",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 4] {
        [
            Self::Cors,
            Self::BodyParse,
            Self::Handler,
            Self::ErrorTranslation,
        ]
    }
}

/// Opaque configuration bag attached to a pipeline.
///
/// Carried and retrievable, never interpreted by the pipeline itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The four-stage pipeline around one handler.
///
/// # Example
///
/// ```
/// use cirrus_core::{RequestContext, ResponseContext};
/// use cirrus_middleware::{handler_fn, Completion, Pipeline};
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder(handler_fn(|_req, res| {
///     Box::pin(async move {
///         res.send(&serde_json::json!({"data": "token generated"}))?;
///         Ok(())
///     })
/// }))
/// .build();
///
/// let mut req = RequestContext::builder().build();
/// let mut res = ResponseContext::new();
/// assert_eq!(pipeline.run(&mut req, &mut res).await, Completion::Completed);
/// assert_eq!(res.header("access-control-allow-origin"), Some("*"));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    chain: Chain,
    metadata: Metadata,
}

impl Pipeline {
    /// Creates a pipeline builder around `handler`.
    pub fn builder(handler: impl Handler) -> PipelineBuilder {
        PipelineBuilder::new(Arc::new(handler))
    }

    /// Creates a pipeline with default stage settings.
    pub fn new(handler: impl Handler, metadata: Metadata) -> Self {
        Self::builder(handler).metadata(metadata).build()
    }

    /// Runs one invocation.
    pub async fn run(&self, req: &mut RequestContext, res: &mut ResponseContext) -> Completion {
        self.chain.run(req, res).await
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.chain.stage_names()
    }

    /// Returns the metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Returns the underlying chain.
    #[must_use]
    pub const fn chain(&self) -> &Chain {
        &self.chain
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    handler: Arc<dyn Handler>,
    cors: CorsStage,
    translator: ErrorTranslator,
    metadata: Metadata,
}

impl PipelineBuilder {
    fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler,
            cors: CorsStage::permissive(),
            translator: ErrorTranslator::new(),
            metadata: Metadata::new(),
        }
    }

    /// Sets the CORS header table.
    #[must_use]
    pub fn cors(mut self, cors: CorsStage) -> Self {
        self.cors = cors;
        self
    }

    /// Sets the error translator policy.
    #[must_use]
    pub fn translator(mut self, translator: ErrorTranslator) -> Self {
        self.translator = translator;
        self
    }

    /// Sets the metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let stages: Vec<BoxedMiddleware> = vec![
            Arc::new(self.cors),
            Arc::new(BodyParser::new()),
            Arc::new(HandlerStage::from_arc(self.handler)),
        ];
        Pipeline {
            chain: Chain::new(stages, self.translator),
            metadata: self.metadata,
        }
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("cors", &self.cors)
            .field("translator", &self.translator)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::BoxFuture;
    use serde_json::json;

    fn noop<'a>(
        _req: &'a mut RequestContext,
        _res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let pipeline = Pipeline::new(noop, Metadata::new());
        let expected: Vec<_> = Stage::all().iter().map(|s| s.name()).collect();
        assert_eq!(pipeline.stage_names(), expected);
    }

    #[test]
    fn test_stage_numbering() {
        assert!(Stage::Cors < Stage::BodyParse);
        assert_eq!(Stage::Handler as u8, 3);
        assert_eq!(Stage::ErrorTranslation.name(), "error_translator");
    }

    #[test]
    fn test_metadata_is_carried() {
        let metadata = Metadata::new().with("route", "/token").with("auth", false);
        let pipeline = Pipeline::new(noop, metadata);
        assert_eq!(pipeline.metadata().get("route"), Some(&json!("/token")));
        assert_eq!(pipeline.metadata().as_map().len(), 2);
        assert!(Metadata::default().is_empty());
    }

    #[test]
    fn test_metadata_serializes_as_plain_object() {
        let metadata = Metadata::new().with("a", 1);
        assert_eq!(serde_json::to_value(&metadata).unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_pipeline_is_shareable() {
        let pipeline = Arc::new(Pipeline::new(noop, Metadata::new()));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pipeline = Arc::clone(&pipeline);
            handles.push(tokio::spawn(async move {
                let mut req = RequestContext::builder().build();
                let mut res = ResponseContext::new();
                pipeline.run(&mut req, &mut res).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Completion::Completed);
        }
    }
}
