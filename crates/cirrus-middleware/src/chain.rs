//! Middleware chain executor.
//!
//! [`Chain::run`] drives one invocation through the stages in order and acts
//! on each [`Outcome`]:
//!
//! - `Continue` runs the next stage
//! - `Terminate` ends the chain successfully
//! - `Fail` skips every remaining stage and hands the failure to the
//!   [`ErrorTranslator`], exactly once
//!
//! A stage that panics is treated as a failed stage. The panic is caught at
//! the stage boundary and translated like any unclassified error, so the
//! platform always receives a well-formed response.

use crate::middleware::{BoxedMiddleware, Outcome};
use crate::pipeline::Stage;
use crate::stages::ErrorTranslator;
use cirrus_core::{Failure, RequestContext, ResponseContext};
use futures_util::FutureExt;
use http::StatusCode;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// How an invocation left the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every stage ran and continued.
    Completed,
    /// A stage ended the chain early without failing.
    Terminated {
        /// The stage that terminated.
        stage: &'static str,
    },
    /// A stage failed and the error translator wrote the response.
    Translated {
        /// The stage that failed.
        stage: &'static str,
        /// Status written by the translator.
        status: StatusCode,
    },
}

impl Completion {
    /// Returns `true` if the failure path was taken.
    #[must_use]
    pub const fn is_translated(&self) -> bool {
        matches!(self, Self::Translated { .. })
    }
}

/// An ordered sequence of stages plus the error translator.
///
/// Immutable after construction and safe to share across concurrent
/// invocations.
#[derive(Clone)]
pub struct Chain {
    stages: Vec<BoxedMiddleware>,
    translator: Arc<ErrorTranslator>,
}

impl Chain {
    /// Creates a chain.
    #[must_use]
    pub fn new(stages: Vec<BoxedMiddleware>, translator: ErrorTranslator) -> Self {
        Self {
            stages,
            translator: Arc::new(translator),
        }
    }

    /// Runs one invocation through the chain.
    pub async fn run(&self, req: &mut RequestContext, res: &mut ResponseContext) -> Completion {
        for stage in &self.stages {
            let name = stage.name();
            tracing::trace!(stage = name, "entering stage");

            let outcome = AssertUnwindSafe(stage.handle(req, res))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Outcome::Fail(Failure::from_panic(payload, name)));

            match outcome {
                Outcome::Continue => {}
                Outcome::Terminate => {
                    tracing::debug!(stage = name, "chain terminated");
                    return Completion::Terminated { stage: name };
                }
                Outcome::Fail(failure) => {
                    tracing::debug!(stage = name, error.kind = %failure.kind(), "stage failed");
                    let status = self.translator.write(&failure, req, res);
                    return Completion::Translated {
                        stage: name,
                        status,
                    };
                }
            }
        }
        Completion::Completed
    }

    /// Returns the stage names in execution order, error translator last.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .map(|stage| stage.name())
            .chain(std::iter::once(Stage::ErrorTranslation.name()))
            .collect()
    }

    /// Returns the error translator.
    #[must_use]
    pub fn translator(&self) -> &ErrorTranslator {
        &self.translator
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{BoxFuture, Middleware};
    use cirrus_core::fixtures::recording_logger;
    use cirrus_core::ApiError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Level;

    /// Records its name on the response and returns a fixed outcome.
    struct Recorder {
        name: &'static str,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    #[derive(Clone, Copy)]
    enum Behavior {
        Continue,
        Fail,
        Terminate,
        Panic,
    }

    impl Recorder {
        fn new(name: &'static str, behavior: Behavior) -> (BoxedMiddleware, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let recorder = Self {
                name,
                behavior,
                calls: Arc::clone(&calls),
            };
            (Arc::new(recorder), calls)
        }
    }

    impl Middleware for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handle<'a>(
            &'a self,
            _req: &'a mut RequestContext,
            res: &'a mut ResponseContext,
        ) -> BoxFuture<'a, Outcome> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let order = res.header("x-order").map_or_else(
                    || self.name.to_string(),
                    |prev| format!("{prev},{}", self.name),
                );
                res.set_header("x-order", &order).unwrap();
                tokio::task::yield_now().await;

                match self.behavior {
                    Behavior::Continue => Outcome::Continue,
                    Behavior::Fail => Outcome::fail(ApiError::invalid_input(self.name)),
                    Behavior::Terminate => Outcome::Terminate,
                    Behavior::Panic => panic!("stage {} exploded", self.name),
                }
            })
        }
    }

    fn chain(behaviors: &[(&'static str, Behavior)]) -> (Chain, Vec<Arc<AtomicUsize>>) {
        let (stages, counters): (Vec<_>, Vec<_>) = behaviors
            .iter()
            .map(|(name, behavior)| Recorder::new(*name, *behavior))
            .unzip();
        (Chain::new(stages, ErrorTranslator::new()), counters)
    }

    fn counts(counters: &[Arc<AtomicUsize>]) -> Vec<usize> {
        counters.iter().map(|c| c.load(Ordering::SeqCst)).collect()
    }

    #[tokio::test]
    async fn test_all_stages_run_in_order() {
        let (chain, counters) = chain(&[
            ("a", Behavior::Continue),
            ("b", Behavior::Continue),
            ("c", Behavior::Continue),
        ]);
        let mut req = RequestContext::builder().build();
        let mut res = ResponseContext::new();

        assert_eq!(chain.run(&mut req, &mut res).await, Completion::Completed);
        assert_eq!(res.header("x-order"), Some("a,b,c"));
        assert_eq!(counts(&counters), [1, 1, 1]);
        assert!(res.status_code().is_none());
    }

    #[tokio::test]
    async fn test_failure_skips_rest_and_translates_once() {
        let (chain, counters) = chain(&[
            ("a", Behavior::Continue),
            ("b", Behavior::Fail),
            ("c", Behavior::Continue),
            ("d", Behavior::Continue),
        ]);
        let (logger, sink) = recording_logger();
        let mut req = RequestContext::builder().logger(logger).build();
        let mut res = ResponseContext::new();

        let completion = chain.run(&mut req, &mut res).await;

        assert_eq!(
            completion,
            Completion::Translated {
                stage: "b",
                status: StatusCode::BAD_REQUEST
            }
        );
        assert_eq!(counts(&counters), [1, 1, 0, 0]);
        assert!(res.header("x-order").is_none());
        assert_eq!(res.body().unwrap()["error"]["kind"], "INVALID_INPUT");
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_at_every_position() {
        for failing in 0..4 {
            let behaviors: Vec<_> = ["a", "b", "c", "d"]
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let behavior = if i == failing {
                        Behavior::Fail
                    } else {
                        Behavior::Continue
                    };
                    (*name, behavior)
                })
                .collect();
            let (chain, counters) = chain(&behaviors);
            let (logger, sink) = recording_logger();
            let mut req = RequestContext::builder().logger(logger).build();
            let mut res = ResponseContext::new();

            assert!(chain.run(&mut req, &mut res).await.is_translated());
            let expected: Vec<usize> = (0..4).map(|i| usize::from(i <= failing)).collect();
            assert_eq!(counts(&counters), expected, "failing stage {failing}");
            assert_eq!(sink.len(), 1, "translator must run exactly once");
        }
    }

    #[tokio::test]
    async fn test_terminate_stops_without_translation() {
        let (chain, counters) = chain(&[
            ("a", Behavior::Terminate),
            ("b", Behavior::Continue),
        ]);
        let mut req = RequestContext::builder().build();
        let mut res = ResponseContext::new();

        assert_eq!(
            chain.run(&mut req, &mut res).await,
            Completion::Terminated { stage: "a" }
        );
        assert_eq!(counts(&counters), [1, 0]);
        assert!(res.body().is_none());
    }

    #[tokio::test]
    async fn test_panic_is_translated_to_500() {
        let (chain, counters) = chain(&[
            ("a", Behavior::Continue),
            ("boom", Behavior::Panic),
            ("c", Behavior::Continue),
        ]);
        let (logger, sink) = recording_logger();
        let mut req = RequestContext::builder().logger(logger).build();
        let mut res = ResponseContext::new();

        let completion = chain.run(&mut req, &mut res).await;

        assert_eq!(
            completion,
            Completion::Translated {
                stage: "boom",
                status: StatusCode::INTERNAL_SERVER_ERROR
            }
        );
        assert_eq!(counts(&counters), [1, 1, 0]);
        assert_eq!(res.body().unwrap()["error"]["kind"], "INTERNAL_ERROR");
        assert!(sink.contains(Level::ERROR, "stage boom exploded"));
    }

    #[test]
    fn test_stage_names_end_with_translator() {
        let (chain, _) = chain(&[("a", Behavior::Continue), ("b", Behavior::Continue)]);
        assert_eq!(chain.stage_names(), ["a", "b", "error_translator"]);
    }
}
