//! The capability shared by every pipeline worker.

use async_trait::async_trait;

use super::error::WorkerResult;

/// A two-step worker: local analysis, then inference.
///
/// `analyze` inspects already-available data and builds a request; it must
/// not mutate shared state. `execute` hands that request to the inference
/// collaborator and returns a structurally validated output. The
/// orchestrator only ever sees `Context` and `Output`; `Request` stays
/// private to each worker's pair of calls.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Input consumed by `analyze`.
    type Context: Sync;
    /// Intermediate value built by `analyze` and consumed by `execute`.
    type Request: Send;
    /// Validated result of `execute`.
    type Output: Send;

    /// Stable identifier used in logs and failure reports.
    fn name(&self) -> &'static str;

    async fn analyze(&self, context: &Self::Context) -> WorkerResult<Self::Request>;

    async fn execute(&self, request: Self::Request) -> WorkerResult<Self::Output>;

    /// Runs `analyze` followed by `execute`.
    async fn run(&self, context: &Self::Context) -> WorkerResult<Self::Output> {
        let request = self.analyze(context).await?;
        self.execute(request).await
    }
}
