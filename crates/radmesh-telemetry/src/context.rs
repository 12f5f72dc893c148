//! Context propagation helpers for request and application spans.
//!
//! # Design
//! - Request identifiers and matched routes live in task-local storage so
//!   pipeline spans deep inside the orchestrator can tag themselves.
//! - A process-wide span carries the service name and build SHA.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", service = %service, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Request identifier of the request being served by the current task.
#[must_use]
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.request_id.as_ref().to_string())
        .ok()
}

/// Matched route of the request being served by the current task.
#[must_use]
pub fn current_route() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.route.as_ref().to_string())
        .ok()
}

/// Run `fut` with the supplied request context visible to [`current_request_id`]
/// and [`current_route`].
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    route: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let context = RequestContext {
        request_id: Arc::from(request_id.into()),
        route: Arc::from(route.into()),
    };
    ACTIVE_REQUEST_CONTEXT.scope(context, fut).await
}

#[derive(Clone)]
struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

tokio::task_local! {
    static ACTIVE_REQUEST_CONTEXT: RequestContext;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_context_guard_can_be_dropped() {
        let guard = GlobalContextGuard::new("radmesh");
        drop(guard);
    }

    #[tokio::test]
    async fn request_context_is_scoped_to_the_future() {
        let output = with_request_context("req-7", "/api/Upload", async {
            assert_eq!(current_request_id().as_deref(), Some("req-7"));
            assert_eq!(current_route().as_deref(), Some("/api/Upload"));
            42
        })
        .await;
        assert_eq!(output, 42);
        assert!(current_request_id().is_none());
        assert!(current_route().is_none());
    }
}
