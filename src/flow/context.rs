//! Per-call execution context (§3 CallContext, §5)

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::flow::registry::ConfigRegistry;
use crate::flow::store::VariableStore;
use crate::provider::CallProvider;

/// Everything one call needs to run: its variable store, a read-only view of
/// the loaded config, a handle to the provider, and the driver's own
/// bookkeeping (current node, retry counter, termination flag).
pub struct CallContext {
    pub call_id: String,
    pub store: VariableStore,
    pub registry: Arc<ConfigRegistry>,
    pub provider: Arc<dyn CallProvider>,

    pub current_node: i64,
    /// Scoped to the current node; reset whenever `current_node` changes
    /// (§4.7 Retry/repeat accounting).
    pub retry_count: u32,
    pub terminated: bool,

    /// Cancelled by the driver once `CallProvider::poll_hangup` reports the
    /// caller has hung up; checked at the top of the driver loop.
    pub cancel_token: CancellationToken,
    started_at: Instant,
}

impl CallContext {
    pub fn new(call_id: impl Into<String>, registry: Arc<ConfigRegistry>, provider: Arc<dyn CallProvider>) -> Self {
        Self {
            call_id: call_id.into(),
            store: VariableStore::new(),
            registry,
            provider,
            current_node: 0,
            retry_count: 0,
            terminated: false,
            cancel_token: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }

    /// Move to a new current node, resetting the per-node retry counter.
    pub fn enter_node(&mut self, node_id: i64) {
        self.current_node = node_id;
        self.retry_count = 0;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_support::ScriptedProvider;

    fn empty_registry() -> Arc<ConfigRegistry> {
        Arc::new(ConfigRegistry::empty())
    }

    #[test]
    fn enter_node_resets_retry_counter() {
        let mut ctx = CallContext::new("call-1", empty_registry(), Arc::new(ScriptedProvider::default()));
        ctx.retry_count = 3;
        ctx.enter_node(42);
        assert_eq!(ctx.current_node, 42);
        assert_eq!(ctx.retry_count, 0);
    }

    #[test]
    fn cancellation_is_observable() {
        let ctx = CallContext::new("call-1", empty_registry(), Arc::new(ScriptedProvider::default()));
        assert!(!ctx.is_cancelled());
        ctx.cancel_token.cancel();
        assert!(ctx.is_cancelled());
    }
}
