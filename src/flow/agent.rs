//! Agent rendezvous: roster scan, availability filtering, and queue handoff
//! for op codes 100 and 101 (§4.6).

use std::time::Duration;

use dashmap::DashMap;
use tracing::warn;

use crate::flow::context::CallContext;
use crate::flow::error::FlowResult;
use crate::provider::CallProvider;

const STABILIZATION_PAUSE: Duration = Duration::from_millis(250);

/// Session variable the driver consults on re-entry (§4.6 Re-entry contract).
pub const LAST_NODE_ID_VAR: &str = "cc_last_nodeId";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Waiting,
    InCall,
    LoggedOut,
}

/// Last-writer-wins roster of engine-imposed agent state, independent of
/// the provider's own registration bookkeeping (§5 Shared mutable state).
#[derive(Debug, Default)]
pub struct AgentRoster {
    states: DashMap<String, AgentState>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, extension: &str, state: AgentState) {
        self.states.insert(extension.to_string(), state);
    }

    pub fn get(&self, extension: &str) -> Option<AgentState> {
        self.states.get(extension).map(|s| *s)
    }
}

/// One roster entry's do-not-disturb / queue-state flags, as read back from
/// the provider before a transfer-with-evaluation handoff (op 101).
#[derive(Debug, Default, Clone)]
pub struct AgentAvailability {
    pub do_not_disturb: Option<String>,
    pub queue_state: Option<String>,
}

/// Op 100: scan the roster, mark supervisors idle and agents available, then
/// hand off to the provider's queue mechanism. Does not return under normal
/// operation — the call continues inside the provider's queue domain.
pub async fn dispatch_to_queue(
    ctx: &CallContext,
    roster: &AgentRoster,
    extensions: &[String],
    supervisors: &[String],
    queue_name: &str,
) -> FlowResult<()> {
    for extension in supervisors {
        ctx.provider.agent_set_state(extension, "IDLE").await?;
        roster.set(extension, AgentState::Idle);
    }

    for extension in extensions {
        if ctx.provider.agent_is_registered(extension).await? {
            ctx.provider.agent_set_status(extension, "Available").await?;
            ctx.provider.agent_set_contact(extension, extension).await?;
            ctx.provider.agent_set_state(extension, "WAITING").await?;
            roster.set(extension, AgentState::Waiting);
        } else {
            ctx.provider.agent_set_status(extension, "LoggedOut").await?;
            roster.set(extension, AgentState::LoggedOut);
        }
    }

    tokio::time::sleep(STABILIZATION_PAUSE).await;
    ctx.provider.queue_dispatch(&ctx.call_id, queue_name).await
}

/// Op 101: as op 100, but skips agents who are busy or already on a queue
/// call, and hands off through the evaluation dialplan so the call re-enters
/// the engine once the agent leg ends.
pub async fn dispatch_to_queue_with_evaluation(
    ctx: &mut CallContext,
    roster: &AgentRoster,
    extensions: &[(String, AgentAvailability)],
    supervisors: &[String],
    queue_name: &str,
    dialplan_destination: &str,
) -> FlowResult<()> {
    for extension in supervisors {
        ctx.provider.agent_set_state(extension, "IDLE").await?;
        roster.set(extension, AgentState::Idle);
    }

    for (extension, availability) in extensions {
        if availability.do_not_disturb.as_deref() == Some("Busy") {
            continue;
        }
        if availability.queue_state.as_deref() == Some("In a queue call") {
            continue;
        }
        if ctx.provider.agent_is_registered(extension).await? {
            ctx.provider.agent_set_status(extension, "Available").await?;
            ctx.provider.agent_set_contact(extension, extension).await?;
            ctx.provider.agent_set_state(extension, "WAITING").await?;
            roster.set(extension, AgentState::Waiting);
        } else {
            ctx.provider.agent_set_status(extension, "LoggedOut").await?;
            roster.set(extension, AgentState::LoggedOut);
        }
    }

    ctx.store.set(LAST_NODE_ID_VAR, ctx.current_node.to_string());
    tokio::time::sleep(STABILIZATION_PAUSE).await;
    ctx.provider.queue_dispatch(&ctx.call_id, queue_name).await?;
    ctx.provider.transfer_for_evaluation(&ctx.call_id, dialplan_destination).await
}

/// Outcome the provider reports back when a transferred-for-evaluation call
/// re-enters the engine (§4.6 Re-entry contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReentryOutcome {
    AgentBridged,
    AgentTimeout,
}

pub fn parse_reentry_outcome(cc_cancel_reason: Option<&str>) -> ReentryOutcome {
    match cc_cancel_reason {
        Some("agent bridged") => ReentryOutcome::AgentBridged,
        _ => {
            warn!(reason = ?cc_cancel_reason, "agent evaluation leg did not bridge");
            ReentryOutcome::AgentTimeout
        }
    }
}

/// Resolve the node to resume at on a successful re-entry: the node named by
/// `cc_last_nodeId`, whose first edge is taken next (§4.6).
pub fn reentry_node_id(store: &crate::flow::store::VariableStore) -> Option<i64> {
    store.get_i64(LAST_NODE_ID_VAR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_is_last_writer_wins() {
        let roster = AgentRoster::new();
        roster.set("1001", AgentState::Waiting);
        roster.set("1001", AgentState::InCall);
        assert_eq!(roster.get("1001"), Some(AgentState::InCall));
    }

    #[test]
    fn unknown_extension_has_no_state() {
        let roster = AgentRoster::new();
        assert_eq!(roster.get("9999"), None);
    }

    #[test]
    fn bridged_reason_maps_to_bridged_outcome() {
        assert_eq!(parse_reentry_outcome(Some("agent bridged")), ReentryOutcome::AgentBridged);
    }

    #[test]
    fn anything_else_maps_to_timeout() {
        assert_eq!(parse_reentry_outcome(Some("no answer")), ReentryOutcome::AgentTimeout);
        assert_eq!(parse_reentry_outcome(None), ReentryOutcome::AgentTimeout);
    }

    #[test]
    fn reentry_node_id_reads_reserved_variable() {
        let mut store = crate::flow::store::VariableStore::new();
        store.set(LAST_NODE_ID_VAR, "1042");
        assert_eq!(reentry_node_id(&store), Some(1042));
    }
}
