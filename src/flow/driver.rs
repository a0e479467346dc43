//! Flow driver (§4.7): the per-call loop. Acquires the call, resolves
//! whether this is a fresh start or a post-transfer re-entry, runs the
//! business-hours gate, then alternates node dispatch and edge selection
//! until a terminal or a fatal error, releasing the call on every exit path.

use std::sync::Arc;

use tracing::{info, warn};

use crate::flow::agent::{self, AgentAvailability, AgentRoster, ReentryOutcome};
use crate::flow::context::CallContext;
use crate::flow::edges::select_edge;
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::nodes::{self, HandlerOutcome};
use crate::flow::registry::ConfigRegistry;
use crate::provider::CallProvider;
use crate::schedule;

/// Node transitions permitted before a call is assumed to be stuck in an
/// unintended cycle (§4.7 Loop protection).
pub const DEFAULT_LOOP_PROTECTION_THRESHOLD: usize = 300;

const UNAVAILABLE_AUDIO_FALLBACK: &str = "ivr_unavailable.wav";
const AGENT_TIMEOUT_AUDIO: &str = "agent_timeout.wav";

/// How a call's run through the driver ended.
#[derive(Debug)]
pub enum DriverOutcome {
    /// The call reached a terminal handler, the business-hours gate
    /// rejected it, or it was handed off to the provider's queue domain.
    Completed,
    /// A result token had no matching edge and no catch-all.
    DeadEnd { node_id: i64, token: String },
    /// Any other fatal error (§7 runtime-config / internal tiers).
    Fatal(FlowError),
}

/// Run one call to completion. Always answers and always hangs up, even on
/// a fatal error, so the provider's call resource is never leaked (§5
/// Resource acquisition).
pub async fn run_call(
    call_id: String,
    registry: Arc<ConfigRegistry>,
    provider: Arc<dyn CallProvider>,
    http_client: reqwest::Client,
    roster: Arc<AgentRoster>,
    loop_protection_threshold: usize,
) -> DriverOutcome {
    let mut ctx = CallContext::new(call_id.clone(), registry, provider.clone());

    if let Err(e) = provider.answer(&call_id).await {
        warn!(call_id = %call_id, error = %e, "failed to answer call");
        return DriverOutcome::Fatal(e);
    }

    let result = run_inner(&mut ctx, &http_client, &roster, loop_protection_threshold).await;

    let cause = match &result {
        Ok(()) => "normal",
        Err(e) if e.is_external() => "external error",
        Err(_) => "engine error",
    };
    if let Err(e) = ctx.provider.hangup(&call_id, cause).await {
        warn!(call_id = %call_id, error = %e, "hangup failed after call completion");
    }

    match result {
        Ok(()) => DriverOutcome::Completed,
        Err(FlowError::DeadEnd { node_id, token }) => DriverOutcome::DeadEnd { node_id, token },
        Err(e) => DriverOutcome::Fatal(e),
    }
}

async fn run_inner(
    ctx: &mut CallContext,
    http_client: &reqwest::Client,
    roster: &AgentRoster,
    loop_protection_threshold: usize,
) -> FlowResult<()> {
    seed_identity_variables(ctx).await?;

    let Some(start_node) = resume_point(ctx).await? else {
        return Ok(());
    };

    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    if !schedule::gate_allows_call(&ctx.registry, now) {
        play_unavailability(ctx).await?;
        return Ok(());
    }

    ctx.enter_node(start_node);
    let mut transitions = 0usize;

    loop {
        if ctx.terminated || ctx.is_cancelled() {
            return Ok(());
        }

        transitions += 1;
        if transitions > loop_protection_threshold {
            return Err(FlowError::LoopProtectionTripped(loop_protection_threshold));
        }

        let node = ctx
            .registry
            .node(ctx.current_node)
            .cloned()
            .ok_or(FlowError::UnknownNode(ctx.current_node))?;

        let next_token = match node.op_code {
            120 => {
                // Branch: the selector decides directly, no handler runs.
                let target = select_edge(&node.edges, "", &ctx.store).ok_or_else(|| FlowError::DeadEnd {
                    node_id: node.id,
                    token: String::new(),
                })?;
                ctx.enter_node(target);
                continue;
            }
            100 => {
                run_queue_transfer(ctx, roster, &node).await?;
                return Ok(());
            }
            101 => {
                run_queue_transfer_with_evaluation(ctx, roster, &node).await?;
                return Ok(());
            }
            _ => {
                let outcome = nodes::dispatch(ctx, &node, http_client).await?;
                if ctx.provider.poll_hangup(&ctx.call_id).await? {
                    ctx.cancel_token.cancel();
                }
                if ctx.is_cancelled() {
                    return Ok(());
                }
                match outcome {
                    HandlerOutcome::Terminated => return Ok(()),
                    HandlerOutcome::Token(token) => token,
                }
            }
        };

        match select_edge(&node.edges, &next_token, &ctx.store) {
            Some(target) => ctx.enter_node(target),
            None => {
                return Err(FlowError::DeadEnd {
                    node_id: node.id,
                    token: next_token,
                });
            }
        }
    }
}

/// Step 1 of §4.7: copy caller id / call id / domain into well-known
/// session variables before anything else runs.
async fn seed_identity_variables(ctx: &mut CallContext) -> FlowResult<()> {
    ctx.store.set("uuid", ctx.call_id.clone());
    for name in ["caller_id_number", "caller_id_name", "domain_name"] {
        if let Some(value) = ctx.provider.get_session_var(&ctx.call_id, name).await? {
            ctx.store.set(name, value);
        }
    }
    Ok(())
}

/// Decide where this call starts: the flow's start node for a fresh call,
/// or the evaluation follow-up node for a call re-entering after an op-101
/// transfer (§4.6 Re-entry contract). Returns `None` once an agent-timeout
/// re-entry has already been handled and the call is over.
async fn resume_point(ctx: &mut CallContext) -> FlowResult<Option<i64>> {
    let last_node_var = ctx
        .provider
        .get_session_var(&ctx.call_id, agent::LAST_NODE_ID_VAR)
        .await?;

    let Some(last_node_id) = last_node_var.and_then(|v| v.trim().parse::<i64>().ok()) else {
        return ctx
            .registry
            .start_node_id()
            .map(Some)
            .ok_or(FlowError::UnknownNode(0));
    };

    let cancel_reason = ctx.provider.get_session_var(&ctx.call_id, "cc_cancel_reason").await?;
    match agent::parse_reentry_outcome(cancel_reason.as_deref()) {
        ReentryOutcome::AgentTimeout => {
            play_agent_timeout_message(ctx).await?;
            ctx.terminated = true;
            Ok(None)
        }
        ReentryOutcome::AgentBridged => {
            // The provider mirrors individual session variables but not the
            // whole VariableStore; anything the pre-transfer handlers wrote
            // only in-process (never pushed via set_session_var) is lost on
            // re-entry. This is a provider-dependent limitation, not a bug.
            let node = ctx
                .registry
                .node(last_node_id)
                .ok_or(FlowError::UnknownNode(last_node_id))?;
            select_edge(&node.edges, "", &ctx.store)
                .map(Some)
                .ok_or(FlowError::DeadEnd {
                    node_id: last_node_id,
                    token: String::new(),
                })
        }
    }
}

async fn play_unavailability(ctx: &CallContext) -> FlowResult<()> {
    let path = ctx
        .registry
        .unavailability_audio
        .clone()
        .unwrap_or_else(|| UNAVAILABLE_AUDIO_FALLBACK.to_string());
    ctx.provider.play(&ctx.call_id, &path).await
}

async fn play_agent_timeout_message(ctx: &CallContext) -> FlowResult<()> {
    ctx.provider.play(&ctx.call_id, AGENT_TIMEOUT_AUDIO).await
}

/// The queue a transfer hands off to: an explicit override on the node
/// (`tag_name`, reused here as a generic string payload per §3), else the
/// first configured extension's queue, else a fixed default.
fn resolve_queue_name(ctx: &CallContext, node: &crate::flow::model::Node) -> String {
    if let Some(name) = node.tag_name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    ctx.registry
        .all_agent_extensions()
        .find_map(|ext| ext.queue_name.clone())
        .unwrap_or_else(|| "default".to_string())
}

async fn run_queue_transfer(ctx: &CallContext, roster: &AgentRoster, node: &crate::flow::model::Node) -> FlowResult<()> {
    let all: Vec<_> = ctx.registry.all_agent_extensions().cloned().collect();
    let (agents, supervisors): (Vec<_>, Vec<_>) = all.into_iter().partition(|e| e.is_agent);
    let agent_exts: Vec<String> = agents.into_iter().map(|e| e.extension).collect();
    let supervisor_exts: Vec<String> = supervisors.into_iter().map(|e| e.extension).collect();

    let queue_name = resolve_queue_name(ctx, node);
    info!(call_id = %ctx.call_id, queue = %queue_name, "dispatching call to queue");
    agent::dispatch_to_queue(ctx, roster, &agent_exts, &supervisor_exts, &queue_name).await
}

async fn run_queue_transfer_with_evaluation(
    ctx: &mut CallContext,
    roster: &AgentRoster,
    node: &crate::flow::model::Node,
) -> FlowResult<()> {
    let all: Vec<_> = ctx.registry.all_agent_extensions().cloned().collect();
    let (agents, supervisors): (Vec<_>, Vec<_>) = all.into_iter().partition(|e| e.is_agent);
    let supervisor_exts: Vec<String> = supervisors.into_iter().map(|e| e.extension).collect();

    let mut extensions_with_availability = Vec::with_capacity(agents.len());
    for agent_ext in agents {
        let availability = AgentAvailability {
            do_not_disturb: ctx
                .provider
                .get_global(&format!("agent.{}.do_not_disturb", agent_ext.extension))
                .await?,
            queue_state: ctx
                .provider
                .get_global(&format!("agent.{}.queue_state", agent_ext.extension))
                .await?,
        };
        extensions_with_availability.push((agent_ext.extension, availability));
    }

    let queue_name = resolve_queue_name(ctx, node);
    let dialplan_destination = node.default_input.as_deref().unwrap_or("evaluation");

    info!(call_id = %ctx.call_id, queue = %queue_name, "dispatching call to queue with evaluation");
    agent::dispatch_to_queue_with_evaluation(
        ctx,
        roster,
        &extensions_with_availability,
        &supervisor_exts,
        &queue_name,
        dialplan_destination,
    )
    .await
}
