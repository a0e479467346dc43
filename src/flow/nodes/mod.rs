//! Node handlers, one per operation code (§4.3, §9 Polymorphic handlers).
//!
//! The operation set is fixed and closed; `dispatch` is the registration
//! table the design notes call for, expressed as a match over the op code
//! rather than a trait-object registry, since the set never grows at
//! runtime. Op codes 100/101 (agent rendezvous) and 120 (branch-only, no
//! primitive) are handled directly by the flow driver — they need the
//! agent roster and the edge selector respectively, neither of which a
//! stateless handler has access to.

mod api;
mod control;
mod dial;
mod dtmf;
mod input;
mod playback;
mod record;
mod stt;
mod tts;

use crate::flow::context::CallContext;
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::model::Node;

/// What a handler produced: a result token for the edge selector, or a
/// signal that the driver must stop without selecting an edge at all.
pub enum HandlerOutcome {
    Token(String),
    Terminated,
}

/// Every op code dispatch() accepts. 100, 101, and 120 are deliberately
/// absent — see module docs.
pub const DISPATCHED_OP_CODES: &[i64] = &[10, 11, 20, 30, 31, 40, 50, 105, 107, 108, 111, 112, 200, 330, 331, 341];

pub async fn dispatch(ctx: &mut CallContext, node: &Node, http_client: &reqwest::Client) -> FlowResult<HandlerOutcome> {
    let token: String = match node.op_code {
        10 => playback::play_audio(ctx, node).await?.to_string(),
        11 => playback::play_captured_file(ctx, node).await?.to_string(),
        20 => input::collect_dtmf(ctx, node).await?,
        30 => {
            let prompt = node.voice_file_id.clone().unwrap_or_default();
            input::play_and_collect_digit(ctx, node, &prompt).await?
        }
        31 => {
            let tag = node.tag_name.as_deref().unwrap_or_default();
            let prompt = ctx.store.get(tag).unwrap_or_default().to_string();
            input::play_and_collect_digit(ctx, node, &prompt).await?
        }
        40 => record::record(ctx, node).await?.to_string(),
        50 => playback::play_digits(ctx, node).await?.to_string(),
        105 => dial::extension_dial(ctx, node).await?.to_string(),
        107 => dial::direct_extension(ctx, node).await?.to_string(),
        108 => dial::external_dial(ctx, node).await?.to_string(),
        111 => api::invoke(ctx, node, http_client).await?.to_string(),
        112 => api::invoke_via_provider_curl(ctx, node, http_client).await?.to_string(),
        200 => {
            control::terminate(ctx);
            return Ok(HandlerOutcome::Terminated);
        }
        330 => tts::speak_builtin(ctx, node).await?.to_string(),
        331 => tts::speak_cloud(ctx, node).await?.to_string(),
        341 => stt::transcribe(ctx, node, http_client).await?.to_string(),
        other => return Err(FlowError::UnknownOpCode(other, node.id)),
    };
    Ok(HandlerOutcome::Token(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatched_op_codes_excludes_agent_and_branch_codes() {
        assert!(!DISPATCHED_OP_CODES.contains(&100));
        assert!(!DISPATCHED_OP_CODES.contains(&101));
        assert!(!DISPATCHED_OP_CODES.contains(&120));
        assert!(DISPATCHED_OP_CODES.contains(&200));
    }
}
