//! Ops 105, 107, 108: extension and gateway dialing (§4.3).

use std::time::Duration;

use crate::flow::context::CallContext;
use crate::flow::error::FlowResult;
use crate::flow::model::Node;
use crate::flow::nodes::dtmf::{build_valid_regex, digits_accepted};

/// Op 105: collect an extension number, confirm it exists in the directory,
/// then bridge.
pub async fn extension_dial(ctx: &mut CallContext, node: &Node) -> FlowResult<&'static str> {
    let valid_keys = node.valid_keys.as_deref().unwrap_or_default();
    let max_len = node.input_length.unwrap_or(4);
    let timeout = Duration::from_secs(node.input_time_limit.unwrap_or(10));
    let valid_regex = build_valid_regex(valid_keys);
    let prompt = node.voice_file_id.as_deref().unwrap_or_default();
    let invalid_prompt = node.invalid_input_voice_file_id.as_deref().unwrap_or_default();

    let result = ctx
        .provider
        .play_and_get_digits(&ctx.call_id, prompt, invalid_prompt, 1, max_len, 1, timeout, '#', &valid_regex)
        .await?;

    if result.digits.is_empty() || !digits_accepted(&result.digits, valid_keys) {
        return Ok("F");
    }

    let domain = ctx.store.get("domain_name").unwrap_or_default().to_string();
    if !ctx.provider.directory_exists(&result.digits, &domain).await? {
        return Ok("F");
    }

    bridge(ctx, &result.digits).await
}

/// Op 107: bridge to the literal extension in `valid_keys`.
pub async fn direct_extension(ctx: &CallContext, node: &Node) -> FlowResult<&'static str> {
    let extension = node.valid_keys.as_deref().unwrap_or_default();
    bridge(ctx, extension).await
}

/// Op 108: bridge to `valid_keys` via a named external gateway.
pub async fn external_dial(ctx: &CallContext, node: &Node) -> FlowResult<&'static str> {
    let destination = node.valid_keys.as_deref().unwrap_or_default();
    bridge(ctx, destination).await
}

async fn bridge(ctx: &CallContext, dial_string: &str) -> FlowResult<&'static str> {
    let result = ctx.provider.bridge(&ctx.call_id, dial_string).await?;
    Ok(if result.bridged { "S" } else { "F" })
}
