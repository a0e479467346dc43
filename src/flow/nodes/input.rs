//! Ops 20, 30, 31: DTMF collection with validation, retry, and timeout
//! handling (§4.3).

use std::time::Duration;

use crate::flow::context::CallContext;
use crate::flow::error::FlowResult;
use crate::flow::model::Node;
use crate::flow::nodes::dtmf::{build_valid_regex, digits_accepted};

fn wants_default(node: &Node) -> bool {
    node.time_limit_response_type.as_deref() == Some("default")
}

/// Op 20: collect up to `input_length` digits terminated by `#`.
pub async fn collect_dtmf(ctx: &mut CallContext, node: &Node) -> FlowResult<String> {
    let valid_keys = node.valid_keys.as_deref().unwrap_or_default();
    let tag = node.tag_name.as_deref().unwrap_or_default();
    let max_len = node.input_length.unwrap_or(1);
    let timeout = Duration::from_secs(node.input_time_limit.unwrap_or(10));
    let max_attempts = node.repeat_limit.unwrap_or(0) + 1;

    loop {
        let result = ctx.provider.read_digits(&ctx.call_id, 1, max_len, timeout, '#').await?;

        if !result.digits.is_empty() && digits_accepted(&result.digits, valid_keys) {
            ctx.store.set(tag, result.digits);
            return Ok("#".to_string());
        }

        if result.digits.is_empty() && wants_default(node) {
            if let Some(default) = &node.default_input {
                ctx.store.set(tag, default.clone());
            }
            return Ok("D".to_string());
        }

        ctx.retry_count += 1;
        if ctx.retry_count >= max_attempts {
            return Ok("X".to_string());
        }
        if let Some(invalid) = &node.invalid_input_voice_file_id {
            ctx.provider.play(&ctx.call_id, invalid).await?;
        }
    }
}

/// Ops 30/31: play a prompt then collect a single validated digit. `prompt`
/// is the file to play — `voice_file_id` for op 30, the file stored under
/// `tag_name` for op 31 (resolved by the caller before invocation, since
/// reading `tag_name` and then overwriting it requires an owned string).
pub async fn play_and_collect_digit(ctx: &mut CallContext, node: &Node, prompt: &str) -> FlowResult<String> {
    let valid_keys = node.valid_keys.as_deref().unwrap_or_default();
    let tag = node.tag_name.as_deref().unwrap_or_default();
    let timeout = Duration::from_secs(node.input_time_limit.unwrap_or(10));
    let max_attempts = node.repeat_limit.unwrap_or(0) + 1;
    let invalid_prompt = node.invalid_input_voice_file_id.as_deref().unwrap_or_default();
    let valid_regex = build_valid_regex(valid_keys);

    loop {
        let result = ctx
            .provider
            .play_and_get_digits(&ctx.call_id, prompt, invalid_prompt, 1, 1, 1, timeout, '#', &valid_regex)
            .await?;

        if !result.digits.is_empty() && digits_accepted(&result.digits, valid_keys) {
            let digit = result.digits;
            if node.is_language_select {
                if let Ok(code) = digit.parse::<i64>() {
                    if let Some(row) = ctx.registry.language(code) {
                        let vars = row.as_session_vars();
                        for (k, v) in vars {
                            ctx.store.set(k, v);
                        }
                    }
                }
            } else {
                let prefix = node.tag_value_prefix.clone().unwrap_or_default();
                ctx.store.set(tag, format!("{prefix}{digit}"));
            }
            return Ok(digit);
        }

        if result.digits.is_empty() && wants_default(node) {
            if let Some(default) = &node.default_input {
                ctx.store.set(tag, default.clone());
            }
            return Ok("D".to_string());
        }

        ctx.retry_count += 1;
        if ctx.retry_count >= max_attempts {
            return Ok("X".to_string());
        }
    }
}
