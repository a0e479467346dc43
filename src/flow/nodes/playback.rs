//! Ops 10, 11, 50: plain audio playback (§4.3).

use crate::flow::context::CallContext;
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::model::Node;

/// Op 10: play a catalog audio file. Single outgoing edge; always "S".
pub async fn play_audio(ctx: &CallContext, node: &Node) -> FlowResult<&'static str> {
    let file = node.voice_file_id.as_deref().unwrap_or_default();
    ctx.provider.play(&ctx.call_id, file).await?;
    Ok("S")
}

/// Op 11: play the file whose path was previously stored under `tag_name`
/// (e.g. a recording or TTS render). Terminates the call if the path is
/// missing or the file is empty.
pub async fn play_captured_file(ctx: &CallContext, node: &Node) -> FlowResult<&'static str> {
    let tag = node.tag_name.as_deref().unwrap_or_default();
    let path = ctx.store.get(tag).unwrap_or_default();
    if path.is_empty() {
        return Err(FlowError::Internal(format!(
            "node {}: no captured file at tag '{tag}'",
            node.id
        )));
    }
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => {}
        _ => {
            return Err(FlowError::Internal(format!(
                "node {}: captured file '{path}' missing or empty",
                node.id
            )));
        }
    }
    ctx.provider.play(&ctx.call_id, path).await?;
    Ok("S")
}

/// Op 50: read the digit run from `default_input` and play each digit as its
/// own per-language audio file, under whatever language the call is
/// currently set to (`LanguageCode`, written by a language-select node).
pub async fn play_digits(ctx: &CallContext, node: &Node) -> FlowResult<&'static str> {
    let source = node.default_input.as_deref().unwrap_or_default();
    let raw = ctx.store.get(source).unwrap_or(source);
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let lang = ctx.store.get("LanguageCode").unwrap_or_default();
    for digit in digits.chars() {
        ctx.provider.play(&ctx.call_id, &format!("{lang}/digit_{digit}.wav")).await?;
    }
    Ok("S")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::registry::ConfigRegistry;
    use crate::provider::test_support::ScriptedProvider;
    use std::sync::Arc;

    fn node_with_input(default_input: &str) -> Node {
        Node {
            id: 1,
            name: String::new(),
            op_code: 50,
            is_start: true,
            voice_file_id: None,
            api_id: None,
            valid_keys: None,
            input_length: None,
            input_time_limit: None,
            tag_name: None,
            default_input: Some(default_input.to_string()),
            recording_type_id: None,
            repeat_limit: None,
            invalid_input_voice_file_id: None,
            is_repetitive: false,
            time_limit_response_type: None,
            is_language_select: false,
            tag_value_prefix: None,
            edges: vec![],
        }
    }

    #[tokio::test]
    async fn digits_are_played_under_the_current_language_directory() {
        let provider = Arc::new(ScriptedProvider::default());
        let mut ctx = CallContext::new("call-1", Arc::new(ConfigRegistry::empty()), provider.clone());
        ctx.store.set("LanguageCode", "2");
        let node = node_with_input("42");

        play_digits(&ctx, &node).await.unwrap();

        assert_eq!(
            *provider.played_files.lock().unwrap(),
            vec!["2/digit_4.wav".to_string(), "2/digit_2.wav".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_language_falls_back_to_an_empty_directory_segment() {
        let provider = Arc::new(ScriptedProvider::default());
        let ctx = CallContext::new("call-1", Arc::new(ConfigRegistry::empty()), provider.clone());
        let node = node_with_input("7");

        play_digits(&ctx, &node).await.unwrap();

        assert_eq!(*provider.played_files.lock().unwrap(), vec!["/digit_7.wav".to_string()]);
    }
}
