//! Ops 330, 331: text-to-speech playback (§4.3, §4.5.5).

use crate::flow::context::CallContext;
use crate::flow::error::FlowResult;
use crate::flow::model::Node;

/// Op 330: built-in TTS engine, voice selected from the current language row.
pub async fn speak_builtin(ctx: &CallContext, node: &Node) -> FlowResult<&'static str> {
    speak(ctx, node, "builtin", ctx.store.get("TTSVoiceNameBuiltIn").unwrap_or_default()).await
}

/// Op 331: cloud TTS engine and voice.
pub async fn speak_cloud(ctx: &CallContext, node: &Node) -> FlowResult<&'static str> {
    speak(ctx, node, "cloud", ctx.store.get("TTSVoiceNameCloud").unwrap_or_default()).await
}

async fn speak(ctx: &CallContext, node: &Node, engine: &str, voice: &str) -> FlowResult<&'static str> {
    let template = node.default_input.as_deref().unwrap_or_default();
    let expanded = ctx.store.expand(template);
    let text = apply_digit_spacing(&expanded);
    ctx.provider.speak(&ctx.call_id, engine, voice, &text).await?;
    Ok("S")
}

/// Insert a space between every digit of the *first* contiguous digit run in
/// `text`. Any later digit run is left untouched — a deliberate limitation
/// carried over from the original behavior (§9 Open Question 3).
fn apply_digit_spacing(text: &str) -> String {
    let bytes = text.as_bytes();
    let Some(start) = bytes.iter().position(|b| b.is_ascii_digit()) else {
        return text.to_string();
    };
    let end = bytes[start..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map(|offset| start + offset)
        .unwrap_or(bytes.len());

    let run = &text[start..end];
    let spaced: String = run.chars().collect::<Vec<_>>().join(" ");

    format!("{}{}{}", &text[..start], spaced, &text[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_out_the_first_digit_run() {
        assert_eq!(apply_digit_spacing("ticket 12345"), "ticket 1 2 3 4 5");
    }

    #[test]
    fn later_digit_runs_are_untouched() {
        assert_eq!(apply_digit_spacing("order 123 of 456"), "order 1 2 3 of 456");
    }

    #[test]
    fn text_without_digits_is_unchanged() {
        assert_eq!(apply_digit_spacing("no digits here"), "no digits here");
    }
}
