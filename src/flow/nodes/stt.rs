//! Op 341: upload a recording to the configured speech-to-text API and
//! store its transcription (§4.3, §6.2 general setting 14).

use crate::flow::context::CallContext;
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::http_invoker;
use crate::flow::model::{ApiInput, ApiOutput, ApiSpec, ContentType, Node, Placement, ValueSource};

pub async fn transcribe(ctx: &mut CallContext, node: &Node, client: &reqwest::Client) -> FlowResult<&'static str> {
    let api_id = node.api_id.as_deref().unwrap_or_default();
    let mut spec = ctx
        .registry
        .api(api_id)
        .ok_or_else(|| FlowError::UnknownApiId(api_id.to_string()))?
        .clone();

    inject_file_input(&mut spec, node.default_input.as_deref());

    let tag = node.tag_name.as_deref().unwrap_or_default();
    if let Some(field) = ctx.registry.stt_response_field.clone() {
        let already_mapped = spec.outputs.iter().any(|o| o.json_field == field);
        if !already_mapped && !tag.is_empty() {
            spec.outputs.push(ApiOutput {
                tag_name: tag.to_string(),
                json_field: field,
                parent_field: None,
                is_list: false,
                list_index: None,
                is_success_validator: false,
                success_value: None,
                default_value: None,
            });
        }
    }

    let outcome = http_invoker::invoke(client, &spec, &mut ctx.store).await?;
    Ok(outcome.token)
}

/// The recording to upload is the node's own `default_input`, not whatever
/// the catalog entry's inputs happen to reference — inject it as the
/// file/binary input if the spec doesn't already have one.
fn inject_file_input(spec: &mut ApiSpec, default_input: Option<&str>) {
    let already_has_file_input = spec
        .inputs
        .iter()
        .any(|i| matches!(i.placement, Placement::File | Placement::Binary));
    if already_has_file_input {
        return;
    }
    let placement = match spec.content_type {
        ContentType::AudioWav | ContentType::Raw => Placement::Binary,
        _ => Placement::File,
    };
    spec.inputs.push(ApiInput {
        name: "file".to_string(),
        raw_value: default_input.unwrap_or_default().to_string(),
        placement,
        value_source: ValueSource::Static,
        default_value: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::model::HttpMethod;

    fn blank_spec(content_type: ContentType) -> ApiSpec {
        ApiSpec {
            api_id: "stt".into(),
            method: HttpMethod::Post,
            url: "https://stt.example.com/transcribe".into(),
            content_type,
            inputs: vec![],
            outputs: vec![],
            api_type_simple: false,
        }
    }

    #[test]
    fn default_input_is_injected_as_a_file_part_for_multipart() {
        let mut spec = blank_spec(ContentType::Multipart);
        inject_file_input(&mut spec, Some("voicemail_call-1.wav"));
        assert_eq!(spec.inputs.len(), 1);
        assert_eq!(spec.inputs[0].placement, Placement::File);
        assert_eq!(spec.inputs[0].raw_value, "voicemail_call-1.wav");
    }

    #[test]
    fn default_input_is_injected_as_binary_for_raw_audio() {
        let mut spec = blank_spec(ContentType::AudioWav);
        inject_file_input(&mut spec, Some("voicemail_call-1.wav"));
        assert_eq!(spec.inputs[0].placement, Placement::Binary);
    }

    #[test]
    fn an_existing_file_input_is_left_alone() {
        let mut spec = blank_spec(ContentType::Multipart);
        spec.inputs.push(ApiInput {
            name: "recording".into(),
            raw_value: "already_configured.wav".into(),
            placement: Placement::File,
            value_source: ValueSource::Static,
            default_value: None,
        });
        inject_file_input(&mut spec, Some("voicemail_call-1.wav"));
        assert_eq!(spec.inputs.len(), 1);
        assert_eq!(spec.inputs[0].raw_value, "already_configured.wav");
    }
}
