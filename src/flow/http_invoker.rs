//! HTTP invoker: builds, executes, and decodes one API call per catalog
//! entry (§4.5).

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::flow::error::{FlowError, FlowResult};
use crate::flow::model::{ApiInput, ApiOutput, ApiSpec, ContentType, Placement, ValueSource};
use crate::flow::store::VariableStore;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// One resolved `(name, value)` pair, ready to be placed into the outgoing
/// request per its `Placement`.
struct ResolvedInput {
    name: String,
    value: String,
    placement: Placement,
}

/// The result of one `invoke` call: the routing token plus the raw HTTP
/// status and body, so callers that need to mirror the real response (op
/// 112's `curl_response_code`/`curl_response_data`) don't have to guess it
/// back from the token alone.
pub struct InvokeOutcome {
    pub token: &'static str,
    pub status: u16,
    pub body: String,
}

/// Execute `spec` against `store`, writing every `ApiOutput` back into
/// `store` on success. The returned token is "S" or "F" (§4.5.4); never
/// returns `Err` for an ordinary HTTP failure — that maps to "F".
pub async fn invoke(client: &reqwest::Client, spec: &ApiSpec, store: &mut VariableStore) -> FlowResult<InvokeOutcome> {
    let resolved = resolve_inputs(&spec.inputs, store);

    let url = build_url(&spec.url, &resolved);
    let mut request = client.request(spec.method.into(), &url).timeout(DEFAULT_TIMEOUT);

    for input in resolved.iter().filter(|r| r.placement == Placement::Header) {
        request = request.header(input.name.as_str(), input.value.as_str());
    }

    request = match spec.content_type {
        ContentType::Json => request.header("Content-Type", "application/json").json(&build_json_body(
            &resolved,
            spec.api_type_simple,
        )),
        ContentType::FormUrlEncoded => {
            let pairs: Vec<(&str, &str)> = resolved
                .iter()
                .filter(|r| r.placement == Placement::Body)
                .map(|r| (r.name.as_str(), r.value.as_str()))
                .collect();
            request.form(&pairs)
        }
        ContentType::Multipart => request.multipart(build_multipart(&resolved)),
        ContentType::AudioWav | ContentType::Raw => {
            let body_path = resolved
                .iter()
                .find(|r| r.placement == Placement::Binary)
                .map(|r| r.value.clone())
                .unwrap_or_default();
            let bytes = tokio::fs::read(&body_path)
                .await
                .map_err(|e| FlowError::http(&url, format!("reading {body_path}: {e}")))?;
            request.body(bytes)
        }
    };

    debug!(api_id = %spec.api_id, url = %url, "invoking HTTP API");

    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => {
            debug!(api_id = %spec.api_id, error = %e, "HTTP transport error");
            return Ok(InvokeOutcome { token: "F", status: 0, body: String::new() });
        }
    };

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    if !(200..300).contains(&status) {
        return Ok(InvokeOutcome { token: "F", status, body });
    }

    if spec.outputs.is_empty() {
        return Ok(InvokeOutcome { token: "S", status, body });
    }

    let decoded: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(_) => return Ok(InvokeOutcome { token: "F", status, body }),
    };

    let mut all_validators_passed = true;
    for output in &spec.outputs {
        let extracted = extract_output(&decoded, output);
        match extracted {
            Some(value) => {
                if output.is_success_validator {
                    let expected = output.success_value.as_deref().unwrap_or("");
                    if value != expected {
                        all_validators_passed = false;
                    }
                }
                store.set(output.tag_name.clone(), value);
            }
            None => {
                if let Some(default) = &output.default_value {
                    store.set(output.tag_name.clone(), default.clone());
                }
                if output.is_success_validator {
                    all_validators_passed = false;
                }
            }
        }
    }

    let token = if all_validators_passed { "S" } else { "F" };
    Ok(InvokeOutcome { token, status, body })
}

fn resolve_inputs(inputs: &[ApiInput], store: &VariableStore) -> Vec<ResolvedInput> {
    inputs
        .iter()
        .map(|input| {
            let mut value = match input.value_source {
                ValueSource::Static => input.raw_value.clone(),
                ValueSource::DynamicFromTag | ValueSource::Environment => store.expand(&input.raw_value),
            };
            if value.is_empty() {
                if let Some(default) = &input.default_value {
                    value = default.clone();
                }
            }
            ResolvedInput {
                name: input.name.clone(),
                value,
                placement: input.placement,
            }
        })
        .collect()
}

fn build_url(template: &str, resolved: &[ResolvedInput]) -> String {
    let mut url = template.to_string();
    for input in resolved.iter().filter(|r| r.placement == Placement::Url) {
        url = url.replace(&format!("{{{}}}", input.name), &input.value);
    }
    url
}

/// The reserved `Map` field is a domain convention unrelated to variable
/// substitution: it is always emitted as a fixed coordinate object,
/// regardless of what was resolved for it.
fn build_json_body(resolved: &[ResolvedInput], simple: bool) -> Value {
    let body_fields: Vec<&ResolvedInput> = resolved.iter().filter(|r| r.placement == Placement::Body).collect();

    if simple {
        let mut obj = serde_json::Map::new();
        for input in body_fields {
            obj.insert(input.name.clone(), field_value(input));
        }
        Value::Object(obj)
    } else {
        let values: Vec<Value> = body_fields
            .iter()
            .map(|input| {
                json!({
                    "name": input.name,
                    "value": field_value(input),
                })
            })
            .collect();
        json!({ "values": values })
    }
}

fn field_value(input: &ResolvedInput) -> Value {
    if input.name == "Map" {
        return json!({ "coordinates": [0, 0] });
    }
    Value::String(input.value.clone())
}

fn build_multipart(resolved: &[ResolvedInput]) -> reqwest::multipart::Form {
    let mut form = reqwest::multipart::Form::new();
    for input in resolved {
        match input.placement {
            Placement::File if input.value.ends_with(".wav") => {
                let part = reqwest::multipart::Part::text(input.value.clone()).file_name(input.value.clone());
                form = form.part(input.name.clone(), part);
            }
            Placement::File | Placement::Body => {
                form = form.text(input.name.clone(), input.value.clone());
            }
            _ => {}
        }
    }
    form
}

/// Per §4.5.4 and Open Question 2: `parent_field` lookups read the
/// in-memory decoded response directly, not a previously stored JSON string.
fn extract_output(decoded: &Value, output: &ApiOutput) -> Option<String> {
    let root = if let Some(parent_field) = &output.parent_field {
        decoded.get(parent_field)?.get(&output.json_field)?
    } else {
        decoded.get(&output.json_field)?
    };

    let value = if output.is_list {
        let index = output.list_index.unwrap_or(0);
        root.get(index)?
    } else {
        root
    };

    Some(stringify(value))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
