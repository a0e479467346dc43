//! Ops 111, 112: HTTP API invocation (§4.5, §9 HTTP transport).
//!
//! Both codes select the same way; 112 additionally mirrors the raw status
//! code and body into `curl_response_code`/`curl_response_data` so that a
//! flow written against the provider's built-in curl facility sees the same
//! variables regardless of which transport actually executed the call.

use crate::flow::context::CallContext;
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::http_invoker;
use crate::flow::model::Node;

/// Op 111: invoke the catalog API named by `api_id`.
pub async fn invoke(ctx: &mut CallContext, node: &Node, client: &reqwest::Client) -> FlowResult<&'static str> {
    let api_id = node.api_id.as_deref().unwrap_or_default();
    let spec = ctx
        .registry
        .api(api_id)
        .ok_or_else(|| FlowError::UnknownApiId(api_id.to_string()))?
        .clone();
    let outcome = http_invoker::invoke(client, &spec, &mut ctx.store).await?;
    Ok(outcome.token)
}

/// Op 112: as 111, but also records the raw HTTP status and body under the
/// reserved `curl_response_code`/`curl_response_data` variables.
pub async fn invoke_via_provider_curl(ctx: &mut CallContext, node: &Node, client: &reqwest::Client) -> FlowResult<&'static str> {
    let api_id = node.api_id.as_deref().unwrap_or_default();
    let spec = ctx
        .registry
        .api(api_id)
        .ok_or_else(|| FlowError::UnknownApiId(api_id.to_string()))?
        .clone();

    let outcome = http_invoker::invoke(client, &spec, &mut ctx.store).await?;
    ctx.store.set("curl_response_code", outcome.status.to_string());
    ctx.store.set("curl_response_data", outcome.body);
    Ok(outcome.token)
}
