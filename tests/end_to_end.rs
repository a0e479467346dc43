//! End-to-end scenarios driven through `run_call` against a real,
//! `ConfigRegistry::load`-ed configuration directory, rather than the
//! hand-wired registries the unit tests under `src/flow/driver.rs` use.

use std::sync::Arc;

use tempfile::TempDir;

use ivr_flow_engine::flow::agent::AgentRoster;
use ivr_flow_engine::flow::model::{
    ApiInput, ApiOutput, ApiSpec, ComparisonOp, ContentType, EdgeSpec, HttpMethod, Node, OperandType, Placement,
    ValueSource,
};
use ivr_flow_engine::flow::{run_call, DriverOutcome, DEFAULT_LOOP_PROTECTION_THRESHOLD};
use ivr_flow_engine::provider::test_support::ScriptedProvider;
use ivr_flow_engine::ConfigRegistry;

fn write_config_dir(nodes: Vec<Node>, apis: Vec<ApiSpec>) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");

    let flow_doc = serde_json::json!({
        "IVRConfiguration": [{
            "IVRProcessFlow": nodes,
        }]
    });
    std::fs::write(
        dir.path().join("ivrconfig.json"),
        serde_json::to_string_pretty(&flow_doc).unwrap(),
    )
    .unwrap();

    let api_doc = serde_json::json!({ "result": apis });
    std::fs::write(
        dir.path().join("automax_webAPIConfig.json"),
        serde_json::to_string_pretty(&api_doc).unwrap(),
    )
    .unwrap();

    dir
}

/// As `write_config_dir`, plus a `recording_profiles.json` so op-40 nodes
/// can resolve their `recording_type_id`.
fn write_config_dir_with_recordings(nodes: Vec<Node>, apis: Vec<ApiSpec>) -> TempDir {
    let dir = write_config_dir(nodes, apis);
    let profiles = serde_json::json!([{
        "recording_type_id": "voicemail",
        "max_duration_seconds": 30,
        "filename_prefix": "rec",
    }]);
    std::fs::write(
        dir.path().join("recording_profiles.json"),
        serde_json::to_string_pretty(&profiles).unwrap(),
    )
    .unwrap();
    dir
}

fn blank_node(id: i64, op_code: i64, is_start: bool, edges: Vec<EdgeSpec>) -> Node {
    Node {
        id,
        name: String::new(),
        op_code,
        is_start,
        voice_file_id: None,
        api_id: None,
        valid_keys: None,
        input_length: None,
        input_time_limit: None,
        tag_name: None,
        default_input: None,
        recording_type_id: None,
        repeat_limit: None,
        invalid_input_voice_file_id: None,
        is_repetitive: false,
        time_limit_response_type: None,
        is_language_select: false,
        tag_value_prefix: None,
        edges,
    }
}

fn catch_all(target: i64) -> EdgeSpec {
    EdgeSpec {
        target_id: target,
        input_keys: None,
        apply_comparison: false,
        operand_type: None,
        collection_tag: None,
        operator: None,
        value1: None,
        value2: None,
    }
}

fn keyed_edge(target: i64, input_keys: &str) -> EdgeSpec {
    EdgeSpec {
        target_id: target,
        input_keys: Some(input_keys.to_string()),
        apply_comparison: false,
        operand_type: None,
        collection_tag: None,
        operator: None,
        value1: None,
        value2: None,
    }
}

async fn drive(
    config_dir: &TempDir,
    provider: ScriptedProvider,
) -> DriverOutcome {
    let registry = ConfigRegistry::load(config_dir.path()).expect("fixture config loads");
    run_call(
        "call-1".into(),
        Arc::new(registry),
        Arc::new(provider),
        reqwest::Client::new(),
        Arc::new(AgentRoster::new()),
        DEFAULT_LOOP_PROTECTION_THRESHOLD,
    )
    .await
}

/// Scenario 1: welcome prompt, menu selection, then one of two leaves.
/// "1" lands on a clean terminate; "2" lands on a node with no outgoing
/// edges, which the driver reports as a dead end — the two node ids in the
/// assertion are the only way to tell which branch the call actually took.
#[tokio::test]
async fn welcome_menu_leaf_follows_the_selected_digit() {
    // Op 30 (play-and-collect-digit) returns the collected digit itself as
    // its result token, unlike op 20 (collect-to-terminator), which always
    // returns "#" and needs the stored tag read back downstream instead.
    let mut menu = blank_node(2, 30, false, vec![keyed_edge(3, "1"), keyed_edge(4, "2")]);
    menu.voice_file_id = Some("menu.wav".into());
    menu.tag_name = Some("MenuSelection".into());
    menu.valid_keys = Some("1,2".into());

    let welcome = blank_node(1, 10, true, vec![catch_all(2)]);
    let terminate = blank_node(3, 200, false, vec![]);
    let dead_end_leaf = blank_node(4, 10, false, vec![]);

    let dir = write_config_dir(vec![welcome, menu, terminate, dead_end_leaf], vec![]);

    let provider = ScriptedProvider::default();
    provider.scripted_digits.lock().unwrap().push(ivr_flow_engine_digit_result("1"));
    let outcome = drive(&dir, provider).await;
    assert!(matches!(outcome, DriverOutcome::Completed));

    let provider = ScriptedProvider::default();
    provider.scripted_digits.lock().unwrap().push(ivr_flow_engine_digit_result("2"));
    let outcome = drive(&dir, provider).await;
    assert!(matches!(outcome, DriverOutcome::DeadEnd { node_id: 4, ref token } if token == "S"));
}

/// Scenario 2: authenticate against an HTTP API, then branch on whether the
/// response's success flag validated.
#[tokio::test]
async fn authenticate_then_call_api_branches_on_success_flag() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/auth"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "token": "abc123" }
        })))
        .mount(&server)
        .await;

    let auth_api = ApiSpec {
        api_id: "auth".into(),
        method: HttpMethod::Post,
        url: format!("{}/auth", server.uri()),
        content_type: ContentType::Json,
        inputs: vec![ApiInput {
            name: "username".into(),
            raw_value: "operator".into(),
            placement: Placement::Body,
            value_source: ValueSource::Static,
            default_value: None,
        }],
        outputs: vec![
            ApiOutput {
                tag_name: "auth_success".into(),
                json_field: "success".into(),
                parent_field: None,
                is_list: false,
                list_index: None,
                is_success_validator: true,
                success_value: Some("true".into()),
                default_value: None,
            },
            ApiOutput {
                tag_name: "api_token".into(),
                json_field: "token".into(),
                parent_field: Some("data".into()),
                is_list: false,
                list_index: None,
                is_success_validator: false,
                success_value: None,
                default_value: None,
            },
        ],
        api_type_simple: false,
    };

    let mut call_api = blank_node(1, 111, true, vec![keyed_edge(2, "S"), keyed_edge(3, "F")]);
    call_api.api_id = Some("auth".into());
    let success_leaf = blank_node(2, 10, false, vec![]);
    let failure_leaf = blank_node(3, 10, false, vec![]);

    let dir = write_config_dir(vec![call_api, success_leaf, failure_leaf], vec![auth_api]);

    let outcome = drive(&dir, ScriptedProvider::default()).await;
    assert!(matches!(outcome, DriverOutcome::DeadEnd { node_id: 2, ref token } if token == "S"));
}

/// Scenario 3: a multipart API call carrying a file field still runs the
/// reqwest multipart path end to end against a live HTTP server.
#[tokio::test]
async fn create_incident_with_attachment_sends_multipart() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/incidents"))
        .respond_with(wiremock::ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "INC-1" })))
        .mount(&server)
        .await;

    let incident_api = ApiSpec {
        api_id: "create_incident".into(),
        method: HttpMethod::Post,
        url: format!("{}/incidents", server.uri()),
        content_type: ContentType::Multipart,
        inputs: vec![
            ApiInput {
                name: "summary".into(),
                raw_value: "caller reported an outage".into(),
                placement: Placement::Body,
                value_source: ValueSource::Static,
                default_value: None,
            },
            ApiInput {
                name: "recording".into(),
                raw_value: "{{recording_path}}".into(),
                placement: Placement::File,
                value_source: ValueSource::DynamicFromTag,
                default_value: None,
            },
        ],
        outputs: vec![ApiOutput {
            tag_name: "incident_id".into(),
            json_field: "id".into(),
            parent_field: None,
            is_list: false,
            list_index: None,
            is_success_validator: false,
            success_value: None,
            default_value: None,
        }],
        api_type_simple: false,
    };

    let mut record_node = blank_node(1, 40, true, vec![catch_all(2)]);
    record_node.tag_name = Some("recording_path".into());
    record_node.recording_type_id = Some("voicemail".into());

    let mut call_api = blank_node(2, 111, false, vec![keyed_edge(3, "S"), keyed_edge(4, "F")]);
    call_api.api_id = Some("create_incident".into());
    let success_leaf = blank_node(3, 10, false, vec![]);
    let failure_leaf = blank_node(4, 10, false, vec![]);

    let dir = write_config_dir_with_recordings(vec![record_node, call_api, success_leaf, failure_leaf], vec![incident_api]);

    // ScriptedProvider::record() never actually writes a file, so the
    // recording tag stays unset and the multipart request carries an empty
    // file field. The point of this scenario is that the multipart
    // transport completes without error end to end, not that the recorded
    // bytes survive the scripted provider.
    let outcome = drive(&dir, ScriptedProvider::default()).await;
    assert!(matches!(outcome, DriverOutcome::DeadEnd { node_id: 3, ref token } if token == "S"));
}

/// Scenario 4: op 120 branches purely on a comparison against the store,
/// no handler in between.
#[tokio::test]
async fn conditional_branch_on_customer_type() {
    let mut collect_type = blank_node(1, 20, true, vec![catch_all(2)]);
    collect_type.tag_name = Some("customer_type".into());
    collect_type.valid_keys = Some("9,1".into());
    collect_type.input_length = Some(1);

    let branch = blank_node(
        2,
        120,
        false,
        vec![
            EdgeSpec {
                target_id: 3,
                input_keys: None,
                apply_comparison: true,
                operand_type: Some(OperandType::Tag),
                collection_tag: Some("customer_type".into()),
                operator: Some(ComparisonOp::Eq),
                value1: Some("9".into()),
                value2: None,
            },
            catch_all(4),
        ],
    );
    let vip_leaf = blank_node(3, 10, false, vec![]);
    let standard_leaf = blank_node(4, 10, false, vec![]);

    let dir = write_config_dir(vec![collect_type, branch, vip_leaf, standard_leaf], vec![]);

    let provider = ScriptedProvider::default();
    provider.scripted_digits.lock().unwrap().push(ivr_flow_engine_digit_result("9"));
    let outcome = drive(&dir, provider).await;
    assert!(matches!(outcome, DriverOutcome::DeadEnd { node_id: 3, .. }));

    let provider = ScriptedProvider::default();
    provider.scripted_digits.lock().unwrap().push(ivr_flow_engine_digit_result("1"));
    let outcome = drive(&dir, provider).await;
    assert!(matches!(outcome, DriverOutcome::DeadEnd { node_id: 4, .. }));
}

/// Scenario 5: a DTMF timeout with `time_limit_response_type: "default"`
/// takes the "D" edge and writes `default_input` into the store instead of
/// retrying or dead-ending.
#[tokio::test]
async fn input_timeout_falls_back_to_default_edge() {
    let mut collect_pin = blank_node(1, 20, true, vec![keyed_edge(2, "D")]);
    collect_pin.tag_name = Some("pin".into());
    collect_pin.default_input = Some("0000".into());
    collect_pin.time_limit_response_type = Some("default".into());

    let terminate = blank_node(2, 200, false, vec![]);

    let dir = write_config_dir(vec![collect_pin, terminate], vec![]);

    // No scripted digits queued: ScriptedProvider.read_digits pops from an
    // empty Vec and returns an empty, non-timed-out DigitResult, which is
    // exactly what wants_default() keys off of.
    let outcome = drive(&dir, ScriptedProvider::default()).await;
    assert!(matches!(outcome, DriverOutcome::Completed));
}

/// Scenario 6: a result token with no matching edge and no catch-all is a
/// dead end, not a panic or a silently stuck call.
#[tokio::test]
async fn unmatched_token_is_a_dead_end() {
    let lone_node = blank_node(1, 10, true, vec![]);
    let dir = write_config_dir(vec![lone_node], vec![]);

    let outcome = drive(&dir, ScriptedProvider::default()).await;
    assert!(matches!(outcome, DriverOutcome::DeadEnd { node_id: 1, ref token } if token == "S"));
}

fn ivr_flow_engine_digit_result(digits: &str) -> ivr_flow_engine::provider::DigitResult {
    ivr_flow_engine::provider::DigitResult {
        digits: digits.to_string(),
        timed_out: false,
    }
}
