//! Flow and API catalog data model (§3)
//!
//! Every type here is immutable once loaded. Nodes and edges are addressed by
//! integer id, never by reference — the graph is explicitly cyclic (§9), so
//! node-to-node pointers would make cycles unrepresentable in safe Rust
//! without `Rc`/`Weak` bookkeeping the rest of the engine has no use for.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One step in the IVR graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub op_code: i64,
    #[serde(default)]
    pub is_start: bool,

    #[serde(default)]
    pub voice_file_id: Option<String>,
    #[serde(default)]
    pub api_id: Option<String>,
    #[serde(default)]
    pub valid_keys: Option<String>,
    #[serde(default)]
    pub input_length: Option<u32>,
    #[serde(default)]
    pub input_time_limit: Option<u64>,
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub default_input: Option<String>,
    #[serde(default)]
    pub recording_type_id: Option<String>,
    #[serde(default)]
    pub repeat_limit: Option<u32>,
    #[serde(default)]
    pub invalid_input_voice_file_id: Option<String>,
    #[serde(default)]
    pub is_repetitive: bool,
    #[serde(default)]
    pub time_limit_response_type: Option<String>,
    #[serde(default)]
    pub is_language_select: bool,
    #[serde(default)]
    pub tag_value_prefix: Option<String>,

    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

/// An outgoing link from a node; guarded by a result-token match or a
/// comparison. Neither present means catch-all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub target_id: i64,
    #[serde(default)]
    pub input_keys: Option<String>,
    #[serde(default)]
    pub apply_comparison: bool,
    #[serde(default)]
    pub operand_type: Option<OperandType>,
    #[serde(default)]
    pub collection_tag: Option<String>,
    #[serde(default)]
    pub operator: Option<ComparisonOp>,
    #[serde(default)]
    pub value1: Option<String>,
    #[serde(default)]
    pub value2: Option<String>,
}

impl EdgeSpec {
    pub fn is_catch_all(&self) -> bool {
        self.input_keys.is_none() && !self.apply_comparison
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandType {
    Tag,
    Literal,
}

/// The closed comparison operator set (§4.4). Per Open Question 1 this
/// implements the full documented set rather than the narrower set the
/// original source actually executed; see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "EQ")]
    Eq,
    #[serde(rename = "NE")]
    Ne,
    #[serde(rename = "GRT")]
    Grt,
    #[serde(rename = "LST")]
    Lst,
    #[serde(rename = "GTE")]
    Gte,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "IBW")]
    Ibw,
    #[serde(rename = "OBW")]
    Obw,
    #[serde(rename = "CONTAINS")]
    Contains,
    #[serde(rename = "STARTS_WITH")]
    StartsWith,
    #[serde(rename = "ENDS_WITH")]
    EndsWith,
    #[serde(rename = "IS_EMPTY")]
    IsEmpty,
    #[serde(rename = "IS_NOT_EMPTY")]
    IsNotEmpty,
}

/// A single named, parameterized HTTP call (§3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSpec {
    pub api_id: String,
    pub method: HttpMethod,
    pub url: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub inputs: Vec<ApiInput>,
    #[serde(default)]
    pub outputs: Vec<ApiOutput>,
    /// When true, a JSON body is emitted as `{ name: value }` rather than the
    /// `{ "values": [...] }` envelope (§4.5.2).
    #[serde(default)]
    pub api_type_simple: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "application/x-www-form-urlencoded")]
    FormUrlEncoded,
    #[serde(rename = "multipart/form-data")]
    Multipart,
    #[serde(rename = "audio/wav")]
    AudioWav,
    #[serde(rename = "raw")]
    Raw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInput {
    pub name: String,
    #[serde(default)]
    pub raw_value: String,
    pub placement: Placement,
    pub value_source: ValueSource,
    #[serde(default)]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Url,
    Body,
    Header,
    File,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueSource {
    Static,
    #[serde(rename = "dynamic-from-tag")]
    DynamicFromTag,
    Environment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOutput {
    pub tag_name: String,
    pub json_field: String,
    #[serde(default)]
    pub parent_field: Option<String>,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub list_index: Option<usize>,
    #[serde(default)]
    pub is_success_validator: bool,
    #[serde(default)]
    pub success_value: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

/// One row of the `LanguageList` general setting (§6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageRow {
    #[serde(rename = "LanguageCode")]
    pub language_code: i64,
    #[serde(rename = "LanguageName")]
    pub language_name: String,
    #[serde(rename = "TTSLanguageCode")]
    pub tts_language_code: String,
    #[serde(rename = "STTLanguageCode")]
    pub stt_language_code: String,
    #[serde(rename = "TTSVoiceNameBuiltIn")]
    pub tts_voice_name_built_in: String,
    #[serde(rename = "TTSVoiceNameCloud")]
    pub tts_voice_name_cloud: String,
}

impl LanguageRow {
    /// Every field, keyed by its own session-variable name, for the op-30
    /// language-select write-back (§4.3 op 30, §6.2).
    pub fn as_session_vars(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("LanguageCode".into(), self.language_code.to_string());
        map.insert("LanguageName".into(), self.language_name.clone());
        map.insert("TTSLanguageCode".into(), self.tts_language_code.clone());
        map.insert("STTLanguageCode".into(), self.stt_language_code.clone());
        map.insert(
            "TTSVoiceNameBuiltIn".into(),
            self.tts_voice_name_built_in.clone(),
        );
        map.insert("TTSVoiceNameCloud".into(), self.tts_voice_name_cloud.clone());
        map
    }
}

/// A weekday availability window, `"h:mmAM/PM"` strings per §6.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleWindow {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
}

/// Recording profile: max duration and filename prefix for op 40.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingProfile {
    pub recording_type_id: String,
    pub max_duration_seconds: u64,
    pub filename_prefix: String,
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold_db: f32,
}

fn default_silence_threshold() -> f32 {
    -40.0
}

/// One roster entry for the agent rendezvous subsystem (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExtension {
    pub extension: String,
    #[serde(default)]
    pub is_agent: bool,
    #[serde(default)]
    pub queue_name: Option<String>,
}
