//! Loaded, validated configuration: flow graph, API catalog, and the
//! supplementary settings the driver needs before it can accept a call
//! (§6.2, §6.4).
//!
//! A `ConfigRegistry` is built once per reload and never mutated in place;
//! callers share it via `Arc` and swap the whole thing out between calls
//! (Invariant 5) using `arc_swap::ArcSwap<ConfigRegistry>` at the call site.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::flow::error::{FlowError, FlowResult};
use crate::flow::model::{AgentExtension, ApiSpec, LanguageRow, Node, RecordingProfile, ScheduleWindow};

const SETTING_LANGUAGE_LIST: i64 = 15;
const SETTING_AVAILABILITY_SCHEDULE: i64 = 6;
const SETTING_UNAVAILABILITY_DATES: i64 = 7;
const SETTING_UNAVAILABILITY_AUDIO: i64 = 8;
const SETTING_STT_RESPONSE_FIELD: i64 = 14;

#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    nodes: HashMap<i64, Node>,
    start_node_id: Option<i64>,
    apis: HashMap<String, ApiSpec>,
    languages: HashMap<i64, LanguageRow>,
    pub schedule: HashMap<String, ScheduleWindow>,
    pub unavailable_dates: Vec<String>,
    pub unavailability_audio: Option<String>,
    pub stt_response_field: Option<String>,
    agent_extensions: HashMap<String, AgentExtension>,
    recording_profiles: HashMap<String, RecordingProfile>,
}

impl ConfigRegistry {
    /// Open Question 1 (comparison operator set): every flow compiled
    /// against this registry gets the full thirteen-operator set
    /// (`ComparisonOp`) rather than the narrower set the original engine
    /// actually executed. Recorded here, at the config boundary, because
    /// this is the thing flow authors and downstream tooling actually bind
    /// against — not a comment buried in the enum definition.
    pub fn comparison_policy() -> &'static str {
        "full operator set (EQ, NE, GRT, LST, GTE, LTE, IBW, OBW, CONTAINS, STARTS_WITH, ENDS_WITH, IS_EMPTY, IS_NOT_EMPTY)"
    }

    /// A registry with nothing loaded, for unit tests that only need a
    /// `CallContext` to exist.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(config_dir: &Path) -> FlowResult<Self> {
        let flow_file = config_dir.join("ivrconfig.json");
        let api_file = config_dir.join("automax_webAPIConfig.json");
        let agents_file = config_dir.join("agent_extensions.json");
        let recordings_file = config_dir.join("recording_profiles.json");

        let flow_raw = read_to_string(&flow_file)?;
        let api_raw = read_to_string(&api_file)?;

        let flow_doc: IvrConfigFile = serde_json::from_str(&flow_raw).map_err(|e| FlowError::ParseError {
            file: flow_file.display().to_string(),
            error: e.to_string(),
        })?;
        let api_doc: ApiCatalogFile = serde_json::from_str(&api_raw).map_err(|e| FlowError::ParseError {
            file: api_file.display().to_string(),
            error: e.to_string(),
        })?;

        let agent_extensions = if agents_file.exists() {
            let raw = read_to_string(&agents_file)?;
            let rows: Vec<AgentExtension> = serde_json::from_str(&raw).map_err(|e| FlowError::ParseError {
                file: agents_file.display().to_string(),
                error: e.to_string(),
            })?;
            rows.into_iter().map(|a| (a.extension.clone(), a)).collect()
        } else {
            HashMap::new()
        };

        let recording_profiles = if recordings_file.exists() {
            let raw = read_to_string(&recordings_file)?;
            let rows: Vec<RecordingProfile> = serde_json::from_str(&raw).map_err(|e| FlowError::ParseError {
                file: recordings_file.display().to_string(),
                error: e.to_string(),
            })?;
            rows.into_iter().map(|r| (r.recording_type_id.clone(), r)).collect()
        } else {
            HashMap::new()
        };

        let entry = flow_doc
            .ivr_configuration
            .into_iter()
            .next()
            .ok_or_else(|| FlowError::ParseError {
                file: flow_file.display().to_string(),
                error: "IVRConfiguration is empty".into(),
            })?;

        let mut nodes = HashMap::new();
        let mut start_node_id = None;
        for node in entry.ivr_process_flow {
            if node.is_start {
                start_node_id = Some(node.id);
            }
            nodes.insert(node.id, node);
        }

        let mut languages = HashMap::new();
        let mut schedule = HashMap::new();
        let mut unavailable_dates = Vec::new();
        let mut unavailability_audio = None;
        let mut stt_response_field = None;

        for setting in &entry.general_setting_values {
            match setting.setting_id {
                SETTING_LANGUAGE_LIST => {
                    let rows: Vec<LanguageRow> =
                        serde_json::from_str(&setting.setting_value).map_err(|e| FlowError::ParseError {
                            file: flow_file.display().to_string(),
                            error: format!("LanguageList: {e}"),
                        })?;
                    languages = rows.into_iter().map(|r| (r.language_code, r)).collect();
                }
                SETTING_AVAILABILITY_SCHEDULE => {
                    schedule = serde_json::from_str(&setting.setting_value).map_err(|e| FlowError::ParseError {
                        file: flow_file.display().to_string(),
                        error: format!("IVRAvailablitySchedule: {e}"),
                    })?;
                }
                SETTING_UNAVAILABILITY_DATES => {
                    unavailable_dates =
                        serde_json::from_str(&setting.setting_value).map_err(|e| FlowError::ParseError {
                            file: flow_file.display().to_string(),
                            error: format!("IVRUnavailablityDates: {e}"),
                        })?;
                }
                SETTING_UNAVAILABILITY_AUDIO => {
                    unavailability_audio = Some(setting.setting_value.clone());
                }
                SETTING_STT_RESPONSE_FIELD => {
                    stt_response_field = Some(setting.setting_value.clone());
                }
                _ => {}
            }
        }

        let apis = api_doc.result.into_iter().map(|a| (a.api_id.clone(), a)).collect();

        let registry = Self {
            nodes,
            start_node_id,
            apis,
            languages,
            schedule,
            unavailable_dates,
            unavailability_audio,
            stt_response_field,
            agent_extensions,
            recording_profiles,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Invariant 1 and Invariant 2: every edge target resolves to a defined
    /// node, and exactly one node is the start node.
    fn validate(&self) -> FlowResult<()> {
        let start_count = self.nodes.values().filter(|n| n.is_start).count();
        if start_count != 1 {
            return Err(FlowError::StartNodeCount(start_count));
        }
        for node in self.nodes.values() {
            for edge in &node.edges {
                if !self.nodes.contains_key(&edge.target_id) {
                    return Err(FlowError::UnresolvedEdgeTarget {
                        from: node.id,
                        target: edge.target_id,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn start_node_id(&self) -> Option<i64> {
        self.start_node_id
    }

    pub fn node(&self, id: i64) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn api(&self, api_id: &str) -> Option<&ApiSpec> {
        self.apis.get(api_id)
    }

    pub fn language(&self, code: i64) -> Option<&LanguageRow> {
        self.languages.get(&code)
    }

    pub fn agent_extension(&self, extension: &str) -> Option<&AgentExtension> {
        self.agent_extensions.get(extension)
    }

    /// The full agent/supervisor roster, for the op 100/101 availability
    /// scan (§4.6).
    pub fn all_agent_extensions(&self) -> impl Iterator<Item = &AgentExtension> {
        self.agent_extensions.values()
    }

    pub fn recording_profile(&self, recording_type_id: &str) -> Option<&RecordingProfile> {
        self.recording_profiles.get(recording_type_id)
    }
}

fn read_to_string(path: &Path) -> FlowResult<String> {
    std::fs::read_to_string(path).map_err(|e| FlowError::ConfigReadError {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}

#[derive(Deserialize)]
struct IvrConfigFile {
    #[serde(rename = "IVRConfiguration")]
    ivr_configuration: Vec<IvrConfigEntry>,
}

#[derive(Deserialize)]
struct IvrConfigEntry {
    #[serde(rename = "GeneralSettingValues", default)]
    general_setting_values: Vec<GeneralSetting>,
    #[serde(rename = "IVRProcessFlow", default)]
    ivr_process_flow: Vec<Node>,
}

#[derive(Deserialize)]
struct GeneralSetting {
    #[serde(rename = "SettingId")]
    setting_id: i64,
    #[serde(rename = "SettingValue")]
    setting_value: String,
}

#[derive(Deserialize)]
struct ApiCatalogFile {
    result: Vec<ApiSpec>,
}

#[cfg(test)]
impl ConfigRegistry {
    /// Insert a node directly, bypassing JSON loading, for tests elsewhere
    /// in the crate that only need a couple of nodes wired up.
    pub fn test_insert_node(&mut self, node: Node) {
        if node.is_start {
            self.start_node_id = Some(node.id);
        }
        self.nodes.insert(node.id, node);
    }

    pub fn test_insert_agent_extension(&mut self, extension: AgentExtension) {
        self.agent_extensions.insert(extension.extension.clone(), extension);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::model::EdgeSpec;

    fn node(id: i64, is_start: bool, edges: Vec<EdgeSpec>) -> Node {
        Node {
            id,
            name: String::new(),
            op_code: 10,
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

    fn edge(target: i64) -> EdgeSpec {
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

    #[test]
    fn exactly_one_start_node_passes_validation() {
        let mut registry = ConfigRegistry::empty();
        registry.nodes.insert(1, node(1, true, vec![edge(2)]));
        registry.nodes.insert(2, node(2, false, vec![]));
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn zero_start_nodes_fails_invariant_two() {
        let mut registry = ConfigRegistry::empty();
        registry.nodes.insert(1, node(1, false, vec![]));
        let err = registry.validate().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn dangling_edge_target_fails_invariant_one() {
        let mut registry = ConfigRegistry::empty();
        registry.nodes.insert(1, node(1, true, vec![edge(999)]));
        let err = registry.validate().unwrap_err();
        assert!(matches!(err, FlowError::UnresolvedEdgeTarget { from: 1, target: 999 }));
    }
}
