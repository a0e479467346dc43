//! Telephony provider interface (§6.1)
//!
//! The core never speaks to hardware, SIP, or a media stack directly. Every
//! telephony primitive — audio, DTMF, recording, TTS, bridging, agent control
//! — is delegated to an implementation of [`CallProvider`]. This module
//! defines only the interface; no production adapter ships here.

use async_trait::async_trait;
use std::time::Duration;

use crate::flow::error::FlowResult;

/// Outcome of a digit-collection request.
#[derive(Debug, Clone, Default)]
pub struct DigitResult {
    /// Digits collected before the terminator or timeout; empty on timeout.
    pub digits: String,
    pub timed_out: bool,
}

/// Outcome of a bridge/dial attempt.
#[derive(Debug, Clone)]
pub struct BridgeResult {
    pub bridged: bool,
    pub hangup_cause: Option<String>,
}

/// The set of operations the flow driver and node handlers require from the
/// telephony adapter. Blocking semantics are as described in the
/// concurrency model: a call suspends at these boundaries only.
#[async_trait]
pub trait CallProvider: Send + Sync {
    async fn answer(&self, call_id: &str) -> FlowResult<()>;
    async fn hangup(&self, call_id: &str, cause: &str) -> FlowResult<()>;

    async fn get_session_var(&self, call_id: &str, name: &str) -> FlowResult<Option<String>>;
    async fn set_session_var(&self, call_id: &str, name: &str, value: &str) -> FlowResult<()>;

    /// Blocks until playback finishes or the caller barges in.
    async fn play(&self, call_id: &str, file_path: &str) -> FlowResult<()>;

    #[allow(clippy::too_many_arguments)]
    async fn play_and_get_digits(
        &self,
        call_id: &str,
        prompt: &str,
        invalid_prompt: &str,
        min_len: u32,
        max_len: u32,
        attempts: u32,
        timeout: Duration,
        terminator: char,
        valid_regex: &str,
    ) -> FlowResult<DigitResult>;

    async fn read_digits(
        &self,
        call_id: &str,
        min_len: u32,
        max_len: u32,
        timeout: Duration,
        terminator: char,
    ) -> FlowResult<DigitResult>;

    async fn record(
        &self,
        call_id: &str,
        path: &str,
        max_duration: Duration,
        silence_threshold_db: f32,
        silence_seconds: Duration,
    ) -> FlowResult<()>;

    async fn speak(&self, call_id: &str, engine: &str, voice: &str, text: &str) -> FlowResult<()>;

    async fn bridge(&self, call_id: &str, dial_string: &str) -> FlowResult<BridgeResult>;

    async fn directory_exists(&self, extension: &str, domain: &str) -> FlowResult<bool>;

    async fn queue_dispatch(&self, call_id: &str, queue_name: &str) -> FlowResult<()>;

    async fn transfer_for_evaluation(&self, call_id: &str, dialplan_destination: &str) -> FlowResult<()>;

    async fn agent_set_status(&self, extension: &str, status: &str) -> FlowResult<()>;
    async fn agent_set_state(&self, extension: &str, state: &str) -> FlowResult<()>;
    async fn agent_set_contact(&self, extension: &str, contact: &str) -> FlowResult<()>;

    /// Whether `extension` is currently registered with the provider.
    async fn agent_is_registered(&self, extension: &str) -> FlowResult<bool>;

    async fn get_global(&self, name: &str) -> FlowResult<Option<String>>;

    /// Whether the caller has hung up since the call started. The driver
    /// checks this after every suspending primitive returns and, if true,
    /// terminates the call without selecting a further edge (§5 Cancellation
    /// and timeouts). Polled rather than pushed, since the driver only has a
    /// chance to observe it between suspensions anyway.
    async fn poll_hangup(&self, call_id: &str) -> FlowResult<bool>;
}

/// A `CallProvider` that logs every primitive instead of driving real media.
/// Exists so `ivr-engine serve` has something to run against out of the box
/// and so the trait's shape is demonstrated end to end; it is explicitly not
/// a production telephony bridge — wire a real SIP/media adapter behind
/// `CallProvider` for that.
pub mod loopback {
    use super::*;
    use tracing::info;

    #[derive(Debug, Default)]
    pub struct LoopbackProvider;

    #[async_trait]
    impl CallProvider for LoopbackProvider {
        async fn answer(&self, call_id: &str) -> FlowResult<()> {
            info!(call_id, "answer");
            Ok(())
        }

        async fn hangup(&self, call_id: &str, cause: &str) -> FlowResult<()> {
            info!(call_id, cause, "hangup");
            Ok(())
        }

        async fn get_session_var(&self, call_id: &str, name: &str) -> FlowResult<Option<String>> {
            info!(call_id, name, "get_session_var");
            Ok(None)
        }

        async fn set_session_var(&self, call_id: &str, name: &str, value: &str) -> FlowResult<()> {
            info!(call_id, name, value, "set_session_var");
            Ok(())
        }

        async fn play(&self, call_id: &str, file_path: &str) -> FlowResult<()> {
            info!(call_id, file_path, "play");
            Ok(())
        }

        async fn play_and_get_digits(
            &self,
            call_id: &str,
            prompt: &str,
            _invalid_prompt: &str,
            _min_len: u32,
            _max_len: u32,
            _attempts: u32,
            _timeout: Duration,
            _terminator: char,
            _valid_regex: &str,
        ) -> FlowResult<DigitResult> {
            info!(call_id, prompt, "play_and_get_digits");
            Ok(DigitResult {
                digits: String::new(),
                timed_out: true,
            })
        }

        async fn read_digits(
            &self,
            call_id: &str,
            _min_len: u32,
            _max_len: u32,
            _timeout: Duration,
            _terminator: char,
        ) -> FlowResult<DigitResult> {
            info!(call_id, "read_digits");
            Ok(DigitResult {
                digits: String::new(),
                timed_out: true,
            })
        }

        async fn record(
            &self,
            call_id: &str,
            path: &str,
            _max_duration: Duration,
            _silence_threshold_db: f32,
            _silence_seconds: Duration,
        ) -> FlowResult<()> {
            info!(call_id, path, "record");
            Ok(())
        }

        async fn speak(&self, call_id: &str, engine: &str, voice: &str, text: &str) -> FlowResult<()> {
            info!(call_id, engine, voice, text, "speak");
            Ok(())
        }

        async fn bridge(&self, call_id: &str, dial_string: &str) -> FlowResult<BridgeResult> {
            info!(call_id, dial_string, "bridge");
            Ok(BridgeResult {
                bridged: false,
                hangup_cause: Some("no media backend configured".to_string()),
            })
        }

        async fn directory_exists(&self, extension: &str, domain: &str) -> FlowResult<bool> {
            info!(extension, domain, "directory_exists");
            Ok(false)
        }

        async fn queue_dispatch(&self, call_id: &str, queue_name: &str) -> FlowResult<()> {
            info!(call_id, queue_name, "queue_dispatch");
            Ok(())
        }

        async fn transfer_for_evaluation(&self, call_id: &str, dialplan_destination: &str) -> FlowResult<()> {
            info!(call_id, dialplan_destination, "transfer_for_evaluation");
            Ok(())
        }

        async fn agent_set_status(&self, extension: &str, status: &str) -> FlowResult<()> {
            info!(extension, status, "agent_set_status");
            Ok(())
        }

        async fn agent_set_state(&self, extension: &str, state: &str) -> FlowResult<()> {
            info!(extension, state, "agent_set_state");
            Ok(())
        }

        async fn agent_set_contact(&self, extension: &str, contact: &str) -> FlowResult<()> {
            info!(extension, contact, "agent_set_contact");
            Ok(())
        }

        async fn agent_is_registered(&self, extension: &str) -> FlowResult<bool> {
            info!(extension, "agent_is_registered");
            Ok(false)
        }

        async fn get_global(&self, name: &str) -> FlowResult<Option<String>> {
            info!(name, "get_global");
            Ok(None)
        }

        async fn poll_hangup(&self, call_id: &str) -> FlowResult<bool> {
            info!(call_id, "poll_hangup");
            Ok(false)
        }
    }
}

/// Test and demonstration support. Not a production telephony adapter —
/// every call immediately "completes" its primitive from a fixed script so
/// the flow driver and node handlers can be exercised without real media.
pub mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct ScriptedProvider {
        session_vars: Mutex<HashMap<String, HashMap<String, String>>>,
        pub scripted_digits: Mutex<Vec<DigitResult>>,
        pub directory: Mutex<HashMap<String, bool>>,
        pub registered_agents: Mutex<HashMap<String, bool>>,
        /// Set to simulate the caller hanging up mid-call; checked by `poll_hangup`.
        pub hung_up: AtomicBool,
        /// File paths passed to `play`, in call order, for assertions.
        pub played_files: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CallProvider for ScriptedProvider {
        async fn answer(&self, _call_id: &str) -> FlowResult<()> {
            Ok(())
        }

        async fn hangup(&self, _call_id: &str, _cause: &str) -> FlowResult<()> {
            Ok(())
        }

        async fn get_session_var(&self, call_id: &str, name: &str) -> FlowResult<Option<String>> {
            Ok(self
                .session_vars
                .lock().unwrap()
                .get(call_id)
                .and_then(|vars| vars.get(name).cloned()))
        }

        async fn set_session_var(&self, call_id: &str, name: &str, value: &str) -> FlowResult<()> {
            self.session_vars
                .lock().unwrap()
                .entry(call_id.to_string())
                .or_default()
                .insert(name.to_string(), value.to_string());
            Ok(())
        }

        async fn play(&self, _call_id: &str, file_path: &str) -> FlowResult<()> {
            self.played_files.lock().unwrap().push(file_path.to_string());
            Ok(())
        }

        async fn play_and_get_digits(
            &self,
            _call_id: &str,
            _prompt: &str,
            _invalid_prompt: &str,
            _min_len: u32,
            _max_len: u32,
            _attempts: u32,
            _timeout: Duration,
            _terminator: char,
            _valid_regex: &str,
        ) -> FlowResult<DigitResult> {
            Ok(self.scripted_digits.lock().unwrap().pop().unwrap_or_default())
        }

        async fn read_digits(
            &self,
            _call_id: &str,
            _min_len: u32,
            _max_len: u32,
            _timeout: Duration,
            _terminator: char,
        ) -> FlowResult<DigitResult> {
            Ok(self.scripted_digits.lock().unwrap().pop().unwrap_or_default())
        }

        async fn record(
            &self,
            _call_id: &str,
            _path: &str,
            _max_duration: Duration,
            _silence_threshold_db: f32,
            _silence_seconds: Duration,
        ) -> FlowResult<()> {
            Ok(())
        }

        async fn speak(&self, _call_id: &str, _engine: &str, _voice: &str, _text: &str) -> FlowResult<()> {
            Ok(())
        }

        async fn bridge(&self, _call_id: &str, _dial_string: &str) -> FlowResult<BridgeResult> {
            Ok(BridgeResult {
                bridged: true,
                hangup_cause: None,
            })
        }

        async fn directory_exists(&self, extension: &str, _domain: &str) -> FlowResult<bool> {
            Ok(self.directory.lock().unwrap().get(extension).copied().unwrap_or(false))
        }

        async fn queue_dispatch(&self, _call_id: &str, _queue_name: &str) -> FlowResult<()> {
            Ok(())
        }

        async fn transfer_for_evaluation(&self, _call_id: &str, _dialplan_destination: &str) -> FlowResult<()> {
            Ok(())
        }

        async fn agent_set_status(&self, _extension: &str, _status: &str) -> FlowResult<()> {
            Ok(())
        }

        async fn agent_set_state(&self, _extension: &str, _state: &str) -> FlowResult<()> {
            Ok(())
        }

        async fn agent_set_contact(&self, _extension: &str, _contact: &str) -> FlowResult<()> {
            Ok(())
        }

        async fn agent_is_registered(&self, extension: &str) -> FlowResult<bool> {
            Ok(self.registered_agents.lock().unwrap().get(extension).copied().unwrap_or(false))
        }

        async fn get_global(&self, _name: &str) -> FlowResult<Option<String>> {
            Ok(None)
        }

        async fn poll_hangup(&self, _call_id: &str) -> FlowResult<bool> {
            Ok(self.hung_up.load(Ordering::Relaxed))
        }
    }
}
