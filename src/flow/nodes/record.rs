//! Op 40: record caller audio and classify it as voice or silence (§4.3).

use std::time::Duration;

use crate::flow::context::CallContext;
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::model::Node;

/// Op 40: record to `{prefix}_{call_id}.wav` per the recording profile, then
/// decide "S" (voice present) or "D" (silence) by scanning sample energy.
pub async fn record(ctx: &mut CallContext, node: &Node) -> FlowResult<&'static str> {
    let recording_type_id = node.recording_type_id.as_deref().unwrap_or_default();
    let profile = ctx
        .registry
        .recording_profile(recording_type_id)
        .ok_or_else(|| FlowError::Internal(format!("node {}: unknown recording profile '{recording_type_id}'", node.id)))?
        .clone();

    let path = format!("{}_{}.wav", profile.filename_prefix, ctx.call_id);
    let max_duration = Duration::from_secs(profile.max_duration_seconds);
    let silence_seconds = Duration::from_secs(2);

    ctx.provider
        .record(&ctx.call_id, &path, max_duration, profile.silence_threshold_db, silence_seconds)
        .await?;

    let tag = node.tag_name.as_deref().unwrap_or_default();
    if contains_voice(&path, profile.silence_threshold_db)? {
        ctx.store.set(tag, path);
        Ok("S")
    } else {
        Ok("D")
    }
}

/// Scan a WAV file for any sample whose energy (dBFS) exceeds `threshold_db`.
/// An unreadable or missing file is treated as silence, not an error — the
/// provider may not have produced a file at all on a zero-length recording.
fn contains_voice(path: &str, threshold_db: f32) -> FlowResult<bool> {
    let mut reader = match hound::WavReader::open(path) {
        Ok(r) => r,
        Err(_) => return Ok(false),
    };

    let spec = reader.spec();
    let full_scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f64;
    let threshold_linear = 10f64.powf(threshold_db as f64 / 20.0);

    for sample in reader.samples::<i32>() {
        let Ok(sample) = sample else { continue };
        let normalized = (sample as f64 / full_scale).abs();
        if normalized >= threshold_linear {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &str, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn silent_file_has_no_voice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_wav(path.to_str().unwrap(), &[0; 800]);
        assert!(!contains_voice(path.to_str().unwrap(), -40.0).unwrap());
    }

    #[test]
    fn loud_file_has_voice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.wav");
        write_wav(path.to_str().unwrap(), &[20000; 800]);
        assert!(contains_voice(path.to_str().unwrap(), -40.0).unwrap());
    }

    #[test]
    fn missing_file_is_silence_not_error() {
        assert!(!contains_voice("/nonexistent/path.wav", -40.0).unwrap());
    }
}
