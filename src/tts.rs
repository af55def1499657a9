//! Speech synthesis invocation.
//!
//! Synthesis is a collaborator, not part of the automation core: the
//! orchestrator owns one `Synthesizer` handle, constructed explicitly at
//! startup and injected — never a lazily initialized global. The trait keeps
//! the pipeline testable without a model on disk.

use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::bridge::CommandExecutor;
use crate::defaults;
use crate::error::{Result, S2tsError};

/// One synthesis job: text to speak in the voice of the reference audio.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    /// Reference audio establishing the target voice.
    pub ref_audio: Option<PathBuf>,
    /// Transcript of the reference audio.
    pub ref_text: String,
    pub out_path: PathBuf,
}

/// Speech synthesis capability. Implementations write a WAV file at
/// `request.out_path` and return its path.
pub trait Synthesizer {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<PathBuf>;
}

/// Synthesizer backed by an external command.
///
/// The command is invoked as
/// `<command> --text <text> --ref-audio <path> --ref-text <text> --out <path>`.
/// When the request carries no usable reference (missing audio or empty
/// reference text), a one-second silent placeholder is written instead so
/// the pipeline still produces a complete output set.
pub struct CommandSynthesizer<E: CommandExecutor> {
    executor: E,
    command: Option<String>,
    sample_rate: u32,
}

impl<E: CommandExecutor> CommandSynthesizer<E> {
    pub fn new(executor: E, command: Option<String>, sample_rate: u32) -> Self {
        Self {
            executor,
            command,
            sample_rate,
        }
    }

    fn write_placeholder(&self, out_path: &Path) -> Result<PathBuf> {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(out_path, spec)
            .map_err(|e| S2tsError::Synthesis { message: e.to_string() })?;
        for _ in 0..self.sample_rate {
            writer
                .write_sample(0i16)
                .map_err(|e| S2tsError::Synthesis { message: e.to_string() })?;
        }
        writer
            .finalize()
            .map_err(|e| S2tsError::Synthesis { message: e.to_string() })?;
        Ok(out_path.to_path_buf())
    }
}

impl<E: CommandExecutor> Synthesizer for CommandSynthesizer<E> {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<PathBuf> {
        let reference = match (&request.ref_audio, request.ref_text.trim()) {
            (Some(audio), text) if !text.is_empty() => Some((audio, text)),
            _ => None,
        };

        let (Some(command), Some((ref_audio, ref_text))) = (&self.command, reference) else {
            warn!(
                "no synthesis command or reference available, writing placeholder to {}",
                request.out_path.display()
            );
            return self.write_placeholder(&request.out_path);
        };

        if let Some(parent) = request.out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let ref_audio = ref_audio.display().to_string();
        let out = request.out_path.display().to_string();
        let args = [
            "--text",
            request.text.as_str(),
            "--ref-audio",
            ref_audio.as_str(),
            "--ref-text",
            ref_text,
            "--out",
            out.as_str(),
        ];

        match self.executor.execute(command, &args) {
            Ok(_) => {
                info!("synthesized {} chars to {}", request.text.len(), out);
                Ok(request.out_path.clone())
            }
            Err(e) => {
                // A missing output would break downstream consumers; leave a
                // placeholder before surfacing the failure.
                warn!("synthesis command failed: {}", e);
                self.write_placeholder(&request.out_path)?;
                Err(S2tsError::Synthesis { message: e.to_string() })
            }
        }
    }
}

/// Placeholder-only synthesizer for setups without a synthesis command.
pub struct SilenceSynthesizer {
    sample_rate: u32,
}

impl SilenceSynthesizer {
    pub fn new() -> Self {
        Self {
            sample_rate: defaults::TTS_SAMPLE_RATE,
        }
    }
}

impl Default for SilenceSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer for SilenceSynthesizer {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<PathBuf> {
        if let Some(parent) = request.out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&request.out_path, spec)
            .map_err(|e| S2tsError::Synthesis { message: e.to_string() })?;
        for _ in 0..self.sample_rate {
            writer
                .write_sample(0i16)
                .map_err(|e| S2tsError::Synthesis { message: e.to_string() })?;
        }
        writer
            .finalize()
            .map_err(|e| S2tsError::Synthesis { message: e.to_string() })?;
        Ok(request.out_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::SystemCommandExecutor;

    fn request(dir: &Path, ref_audio: Option<PathBuf>, ref_text: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: "வணக்கம்".to_string(),
            ref_audio,
            ref_text: ref_text.to_string(),
            out_path: dir.join("out.wav"),
        }
    }

    #[test]
    fn missing_reference_writes_one_second_placeholder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let synth = CommandSynthesizer::new(SystemCommandExecutor::new(), None, 24_000);
        let path = synth
            .synthesize(&request(dir.path(), None, ""))
            .expect("placeholder");
        let reader = hound::WavReader::open(&path).expect("readable wav");
        assert_eq!(reader.spec().sample_rate, 24_000);
        assert_eq!(reader.len(), 24_000);
    }

    #[test]
    fn reference_without_transcript_still_yields_placeholder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let synth = CommandSynthesizer::new(
            SystemCommandExecutor::new(),
            Some("true".to_string()),
            24_000,
        );
        let path = synth
            .synthesize(&request(dir.path(), Some(PathBuf::from("/tmp/ref.wav")), "  "))
            .expect("placeholder");
        assert!(path.exists());
    }

    #[test]
    fn failing_command_leaves_placeholder_and_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let synth = CommandSynthesizer::new(
            SystemCommandExecutor::new(),
            Some("false".to_string()),
            24_000,
        );
        let req = request(dir.path(), Some(PathBuf::from("/tmp/ref.wav")), "reference text");
        let err = synth.synthesize(&req).expect_err("command fails");
        assert!(matches!(err, S2tsError::Synthesis { .. }));
        assert!(req.out_path.exists());
    }

    #[test]
    fn silence_synthesizer_writes_wav() {
        let dir = tempfile::tempdir().expect("tempdir");
        let synth = SilenceSynthesizer::new();
        let req = request(dir.path(), None, "");
        let path = synth.synthesize(&req).expect("wav written");
        assert!(path.exists());
    }
}
