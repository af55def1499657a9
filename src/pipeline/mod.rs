//! Pipeline orchestration: ASR → clean → translate → TTS.
//!
//! Stages run strictly sequentially — every stage contends for the same
//! screen, keyboard and clipboard, so there is never more than one live
//! automation surface. The orchestrator owns all long-lived handles
//! (bridge, synthesizer, state, event sink); stage logic receives them
//! explicitly.
//!
//! A timed-out response is not a pipeline failure: downstream stages
//! proceed with the best-effort text.

pub mod progress;
pub mod project;

use log::{info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::asr::AsrDriver;
use crate::bridge::{CommandExecutor, InputBridge};
use crate::config::Config;
use crate::engine::session::{EngineTarget, Session};
use crate::engine::stabilize::{CancelToken, Outcome, StabilizationResult};
use crate::error::Result;
use crate::prompts::PromptStore;
use crate::state::{StageStatus, StateManager};
use crate::tts::{SynthesisRequest, Synthesizer};

use progress::{EventSink, Stage, StageEvent, secfmt};
use project::{StagePaths, make_project_folder, write_text};

/// Which stages to run.
#[derive(Debug, Clone, Copy)]
pub struct StageSet {
    pub asr: bool,
    pub clean: bool,
    pub translate: bool,
    pub tts: bool,
}

impl Default for StageSet {
    fn default() -> Self {
        Self {
            asr: true,
            clean: true,
            translate: true,
            tts: true,
        }
    }
}

/// One unit of work for the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineJob {
    /// Input audio; when absent, `manual_text` feeds the text stages.
    pub audio: Option<PathBuf>,
    pub manual_text: String,
    /// Engine name from the config table; first configured when `None`.
    pub engine: Option<String>,
    pub target_langs: Vec<String>,
    pub stages: StageSet,
    /// Reference audio/transcript for voice-matched synthesis.
    pub ref_audio: Option<PathBuf>,
    pub ref_text: String,
}

/// Output of one text stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub output: String,
    pub elapsed: Duration,
    pub timed_out: bool,
    pub file: Option<PathBuf>,
}

/// Output of one synthesis run.
#[derive(Debug, Clone)]
pub struct TtsReport {
    pub path: PathBuf,
    pub elapsed: Duration,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub project_dir: PathBuf,
    pub asr: Option<StageReport>,
    pub clean: Option<StageReport>,
    pub translations: BTreeMap<String, StageReport>,
    pub tts: BTreeMap<String, TtsReport>,
    pub cancelled: bool,
}

/// The orchestrator. One instance per process; owns every long-lived
/// resource handle.
pub struct Pipeline<E: CommandExecutor> {
    config: Config,
    bridge: InputBridge<E>,
    synthesizer: Box<dyn Synthesizer>,
    prompts: PromptStore,
    state: StateManager,
    sink: Box<dyn EventSink>,
}

impl<E: CommandExecutor> Pipeline<E> {
    /// Build the orchestrator: create the directory layout, materialize
    /// default prompts and load persisted state.
    pub fn new(
        config: Config,
        executor: E,
        synthesizer: Box<dyn Synthesizer>,
        sink: Box<dyn EventSink>,
    ) -> Result<Self> {
        let bridge = InputBridge::new(executor, config.paths.screenshot_dir.clone());
        let prompts = PromptStore::new(config.paths.prompts_dir.clone());

        project::ensure_dir(&config.paths.data_dir)?;
        project::ensure_dir(&config.paths.projects_dir)?;
        prompts.materialize_defaults()?;

        let state = StateManager::load(config.paths.data_dir.join("pipeline_state.json"));

        Ok(Self {
            config,
            bridge,
            synthesizer,
            prompts,
            state,
            sink,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one message through a GUI-hosted engine: launch, submit, wait
    /// for the response to stabilize, tear down.
    ///
    /// Returns the stabilization result; `TimedOut` carries best-effort
    /// text and is not an error. Only launch and clipboard-staging failures
    /// propagate.
    pub fn run_stage(
        &self,
        input_text: &str,
        prompt: &str,
        target: &EngineTarget,
        target_lang: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<StabilizationResult> {
        let mut session = Session::new(target.clone(), &self.bridge)
            .with_timing(self.config.timing.session_timing())
            .with_stabilize_config(self.config.timing.stabilize_config());
        session.start()?;
        session.send_and_get(prompt, input_text, target_lang, cancel)
    }

    /// Run the full pipeline for one job.
    pub fn run(&mut self, job: &PipelineJob, cancel: &CancelToken) -> Result<PipelineReport> {
        let base = match &job.audio {
            Some(audio) => audio
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unnamed".to_string()),
            None => format!("manual-{}", now_secs()),
        };
        let project_dir = make_project_folder(&self.config.paths.projects_dir, &base)?;
        let paths = StagePaths::new(&project_dir, &base);

        let mut report = PipelineReport {
            project_dir,
            ..PipelineReport::default()
        };

        // --- ASR ---
        let mut text = job.manual_text.clone();
        if job.stages.asr && let Some(audio) = &job.audio {
            self.emit(Stage::Asr, 0, "starting transcription");
            self.state.update_stage("asr", StageStatus::Running, None)?;
            let driver = AsrDriver::from_config(&self.bridge, &self.config.asr)?;
            match driver.run(audio, cancel) {
                Ok(outcome) => {
                    write_text(&paths.asr(), &outcome.text)?;
                    self.emit(
                        Stage::Asr,
                        100,
                        format!("completed in {}", secfmt(outcome.elapsed)),
                    );
                    self.state.update_stage("asr", StageStatus::Completed, None)?;
                    text = outcome.text.clone();
                    report.asr = Some(StageReport {
                        output: outcome.text,
                        elapsed: outcome.elapsed,
                        timed_out: false,
                        file: Some(paths.asr()),
                    });
                }
                Err(e) => {
                    self.state
                        .update_stage("asr", StageStatus::Failed, Some(e.to_string()))?;
                    return Err(e);
                }
            }
        }

        // --- Clean ---
        if job.stages.clean && !text.trim().is_empty() {
            self.emit(Stage::Clean, 0, "starting text cleanup");
            self.state.update_stage("clean", StageStatus::Running, None)?;
            let (_, target) = self.config.engine(job.engine.as_deref())?;
            let target = target.clone();
            let prompt = self.prompts.corrector();

            let key = StateManager::cache_key(&text);
            let cached = self
                .state
                .cached_result("clean", &key)
                .filter(|cached| !cached.trim().is_empty())
                .map(str::to_string);
            let stage = match cached {
                Some(cached_text) => {
                    self.emit(Stage::Clean, 100, "using cached result");
                    StageReport {
                        output: cached_text,
                        elapsed: Duration::ZERO,
                        timed_out: false,
                        file: Some(paths.clean()),
                    }
                }
                None => {
                    let result = match self.run_stage(&text, &prompt, &target, None, cancel) {
                        Ok(result) => result,
                        Err(e) => {
                            self.state
                                .update_stage("clean", StageStatus::Failed, Some(e.to_string()))?;
                            return Err(e);
                        }
                    };
                    if result.outcome == Outcome::Cancelled {
                        report.cancelled = true;
                        return Ok(report);
                    }
                    // Only a converged, non-empty result is worth replaying:
                    // caching a timed-out or empty run would pin the failure
                    // to this input and block every retry.
                    if result.outcome == Outcome::Stabilized && !result.final_text.trim().is_empty()
                    {
                        self.state.cache_result("clean", &key, &result.final_text)?;
                    }
                    self.emit(
                        Stage::Clean,
                        100,
                        format!("completed in {}", secfmt(result.elapsed)),
                    );
                    stage_report(result, paths.clean())
                }
            };
            write_text(&paths.clean(), &stage.output)?;
            self.state.update_stage("clean", StageStatus::Completed, None)?;
            if stage.output.trim().is_empty() {
                warn!("cleanup produced no text, keeping uncleaned transcript");
            } else {
                text = stage.output.clone();
            }
            report.clean = Some(stage);
        }

        // --- Translate ---
        if job.stages.translate && !text.trim().is_empty() {
            let (_, target) = self.config.engine(job.engine.as_deref())?;
            let target = target.clone();
            let prompt = self.prompts.translator();
            let total = job.target_langs.len().max(1);

            for (i, lang) in job.target_langs.iter().enumerate() {
                self.emit(
                    Stage::Translate,
                    (i * 100 / total) as u8,
                    format!("translating to {}", lang),
                );
                let stage_name = format!("translate-{}", lang);
                self.state.update_stage(&stage_name, StageStatus::Running, None)?;

                let result = match self.run_stage(&text, &prompt, &target, Some(lang), cancel) {
                    Ok(result) => result,
                    Err(e) => {
                        self.state
                            .update_stage(&stage_name, StageStatus::Failed, Some(e.to_string()))?;
                        return Err(e);
                    }
                };
                if result.outcome == Outcome::Cancelled {
                    report.cancelled = true;
                    return Ok(report);
                }
                write_text(&paths.translated(lang), &result.final_text)?;
                self.state
                    .update_stage(&stage_name, StageStatus::Completed, None)?;
                self.emit(
                    Stage::Translate,
                    ((i + 1) * 100 / total) as u8,
                    format!("{} done in {}", lang, secfmt(result.elapsed)),
                );
                report
                    .translations
                    .insert(lang.clone(), stage_report(result, paths.translated(lang)));
            }
        }

        // --- TTS ---
        if job.stages.tts {
            let texts: Vec<(String, String)> = if report.translations.is_empty() {
                vec![("original".to_string(), text.clone())]
            } else {
                report
                    .translations
                    .iter()
                    .map(|(lang, stage)| (lang.clone(), stage.output.clone()))
                    .collect()
            };
            let total = texts.len().max(1);

            for (i, (lang, stage_text)) in texts.iter().enumerate() {
                self.emit(
                    Stage::Tts,
                    (i * 100 / total) as u8,
                    format!("synthesizing {}", lang),
                );
                let started = Instant::now();
                let request = SynthesisRequest {
                    text: stage_text.clone(),
                    ref_audio: job.ref_audio.clone(),
                    ref_text: job.ref_text.clone(),
                    out_path: paths.tts(lang),
                };
                match self.synthesizer.synthesize(&request) {
                    Ok(path) => {
                        let elapsed = started.elapsed();
                        self.emit(
                            Stage::Tts,
                            ((i + 1) * 100 / total) as u8,
                            format!("{} done in {}", lang, secfmt(elapsed)),
                        );
                        report.tts.insert(lang.clone(), TtsReport { path, elapsed });
                    }
                    Err(e) => {
                        // A placeholder file exists; the rest of the fan-out
                        // should still run.
                        warn!("synthesis for {} failed: {}", lang, e);
                        self.state.update_stage(
                            "tts",
                            StageStatus::Failed,
                            Some(e.to_string()),
                        )?;
                    }
                }
            }
        }

        info!("pipeline run complete: {}", report.project_dir.display());
        Ok(report)
    }

    fn emit(&self, stage: Stage, percent: u8, message: impl Into<String>) {
        self.sink.emit(StageEvent::new(stage, percent, message));
    }
}

fn stage_report(result: StabilizationResult, file: PathBuf) -> StageReport {
    StageReport {
        timed_out: result.outcome == Outcome::TimedOut,
        output: result.final_text,
        elapsed: result.elapsed,
        file: Some(file),
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
