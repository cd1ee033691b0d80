//! The composition engine: one job in, one output file out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempDir;

use reelforge_capability::{CapabilityProfile, EncoderParameters};
use reelforge_common::config::AppConfig;
use reelforge_job_model::{load_caption_track, Job, Theme};

use crate::backend::{FfmpegBackend, MediaBackend, ProgressCallback};
use crate::error::{RenderError, RenderResult};
use crate::music::choose_background_music;
use crate::timeline::{
    plan_call_to_action, plan_captions, plan_intro, BackgroundTrack, Frame, MusicBed,
    NarrationTrack, TimelinePlan, TrackFit,
};

/// Engine settings taken from [`AppConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub frame: Frame,
    pub audio_codec: String,
    pub music_dir: PathBuf,
    /// Parent of the per-render scratch directories.
    pub temp_dir: PathBuf,
    pub intro_secs: f64,
    pub intro_text: String,
    pub outro_max_secs: f64,
    pub outro_fraction: f64,
    pub outro_text: String,
    pub music_volume: f64,
    pub fallback_encoder: String,
    pub fallback_preset: String,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            frame: Frame {
                width: config.output.width,
                height: config.output.height,
                fps: config.output.fps,
            },
            audio_codec: config.output.audio_codec.clone(),
            music_dir: config.resources.music_dir.clone(),
            temp_dir: config.resources.temp_dir.clone(),
            intro_secs: config.composition.intro_secs,
            intro_text: config.composition.intro_text.clone(),
            outro_max_secs: config.composition.outro_max_secs,
            outro_fraction: config.composition.outro_fraction,
            outro_text: config.composition.outro_text.clone(),
            music_volume: config.composition.music_volume,
            fallback_encoder: config.encoding.fallback_encoder.clone(),
            fallback_preset: config.encoding.fallback_preset.clone(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Renders jobs against a shared, read-only capability profile.
///
/// Holds no per-job state, so one engine may serve many concurrent renders.
pub struct CompositionEngine<B = FfmpegBackend> {
    profile: Arc<CapabilityProfile>,
    settings: EngineSettings,
    backend: B,
}

impl CompositionEngine<FfmpegBackend> {
    pub fn new(profile: Arc<CapabilityProfile>, settings: EngineSettings) -> Self {
        Self::with_backend(profile, settings, FfmpegBackend::new())
    }
}

impl<B: MediaBackend> CompositionEngine<B> {
    pub fn with_backend(
        profile: Arc<CapabilityProfile>,
        settings: EngineSettings,
        backend: B,
    ) -> Self {
        Self {
            profile,
            settings,
            backend,
        }
    }

    pub fn profile(&self) -> &CapabilityProfile {
        &self.profile
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Render one job and return the output path.
    pub fn render(&self, job: &Job) -> RenderResult<PathBuf> {
        self.render_with_progress(job, None)
    }

    /// Render one job, reporting write progress.
    ///
    /// When the full composition fails for any reason the engine renders a
    /// simplified video (background fitted to narration, nothing else). Only
    /// when that also fails is an error returned.
    pub fn render_with_progress(
        &self,
        job: &Job,
        progress: Option<&ProgressCallback>,
    ) -> RenderResult<PathBuf> {
        let started = Instant::now();
        tracing::info!(job_id = %job.job_id, theme = %job.theme, "Render started");

        let composition = match self.compose(job, progress) {
            Ok(()) => {
                tracing::info!(
                    job_id = %job.job_id,
                    output = %job.output_file.display(),
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Render finished"
                );
                return Ok(job.output_file.clone());
            }
            Err(err) => err,
        };

        tracing::warn!(
            job_id = %job.job_id,
            error = %composition,
            "Full composition failed, rendering simplified video"
        );

        match self.render_simplified(job, progress) {
            Ok(()) => {
                tracing::info!(
                    job_id = %job.job_id,
                    output = %job.output_file.display(),
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Simplified render finished"
                );
                Ok(job.output_file.clone())
            }
            Err(simplified) => {
                tracing::error!(
                    job_id = %job.job_id,
                    error = %simplified,
                    "Simplified render failed"
                );
                Err(RenderError::Unrecoverable {
                    composition: Box::new(composition),
                    simplified: Box::new(simplified),
                })
            }
        }
    }

    fn compose(&self, job: &Job, progress: Option<&ProgressCallback>) -> RenderResult<()> {
        let scratch = self.scratch_dir()?;
        let plan = self.plan(job, scratch.path())?;
        self.write_with_fallback(&plan, progress)
    }

    fn render_simplified(
        &self,
        job: &Job,
        progress: Option<&ProgressCallback>,
    ) -> RenderResult<()> {
        let plan = self.simplified_plan(job)?;
        self.write_with_fallback(&plan, progress)
    }

    /// Build the full timeline for a job. Overlay text files go into `scratch`.
    pub fn plan(&self, job: &Job, scratch: &Path) -> RenderResult<TimelinePlan> {
        let narration = self.load_narration(&job.audio_file)?;
        let main_secs = narration.duration_secs;
        let background = self.load_background(&job.background_video, main_secs)?;

        let theme = match Theme::find(&job.theme) {
            Some(theme) => theme,
            None => {
                tracing::warn!(theme = %job.theme, "Unknown theme, using default");
                Theme::default()
            }
        };

        let entries = load_caption_track(&job.captions_file)?;
        let captions = plan_captions(&entries, &theme, self.settings.frame, main_secs, scratch)?;

        let music = if job.add_music {
            self.load_music()
        } else {
            None
        };

        let intro = if job.add_intro {
            plan_intro(
                &theme,
                self.settings.intro_secs,
                &self.settings.intro_text,
                scratch,
            )?
        } else {
            None
        };

        let call_to_action = if job.add_outro {
            plan_call_to_action(
                &theme,
                main_secs,
                self.settings.outro_max_secs,
                self.settings.outro_fraction,
                &self.settings.outro_text,
                scratch,
            )?
        } else {
            None
        };

        Ok(TimelinePlan {
            frame: self.settings.frame,
            background,
            narration,
            effect: theme.effect,
            captions,
            intro,
            call_to_action,
            music,
            output: job.output_file.clone(),
        })
    }

    /// Background fitted to narration with no overlays or mixing.
    pub fn simplified_plan(&self, job: &Job) -> RenderResult<TimelinePlan> {
        let narration = self.load_narration(&job.audio_file)?;
        let background = self.load_background(&job.background_video, narration.duration_secs)?;
        Ok(TimelinePlan::simplified(
            self.settings.frame,
            background,
            narration,
            &job.output_file,
        ))
    }

    /// Write with the profile's encoder, then retry exactly once with the
    /// software fallback if that fails.
    pub fn write_with_fallback(
        &self,
        plan: &TimelinePlan,
        progress: Option<&ProgressCallback>,
    ) -> RenderResult<()> {
        let mut primary = self.profile.encoder_parameters();
        primary.audio_codec = self.settings.audio_codec.clone();

        let primary_err = match self.backend.write(plan, &primary, progress) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        let mut fallback = EncoderParameters::software_fallback(
            &self.settings.fallback_encoder,
            &self.settings.fallback_preset,
            self.profile.cpu_thread_budget,
        );
        fallback.audio_codec = self.settings.audio_codec.clone();

        tracing::warn!(
            encoder = %primary.codec,
            fallback = %fallback.codec,
            error = %primary_err,
            "Primary encoder failed, retrying once"
        );

        self.backend
            .write(plan, &fallback, progress)
            .map_err(|fallback_err| RenderError::EncoderFallback {
                primary: Box::new(primary_err),
                fallback: Box::new(fallback_err),
            })
    }

    fn load_narration(&self, path: &Path) -> RenderResult<NarrationTrack> {
        let duration_secs = self.backend.probe_duration(path)?;
        Ok(NarrationTrack {
            path: path.to_path_buf(),
            duration_secs,
        })
    }

    /// A random, probeable track from the music library. Anything else means
    /// the render goes ahead without music.
    fn load_music(&self) -> Option<MusicBed> {
        let path = choose_background_music(&self.settings.music_dir)?;
        match self.backend.probe_duration(&path) {
            Ok(duration_secs) => {
                tracing::debug!(
                    track = %path.display(),
                    duration_secs,
                    "Background music loaded"
                );
                Some(MusicBed {
                    path,
                    volume: self.settings.music_volume,
                })
            }
            Err(err) => {
                tracing::debug!(
                    track = %path.display(),
                    error = %err,
                    "Skipping unreadable background music"
                );
                None
            }
        }
    }

    fn load_background(&self, path: &Path, target_secs: f64) -> RenderResult<BackgroundTrack> {
        let source_secs = self.backend.probe_duration(path)?;
        if source_secs < self.settings.frame.duration_secs() {
            return Err(RenderError::asset(
                path,
                format!("background is shorter than one frame ({source_secs:.3}s)"),
            ));
        }

        let fit = TrackFit::reconcile(source_secs, target_secs);
        tracing::debug!(source_secs, target_secs, ?fit, "Background fitted to narration");
        Ok(BackgroundTrack {
            path: path.to_path_buf(),
            source_secs,
            fit,
        })
    }

    fn scratch_dir(&self) -> RenderResult<TempDir> {
        std::fs::create_dir_all(&self.settings.temp_dir)?;
        Ok(tempfile::Builder::new()
            .prefix("render-")
            .tempdir_in(&self.settings.temp_dir)?)
    }
}
