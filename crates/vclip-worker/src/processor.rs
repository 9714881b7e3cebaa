//! Per-job render pipeline: probe -> transcribe -> subtitles -> compose -> render.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use vclip_media::{compose, probe_audio, probe_video_duration, validate_project_urls, EncodeSettings, FfmpegRunner};
use vclip_models::{Element, JobId, SubtitleSettings, VideoId};
use vclip_queue::JobRegistry;
use vclip_subtitles::{build_scene_events, build_timeline, render_document, write_ass_file};
use vclip_transcribe::SidecarManager;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Wires the registry, FFmpeg composer/runner, and transcription sidecar
/// together to drive one job from `pending` through to `completed`/`failed`.
pub struct Orchestrator {
    config: WorkerConfig,
    registry: Arc<JobRegistry>,
    sidecar: Arc<SidecarManager>,
}

impl Orchestrator {
    pub fn new(config: WorkerConfig, registry: Arc<JobRegistry>, sidecar: Arc<SidecarManager>) -> Self {
        Self {
            config,
            registry,
            sidecar,
        }
    }

    pub async fn process(&self, job_id: JobId) -> WorkerResult<()> {
        let logger = JobLogger::new(&job_id, "render");
        self.registry.mark_status(&job_id, vclip_models::JobStatus::Processing).await?;

        let job = self.registry.get(&job_id).await?;
        vclip_models::validate_project(&job.config)?;
        // Reject malicious URLs before any subprocess — including FFprobe — is
        // spawned, not just before the final FFmpeg render.
        validate_project_urls(&job.config, self.config.security_allowed_domains.as_deref())?;

        let work_dir = PathBuf::from(&self.config.storage_temp_dir).join(job_id.as_str());
        tokio::fs::create_dir_all(&work_dir).await?;
        let cleanup_guard = WorkDirGuard(work_dir.clone());

        // Probing inherits the job's own cancellation signal: a `cancel(id)` that
        // lands while FFprobe is still running on a scene's audio (or the
        // background video) must be able to kill it, not just the final render.
        let cancel_rx = self.registry.cancel_receiver(&job_id).await;
        let probe_timeout = Some(self.config.ffmpeg_probe_timeout);

        logger.log_progress("probing scene audio");
        let mut scene_audio = Vec::with_capacity(job.config.scenes.len());
        for scene in &job.config.scenes {
            let Some(Element::Audio { src }) = scene.audio() else {
                return Err(WorkerError::job_failed("scene missing audio element after validation"));
            };
            let info = probe_audio(src, cancel_rx.clone(), probe_timeout).await?;
            scene_audio.push((src.clone(), info.duration));
        }
        self.registry.update(&job_id, |j| j.set_progress(20)).await?;

        let background_video_duration = match job.config.background_video() {
            Some(Element::Video { src }) => {
                Some(probe_video_duration(src, cancel_rx.clone(), probe_timeout).await?)
            }
            _ => None,
        };

        let (timeline, total_duration) = build_timeline(&scene_audio, 0.0);

        let subtitle_settings = job.config.subtitle_settings().cloned();
        let ass_path = if self.config.subtitles_enabled {
            if let Some(settings) = &subtitle_settings {
                Some(
                    self.build_subtitles(&job_id, &job.config, &timeline, settings, &work_dir)
                        .await?,
                )
            } else {
                None
            }
        } else {
            None
        };
        self.registry.update(&job_id, |j| j.set_progress(40)).await?;

        let output_path = PathBuf::from(&self.config.storage_output_dir)
            .join(format!("{}.mp4", job_id.as_str()));
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let settings = EncodeSettings {
            quality: job.config.quality.unwrap_or(self.config.ffmpeg_quality),
            preset: self.config.ffmpeg_preset.clone(),
            audio_pad_seconds: self.config.ffmpeg_audio_pad_seconds,
        };
        let composed = compose(
            &job.config,
            &timeline,
            total_duration,
            ass_path.as_deref(),
            &output_path,
            &settings,
            self.config.security_allowed_domains.as_deref(),
            background_video_duration,
        )?;
        self.registry.update(&job_id, |j| j.set_progress(50)).await?;

        logger.log_progress("rendering with ffmpeg");
        let mut runner = FfmpegRunner::new().with_timeout(self.config.ffmpeg_timeout.as_secs());
        if let Some(rx) = cancel_rx {
            runner = runner.with_cancel(rx);
        }

        let registry = Arc::clone(&self.registry);
        let progress_job_id = job_id.clone();
        let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<f64>();
        let progress_task = tokio::spawn(async move {
            while let Some(pct) = progress_rx.recv().await {
                let progress = (50.0 + 0.5 * pct).min(99.0) as u8;
                let _ = registry.update(&progress_job_id, |j| j.set_progress(progress)).await;
            }
        });

        let run_result = runner
            .run_with_progress(&composed, move |p| {
                let _ = progress_tx.send(p.percentage(total_duration));
            })
            .await;
        progress_task.abort();

        if let Err(e) = run_result {
            // FFmpeg can leave a partial/corrupt file behind when killed
            // mid-render; a cancelled or failed job must leave no output artifact.
            let _ = tokio::fs::remove_file(&output_path).await;
            return Err(e.into());
        }

        let video_id = VideoId::new();
        self.registry
            .update(&job_id, |j| j.complete(video_id.clone()))
            .await?;

        drop(cleanup_guard);
        info!(%job_id, "job completed");
        Ok(())
    }

    async fn build_subtitles(
        &self,
        job_id: &JobId,
        project: &vclip_models::VideoProject,
        timeline: &[vclip_models::TimingSegment],
        settings: &SubtitleSettings,
        work_dir: &std::path::Path,
    ) -> WorkerResult<PathBuf> {
        vclip_subtitles::validate_subtitle_settings(settings)?;

        let mut all_events = Vec::new();
        for (scene, segment) in project.scenes.iter().zip(timeline.iter()) {
            let Some(Element::Audio { src }) = scene.audio() else {
                continue;
            };
            let transcript = match self.sidecar.transcribe(src).await {
                Ok(t) => t,
                Err(e) => {
                    warn!(%job_id, error = %e, "transcription failed for scene, continuing without subtitles for it");
                    vclip_models::TranscriptionResult::empty()
                }
            };
            all_events.extend(build_scene_events(segment, &transcript, settings.style));
        }

        let width = project.width.unwrap_or(1080);
        let height = project.height.unwrap_or(1920);
        let document = render_document(settings, width, height, &all_events);

        let ass_path = work_dir.join("subtitles.ass");
        write_ass_file(&ass_path, &document).await?;
        Ok(ass_path)
    }
}

/// Removes the job's temp work directory once dropped, regardless of which exit
/// path the pipeline took.
struct WorkDirGuard(PathBuf);

impl Drop for WorkDirGuard {
    fn drop(&mut self) {
        let path = self.0.clone();
        tokio::spawn(async move {
            let _ = tokio::fs::remove_dir_all(&path).await;
        });
    }
}
