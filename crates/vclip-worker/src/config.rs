//! Worker configuration.

use std::time::Duration;

use vclip_models::{Quality, SubtitlePosition, SubtitleStyle};

/// Runtime configuration for the worker pool, FFmpeg composer, transcription
/// sidecar, and default subtitle rendering settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub job_workers: usize,
    pub job_queue_size: usize,
    pub job_timeout: Duration,

    pub ffmpeg_binary_path: String,
    pub ffmpeg_timeout: Duration,
    pub ffmpeg_probe_timeout: Duration,
    pub ffmpeg_quality: Quality,
    pub ffmpeg_preset: String,
    pub ffmpeg_audio_pad_seconds: f64,

    pub transcription_binary_path: String,
    pub transcription_idle_timeout: Duration,
    pub transcription_startup_timeout: Duration,
    pub transcription_restart_max_attempts: u32,
    pub transcription_request_timeout: Duration,

    pub subtitles_enabled: bool,
    pub subtitles_style: SubtitleStyle,
    pub subtitles_font_family: String,
    pub subtitles_font_size: u32,
    pub subtitles_position: SubtitlePosition,
    pub subtitles_color_word: String,
    pub subtitles_color_outline: String,

    pub storage_output_dir: String,
    pub storage_temp_dir: String,

    /// Optional domain allowlist for source URLs. `None`/empty means unrestricted.
    pub security_allowed_domains: Option<Vec<String>>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            job_workers: 4,
            job_queue_size: 64,
            job_timeout: Duration::from_secs(30 * 60),

            ffmpeg_binary_path: "ffmpeg".to_string(),
            ffmpeg_timeout: Duration::from_secs(20 * 60),
            ffmpeg_probe_timeout: Duration::from_secs(30),
            ffmpeg_quality: Quality::Medium,
            ffmpeg_preset: "medium".to_string(),
            ffmpeg_audio_pad_seconds: 2.0,

            transcription_binary_path: "whisper-sidecar".to_string(),
            transcription_idle_timeout: Duration::from_secs(5 * 60),
            transcription_startup_timeout: Duration::from_secs(30),
            transcription_restart_max_attempts: 3,
            transcription_request_timeout: Duration::from_secs(2 * 60),

            subtitles_enabled: true,
            subtitles_style: SubtitleStyle::Progressive,
            subtitles_font_family: "Arial".to_string(),
            subtitles_font_size: 48,
            subtitles_position: SubtitlePosition::Center,
            subtitles_color_word: "#FFFFFF".to_string(),
            subtitles_color_outline: "#000000".to_string(),

            storage_output_dir: "/tmp/vclip/output".to_string(),
            storage_temp_dir: "/tmp/vclip/work".to_string(),

            security_allowed_domains: None,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_secs(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(env_or(key, default_secs))
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_quality(key: &str, default: Quality) -> Quality {
    match std::env::var(key).ok().as_deref() {
        Some("low") => Quality::Low,
        Some("medium") => Quality::Medium,
        Some("high") => Quality::High,
        _ => default,
    }
}

fn env_subtitle_style(key: &str, default: SubtitleStyle) -> SubtitleStyle {
    match std::env::var(key).ok().as_deref() {
        Some("progressive") => SubtitleStyle::Progressive,
        Some("classic") => SubtitleStyle::Classic,
        _ => default,
    }
}

fn env_subtitle_position(key: &str, default: SubtitlePosition) -> SubtitlePosition {
    match std::env::var(key).ok().as_deref() {
        Some("top") => SubtitlePosition::Top,
        Some("center") => SubtitlePosition::Center,
        Some("bottom") => SubtitlePosition::Bottom,
        _ => default,
    }
}

impl WorkerConfig {
    /// Build configuration from `VCLIP_*` environment variables, falling back to
    /// [`Default`] for anything unset or unparsable. Call after
    /// `dotenvy::dotenv().ok()` so a local `.env` file is picked up first.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            job_workers: env_or("VCLIP_JOB_WORKERS", defaults.job_workers),
            job_queue_size: env_or("VCLIP_JOB_QUEUE_SIZE", defaults.job_queue_size),
            job_timeout: env_secs("VCLIP_JOB_TIMEOUT_SECS", defaults.job_timeout.as_secs()),

            ffmpeg_binary_path: env_string("VCLIP_FFMPEG_BINARY_PATH", &defaults.ffmpeg_binary_path),
            ffmpeg_timeout: env_secs("VCLIP_FFMPEG_TIMEOUT_SECS", defaults.ffmpeg_timeout.as_secs()),
            ffmpeg_probe_timeout: env_secs(
                "VCLIP_FFMPEG_PROBE_TIMEOUT_SECS",
                defaults.ffmpeg_probe_timeout.as_secs(),
            ),
            ffmpeg_quality: env_quality("VCLIP_FFMPEG_QUALITY", defaults.ffmpeg_quality),
            ffmpeg_preset: env_string("VCLIP_FFMPEG_PRESET", &defaults.ffmpeg_preset),
            ffmpeg_audio_pad_seconds: env_or(
                "VCLIP_FFMPEG_AUDIO_PAD_SECONDS",
                defaults.ffmpeg_audio_pad_seconds,
            ),

            transcription_binary_path: env_string(
                "VCLIP_TRANSCRIPTION_BINARY_PATH",
                &defaults.transcription_binary_path,
            ),
            transcription_idle_timeout: env_secs(
                "VCLIP_TRANSCRIPTION_IDLE_TIMEOUT_SECS",
                defaults.transcription_idle_timeout.as_secs(),
            ),
            transcription_startup_timeout: env_secs(
                "VCLIP_TRANSCRIPTION_STARTUP_TIMEOUT_SECS",
                defaults.transcription_startup_timeout.as_secs(),
            ),
            transcription_restart_max_attempts: env_or(
                "VCLIP_TRANSCRIPTION_RESTART_MAX_ATTEMPTS",
                defaults.transcription_restart_max_attempts,
            ),
            transcription_request_timeout: env_secs(
                "VCLIP_TRANSCRIPTION_REQUEST_TIMEOUT_SECS",
                defaults.transcription_request_timeout.as_secs(),
            ),

            subtitles_enabled: env_or("VCLIP_SUBTITLES_ENABLED", defaults.subtitles_enabled),
            subtitles_style: env_subtitle_style("VCLIP_SUBTITLES_STYLE", defaults.subtitles_style),
            subtitles_font_family: env_string(
                "VCLIP_SUBTITLES_FONT_FAMILY",
                &defaults.subtitles_font_family,
            ),
            subtitles_font_size: env_or("VCLIP_SUBTITLES_FONT_SIZE", defaults.subtitles_font_size),
            subtitles_position: env_subtitle_position(
                "VCLIP_SUBTITLES_POSITION",
                defaults.subtitles_position,
            ),
            subtitles_color_word: env_string(
                "VCLIP_SUBTITLES_COLOR_WORD",
                &defaults.subtitles_color_word,
            ),
            subtitles_color_outline: env_string(
                "VCLIP_SUBTITLES_COLOR_OUTLINE",
                &defaults.subtitles_color_outline,
            ),

            storage_output_dir: env_string("VCLIP_STORAGE_OUTPUT_DIR", &defaults.storage_output_dir),
            storage_temp_dir: env_string("VCLIP_STORAGE_TEMP_DIR", &defaults.storage_temp_dir),

            security_allowed_domains: std::env::var("VCLIP_SECURITY_ALLOWED_DOMAINS")
                .ok()
                .map(|s| s.split(',').map(|d| d.trim().to_string()).filter(|d| !d.is_empty()).collect())
                .filter(|v: &Vec<String>| !v.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = WorkerConfig::default();
        assert!(config.job_workers > 0);
        assert!(config.job_queue_size > 0);
        assert!(config.subtitles_enabled);
    }
}
