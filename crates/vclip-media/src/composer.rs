//! URL validation and FFmpeg filter-graph / argv synthesis.

use std::path::{Path, PathBuf};

use vclip_models::{Element, Quality, TimingSegment, VideoProject};

use crate::error::{MediaError, MediaResult};

const MAX_URL_LEN: usize = 2048;
const DENYLISTED_CHARS: &[char] = &[';', '&', '|', '`', '$', '(', ')', '{', '}', '<', '>', '\n', '\r', '\0'];

/// Rejects anything that isn't a plain `http(s)` URL, has no shell-relevant
/// metacharacters, and doesn't attempt path traversal. The composer never shells
/// out through a shell (argv is passed directly to `tokio::process::Command`), but
/// a hostile URL could still smuggle additional FFmpeg options or protocol
/// handlers (`file://`, `concat:`, `subfile,...`) if it weren't checked here.
pub fn validate_url(url: &str, allowed_domains: Option<&[String]>) -> MediaResult<()> {
    if url.len() > MAX_URL_LEN {
        return Err(MediaError::url_rejected("url exceeds maximum length"));
    }

    if url.contains("$(") {
        return Err(MediaError::url_rejected("url contains command substitution syntax"));
    }

    if let Some(c) = url.chars().find(|c| DENYLISTED_CHARS.contains(c)) {
        return Err(MediaError::url_rejected(format!("url contains disallowed character '{c}'")));
    }

    let lower = url.to_lowercase();
    for token in ["..", "%2e%2e", "%252e"] {
        if lower.contains(token) {
            return Err(MediaError::url_rejected("url contains a path-traversal token"));
        }
    }

    let parsed = url::Url::parse(url).map_err(|e| MediaError::url_rejected(format!("not a valid url: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(MediaError::url_rejected(format!("scheme '{other}' is not allowed"))),
    }

    if let Some(allowed) = allowed_domains {
        if !allowed.is_empty() {
            // Exact host match only: the allowlist does not imply wildcard
            // subdomain matching. `example.com` does not admit `evil.example.com`.
            let host = parsed.host_str().unwrap_or("");
            if !allowed.iter().any(|d| host == d) {
                return Err(MediaError::url_rejected(format!("host '{host}' is not in the allowlist")));
            }
        }
    }

    Ok(())
}

/// The fully assembled FFmpeg invocation, ready to hand to [`crate::runner::FfmpegRunner`].
#[derive(Debug, Clone)]
pub struct ComposedCommand {
    pub argv: Vec<String>,
    pub output_path: PathBuf,
}

/// Encoding settings resolved from configuration, independent of the project itself.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    pub quality: Quality,
    pub preset: String,
    /// Silence appended to the concatenated audio track to prevent tail
    /// truncation; magic-2-seconds in the source, made configurable here.
    pub audio_pad_seconds: f64,
}

impl EncodeSettings {
    fn crf(&self) -> u8 {
        match self.quality {
            Quality::Low => 28,
            Quality::Medium => 23,
            Quality::High => 18,
        }
    }
}

/// Validate every URL a project references — background video, each scene's
/// audio, and every image overlay — before any of them reaches a subprocess
/// argv. Callers should run this ahead of probing as well as composing: a
/// rejected URL must stop the pipeline before even FFprobe is invoked.
pub fn validate_project_urls(project: &VideoProject, allowed_domains: Option<&[String]>) -> MediaResult<()> {
    if let Some(Element::Video { src }) = project.background_video() {
        validate_url(src, allowed_domains)?;
    }
    for scene in &project.scenes {
        for element in &scene.elements {
            match element {
                Element::Audio { src } | Element::Image { src, .. } => validate_url(src, allowed_domains)?,
                Element::Video { .. } | Element::Subtitles { .. } => {}
            }
        }
    }
    Ok(())
}

/// Build the argv for composing `project` into `output_path`, given the resolved
/// per-scene timing (from [`vclip_subtitles::timing::build_timeline`]) and an
/// optional pre-rendered ASS subtitle file. Assumes [`validate_project_urls`] has
/// already been called (re-validates anyway, since this is the security-critical
/// boundary and must not trust its caller).
pub fn compose(
    project: &VideoProject,
    timeline: &[TimingSegment],
    total_duration: f64,
    ass_path: Option<&Path>,
    output_path: &Path,
    settings: &EncodeSettings,
    allowed_domains: Option<&[String]>,
    background_video_duration: Option<f64>,
) -> MediaResult<ComposedCommand> {
    let width = project.width.unwrap_or(1080);
    let height = project.height.unwrap_or(1920);

    validate_project_urls(project, allowed_domains)?;
    for segment in timeline {
        validate_url(&segment.audio_url, allowed_domains)?;
    }
    let scene_images = collect_scene_images(project);

    let mut argv: Vec<String> = vec!["-y".to_string(), "-v".to_string(), "error".to_string()];

    // Input 0: background video, looped just enough to cover the composed
    // duration, or a generated color source when no background was supplied.
    match project.background_video() {
        Some(Element::Video { src }) => {
            let loops = background_loop_count(total_duration, background_video_duration);
            argv.extend(["-stream_loop".to_string(), loops.to_string()]);
            argv.extend(["-i".to_string(), src.clone()]);
        }
        _ => {
            argv.extend([
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!("color=c=black:s={width}x{height}:d={total_duration:.3}"),
            ]);
        }
    }

    // Inputs 1..=N: one per scene's audio track, in scene order.
    for segment in timeline {
        argv.extend(["-i".to_string(), segment.audio_url.clone()]);
    }

    // Remaining inputs: scene image overlays, in the same scene/z-index order
    // used to build the filter graph below.
    for image in &scene_images {
        argv.extend(["-i".to_string(), image.src.to_string()]);
    }

    let filter_complex = build_filter_graph(
        timeline,
        width,
        height,
        ass_path,
        &scene_images,
        settings.audio_pad_seconds,
    );
    argv.extend(["-filter_complex".to_string(), filter_complex]);
    argv.extend(["-map".to_string(), "[vout]".to_string()]);
    argv.extend(["-map".to_string(), "[aout]".to_string()]);
    argv.extend([
        "-t".to_string(),
        format!("{total_duration:.3}"),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-crf".to_string(),
        settings.crf().to_string(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
    ]);
    argv.push(output_path.to_string_lossy().to_string());

    Ok(ComposedCommand {
        argv,
        output_path: output_path.to_path_buf(),
    })
}

/// FFmpeg's `-stream_loop N` plays the input `N + 1` times total. Given the
/// background video's own probed duration, pick the smallest `N` whose total
/// playtime covers `total_duration` (the trailing `-t` still truncates any
/// overrun). Falls back to looping indefinitely when the duration couldn't be
/// probed, so a probe failure degrades to the old always-safe behavior rather
/// than under-covering the render.
fn background_loop_count(total_duration: f64, background_video_duration: Option<f64>) -> i64 {
    match background_video_duration {
        Some(d) if d > 0.0 => ((total_duration / d).ceil() as i64 - 1).max(0),
        _ => -1,
    }
}

/// One scene's image overlay, resolved to the input index FFmpeg will assign it.
struct SceneImage<'a> {
    scene_idx: usize,
    src: &'a str,
    x: i32,
    y: i32,
    z_index: i32,
}

/// Every `image` element across all scenes, grouped by scene and ordered within
/// each scene by ascending `z_index` (stable on ties) so overlay chaining and
/// input-index assignment agree on a single unambiguous stacking order.
fn collect_scene_images(project: &VideoProject) -> Vec<SceneImage<'_>> {
    let mut images = Vec::new();
    for (scene_idx, scene) in project.scenes.iter().enumerate() {
        let mut scene_images: Vec<SceneImage> = scene
            .elements
            .iter()
            .filter_map(|e| match e {
                Element::Image { src, x, y, z_index } => Some(SceneImage {
                    scene_idx,
                    src: src.as_str(),
                    x: *x,
                    y: *y,
                    z_index: *z_index,
                }),
                _ => None,
            })
            .collect();
        scene_images.sort_by_key(|img| img.z_index);
        images.extend(scene_images);
    }
    images
}

fn build_filter_graph(
    timeline: &[TimingSegment],
    width: u32,
    height: u32,
    ass_path: Option<&Path>,
    scene_images: &[SceneImage<'_>],
    audio_pad_seconds: f64,
) -> String {
    let mut parts = Vec::new();

    parts.push(format!("[0:v]scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height}[bg]"));

    // Overlay each image at its declared pixel position, enabled only during its
    // scene's timeline window. Images share a scene stack in z-index order
    // (lowest first), each consuming the previous overlay's output.
    let mut last_label = "bg".to_string();
    let first_image_input_idx = timeline.len() + 1; // inputs: 0=bg, 1..=N audio, then images
    for (i, image) in scene_images.iter().enumerate() {
        let input_idx = first_image_input_idx + i;
        let segment = &timeline[image.scene_idx];
        let out_label = format!("v{i}");
        parts.push(format!(
            "[{last_label}][{input_idx}:v]overlay=x={}:y={}:enable='between(t,{:.3},{:.3})'[{out_label}]",
            image.x, image.y, segment.start_seconds, segment.end_seconds
        ));
        last_label = out_label;
    }

    if let Some(path) = ass_path {
        parts.push(format!(
            "[{last_label}]ass={}[vout]",
            escape_filter_path(path)
        ));
    } else {
        parts.push(format!("[{last_label}]copy[vout]"));
    }

    // Concatenate each scene's audio in scene order (scene windows already cover
    // each track's full real duration, so concatenation alone reproduces the
    // timeline built by the subtitle timing engine), then pad the tail with
    // silence so the final seconds aren't abruptly cut off.
    let concat_inputs: String = (0..timeline.len()).map(|i| format!("[{}:a]", i + 1)).collect();
    parts.push(format!(
        "{concat_inputs}concat=n={}:v=0:a=1[concat_audio]",
        timeline.len().max(1)
    ));
    parts.push(format!("[concat_audio]apad=pad_dur={audio_pad_seconds:.3}[aout]"));

    parts.join(";")
}

fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\").replace(':', "\\:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_https_url() {
        assert!(validate_url("https://cdn.example.com/audio.mp3", None).is_ok());
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(validate_url("file:///etc/passwd", None).is_err());
    }

    #[test]
    fn rejects_command_injection_characters() {
        assert!(validate_url("https://example.com/a.mp3; rm -rf /", None).is_err());
        assert!(validate_url("https://example.com/$(whoami)", None).is_err());
        assert!(validate_url("https://example.com/`id`", None).is_err());
    }

    #[test]
    fn rejects_path_traversal_tokens() {
        assert!(validate_url("https://example.com/../../etc/passwd", None).is_err());
        assert!(validate_url("https://example.com/%2e%2e/secret", None).is_err());
    }

    #[test]
    fn enforces_domain_allowlist_without_subdomain_wildcarding() {
        let allowed = vec!["example.com".to_string()];
        assert!(validate_url("https://example.com/a.mp3", Some(&allowed)).is_ok());
        assert!(validate_url("https://cdn.example.com/a.mp3", Some(&allowed)).is_err());
        assert!(validate_url("https://evil.com/a.mp3", Some(&allowed)).is_err());
    }

    #[test]
    fn rejects_oversized_url() {
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LEN));
        assert!(validate_url(&long, None).is_err());
    }

    fn settings() -> EncodeSettings {
        EncodeSettings {
            quality: Quality::Medium,
            preset: "medium".to_string(),
            audio_pad_seconds: 2.0,
        }
    }

    fn audio_scene(src: &str) -> vclip_models::Scene {
        vclip_models::Scene {
            elements: vec![Element::Audio { src: src.to_string() }],
        }
    }

    #[test]
    fn validate_project_urls_rejects_injection_attempt_in_scene_audio() {
        let project = VideoProject {
            width: None,
            height: None,
            quality: None,
            elements: Vec::new(),
            scenes: vec![audio_scene("http://x.com/a.mp3; rm -rf /")],
        };
        let err = validate_project_urls(&project, None).unwrap_err();
        assert!(matches!(err, MediaError::UrlRejected(_)));
    }

    #[test]
    fn compose_rejects_malicious_scene_audio_before_spawning_anything() {
        let project = VideoProject {
            width: None,
            height: None,
            quality: None,
            elements: Vec::new(),
            scenes: vec![audio_scene("https://x.com/a.mp3; rm -rf /")],
        };
        let timeline = vec![TimingSegment {
            start_seconds: 0.0,
            end_seconds: 5.0,
            audio_url: "https://x.com/a.mp3; rm -rf /".to_string(),
        }];
        let err = compose(
            &project,
            &timeline,
            5.0,
            None,
            Path::new("/tmp/out.mp4"),
            &settings(),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, MediaError::UrlRejected(_)));
    }

    #[test]
    fn compose_positions_image_overlays_and_gates_them_to_their_scene_window() {
        let mut scene = audio_scene("https://x.com/a.mp3");
        scene.elements.push(Element::Image {
            src: "https://x.com/logo.png".to_string(),
            x: 10,
            y: 20,
            z_index: 0,
        });
        let project = VideoProject {
            width: Some(1080),
            height: Some(1920),
            quality: None,
            elements: Vec::new(),
            scenes: vec![scene],
        };
        let timeline = vec![TimingSegment {
            start_seconds: 0.0,
            end_seconds: 5.0,
            audio_url: "https://x.com/a.mp3".to_string(),
        }];
        let composed = compose(
            &project,
            &timeline,
            5.0,
            None,
            Path::new("/tmp/out.mp4"),
            &settings(),
            None,
            None,
        )
        .unwrap();

        let filter_idx = composed.argv.iter().position(|a| a == "-filter_complex").unwrap();
        let filter = &composed.argv[filter_idx + 1];
        assert!(filter.contains("overlay=x=10:y=20:enable='between(t,0.000,5.000)'"));
        // Background, scene audio, then the image: three `-i` inputs.
        assert_eq!(composed.argv.iter().filter(|a| *a == "-i").count(), 3);
    }

    #[test]
    fn compose_concatenates_audio_and_pads_the_tail() {
        let project = VideoProject {
            width: None,
            height: None,
            quality: None,
            elements: Vec::new(),
            scenes: vec![audio_scene("https://x.com/a.mp3"), audio_scene("https://x.com/b.mp3")],
        };
        let timeline = vec![
            TimingSegment {
                start_seconds: 0.0,
                end_seconds: 3.0,
                audio_url: "https://x.com/a.mp3".to_string(),
            },
            TimingSegment {
                start_seconds: 3.0,
                end_seconds: 7.0,
                audio_url: "https://x.com/b.mp3".to_string(),
            },
        ];
        let composed = compose(
            &project,
            &timeline,
            7.0,
            None,
            Path::new("/tmp/out.mp4"),
            &settings(),
            None,
            None,
        )
        .unwrap();
        let filter_idx = composed.argv.iter().position(|a| a == "-filter_complex").unwrap();
        let filter = &composed.argv[filter_idx + 1];
        assert!(filter.contains("[1:a][2:a]concat=n=2:v=0:a=1[concat_audio]"));
        assert!(filter.contains("apad=pad_dur=2.000[aout]"));
    }

    #[test]
    fn compose_emits_web_streamable_output_flags() {
        let project = VideoProject {
            width: None,
            height: None,
            quality: None,
            elements: Vec::new(),
            scenes: vec![audio_scene("https://x.com/a.mp3")],
        };
        let timeline = vec![TimingSegment {
            start_seconds: 0.0,
            end_seconds: 5.0,
            audio_url: "https://x.com/a.mp3".to_string(),
        }];
        let composed = compose(
            &project,
            &timeline,
            5.0,
            None,
            Path::new("/tmp/out.mp4"),
            &settings(),
            None,
            None,
        )
        .unwrap();
        let pix_fmt_idx = composed.argv.iter().position(|a| a == "-pix_fmt").unwrap();
        assert_eq!(composed.argv[pix_fmt_idx + 1], "yuv420p");
        let movflags_idx = composed.argv.iter().position(|a| a == "-movflags").unwrap();
        assert_eq!(composed.argv[movflags_idx + 1], "+faststart");
    }

    #[test]
    fn background_loop_count_covers_total_duration_without_overshooting_by_a_whole_extra_play() {
        // 7.5s of background video needed, backed by a 3s source: two full
        // loops (6s) don't cover it, so a third play is required -> -stream_loop 2.
        assert_eq!(background_loop_count(7.5, Some(3.0)), 2);
        // Exact multiple: 6s of video covers 6s of output with no extra loop.
        assert_eq!(background_loop_count(6.0, Some(3.0)), 1);
        assert_eq!(background_loop_count(2.0, Some(10.0)), 0);
        assert_eq!(background_loop_count(10.0, None), -1);
    }

    #[test]
    fn compose_loops_background_video_just_enough_to_cover_the_timeline() {
        let project = VideoProject {
            width: None,
            height: None,
            quality: None,
            elements: vec![Element::Video {
                src: "https://x.com/bg.mp4".to_string(),
            }],
            scenes: vec![audio_scene("https://x.com/a.mp3")],
        };
        let timeline = vec![TimingSegment {
            start_seconds: 0.0,
            end_seconds: 7.5,
            audio_url: "https://x.com/a.mp3".to_string(),
        }];
        let composed = compose(
            &project,
            &timeline,
            7.5,
            None,
            Path::new("/tmp/out.mp4"),
            &settings(),
            None,
            Some(3.0),
        )
        .unwrap();
        let loop_idx = composed.argv.iter().position(|a| a == "-stream_loop").unwrap();
        assert_eq!(composed.argv[loop_idx + 1], "2");
    }
}
