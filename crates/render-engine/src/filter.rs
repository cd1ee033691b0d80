//! ffmpeg argument and filter graph construction.
//!
//! Input layout: `0` background video, `1` narration, `2` music (optional).
//! The intro card and its silence are generated inside the graph.

use std::path::Path;

use reelforge_capability::EncoderParameters;
use reelforge_job_model::{CaptionPosition, Effect, ResolvedStyle};

use crate::timeline::{
    CallToAction, CaptionOverlay, Frame, IntroCard, TimelinePlan, CTA_FADE_SECS, INTRO_FONT_SIZE,
};

/// Sample rate every audio branch is normalized to before mixing or concat.
const SAMPLE_RATE: u32 = 44_100;

/// Vertical margin for top and bottom caption placement.
const CAPTION_MARGIN: u32 = 150;

/// Distance of the call-to-action from the bottom edge.
const CTA_MARGIN: u32 = 80;

/// Horizontal margin for left or right aligned captions.
const SIDE_MARGIN: u32 = 50;

/// Scale factor of the zoom effect.
const ZOOM_FACTOR: f64 = 1.03;

/// Full ffmpeg argument list for a plan and an encoder parameter set.
pub fn build_ffmpeg_args(plan: &TimelinePlan, params: &EncoderParameters) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-y", "-nostats", "-progress", "pipe:1"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    args.extend(params.input_args());
    let extra_loops = plan.background.fit.extra_loops();
    if extra_loops > 0 {
        args.push("-stream_loop".to_string());
        args.push(extra_loops.to_string());
    }
    push_input(&mut args, &plan.background.path);
    push_input(&mut args, &plan.narration.path);

    if let Some(music) = &plan.music {
        args.push("-stream_loop".to_string());
        args.push("-1".to_string());
        push_input(&mut args, &music.path);
    }

    args.push("-filter_complex".to_string());
    args.push(build_filter_graph(plan));
    args.extend(
        ["-map", "[vout]", "-map", "[aout]"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push("-r".to_string());
    args.push(plan.frame.fps.to_string());
    args.push("-t".to_string());
    args.push(secs(plan.total_duration_secs()));
    args.extend(params.output_args());
    args.push(plan.output.to_string_lossy().into_owned());
    args
}

fn push_input(args: &mut Vec<String>, path: &Path) {
    args.push("-i".to_string());
    args.push(path.to_string_lossy().into_owned());
}

/// Build the `-filter_complex` graph.
pub fn build_filter_graph(plan: &TimelinePlan) -> String {
    let frame = plan.frame;
    let main_secs = plan.main_duration_secs();
    let (main_v, main_a) = if plan.intro.is_some() {
        ("main_v", "main_a")
    } else {
        ("vout", "aout")
    };

    let mut video = vec![
        format!("trim=duration={}", secs(main_secs)),
        "setpts=PTS-STARTPTS".to_string(),
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
            w = frame.width,
            h = frame.height
        ),
        format!("fps={}", frame.fps),
    ];
    if let Some(effect) = plan.effect {
        video.push(effect_filter(effect, frame, main_secs));
    }
    video.push("setsar=1".to_string());
    video.push("format=yuv420p".to_string());
    video.extend(plan.captions.iter().map(caption_filter));
    if let Some(cta) = &plan.call_to_action {
        video.push(call_to_action_filter(cta));
    }

    let mut chains = vec![format!("[0:v]{}[{main_v}]", video.join(","))];

    let normalize_audio = format!(
        "atrim=duration={},asetpts=PTS-STARTPTS,aformat=sample_rates={SAMPLE_RATE}:channel_layouts=stereo",
        secs(main_secs)
    );
    match &plan.music {
        Some(music) => {
            chains.push(format!("[1:a]{normalize_audio}[voice]"));
            chains.push(format!(
                "[2:a]{normalize_audio},volume={:.3}[music]",
                music.volume
            ));
            chains.push(format!(
                "[voice][music]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[{main_a}]"
            ));
        }
        None => chains.push(format!("[1:a]{normalize_audio}[{main_a}]")),
    }

    if let Some(intro) = &plan.intro {
        chains.push(intro_video_chain(intro, frame));
        chains.push(format!(
            "anullsrc=r={SAMPLE_RATE}:cl=stereo,atrim=duration={}[intro_a]",
            secs(intro.duration_secs)
        ));
        chains.push(format!(
            "[intro_v][intro_a][{main_v}][{main_a}]concat=n=2:v=1:a=1[vout][aout]"
        ));
    }

    chains.join(";")
}

fn effect_filter(effect: Effect, frame: Frame, main_secs: f64) -> String {
    match effect {
        Effect::FadeIn => "fade=t=in:st=0:d=1".to_string(),
        Effect::FadeOut => format!("fade=t=out:st={}:d=1", secs((main_secs - 1.0).max(0.0))),
        Effect::Zoom => format!(
            "scale=iw*{ZOOM_FACTOR}:ih*{ZOOM_FACTOR},crop={}:{}",
            frame.width, frame.height
        ),
        Effect::MirrorX => "hflip".to_string(),
        Effect::ColorX => "colorchannelmixer=rr=1.2:gg=1.2:bb=1.2".to_string(),
    }
}

fn caption_filter(caption: &CaptionOverlay) -> String {
    let y = match caption.style.position {
        CaptionPosition::Center => "(h-text_h)/2".to_string(),
        CaptionPosition::Bottom => format!("h-text_h-{CAPTION_MARGIN}"),
        CaptionPosition::Top => CAPTION_MARGIN.to_string(),
    };
    drawtext(
        &caption.text_file,
        &caption.style,
        &y,
        caption.start_secs,
        caption.end_secs,
        caption.fade_in_secs,
    )
}

fn call_to_action_filter(cta: &CallToAction) -> String {
    drawtext(
        &cta.text_file,
        &cta.style,
        &format!("h-text_h-{CTA_MARGIN}"),
        cta.start_secs,
        cta.end_secs,
        Some(CTA_FADE_SECS),
    )
}

fn drawtext(
    text_file: &Path,
    style: &ResolvedStyle,
    y: &str,
    start: f64,
    end: f64,
    fade_in: Option<f64>,
) -> String {
    let x = match style.alignment.as_str() {
        "left" => SIDE_MARGIN.to_string(),
        "right" => format!("w-text_w-{SIDE_MARGIN}"),
        _ => "(w-text_w)/2".to_string(),
    };

    let mut filter = format!(
        "drawtext=textfile={}:font={}:fontsize={}:fontcolor={}:line_spacing=10:x={x}:y={y}",
        escape_filter_path(text_file),
        quote(&style.font),
        style.size,
        ffmpeg_color(&style.color),
    );
    if let Some(bg) = &style.bg_color {
        filter.push_str(&format!(
            ":box=1:boxcolor={}:boxborderw=20",
            ffmpeg_color(bg)
        ));
    }
    filter.push_str(&format!(
        ":enable='between(t,{},{})'",
        secs(start),
        secs(end)
    ));
    if let Some(fade) = fade_in.filter(|f| *f > 0.0) {
        filter.push_str(&format!(
            ":alpha='min(1,max(0,(t-{})/{}))'",
            secs(start),
            secs(fade)
        ));
    }
    filter
}

fn intro_video_chain(intro: &IntroCard, frame: Frame) -> String {
    let half = secs(intro.duration_secs / 2.0);
    let total = secs(intro.duration_secs);
    format!(
        "color=c=black:s={w}x{h}:r={fps}:d={total},setsar=1,format=yuv420p,\
drawtext=textfile={file}:font={font}:fontsize={INTRO_FONT_SIZE}:fontcolor={color}:\
x=(w-text_w)/2:y=(h-text_h)/2:alpha='if(lt(t,{half}),t/{half},max(0,({total}-t)/{half}))'[intro_v]",
        w = frame.width,
        h = frame.height,
        fps = frame.fps,
        file = escape_filter_path(&intro.title_file),
        font = quote(&intro.font),
        color = ffmpeg_color(&intro.color),
    )
}

/// Convert `#RRGGBB` / `#RRGGBBAA` to ffmpeg's `0xRRGGBB[@alpha]`.
/// Named colors pass through unchanged.
pub fn ffmpeg_color(color: &str) -> String {
    let Some(hex) = color.strip_prefix('#') else {
        return color.to_string();
    };
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return color.to_string();
    }
    match hex.len() {
        6 => format!("0x{hex}"),
        8 => match u8::from_str_radix(&hex[6..], 16) {
            Ok(alpha) => format!("0x{}@{:.2}", &hex[..6], f64::from(alpha) / 255.0),
            Err(_) => color.to_string(),
        },
        _ => color.to_string(),
    }
}

/// Quote a path for use as a filter option value.
pub fn escape_filter_path(path: &Path) -> String {
    quote(&path.to_string_lossy().replace('\\', "/"))
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''").replace(':', r"\:"))
}

fn secs(value: f64) -> String {
    format!("{value:.3}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{BackgroundTrack, MusicBed, NarrationTrack, TrackFit};

    fn plan(fit: TrackFit) -> TimelinePlan {
        TimelinePlan::simplified(
            Frame::default(),
            BackgroundTrack {
                path: "bg.mp4".into(),
                source_secs: 10.0,
                fit,
            },
            NarrationTrack {
                path: "voice.mp3".into(),
                duration_secs: 45.0,
            },
            "out.mp4",
        )
    }

    fn style(position: CaptionPosition) -> ResolvedStyle {
        ResolvedStyle {
            font: "Arial".into(),
            size: 60,
            color: "#FFFFFF".into(),
            bg_color: Some("#00000080".into()),
            alignment: "center".into(),
            position,
        }
    }

    #[test]
    fn test_color_conversion() {
        assert_eq!(ffmpeg_color("#FFD700"), "0xFFD700");
        assert_eq!(ffmpeg_color("#00000080"), "0x000000@0.50");
        assert_eq!(ffmpeg_color("white"), "white");
        assert_eq!(ffmpeg_color("#XYZ"), "#XYZ");
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\tmp\\a.txt")),
            r"'C\:/tmp/a.txt'"
        );
    }

    #[test]
    fn test_looped_background_args() {
        let params = EncoderParameters::software_fallback("libx264", "veryfast", 4);
        let args = build_ffmpeg_args(&plan(TrackFit::Loop { copies: 5 }), &params);

        let loop_at = args.iter().position(|a| a == "-stream_loop").unwrap();
        assert_eq!(args[loop_at + 1], "4");
        assert_eq!(args[loop_at + 3], "bg.mp4");

        let t_at = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t_at + 1], "45.000");
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_simplified_graph_has_no_overlays() {
        let graph = build_filter_graph(&plan(TrackFit::Trim));
        assert!(graph.contains("[0:v]trim=duration=45.000"));
        assert!(graph.ends_with("[aout]"));
        assert!(!graph.contains("drawtext"));
        assert!(!graph.contains("amix"));
        assert!(!graph.contains("concat"));
    }

    #[test]
    fn test_full_graph() {
        let mut plan = plan(TrackFit::Trim);
        plan.effect = Some(Effect::MirrorX);
        plan.captions.push(CaptionOverlay {
            text_file: "/tmp/caption_0000.txt".into(),
            start_secs: 0.0,
            end_secs: 2.5,
            style: style(CaptionPosition::Bottom),
            fade_in_secs: Some(0.5),
        });
        plan.call_to_action = Some(CallToAction {
            text_file: "/tmp/cta.txt".into(),
            start_secs: 40.0,
            end_secs: 45.0,
            style: style(CaptionPosition::Bottom),
        });
        plan.music = Some(MusicBed {
            path: "music.mp3".into(),
            volume: 0.2,
        });
        plan.intro = Some(IntroCard {
            duration_secs: 3.0,
            title_file: "/tmp/title.txt".into(),
            font: "Arial".into(),
            color: "#FFFFFF".into(),
        });

        let graph = build_filter_graph(&plan);
        assert!(graph.contains("hflip"));
        assert!(graph.contains("y=h-text_h-150"));
        assert!(graph.contains("enable='between(t,0.000,2.500)'"));
        assert!(graph.contains("enable='between(t,40.000,45.000)'"));
        assert!(graph.contains("boxcolor=0x000000@0.50"));
        assert!(graph.contains("volume=0.200"));
        assert!(graph.contains("[main_v][main_a]concat=n=2:v=1:a=1[vout][aout]"));

        let params = EncoderParameters::software_fallback("libx264", "veryfast", 4);
        let args = build_ffmpeg_args(&plan, &params);
        let t_at = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t_at + 1], "48.000");
        assert!(args.windows(2).any(|w| w == ["-stream_loop", "-1"]));
    }

    #[test]
    fn test_hardware_input_flags_precede_background() {
        let params = EncoderParameters {
            input_flags: vec!["-hwaccel".into(), "cuda".into()],
            ..EncoderParameters::software_fallback("h264_nvenc", "fast", 4)
        };
        let args = build_ffmpeg_args(&plan(TrackFit::Exact), &params);
        let accel_at = args.iter().position(|a| a == "-hwaccel").unwrap();
        let input_at = args.iter().position(|a| a == "-i").unwrap();
        assert!(accel_at < input_at);
        assert!(!args.contains(&"-stream_loop".to_string()));
    }

    #[test]
    fn test_zoom_crops_back_to_frame() {
        let zoom = effect_filter(Effect::Zoom, Frame::default(), 45.0);
        assert_eq!(zoom, "scale=iw*1.03:ih*1.03,crop=1080:1920");
    }
}
