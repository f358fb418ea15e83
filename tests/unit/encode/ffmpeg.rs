use std::path::PathBuf;

use super::*;
use crate::compose::graph::{GraphInput, NodeLabel, Pass};
use crate::foundation::core::{Canvas, Fps};

fn graph() -> CompositionGraph {
    CompositionGraph {
        canvas: Canvas {
            width: 1080,
            height: 1080,
        },
        inputs: vec![
            GraphInput {
                layer: "Background".to_string(),
                path: PathBuf::from("traits/Background/Blue.png"),
                animated: false,
            },
            GraphInput {
                layer: "Fx".to_string(),
                path: PathBuf::from("traits/Fx/Sparkle.mov"),
                animated: true,
            },
        ],
        passes: vec![
            Pass::Normalize {
                input: 0,
                output: NodeLabel("t0".to_string()),
                fps: None,
            },
            Pass::Normalize {
                input: 1,
                output: NodeLabel("t1".to_string()),
                fps: Some(Fps(24)),
            },
            Pass::Overlay {
                base: NodeLabel("t0".to_string()),
                top: NodeLabel("t1".to_string()),
                output: NodeLabel("tmp1".to_string()),
                straight_alpha: true,
            },
        ],
        output: NodeLabel("tmp1".to_string()),
    }
}

fn strings(args: Vec<OsString>) -> Vec<String> {
    args.into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn args_loop_stills_but_not_clips() {
    let enc = FfmpegEncoder::new(RenderSettings::default());
    let args = strings(enc.args(&graph(), Path::new("out/.Duck#1.partial.mp4")));

    let i_bg = args
        .iter()
        .position(|a| a == "traits/Background/Blue.png")
        .unwrap();
    assert_eq!(&args[i_bg - 3..i_bg], ["-loop", "1", "-i"]);

    let i_fx = args.iter().position(|a| a == "traits/Fx/Sparkle.mov").unwrap();
    assert_eq!(args[i_fx - 1], "-i");
    assert_ne!(args[i_fx - 2], "1");
}

#[test]
fn args_map_final_node_and_encode_settings() {
    let enc = FfmpegEncoder::new(RenderSettings::default());
    let args = strings(enc.args(&graph(), Path::new("out/.Duck#1.partial.mp4")));

    let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
    assert_eq!(args[pos("-map") + 1], "[tmp1]");
    assert_eq!(args[pos("-r") + 1], "24");
    assert_eq!(args[pos("-frames:v") + 1], "120");
    assert_eq!(args[pos("-c:v") + 1], "libx264");
    assert_eq!(args[pos("-pix_fmt") + 1], "yuv420p");
    assert!(args[pos("-filter_complex") + 1].ends_with("[tmp1]"));
    assert_eq!(args.last().unwrap(), "out/.Duck#1.partial.mp4");
    assert_eq!(args[0], "-y");
}

#[test]
fn parse_probe_json_reads_first_stream() {
    let json = br#"{
        "programs": [],
        "streams": [
            { "codec_name": "h264", "width": 1080, "height": 1080, "pix_fmt": "yuv420p" }
        ]
    }"#;
    let info = parse_probe_json(json).unwrap();
    assert_eq!(
        info,
        ProbeInfo {
            codec: "h264".to_string(),
            width: 1080,
            height: 1080,
            pixel_format: "yuv420p".to_string(),
        }
    );
}

#[test]
fn parse_probe_json_rejects_missing_stream_or_fields() {
    assert!(parse_probe_json(br#"{ "streams": [] }"#).is_err());
    assert!(parse_probe_json(br#"{}"#).is_err());
    assert!(parse_probe_json(br#"{ "streams": [ { "codec_name": "h264" } ] }"#).is_err());
    assert!(parse_probe_json(b"not json").is_err());
}

#[test]
fn cancelled_token_prevents_spawn() {
    let enc = FfmpegEncoder::new(RenderSettings::default());
    let cancel = CancelToken::new();
    cancel.cancel();
    let dir = tempfile::tempdir().unwrap();
    let err = enc
        .encode(&graph(), &dir.path().join("x.mp4"), &cancel)
        .unwrap_err();
    assert!(matches!(err, DuckgenError::Cancelled));
}

#[test]
fn ensure_parent_dir_creates_nested_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("a").join("b").join("c.mp4");
    ensure_parent_dir(&p).unwrap();
    assert!(dir.path().join("a").join("b").is_dir());
    ensure_parent_dir(Path::new("bare.mp4")).unwrap();
}
