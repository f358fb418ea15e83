use std::sync::atomic::{AtomicU32, Ordering};

use super::*;
use crate::compose::graph::{GraphInput, NodeLabel, Pass};
use crate::config::collection::RenderSettings;
use crate::config::layers::{Layer, LayerSet, Trait};
use crate::encode::{ProbeInfo, Prober};
use crate::foundation::core::Canvas;
use crate::generate::manifest::Attribute;
use crate::render::verify::ExpectedOutput;

/// Fails the first `failures` calls, then writes a small file to the requested path.
struct ScriptedEncoder {
    failures: u32,
    calls: AtomicU32,
    write_output: bool,
}

impl ScriptedEncoder {
    fn failing_first(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
            write_output: true,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Encoder for ScriptedEncoder {
    fn encode(
        &self,
        _graph: &CompositionGraph,
        out_path: &Path,
        cancel: &CancelToken,
    ) -> DuckgenResult<()> {
        cancel.check()?;
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            // Leave a torn partial file behind, like a crashed encoder would.
            std::fs::write(out_path, b"partial").unwrap();
            return Err(DuckgenError::encode(format!("scripted failure {n}")));
        }
        if self.write_output {
            std::fs::write(out_path, b"video").unwrap();
        }
        Ok(())
    }
}

/// Cancels the run from inside the first encode call.
struct CancellingEncoder {
    token: CancelToken,
    calls: AtomicU32,
}

impl Encoder for CancellingEncoder {
    fn encode(&self, _: &CompositionGraph, _: &Path, cancel: &CancelToken) -> DuckgenResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token.cancel();
        cancel.check()
    }
}

struct StaticProber(ProbeInfo);

impl Prober for StaticProber {
    fn probe(&self, _path: &Path) -> DuckgenResult<ProbeInfo> {
        Ok(self.0.clone())
    }
}

fn good_probe() -> StaticProber {
    StaticProber(ProbeInfo {
        codec: "h264".to_string(),
        width: 1080,
        height: 1080,
        pixel_format: "yuv420p".to_string(),
    })
}

fn artifact(id: u64) -> Artifact {
    Artifact {
        id,
        filename: format!("Duck#{id}"),
        attributes: vec![
            Attribute {
                layer: "Background".to_string(),
                trait_type: "Background".to_string(),
                value: "Blue".to_string(),
            },
            Attribute {
                layer: "Hat".to_string(),
                trait_type: "Hat".to_string(),
                value: "Ghost".to_string(),
            },
        ],
        golden: false,
    }
}

fn graph() -> CompositionGraph {
    CompositionGraph {
        canvas: Canvas {
            width: 1080,
            height: 1080,
        },
        inputs: vec![GraphInput {
            layer: "Background".to_string(),
            path: PathBuf::from("traits/Background/Blue.png"),
            animated: false,
        }],
        passes: vec![Pass::Normalize {
            input: 0,
            output: NodeLabel("t0".to_string()),
            fps: None,
        }],
        output: NodeLabel("t0".to_string()),
    }
}

fn expected() -> ExpectedOutput {
    ExpectedOutput::from(&RenderSettings::default())
}

fn event_lines(log: &RenderLog) -> Vec<String> {
    log.contents()
        .unwrap()
        .lines()
        .skip(2)
        .map(str::to_string)
        .collect()
}

#[test]
fn existing_output_is_skipped_without_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let enc = ScriptedEncoder::failing_first(0);
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        dir.path(),
        "mp4",
    );
    std::fs::write(dir.path().join("Duck#1.mp4"), b"done").unwrap();

    let r = exec.render(&artifact(1), &graph());
    assert_eq!(r.status, RenderStatus::Skipped);
    assert_eq!(r.attempts_used, 0);
    assert_eq!(r.verification, Verification::NotRun);
    assert_eq!(enc.calls(), 0);
    assert_eq!(event_lines(&log), ["SKIP Duck#1.mp4 (already exists)"]);
}

#[test]
fn success_renames_partial_and_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let enc = ScriptedEncoder::failing_first(0);
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        dir.path(),
        "mp4",
    );

    let a = artifact(1);
    let r = exec.render(&a, &graph());
    assert_eq!(r.status, RenderStatus::Rendered);
    assert_eq!(r.attempts_used, 1);
    assert_eq!(r.verification, Verification::Passed);
    assert_eq!(r.output_path, dir.path().join("Duck#1.mp4"));
    assert!(r.output_path.is_file());
    assert!(!exec.partial_path(&a).exists());
    assert_eq!(event_lines(&log), ["OK Duck#1.mp4 rendered & verified"]);
}

#[test]
fn transient_failure_is_retried_with_same_graph() {
    let dir = tempfile::tempdir().unwrap();
    let enc = ScriptedEncoder::failing_first(2);
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        dir.path(),
        "mp4",
    );

    let r = exec.render(&artifact(4), &graph());
    assert_eq!(r.status, RenderStatus::Rendered);
    assert_eq!(r.attempts_used, 3);
    assert_eq!(enc.calls(), 3);
    let lines = event_lines(&log);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("RETRY Duck#4.mp4 (attempt 1"));
    assert!(lines[1].starts_with("RETRY Duck#4.mp4 (attempt 2"));
    assert_eq!(lines[2], "OK Duck#4.mp4 rendered & verified");
}

#[test]
fn permanent_failure_stops_at_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let enc = ScriptedEncoder::failing_first(u32::MAX);
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        dir.path(),
        "mp4",
    );

    let a = artifact(2);
    let r = exec.render(&a, &graph());
    assert!(matches!(r.status, RenderStatus::Failed(ref e) if e.contains("scripted failure 3")));
    assert_eq!(r.attempts_used, MAX_RENDER_ATTEMPTS);
    assert_eq!(enc.calls(), MAX_RENDER_ATTEMPTS);
    // Torn partial output never becomes a skip-worthy file.
    assert!(!exec.partial_path(&a).exists());
    assert!(!r.output_path.exists());

    let lines = event_lines(&log);
    assert_eq!(lines.len(), 3);
    assert!(lines[2].starts_with("FAIL Duck#2.mp4: render failed after 3 attempts"));
}

#[test]
fn custom_ceiling_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    let enc = ScriptedEncoder::failing_first(u32::MAX);
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        dir.path(),
        "mp4",
    )
    .with_max_attempts(5);

    let r = exec.render(&artifact(2), &graph());
    assert_eq!(r.attempts_used, 5);
    assert_eq!(enc.calls(), 5);
}

#[test]
fn success_without_output_file_counts_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let enc = ScriptedEncoder {
        failures: 0,
        calls: AtomicU32::new(0),
        write_output: false,
    };
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        dir.path(),
        "mp4",
    );

    let r = exec.render(&artifact(3), &graph());
    assert!(matches!(r.status, RenderStatus::Failed(_)));
    assert_eq!(enc.calls(), 3);
}

#[test]
fn verification_mismatch_is_advisory() {
    let dir = tempfile::tempdir().unwrap();
    let enc = ScriptedEncoder::failing_first(0);
    let probe = StaticProber(ProbeInfo {
        codec: "h264".to_string(),
        width: 720,
        height: 1080,
        pixel_format: "yuv420p".to_string(),
    });
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        dir.path(),
        "mp4",
    );

    let r = exec.render(&artifact(5), &graph());
    assert_eq!(r.status, RenderStatus::Rendered);
    assert!(matches!(r.verification, Verification::Warned(ref w) if w.contains("width 720 != 1080")));
    assert!(event_lines(&log)[0].starts_with("WARN Duck#5.mp4: format warning:"));
}

#[test]
fn cancellation_before_start_skips_encoder() {
    let dir = tempfile::tempdir().unwrap();
    let enc = ScriptedEncoder::failing_first(0);
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let cancel = CancelToken::new();
    cancel.cancel();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        dir.path(),
        "mp4",
    )
    .with_cancel(cancel);

    let r = exec.render(&artifact(6), &graph());
    assert_eq!(r.status, RenderStatus::Cancelled);
    assert_eq!(enc.calls(), 0);
}

#[test]
fn cancellation_during_encode_stops_retries() {
    let dir = tempfile::tempdir().unwrap();
    let token = CancelToken::new();
    let enc = CancellingEncoder {
        token: token.clone(),
        calls: AtomicU32::new(0),
    };
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        dir.path(),
        "mp4",
    )
    .with_cancel(token);

    let r = exec.render(&artifact(7), &graph());
    assert_eq!(r.status, RenderStatus::Cancelled);
    assert_eq!(r.attempts_used, 1);
    assert_eq!(enc.calls.load(Ordering::SeqCst), 1);
    assert_eq!(event_lines(&log), ["CANCEL Duck#7.mp4 (run cancelled)"]);
}

fn layers() -> LayerSet {
    let layer = |name: &str, order: i64| Layer {
        name: name.to_string(),
        order,
        trait_type: None,
        rarity: 50,
        required: false,
        animated: false,
        video_ext: None,
        traits: vec![Trait {
            name: "x".to_string(),
            weight: 1,
        }],
    };
    LayerSet::new(vec![layer("Background", 0), layer("Hat", 1)]).unwrap()
}

#[test]
fn render_artifact_composes_remaining_layer_and_logs_missing_one() {
    let traits = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(traits.path().join("Background")).unwrap();
    std::fs::write(traits.path().join("Background").join("Blue.png"), b"png").unwrap();
    let out = tempfile::tempdir().unwrap();

    let enc = ScriptedEncoder::failing_first(0);
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        out.path(),
        "mp4",
    );
    let layers = layers();
    let settings = RenderSettings::default();
    let builder = GraphBuilder::new(&layers, traits.path(), &settings);

    let r = exec.render_artifact(&artifact(1), &builder).unwrap();
    assert_eq!(r.status, RenderStatus::Rendered);

    let lines = event_lines(&log);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("MISSING Duck#1.mp4"));
    assert!(lines[0].contains("'Hat'"));
    assert_eq!(lines[1], "OK Duck#1.mp4 rendered & verified");
}

#[test]
fn render_artifact_without_assets_is_no_composable_layers() {
    let traits = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let enc = ScriptedEncoder::failing_first(0);
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        out.path(),
        "mp4",
    );
    let layers = layers();
    let settings = RenderSettings::default();
    let builder = GraphBuilder::new(&layers, traits.path(), &settings);

    let err = exec.render_artifact(&artifact(1), &builder).unwrap_err();
    assert!(matches!(err, DuckgenError::NoComposableLayers { .. }));
    assert_eq!(enc.calls(), 0);
    let lines = event_lines(&log);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "FAIL Duck#1.mp4: no usable traits, skipping");
}

#[test]
fn render_artifact_skips_before_resolving_assets() {
    let traits = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    std::fs::write(out.path().join("Duck#1.mp4"), b"done").unwrap();
    let enc = ScriptedEncoder::failing_first(0);
    let probe = good_probe();
    let log = RenderLog::in_memory();
    let exec = RenderExecutor::new(
        &enc,
        OutputVerifier::new(&probe, expected()),
        &log,
        out.path(),
        "mp4",
    );
    let layers = layers();
    let settings = RenderSettings::default();
    let builder = GraphBuilder::new(&layers, traits.path(), &settings);

    let r = exec.render_artifact(&artifact(1), &builder).unwrap();
    assert_eq!(r.status, RenderStatus::Skipped);
    assert_eq!(event_lines(&log).len(), 1);
}
