use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::compose::graph::CompositionGraph;
use crate::config::collection::RenderSettings;
use crate::encode::{Encoder, ProbeInfo, Prober};
use crate::foundation::core::CancelToken;
use crate::foundation::error::{DuckgenError, DuckgenResult};

/// Encoder that runs the system `ffmpeg` once per graph.
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    settings: RenderSettings,
    poll_interval: Duration,
}

impl FfmpegEncoder {
    /// Create an encoder producing output per `settings`.
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Full `ffmpeg` argument list for `graph` written to `out_path`.
    pub fn args(&self, graph: &CompositionGraph, out_path: &Path) -> Vec<OsString> {
        let s = &self.settings;
        let mut args: Vec<OsString> = ["-y", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();

        for input in &graph.inputs {
            if !input.animated {
                // Stills are looped; `-frames:v` bounds the output length.
                args.push("-loop".into());
                args.push("1".into());
            }
            args.push("-i".into());
            args.push(input.path.clone().into_os_string());
        }

        args.push("-filter_complex".into());
        args.push(graph.filter_complex().into());
        args.push("-map".into());
        args.push(graph.output.to_string().into());
        for a in [
            "-r".to_string(),
            s.fps.to_string(),
            "-frames:v".to_string(),
            s.frames.to_string(),
            "-c:v".to_string(),
            s.video_codec.clone(),
            "-pix_fmt".to_string(),
            s.pixel_format.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-an".to_string(),
        ] {
            args.push(a.into());
        }
        args.push(out_path.as_os_str().to_owned());
        args
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(
        &self,
        graph: &CompositionGraph,
        out_path: &Path,
        cancel: &CancelToken,
    ) -> DuckgenResult<()> {
        cancel.check()?;
        ensure_parent_dir(out_path)?;

        let mut child = Command::new("ffmpeg")
            .args(self.args(graph, out_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DuckgenError::encode(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DuckgenError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok::<_, std::io::Error>(stderr_bytes)
        });

        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stderr_drain.join();
                return Err(DuckgenError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => std::thread::sleep(self.poll_interval),
                Err(e) => {
                    let _ = child.kill();
                    return Err(DuckgenError::encode(format!(
                        "failed to wait for ffmpeg to finish: {e}"
                    )));
                }
            }
        };

        let stderr_bytes = stderr_drain
            .join()
            .map_err(|_| DuckgenError::encode("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| DuckgenError::encode(format!("ffmpeg stderr read failed: {e}")))?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(DuckgenError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Prober that reads the first video stream through the system `ffprobe`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfprobeProber;

impl Prober for FfprobeProber {
    fn probe(&self, path: &Path) -> DuckgenResult<ProbeInfo> {
        let out = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=codec_name,width,height,pix_fmt",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| DuckgenError::probe(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(DuckgenError::probe(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        parse_probe_json(&out.stdout)
    }
}

/// Parse `ffprobe -of json -show_entries stream=...` output.
pub(crate) fn parse_probe_json(bytes: &[u8]) -> DuckgenResult<ProbeInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_name: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        pix_fmt: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| DuckgenError::probe(format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| DuckgenError::probe("no video stream found"))?;

    Ok(ProbeInfo {
        codec: stream
            .codec_name
            .ok_or_else(|| DuckgenError::probe("missing codec_name from ffprobe"))?,
        width: stream
            .width
            .ok_or_else(|| DuckgenError::probe("missing width from ffprobe"))?,
        height: stream
            .height
            .ok_or_else(|| DuckgenError::probe("missing height from ffprobe"))?,
        pixel_format: stream
            .pix_fmt
            .ok_or_else(|| DuckgenError::probe("missing pix_fmt from ffprobe"))?,
    })
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> DuckgenResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `tool -version` runs successfully from `PATH`.
pub fn is_tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Return `true` when both `ffmpeg` and `ffprobe` are available.
pub fn is_ffmpeg_on_path() -> bool {
    is_tool_on_path("ffmpeg") && is_tool_on_path("ffprobe")
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
