use super::*;
use crate::foundation::error::{DuckgenError, DuckgenResult};

struct FixedProber(DuckgenResult<ProbeInfo>);

impl Prober for FixedProber {
    fn probe(&self, _path: &Path) -> DuckgenResult<ProbeInfo> {
        match &self.0 {
            Ok(info) => Ok(info.clone()),
            Err(e) => Err(DuckgenError::probe(e.to_string())),
        }
    }
}

fn info(codec: &str, w: u32, h: u32, pix: &str) -> ProbeInfo {
    ProbeInfo {
        codec: codec.to_string(),
        width: w,
        height: h,
        pixel_format: pix.to_string(),
    }
}

fn expected() -> ExpectedOutput {
    ExpectedOutput::from(&RenderSettings::default())
}

#[test]
fn defaults_expect_square_h264_yuv420p() {
    let e = expected();
    assert_eq!((e.width, e.height), (1080, 1080));
    assert_eq!(e.codec, "h264");
    assert_eq!(e.pixel_format, "yuv420p");
}

#[test]
fn matching_probe_passes() {
    let p = FixedProber(Ok(info("h264", 1080, 1080, "yuv420p")));
    let v = OutputVerifier::new(&p, expected());
    assert_eq!(v.verify(Path::new("x.mp4")), Verification::Passed);
}

#[test]
fn mismatch_warns_with_observed_values() {
    let p = FixedProber(Ok(info("hevc", 1080, 720, "yuv420p")));
    let v = OutputVerifier::new(&p, expected());
    let Verification::Warned(reason) = v.verify(Path::new("x.mp4")) else {
        panic!("expected warning");
    };
    assert!(reason.contains("codec hevc != h264"));
    assert!(reason.contains("height 720 != 1080"));
    assert!(!reason.contains("width 1080 !="));
    assert!(reason.contains("observed codec=hevc width=1080 height=720 pix_fmt=yuv420p"));
}

#[test]
fn probe_failure_is_advisory() {
    let p = FixedProber(Err(DuckgenError::probe("no video stream found")));
    let v = OutputVerifier::new(&p, expected());
    let Verification::Warned(reason) = v.verify(Path::new("x.mp4")) else {
        panic!("expected warning");
    };
    assert!(reason.contains("probe failed"));
}
