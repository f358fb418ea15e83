use std::future::Future;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use anyhow::Context as _;
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use duckgen::{CancelToken, DuckgenError};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "duckgen", version)]
struct Cli {
    /// Project directory containing `config/`, `traits/` and `output/`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate unique trait combinations into `output/traitList.json`.
    Mix(MixArgs),
    /// Render every manifest entry (requires `ffmpeg` and `ffprobe` on PATH).
    Render(RenderArgs),
    /// Write per-artifact metadata and `output/master_metadata.json`.
    Metadata,
    /// Print trait usage and write `output/trait_summary.txt`.
    Summary,
}

#[derive(Parser, Debug)]
struct MixArgs {
    /// Exit with an error when fewer artifacts than requested could be generated.
    #[arg(long)]
    require_full: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Render only the first N manifest entries.
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    limit: Option<usize>,

    /// Concurrent renders.
    #[arg(
        long,
        default_value_t = 1,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    workers: usize,
}

struct Project {
    root: PathBuf,
}

impl Project {
    fn collection_path(&self) -> PathBuf {
        self.root.join("config").join("collection.json")
    }

    fn layers_path(&self) -> PathBuf {
        self.root.join("config").join("layers.json")
    }

    fn traits_dir(&self) -> PathBuf {
        self.root.join("traits")
    }

    fn output(&self, rel: &str) -> PathBuf {
        self.root.join("output").join(rel)
    }

    fn load_config(&self) -> anyhow::Result<duckgen::CollectionConfig> {
        let path = self.collection_path();
        let cfg = duckgen::CollectionConfig::from_path(&path)
            .with_context(|| format!("load '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn load_layers(&self) -> anyhow::Result<duckgen::LayerSet> {
        let path = self.layers_path();
        duckgen::LayerSet::from_path(&path).with_context(|| format!("load '{}'", path.display()))
    }

    fn load_manifest(&self) -> anyhow::Result<duckgen::Manifest> {
        let path = self.output("traitList.json");
        duckgen::Manifest::from_path(&path)
            .with_context(|| format!("load '{}' (run `duckgen mix` first)", path.display()))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project = Project { root: cli.root };
    match cli.cmd {
        Command::Mix(args) => cmd_mix(&project, args),
        Command::Render(args) => cmd_render(&project, args),
        Command::Metadata => cmd_metadata(&project),
        Command::Summary => cmd_summary(&project),
    }
}

fn cmd_mix(project: &Project, args: MixArgs) -> anyhow::Result<()> {
    let config = project.load_config()?;
    let layers = project.load_layers()?;

    let out = project.output("traitList.json");
    let generation = match duckgen::generate_collection(&config, &layers) {
        Ok(generation) => generation,
        Err(DuckgenError::InvalidGoldenMarkerCount {
            requested,
            available,
            partial: Some(partial),
        }) => {
            partial.manifest.write_to_path(&out)?;
            anyhow::bail!(
                "cannot mark {requested} golden artifacts: only {available} generated \
                 (unmarked manifest written to {})",
                out.display()
            );
        }
        Err(e) => return Err(e.into()),
    };
    generation.manifest.write_to_path(&out)?;

    let report = &generation.report;
    eprintln!(
        "generated {}/{} artifacts ({} golden) in {} attempts -> {}",
        report.accepted,
        report.requested,
        generation.manifest.golden_count(),
        report.attempts,
        out.display()
    );
    if report.exhausted {
        eprintln!(
            "warning: attempt budget exhausted, {} artifacts short (duplicates: {}, out of bounds: {}, empty layers: {})",
            report.shortfall(),
            report.rejected_duplicate,
            report.rejected_bounds,
            report.rejected_no_trait
        );
        if args.require_full {
            anyhow::bail!("generated {} of {} artifacts", report.accepted, report.requested);
        }
    }
    Ok(())
}

fn cmd_render(project: &Project, args: RenderArgs) -> anyhow::Result<()> {
    if !duckgen::is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg and ffprobe are required on PATH for rendering");
    }
    let config = project.load_config()?;
    let layers = project.load_layers()?;
    let manifest = project.load_manifest()?;
    let settings = &config.render;

    let cancel = CancelToken::new();
    cancel_on(tokio::signal::ctrl_c(), cancel.clone())?;

    let log_path = project.output("render_log.txt");
    let log = duckgen::RenderLog::create(&log_path)?;
    let encoder = duckgen::FfmpegEncoder::new(settings.clone());
    let prober = duckgen::FfprobeProber;
    let verifier = duckgen::OutputVerifier::new(&prober, duckgen::ExpectedOutput::from(settings));
    let executor = duckgen::RenderExecutor::new(
        &encoder,
        verifier,
        &log,
        project.output("images"),
        settings.output_extension.clone(),
    )
    .with_cancel(cancel);
    let traits_dir = project.traits_dir();
    let builder = duckgen::GraphBuilder::new(&layers, &traits_dir, settings);
    let opts = duckgen::BatchOptions {
        limit: args.limit,
        threading: duckgen::RenderThreading {
            workers: args.workers,
        },
    };

    let report = duckgen::render_manifest(&manifest, &executor, &builder, &opts)?;
    eprintln!(
        "rendered={} skipped={} failed={} warned={} uncomposable={} cancelled={} (log: {})",
        report.rendered(),
        report.skipped(),
        report.failed(),
        report.warned(),
        report.uncomposable.len(),
        report.cancelled(),
        log_path.display()
    );
    if report.has_failures() {
        anyhow::bail!(
            "{} artifact(s) failed to render",
            report.failed() + report.uncomposable.len()
        );
    }
    if report.cancelled() > 0 {
        anyhow::bail!("interrupted: {} artifact(s) not rendered", report.cancelled());
    }
    Ok(())
}

/// Cancel `cancel` once `signal` resolves, driven from a dedicated thread.
///
/// The thread is detached in practice: it lives until the signal fires or the process exits.
fn cancel_on<F>(signal: F, cancel: CancelToken) -> anyhow::Result<JoinHandle<()>>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;
    let handle = std::thread::Builder::new()
        .name("duckgen-signal".to_string())
        .spawn(move || {
            rt.block_on(async {
                match signal.await {
                    Ok(()) => {
                        tracing::warn!("interrupt received, finishing in-flight renders");
                        cancel.cancel();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to listen for Ctrl+C");
                    }
                }
            });
        })
        .context("spawn signal thread")?;
    Ok(handle)
}

fn cmd_metadata(project: &Project) -> anyhow::Result<()> {
    let config = project.load_config()?;
    let manifest = project.load_manifest()?;
    let dir = project.output("metadata");
    let master = project.output("master_metadata.json");
    let records = duckgen::write_metadata(&manifest, &config, &dir, &master)?;
    eprintln!(
        "metadata written to {} for {} artifacts (master: {})",
        dir.display(),
        records.len(),
        master.display()
    );
    Ok(())
}

fn cmd_summary(project: &Project) -> anyhow::Result<()> {
    let layers = project.load_layers()?;
    let manifest = project.load_manifest()?;
    let summary = duckgen::TraitSummary::from_manifest(&manifest, &layers);
    print!("{summary}");

    let path = project.output("trait_summary.txt");
    summary.write_to_path(&path)?;
    eprintln!("summary saved to {}", display_rel(&path, &project.root));
    Ok(())
}

fn display_rel(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/bin/duckgen.rs"]
mod tests;
