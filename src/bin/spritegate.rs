use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "spritegate", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the anchor analysis (baseline, root centroid, bounds, chroma key) as JSON.
    Analyze(AnalyzeArgs),
    /// Audit one candidate image against an anchor and print the verdict as JSON.
    Audit(AuditArgs),
    /// Summarize a run directory; optionally (re)write its diagnostic.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Anchor PNG.
    #[arg(long)]
    anchor: PathBuf,

    /// Audit configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct AuditArgs {
    /// Anchor PNG.
    #[arg(long)]
    anchor: PathBuf,

    /// Candidate image to audit.
    #[arg(long)]
    candidate: PathBuf,

    /// Previously approved frame, enables the temporal check.
    #[arg(long)]
    previous: Option<PathBuf>,

    /// Audit configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the aligned candidate here when the hard gates pass.
    #[arg(long)]
    aligned_out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Run directory holding `run_state.json`.
    #[arg(long)]
    run: PathBuf,

    /// Write `diagnostic.json` for the run's current state.
    #[arg(long)]
    diagnose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Analyze(args) => cmd_analyze(args),
        Command::Audit(args) => cmd_audit(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<spritegate::AuditConfig> {
    match path {
        Some(p) => Ok(spritegate::AuditConfig::from_path(p)?),
        None => Ok(spritegate::AuditConfig::default()),
    }
}

fn analyze_opts(cfg: &spritegate::AuditConfig) -> spritegate::AnalyzeOpts {
    spritegate::AnalyzeOpts {
        alpha_threshold: cfg.align.alpha_threshold,
        root_zone_ratio: cfg.align.root_zone_ratio,
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{s}");
    Ok(())
}

fn cmd_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let frame = spritegate::RgbaFrame::load(&args.anchor)?;
    let analysis = spritegate::analyze(&frame, analyze_opts(&cfg))?;
    let palette = spritegate::extract_palette(&frame, cfg.align.alpha_threshold, 64);
    let chroma_key = spritegate::select_chroma_key(
        &palette,
        &spritegate::DEFAULT_CHROMA_CANDIDATES,
        cfg.thresholds.palette_tolerance,
    );

    print_json(&serde_json::json!({
        "anchor": analysis,
        "palette_colors": palette.len(),
        "chroma_key": chroma_key,
    }))
}

fn cmd_audit(args: AuditArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let anchor_frame = spritegate::RgbaFrame::load(&args.anchor)?;
    cfg.check_anchor_size(anchor_frame.width, anchor_frame.height)?;
    let anchor = spritegate::analyze(&anchor_frame, analyze_opts(&cfg))?;
    let previous = args
        .previous
        .as_deref()
        .map(spritegate::RgbaFrame::load)
        .transpose()?;
    let bytes = std::fs::read(&args.candidate)
        .with_context(|| format!("read candidate '{}'", args.candidate.display()))?;

    let ctx = spritegate::AuditContext {
        cfg: &cfg,
        anchor: &anchor,
        anchor_frame: &anchor_frame,
        previous: previous.as_ref(),
    };
    let report = spritegate::audit_candidate(&bytes, &ctx)?;

    if let (Some(out), Some(aligned)) = (&args.aligned_out, &report.aligned) {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        std::fs::write(out, aligned.encode_png()?)
            .with_context(|| format!("write png '{}'", out.display()))?;
        eprintln!("wrote {}", out.display());
    }

    print_json(&serde_json::json!({
        "outcome": report.outcome,
        "reasons": report.reasons,
        "composite": report.composite,
        "metrics": report.metrics,
    }))
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let layout = spritegate::RunLayout::new(&args.run);
    let store = spritegate::RunStateStore::open(layout)?;
    let state = store.state();

    println!(
        "run {} [{:?}] attempts={}",
        state.run_id, state.status, state.total_attempts
    );
    for f in &state.frames {
        let reasons: Vec<&str> = f.reasons.iter().map(|r| r.as_str()).collect();
        println!(
            "  frame {:>4} {:<10} attempts={} {}",
            f.index.0,
            format!("{:?}", f.status).to_lowercase(),
            f.attempt_count(),
            reasons.join(",")
        );
    }
    if let Some(stop) = &state.stop_reason {
        println!(
            "stopped: {} (observed {}, threshold {}): {}",
            stop.condition, stop.observed, stop.threshold, stop.message
        );
    }
    if let Some(failure) = &state.failure {
        println!("failed: {failure}");
    }

    if args.diagnose {
        let diagnostic = spritegate::diagnose(state, chrono::Utc::now());
        diagnostic.write(store.layout())?;
        eprintln!("wrote {}", store.layout().diagnostic().display());
    }
    Ok(())
}
