use anyhow::{bail, Context, Result};
use std::fs;

use kata_analyzer::analysis::{analyze, AnalysisRequest};
use kata_analyzer::config::Config;
use kata_analyzer::pose::{LandmarkSequence, PoseFrame};
use kata_analyzer::report::GroundingReport;

const CONFIG_PATH: &str = "config.toml";

fn usage() -> ! {
    eprintln!("usage: analyze <sequence.json> <action> [--height <1.75|175cm>] [--fps <hz>] [--json]");
    eprintln!("  sequence.json: PoseFrame の配列");
    eprintln!("  action:        設定されたアクションID (例: jump_shot, squat)");
    std::process::exit(2);
}

/// 身長の指定。"1.75" / "1.75m" / "175cm" を受け付け、メートルに揃える
fn parse_height(value: &str) -> Result<f32> {
    if let Some(cm) = value.strip_suffix("cm") {
        let cm: f32 = cm.trim().parse().context("invalid --height")?;
        return Ok(cm / 100.0);
    }
    let m = value.strip_suffix('m').unwrap_or(value);
    m.trim().parse().context("invalid --height")
}

struct Args {
    sequence_path: String,
    action: String,
    height_m: Option<f32>,
    sample_rate_hz: Option<f64>,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut positional: Vec<String> = Vec::new();
    let mut height_m = None;
    let mut sample_rate_hz = None;
    let mut json = false;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--height" => {
                let value = iter.next().context("--height requires a value")?;
                height_m = Some(parse_height(&value)?);
            }
            "--fps" => {
                let value = iter.next().context("--fps requires a value")?;
                sample_rate_hz = Some(value.parse().context("invalid --fps")?);
            }
            "--json" => json = true,
            "-h" | "--help" => usage(),
            _ => positional.push(arg),
        }
    }

    if positional.len() != 2 {
        usage();
    }
    let action = positional.pop().unwrap();
    let sequence_path = positional.pop().unwrap();
    Ok(Args {
        sequence_path,
        action,
        height_m,
        sample_rate_hz,
        json,
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args()?;
    let config = Config::load_or_default(CONFIG_PATH);

    let content = fs::read_to_string(&args.sequence_path)
        .with_context(|| format!("cannot read {}", args.sequence_path))?;
    let frames: Vec<PoseFrame> =
        serde_json::from_str(&content).context("invalid sequence json")?;
    let sequence = LandmarkSequence::new(frames)?;

    let request = AnalysisRequest {
        action: args.action.clone(),
        height_m: args.height_m,
        sample_rate_hz: args.sample_rate_hz,
    };
    let analysis = analyze(&sequence, &request, &config)?;
    let Some(action) = config.action(&args.action) else {
        bail!("unknown action: {}", args.action);
    };

    if args.json {
        let report = GroundingReport::new(&analysis, action);
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("=== Kata Analyzer ({}) ===", env!("GIT_VERSION"));
    println!("アクション: {} ({})", action.label, args.action);
    println!("フレーム数: {}", sequence.len());
    println!();

    println!("キーフレーム:");
    let kf = &analysis.keyframes;
    for (name, value) in [
        ("start", kf.start),
        ("peak_displacement", kf.peak_displacement),
        ("release", kf.release),
        ("end", kf.end),
    ] {
        match value {
            Some(pos) => println!("  {:<18} frame {}", name, pos),
            None => println!("  {:<18} (検出できず)", name),
        }
    }
    for diag in &analysis.diagnostics {
        println!("  ! {}", diag);
    }
    println!();

    println!("メトリクス:");
    for def in &action.metrics {
        match analysis.metrics.value(&def.name) {
            Some(value) => {
                println!(
                    "  {:<20} {:>8.2}{}  (理想 {:.1}〜{:.1})",
                    def.label,
                    value,
                    def.unit.suffix(),
                    def.ideal[0],
                    def.ideal[1]
                )
            }
            None => println!("  {:<20} 算出不能", def.label),
        }
    }
    println!();

    println!(
        "総合スコア: {} / 100  (confidence {:.2})",
        analysis.score.overall, analysis.score.confidence
    );
    for (category, score) in &analysis.score.breakdown {
        println!("  {:<12} {:>5.1}", category, score);
    }
    println!();

    if analysis.flaws.is_empty() {
        println!("検出された欠陥はありません");
    } else {
        println!("検出された欠陥 ({}件):", analysis.flaws.len());
        for flaw in &analysis.flaws {
            let risk = if flaw.injury_risk { " [傷害リスク]" } else { "" };
            println!(
                "  [{}]{} {} — 実測 {:.2} (理想 {:.1}〜{:.1})",
                flaw.severity.label(),
                risk,
                flaw.title,
                flaw.observed,
                flaw.ideal[0],
                flaw.ideal[1]
            );
            println!("      → {}", flaw.correction);
            if let Some(drill) = &flaw.drill {
                println!("      ドリル: {}", drill);
            }
        }
    }

    Ok(())
}
