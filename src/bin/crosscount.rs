use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crosscount::{CounterConfig, Counting, Detection, LineCounter};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Counts tracked objects crossing a line, reading detections from a dump
/// file with one `<frame>:<json array>` line per frame.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Detections dump
    input: PathBuf,

    /// JSON config, defaults are used for missing fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    iou_threshold: Option<f32>,

    #[arg(long)]
    max_age: Option<u32>,

    #[arg(long)]
    min_hits: Option<u32>,

    /// Counting line as x1,y1,x2,y2
    #[arg(long, value_delimiter = ',', num_args = 4)]
    line: Option<Vec<f32>>,

    /// Half width of the band around the counting line
    #[arg(long)]
    tolerance: Option<f32>,

    /// Write the summary here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit the summary as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(args: &Args) -> anyhow::Result<CounterConfig> {
    let mut config = match &args.config {
        Some(path) => CounterConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CounterConfig::default(),
    };

    if let Some(v) = args.iou_threshold {
        config.iou_threshold = v;
    }

    if let Some(v) = args.max_age {
        config.max_age = v;
    }

    if let Some(v) = args.min_hits {
        config.min_hits = v;
    }

    if let Some(line) = &args.line {
        config.line.start = [line[0], line[1]];
        config.line.end = [line[2], line[3]];
    }

    if let Some(v) = args.tolerance {
        config.line.tolerance = v;
    }

    config.validate()?;

    Ok(config)
}

fn parse_line(line: &str) -> anyhow::Result<(u64, Vec<Detection>)> {
    let (frame, dets) = line
        .split_once(':')
        .context("wrong file format: expected `:`")?;

    let frame = frame
        .trim()
        .parse()
        .context("wrong file format: parse frame number failed")?;

    let dets = serde_json::from_str(dets).context("wrong file format: parse json failed")?;

    Ok((frame, dets))
}

#[derive(Debug, Default, PartialEq)]
struct ReplayStats {
    frames: usize,
    skipped: usize,
    last_frame: Option<u64>,
}

/// Feeds every frame of a dump to `counter`.
///
/// Malformed and out of order lines are skipped. Missing frames are replayed
/// as empty ones so that tracks keep aging, but at most `max_age + 1` of them:
/// every track is evicted by then. The counter's own frame number therefore
/// trails the dump's numbering after a long gap.
fn replay<R: BufRead>(
    reader: R,
    counter: &mut LineCounter,
    max_age: u32,
) -> anyhow::Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        let (frame, dets) = match parse_line(line) {
            Ok(v) => v,
            Err(err) => {
                warn!(line = lineno + 1, "{:#}", err);
                stats.skipped += 1;
                continue;
            }
        };

        if let Some(last) = stats.last_frame {
            if frame <= last {
                warn!(line = lineno + 1, frame, last, "frame out of order, skipped");
                stats.skipped += 1;
                continue;
            }

            let gap = (frame - last - 1).min(u64::from(max_age) + 1);
            for _ in 0..gap {
                counter.process(&[]);
            }
        }
        stats.last_frame = Some(frame);
        stats.frames += 1;

        let out = counter.process(&dets);
        for id in out.newly_counted {
            info!(frame, id, total = counter.tally().total(), "counted");
        }
    }

    Ok(stats)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crosscount=info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let mut counter = LineCounter::new(&config)?;

    info!(
        iou_threshold = config.iou_threshold,
        max_age = config.max_age,
        min_hits = config.min_hits,
        "counter ready"
    );

    let file = std::fs::File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;

    let stats = replay(std::io::BufReader::new(file), &mut counter, config.max_age)?;
    info!(
        frames = stats.frames,
        skipped = stats.skipped,
        last_frame = ?stats.last_frame,
        total = counter.tally().total(),
        "dump processed"
    );

    let summary = counter.summary();
    let text = if args.json {
        serde_json::to_string_pretty(&summary)?
    } else {
        summary.to_string()
    };

    match &args.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", text),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAR: &str = r#"{"x1":100,"y1":100,"x2":140,"y2":130,"p":0.9,"c":2}"#;

    fn run(dump: &str) -> (LineCounter, ReplayStats) {
        let config = CounterConfig::default();
        let mut counter = LineCounter::new(&config).unwrap();
        let stats = replay(dump.as_bytes(), &mut counter, config.max_age).unwrap();

        (counter, stats)
    }

    fn frames(range: std::ops::RangeInclusive<u64>) -> String {
        range.map(|f| format!("{}:[{}]\n", f, CAR)).collect()
    }

    #[test]
    fn parses_frame_and_detections() {
        let (frame, dets) = parse_line(&format!("42:[{}]", CAR)).unwrap();

        assert_eq!(frame, 42);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class, 2);
        assert_eq!(dets[0].x2, 140.0);

        assert!(parse_line("42 [1, 2]").is_err());
        assert!(parse_line("x:[]").is_err());
        assert!(parse_line("3:{").is_err());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dump = format!("1:[{c}]\ngarbage\n2:[{c}\n\n3:[{c}]\n4:[{c}]\n", c = CAR);
        let (counter, stats) = run(&dump);

        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.last_frame, Some(4));

        // frame 2 replayed as empty
        let tracks = counter.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].hits, 3);
    }

    #[test]
    fn out_of_order_frames_are_skipped() {
        let dump = format!("1:[{c}]\n2:[{c}]\n2:[{c}]\n1:[]\n3:[{c}]\n", c = CAR);
        let (counter, stats) = run(&dump);

        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.frames, 3);
        assert_eq!(counter.frame(), 3);
        assert_eq!(counter.tracks()[0].hits, 3);
    }

    #[test]
    fn short_gap_keeps_identity() {
        let (counter, _) = run(&(frames(1..=3) + &frames(10..=10)));

        let ids: Vec<_> = counter.tracks().iter().map(|t| t.track_id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(counter.frame(), 10);
    }

    #[test]
    fn gap_longer_than_max_age_evicts() {
        let (counter, _) = run(&(frames(1..=3) + &frames(30..=30)));

        let ids: Vec<_> = counter.tracks().iter().map(|t| t.track_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn huge_gap_is_bounded() {
        let (counter, stats) = run("0:[]\n1000000000000:[]\n");

        assert_eq!(stats.last_frame, Some(1_000_000_000_000));
        // one frame, max_age + 1 empty frames, one frame
        assert_eq!(counter.frame(), 23);
    }
}
