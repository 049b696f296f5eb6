use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use fido::{parse_description, Parcel, ParseResult, ParserConfig, Source, Widget};

#[derive(Parser)]
#[command(name = "fido", about = "Pull labeled links and widgets out of video descriptions")]
struct Cli {
    /// TOML config file (FIDO_* env vars are layered on top)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Host of the page the description came from, e.g. www.youtube.com
    #[arg(long, global = true)]
    host: Option<String>,
    /// Keep inferred labels on platform widgets
    #[arg(long, global = true)]
    keep_platform_labels: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Description file ("-" reads stdin)
    path: PathBuf,
    /// Input is extracted plain text rather than HTML
    #[arg(long)]
    text: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full parse result as JSON
    Parse {
        #[command(flatten)]
        input: Input,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Table of every link with its inferred label
    Links {
        #[command(flatten)]
        input: Input,
    },
    /// Show the annotated lines
    Lines {
        #[command(flatten)]
        input: Input,
    },
    /// Parse many descriptions in parallel, one JSON line per file
    Batch {
        /// Description files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Inputs are extracted plain text rather than HTML
        #[arg(long)]
        text: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut cfg = ParserConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        cfg.page_host = Some(host);
    }
    if cli.keep_platform_labels {
        cfg.keep_platform_label = true;
    }

    let result = match cli.command {
        Commands::Parse { input, compact } => {
            let parsed = parse_input(&input, &cfg)?;
            let json = if compact {
                serde_json::to_string(&parsed)?
            } else {
                serde_json::to_string_pretty(&parsed)?
            };
            println!("{}", json);
            Ok(())
        }
        Commands::Links { input } => {
            let parsed = parse_input(&input, &cfg)?;
            let links = &parsed.links;
            if links.is_empty() {
                println!("No links found.");
                return Ok(());
            }

            println!("{:>3} | {:<28} | {:<10} | {}", "#", "Label", "Widget", "URL");
            println!("{}", "-".repeat(90));
            for (i, link) in links.iter().enumerate() {
                let label = link.label.as_deref().unwrap_or("-");
                println!(
                    "{:>3} | {:<28} | {:<10} | {}",
                    i + 1,
                    clip(label, 28),
                    widget_kind(&parsed, &link.url),
                    link.url
                );
            }
            println!("\n{} links, {} widgets", links.len(), parsed.widgets.len());
            Ok(())
        }
        Commands::Lines { input } => {
            let parsed = parse_input(&input, &cfg)?;
            for (i, line) in parsed.source.annotated_text.lines().iter().enumerate() {
                let rendered: Vec<String> = line
                    .parcels()
                    .iter()
                    .map(|p| match p {
                        Parcel::Text(t) => format!("{:?}", t),
                        Parcel::Link(url) => format!("<{}>", url),
                    })
                    .collect();
                println!("{:>4} | {}", i + 1, rendered.join(" "));
            }
            Ok(())
        }
        Commands::Batch { paths, text } => {
            let counts = run_batch(&paths, text, &cfg)?;
            counts.print();
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", elapsed_label(elapsed));
    }

    result
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read description from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn parse_input(input: &Input, cfg: &ParserConfig) -> Result<ParseResult> {
    let raw = read_input(&input.path)?;
    parse_raw(&raw, input.text, cfg)
        .with_context(|| format!("Failed to parse {}", input.path.display()))
}

fn parse_raw(raw: &str, text: bool, cfg: &ParserConfig) -> Result<ParseResult> {
    let source = if text { Source::Text(raw) } else { Source::Html(raw) };
    Ok(parse_description(source, cfg)?)
}

fn widget_kind<'a>(parsed: &'a ParseResult, url: &str) -> &'a str {
    parsed
        .widgets
        .iter()
        .find_map(|w| match w {
            Widget::Platform { platform, url: u, .. } if u == url => Some(platform.as_str()),
            _ => None,
        })
        .unwrap_or("unknown")
}

struct BatchCounts {
    files: usize,
    failed: usize,
    links: usize,
    platform: usize,
}

impl BatchCounts {
    fn print(&self) {
        eprintln!(
            "Parsed {} files ({} failed): {} links, {} platform widgets.",
            self.files, self.failed, self.links, self.platform,
        );
    }
}

fn run_batch(paths: &[PathBuf], text: bool, cfg: &ParserConfig) -> Result<BatchCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let results: Vec<_> = paths
        .par_iter()
        .map(|path| {
            let parsed = read_input(path).and_then(|raw| parse_raw(&raw, text, cfg));
            pb.inc(1);
            (path, parsed)
        })
        .collect();
    pb.finish_and_clear();

    let mut counts = BatchCounts {
        files: results.len(),
        failed: 0,
        links: 0,
        platform: 0,
    };

    for (path, parsed) in results {
        match parsed {
            Ok(parsed) => {
                for widget in &parsed.widgets {
                    match widget {
                        Widget::Platform { .. } => {
                            counts.platform += 1;
                            counts.links += 1;
                        }
                        Widget::Unknown { links } => counts.links += links.len(),
                    }
                }
                let line = serde_json::json!({
                    "path": path.display().to_string(),
                    "widgets": parsed.widgets,
                });
                println!("{}", line);
            }
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                counts.failed += 1;
            }
        }
    }

    Ok(counts)
}

fn clip(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

fn elapsed_label(d: std::time::Duration) -> String {
    if d.as_secs() < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", d.as_secs() / 60, d.as_secs() % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_long_labels() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("a very long label indeed", 6), "a very...");
        assert_eq!(clip("\u{25ba}\u{25ba}\u{25ba}", 2), "\u{25ba}\u{25ba}...");
    }

    #[test]
    fn durations() {
        assert_eq!(elapsed_label(std::time::Duration::from_millis(1500)), "1.5s");
        assert_eq!(elapsed_label(std::time::Duration::from_secs(75)), "1m 15s");
    }

    #[test]
    fn batch_counts_fixtures() {
        let paths = vec![
            PathBuf::from("tests/fixtures/description.txt"),
            PathBuf::from("tests/fixtures/missing.txt"),
        ];
        let counts = run_batch(&paths, true, &ParserConfig::default()).unwrap();
        assert_eq!(counts.files, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.platform, 1);
        assert_eq!(counts.links, 5);
    }

    #[test]
    fn widget_kind_lookup() {
        let parsed = parse_raw("https://patreon.com/x\nhttps://a.test", true, &ParserConfig::default()).unwrap();
        assert_eq!(widget_kind(&parsed, "https://patreon.com/x"), "patreon");
        assert_eq!(widget_kind(&parsed, "https://a.test"), "unknown");
    }
}
