use std::{
    fs,
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use clap::{CommandFactory, Parser, error::ErrorKind};
use colored::Colorize;
use framedump::{
    DEFAULT_FILE_PREFIX, DEFAULT_FRAME_LIMIT, DEFAULT_OUTPUT_DIRECTORY, ExtractOptions, ExtractionReport,
    FfmpegLogLevel, FrameExtractor, ProgressCallback, ProgressInfo, SilentSink, StopReason,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framedump input.mp4\n  framedump input.mkv --out stills --limit 24 --progress\n  framedump input.mp4 --json --quiet";

#[derive(Debug, Parser)]
#[command(
    name = "framedump",
    version,
    about = "Write the first frames of a video as PNG images",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input media file.
    input: PathBuf,

    /// Output directory, created if missing.
    #[arg(long, default_value = DEFAULT_OUTPUT_DIRECTORY)]
    out: PathBuf,

    /// Stop once the frame counter passes this value (writes limit + 1 frames).
    #[arg(long, default_value_t = DEFAULT_FRAME_LIMIT)]
    limit: u64,

    /// File name prefix for `<prefix>-<n>.png`.
    #[arg(long, default_value = DEFAULT_FILE_PREFIX)]
    prefix: String,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// Do not drain delayed frames from the decoder at end of stream.
    #[arg(long)]
    no_flush: bool,

    /// Show debug logging output.
    #[arg(long, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress pipeline diagnostics.
    #[arg(long)]
    quiet: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,

    /// Print the extraction report as JSON.
    #[arg(long)]
    json: bool,
}

struct BarProgress {
    bar: ProgressBar,
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.current);
        if let Some(name) = info.output_path.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn build_options(cli: &Cli, progress_bar: Option<&ProgressBar>) -> ExtractOptions {
    let mut options = ExtractOptions::new()
        .with_output_directory(&cli.out)
        .with_file_prefix(cli.prefix.clone())
        .with_frame_limit(cli.limit)
        .with_overwrite(cli.overwrite)
        .with_flush_decoder(!cli.no_flush);

    if cli.quiet {
        options = options.with_diagnostics(Arc::new(SilentSink));
    }

    if let Some(bar) = progress_bar {
        options = options.with_progress(Arc::new(BarProgress { bar: bar.clone() }));
    }

    options
}

fn report_json(input: &Path, report: &ExtractionReport) -> serde_json::Value {
    let stop_reason = match report.stop_reason {
        StopReason::FrameLimit => "frame_limit",
        StopReason::EndOfStream => "end_of_stream",
    };
    let outputs: Vec<String> = report.outputs.iter().map(|path| path.display().to_string()).collect();

    json!({
        "input": input.display().to_string(),
        "format": report.container.format_name,
        "duration_seconds": report.container.duration().map(|duration| duration.as_secs_f64()),
        "video_stream_index": report.video_stream_index,
        "codec": report.codec_name,
        "frames_written": report.frames_written,
        "packets_read": report.packets_read,
        "packets_discarded": report.packets_discarded,
        "stop_reason": stop_reason,
        "outputs": outputs,
    })
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) if error.kind() == ErrorKind::MissingRequiredArgument => {
            println!("{}", Cli::command().render_usage());
            println!("Writes the first frames of <INPUT> as PNG images. Try --help for all options.");
            process::exit(1);
        }
        Err(error) => error.exit(),
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &cli.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        framedump::set_ffmpeg_log_level(parsed);
    }

    fs::create_dir_all(&cli.out)?;

    let progress_bar = if cli.progress {
        let bar = ProgressBar::new(cli.limit.saturating_add(1));
        let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Some(bar)
    } else {
        None
    };

    let options = build_options(&cli, progress_bar.as_ref());
    let report = FrameExtractor::new(options).run(&cli.input)?;

    if let Some(bar) = progress_bar {
        bar.finish_with_message("done");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&cli.input, &report))?);
    } else {
        println!(
            "{} {}",
            "success:".green().bold(),
            format!(
                "Wrote {} frame(s) from stream {} ({}) to {}",
                report.frames_written,
                report.video_stream_index,
                report.codec_name,
                cli.out.display()
            )
            .green()
        );
    }

    Ok(())
}

fn main() {
    let cli = parse_cli();
    init_logging(&cli);

    if let Err(error) = run(cli) {
        eprintln!("{} {error}", "error:".red().bold());
        process::exit(1);
    }
}
