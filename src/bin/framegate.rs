use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framegate::{
    DecodeResult, Decoder, DecoderOptions, LogLevel, NalHeader, NalUnitReader, ProgressCallback,
    ProgressInfo, StreamOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framegate decode input.evc\n  framegate decode input.evc --out frames --progress --verbose\n  framegate units input.evc --json\n  framegate completions zsh > _framegate";

#[derive(Debug, Parser)]
#[command(
    name = "framegate",
    version,
    about = "Decode length-prefixed video bitstreams into raw YUV planes",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Decoder worker thread count (0 lets the decoder choose).
    #[arg(long, global = true)]
    threads: Option<i32>,

    /// Decoder name passed to FFmpeg.
    #[arg(long, global = true)]
    codec: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decode every unit of a length-prefixed stream.
    #[command(
        about = "Decode a length-prefixed bitstream",
        after_help = "Examples:\n  framegate decode input.evc\n  framegate decode input.evc --out frames --json"
    )]
    Decode {
        /// Input stream path.
        input: PathBuf,
        /// Directory for raw planes (.yuv) and luma previews (.png).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print a machine-readable JSON report.
        #[arg(long)]
        json: bool,
        /// Do not drain buffered pictures at end of stream.
        #[arg(long)]
        no_drain: bool,
        /// Largest accepted NAL unit in bytes.
        #[arg(long)]
        max_unit_size: Option<usize>,
    },

    /// List the NAL units of a stream without decoding.
    #[command(
        about = "List NAL units",
        after_help = "Examples:\n  framegate units input.evc\n  framegate units input.evc --json"
    )]
    Units {
        /// Input stream path.
        input: PathBuf,
        /// Print a machine-readable JSON report.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_log_level(value: &str) -> Option<LogLevel> {
    value.parse::<LogLevel>().ok()
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed = parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?;
        framegate::engine::ffmpeg::initialize()?;
        framegate::set_engine_log_level(parsed);
    }
    Ok(())
}

fn decoder_options(global: &GlobalOptions) -> Result<DecoderOptions, Box<dyn std::error::Error>> {
    let mut options = DecoderOptions::new();
    if let Some(threads) = global.threads {
        if threads < 0 {
            return Err(format!("--threads must be non-negative, got {threads}").into());
        }
        options = options.with_threads(threads);
    }
    if let Some(codec) = &global.codec {
        options = options.with_codec(codec.clone());
    }
    options.validate()?;
    Ok(options)
}

fn prepare_output_dir(out: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if out.exists() {
        if !overwrite {
            return Err(format!(
                "output directory already exists: {} (use --overwrite)",
                out.display()
            )
            .into());
        }
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("writing into existing directory {}", out.display()).yellow()
        );
    }
    fs::create_dir_all(out)?;
    Ok(())
}

fn describe_frame(result: &DecodeResult) -> String {
    match &result.frame {
        Some(frame) => format!(
            "Frame:{} Slice:{} color:{} {}-bit {}x{}",
            result.nalu_type,
            result.slice_type,
            frame.color_format,
            frame.bit_depth,
            frame.width,
            frame.height
        ),
        None => format!("Frame:{} (no output)", result.nalu_type),
    }
}

fn frame_json(index: u64, result: &DecodeResult) -> serde_json::Value {
    let frame = result.frame.as_ref();
    json!({
        "index": index,
        "status": result.status.as_raw(),
        "nalu_type": result.nalu_type.to_string(),
        "slice_type": result.slice_type.to_string(),
        "color_format": frame.map(|frame| frame.color_format.to_string()),
        "bit_depth": frame.map(|frame| frame.bit_depth),
        "width": frame.map(|frame| frame.width),
        "height": frame.map(|frame| frame.height),
        "crop": frame.map(|frame| json!({
            "top": frame.crop.top,
            "right": frame.crop.right,
            "bottom": frame.crop.bottom,
            "left": frame.crop.left,
        })),
        "sizes": frame.map(|frame| [frame.y.size(), frame.u.size(), frame.v.size()]),
        "strides": frame.map(|frame| [frame.y.stride, frame.u.stride, frame.v.stride]),
    })
}

/// Mirrors stream progress onto an indicatif bar measured in bytes.
struct TerminalProgress {
    bar: ProgressBar,
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.bytes);
        self.bar.set_message(format!("{} frames", info.frames));
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Decode {
            input,
            out,
            json,
            no_drain,
            max_unit_size,
        } => {
            if let Some(out) = &out {
                prepare_output_dir(out, cli.global.overwrite)?;
            }

            let options = decoder_options(&cli.global)?;
            let mut decoder = Decoder::with_options(&options)?;
            if cli.global.verbose {
                eprintln!(
                    "decoding {} with {} ({} threads)",
                    input.display(),
                    options.codec,
                    options.threads
                );
            }

            let file = File::open(&input)?;
            let total_bytes = file.metadata()?.len();
            let reader = BufReader::new(file);

            let mut stream_options = StreamOptions::new().with_drain_at_end(!no_drain);
            if let Some(limit) = max_unit_size {
                stream_options = stream_options.with_max_unit_size(limit);
            }
            let progress_bar = if cli.global.progress {
                let pb = ProgressBar::new(total_bytes);
                let style = ProgressStyle::with_template(
                    "{spinner:.green} {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}",
                )?;
                pb.set_style(style.progress_chars("##-"));
                stream_options = stream_options.with_progress(Arc::new(TerminalProgress {
                    bar: pb.clone(),
                }));
                Some(pb)
            } else {
                None
            };

            let mut reports = Vec::new();
            let mut index = 0_u64;
            let summary = decoder.decode_stream(reader, &stream_options, |result| {
                if json {
                    reports.push(frame_json(index, &result));
                } else {
                    let line = describe_frame(&result);
                    match &progress_bar {
                        Some(pb) => pb.println(line),
                        None => println!("{line}"),
                    }
                }

                if let (Some(dir), Some(frame)) = (&out, &result.frame) {
                    let raw_path = dir.join(format!("frame_{index:06}.yuv"));
                    let mut writer = BufWriter::new(File::create(&raw_path)?);
                    frame.write_planes(&mut writer)?;
                    writer.flush()?;

                    let preview_path = dir.join(format!("frame_{index:06}_luma.png"));
                    frame.luma_image().save(&preview_path)?;
                    if cli.global.verbose {
                        eprintln!("saved frame {} -> {}", index, raw_path.display());
                    }
                }

                index += 1;
                Ok(())
            })?;

            if let Some(pb) = progress_bar {
                pb.finish_with_message("done");
            }

            if json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "units": summary.units,
                    "bytes": summary.bytes,
                    "frames": summary.frames,
                    "unavailable": summary.unavailable,
                    "decoded": reports,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!(
                        "Decoded {} frame(s) from {} unit(s)",
                        summary.frames, summary.units
                    )
                    .green()
                );
            }
            decoder.close();
        }
        Commands::Units { input, json } => {
            let reader = NalUnitReader::new(BufReader::new(File::open(&input)?));
            let mut units = Vec::new();
            for (index, unit) in reader.enumerate() {
                let unit = unit?;
                let header = NalHeader::parse(&unit);
                if json {
                    units.push(json!({
                        "index": index,
                        "size": unit.len(),
                        "nalu_type": header.map(|header| header.unit_type.to_string()),
                        "temporal_id": header.map(|header| header.temporal_id),
                    }));
                } else {
                    match header {
                        Some(header) => println!(
                            "#{index:<6} {:<7} tid={} {} bytes",
                            header.unit_type.to_string(),
                            header.temporal_id,
                            unit.len()
                        ),
                        None => println!(
                            "#{index:<6} {:<7} {} bytes",
                            "invalid".red(),
                            unit.len()
                        ),
                    }
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&json!({ "units": units }))?);
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framegate", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use framegate::{
        ColorFormat, DecodeResult, Decoder, EngineLedger, NalUnitType, PullScript, ScriptedEngine,
        ScriptedPicture, SliceType, SubmitScript,
    };

    use super::{Cli, Commands, GlobalOptions, decoder_options, describe_frame, parse_log_level};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_decode_with_global_flags() {
        let cli = Cli::try_parse_from([
            "framegate",
            "decode",
            "input.evc",
            "--threads",
            "2",
            "--codec",
            "libxevd",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.global.threads, Some(2));
        assert_eq!(cli.global.codec.as_deref(), Some("libxevd"));
        match cli.command {
            Commands::Decode { input, json, .. } => {
                assert_eq!(input.to_str(), Some("input.evc"));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_log_level_aliases() {
        assert!(parse_log_level("warn").is_some());
        assert!(parse_log_level("WARNING").is_some());
        assert!(parse_log_level("trace").is_some());
        assert!(parse_log_level("loud").is_none());
    }

    #[test]
    fn negative_threads_are_rejected() {
        let global = GlobalOptions {
            threads: Some(-1),
            ..GlobalOptions::default()
        };
        assert!(decoder_options(&global).is_err());
    }

    #[test]
    fn describe_frame_matches_report_format() {
        let ledger = EngineLedger::new();
        let engine = ScriptedEngine::create(1, &ledger)
            .unwrap()
            .then_submit(SubmitScript::Accept {
                read: 3,
                nalu_type: NalUnitType::Idr,
                slice_type: SliceType::I,
            })
            .then_pull(PullScript::Deliver(ScriptedPicture::filled(
                16,
                8,
                8,
                ColorFormat::Ycbcr420,
            )));
        let mut decoder = Decoder::with_engine(engine);
        let result: DecodeResult = decoder.decode(&[0x04, 0x01, 0x00]).unwrap();
        assert_eq!(
            describe_frame(&result),
            "Frame:IDR Slice:I color:YCbCr420 8-bit 16x8"
        );
    }
}
