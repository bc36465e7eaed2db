//! # avbridge probe
//!
//! Loads the FFmpeg libraries, prints what was found, and optionally inspects and decodes
//! one input.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use avbridge_core::{
    diagnostics, DecodeDispatcher, DecodedPicture, DispatchStats, KeyframeIndex, LoaderConfig,
    Session,
};

struct ProbeOptions {
    config: Option<PathBuf>,
    search_path: Option<PathBuf>,
    input: Option<String>,
    frames: u64,
    json: bool,
    index: bool,
}

/// Everything a `--json` run prints, as one document.
#[derive(Serialize)]
struct ProbeReport {
    libraries: Vec<avbridge_core::LibraryStatus>,
    decode_api: &'static str,
    load_log: Vec<String>,
    input: Option<String>,
    streams: Vec<String>,
    keyframes: Option<KeyframeIndex>,
    pictures: Vec<DecodedPicture>,
    stats: Option<DispatchStats>,
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("avbridge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("avbridge probe v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &options.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::load_default()?,
    };
    if let Some(path) = &options.search_path {
        config = config.with_search_path(path.clone());
    }

    let session = match Session::load(&config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            if let avbridge_core::AvError::Load(avbridge_core::LoadError::NoCompatibleLibrary {
                log,
            }) = &e
            {
                for line in log {
                    eprintln!("  {}", line);
                }
            }
            return Err(e.into());
        }
    };

    let mut report = ProbeReport {
        libraries: session.library_status(),
        decode_api: session.functions().avcodec.decode.name(),
        load_log: session.log().lines(),
        input: options.input.clone(),
        streams: Vec::new(),
        keyframes: None,
        pictures: Vec::new(),
        stats: None,
    };
    if !options.json {
        print!("{}", session.library_report());
    }

    if let Some(input) = &options.input {
        probe_input(&session, input, &options, &mut report)?;
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    for line in diagnostics::native_log() {
        tracing::debug!("native: {}", line.display());
    }
    Ok(())
}

fn probe_input(
    session: &Session,
    input: &str,
    options: &ProbeOptions,
    report: &mut ProbeReport,
) -> Result<()> {
    let mut dispatcher = DecodeDispatcher::new(session);
    dispatcher.open(input)?;
    dispatcher.select_video_stream()?;

    if let Some(format) = dispatcher.format() {
        let container = format.info_text()?;
        if !options.json {
            println!("\n== Container ==\n{}", container);
        }
        for stream in format.streams()? {
            let text = stream.info_text()?;
            if !options.json {
                println!("== Stream {} ==\n{}", stream.index(), text);
            }
            report.streams.push(text);
        }
    }

    dispatcher.configure_decoder()?;

    if options.index {
        let index = dispatcher.scan_keyframes()?;
        if !options.json {
            println!(
                "Keyframes: {} in {} video frames",
                index.keyframes.len(),
                index.frame_count
            );
            for keyframe in index.keyframes.iter().take(20) {
                println!("  frame {} dts {}", keyframe.frame_number, keyframe.dts);
            }
        }
        report.keyframes = Some(index);
    }

    let started = Instant::now();
    while (report.pictures.len() as u64) < options.frames {
        let Some(picture) = dispatcher.next_frame()? else {
            break;
        };
        if !options.json {
            println!(
                "frame {:>5}  pts {:>8}  {:?}{}  {}x{}  mvs {}",
                picture.frame_number,
                picture.info.pts,
                picture.info.picture_type,
                if picture.info.key_frame { " key" } else { "" },
                picture.info.width,
                picture.info.height,
                picture.motion_vectors.len()
            );
        }
        report.pictures.push(picture);
    }

    tracing::info!(
        "Decoded {} frames in {} ms ({})",
        report.pictures.len(),
        started.elapsed().as_millis(),
        dispatcher.strategy_name().unwrap_or("no decoder")
    );
    report.stats = Some(dispatcher.stats().clone());
    dispatcher.close()?;
    Ok(())
}

fn parse_args(args: &[String]) -> Result<ProbeOptions> {
    let mut options = ProbeOptions {
        config: None,
        search_path: None,
        input: None,
        frames: 10,
        json: false,
        index: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("Missing value for --config"))?;
                options.config = Some(PathBuf::from(value));
                i += 2;
            }
            "--search-path" | "-s" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("Missing value for --search-path"))?;
                options.search_path = Some(PathBuf::from(value));
                i += 2;
            }
            "--input" | "-i" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("Missing value for --input"))?;
                options.input = Some(value.clone());
                i += 2;
            }
            "--frames" | "-n" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("Missing value for --frames"))?;
                options.frames = value
                    .parse::<u64>()
                    .map_err(|e| anyhow::anyhow!("Invalid frame count {}: {}", value, e))?;
                i += 2;
            }
            "--json" => {
                options.json = true;
                i += 1;
            }
            "--index" => {
                options.index = true;
                i += 1;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                print_usage();
                return Err(anyhow::anyhow!("Unknown argument {}", other));
            }
        }
    }
    Ok(options)
}

fn print_usage() {
    eprintln!(
        "\nUsage:\n  avbridge-probe [--config <file>] [--search-path <dir>] [--input <file>] \
         [--frames <n>] [--index] [--json]\n"
    );
}
