use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use looming_tracker::audio::{CpalOutput, CpalOutputFactory, OutputDevice};
use looming_tracker::calibration::{calibrate, ConsolePrompt};
use looming_tracker::config::SessionConfig;
use looming_tracker::error::SessionError;
use looming_tracker::session::{run_session, CalibratedLevels, SessionContext};
use looming_tracker::synth;
use looming_tracker::video::scripted::SessionManifest;
use looming_tracker::video::sink::AnnotationWriter;
use looming_tracker::video::{SourceId, VideoSource};

#[derive(Parser, Debug)]
#[command(
    name = "looming_tracker",
    about = "Region-triggered auditory looming task over a tracked video stream"
)]
struct Cli {
    /// Video source: scripted session manifest path, or capture device index
    source: Option<String>,
    /// Session configuration file (JSON); defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,
    /// Centroid record output path
    #[arg(long, default_value = "centroid.csv")]
    csv: PathBuf,
    /// Render log output path (frame overlays, mirrors source rate/size)
    #[arg(long, default_value = "output.jsonl")]
    render_log: PathBuf,
    /// Write the synthesized background/stimulus buffers as WAV files here
    #[arg(long)]
    dump_audio: Option<PathBuf>,
    /// Skip the interactive amplitude loop and use the configured defaults
    #[arg(long)]
    no_calibrate: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    looming_tracker::init_tracing();
    let cli = Cli::parse();

    let Some(raw_source) = cli.source else {
        print_usage();
        return Ok(ExitCode::SUCCESS);
    };

    let config = cli
        .config
        .as_deref()
        .map(SessionConfig::load_from_file)
        .unwrap_or_default();

    // Fatal-before-workers: source and writer must both open up front
    let source_id = SourceId::parse(&raw_source);
    let manifest = open_source(&source_id)?;
    let quit_after = manifest.quit_after();
    let (source, tracker, mut selector) = manifest.into_collaborators();

    let sink = AnnotationWriter::create(&cli.render_log, source.frame_rate(), source.frame_size())
        .with_context(|| format!("creating render log {}", cli.render_log.display()))?
        .with_quit_after(quit_after);

    let levels = if cli.no_calibrate {
        CalibratedLevels {
            background_min: config.calibration.background_min,
            stimulus_peak: config.calibration.stimulus_peak,
        }
    } else {
        calibrate_levels(&config)?
    };
    tracing::info!(
        "[Cli] Calibration confirmed: background {} / stimulus {}",
        levels.background_min,
        levels.stimulus_peak
    );

    if let Some(dir) = &cli.dump_audio {
        dump_audio(dir, &config, levels)?;
    }

    println!("Starting the tracking process.");
    let context = SessionContext::new(config.clone(), levels);
    let factory = CpalOutputFactory::new(config.audio.clone());
    let summary = run_session(
        source,
        tracker,
        sink,
        &mut selector,
        factory,
        &context,
        &cli.csv,
    )?;

    println!(
        "Finished tracking video: {} frames ({} tracked, {} lost), {} stimulus triggers",
        summary.frames, summary.tracked, summary.lost, summary.edges
    );
    Ok(ExitCode::SUCCESS)
}

fn print_usage() {
    println!(
        "Usage: looming_tracker <video_source>\n\
         examples:\n\
         \x20 looming_tracker fixtures/approach.json\n\
         \x20 looming_tracker 0"
    );
}

fn open_source(source_id: &SourceId) -> Result<SessionManifest> {
    match source_id {
        SourceId::Device(index) => {
            let err = SessionError::SourceUnavailable {
                source: format!("device {} (no live capture backend in this build)", index),
            };
            Err(err).context("opening video source")
        }
        SourceId::Path(path) => {
            SessionManifest::load(path).with_context(|| format!("opening {}", path.display()))
        }
    }
}

/// Run the two operator amplitude loops on a temporary output device,
/// released before any worker opens its own.
fn calibrate_levels(config: &SessionConfig) -> Result<CalibratedLevels> {
    let mut device =
        CpalOutput::open(&config.audio).context("opening calibration output device")?;
    let mut prompt = ConsolePrompt;
    let fs = config.audio.sample_rate;

    let background_min = calibrate(
        config.calibration.background_min,
        &mut device,
        &mut prompt,
        fs,
        &config.synth,
    )
    .context("calibrating background minimum amplitude")?;
    let stimulus_peak = calibrate(
        config.calibration.stimulus_peak,
        &mut device,
        &mut prompt,
        fs,
        &config.synth,
    )
    .context("calibrating stimulus peak amplitude")?;

    device.release();
    Ok(CalibratedLevels {
        background_min,
        stimulus_peak,
    })
}

fn dump_audio(dir: &PathBuf, config: &SessionConfig, levels: CalibratedLevels) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let fs_hz = config.audio.sample_rate;

    let background = synth::background_noise(levels.background_min, fs_hz, &config.synth);
    write_wav(&dir.join("background.wav"), &background, fs_hz)?;

    let stimulus = synth::stimulus_wave(
        levels.background_min,
        levels.stimulus_peak,
        fs_hz,
        &config.synth,
    );
    write_wav(&dir.join("stimulus.wav"), &stimulus, fs_hz)?;

    tracing::info!("[Cli] Dumped synthesized buffers to {}", dir.display());
    Ok(())
}

fn write_wav(path: &PathBuf, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("writing {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
