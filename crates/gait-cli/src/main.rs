use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gait_lib::{
    config::{read_config, PipelineConfig},
    dataset::FeatureTable,
    detectors::detect_peaks,
    io::{
        recording::{label_path, load_recording},
        text as text_io, write_atomic,
    },
    pipeline::{run_batch, spectral_table, time_table},
    repair::{read_corrections, repair_label_file, shift_interior_boundaries, RepairOutcome},
    segments::{activity_span, extract_segments},
    signal::{Channel, Label, Recording},
};
use log::{error, info};
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "gait",
    version,
    about = "Gait: accelerometer peak, segment and feature extraction tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ChannelArg {
    X,
    Y,
    Z,
    Magnitude,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::X => Channel::X,
            ChannelArg::Y => Channel::Y,
            ChannelArg::Z => Channel::Z,
            ChannelArg::Magnitude => Channel::Magnitude,
        }
    }
}

#[derive(clap::Args)]
struct RecordingArgs {
    /// Headerless `seq,x,y,z[,activity]` CSV; labels are read from the sibling .txt
    #[arg(long)]
    recording: PathBuf,
    #[arg(long, default_value_t = 52.0)]
    fs: f64,
    #[arg(long, value_enum, default_value = "y")]
    channel: ChannelArg,
    /// Only keep samples carrying this activity code
    #[arg(long)]
    activity: Option<Label>,
    /// Write the CSV table here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

impl RecordingArgs {
    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            sample_rate_hz: self.fs,
            channel: self.channel.into(),
            activity: self.activity,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Detect maxima/minima in newline-delimited samples read from stdin or --input file
    Peaks {
        #[arg(long)]
        delta: f64,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Collapse a per-sample label stream into contiguous segments
    Segments {
        /// Label file (one integer per line); stdin when omitted
        #[arg(long, conflicts_with = "recording")]
        labels: Option<PathBuf>,
        /// Sample file whose sibling .txt holds the labels
        #[arg(long)]
        recording: Option<PathBuf>,
        /// Print the first/last sample of this activity instead
        #[arg(long)]
        activity: Option<Label>,
    },
    /// Windowed peak-timing features, one CSV row per window
    TimeFeatures {
        #[command(flatten)]
        rec: RecordingArgs,
        #[arg(long, default_value_t = 5.0)]
        window_s: f64,
        #[arg(long, default_value_t = 25.0)]
        delta: f64,
    },
    /// Spectrogram peak features, one CSV row per slice
    SpectralFeatures {
        #[command(flatten)]
        rec: RecordingArgs,
        #[arg(long, default_value_t = 256)]
        nfft: usize,
        #[arg(long, default_value_t = 50.0)]
        delta: f64,
        #[arg(long, default_value_t = 3)]
        n_peaks: usize,
    },
    /// Rebuild label files from a TOML correction table
    Repair {
        #[arg(long)]
        corrections: PathBuf,
        /// Directory holding `<subject>.csv`; `<subject>.txt` is rewritten
        #[arg(long)]
        data_dir: PathBuf,
        /// Only repair this subject
        #[arg(long)]
        subject: Option<u32>,
        /// Shift interior boundaries by this many samples first
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        shift: i64,
    },
    /// Extract time and spectral tables for many recordings
    Batch {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Peaks { delta, input } => cmd_peaks(delta, input.as_deref())?,
        Commands::Segments {
            labels,
            recording,
            activity,
        } => cmd_segments(labels.as_deref(), recording.as_deref(), activity)?,
        Commands::TimeFeatures {
            rec,
            window_s,
            delta,
        } => {
            let mut cfg = rec.config();
            cfg.time.window_s = window_s;
            cfg.time.delta = delta;
            cmd_features(&rec, &cfg, time_table)?
        }
        Commands::SpectralFeatures {
            rec,
            nfft,
            delta,
            n_peaks,
        } => {
            let mut cfg = rec.config();
            cfg.spectral.nfft = nfft;
            cfg.spectral.delta = delta;
            cfg.spectral.n_peaks = n_peaks;
            cmd_features(&rec, &cfg, spectral_table)?
        }
        Commands::Repair {
            corrections,
            data_dir,
            subject,
            shift,
        } => cmd_repair(&corrections, &data_dir, subject, shift)?,
        Commands::Batch {
            config,
            out_dir,
            files,
        } => cmd_batch(config.as_deref(), &out_dir, &files)?,
    }
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_f64_series(path),
        None => text_io::parse_f64_series(&read_stdin()?),
    }
}

fn cmd_peaks(delta: f64, input: Option<&Path>) -> Result<()> {
    let samples = read_samples(input)?;
    let peaks = detect_peaks(&samples, delta)?;
    println!("{}", serde_json::to_string(&peaks)?);
    Ok(())
}

#[derive(Serialize)]
struct Span {
    label: Label,
    start: usize,
    end: usize,
}

fn cmd_segments(labels: Option<&Path>, recording: Option<&Path>, activity: Option<Label>) -> Result<()> {
    let labels = match (labels, recording) {
        (Some(path), _) => text_io::read_label_file(path)?,
        (None, Some(samples)) => text_io::read_label_file(&label_path(samples))?,
        (None, None) => text_io::parse_labels(&read_stdin()?)?,
    };
    match activity {
        Some(label) => {
            let (start, end) = activity_span(&labels, label)
                .with_context(|| format!("activity {} does not occur", label))?;
            println!("{}", serde_json::to_string(&Span { label, start, end })?);
        }
        None => println!("{}", serde_json::to_string(&extract_segments(&labels))?),
    }
    Ok(())
}

fn cmd_features(
    args: &RecordingArgs,
    cfg: &PipelineConfig,
    extract: fn(&Recording, &PipelineConfig) -> Result<FeatureTable>,
) -> Result<()> {
    cfg.validate()?;
    let rec = load_recording(&args.recording, cfg.sample_rate_hz)?;
    let table = extract(&rec, cfg)?;
    info!("{} rows from {}", table.len(), args.recording.display());
    match &args.out {
        Some(path) => write_atomic(path, |w| table.write_csv(w)),
        None => table.write_csv(io::stdout().lock()),
    }
}

#[derive(Serialize)]
struct RepairReport {
    subject: u32,
    #[serde(flatten)]
    outcome: RepairOutcome,
}

fn cmd_repair(corrections: &Path, data_dir: &Path, subject: Option<u32>, shift: i64) -> Result<()> {
    let table = read_corrections(corrections)?;
    let subjects = match subject {
        Some(id) => {
            if table.get(id).is_none() {
                anyhow::bail!("no correction for subject {} in {}", id, corrections.display());
            }
            vec![id]
        }
        None => table.subjects(),
    };
    let mut failed = 0;
    for id in subjects {
        let Some(segments) = table.get(id) else {
            continue;
        };
        let boundaries = shift_interior_boundaries(segments, shift);
        let samples = data_dir.join(format!("{}.csv", id));
        let out = label_path(&samples);
        match repair_label_file(&samples, &boundaries, &out) {
            Ok(outcome) => {
                let report = RepairReport { subject: id, outcome };
                println!("{}", serde_json::to_string(&report)?);
            }
            Err(err) => {
                error!("subject {}: {:#}", id, err);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} subject(s) could not be repaired", failed);
    }
    Ok(())
}

#[derive(Serialize)]
struct BatchFailureReport {
    path: PathBuf,
    error: String,
}

#[derive(Serialize)]
struct BatchReport {
    subjects: Vec<u32>,
    time_rows: usize,
    spectral_rows: usize,
    failures: Vec<BatchFailureReport>,
}

fn cmd_batch(config: Option<&Path>, out_dir: &Path, files: &[PathBuf]) -> Result<()> {
    let cfg = match config {
        Some(path) => read_config(path)?,
        None => PipelineConfig::default(),
    };
    let output = run_batch(files, &cfg)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    write_atomic(&out_dir.join("time_features.csv"), |w| {
        output.time.write_csv(w)
    })?;
    write_atomic(&out_dir.join("spectral_features.csv"), |w| {
        output.spectral.write_csv(w)
    })?;

    let report = BatchReport {
        subjects: output.subjects.clone(),
        time_rows: output.time.len(),
        spectral_rows: output.spectral.len(),
        failures: output
            .failures
            .iter()
            .map(|f| BatchFailureReport {
                path: f.path.clone(),
                error: format!("{:#}", f.error),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string(&report)?);
    if !output.failures.is_empty() {
        anyhow::bail!("{} of {} recordings failed", output.failures.len(), files.len());
    }
    Ok(())
}
