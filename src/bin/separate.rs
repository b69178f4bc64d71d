//! Separation tool invoked by the local backend as `separate <input> <output_dir>`.
//!
//! Runs Demucs in two-stem mode, then converts the stems to
//! `<output_dir>/vocals.mp3` and `<output_dir>/instrumental.mp3` with FFmpeg.
//! Exits non-zero on any failure.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "separate", about = "Split an audio file into vocal and instrumental MP3s")]
struct Args {
    /// Audio file to separate
    input: PathBuf,

    /// Directory that receives vocals.mp3 and instrumental.mp3
    output_dir: PathBuf,

    /// Demucs model name
    #[arg(long, env = "SEPARATION_MODEL", default_value = "demucs_quantized")]
    model: String,

    #[arg(long, env = "DEMUCS_BIN", default_value = "demucs")]
    demucs: String,

    #[arg(long, env = "FFMPEG_BIN", default_value = "ffmpeg")]
    ffmpeg: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => {
            tracing::info!(
                output_dir = %args.output_dir.display(),
                "Separation and conversion completed"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            let cause = format!("{e:#}");
            tracing::error!(error = %cause, "Separation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    if !args.input.is_file() {
        bail!("input file not found: {}", args.input.display());
    }

    // Demucs names its output directory after the input stem; keep it shell-safe.
    let (input, copied) = match sanitized_path(&args.input) {
        Some(safe) => {
            std::fs::copy(&args.input, &safe)
                .with_context(|| format!("failed to copy input to {}", safe.display()))?;
            tracing::info!(path = %safe.display(), "Sanitized input copied");
            (safe, true)
        }
        None => (args.input.clone(), false),
    };

    let result = separate(args, &input);

    if copied {
        if let Err(e) = std::fs::remove_file(&input) {
            tracing::warn!(path = %input.display(), error = %e, "Failed to remove sanitized copy");
        }
    }

    result
}

fn separate(args: &Args, input: &Path) -> Result<()> {
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;
    let output_dir = std::fs::canonicalize(&args.output_dir)?;

    let mut demucs = Command::new(&args.demucs);
    demucs
        .args(["--two-stems", "vocals", "--model", args.model.as_str(), "-o"])
        .arg(&output_dir)
        .arg(input);
    run_command(&mut demucs, "demucs")?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .context("input has no file name")?;
    let stems_dir = output_dir.join(&args.model).join(stem);

    let vocals_wav = stems_dir.join("vocals.wav");
    if !vocals_wav.is_file() {
        bail!("vocals WAV file not found: {}", vocals_wav.display());
    }
    let instrumental_wav = find_accompaniment(&stems_dir).with_context(|| {
        format!("instrumental WAV file not found in {}", stems_dir.display())
    })?;

    convert_to_mp3(&args.ffmpeg, &vocals_wav, &output_dir.join("vocals.mp3"))?;
    convert_to_mp3(&args.ffmpeg, &instrumental_wav, &output_dir.join("instrumental.mp3"))?;

    Ok(())
}

fn convert_to_mp3(ffmpeg: &str, wav: &Path, mp3: &Path) -> Result<()> {
    let mut cmd = Command::new(ffmpeg);
    cmd.arg("-y")
        .arg("-i")
        .arg(wav)
        .args(["-acodec", "libmp3lame", "-qscale:a", "2"])
        .arg(mp3);
    run_command(&mut cmd, "ffmpeg")?;
    tracing::info!(from = %wav.display(), to = %mp3.display(), "Converted to MP3");
    Ok(())
}

fn run_command(cmd: &mut Command, label: &str) -> Result<()> {
    tracing::info!(command = ?cmd, "Running {label}");
    let output = cmd
        .output()
        .with_context(|| format!("failed to start {label}"))?;

    if !output.status.success() {
        tracing::error!(
            stdout = %String::from_utf8_lossy(&output.stdout),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "{label} failed"
        );
        match output.status.code() {
            Some(code) => bail!("{label} failed with code {code}"),
            None => bail!("{label} was terminated by a signal"),
        }
    }
    Ok(())
}

/// Sibling path with spaces replaced by underscores, if the name has any.
fn sanitized_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    if !name.contains(' ') {
        return None;
    }
    Some(path.with_file_name(name.replace(' ', "_")))
}

/// Demucs 4 writes `no_vocals.wav`; older releases wrote `accompaniment.wav`.
fn find_accompaniment(stems_dir: &Path) -> Option<PathBuf> {
    ["no_vocals.wav", "accompaniment.wav"]
        .iter()
        .map(|name| stems_dir.join(name))
        .find(|p| p.is_file())
}
