use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ripecheck", about = "Estimate fruit ripeness from the sound of a tap")]
pub struct Cli {
    /// Recording of the taps (WAV, FLAC, MP3, OGG)
    pub input: Option<PathBuf>,

    /// Config file (defaults to ./ripecheck.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen on the microphone instead of reading a file
    #[arg(long)]
    pub mic: bool,

    /// Input device name for --mic
    #[arg(long)]
    pub device: Option<String>,

    /// Stop live capture after this many seconds (Enter also stops)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Sample rate for live capture in Hz (files use their own rate)
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Samples per analysis frame, a power of two
    #[arg(long)]
    pub frame_size: Option<usize>,

    /// Loudness gate in dB; quieter frames are skipped
    #[arg(long)]
    pub threshold_db: Option<f64>,

    /// Lowest peak frequency (Hz) still counted as ripe
    #[arg(long)]
    pub ripe_min: Option<f64>,

    /// Highest peak frequency (Hz) still counted as ripe
    #[arg(long)]
    pub ripe_max: Option<f64>,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}
