mod audio;
mod cli;
mod config;
mod error;
mod report;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use audio::source::{FrameSource, Pull, RecordingSource};
use cli::Cli;
use config::Config;
use error::EngineError;
use report::Report;
use session::{driver, RipenessSession};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    let (mut source, source_name, progress): (Box<dyn FrameSource>, String, Option<ProgressBar>) =
        if cli.mic {
            (open_mic(&cfg)?, format!("mic:{}", cfg.audio.device), None)
        } else {
            let input = cli
                .input
                .as_ref()
                .context("A recording file is required (or pass --mic)")?;
            if !input.exists() {
                anyhow::bail!("Input file not found: {}", input.display());
            }

            log::info!("Decoding {}...", input.display());
            let audio_data = audio::decode::decode_audio(input)?;
            log::info!("Recording is {:.2}s long", audio_data.duration_secs());
            if audio_data.sample_rate != cfg.audio.sample_rate {
                log::info!(
                    "Using the recording's sample rate of {} Hz",
                    audio_data.sample_rate
                );
            }

            let recording = RecordingSource::new(audio_data, cfg.audio.frame_size);
            let pb = ProgressBar::new(recording.frame_count() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames {msg}")
                    .context("Invalid progress template")?
                    .progress_chars("=>-"),
            );
            let tracked = Tracked {
                inner: recording,
                progress: pb.clone(),
            };
            let source: Box<dyn FrameSource> = Box::new(tracked);
            (source, input.display().to_string(), Some(pb))
        };

    let session = Arc::new(RipenessSession::new(source.sample_rate(), cfg.classifier));
    log::info!(
        "Analyzing {} @ {} Hz, {} samples/frame ({:.1} Hz bins)",
        source_name,
        session.sample_rate(),
        cfg.audio.frame_size,
        session.bin_width_hz(cfg.audio.frame_size)
    );

    session.start();

    if cli.mic {
        spawn_stop_triggers(&session, cli.duration);
        println!("Listening. Tap the fruit, then press Enter to finish.");
    }

    let summary = driver::run(&session, &mut *source, |state| {
        if let Some(ref pb) = progress {
            pb.set_message(format!("{:.0} Hz", state.max_frequency));
        }
        log::info!(
            "Peak {:.1} Hz, max {:.1} Hz -> {}",
            state.current_frequency,
            state.max_frequency,
            state.label
        );
    });

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    session.stop();

    let summary = summary.context("Analysis failed")?;
    let report = Report::new(
        source_name,
        session.sample_rate(),
        cfg.audio.frame_size,
        *session.classifier(),
        &summary,
    );

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text());
    }

    Ok(())
}

/// Advances a progress bar for every frame pulled from a recording.
struct Tracked<S> {
    inner: S,
    progress: ProgressBar,
}

impl<S: FrameSource> FrameSource for Tracked<S> {
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn next_frame(&mut self) -> Result<Pull, EngineError> {
        let pull = self.inner.next_frame()?;
        if let Pull::Frame(_) = pull {
            self.progress.inc(1);
        }
        Ok(pull)
    }
}

/// Merge the config file under explicit CLI flags and validate the result.
fn resolve_config(cli: &Cli) -> Result<Config> {
    // Explicit --config path, or auto-detect ripecheck.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("ripecheck.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("ripecheck").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("ripecheck").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut cfg = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    if let Some(rate) = cli.sample_rate { cfg.audio.sample_rate = rate; }
    if let Some(size) = cli.frame_size { cfg.audio.frame_size = size; }
    if let Some(ref device) = cli.device { cfg.audio.device = device.clone(); }
    if let Some(db) = cli.threshold_db { cfg.classifier.loudness_threshold_db = db; }
    if let Some(hz) = cli.ripe_min { cfg.classifier.ripe_min_hz = hz; }
    if let Some(hz) = cli.ripe_max { cfg.classifier.ripe_max_hz = hz; }

    cfg.audio.validate().context("Invalid audio settings")?;
    cfg.classifier.validate().context("Invalid classifier settings")?;
    Ok(cfg)
}

#[cfg(feature = "mic")]
fn open_mic(cfg: &Config) -> Result<Box<dyn FrameSource>> {
    let mic = audio::capture::MicSource::open(
        &cfg.audio.device,
        cfg.audio.sample_rate,
        cfg.audio.frame_size,
    )
    .context("Failed to open microphone")?;
    Ok(Box::new(mic))
}

#[cfg(not(feature = "mic"))]
fn open_mic(_cfg: &Config) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!(
        "Live capture requires the 'mic' feature. \
         Rebuild with: cargo build --features mic"
    );
}

/// Stop the session on Enter, or after `duration` seconds.
///
/// A closed stdin (EOF) is not an Enter press; only the timer applies then.
fn spawn_stop_triggers(session: &Arc<RipenessSession>, duration: Option<f64>) {
    let on_enter = Arc::clone(session);
    std::thread::spawn(move || {
        if enter_pressed(std::io::stdin().lock()) {
            on_enter.stop();
        } else {
            log::debug!("stdin closed, Enter will not stop the capture");
        }
    });

    if let Some(secs) = duration.filter(|s| s.is_finite() && *s > 0.0) {
        let on_timer = Arc::clone(session);
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_secs_f64(secs));
            log::info!("Capture time of {:.1}s elapsed", secs);
            on_timer.stop();
        });
    }
}

/// Blocks until a line arrives. False on EOF or a read error.
fn enter_pressed<R: BufRead>(mut reader: R) -> bool {
    let mut line = String::new();
    matches!(reader.read_line(&mut line), Ok(n) if n > 0)
}
