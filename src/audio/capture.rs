//! Live microphone frames using cpal.
//!
//! `cpal::Stream` is not `Send`, so the stream lives on its own thread and
//! finished frames cross over a bounded channel.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleRate, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::thread;
use std::time::Duration;

use super::frame::AudioFrame;
use super::source::{FrameSource, Pull};
use crate::error::EngineError;

/// Frames queued between the capture callback and the analysis loop.
const QUEUE_DEPTH: usize = 8;

/// How long `next_frame` waits before reporting `Pull::Idle`.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct MicSource {
    frame_rx: Receiver<AudioFrame>,
    stop_tx: Sender<()>,
    sample_rate: u32,
    _thread_handle: Option<thread::JoinHandle<()>>,
}

impl MicSource {
    /// Opens `device` ("default" or a substring of a device name).
    pub fn open(device: &str, sample_rate: u32, frame_size: usize) -> Result<Self, EngineError> {
        let host = cpal::default_host();

        let device = if device == "default" {
            host.default_input_device()
                .ok_or_else(|| EngineError::Device("no default input device".into()))?
        } else {
            find_device_by_name(&host, device)?
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let mono = device
            .supported_input_configs()
            .map_err(|e| EngineError::Device(e.to_string()))?
            .filter(|c| c.channels() == 1)
            .find(|c| {
                c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .map(|c| c.with_sample_rate(SampleRate(sample_rate)));

        let supported = match mono {
            Some(c) => c,
            None => {
                log::warn!(
                    "Device has no mono {} Hz input, using its default config",
                    sample_rate
                );
                device
                    .default_input_config()
                    .map_err(|e| EngineError::Device(e.to_string()))?
            }
        };

        let sample_format = supported.sample_format();
        let stream_config = supported.config();
        let actual_rate = stream_config.sample_rate.0;

        log::debug!(
            "Stream config: {} Hz, {} channels, {:?}",
            actual_rate,
            stream_config.channels,
            sample_format
        );

        let (frame_tx, frame_rx) = bounded::<AudioFrame>(QUEUE_DEPTH);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), EngineError>>(1);

        let thread_handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                run_capture_thread(
                    device,
                    stream_config,
                    sample_format,
                    frame_size,
                    frame_tx,
                    stop_rx,
                    ready_tx,
                );
            })
            .map_err(|e| EngineError::Device(format!("failed to spawn capture thread: {}", e)))?;

        ready_rx
            .recv()
            .map_err(|_| EngineError::Device("capture thread exited during setup".into()))??;

        Ok(Self {
            frame_rx,
            stop_tx,
            sample_rate: actual_rate,
            _thread_handle: Some(thread_handle),
        })
    }
}

impl FrameSource for MicSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn next_frame(&mut self) -> Result<Pull, EngineError> {
        match self.frame_rx.recv_timeout(POLL_TIMEOUT) {
            Ok(frame) => Ok(Pull::Frame(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(Pull::Idle),
            Err(RecvTimeoutError::Disconnected) => {
                Err(EngineError::Device("capture stream disconnected".into()))
            }
        }
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

fn run_capture_thread(
    device: Device,
    config: StreamConfig,
    sample_format: cpal::SampleFormat,
    frame_size: usize,
    frame_tx: Sender<AudioFrame>,
    stop_rx: Receiver<()>,
    ready_tx: Sender<Result<(), EngineError>>,
) {
    let stream = match build_input_stream(&device, &config, sample_format, frame_size, frame_tx) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(EngineError::Device(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));
    log::debug!("Capture thread started");

    let _ = stop_rx.recv();

    log::debug!("Capture thread stopping");
    drop(stream);
}

fn find_device_by_name(host: &cpal::Host, name: &str) -> Result<Device, EngineError> {
    let devices = host
        .input_devices()
        .map_err(|e| EngineError::Device(e.to_string()))?;

    for device in devices {
        if let Ok(device_name) = device.name() {
            if device_name.contains(name) || name.contains(&device_name) {
                return Ok(device);
            }
        }
    }

    Err(EngineError::Device(format!("no input device matching '{}'", name)))
}

fn build_input_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: cpal::SampleFormat,
    frame_size: usize,
    tx: Sender<AudioFrame>,
) -> Result<Stream, EngineError> {
    let channels = config.channels as usize;

    match sample_format {
        cpal::SampleFormat::I8 => build_typed::<i8>(device, config, channels, frame_size, tx),
        cpal::SampleFormat::I16 => build_typed::<i16>(device, config, channels, frame_size, tx),
        cpal::SampleFormat::I32 => build_typed::<i32>(device, config, channels, frame_size, tx),
        cpal::SampleFormat::U8 => build_typed::<u8>(device, config, channels, frame_size, tx),
        cpal::SampleFormat::U16 => build_typed::<u16>(device, config, channels, frame_size, tx),
        cpal::SampleFormat::U32 => build_typed::<u32>(device, config, channels, frame_size, tx),
        cpal::SampleFormat::F32 => build_typed::<f32>(device, config, channels, frame_size, tx),
        cpal::SampleFormat::F64 => build_typed::<f64>(device, config, channels, frame_size, tx),
        other => Err(EngineError::Device(format!(
            "unsupported sample format: {:?}",
            other
        ))),
    }
}

fn build_typed<T>(
    device: &Device,
    config: &StreamConfig,
    channels: usize,
    frame_size: usize,
    tx: Sender<AudioFrame>,
) -> Result<Stream, EngineError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let mut assembler = FrameAssembler::new(frame_size, channels.max(1));
    let err_fn = |err| log::error!("Audio stream error: {}", err);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mono = data.iter().map(|&s| s.to_sample::<i16>());
                for frame in assembler.push(mono) {
                    match tx.try_send(frame) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => log::debug!("Analysis behind, dropping frame"),
                        Err(TrySendError::Disconnected(_)) => return,
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| EngineError::Device(e.to_string()))
}

/// Downmixes interleaved samples and cuts them into `frame_size` frames.
struct FrameAssembler {
    frame_size: usize,
    channels: usize,
    pending: Vec<i16>,
    partial: Vec<i16>,
}

impl FrameAssembler {
    fn new(frame_size: usize, channels: usize) -> Self {
        Self {
            frame_size,
            channels,
            pending: Vec::with_capacity(frame_size),
            partial: Vec::with_capacity(channels),
        }
    }

    fn push(&mut self, samples: impl Iterator<Item = i16>) -> Vec<AudioFrame> {
        let mut ready = Vec::new();
        for s in samples {
            self.partial.push(s);
            if self.partial.len() < self.channels {
                continue;
            }
            let sum: i32 = self.partial.iter().map(|&v| v as i32).sum();
            self.partial.clear();
            self.pending.push((sum / self.channels as i32) as i16);

            if self.pending.len() == self.frame_size {
                let frame = std::mem::replace(&mut self.pending, Vec::with_capacity(self.frame_size));
                ready.push(AudioFrame::new(frame));
            }
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_mono_frames_across_callbacks() {
        let mut asm = FrameAssembler::new(4, 1);
        assert!(asm.push([1, 2, 3].into_iter()).is_empty());

        let frames = asm.push([4, 5, 6, 7, 8, 9].into_iter());
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].samples(), &[1, 2, 3, 4]);
        assert_eq!(frames[1].samples(), &[5, 6, 7, 8]);
    }

    #[test]
    fn downmixes_interleaved_channels() {
        let mut asm = FrameAssembler::new(2, 2);
        // a channel pair split across two callbacks
        assert!(asm.push([100, 300, 0].into_iter()).is_empty());
        let frames = asm.push([-50].into_iter());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples(), &[200, -25]);
    }
}
