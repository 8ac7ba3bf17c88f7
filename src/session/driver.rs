use serde::Serialize;

use super::{FrameOutcome, RipenessSession, RipenessSessionState};
use crate::audio::source::{FrameSource, Pull};
use crate::error::EngineError;

/// Counters for one pass of the analysis loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: usize,
    pub accepted: usize,
    pub silent: usize,
    /// Frames dropped because of an invalid size.
    pub rejected: usize,
    /// Readings thrown away because the session was stopped or restarted
    /// while they were being computed.
    pub discarded: usize,
    /// Last state seen while the session was still active.
    pub last_state: RipenessSessionState,
}

/// Pulls frames from `source` into `session` until the source runs dry or
/// the session is stopped.
///
/// `on_reading` is called with the new state after every accepted frame.
/// Frame-size errors are logged and skipped; source errors end the run.
/// A reading invalidated by a restart is dropped and the loop carries on
/// with the new run; one invalidated by a stop ends the loop.
pub fn run<S, F>(
    session: &RipenessSession,
    source: &mut S,
    mut on_reading: F,
) -> Result<RunSummary, EngineError>
where
    S: FrameSource + ?Sized,
    F: FnMut(&RipenessSessionState),
{
    let mut summary = RunSummary {
        last_state: session.snapshot(),
        ..RunSummary::default()
    };

    while session.is_active() {
        let frame = match source.next_frame()? {
            Pull::Frame(frame) => frame,
            Pull::Idle => continue,
            Pull::Exhausted => {
                log::debug!("Frame source exhausted");
                break;
            }
        };
        summary.frames += 1;

        match session.on_frame(&frame) {
            Ok(FrameOutcome::Silent { .. }) => summary.silent += 1,
            Ok(FrameOutcome::Accepted(state)) => {
                summary.accepted += 1;
                summary.last_state = state;
                on_reading(&state);
            }
            Err(EngineError::InvalidFrameSize { len }) => {
                log::warn!("Skipping frame of {} samples: not a power of two", len);
                summary.rejected += 1;
            }
            Err(EngineError::InvalidStateTransition { .. }) => {
                summary.discarded += 1;
                if !session.is_active() {
                    log::debug!("Session stopped mid-frame");
                    break;
                }
                log::debug!("Session restarted mid-frame, dropping stale reading");
                summary.last_state = session.snapshot();
            }
            Err(e) => return Err(e),
        }
    }

    Ok(summary)
}
