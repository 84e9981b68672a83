//! Frame clock: turns environment time into a canonical per-frame delta.
//!
//! The continuous clock is fed wall-clock milliseconds from the host's
//! refresh callback; the frame-indexed clock is fed frame numbers by the
//! export loop. Both report time in their *native unit* (ms or frames), which
//! is the unit the profile's duration fields are resolved into.

use crate::profile::Environment;

/// Result of one clock tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
    /// Elapsed time since the previous tick, in nominal frames (never negative)
    pub delta_frames: f32,

    /// Current time in the clock's native unit (ms or frame index)
    pub now: f64,
}

/// Clock driving per-frame accumulation
#[derive(Debug, Clone)]
pub enum FrameClock {
    /// Variable frame rate, driven by a monotonic millisecond timestamp
    Continuous {
        /// Nominal frame duration (ms), `1000 / target_frame_rate`
        frame_duration_ms: f64,

        /// Upper bound on a single delta (frames), absorbs stalls
        max_delta_frames: f32,

        /// Timestamp of the previous tick (ms)
        last_ms: Option<f64>,
    },

    /// Fixed frame rate, one tick per rendered frame
    FrameIndexed {
        /// Index of the previous tick
        last_index: Option<u64>,
    },
}

impl FrameClock {
    /// Continuous clock for a target frame rate
    pub fn continuous(target_frame_rate: f32, max_delta_frames: f32) -> Self {
        Self::Continuous {
            frame_duration_ms: 1000.0 / target_frame_rate.max(f32::EPSILON) as f64,
            max_delta_frames: max_delta_frames.max(0.0),
            last_ms: None,
        }
    }

    /// Frame-indexed clock
    pub fn frame_indexed() -> Self {
        Self::FrameIndexed { last_index: None }
    }

    /// Clock matching a runtime environment
    pub fn for_environment(
        environment: Environment,
        target_frame_rate: f32,
        max_delta_frames: f32,
    ) -> Self {
        match environment {
            Environment::Continuous => Self::continuous(target_frame_rate, max_delta_frames),
            Environment::FrameIndexed => Self::frame_indexed(),
        }
    }

    /// Environment this clock serves
    pub fn environment(&self) -> Environment {
        match self {
            Self::Continuous { .. } => Environment::Continuous,
            Self::FrameIndexed { .. } => Environment::FrameIndexed,
        }
    }

    /// Advance the clock.
    ///
    /// `raw` is a millisecond timestamp for the continuous clock and a frame
    /// index for the frame-indexed clock. The first tick of either clock is one
    /// nominal frame so both start accumulating from the same point.
    pub fn tick(&mut self, raw: f64) -> ClockTick {
        match self {
            Self::Continuous {
                frame_duration_ms,
                max_delta_frames,
                last_ms,
            } => {
                if !raw.is_finite() {
                    // Hold the previous time; a NaN timestamp is a non-advance
                    let now = last_ms.unwrap_or(0.0);
                    return ClockTick {
                        delta_frames: 0.0,
                        now,
                    };
                }

                let delta_frames = match *last_ms {
                    None => 1.0,
                    Some(last) if raw <= last => 0.0,
                    Some(last) => {
                        (((raw - last) / *frame_duration_ms) as f32).min(*max_delta_frames)
                    }
                };

                // Non-monotonic input never moves the clock backwards
                let now = last_ms.map_or(raw, |last| last.max(raw));
                *last_ms = Some(now);

                ClockTick { delta_frames, now }
            }
            Self::FrameIndexed { last_index } => {
                let index = if raw.is_finite() && raw > 0.0 {
                    raw as u64
                } else {
                    0
                };

                let delta_frames = match *last_index {
                    Some(last) if index <= last => 0.0,
                    _ => 1.0,
                };

                let now = last_index.map_or(index, |last| last.max(index));
                *last_index = Some(now);

                ClockTick {
                    delta_frames,
                    now: now as f64,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_indexed_delta_is_one() {
        let mut clock = FrameClock::frame_indexed();

        for i in 0..10 {
            let tick = clock.tick(i as f64);
            assert_eq!(tick.delta_frames, 1.0);
            assert_eq!(tick.now, i as f64);
        }
    }

    #[test]
    fn test_continuous_delta_in_frames() {
        let mut clock = FrameClock::continuous(60.0, 4.0);

        assert_eq!(clock.tick(1000.0).delta_frames, 1.0);

        // Exactly one frame at 60fps
        let tick = clock.tick(1000.0 + 1000.0 / 60.0);
        assert!((tick.delta_frames - 1.0).abs() < 1e-4);

        // Half a frame
        let tick = clock.tick(1000.0 + 1.5 * 1000.0 / 60.0);
        assert!((tick.delta_frames - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_continuous_stall_is_clamped() {
        let mut clock = FrameClock::continuous(60.0, 4.0);
        clock.tick(0.0);

        // Backgrounded tab: 10 seconds between callbacks
        let tick = clock.tick(10_000.0);
        assert_eq!(tick.delta_frames, 4.0);
        assert_eq!(tick.now, 10_000.0);
    }

    #[test]
    fn test_non_monotonic_time_clamps_to_zero() {
        let mut clock = FrameClock::continuous(30.0, 4.0);
        clock.tick(500.0);

        let tick = clock.tick(400.0);
        assert_eq!(tick.delta_frames, 0.0);
        assert_eq!(tick.now, 500.0);

        let tick = clock.tick(f64::NAN);
        assert_eq!(tick.delta_frames, 0.0);

        let mut indexed = FrameClock::frame_indexed();
        indexed.tick(5.0);
        assert_eq!(indexed.tick(3.0).delta_frames, 0.0);
    }

    #[test]
    fn test_modes_converge_over_equal_elapsed_time() {
        let fps = 30.0;
        let mut continuous = FrameClock::continuous(fps, 4.0);
        let mut indexed = FrameClock::frame_indexed();

        let mut acc_continuous = 0.0f32;
        let mut acc_indexed = 0.0f32;

        for i in 0..90 {
            acc_continuous += continuous.tick(i as f64 * 1000.0 / fps as f64).delta_frames;
            acc_indexed += indexed.tick(i as f64).delta_frames;
        }

        assert!((acc_continuous - acc_indexed).abs() < 1e-3);
    }
}
