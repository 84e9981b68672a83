//! Frame-indexed export runtime.
//!
//! Steps synchronously through the audio clip: frame `i` analyses the
//! `fft_size` samples ending at `i * sample_rate / fps`, renders, and hands
//! the frame to a sink. Cancellation is checked between frames only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::Rgba32FImage;
use tracing::{debug, info, warn};

use super::{FrameSink, RuntimeError};
use crate::audio::{AudioClip, SpectrumAnalyzer};
use crate::params::{AnalysisConfig, JobParams};
use crate::profile::{Environment, Profile};
use crate::session::RenderSession;

/// Progress is logged every this many seconds of output
const PROGRESS_INTERVAL_SECS: f32 = 5.0;

/// Cooperative cancellation flag, shared with whoever may stop the job
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happens to already-written frames when a job is cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CancelPolicy {
    /// Keep the partial output
    #[default]
    Flush,

    /// Remove the partial output
    Discard,
}

/// Outcome of an offline render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub frames_rendered: u64,
    pub frames_planned: u64,
    pub cancelled: bool,
}

/// Offline renderer for one job
#[derive(Debug)]
pub struct OfflineRenderer {
    profile: Profile,
    job: JobParams,
    subject: Rgba32FImage,
    width: u32,
    height: u32,
    max_frames: Option<u64>,
}

impl OfflineRenderer {
    /// `profile` must be resolved for the frame-indexed environment
    pub fn new(
        profile: Profile,
        job: JobParams,
        subject: Rgba32FImage,
        width: u32,
        height: u32,
    ) -> Result<Self, RuntimeError> {
        if profile.environment != Environment::FrameIndexed {
            return Err(RuntimeError::WrongEnvironment {
                expected: Environment::FrameIndexed,
                actual: profile.environment,
            });
        }

        Ok(Self {
            profile,
            job,
            subject,
            width,
            height,
            max_frames: None,
        })
    }

    /// Stop after `max_frames` even if audio remains
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Frames this renderer will produce for a clip
    pub fn planned_frames(&self, clip: &AudioClip) -> u64 {
        let available = clip.frame_count(self.profile.target_frame_rate);
        self.max_frames.map_or(available, |max| available.min(max))
    }

    /// Render the clip into `sink`
    pub fn render<S: FrameSink + ?Sized>(
        &self,
        clip: &AudioClip,
        sink: &mut S,
        cancel: &CancelToken,
        policy: CancelPolicy,
    ) -> Result<RenderSummary, RuntimeError> {
        let fps = self.profile.target_frame_rate;

        let config = AnalysisConfig::from_profile(&self.profile, clip.sample_rate_hz, 0);
        config.validate()?;
        let mut analyzer = SpectrumAnalyzer::new(config);

        let mut session = RenderSession::new(
            self.profile.clone(),
            &self.job,
            self.subject.clone(),
            self.width,
            self.height,
        )?;

        let planned = self.planned_frames(clip);
        let progress_every = ((fps * PROGRESS_INTERVAL_SECS) as u64).max(1);
        let started = Instant::now();

        info!(
            frames = planned,
            fps,
            duration_secs = clip.duration_secs(),
            "Offline render started"
        );

        for index in 0..planned {
            if cancel.is_cancelled() {
                return self.cancel(sink, policy, index, planned);
            }

            let end = clip.sample_position(index, fps);
            let window = analyzer.analyze(&clip.samples[..end]);
            let frame = session.render_frame(&window, index as f64);
            sink.write_frame(index, frame)?;

            if (index + 1) % progress_every == 0 {
                debug!(
                    frame = index + 1,
                    of = planned,
                    rotation = session.state().rotation_degrees,
                    "Offline render progress"
                );
            }
        }

        sink.finish()?;

        info!(
            frames = planned,
            elapsed_secs = started.elapsed().as_secs_f32(),
            "Offline render complete"
        );

        Ok(RenderSummary {
            frames_rendered: planned,
            frames_planned: planned,
            cancelled: false,
        })
    }

    fn cancel<S: FrameSink + ?Sized>(
        &self,
        sink: &mut S,
        policy: CancelPolicy,
        rendered: u64,
        planned: u64,
    ) -> Result<RenderSummary, RuntimeError> {
        warn!(rendered, planned, ?policy, "Offline render cancelled");

        let frames_rendered = match policy {
            CancelPolicy::Flush => {
                sink.finish()?;
                rendered
            }
            CancelPolicy::Discard => {
                sink.discard()?;
                0
            }
        };

        Ok(RenderSummary {
            frames_rendered,
            frames_planned: planned,
            cancelled: true,
        })
    }
}
