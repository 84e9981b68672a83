//! One render session: clock, feature pipeline, mapper and compositor, run
//! in a fixed order once per frame.

use image::Rgba32FImage;
use tracing::info;

use crate::audio::{AnalysisWindow, AudioFeatureExtractor, BandIntensities, FeatureSmoother};
use crate::clock::FrameClock;
use crate::compositor::{Compositor, CompositorError};
use crate::mapping::{FrameParams, MapperInput, ParameterMapper, RenderState};
use crate::params::JobParams;
use crate::profile::Profile;

/// Per-session state; sessions share nothing
#[derive(Debug)]
pub struct RenderSession {
    profile: Profile,
    clock: FrameClock,
    extractor: AudioFeatureExtractor,
    smoother: FeatureSmoother,
    mapper: ParameterMapper,
    compositor: Compositor,
    state: RenderState,
    last_params: FrameParams,
    last_raw: BandIntensities,
    frames: u64,
}

impl RenderSession {
    /// Build a session for a resolved profile. Fails if frame memory cannot
    /// be allocated; nothing is rendered in that case.
    pub fn new(
        profile: Profile,
        job: &JobParams,
        subject: Rgba32FImage,
        width: u32,
        height: u32,
    ) -> Result<Self, CompositorError> {
        let compositor = Compositor::new(width, height, subject, job, &profile)?;

        info!(
            profile = %profile.name,
            environment = %profile.environment,
            width,
            height,
            distortion = job.distortion.name(),
            "Render session created"
        );

        Ok(Self {
            clock: FrameClock::for_environment(
                profile.environment,
                profile.target_frame_rate,
                profile.max_frame_delta,
            ),
            extractor: AudioFeatureExtractor::new(&profile),
            smoother: FeatureSmoother::new(&profile),
            mapper: ParameterMapper::new(&profile),
            compositor,
            state: RenderState::default(),
            last_params: FrameParams::default(),
            last_raw: BandIntensities::ZERO,
            frames: 0,
            profile,
        })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Parameters of the most recent frame
    pub fn last_params(&self) -> &FrameParams {
        &self.last_params
    }

    /// Unsmoothed bands of the most recent frame
    pub fn last_raw(&self) -> BandIntensities {
        self.last_raw
    }

    pub fn smoothed(&self) -> BandIntensities {
        self.smoother.state()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Run extraction, smoothing and mapping for one frame without
    /// compositing. `time` is ms (continuous) or a frame index (frame-indexed).
    pub fn advance(&mut self, window: &AnalysisWindow, time: f64) -> FrameParams {
        let tick = self.clock.tick(time);

        let raw = self.extractor.extract(window);
        let smoothed = self.smoother.update(&raw);
        let input = MapperInput {
            smoothed,
            raw,
            loudness: self.extractor.loudness(window),
        };

        let params = self.mapper.map(&mut self.state, &input, tick);
        self.last_params = params;
        self.last_raw = raw;
        params
    }

    /// Advance and composite one frame
    pub fn render_frame(&mut self, window: &AnalysisWindow, time: f64) -> &Rgba32FImage {
        let params = self.advance(window, time);
        self.frames += 1;
        self.compositor.composite(&params, &mut self.state)
    }
}
