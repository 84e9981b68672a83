//! Command-line argument parsing.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use crate::audio::AudioInput;
use crate::params::{JobParams, ParamsError, RecordingConfig, RenderConfig};
use crate::profile::{load_profile, presets, Environment, ProfileError, ProfileSet};
use crate::runtime::CancelPolicy;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "pulsetrail")]
#[command(about = "Audio-reactive trail renderer", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a window and react to live audio
    Live(LiveArgs),

    /// Render a WAV file to a PNG sequence at the profile frame rate
    Render(RenderArgs),

    /// Inspect and convert profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

/// Look settings shared by both runtimes
#[derive(clap::Args, Debug)]
pub struct LookArgs {
    /// Built-in profile name or path to a profile TOML
    #[arg(long, value_name = "NAME|PATH", default_value = "classic")]
    pub profile: String,

    /// Distortion: 0 none, 1 wave, 2 ripple, 3 swirl, 4 glitch, 5 turbulence
    #[arg(long, value_name = "INDEX", default_value = "0")]
    pub distortion: u8,

    /// Tint hue (degrees)
    #[arg(long, value_name = "DEGREES", default_value = "330")]
    pub hue: f32,

    /// Tint saturation (percent)
    #[arg(long, value_name = "PERCENT", default_value = "100")]
    pub saturation: f32,

    /// Tint lightness (percent)
    #[arg(long, value_name = "PERCENT", default_value = "65")]
    pub lightness: f32,

    /// Subject image; a ring is drawn when omitted
    #[arg(long, value_name = "PATH")]
    pub subject: Option<PathBuf>,
}

impl LookArgs {
    pub fn profile_set(&self) -> Result<ProfileSet, ProfileError> {
        resolve_profile_arg(&self.profile)
    }

    pub fn job(&self) -> Result<JobParams, ParamsError> {
        JobParams::from_raw(self.distortion, self.hue, self.saturation, self.lightness)
    }
}

#[derive(clap::Args, Debug)]
pub struct LiveArgs {
    #[command(flatten)]
    pub look: LookArgs,

    /// Audio input
    #[arg(long, value_enum, default_value = "synth")]
    pub input: InputArg,

    /// Window width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "1280")]
    pub width: u32,

    /// Window height (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "720")]
    pub height: u32,
}

impl LiveArgs {
    /// Window at the requested size, compositing at half resolution
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            window_width: self.width,
            window_height: self.height,
            frame_width: (self.width / 2).max(1),
            frame_height: (self.height / 2).max(1),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub look: LookArgs,

    /// WAV file driving the render
    #[arg(long, value_name = "PATH")]
    pub audio: PathBuf,

    /// Output directory (frames land in <OUT>/frames)
    #[arg(long, value_name = "DIR", default_value = "output")]
    pub out: PathBuf,

    /// Stop after this many seconds even if audio remains
    #[arg(long, value_name = "SECONDS")]
    pub max_seconds: Option<f32>,

    /// Frame width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "640")]
    pub width: u32,

    /// Frame height (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "360")]
    pub height: u32,

    /// What to do with written frames if the render is cancelled
    #[arg(long, value_enum, default_value = "flush")]
    pub cancel_policy: CancelPolicy,
}

impl RenderArgs {
    pub fn recording_config(&self) -> RecordingConfig {
        let mut config = RecordingConfig::new(&self.out, self.width, self.height);
        config.max_duration_secs = self.max_seconds;
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// Compile both views and check parity and ranges
    Check {
        #[arg(value_name = "NAME|PATH")]
        profile: String,
    },

    /// Print one environment's view
    Show {
        #[arg(value_name = "NAME|PATH")]
        profile: String,

        #[arg(long, value_enum, default_value = "continuous")]
        env: Environment,
    },

    /// Write both views as a `[continuous]` / `[frame_indexed]` TOML pair
    Export {
        #[arg(value_name = "NAME|PATH")]
        profile: String,

        /// Output file; stdout when omitted
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

/// Live audio input selector
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputArg {
    /// Built-in glicol composition
    Synth,

    /// Default capture device
    Mic,
}

impl From<InputArg> for AudioInput {
    fn from(arg: InputArg) -> Self {
        match arg {
            InputArg::Synth => AudioInput::Synth,
            InputArg::Mic => AudioInput::Device,
        }
    }
}

/// A `.toml` path or an existing file loads from disk; anything else is a preset name
pub fn resolve_profile_arg(arg: &str) -> Result<ProfileSet, ProfileError> {
    let path = Path::new(arg);
    let is_file = path.extension().is_some_and(|ext| ext == "toml") || path.is_file();

    if is_file {
        load_profile(path)
    } else {
        presets::by_name(arg)?.compile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::DistortionType;

    #[test]
    fn test_render_args_parse() {
        let args = Args::try_parse_from([
            "pulsetrail",
            "render",
            "--audio",
            "song.wav",
            "--distortion",
            "4",
            "--max-seconds",
            "2",
            "--cancel-policy",
            "discard",
        ])
        .unwrap();

        let Command::Render(render) = args.command else {
            panic!("expected render subcommand");
        };
        assert_eq!(render.look.job().unwrap().distortion, DistortionType::Glitch);
        assert_eq!(render.cancel_policy, CancelPolicy::Discard);
        assert_eq!(render.recording_config().max_frames(30.0), Some(60));
        assert_eq!(render.look.profile, "classic");
    }

    #[test]
    fn test_live_args_defaults() {
        let args = Args::try_parse_from(["pulsetrail", "live", "--input", "mic"]).unwrap();
        let Command::Live(live) = args.command else {
            panic!("expected live subcommand");
        };
        assert_eq!(AudioInput::from(live.input), AudioInput::Device);

        let config = live.render_config();
        assert_eq!((config.frame_width, config.frame_height), (640, 360));
    }

    #[test]
    fn test_profile_arg_resolution() {
        assert_eq!(resolve_profile_arg("mellow").unwrap().name, "mellow");
        assert!(matches!(
            resolve_profile_arg("no-such-preset"),
            Err(ProfileError::UnknownPreset(_))
        ));
        assert!(matches!(
            resolve_profile_arg("missing.toml"),
            Err(ProfileError::Io { .. })
        ));
    }
}
