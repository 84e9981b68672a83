//! Pulsetrail - Audio-reactive trail compositor
//!
//! A subject image leaves glowing, warped trails that pulse with the
//! music. `live` reacts to the synth or a microphone; `render` turns a
//! WAV file into a PNG sequence with the same look.

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulsetrail::audio::decode_wav;
use pulsetrail::cli::{resolve_profile_arg, Args, Command, LiveArgs, ProfileAction, RenderArgs};
use pulsetrail::profile::Environment;
use pulsetrail::runtime::{
    load_subject, run_live, CancelToken, LiveOptions, OfflineRenderer, PngSequenceSink,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Live(live) => run_live_command(live),
        Command::Render(render) => run_render_command(render),
        Command::Profile { action } => run_profile_command(action),
    }
}

fn run_live_command(args: LiveArgs) -> Result<()> {
    let set = args.look.profile_set().context("Failed to load profile")?;
    let profile = set.resolve(Environment::Continuous)?;
    let job = args.look.job()?;
    let render_config = args.render_config();

    let subject_size = render_config.frame_width.min(render_config.frame_height);
    let subject = load_subject(args.look.subject.as_deref(), subject_size)?;

    info!(profile = %profile.name, distortion = job.distortion.name(), "Starting live view");

    run_live(LiveOptions {
        profile,
        job,
        subject,
        input: args.input.into(),
        render_config,
    })?;
    Ok(())
}

fn run_render_command(args: RenderArgs) -> Result<()> {
    let set = args.look.profile_set().context("Failed to load profile")?;
    let profile = set.resolve(Environment::FrameIndexed)?;
    let job = args.look.job()?;
    let recording = args.recording_config();

    let clip = decode_wav(&args.audio)
        .with_context(|| format!("Failed to read audio {}", args.audio.display()))?;
    let subject = load_subject(
        args.look.subject.as_deref(),
        recording.frame_width.min(recording.frame_height),
    )?;

    let max_frames = recording.max_frames(profile.target_frame_rate);
    let renderer = OfflineRenderer::new(
        profile,
        job,
        subject,
        recording.frame_width,
        recording.frame_height,
    )?
    .with_max_frames(max_frames);

    let mut sink = PngSequenceSink::new(recording.frames_dir())?;
    let summary = renderer.render(&clip, &mut sink, &CancelToken::new(), args.cancel_policy)?;

    info!(
        frames = summary.frames_rendered,
        dir = %sink.dir().display(),
        "Render finished"
    );
    Ok(())
}

fn run_profile_command(action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Check { profile } => {
            let set = resolve_profile_arg(&profile)?;
            for environment in [Environment::Continuous, Environment::FrameIndexed] {
                set.resolve(environment)
                    .with_context(|| format!("Profile '{}' invalid for {}", set.name, environment))?;
            }
            println!("{}: ok", set.name);
        }
        ProfileAction::Show { profile, env } => {
            let set = resolve_profile_arg(&profile)?;
            println!("# {} ({})", set.name, env);
            for (key, value) in &set.view(env).values {
                println!("{} = {}", key, value);
            }
        }
        ProfileAction::Export { profile, out } => {
            let set = resolve_profile_arg(&profile)?;
            let text = set.to_legacy_toml()?;
            match out {
                Some(path) => {
                    fs::write(&path, text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Exported profile");
                }
                None => print!("{}", text),
            }
        }
    }
    Ok(())
}
