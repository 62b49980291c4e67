use std::{io::BufRead, path::PathBuf, sync::mpsc, thread, time::Duration};

use clap::{Parser, Subcommand};
use mcdemo_core::{
    input::parse_command, Action, AppConfig, AudioDevice, ChannelInput, EventSource, FramePacer,
    PlaybackClock, PlaybackController, RenderGraph, SampleStore, Scene, ScriptedInput,
    SoundEffect,
};
use tracing_subscriber::EnvFilter;

fn main() -> mcdemo_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Devices => list_devices(),
    }
}

fn run(args: RunArgs) -> mcdemo_core::Result<()> {
    let config = load_config(&args)?;
    tracing::info!(
        sample_rate = config.audio.sample_rate,
        chunk_frames = config.audio.chunk_frames,
        fps = config.frame.target_fps,
        "starting demo"
    );

    let store = if args.synth {
        SampleStore::synthesize(config.audio)
    } else {
        SampleStore::load(&config.assets, config.audio)?
    };

    let mut events: Box<dyn EventSource> = match &args.script {
        Some(path) => Box::new(ScriptedInput::from_file(path)?),
        None => Box::new(spawn_terminal_input()),
    };

    // Controller outlives the device: it is created first and dropped last.
    let controller = PlaybackController::shared();
    let device = AudioDevice::open(&config.audio, controller.clone(), args.device.as_deref())?;
    tracing::info!(
        device = device.name(),
        sample_format = ?device.sample_format(),
        buffer_size = ?device.buffer_size(),
        "audio output ready"
    );

    controller.play_sample(store.get(SoundEffect::Intro)?);
    device.resume()?;

    let scene = Scene::new(&config.stage);
    let mut render = RenderGraph::new();
    let mut pacer = FramePacer::new(&config.frame);
    let clock = PlaybackClock::start();
    let limit = args.duration.map(Duration::from_secs_f32);

    'frames: loop {
        let now = clock.elapsed();
        if limit.is_some_and(|limit| now >= limit) {
            tracing::info!("duration limit reached");
            break;
        }

        while let Some(event) = events.poll(now) {
            match config.bindings.resolve(&event) {
                Some(Action::Quit) => break 'frames,
                Some(Action::Play(effect)) => {
                    tracing::debug!(?event, ?effect, "playing effect");
                    controller.play_sample(store.get(effect)?);
                }
                None => tracing::trace!(?event, "unbound input"),
            }
        }

        render.begin_frame();
        for placement in scene.positions(now) {
            render.draw(&placement);
        }
        render.present();
        pacer.wait();
    }

    device.close();
    tracing::info!(
        frames = render.presented(),
        elapsed = ?clock.elapsed(),
        "demo finished"
    );
    drop(controller);
    Ok(())
}

fn load_config(args: &RunArgs) -> mcdemo_core::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &args.assets {
        config.assets.directory = dir.clone();
    }
    if let Some(fps) = args.fps {
        config.frame.target_fps = fps;
    }
    if args.vsync {
        config.frame.vsync = true;
    }
    config.validate()?;
    Ok(config)
}

/// Reads commands from stdin on a background thread. Closing stdin quits.
fn spawn_terminal_input() -> ChannelInput {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                None => tracing::warn!(%line, "unrecognised command"),
            }
        }
    });
    tracing::info!("reading input from stdin: space, x, m1, m3, j0, j1, a, b, q");
    ChannelInput::new(rx)
}

fn list_devices() -> mcdemo_core::Result<()> {
    for name in mcdemo_core::audio::list_output_devices()? {
        println!("{name}");
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Orbiting sprites with input-triggered sound effects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the demo loop.
    Run(RunArgs),
    /// List the audio output devices on the default host.
    Devices,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory holding intro.wav, shoot.wav and explosion.wav.
    #[arg(short, long)]
    assets: Option<PathBuf>,
    /// Use generated sound effects instead of WAV files.
    #[arg(long)]
    synth: bool,
    /// Replay input events from a JSON script instead of reading stdin.
    #[arg(short, long)]
    script: Option<PathBuf>,
    /// Output device name; defaults to the host default.
    #[arg(short, long)]
    device: Option<String>,
    /// Stop after this many seconds.
    #[arg(long)]
    duration: Option<f32>,
    #[arg(long)]
    fps: Option<u32>,
    /// Assume the presenter blocks on vertical sync.
    #[arg(long)]
    vsync: bool,
}
