//! Core library for mcdemo.
//!
//! The interesting part is [`audio::PlaybackController`]: one active sample
//! and a cursor behind a mutex, fed by the event loop and drained by the
//! audio device callback. The remaining modules are the pieces the binary's
//! presentation loop is assembled from (sample store, input mapping, sprite
//! motion, frame pacing and a headless renderer).

pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod input;
pub mod render;
pub mod scene;
pub mod timeline;

pub use assets::{SampleStore, SoundEffect};
pub use audio::{AudioDevice, PlaybackController, Sample};
pub use config::{AppConfig, AssetConfig, AudioFormat, FrameConfig, StageConfig};
pub use error::{DemoError, Result};
pub use input::{Action, Bindings, ChannelInput, EventSource, InputEvent, ScriptedInput};
pub use render::RenderGraph;
pub use scene::{Scene, SpriteDescriptor, SpritePlacement};
pub use timeline::{FramePacer, PlaybackClock};
