//! Input events and how they map onto sound effects.
//!
//! The presentation loop drains an [`EventSource`] once per frame, much like
//! polling a windowing library's event queue, and looks each event up in
//! [`Bindings`].

use std::{
    collections::VecDeque,
    fs,
    path::Path,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{assets::SoundEffect, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCode {
    Space,
    Enter,
    Escape,
    X,
    Z,
    Q,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerButton {
    A,
    B,
    X,
    Y,
    Start,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEvent {
    Key(KeyCode),
    MouseButton(u8),
    JoystickButton { id: u32, button: u8 },
    ControllerButton(ControllerButton),
    Quit,
}

/// What the loop should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Play(SoundEffect),
    Quit,
}

/// Inputs that trigger one effect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Trigger {
    pub keys: Vec<KeyCode>,
    pub mouse_buttons: Vec<u8>,
    /// Matched on any joystick id.
    pub joystick_buttons: Vec<u8>,
    pub controller_buttons: Vec<ControllerButton>,
}

impl Trigger {
    fn matches(&self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Key(key) => self.keys.contains(key),
            InputEvent::MouseButton(button) => self.mouse_buttons.contains(button),
            InputEvent::JoystickButton { button, .. } => self.joystick_buttons.contains(button),
            InputEvent::ControllerButton(button) => self.controller_buttons.contains(button),
            InputEvent::Quit => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bindings {
    pub shoot: Trigger,
    pub explosion: Trigger,
    pub quit_keys: Vec<KeyCode>,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            shoot: Trigger {
                keys: vec![KeyCode::Space],
                mouse_buttons: vec![1],
                joystick_buttons: vec![0],
                controller_buttons: vec![ControllerButton::A],
            },
            explosion: Trigger {
                keys: vec![KeyCode::X],
                mouse_buttons: vec![3],
                joystick_buttons: vec![1],
                controller_buttons: vec![ControllerButton::B],
            },
            quit_keys: vec![KeyCode::Escape],
        }
    }
}

impl Bindings {
    /// Returns the action bound to `event`, if any. Quit wins over effects
    /// when a key is bound to both.
    pub fn resolve(&self, event: &InputEvent) -> Option<Action> {
        match event {
            InputEvent::Quit => Some(Action::Quit),
            InputEvent::Key(key) if self.quit_keys.contains(key) => Some(Action::Quit),
            _ if self.shoot.matches(event) => Some(Action::Play(SoundEffect::Shoot)),
            _ if self.explosion.matches(event) => Some(Action::Play(SoundEffect::Explosion)),
            _ => None,
        }
    }
}

/// Something the presentation loop can poll for input.
pub trait EventSource {
    /// Returns the next pending event at loop time `now`, or `None` once the
    /// queue is drained for this frame.
    fn poll(&mut self, now: Duration) -> Option<InputEvent>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedEvent {
    pub at_ms: u64,
    pub event: InputEvent,
}

/// Replays a fixed list of timed events.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    pending: VecDeque<ScriptedEvent>,
}

impl ScriptedInput {
    pub fn new(mut events: Vec<ScriptedEvent>) -> Self {
        events.sort_by_key(|e| e.at_ms);
        Self {
            pending: events.into(),
        }
    }

    /// Loads a JSON array of `{ "at_ms": .., "event": .. }` entries.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let events: Vec<ScriptedEvent> = serde_json::from_str(text)?;
        Ok(Self::new(events))
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}

impl EventSource for ScriptedInput {
    fn poll(&mut self, now: Duration) -> Option<InputEvent> {
        let due = self.pending.front()?.at_ms <= now.as_millis() as u64;
        if due {
            self.pending.pop_front().map(|e| e.event)
        } else {
            None
        }
    }
}

/// Events pushed from another thread, e.g. a terminal reader.
#[derive(Debug)]
pub struct ChannelInput {
    receiver: Receiver<InputEvent>,
    disconnected: bool,
}

impl ChannelInput {
    pub fn new(receiver: Receiver<InputEvent>) -> Self {
        Self {
            receiver,
            disconnected: false,
        }
    }
}

impl EventSource for ChannelInput {
    fn poll(&mut self, _now: Duration) -> Option<InputEvent> {
        if self.disconnected {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                // Sender gone means stdin closed.
                self.disconnected = true;
                Some(InputEvent::Quit)
            }
        }
    }
}

/// Parses one terminal command into an event.
///
/// `space`/`x` act as keys, `m1`..`m3` as mouse buttons, `j0`..`j9` as
/// joystick 0 buttons, `a`/`b` as controller buttons and `q` quits.
pub fn parse_command(line: &str) -> Option<InputEvent> {
    let line = line.trim().to_ascii_lowercase();
    let event = match line.as_str() {
        "" | "space" => InputEvent::Key(KeyCode::Space),
        "x" => InputEvent::Key(KeyCode::X),
        "esc" | "escape" => InputEvent::Key(KeyCode::Escape),
        "q" | "quit" => InputEvent::Quit,
        "a" => InputEvent::ControllerButton(ControllerButton::A),
        "b" => InputEvent::ControllerButton(ControllerButton::B),
        other => {
            if let Some(button) = other.strip_prefix('m') {
                InputEvent::MouseButton(button.parse().ok()?)
            } else if let Some(button) = other.strip_prefix('j') {
                InputEvent::JoystickButton {
                    id: 0,
                    button: button.parse().ok()?,
                }
            } else {
                return None;
            }
        }
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn default_bindings_route_each_device() {
        let bindings = Bindings::default();
        let shoot = Some(Action::Play(SoundEffect::Shoot));
        let boom = Some(Action::Play(SoundEffect::Explosion));

        assert_eq!(bindings.resolve(&InputEvent::Key(KeyCode::Space)), shoot);
        assert_eq!(bindings.resolve(&InputEvent::MouseButton(1)), shoot);
        assert_eq!(
            bindings.resolve(&InputEvent::JoystickButton { id: 3, button: 0 }),
            shoot
        );
        assert_eq!(
            bindings.resolve(&InputEvent::ControllerButton(ControllerButton::B)),
            boom
        );
        assert_eq!(bindings.resolve(&InputEvent::Key(KeyCode::X)), boom);
        assert_eq!(bindings.resolve(&InputEvent::Key(KeyCode::Z)), None);
        assert_eq!(
            bindings.resolve(&InputEvent::Key(KeyCode::Escape)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn scripted_events_fire_in_time_order() {
        let mut input = ScriptedInput::from_json(
            r#"[
                { "at_ms": 500, "event": { "key": "x" } },
                { "at_ms": 100, "event": { "mouse_button": 1 } },
                { "at_ms": 900, "event": "quit" }
            ]"#,
        )
        .unwrap();

        assert_eq!(input.poll(Duration::from_millis(50)), None);
        assert_eq!(
            input.poll(Duration::from_millis(600)),
            Some(InputEvent::MouseButton(1))
        );
        assert_eq!(
            input.poll(Duration::from_millis(600)),
            Some(InputEvent::Key(KeyCode::X))
        );
        assert_eq!(input.poll(Duration::from_millis(600)), None);
        assert!(!input.is_finished());
        assert_eq!(
            input.poll(Duration::from_secs(1)),
            Some(InputEvent::Quit)
        );
        assert!(input.is_finished());
    }

    #[test]
    fn bundled_demo_script_parses() {
        let script = include_str!("../../../../demos/script.json");
        let mut input = ScriptedInput::from_json(script).unwrap();
        let bindings = Bindings::default();

        let mut actions = Vec::new();
        while let Some(event) = input.poll(Duration::from_secs(60)) {
            actions.extend(bindings.resolve(&event));
        }

        assert_eq!(actions.len(), 6);
        assert_eq!(actions.last(), Some(&Action::Quit));
    }

    #[test]
    fn channel_input_quits_when_sender_drops() {
        let (tx, rx) = mpsc::channel();
        let mut input = ChannelInput::new(rx);

        tx.send(InputEvent::Key(KeyCode::Space)).unwrap();
        assert_eq!(
            input.poll(Duration::ZERO),
            Some(InputEvent::Key(KeyCode::Space))
        );
        assert_eq!(input.poll(Duration::ZERO), None);

        drop(tx);
        assert_eq!(input.poll(Duration::ZERO), Some(InputEvent::Quit));
        assert_eq!(input.poll(Duration::ZERO), None);
    }

    #[test]
    fn advertised_terminal_commands_are_all_bound() {
        let bindings = Bindings::default();
        let play = |effect| Some(Action::Play(effect));
        for (line, expected) in [
            ("space", play(SoundEffect::Shoot)),
            ("m1", play(SoundEffect::Shoot)),
            ("j0", play(SoundEffect::Shoot)),
            ("a", play(SoundEffect::Shoot)),
            ("x", play(SoundEffect::Explosion)),
            ("m3", play(SoundEffect::Explosion)),
            ("j1", play(SoundEffect::Explosion)),
            ("b", play(SoundEffect::Explosion)),
            ("q", Some(Action::Quit)),
        ] {
            let event = parse_command(line).unwrap();
            assert_eq!(bindings.resolve(&event), expected, "command `{line}`");
        }
        assert_eq!(bindings.resolve(&parse_command("m2").unwrap()), None);
    }

    #[test]
    fn parses_terminal_commands() {
        assert_eq!(parse_command("\n"), Some(InputEvent::Key(KeyCode::Space)));
        assert_eq!(parse_command("X"), Some(InputEvent::Key(KeyCode::X)));
        assert_eq!(parse_command("m3"), Some(InputEvent::MouseButton(3)));
        assert_eq!(
            parse_command("j1"),
            Some(InputEvent::JoystickButton { id: 0, button: 1 })
        );
        assert_eq!(parse_command("q"), Some(InputEvent::Quit));
        assert_eq!(parse_command("mx"), None);
        assert_eq!(parse_command("hello"), None);
    }
}
