use std::{f32::consts::TAU, time::Duration};

use serde::{Deserialize, Serialize};

use crate::config::StageConfig;

/// A sprite and how it moves around the stage centre.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteDescriptor {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub orbit_radius: f32,
    /// Starting angle in turns (0.0..1.0).
    #[serde(default)]
    pub phase: f32,
    /// Laps per cycle; negative values orbit the other way.
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_speed() -> f32 {
    1.0
}

impl SpriteDescriptor {
    /// Three ships orbiting at different radii and rates.
    pub fn demo_set() -> Vec<Self> {
        vec![
            Self {
                name: "ship".to_string(),
                width: 64,
                height: 64,
                orbit_radius: 200.0,
                phase: 0.0,
                speed: 1.0,
            },
            Self {
                name: "asteroid".to_string(),
                width: 48,
                height: 48,
                orbit_radius: 120.0,
                phase: 0.5,
                speed: -2.0,
            },
            Self {
                name: "ufo".to_string(),
                width: 32,
                height: 16,
                orbit_radius: 260.0,
                phase: 0.25,
                speed: 0.5,
            },
        ]
    }
}

/// Where a sprite is drawn for one frame. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpritePlacement {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct Scene {
    centre: (f32, f32),
    cycle_seconds: f32,
    sprites: Vec<SpriteDescriptor>,
}

impl Scene {
    pub fn new(stage: &StageConfig) -> Self {
        Self {
            centre: (stage.width as f32 / 2.0, stage.height as f32 / 2.0),
            cycle_seconds: stage.cycle_seconds,
            sprites: stage.sprites.clone(),
        }
    }

    /// Computes every sprite's rectangle at `elapsed` time since start.
    pub fn positions(&self, elapsed: Duration) -> Vec<SpritePlacement> {
        let cycle = (elapsed.as_secs_f32() / self.cycle_seconds).fract();
        self.sprites
            .iter()
            .map(|sprite| {
                let angle = TAU * (sprite.speed * cycle + sprite.phase);
                let (sin, cos) = angle.sin_cos();
                SpritePlacement {
                    name: sprite.name.clone(),
                    x: self.centre.0 + sprite.orbit_radius * cos - sprite.width as f32 / 2.0,
                    y: self.centre.1 + sprite.orbit_radius * sin - sprite.height as f32 / 2.0,
                    width: sprite.width,
                    height: sprite.height,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> StageConfig {
        StageConfig {
            width: 200,
            height: 100,
            cycle_seconds: 4.0,
            sprites: vec![SpriteDescriptor {
                name: "dot".to_string(),
                width: 10,
                height: 20,
                orbit_radius: 50.0,
                phase: 0.0,
                speed: 1.0,
            }],
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn starts_on_the_right_of_centre() {
        let scene = Scene::new(&stage());
        let placement = &scene.positions(Duration::ZERO)[0];
        assert!(close(placement.x, 100.0 + 50.0 - 5.0));
        assert!(close(placement.y, 50.0 - 10.0));
    }

    #[test]
    fn quarter_cycle_moves_a_quarter_turn() {
        let scene = Scene::new(&stage());
        let placement = &scene.positions(Duration::from_secs(1))[0];
        assert!(close(placement.x, 100.0 - 5.0));
        assert!(close(placement.y, 50.0 + 50.0 - 10.0));
    }

    #[test]
    fn motion_repeats_every_cycle() {
        let scene = Scene::new(&stage());
        let a = scene.positions(Duration::from_millis(1_300));
        let b = scene.positions(Duration::from_millis(9_300));
        assert!(close(a[0].x, b[0].x));
        assert!(close(a[0].y, b[0].y));
    }

    #[test]
    fn demo_set_places_every_sprite() {
        let stage = StageConfig::default();
        let scene = Scene::new(&stage);
        let placements = scene.positions(Duration::from_millis(16));
        let names: Vec<&str> = placements.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["ship", "asteroid", "ufo"]);
        assert_eq!(placements.len(), stage.sprites.len());
    }
}
