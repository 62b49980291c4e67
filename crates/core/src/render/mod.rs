use tracing::trace;

use crate::scene::SpritePlacement;

/// Headless stand-in for the window renderer. It records the draw list of
/// the frame being built and counts presented frames.
#[derive(Debug, Default)]
pub struct RenderGraph {
    pending: Vec<SpritePlacement>,
    last_frame: Vec<SpritePlacement>,
    presented: u64,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.pending.clear();
    }

    pub fn draw(&mut self, placement: &SpritePlacement) {
        trace!(
            sprite = %placement.name,
            x = placement.x,
            y = placement.y,
            "draw"
        );
        self.pending.push(placement.clone());
    }

    pub fn present(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.last_frame);
        self.pending.clear();
        self.presented += 1;
    }

    /// Draw calls of the most recently presented frame.
    pub fn last_frame(&self) -> &[SpritePlacement] {
        &self.last_frame
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}
