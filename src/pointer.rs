//! Pointer tracking for mouse and touch input.
//!
//! The simulation consumes one [`PointerState`] per frame: the pointer
//! position in normalized device coordinates, where it was at the previous
//! frame, and how far it moved in pixels. [`Pointer`] builds that state from
//! winit window events.
//!
//! # Usage
//!
//! ```ignore
//! // In the window event handler
//! pointer.handle_event(&event);
//!
//! // Once per frame, before stepping the simulation
//! let state = pointer.frame();
//! simulation.render_frame(&ctx, &mut encoder, &view, &FrameInput { dt, pointer: state })?;
//! ```

use glam::Vec2;
use winit::event::{TouchPhase, WindowEvent};

/// Per-frame pointer snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    /// Position in normalized device coordinates (-1 to 1, Y up).
    pub position: Vec2,
    /// Position at the previous frame, NDC.
    pub prev_position: Vec2,
    /// Movement since the previous frame, in pixels.
    pub delta: Vec2,
}

/// Accumulates cursor and touch events between frames.
#[derive(Debug)]
pub struct Pointer {
    pixel_position: Option<Vec2>,
    ndc: Vec2,
    prev_ndc: Vec2,
    delta: Vec2,
    origin: Vec2,
    viewport: (u32, u32),
}

impl Pointer {
    /// Create a tracker for a viewport of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixel_position: None,
            ndc: Vec2::ZERO,
            prev_ndc: Vec2::ZERO,
            delta: Vec2::ZERO,
            origin: Vec2::ZERO,
            viewport: (width, height),
        }
    }

    /// Update viewport size for NDC calculations.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    /// Map NDC to a sub-rectangle of the window, given in physical pixels.
    pub fn set_region(&mut self, x: f32, y: f32, width: u32, height: u32) {
        self.origin = Vec2::new(x, y);
        self.viewport = (width, height);
    }

    /// Current position in normalized device coordinates.
    pub fn ndc(&self) -> Vec2 {
        self.ndc
    }

    /// Record a pointer position in physical pixels.
    pub fn move_to(&mut self, x: f32, y: f32) {
        let new_pos = Vec2::new(x, y);
        if let Some(old) = self.pixel_position {
            self.delta += new_pos - old;
        }
        self.pixel_position = Some(new_pos);

        let local = new_pos - self.origin;
        let (w, h) = self.viewport;
        if w > 0 && h > 0 {
            self.ndc = Vec2::new(
                (local.x / w as f32) * 2.0 - 1.0,
                1.0 - (local.y / h as f32) * 2.0, // Y flipped
            );
        }
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.move_to(position.x as f32, position.y as f32);
            }
            WindowEvent::Touch(touch) => match touch.phase {
                TouchPhase::Started => {
                    // A new touch jumps; it should not count as movement
                    self.pixel_position = None;
                    self.move_to(touch.location.x as f32, touch.location.y as f32);
                }
                TouchPhase::Moved => {
                    self.move_to(touch.location.x as f32, touch.location.y as f32);
                }
                TouchPhase::Ended | TouchPhase::Cancelled => {}
            },
            WindowEvent::CursorLeft { .. } => {
                self.pixel_position = None;
            }
            _ => {}
        }
    }

    /// Take the snapshot for this frame and start accumulating the next one.
    pub fn frame(&mut self) -> PointerState {
        let state = PointerState {
            position: self.ndc,
            prev_position: self.prev_ndc,
            delta: self.delta,
        };
        self.prev_ndc = self.ndc;
        self.delta = Vec2::ZERO;
        state
    }
}

impl Default for Pointer {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_is_origin() {
        let mut pointer = Pointer::new(800, 600);
        pointer.move_to(400.0, 300.0);
        assert!(pointer.ndc().length() < 1e-6);
    }

    #[test]
    fn test_y_is_flipped() {
        let mut pointer = Pointer::new(100, 100);
        pointer.move_to(0.0, 0.0);
        assert_eq!(pointer.ndc(), Vec2::new(-1.0, 1.0));
        pointer.move_to(100.0, 100.0);
        assert_eq!(pointer.ndc(), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_region_offsets_ndc() {
        let mut pointer = Pointer::new(800, 600);
        pointer.set_region(100.0, 0.0, 600, 600);
        pointer.move_to(400.0, 300.0);
        assert!(pointer.ndc().length() < 1e-6);
        pointer.move_to(100.0, 600.0);
        assert_eq!(pointer.ndc(), Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn test_first_move_has_no_delta() {
        let mut pointer = Pointer::new(100, 100);
        pointer.move_to(30.0, 40.0);
        assert_eq!(pointer.frame().delta, Vec2::ZERO);
    }

    #[test]
    fn test_delta_accumulates_within_frame() {
        let mut pointer = Pointer::new(100, 100);
        pointer.move_to(10.0, 10.0);
        pointer.frame();
        pointer.move_to(12.0, 10.0);
        pointer.move_to(15.0, 6.0);
        let state = pointer.frame();
        assert_eq!(state.delta, Vec2::new(5.0, -4.0));
        assert_eq!(pointer.frame().delta, Vec2::ZERO);
    }

    #[test]
    fn test_prev_position_lags_one_frame() {
        let mut pointer = Pointer::new(100, 100);
        pointer.move_to(50.0, 50.0);
        let first = pointer.frame();
        pointer.move_to(100.0, 50.0);
        let second = pointer.frame();
        assert_eq!(second.prev_position, first.position);
        assert_eq!(second.position, Vec2::new(1.0, 0.0));
    }
}
