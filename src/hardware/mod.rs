//! # Cabinet hardware: button LEDs and audio volume.
//!
//! The core only sees the [`Hardware`] trait. [`Cabinet`] is the production
//! implementation combining [`ButtonController`] and [`VolumeController`].
//! All calls return immediately; fades run on a background task.

mod buttons;
mod volume;

use std::time::Duration;

pub use buttons::{ButtonColors, ButtonController, ColorData, BUTTON_COUNT};
pub use volume::{Amixer, Mixer, VolumeController};

/// Hardware operations available to the command layer.
pub trait Hardware: Send + Sync {
    fn set_button_colors(&self, colors: &ColorData);

    fn clear_button_colors(&self);

    /// Makes the next color change start from all-black.
    fn queue_clear_button_colors(&self);

    fn set_volume(&self, pct: u8);

    fn fade_volume(&self, pct: u8, duration: Duration);
}

/// Buttons and volume of the arcade cabinet.
pub struct Cabinet {
    buttons: ButtonController,
    volume: VolumeController,
}

impl Cabinet {
    pub fn new(buttons: ButtonController, volume: VolumeController) -> Self {
        Self { buttons, volume }
    }

    pub fn buttons(&self) -> &ButtonController {
        &self.buttons
    }

    pub fn volume(&self) -> &VolumeController {
        &self.volume
    }
}

impl Hardware for Cabinet {
    fn set_button_colors(&self, colors: &ColorData) {
        self.buttons.change_colors(colors);
    }

    fn clear_button_colors(&self) {
        self.buttons.clear();
    }

    fn queue_clear_button_colors(&self) {
        self.buttons.queue_clear();
    }

    fn set_volume(&self, pct: u8) {
        self.volume.set(pct);
    }

    fn fade_volume(&self, pct: u8, duration: Duration) {
        self.volume.fade(pct, duration);
    }
}
