use std::time::Duration;

use color_eyre::Result;

use crate::interpolate::InterpolatedField;

/// A display that can show one field at a time and run its own event loop.
///
/// The field carries its axis bounds and the raw sample positions, so a sink
/// has everything it needs for the heatmap, the scatter overlay and the
/// colourbar.
pub trait RenderSink {
    /// Replace the displayed frame.
    fn render(&mut self, field: InterpolatedField);

    /// False once the display was closed or the user interrupted.
    fn is_open(&self) -> bool;

    /// Handle display events for at most `timeout`. The refresh loop's only
    /// blocking point.
    fn pump(&mut self, timeout: Duration) -> Result<()>;
}
