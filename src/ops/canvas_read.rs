// ============================================================================
// get-canvas / get-canvas-data: read back what the editor has rendered
// ============================================================================

use tracing::{info, warn};

use super::CANVAS_ID;
use crate::dispatcher::HostBindings;
use crate::error::CommandError;
use crate::host::AppContext;
use crate::output::CommandOutput;
use crate::readback;
use crate::settings::ControlSettings;

/// Whole canvas as a PNG data URL.
pub fn get_canvas(host: &mut HostBindings) -> Result<CommandOutput, CommandError> {
    let canvas = host
        .document
        .canvas(CANVAS_ID)
        .ok_or(CommandError::CanvasNotFound)?;
    info!(width = canvas.width(), height = canvas.height(), "capturing canvas");

    if canvas.accelerated().is_some() {
        paint_current_frame(&mut *host.app);
    }
    let img = readback::snapshot(canvas).ok_or(CommandError::CapabilityUnavailable("2d context"))?;

    let data_url = readback::to_data_url(&img)?;
    info!(bytes = data_url.len(), "canvas captured");
    Ok(CommandOutput::CanvasImage { data_url })
}

/// `sample` pixels from the center of the accelerated surface.
pub fn get_canvas_data(
    host: &mut HostBindings,
    settings: &ControlSettings,
    sample: Option<u32>,
) -> Result<CommandOutput, CommandError> {
    let count = sample.unwrap_or(settings.default_sample);
    if count > settings.max_sample {
        return Err(CommandError::InvalidParameter {
            name: "sample",
            reason: format!("{} exceeds the limit of {}", count, settings.max_sample),
        });
    }

    let canvas = host
        .document
        .canvas(CANVAS_ID)
        .ok_or(CommandError::CanvasNotFound)?;
    let gl = canvas
        .accelerated()
        .ok_or(CommandError::WebGlContextNotFound)?;

    // Without a fresh paint the buffer still holds the frame from before the
    // last filter change.
    paint_current_frame(&mut *host.app);

    let (origin, tuples) = readback::sample_center(gl, canvas.width(), canvas.height(), count);
    info!(
        x = origin.0,
        y = origin.1,
        count,
        first = ?tuples.first(),
        "canvas sampled at center"
    );
    Ok(CommandOutput::PixelSample { origin, tuples })
}

fn paint_current_frame(app: &mut dyn AppContext) {
    let painted = app
        .render_pipeline()
        .map(|pipeline| pipeline.paint_canvas())
        .unwrap_or(false);
    if !painted {
        warn!("host cannot paint on demand; reading the last presented frame");
    }
}
