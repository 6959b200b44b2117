// ============================================================================
// open-image: from a path to a rendered frame
// ============================================================================

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::dispatcher::HostBindings;
use crate::error::CommandError;
use crate::host::{InputImage, RenderPipeline};
use crate::output::CommandOutput;
use crate::settings::ControlSettings;
use crate::source::file_name;

/// Load the image at `path` into the editor and wait for it to be rendered.
///
/// The bytes are fully decoded here only to learn the dimensions and to fail
/// before the editor is touched; the editor decodes them again itself.
pub fn open_image(
    host: &mut HostBindings,
    settings: &ControlSettings,
    path: &str,
) -> Result<CommandOutput, CommandError> {
    info!(path, source = host.bytes.kind(), "opening image");

    let bytes = host.bytes.fetch(path)?;
    let probe =
        image::load_from_memory(&bytes).map_err(|e| CommandError::ImageDecode(e.to_string()))?;
    let (width, height) = (probe.width(), probe.height());
    drop(probe);

    hand_off(host, settings, path, bytes)
        .map_err(|e| CommandError::ImageLoad(Box::new(e)))?;

    info!(width, height, "image loaded");
    Ok(CommandOutput::ImageLoaded { width, height })
}

/// Give the bytes to the editor, let it settle and render.
fn hand_off(
    host: &mut HostBindings,
    settings: &ControlSettings,
    path: &str,
    bytes: Vec<u8>,
) -> Result<(), CommandError> {
    let opener = host
        .app
        .input_opener()
        .ok_or(CommandError::CapabilityUnavailable("openInput method"))?;
    opener
        .open_input(InputImage {
            bytes,
            filename: file_name(path).to_string(),
            source_path: path.to_string(),
        })
        .wait("openInput", settings.render_timeout)?;

    // The editor's reactive effects pick the new image up on their own
    // schedule; only render once they have.
    if let Some(pipeline) = host.app.render_pipeline() {
        wait_until_settled(&*pipeline, settings);
        pipeline
            .update_gl()
            .wait("updateGL", settings.render_timeout)?;
    }
    Ok(())
}

/// Poll `is_settled` until it holds or the settle deadline passes.
/// Returns whether the pipeline reported settled in time.
pub fn wait_until_settled(pipeline: &dyn RenderPipeline, settings: &ControlSettings) -> bool {
    let start = Instant::now();
    let deadline = start + settings.settle_timeout;
    loop {
        if pipeline.is_settled() {
            debug!(elapsed = ?start.elapsed(), "render pipeline settled");
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            warn!(
                timeout = ?settings.settle_timeout,
                "render pipeline did not settle; rendering anyway"
            );
            return false;
        }
        std::thread::sleep(settings.settle_poll_interval.min(deadline - now));
    }
}
