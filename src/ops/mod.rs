//! One handler per PHOTOEDITOR command.

pub mod canvas_read;
pub mod diagnostics;
pub mod filters;
pub mod image_load;

/// Element id of the editor's rendering canvas.
pub const CANVAS_ID: &str = "canvas";
