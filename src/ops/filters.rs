// ============================================================================
// apply-pillow-filter / reset-pillow / list-pillow-filters
// ============================================================================

use tracing::{info, warn};

use crate::command::PILLOW_FILTERS;
use crate::dispatcher::HostBindings;
use crate::error::CommandError;
use crate::host::{AppContext, FilterConfig};
use crate::output::CommandOutput;
use crate::settings::ControlSettings;

/// The filters the host reports, or the built-in catalog when it cannot say.
pub fn active_catalog(app: &dyn AppContext) -> Vec<String> {
    app.filter_catalog()
        .unwrap_or_else(|| PILLOW_FILTERS.iter().map(|s| s.to_string()).collect())
}

pub fn list_pillow_filters(app: &dyn AppContext) -> CommandOutput {
    let names = active_catalog(app);
    info!(filters = %names.join(", "), "available filters");
    CommandOutput::FilterCatalog(names)
}

pub fn apply_pillow_filter(
    host: &mut HostBindings,
    settings: &ControlSettings,
    filter: &str,
) -> Result<CommandOutput, CommandError> {
    info!(filter, "applying filter");
    if !active_catalog(&*host.app).iter().any(|f| f == filter) {
        warn!(filter, "filter is not in the catalog; passing it to the host anyway");
    }
    update_filter(host, settings, |cfg| cfg.select(filter))?;
    info!(filter, "filter applied");
    Ok(CommandOutput::FilterApplied {
        name: filter.to_string(),
    })
}

pub fn reset_pillow(
    host: &mut HostBindings,
    settings: &ControlSettings,
) -> Result<CommandOutput, CommandError> {
    info!("resetting filter");
    update_filter(host, settings, FilterConfig::clear)?;
    Ok(CommandOutput::FilterReset)
}

/// Mutate the shared filter configuration and wait for the re-render.
/// Both capabilities are checked before anything is changed.
fn update_filter(
    host: &mut HostBindings,
    settings: &ControlSettings,
    change: impl FnOnce(&mut FilterConfig),
) -> Result<(), CommandError> {
    let config = host
        .app
        .filter_config()
        .ok_or(CommandError::CapabilityUnavailable("params"))?;
    let pipeline = host
        .app
        .render_pipeline()
        .ok_or(CommandError::CapabilityUnavailable("updateGL method"))?;

    {
        let mut cfg = config.lock().unwrap_or_else(|e| e.into_inner());
        change(&mut *cfg);
    }
    pipeline
        .update_gl()
        .wait("updateGL", settings.render_timeout)
}
