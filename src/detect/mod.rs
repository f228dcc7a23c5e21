mod backend;
pub mod backends;
mod labels;
mod result;

use anyhow::{anyhow, Result};

pub use backend::DetectorBackend;
pub use backends::ScriptedBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use labels::LabelTable;
pub use result::{BoundingBox, Detection, DetectionSet, PixelBox};

use crate::config::DetectorSettings;

/// Build the detector backend named in the configuration.
pub fn open_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend.as_str() {
        "scripted" => Ok(Box::new(ScriptedBackend::empty())),
        #[cfg(feature = "backend-tract")]
        "tract" => Ok(Box::new(TractBackend::new(
            &settings.model_path,
            settings.input_size,
            settings.input_size,
        )?)),
        #[cfg(not(feature = "backend-tract"))]
        "tract" => Err(anyhow!("tract detector requires the backend-tract feature")),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}
