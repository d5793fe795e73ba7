use log::{error, info};

use crate::clinical::{ClinicalClassifier, OnnxTabularModel};
use crate::config::ModelOptions;
use crate::error::Result;
use crate::mri::{MriClassifier, OnnxImageModel};

/// The models every request reads from.
/// Holding an `AppState` means both models loaded; there is no partially loaded state.
/// It is never mutated after construction, so it is shared across workers without a lock.
pub struct AppState
{
    pub clinical: ClinicalClassifier,
    pub mri: MriClassifier,
}

impl AppState
{
    pub fn new(clinical: ClinicalClassifier, mri: MriClassifier) -> Self
    {
        AppState { clinical, mri }
    }

    /// Loads both models from disk. Fails if either one cannot be loaded.
    pub fn load(options: &ModelOptions) -> Result<Self>
    {
        let session_options = options.session_options();

        let clinical = OnnxTabularModel::load(&options.clinical_model, &session_options)
            .inspect_err(|e| {
                error!("Error loading clinical model from {:?}: {:?}", options.clinical_model, e)
            })?;

        let mri = OnnxImageModel::load(&options.mri_sources(), &session_options)
            .inspect_err(|e| error!("Error loading MRI model: {:?}", e))?;

        info!("All models loaded");
        Ok(AppState::new(ClinicalClassifier::new(clinical), MriClassifier::new(mri)))
    }
}
