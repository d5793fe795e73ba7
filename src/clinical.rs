use std::path::Path;

use ndarray::{Array2, Ix2};
use ort::{inputs, Session};

use crate::error::{Error, Result};
use crate::interface::{ClinicalFeatureVector, ClinicalPrediction, Diagnosis};
use crate::loader::{self, ModelSource, SessionOptions};
use crate::schema::{CLINICAL_FEATURE_COUNT, POSITIVE_CLASS};

/// Output names of a gradient-boosted classifier exported to ONNX with ZipMap disabled.
pub const LABEL_OUTPUT: &str = "label";
pub const PROBABILITIES_OUTPUT: &str = "probabilities";

/// The result of classifying one row: the predicted label and the probability of every class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOutput
{
    pub label: i64,
    pub probabilities: Vec<f32>,
}

/// A tabular classifier; rows are `(n, CLINICAL_FEATURE_COUNT)` in training column order.
/// Only the first row's result is returned.
pub trait TabularModel: Send + Sync
{
    fn classify(&self, rows: Array2<f32>) -> Result<ClassifierOutput>;
}

pub struct OnnxTabularModel
{
    session: Session,
}

impl OnnxTabularModel
{
    pub fn load(path: &Path, options: &SessionOptions) -> Result<Self>
    {
        let sources = [ModelSource::Bundled(path.to_path_buf())];
        let session = loader::load_first("clinical", &sources, |source| {
            loader::load_session(source.model_path(), options)
        })?;
        Ok(OnnxTabularModel { session })
    }
}

impl TabularModel for OnnxTabularModel
{
    fn classify(&self, rows: Array2<f32>) -> Result<ClassifierOutput>
    {
        let outputs = self.session.run(inputs![rows]?)?;

        let label = outputs
            .get(LABEL_OUTPUT)
            .ok_or(Error::malformed_output(LABEL_OUTPUT, "not produced by the model"))?
            .try_extract_tensor::<i64>()?
            .iter()
            .next()
            .copied()
            .ok_or(Error::malformed_output(LABEL_OUTPUT, "empty tensor"))?;

        // Shape is (rows, classes).
        let probabilities = outputs
            .get(PROBABILITIES_OUTPUT)
            .ok_or(Error::malformed_output(PROBABILITIES_OUTPUT, "not produced by the model"))?
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix2>()?;
        if probabilities.nrows() == 0 {
            return Err(Error::malformed_output(PROBABILITIES_OUTPUT, "empty tensor"));
        }
        let probabilities = probabilities.row(0).to_vec();

        Ok(ClassifierOutput { label, probabilities })
    }
}

/// Turns clinical feature vectors into diagnoses using a loaded tabular model.
pub struct ClinicalClassifier
{
    model: Box<dyn TabularModel>,
}

impl ClinicalClassifier
{
    pub fn new(model: impl TabularModel + 'static) -> Self
    {
        ClinicalClassifier { model: Box::new(model) }
    }

    pub fn predict(&self, features: &ClinicalFeatureVector) -> Result<ClinicalPrediction>
    {
        let row = Array2::from_shape_vec((1, CLINICAL_FEATURE_COUNT), features.to_row().to_vec())?;
        let output = self.model.classify(row)?;

        let probability = output.probabilities
            .get(POSITIVE_CLASS)
            .copied()
            .ok_or(Error::ClassCountMismatch { expected: 2, actual: output.probabilities.len() })?;

        Ok(ClinicalPrediction {
            prediction: output.label,
            diagnosis: Diagnosis::from_label(output.label),
            probability,
        })
    }
}
