use ndarray::{Array2, Array4, Axis, Ix2};
use ort::{inputs, Session};

use crate::error::{Error, Result};
use crate::interface::{CategoryProbabilities, ImagePrediction};
use crate::loader::{self, ModelSource, SessionOptions};
use crate::preprocessing;
use crate::schema::{MRI_CATEGORIES, MRI_CATEGORY_COUNT};

/// An image classifier taking a `[batch, 128, 128, 3]` tensor and returning one row of
/// class scores per image.
pub trait ImageModel: Send + Sync
{
    fn predict(&self, images: Array4<f32>) -> Result<Array2<f32>>;
}

/// The MRI convolutional network, executed through the ONNX runtime.
pub struct OnnxImageModel
{
    session: Session,
}

impl OnnxImageModel
{
    /// Loads the first source in `sources` that is present and valid.
    pub fn load(sources: &[ModelSource], options: &SessionOptions) -> Result<Self>
    {
        let session = loader::load_first("MRI", sources, |source| {
            loader::load_session(source.model_path(), options)
        })?;
        Ok(OnnxImageModel { session })
    }
}

impl ImageModel for OnnxImageModel
{
    fn predict(&self, images: Array4<f32>) -> Result<Array2<f32>>
    {
        let images_len = images.len_of(Axis(0));
        let outputs = self.session.run(inputs![images]?)?;

        // A softmax classifier has a single output; take whatever it is called.
        let output_name = self.session.outputs
            .first()
            .map(|output| output.name.as_str())
            .ok_or(Error::malformed_output("<first>", "the model declares no outputs"))?;
        let output = outputs
            .get(output_name)
            .ok_or(Error::malformed_output(output_name, "not produced by the model"))?
            .try_extract_tensor::<f32>()?;

        let output = output.into_dimensionality::<Ix2>()?.to_owned();
        if output.nrows() != images_len {
            return Err(Error::malformed_output(
                output_name,
                format!("expected {} rows, got {}", images_len, output.nrows())));
        }

        Ok(output)
    }
}

/// Classifies MRI slices into one of the `schema::MRI_CATEGORIES`.
pub struct MriClassifier
{
    model: Box<dyn ImageModel>,
}

impl MriClassifier
{
    pub fn new(model: impl ImageModel + 'static) -> Self
    {
        MriClassifier { model: Box::new(model) }
    }

    /// Decodes, preprocesses and classifies one uploaded image.
    pub fn classify(&self, image_bytes: &[u8]) -> Result<ImagePrediction>
    {
        let input = preprocessing::load_image_bytes(image_bytes)?;
        let scores = self.model.predict(input)?;
        if scores.nrows() == 0 {
            return Err(Error::ClassCountMismatch { expected: MRI_CATEGORY_COUNT, actual: 0 });
        }
        let row = scores.index_axis(Axis(0), 0);

        let probabilities: [f32; MRI_CATEGORY_COUNT] = row
            .to_vec()
            .try_into()
            .map_err(|v: Vec<f32>| Error::ClassCountMismatch { expected: MRI_CATEGORY_COUNT, actual: v.len() })?;

        let predicted = argmax(&probabilities);

        Ok(ImagePrediction {
            predicted_class: MRI_CATEGORIES[predicted],
            confidence: probabilities[predicted],
            all_probabilities: CategoryProbabilities(probabilities),
        })
    }
}

/// Index of the largest score. The first index wins ties, and NaN never wins unless it
/// comes first.
fn argmax(scores: &[f32]) -> usize
{
    let mut best = 0;
    for (idx, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = idx;
        }
    }
    best
}
