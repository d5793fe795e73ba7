/// This module contains the request and response bodies of the HTTP API.
/// They are (de)serialized as JSON; the field names become the JSON keys, and they must stay
/// in sync with the front-end, which reads `prediction`, `diagnosis` and `probability` directly.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::schema::{CLINICAL_FEATURE_COUNT, MRI_CATEGORIES, MRI_CATEGORY_COUNT};

pub const API_MESSAGE: &str = "Alzheimer's Classification API";
pub const IMAGE_FAILURE_MESSAGE: &str = "Failed to process the image.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApiInfo
{
    pub message: &'static str,
}

impl Default for ApiInfo
{
    fn default() -> Self
    {
        ApiInfo { message: API_MESSAGE }
    }
}

/// The body of a clinical prediction request.
/// Every field is required; values are not range-checked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClinicalFeatureVector
{
    #[serde(rename = "FunctionalAssessment")]
    pub functional_assessment: f64,
    #[serde(rename = "ADL")]
    pub adl: f64,
    #[serde(rename = "MemoryComplaints", deserialize_with = "whole_number")]
    pub memory_complaints: i64,
    #[serde(rename = "MMSE")]
    pub mmse: f64,
    #[serde(rename = "BehavioralProblems", deserialize_with = "whole_number")]
    pub behavioral_problems: i64,
}

/// Accepts a JSON integer, or a float with no fractional part (`1.0`), for the integer flags.
/// Anything else, including `0.5`, is rejected.
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number
    {
        Integer(i64),
        Float(f64),
    }

    match Number::deserialize(deserializer)? {
        Number::Integer(value) => Ok(value),
        Number::Float(value)
            if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 =>
        {
            Ok(value as i64)
        },
        Number::Float(value) => {
            Err(D::Error::custom(format!("expected a whole number, got {}", value)))
        },
    }
}

impl ClinicalFeatureVector
{
    /// Lays the features out in `schema::CLINICAL_FEATURES` order, as the model expects.
    pub fn to_row(&self) -> [f32; CLINICAL_FEATURE_COUNT]
    {
        [
            self.functional_assessment as f32,
            self.adl as f32,
            self.memory_complaints as f32,
            self.mmse as f32,
            self.behavioral_problems as f32,
        ]
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Diagnosis
{
    Positive,
    Negative,
}

impl Diagnosis
{
    pub fn from_label(label: i64) -> Self
    {
        if label == 1 { Diagnosis::Positive } else { Diagnosis::Negative }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClinicalPrediction
{
    pub prediction: i64,
    pub diagnosis: Diagnosis,
    /// Probability of the positive class.
    pub probability: f32,
}

/// Per-category probabilities, indexed like `schema::MRI_CATEGORIES`.
/// Serialized as a JSON object whose keys follow the category order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryProbabilities(pub [f32; MRI_CATEGORY_COUNT]);

impl CategoryProbabilities
{
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_
    {
        MRI_CATEGORIES.iter().copied().zip(self.0.iter().copied())
    }
}

impl Serialize for CategoryProbabilities
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(MRI_CATEGORY_COUNT))?;
        for (category, probability) in self.iter() {
            map.serialize_entry(category, &probability)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImagePrediction
{
    pub predicted_class: &'static str,
    pub confidence: f32,
    pub all_probabilities: CategoryProbabilities,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageFailure
{
    pub error: &'static str,
}

impl Default for ImageFailure
{
    fn default() -> Self
    {
        ImageFailure { error: IMAGE_FAILURE_MESSAGE }
    }
}

/// What the MRI endpoint answers with; both variants are sent with a 200 status.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MriResponse
{
    Prediction(ImagePrediction),
    Failure(ImageFailure),
}

/// Client-side errors (validation, unknown routes).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Detail
{
    pub detail: String,
}

impl Detail
{
    pub fn new(detail: impl Into<String>) -> Self
    {
        Detail { detail: detail.into() }
    }
}
