/// Positional layouts the models were trained against.
/// The clinical model consumes its features by column index and the MRI model emits its
/// class scores by row index, so these orders must never change without retraining
/// (or re-exporting) the corresponding model.

/// Clinical feature columns, in training order.
pub const CLINICAL_FEATURES: [&str; 5] = [
    "FunctionalAssessment",
    "ADL",
    "MemoryComplaints",
    "MMSE",
    "BehavioralProblems",
];

/// MRI categories, in the order of the image model's output vector.
pub const MRI_CATEGORIES: [&str; 4] = [
    "MildDemented",
    "ModerateDemented",
    "NonDemented",
    "VeryMildDemented",
];

pub const CLINICAL_FEATURE_COUNT: usize = CLINICAL_FEATURES.len();
pub const MRI_CATEGORY_COUNT: usize = MRI_CATEGORIES.len();

/// Index of the positive class in the clinical model's probability row.
pub const POSITIVE_CLASS: usize = 1;
