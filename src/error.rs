use std::path::PathBuf;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Ort(#[from] ort::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    #[error(transparent)]
    Blocking(#[from] actix_web::error::BlockingError),
    #[error("Model artifact not found at {0:?}")]
    ArtifactNotFound(PathBuf),
    #[error("Weights {weights:?} must be in the same directory as the graph {graph:?}")]
    WeightsNotBesideGraph { graph: PathBuf, weights: PathBuf },
    #[error("Model output {output:?} is missing or malformed: {reason}")]
    MalformedOutput { output: String, reason: String },
    #[error("Expected {expected} class probabilities, but the model produced {actual}")]
    ClassCountMismatch { expected: usize, actual: usize },
    #[error("Unable to load the {model} model from any source: {attempts}")]
    NoLoadableSource { model: String, attempts: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error
{
    pub fn malformed_output(output: &str, reason: impl Into<String>) -> Self
    {
        Error::MalformedOutput { output: output.to_string(), reason: reason.into() }
    }
}

/// Anything reaching the HTTP layer as an `Error` is an unhandled failure.
/// The cause is logged; the client only sees a bare 500.
impl ResponseError for Error
{
    fn status_code(&self) -> StatusCode
    {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse
    {
        log::error!("Unhandled error while serving request: {:?}", self);
        HttpResponse::InternalServerError()
            .content_type("text/plain; charset=utf-8")
            .body("Internal Server Error")
    }
}
