/// HTTP endpoints. Handlers only move data between the wire and the classifiers in `AppState`;
/// inference runs on the blocking thread pool so the workers keep accepting requests.

use actix_multipart::Multipart;
use actix_web::error::InternalError;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use futures_util::StreamExt as _;
use log::{debug, error};

use crate::error::Error;
use crate::interface::{ApiInfo, ClinicalFeatureVector, Detail, ImageFailure, MriResponse};
use crate::state::AppState;

/// Name of the multipart part carrying the uploaded scan.
pub const UPLOAD_FIELD: &str = "file";

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Largest MRI upload, in bytes, read before giving up. Register with `App::app_data`;
/// `DEFAULT_MAX_UPLOAD_BYTES` applies when none is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimit(pub usize);

impl Default for UploadLimit
{
    fn default() -> Self
    {
        UploadLimit(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

pub fn configure(cfg: &mut web::ServiceConfig)
{
    cfg.app_data(json_config())
        .service(root)
        .service(predict_clinical)
        .service(predict_mri)
        .default_service(web::to(not_found));
}

/// Malformed clinical bodies are answered with 422 and the reason, before any model runs.
fn json_config() -> web::JsonConfig
{
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("Rejected request body: {}", err);
        let response = HttpResponse::UnprocessableEntity().json(Detail::new(err.to_string()));
        InternalError::from_response(err, response).into()
    })
}

#[get("/")]
pub async fn root() -> HttpResponse
{
    HttpResponse::Ok().json(ApiInfo::default())
}

/// Predicts an Alzheimer's diagnosis from clinical features.
/// `prediction` is 1 for a positive diagnosis and 0 otherwise.
/// Inference failures are not caught here; they surface as a 500.
#[post("/predict/clinical")]
pub async fn predict_clinical(
    state: web::Data<AppState>,
    features: web::Json<ClinicalFeatureVector>,
) -> Result<HttpResponse, Error>
{
    let features = features.into_inner();
    let prediction = web::block(move || state.clinical.predict(&features)).await??;
    debug!("Clinical prediction for {:?}: {:?}", features, prediction);

    Ok(HttpResponse::Ok().json(prediction))
}

/// Classifies an uploaded MRI scan.
/// A missing upload is a client error, but anything that goes wrong once we have the bytes
/// (undecodable image, inference failure) is logged and answered with a generic error body.
#[post("/predict/MRIImage")]
pub async fn predict_mri(
    req: HttpRequest,
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> HttpResponse
{
    let UploadLimit(max_bytes) = req.app_data::<UploadLimit>().copied().unwrap_or_default();

    while let Some(field) = payload.next().await {
        let mut field = match field {
            Ok(field) => field,
            Err(e) => return HttpResponse::UnprocessableEntity().json(Detail::new(e.to_string())),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let mut upload = Vec::new();
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(chunk) if upload.len() + chunk.len() > max_bytes => {
                    error!("Uploaded image exceeds the {} byte limit", max_bytes);
                    return HttpResponse::Ok().json(MriResponse::Failure(ImageFailure::default()));
                },
                Ok(chunk) => upload.extend_from_slice(&chunk),
                Err(e) => {
                    error!("Error reading uploaded image: {}", e);
                    return HttpResponse::Ok().json(MriResponse::Failure(ImageFailure::default()));
                }
            }
        }

        return HttpResponse::Ok().json(classify_upload(state, upload).await);
    }

    HttpResponse::UnprocessableEntity().json(Detail::new(format!("Field required: {}", UPLOAD_FIELD)))
}

async fn classify_upload(state: web::Data<AppState>, upload: Vec<u8>) -> MriResponse
{
    let upload_len = upload.len();
    let result = web::block(move || state.mri.classify(&upload)).await;

    match result {
        Ok(Ok(prediction)) => {
            debug!("MRI prediction for {} byte upload: {:?}", upload_len, prediction);
            MriResponse::Prediction(prediction)
        },
        Ok(Err(e)) => {
            error!("Error processing {} byte MRI upload: {:?}", upload_len, e);
            MriResponse::Failure(ImageFailure::default())
        },
        Err(e) => {
            error!("MRI inference task did not complete: {:?}", e);
            MriResponse::Failure(ImageFailure::default())
        }
    }
}

pub async fn not_found() -> HttpResponse
{
    HttpResponse::NotFound().json(Detail::new("Not Found"))
}
