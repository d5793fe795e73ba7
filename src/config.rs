//! Command-line and environment configuration for the API server.

use std::path::PathBuf;

use clap::{Args, Parser};
use log::LevelFilter;

use crate::loader::{ModelSource, SessionOptions};

/// Alzheimer's Classification API - clinical and MRI inference over HTTP
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerOptions
{
    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1", env = "ALZ_API_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000, env = "ALZ_API_PORT")]
    pub port: u16,

    /// Number of HTTP worker threads (defaults to one per core)
    #[arg(long, env = "ALZ_WORKERS")]
    pub workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG still applies on top
    #[arg(long, env = "ALZ_LOG_LEVEL")]
    pub log_level: Option<LevelFilter>,

    /// Largest accepted MRI upload, in MiB
    #[arg(long, default_value_t = 32, env = "ALZ_MAX_UPLOAD_MB")]
    pub max_upload_mb: usize,

    #[command(flatten)]
    pub models: ModelOptions,
}

#[derive(Args, Debug, Clone)]
pub struct ModelOptions
{
    /// ONNX export of the clinical classifier
    #[arg(long, default_value = "models/xgb_tuned_clinical_model.onnx", env = "ALZ_CLINICAL_MODEL")]
    pub clinical_model: PathBuf,

    /// Bundled ONNX file of the MRI classifier (tried first)
    #[arg(long, default_value = "models/alzheimer_mri_cnn.onnx", env = "ALZ_MRI_MODEL")]
    pub mri_model: PathBuf,

    /// MRI classifier graph whose weights are stored externally (tried second)
    #[arg(long, default_value = "models/alzheimer_mri_cnn_graph.onnx", env = "ALZ_MRI_GRAPH")]
    pub mri_graph: PathBuf,

    /// External weights referenced by --mri-graph
    #[arg(long, default_value = "models/alzheimer_mri_cnn_graph.onnx.data", env = "ALZ_MRI_WEIGHTS")]
    pub mri_weights: PathBuf,

    /// Intra-op threads per inference session
    #[arg(long, default_value_t = 4, env = "ALZ_INTRA_THREADS")]
    pub intra_threads: usize,
}

impl ServerOptions
{
    pub fn max_upload_bytes(&self) -> usize
    {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl ModelOptions
{
    /// The MRI model sources, in the order they are tried.
    pub fn mri_sources(&self) -> Vec<ModelSource>
    {
        vec![
            ModelSource::Bundled(self.mri_model.clone()),
            ModelSource::Split { graph: self.mri_graph.clone(), weights: self.mri_weights.clone() },
        ]
    }

    pub fn session_options(&self) -> SessionOptions
    {
        SessionOptions { intra_threads: self.intra_threads }
    }
}
