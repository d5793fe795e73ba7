/// Loading of model artifacts into ONNX runtime sessions.
///
/// A model may be available from more than one place on disk; `load_first()` walks an
/// ordered list of sources and returns the first one that loads, logging each attempt.
/// For the MRI model the chain is a single bundled file first, then a graph file whose
/// initializers live in a separate external-data (weights) file.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use log::{info, warn};
use ort::{CPUExecutionProvider, GraphOptimizationLevel, Session};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions
{
    pub intra_threads: usize,
}

impl Default for SessionOptions
{
    fn default() -> Self
    {
        SessionOptions { intra_threads: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource
{
    /// Architecture and weights in one file.
    Bundled(PathBuf),
    /// Architecture in `graph`, weights in `weights`. The runtime resolves the weights
    /// through the external-data location recorded in the graph, which is relative to the
    /// graph's directory, so `weights` must live in that same directory.
    Split { graph: PathBuf, weights: PathBuf },
}

impl ModelSource
{
    /// The file handed to the runtime.
    pub fn model_path(&self) -> &Path
    {
        match self {
            ModelSource::Bundled(path) => path,
            ModelSource::Split { graph, .. } => graph,
        }
    }

    /// Checks every file this source needs, logging what it finds.
    pub fn ensure_present(&self) -> Result<()>
    {
        let required: Vec<&Path> = match self {
            ModelSource::Bundled(path) => vec![path],
            ModelSource::Split { graph, weights } => vec![graph, weights],
        };
        for path in required {
            let exists = path.is_file();
            info!("Model file {:?} exists: {}", path, exists);
            if !exists {
                return Err(Error::ArtifactNotFound(path.to_path_buf()));
            }
        }

        if let ModelSource::Split { graph, weights } = self {
            let graph_dir = graph.canonicalize()?.parent().map(Path::to_path_buf);
            let weights_dir = weights.canonicalize()?.parent().map(Path::to_path_buf);
            if graph_dir != weights_dir {
                return Err(Error::WeightsNotBesideGraph {
                    graph: graph.clone(),
                    weights: weights.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Display for ModelSource
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result
    {
        match self {
            ModelSource::Bundled(path) => write!(f, "bundled file {:?}", path),
            ModelSource::Split { graph, weights } => write!(f, "graph {:?} with weights {:?}", graph, weights),
        }
    }
}

/// Tries each source in order and returns the first model that loads.
/// Every failed attempt is logged and included in the final error if nothing loads.
pub fn load_first<T, F>(model: &str, sources: &[ModelSource], mut load: F) -> Result<T>
where
    F: FnMut(&ModelSource) -> Result<T>,
{
    let mut failures = Vec::with_capacity(sources.len());
    for (attempt, source) in sources.iter().enumerate() {
        info!("Loading {} model from {} (attempt {}/{})", model, source, attempt + 1, sources.len());
        match source.ensure_present().and_then(|_| load(source)) {
            Ok(loaded) => {
                info!("{} model loaded successfully from {}", model, source);
                return Ok(loaded);
            },
            Err(e) => {
                warn!("Could not load {} model from {}: {}", model, source, e);
                failures.push(format!("{} ({})", source, e));
            }
        }
    }

    if failures.is_empty() {
        failures.push("no sources configured".to_string());
    }
    Err(Error::NoLoadableSource { model: model.to_string(), attempts: failures.join("; ") })
}

/// Builds an inference session for the given ONNX file.
pub fn load_session(path: &Path, options: &SessionOptions) -> Result<Session>
{
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(options.intra_threads)?
        .with_execution_providers([CPUExecutionProvider::default().build()])?
        .commit_from_file(path)?;

    let inputs: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
    let outputs: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
    info!("Session for {:?} has inputs {:?} and outputs {:?}", path, inputs, outputs);

    Ok(session)
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use super::*;

    #[test]
    fn first_loadable_source_wins()
    {
        let dir = tempfile::tempdir().unwrap();
        let bundled = dir.path().join("model.onnx");
        let graph = dir.path().join("graph.onnx");
        let weights = dir.path().join("graph.onnx.data");
        fs::write(&bundled, b"bundled").unwrap();
        fs::write(&graph, b"graph").unwrap();
        fs::write(&weights, b"weights").unwrap();

        let sources = [
            ModelSource::Bundled(bundled.clone()),
            ModelSource::Split { graph, weights },
        ];
        let mut attempts = 0;
        let loaded = load_first("test", &sources, |source| {
            attempts += 1;
            Ok(source.model_path().to_path_buf())
        }).unwrap();

        assert_eq!(loaded, bundled);
        assert_eq!(attempts, 1);
    }

    #[test]
    fn falls_back_to_split_artifacts_when_bundled_file_is_missing()
    {
        let dir = tempfile::tempdir().unwrap();
        let graph = dir.path().join("graph.onnx");
        let weights = dir.path().join("graph.onnx.data");
        fs::write(&graph, b"graph").unwrap();
        fs::write(&weights, b"weights").unwrap();

        let sources = [
            ModelSource::Bundled(dir.path().join("missing.onnx")),
            ModelSource::Split { graph: graph.clone(), weights },
        ];
        let loaded = load_first("test", &sources, |source| Ok(source.model_path().to_path_buf())).unwrap();
        assert_eq!(loaded, graph);
    }

    #[test]
    fn falls_back_when_the_loader_rejects_a_present_file()
    {
        let dir = tempfile::tempdir().unwrap();
        let corrupt = dir.path().join("corrupt.onnx");
        let good = dir.path().join("good.onnx");
        fs::write(&corrupt, b"corrupt").unwrap();
        fs::write(&good, b"good").unwrap();

        let sources = [ModelSource::Bundled(corrupt.clone()), ModelSource::Bundled(good.clone())];
        let loaded = load_first("test", &sources, |source| {
            if source.model_path() == corrupt {
                Err(Error::malformed_output("graph", "unparseable"))
            } else {
                Ok(source.model_path().to_path_buf())
            }
        }).unwrap();
        assert_eq!(loaded, good);
    }

    #[test]
    fn split_source_requires_its_weights()
    {
        let dir = tempfile::tempdir().unwrap();
        let graph = dir.path().join("graph.onnx");
        fs::write(&graph, b"graph").unwrap();

        let source = ModelSource::Split { graph, weights: dir.path().join("graph.onnx.data") };
        assert!(matches!(source.ensure_present(), Err(Error::ArtifactNotFound(_))));
    }

    #[test]
    fn split_source_rejects_weights_outside_the_graph_directory()
    {
        let graph_dir = tempfile::tempdir().unwrap();
        let weights_dir = tempfile::tempdir().unwrap();
        let graph = graph_dir.path().join("graph.onnx");
        let weights = weights_dir.path().join("graph.onnx.data");
        fs::write(&graph, b"graph").unwrap();
        fs::write(&weights, b"weights").unwrap();

        let source = ModelSource::Split { graph, weights };
        assert!(matches!(source.ensure_present(), Err(Error::WeightsNotBesideGraph { .. })));

        let mut attempts = 0;
        let result: Result<()> = load_first("mri", &[source], |_| {
            attempts += 1;
            Ok(())
        });
        assert!(matches!(result, Err(Error::NoLoadableSource { .. })));
        assert_eq!(attempts, 0);
    }

    #[test]
    fn split_source_accepts_weights_beside_the_graph()
    {
        let dir = tempfile::tempdir().unwrap();
        let graph = dir.path().join("graph.onnx");
        let weights = dir.path().join("graph.onnx.data");
        fs::write(&graph, b"graph").unwrap();
        fs::write(&weights, b"weights").unwrap();

        assert!(ModelSource::Split { graph, weights }.ensure_present().is_ok());
    }

    #[test]
    fn reports_every_failed_attempt()
    {
        let dir = tempfile::tempdir().unwrap();
        let sources = [
            ModelSource::Bundled(dir.path().join("a.onnx")),
            ModelSource::Bundled(dir.path().join("b.onnx")),
        ];
        let result: Result<()> = load_first("mri", &sources, |_| Ok(()));
        match result {
            Err(Error::NoLoadableSource { model, attempts }) => {
                assert_eq!(model, "mri");
                assert!(attempts.contains("a.onnx"));
                assert!(attempts.contains("b.onnx"));
            },
            other => panic!("expected NoLoadableSource, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn empty_chain_is_an_error()
    {
        let result: Result<()> = load_first("clinical", &[], |_| Ok(()));
        assert!(matches!(result, Err(Error::NoLoadableSource { .. })));
    }
}
