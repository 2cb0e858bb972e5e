//! Run-level orchestration: enumerate models, build one job per model,
//! execute the jobs and merge their results.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{PredictRequest, ScanConfig};
use crate::dataset::Dataset;
use crate::model::store::{FileModelLoader, IncludeList, ModelLoader, ModelLocator, ModelStore};
use crate::results::ResultSet;
use crate::types::ScanError;
use crate::worker::{CpuDevices, DeviceProvider, WorkerJob, WorkerPool, run_job};

/// Sequence data for a run.
#[derive(Debug, Clone)]
pub enum PredictInput {
    /// One dataset scored by every model.
    ///
    /// When the request has no include list, the dataset's target names
    /// restrict the models; with neither, every model is used.
    Shared(Dataset),

    /// A dataset per model identifier; only these models are scored.
    PerModel(BTreeMap<String, Dataset>),
}

/// Scores sequence data against every requested model.
///
/// # Examples
///
/// ```rust,no_run
/// use bindscan_core::config::{PredictRequest, ScanConfig, ScanWindow};
/// use bindscan_core::predict::{PredictInput, Predictor};
/// use bindscan_core::sequence::io::read_fasta_dataset;
///
/// let data = read_fasta_dataset("sequences.fa")?;
/// let request = PredictRequest {
///     scan: Some(ScanWindow::new(24, 1)),
///     ..PredictRequest::new("models/")
/// };
///
/// let predictor = Predictor::new(ScanConfig::default());
/// let results = predictor.predict(PredictInput::Shared(data), &request)?;
/// for (key, _value) in results.keyed() {
///     println!("{}", key);
/// }
/// # Ok::<(), bindscan_core::types::ScanError>(())
/// ```
pub struct Predictor {
    config: Arc<ScanConfig>,
    loader: Arc<dyn ModelLoader>,
    devices: Box<dyn DeviceProvider>,
}

impl Predictor {
    /// Predictor loading models from disk and using one device per core.
    pub fn new(config: ScanConfig) -> Self {
        let devices = CpuDevices::new(None).with_threads(config.threads_per_device);
        Self {
            config: Arc::new(config),
            loader: Arc::new(FileModelLoader),
            devices: Box::new(devices),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_devices(mut self, devices: impl DeviceProvider + 'static) -> Self {
        self.devices = Box::new(devices);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Runs one job per requested model and merges the results.
    ///
    /// With worker isolation, jobs run on a [`WorkerPool`]; the first
    /// captured failure terminates the pool and is raised as a single
    /// [`ScanError::WorkerFailure`], discarding every other result. Without
    /// isolation, jobs run one after another on the calling thread and the
    /// first error propagates unchanged.
    ///
    /// # Errors
    ///
    /// - [`ScanError::Configuration`] for invalid settings, no matching
    ///   models, a per-model input missing a model's data, or prediction
    ///   maps requested from an evaluable model without scan parameters
    /// - [`ScanError::WorkerFailure`] when any job fails in a worker
    pub fn predict(&self, input: PredictInput, request: &PredictRequest) -> Result<ResultSet, ScanError> {
        self.config.validate()?;
        request.validate()?;

        let include = resolve_include(&input, request.include.as_ref());
        let models = ModelStore::enumerate(&request.model_dir, include.as_ref())?;
        let jobs = build_jobs(input, models, request)?;
        log::info!("Scoring {} models", jobs.len());

        if self.config.isolate_workers {
            self.run_pooled(jobs)
        } else {
            self.run_sequential(jobs)
        }
    }

    fn run_sequential(&self, jobs: Vec<WorkerJob>) -> Result<ResultSet, ScanError> {
        let mut results = ResultSet::new();
        for job in jobs {
            if job.verbose {
                log::info!("main:{}", job.model_id);
            }
            results.insert(run_job(&job, &self.config, self.loader.as_ref(), None)?);
        }
        Ok(results)
    }

    fn run_pooled(&self, jobs: Vec<WorkerJob>) -> Result<ResultSet, ScanError> {
        let devices = self.devices.devices()?;
        let mut pool = WorkerPool::new(&devices, Arc::clone(&self.config), Arc::clone(&self.loader))?;
        for job in jobs {
            pool.submit(job)?;
        }

        let mut results = ResultSet::new();
        while let Some(outcome) = pool.recv() {
            match outcome {
                Ok(result) => results.insert(result),
                Err(failure) => {
                    log::warn!("Aborting run after failure on {}", failure.model_id);
                    pool.terminate();
                    return Err(failure.into_error());
                }
            }
        }
        if pool.pending() > 0 {
            let missing = pool.pending();
            pool.terminate();
            return Err(ScanError::WorkerFailure {
                model_id: String::new(),
                message: format!("workers exited with {} jobs unfinished", missing),
                trace: String::new(),
            });
        }
        pool.close();
        Ok(results)
    }
}

fn resolve_include(input: &PredictInput, requested: Option<&IncludeList>) -> Option<IncludeList> {
    let mut include = requested.cloned().unwrap_or_default();
    match input {
        PredictInput::Shared(data) => include.extend(data.targets().iter().cloned()),
        PredictInput::PerModel(map) => include.extend(map.keys().cloned()),
    }
    (!include.is_empty()).then_some(include)
}

fn build_jobs(
    input: PredictInput,
    models: BTreeMap<String, ModelLocator>,
    request: &PredictRequest,
) -> Result<Vec<WorkerJob>, ScanError> {
    let shared = match &input {
        PredictInput::Shared(data) => Some(Arc::new(data.clone())),
        PredictInput::PerModel(_) => None,
    };
    let mut per_model = match input {
        PredictInput::PerModel(map) => map,
        PredictInput::Shared(_) => BTreeMap::new(),
    };

    models
        .into_iter()
        .map(|(model_id, locator)| {
            if request.want_prediction_maps
                && request.scan.is_none()
                && matches!(locator, ModelLocator::Directory(_))
            {
                return Err(ScanError::Configuration(format!(
                    "prediction maps for model {} require scan mode",
                    model_id
                )));
            }
            let data = match &shared {
                Some(data) => Arc::clone(data),
                None => Arc::new(per_model.remove(&model_id).ok_or_else(|| {
                    ScanError::Configuration(format!("no input data for model {}", model_id))
                })?),
            };
            Ok(WorkerJob {
                model_id,
                locator,
                scan: request.scan,
                data,
                outdir: request.outdir.clone(),
                verbose: request.verbose,
                want_prediction_maps: request.want_prediction_maps,
                attribution: request.attribution,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AttributionMode, ScanWindow, StrandMode};
    use crate::model::Model;
    use crate::model::StaticWeightModel;
    use crate::results::ResultLayout;
    use crate::worker::Device;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const PFM: &str = "pos\tA\tC\tG\tT\n1\t0.0\t0.0\t1.0\t0.0\n";
    const MODEL: &str = r#"{ "filters": [{ "weights": [[0, 0, 1, 0]] }], "readout": [1.0], "output": "regression" }"#;

    struct FixedDevices(usize);

    impl DeviceProvider for FixedDevices {
        fn devices(&self) -> Result<Vec<Device>, ScanError> {
            Ok((0..self.0).map(|index| Device { index, threads: 1 }).collect())
        }
    }

    /// Loads everything as a one-column `G` matrix, but fails for `BAD`
    struct FailingLoader;

    impl ModelLoader for FailingLoader {
        fn load(&self, locator: &ModelLocator) -> Result<Model, ScanError> {
            if locator.path().to_string_lossy().contains("BAD") {
                return Err(ScanError::Model("corrupt weights".to_string()));
            }
            Ok(Model::Static(StaticWeightModel::from_rows(&[[0.0, 0.0, 1.0, 0.0]])?))
        }
    }

    fn pfm_dir(ids: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for id in ids {
            fs::write(dir.path().join(format!("{}.pfm", id)), PFM).unwrap();
        }
        dir
    }

    fn model_dir(ids: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for id in ids {
            let sub = dir.path().join(id);
            fs::create_dir(&sub).unwrap();
            fs::write(sub.join("model.json"), MODEL).unwrap();
        }
        dir
    }

    fn predictor(isolate: bool) -> Predictor {
        Predictor::new(ScanConfig {
            isolate_workers: isolate,
            ..Default::default()
        })
        .with_devices(FixedDevices(2))
    }

    fn shared(pairs: &[(&str, &str)]) -> PredictInput {
        PredictInput::Shared(Dataset::from_pairs(pairs).unwrap())
    }

    fn request(dir: &Path) -> PredictRequest {
        PredictRequest::new(dir)
    }

    #[test]
    fn test_direct_single_sequence_single_key() {
        let dir = model_dir(&["M1"]);
        let results = predictor(true)
            .predict(shared(&[("s", "ACGTGGACGT")]), &request(dir.path()))
            .unwrap();
        let keyed = results.keyed();
        assert_eq!(keyed.keys().collect::<Vec<_>>(), vec!["M1"]);
        assert_eq!(keyed["M1"].scalar(0), Some(1.0));
    }

    #[test]
    fn test_one_failure_discards_all_results() {
        let dir = pfm_dir(&["A1", "BAD", "C3"]);
        let result = predictor(true)
            .with_loader(Arc::new(FailingLoader))
            .predict(shared(&[("s", "GATTACA")]), &request(dir.path()));
        match result {
            Err(ScanError::WorkerFailure { model_id, message, .. }) => {
                assert_eq!(model_id, "BAD");
                assert!(message.contains("corrupt weights"));
            }
            other => panic!("expected worker failure, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_sequential_mode_propagates_original_error() {
        let dir = pfm_dir(&["A1", "BAD"]);
        let result = predictor(false)
            .with_loader(Arc::new(FailingLoader))
            .predict(shared(&[("s", "GATTACA")]), &request(dir.path()));
        assert!(matches!(result, Err(ScanError::Model(_))));
    }

    #[test]
    fn test_pooled_and_sequential_agree() {
        let dir = pfm_dir(&["P1", "P2", "P3"]);
        let input = shared(&[("a", "GGA"), ("b", "TTTT")]);
        let pooled = predictor(true).predict(input.clone(), &request(dir.path())).unwrap();
        let sequential = predictor(false).predict(input, &request(dir.path())).unwrap();
        assert_eq!(pooled.len(), 3);
        assert_eq!(pooled.keyed().keys().collect::<Vec<_>>(), sequential.keyed().keys().collect::<Vec<_>>());
        let result = pooled.get("P2").unwrap();
        assert_eq!(result.layout, ResultLayout::Scanned);
        assert_eq!(result.sum.as_ref().unwrap().to_vec(), vec![2.0, 0.0]);
    }

    #[test]
    fn test_include_list_and_targets_filter_models() {
        let dir = pfm_dir(&["P1", "P2", "P3"]);
        let mut req = request(dir.path());
        req.include = Some(IncludeList::from_ids(["P1"]));
        let data = Dataset::from_pairs(&[("a", "G")]).unwrap().with_targets(vec!["P3".to_string()]);
        let results = predictor(false).predict(PredictInput::Shared(data), &req).unwrap();
        assert_eq!(results.model_ids().collect::<Vec<_>>(), vec!["P1", "P3"]);
    }

    #[test]
    fn test_no_matching_models() {
        let dir = pfm_dir(&["P1"]);
        let mut req = request(dir.path());
        req.include = Some(IncludeList::from_ids(["ZZZ"]));
        assert!(matches!(
            predictor(false).predict(shared(&[("a", "G")]), &req),
            Err(ScanError::Configuration(_))
        ));
    }

    #[test]
    fn test_per_model_input() {
        let dir = pfm_dir(&["P1", "P2"]);
        let mut map = BTreeMap::new();
        map.insert("P2".to_string(), Dataset::from_pairs(&[("x", "GG"), ("y", "A")]).unwrap());
        let results = predictor(true).predict(PredictInput::PerModel(map), &request(dir.path())).unwrap();
        assert_eq!(results.model_ids().collect::<Vec<_>>(), vec!["P2"]);
        assert_eq!(results.get("P2").unwrap().max.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_scan_keys_for_evaluable_models() {
        let dir = model_dir(&["M1"]);
        let req = PredictRequest {
            scan: Some(ScanWindow::new(3, 1)),
            want_prediction_maps: true,
            attribution: Some(AttributionMode::Analytic),
            ..request(dir.path())
        };
        let config = ScanConfig {
            strand_mode: StrandMode::Both,
            ..Default::default()
        };
        let results = Predictor::new(config)
            .with_devices(FixedDevices(1))
            .predict(shared(&[("s", "AGGT")]), &req)
            .unwrap();
        let keys: Vec<String> = results.keyed().into_keys().collect();
        assert_eq!(keys, vec!["M1.avg", "M1.direct", "M1.gmaps", "M1.max", "M1.pmaps", "M1.sum"]);
        let maps = results.get("M1").unwrap().prediction_maps.as_ref().unwrap();
        assert_eq!(maps[0].len(), 6);
    }

    #[test]
    fn test_prediction_maps_need_scan_for_evaluable_models() {
        let dir = model_dir(&["M1"]);
        let req = PredictRequest {
            want_prediction_maps: true,
            ..request(dir.path())
        };
        assert!(matches!(
            predictor(false).predict(shared(&[("a", "G")]), &req),
            Err(ScanError::Configuration(_))
        ));

        // Static-weight models always scan, so the request is fine for them
        let dir = pfm_dir(&["P1"]);
        let req = PredictRequest {
            want_prediction_maps: true,
            ..request(dir.path())
        };
        let results = predictor(false).predict(shared(&[("a", "G")]), &req).unwrap();
        assert!(results.get("P1").unwrap().prediction_maps.is_some());
    }
}
