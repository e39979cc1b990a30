//! Parameter sweeps over batches of images.
//!
//! A sweep compresses every image of a batch with every parameter of a [`SweepConfig`]
//! and evaluates the result. Work items run on a bounded rayon pool; the report is
//! always ordered parameter-major, image-minor, independent of completion order.
//! A failing item is recorded in place and does not abort the sweep.

use crate::image_compressor::{compress_decomposed, decompose_image, CompressionMetadata, ImageDecomposition};
use crate::metrics::{evaluate, MetricsRecord};
use crate::strategy::{CompressionParameter, CompressionStrategy, StrategyKind, StrategyOutput};
use crate::types::{Image, Result, SvdCompressionError};
use itertools::iproduct;
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn default_reuse_decompositions() -> bool {
    true
}

/// Explicit configuration of a sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub strategy: StrategyKind,
    /// Parameters in the order they are reported
    pub parameters: Vec<CompressionParameter>,
    /// Only process this many images from the front of the batch
    #[serde(default)]
    pub max_images: Option<usize>,
    /// Size of the worker pool, defaults to the available parallelism
    #[serde(default)]
    pub num_workers: Option<usize>,
    /// Decompose every image once and reuse it for all SVD parameters
    #[serde(default = "default_reuse_decompositions")]
    pub reuse_decompositions: bool,
}

impl SweepConfig {
    pub fn new(strategy: StrategyKind, parameters: Vec<CompressionParameter>) -> Self {
        SweepConfig {
            strategy,
            parameters,
            max_images: None,
            num_workers: None,
            reuse_decompositions: default_reuse_decompositions(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.parameters.is_empty() {
            return Err(SvdCompressionError::InvalidInput(
                "sweep needs at least one parameter".to_string(),
            ));
        }

        if self.num_workers == Some(0) {
            return Err(SvdCompressionError::InvalidInput(
                "sweep needs at least one worker".to_string(),
            ));
        }

        for parameter in &self.parameters {
            if parameter.kind() != self.strategy {
                return Err(SvdCompressionError::InvalidInput(format!(
                    "parameter {} does not belong to {:?}",
                    parameter, self.strategy
                )));
            }
            parameter.validate()?;
        }

        Ok(())
    }

    /// Number of worker threads used by the sweep.
    pub fn worker_count(&self) -> usize {
        self.num_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1)
        })
    }
}

/// An image of the batch together with its stored size.
#[derive(Clone, Debug)]
pub struct SweepInput {
    /// Identifier of the image, usually its file name
    pub name: String,
    pub image: Image,
    /// Size of the stored original in bytes
    pub size_bytes: u64,
}

/// Storage for compressed images, e.g. a directory of lossless PNG files.
pub trait ArtifactStore: Sync {
    /// Persist `image` under `artifact_name` and return the stored size in bytes.
    fn store(&self, artifact_name: &str, image: &Image) -> Result<u64>;
}

/// Sink for metrics tables, one table per (strategy, parameter) pair.
pub trait MetricsExporter {
    /// Write the rows of one table. Columns are image identifier, compression ratio,
    /// peak signal to noise ratio and structural similarity.
    fn export(&mut self, file_name: &str, rows: &[(String, MetricsRecord)]) -> Result<()>;
}

/// Cooperative cancellation flag shared between a sweep and its caller.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one successful (parameter, image) item.
#[derive(Clone, Debug)]
pub struct ImageResult {
    pub image_name: String,
    pub artifact_name: String,
    pub compressed: Image,
    pub metadata: Option<CompressionMetadata>,
    pub metrics: MetricsRecord,
}

#[derive(Clone, Debug)]
pub enum Outcome {
    Completed(Box<ImageResult>),
    Failed { image_name: String, reason: String },
    Cancelled { image_name: String },
}

impl Outcome {
    pub fn image_name(&self) -> &str {
        match self {
            Outcome::Completed(result) => result.image_name.as_str(),
            Outcome::Failed { image_name, .. } | Outcome::Cancelled { image_name } => {
                image_name.as_str()
            }
        }
    }

    pub fn completed(&self) -> Option<&ImageResult> {
        match self {
            Outcome::Completed(result) => Some(result.as_ref()),
            _ => None,
        }
    }
}

/// Maximum, minimum and mean of a metric over the images of one parameter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
}

impl MetricSummary {
    fn from_values<I: Iterator<Item = f64>>(values: I) -> Option<Self> {
        let (max, min, sum, count) = values.fold(
            (f64::NEG_INFINITY, f64::INFINITY, 0.0, 0usize),
            |(max, min, sum, count), value| (max.max(value), min.min(value), sum + value, count + 1),
        );

        if count == 0 {
            None
        } else {
            Some(MetricSummary {
                max,
                min,
                mean: sum / count as f64,
            })
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub compression_ratio: MetricSummary,
    pub peak_signal_noise_ratio: MetricSummary,
    pub structural_similarity: MetricSummary,
}

/// All outcomes of one parameter, in input image order.
#[derive(Clone, Debug)]
pub struct ParameterBucket {
    pub parameter: CompressionParameter,
    pub outcomes: Vec<Outcome>,
}

impl ParameterBucket {
    /// Metrics of the completed images, keyed by artifact name.
    pub fn records(&self) -> Vec<(String, MetricsRecord)> {
        self.outcomes
            .iter()
            .filter_map(Outcome::completed)
            .map(|result| (result.artifact_name.clone(), result.metrics))
            .collect()
    }

    /// Compressed images of the completed items.
    pub fn compressed_images(&self) -> Vec<&Image> {
        self.outcomes
            .iter()
            .filter_map(Outcome::completed)
            .map(|result| &result.compressed)
            .collect()
    }

    /// Aggregate the metrics of the completed images. `None` if nothing completed.
    pub fn summary(&self) -> Option<BucketSummary> {
        let records: Vec<MetricsRecord> = self.records().into_iter().map(|(_, record)| record).collect();

        Some(BucketSummary {
            compression_ratio: MetricSummary::from_values(records.iter().map(|r| r.compression_ratio))?,
            peak_signal_noise_ratio: MetricSummary::from_values(
                records.iter().map(|r| r.peak_signal_noise_ratio),
            )?,
            structural_similarity: MetricSummary::from_values(
                records.iter().map(|r| r.structural_similarity),
            )?,
        })
    }
}

/// A work item that did not complete.
#[derive(Clone, Debug, PartialEq)]
pub struct FailedItem {
    pub parameter: CompressionParameter,
    pub image_index: usize,
    pub image_name: String,
    /// `None` if the item was cancelled
    pub reason: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SweepReport {
    pub strategy: StrategyKind,
    pub buckets: Vec<ParameterBucket>,
}

impl SweepReport {
    /// All items that failed or were cancelled, parameter-major.
    pub fn failures(&self) -> Vec<FailedItem> {
        let mut failures = Vec::new();

        for bucket in &self.buckets {
            for (image_index, outcome) in bucket.outcomes.iter().enumerate() {
                let reason = match outcome {
                    Outcome::Completed(_) => continue,
                    Outcome::Failed { reason, .. } => Some(reason.clone()),
                    Outcome::Cancelled { .. } => None,
                };
                failures.push(FailedItem {
                    parameter: bucket.parameter,
                    image_index,
                    image_name: outcome.image_name().to_string(),
                    reason,
                });
            }
        }

        failures
    }

    pub fn is_complete(&self) -> bool {
        self.buckets
            .iter()
            .all(|bucket| bucket.outcomes.iter().all(|outcome| outcome.completed().is_some()))
    }

    /// Hand the metrics of every parameter to `exporter`, one table per parameter.
    pub fn export<E: MetricsExporter + ?Sized>(&self, exporter: &mut E) -> Result<()> {
        for bucket in &self.buckets {
            exporter.export(&bucket.parameter.metrics_file_name(), &bucket.records())?;
        }
        Ok(())
    }
}

/// Collects results keyed by (parameter index, image index) in any order.
struct OrderedCollector<T> {
    num_parameters: usize,
    num_images: usize,
    slots: Vec<Option<T>>,
}

impl<T> OrderedCollector<T> {
    fn new(num_parameters: usize, num_images: usize) -> Self {
        OrderedCollector {
            num_parameters,
            num_images,
            slots: std::iter::repeat_with(|| None)
                .take(num_parameters * num_images)
                .collect(),
        }
    }

    fn insert(&mut self, key: (usize, usize), value: T) {
        let (parameter_index, image_index) = key;
        self.slots[parameter_index * self.num_images + image_index] = Some(value);
    }

    /// Return one row per parameter. Empty slots are filled by `missing`.
    fn into_rows<F: FnMut(usize, usize) -> T>(self, mut missing: F) -> Vec<Vec<T>> {
        let mut slots = self.slots.into_iter();
        let mut rows = Vec::with_capacity(self.num_parameters);

        for parameter_index in 0..self.num_parameters {
            let mut row = Vec::with_capacity(self.num_images);
            for image_index in 0..self.num_images {
                let value = match slots.next() {
                    Some(Some(value)) => value,
                    _ => missing(parameter_index, image_index),
                };
                row.push(value);
            }
            rows.push(row);
        }

        rows
    }
}

pub struct SweepRunner<'a> {
    config: SweepConfig,
    strategy: CompressionStrategy<'a>,
    store: &'a dyn ArtifactStore,
    cancellation: CancellationToken,
}

impl<'a> SweepRunner<'a> {
    /// Create a runner. Fails if the configuration is invalid or does not match `strategy`.
    pub fn new(
        config: SweepConfig,
        strategy: CompressionStrategy<'a>,
        store: &'a dyn ArtifactStore,
    ) -> Result<Self> {
        config.validate()?;

        if config.strategy != strategy.kind() {
            return Err(SvdCompressionError::InvalidInput(format!(
                "configured for {:?} but got {:?}",
                config.strategy,
                strategy.kind()
            )));
        }

        Ok(SweepRunner {
            config,
            strategy,
            store,
            cancellation: CancellationToken::new(),
        })
    }

    /// Use `token` to cancel the sweep from another thread.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run the sweep over `inputs`.
    ///
    /// Only failures to set up the worker pool are returned as errors; failures of
    /// individual items are recorded in the report.
    pub fn run(&self, inputs: &[SweepInput]) -> Result<SweepReport> {
        let num_images = self
            .config
            .max_images
            .map_or(inputs.len(), |max| max.min(inputs.len()));
        let inputs = &inputs[..num_images];
        let parameters = &self.config.parameters;
        let num_workers = self.config.worker_count();

        info!(
            "Starting {:?} sweep: {} parameters, {} images, {} workers",
            self.config.strategy,
            parameters.len(),
            num_images,
            num_workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .build()
            .map_err(|err| SvdCompressionError::InvalidInput(format!("cannot build worker pool: {}", err)))?;

        let results: Vec<((usize, usize), Outcome)> = pool.install(|| {
            if self.reuses_decompositions() {
                inputs
                    .par_iter()
                    .enumerate()
                    .flat_map_iter(|(image_index, input)| self.run_image(image_index, input))
                    .collect()
            } else {
                iproduct!(0..parameters.len(), 0..num_images)
                    .collect::<Vec<_>>()
                    .into_par_iter()
                    .map(|(parameter_index, image_index)| {
                        let outcome = self.run_item(
                            &inputs[image_index],
                            parameters[parameter_index],
                            None,
                        );
                        ((parameter_index, image_index), outcome)
                    })
                    .collect()
            }
        });

        let mut collector = OrderedCollector::new(parameters.len(), num_images);
        for (key, outcome) in results {
            collector.insert(key, outcome);
        }

        let buckets: Vec<ParameterBucket> = collector
            .into_rows(|_, image_index| Outcome::Cancelled {
                image_name: inputs[image_index].name.clone(),
            })
            .into_iter()
            .zip(parameters)
            .map(|(outcomes, &parameter)| ParameterBucket { parameter, outcomes })
            .collect();

        let report = SweepReport {
            strategy: self.config.strategy,
            buckets,
        };

        info!(
            "Finished {:?} sweep: {} of {} items did not complete",
            self.config.strategy,
            report.failures().len(),
            parameters.len() * num_images
        );

        Ok(report)
    }

    fn reuses_decompositions(&self) -> bool {
        self.config.reuse_decompositions && self.strategy.kind() == StrategyKind::SingularValueTruncation
    }

    /// Process all parameters of one image with a shared decomposition.
    fn run_image(&self, image_index: usize, input: &SweepInput) -> Vec<((usize, usize), Outcome)> {
        let parameters = &self.config.parameters;

        let decomposition = if self.cancellation.is_cancelled() {
            Err(SvdCompressionError::Cancelled)
        } else {
            decompose_image(&input.image)
        };

        parameters
            .iter()
            .enumerate()
            .map(|(parameter_index, &parameter)| {
                let outcome = match &decomposition {
                    Ok(decomposition) => self.run_item(input, parameter, Some(decomposition)),
                    Err(err) => self.failed(input, parameter, err),
                };
                ((parameter_index, image_index), outcome)
            })
            .collect()
    }

    fn run_item(
        &self,
        input: &SweepInput,
        parameter: CompressionParameter,
        decomposition: Option<&ImageDecomposition>,
    ) -> Outcome {
        if self.cancellation.is_cancelled() {
            return self.failed(input, parameter, &SvdCompressionError::Cancelled);
        }

        match self.process(input, parameter, decomposition) {
            Ok(result) => Outcome::Completed(Box::new(result)),
            Err(err) => self.failed(input, parameter, &err),
        }
    }

    fn failed(&self, input: &SweepInput, parameter: CompressionParameter, err: &SvdCompressionError) -> Outcome {
        let image_name = input.name.clone();

        match err {
            SvdCompressionError::Cancelled => {
                warn!("Skipping {} with {}: sweep cancelled", image_name, parameter);
                Outcome::Cancelled { image_name }
            }
            _ => {
                warn!("Compressing {} with {} failed: {}", image_name, parameter, err);
                Outcome::Failed {
                    image_name,
                    reason: err.to_string(),
                }
            }
        }
    }

    fn process(
        &self,
        input: &SweepInput,
        parameter: CompressionParameter,
        decomposition: Option<&ImageDecomposition>,
    ) -> Result<ImageResult> {
        let output = match (decomposition, parameter.selection_policy()) {
            (Some(decomposition), Some(policy)) => {
                let compressed = compress_decomposed(decomposition, policy)?;
                StrategyOutput {
                    image: compressed.image,
                    metadata: Some(compressed.metadata),
                    stored_size: None,
                }
            }
            _ => self.strategy.compress(&input.image, &input.name, parameter)?,
        };

        let artifact_name = parameter.artifact_name(&input.name);
        let stored_size = match output.stored_size {
            Some(size) => size,
            None => self.store.store(&artifact_name, &output.image)?,
        };

        let metrics = evaluate(&input.image, &output.image, input.size_bytes, stored_size)?;

        Ok(ImageResult {
            image_name: input.name.clone(),
            artifact_name,
            compressed: output.image,
            metadata: output.metadata,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random_image::{noisy_gradient_image, ramp_image, uniform_random_image};
    use crate::strategy::tests::QuantizingEncoder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::AtomicUsize;

    /// Store measuring the number of distinct rows as a stand-in for a lossless codec.
    struct RowDedupStore;

    impl ArtifactStore for RowDedupStore {
        fn store(&self, _artifact_name: &str, image: &Image) -> Result<u64> {
            let mut rows: Vec<Vec<u8>> = image
                .outer_iter()
                .map(|row| row.iter().copied().collect())
                .collect();
            rows.sort();
            rows.dedup();
            Ok(rows.iter().map(|row| row.len() as u64).sum::<u64>() + 64)
        }
    }

    /// Store rejecting every artifact of one image and counting calls.
    struct FailingStore {
        failing_image: &'static str,
        calls: AtomicUsize,
    }

    impl ArtifactStore for FailingStore {
        fn store(&self, artifact_name: &str, image: &Image) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if artifact_name.starts_with(self.failing_image) {
                Err(SvdCompressionError::Collaborator("disk full".to_string()))
            } else {
                Ok(image.len() as u64)
            }
        }
    }

    #[derive(Default)]
    struct CollectingExporter {
        tables: Vec<(String, Vec<(String, MetricsRecord)>)>,
    }

    impl MetricsExporter for CollectingExporter {
        fn export(&mut self, file_name: &str, rows: &[(String, MetricsRecord)]) -> Result<()> {
            self.tables.push((file_name.to_string(), rows.to_vec()));
            Ok(())
        }
    }

    fn inputs(count: usize) -> Vec<SweepInput> {
        let mut rng = StdRng::seed_from_u64(99);
        (0..count)
            .map(|index| {
                let image = match index % 3 {
                    0 => ramp_image(12, 10),
                    1 => uniform_random_image(12, 10, &mut rng),
                    _ => noisy_gradient_image(12, 10, 8.0, &mut rng).unwrap(),
                };
                SweepInput {
                    name: format!("img{}.png", index),
                    size_bytes: image.len() as u64,
                    image,
                }
            })
            .collect()
    }

    fn svd_config(workers: usize, reuse: bool) -> SweepConfig {
        let mut config = SweepConfig::new(
            StrategyKind::SingularValueTruncation,
            vec![
                CompressionParameter::ExplainedVariance(0.5),
                CompressionParameter::ExplainedVariance(0.9),
                CompressionParameter::ExplainedVariance(0.99),
            ],
        );
        config.num_workers = Some(workers);
        config.reuse_decompositions = reuse;
        config
    }

    fn summarize(report: &SweepReport) -> Vec<Vec<(String, MetricsRecord, Vec<usize>)>> {
        report
            .buckets
            .iter()
            .map(|bucket| {
                bucket
                    .outcomes
                    .iter()
                    .map(|outcome| {
                        let result = outcome.completed().unwrap();
                        (
                            result.artifact_name.clone(),
                            result.metrics,
                            result.metadata.as_ref().unwrap().num_components(),
                        )
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_sweep_is_ordered_and_deterministic() {
        let inputs = inputs(5);
        let store = RowDedupStore;

        let sequential = SweepRunner::new(svd_config(1, false), CompressionStrategy::SingularValueTruncation, &store)
            .unwrap()
            .run(&inputs)
            .unwrap();
        let parallel = SweepRunner::new(svd_config(4, false), CompressionStrategy::SingularValueTruncation, &store)
            .unwrap()
            .run(&inputs)
            .unwrap();

        assert_eq!(sequential.buckets.len(), 3);
        for (bucket, expected) in sequential.buckets.iter().zip(&svd_config(1, false).parameters) {
            assert_eq!(bucket.parameter, *expected);
            assert_eq!(bucket.outcomes.len(), 5);
            for (index, outcome) in bucket.outcomes.iter().enumerate() {
                assert_eq!(outcome.image_name(), inputs[index].name);
            }
        }

        assert!(sequential.is_complete());
        assert_eq!(summarize(&sequential), summarize(&parallel));
    }

    #[test]
    fn test_cached_decompositions_give_same_results() {
        let inputs = inputs(4);
        let store = RowDedupStore;

        let fresh = SweepRunner::new(svd_config(2, false), CompressionStrategy::SingularValueTruncation, &store)
            .unwrap()
            .run(&inputs)
            .unwrap();
        let cached = SweepRunner::new(svd_config(3, true), CompressionStrategy::SingularValueTruncation, &store)
            .unwrap()
            .run(&inputs)
            .unwrap();

        assert_eq!(summarize(&fresh), summarize(&cached));
    }

    #[test]
    fn test_rank_grows_with_threshold() {
        let inputs = inputs(3);
        let report = SweepRunner::new(svd_config(2, true), CompressionStrategy::SingularValueTruncation, &RowDedupStore)
            .unwrap()
            .run(&inputs)
            .unwrap();
        let table = summarize(&report);

        for image_index in 0..inputs.len() {
            for channel in 0..3 {
                let ranks: Vec<usize> = table.iter().map(|row| row[image_index].2[channel]).collect();
                assert!(ranks.windows(2).all(|pair| pair[0] <= pair[1]));
            }
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let inputs = inputs(4);
        let store = FailingStore {
            failing_image: "img2",
            calls: AtomicUsize::new(0),
        };

        let report = SweepRunner::new(svd_config(2, true), CompressionStrategy::SingularValueTruncation, &store)
            .unwrap()
            .run(&inputs)
            .unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 12);
        assert!(!report.is_complete());

        let failures = report.failures();
        assert_eq!(failures.len(), 3);
        for (failure, bucket) in failures.iter().zip(&report.buckets) {
            assert_eq!(failure.image_index, 2);
            assert_eq!(failure.image_name, "img2.png");
            assert_eq!(failure.parameter, bucket.parameter);
            assert!(failure.reason.as_ref().unwrap().contains("disk full"));
        }

        for bucket in &report.buckets {
            assert_eq!(bucket.records().len(), 3);
            assert_eq!(bucket.compressed_images().len(), 3);
        }
    }

    #[test]
    fn test_cancelled_sweep() {
        let inputs = inputs(3);
        let token = CancellationToken::new();
        token.cancel();

        let report = SweepRunner::new(svd_config(2, true), CompressionStrategy::SingularValueTruncation, &RowDedupStore)
            .unwrap()
            .with_cancellation(token)
            .run(&inputs)
            .unwrap();

        assert_eq!(report.buckets.len(), 3);
        assert_eq!(report.failures().len(), 9);
        assert!(report.failures().iter().all(|failure| failure.reason.is_none()));
        assert!(report.buckets.iter().all(|bucket| bucket.summary().is_none()));
    }

    /// Store cancelling the sweep once it has stored `cancel_after` artifacts.
    struct CancellingStore {
        token: CancellationToken,
        cancel_after: usize,
        calls: AtomicUsize,
    }

    impl ArtifactStore for CancellingStore {
        fn store(&self, artifact_name: &str, image: &Image) -> Result<u64> {
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_after {
                self.token.cancel();
            }
            RowDedupStore.store(artifact_name, image)
        }
    }

    #[test]
    fn test_cancelled_mid_sweep_keeps_completed_items() {
        let inputs = inputs(3);
        let token = CancellationToken::new();
        let store = CancellingStore {
            token: token.clone(),
            cancel_after: 4,
            calls: AtomicUsize::new(0),
        };

        let uncancelled = SweepRunner::new(svd_config(1, false), CompressionStrategy::SingularValueTruncation, &RowDedupStore)
            .unwrap()
            .run(&inputs)
            .unwrap();
        let report = SweepRunner::new(svd_config(1, false), CompressionStrategy::SingularValueTruncation, &store)
            .unwrap()
            .with_cancellation(token)
            .run(&inputs)
            .unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 4);
        assert_eq!(report.buckets.len(), 3);

        let outcomes = report.buckets.iter().flat_map(|bucket| bucket.outcomes.iter());
        let expected = uncancelled.buckets.iter().flat_map(|bucket| bucket.outcomes.iter());
        for (position, (outcome, expected)) in outcomes.zip(expected).enumerate() {
            assert_eq!(outcome.image_name(), expected.image_name());
            if position < 4 {
                let result = outcome.completed().unwrap();
                let expected = expected.completed().unwrap();
                assert_eq!(result.metrics, expected.metrics);
                assert_eq!(result.compressed, expected.compressed);
            } else {
                assert!(matches!(outcome, Outcome::Cancelled { .. }));
            }
        }

        for bucket in &report.buckets {
            assert_eq!(bucket.outcomes.len(), inputs.len());
        }
        assert_eq!(report.failures().len(), 5);
        assert!(report.failures().iter().all(|failure| failure.reason.is_none()));
    }

    #[test]
    fn test_max_images_and_summary() {
        let inputs = inputs(5);
        let mut config = svd_config(2, true);
        config.max_images = Some(2);

        let report = SweepRunner::new(config, CompressionStrategy::SingularValueTruncation, &RowDedupStore)
            .unwrap()
            .run(&inputs)
            .unwrap();

        for bucket in &report.buckets {
            assert_eq!(bucket.outcomes.len(), 2);

            let records = bucket.records();
            let summary = bucket.summary().unwrap();
            let ssim: Vec<f64> = records.iter().map(|(_, r)| r.structural_similarity).collect();

            assert_eq!(summary.structural_similarity.max, ssim[0].max(ssim[1]));
            assert_eq!(summary.structural_similarity.min, ssim[0].min(ssim[1]));
            assert!((summary.structural_similarity.mean - (ssim[0] + ssim[1]) / 2.0).abs() < 1E-12);
        }
    }

    #[test]
    fn test_wavelet_sweep_and_export() {
        let inputs = inputs(2);
        let encoder = QuantizingEncoder;
        let config = SweepConfig::new(
            StrategyKind::WaveletCodec,
            vec![CompressionParameter::TargetRatio(2), CompressionParameter::TargetRatio(16)],
        );

        let report = SweepRunner::new(config, CompressionStrategy::WaveletCodec(&encoder), &RowDedupStore)
            .unwrap()
            .run(&inputs)
            .unwrap();

        assert!(report.is_complete());
        let first = &report.buckets[0].records()[0];
        assert_eq!(first.0, "img0_cratio2.jp2");
        assert_eq!(first.1.compression_ratio, 2.0);

        let mut exporter = CollectingExporter::default();
        report.export(&mut exporter).unwrap();

        let names: Vec<&str> = exporter.tables.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["metrics_cratio2.csv", "metrics_cratio16.csv"]);
        assert!(exporter.tables.iter().all(|(_, rows)| rows.len() == 2));
    }

    #[test]
    fn test_invalid_configurations() {
        let encoder = QuantizingEncoder;
        let store = RowDedupStore;

        let empty = SweepConfig::new(StrategyKind::SingularValueTruncation, vec![]);
        assert!(SweepRunner::new(empty, CompressionStrategy::SingularValueTruncation, &store).is_err());

        let mixed = SweepConfig::new(
            StrategyKind::SingularValueTruncation,
            vec![CompressionParameter::ExplainedVariance(0.9), CompressionParameter::TargetRatio(10)],
        );
        assert!(mixed.validate().is_err());

        let out_of_range = SweepConfig::new(
            StrategyKind::SingularValueTruncation,
            vec![CompressionParameter::ExplainedVariance(1.5)],
        );
        assert!(out_of_range.validate().is_err());

        let mut no_workers = svd_config(1, true);
        no_workers.num_workers = Some(0);
        assert!(no_workers.validate().is_err());

        // Strategy does not match the configuration.
        assert!(SweepRunner::new(svd_config(1, true), CompressionStrategy::WaveletCodec(&encoder), &store).is_err());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "strategy": "SingularValueTruncation",
            "parameters": [{"ExplainedVariance": 0.975}, {"FixedRank": 10}]
        }"#;
        let config: SweepConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.parameters[1], CompressionParameter::FixedRank(10));
        assert_eq!(config.max_images, None);
        assert!(config.reuse_decompositions);
        assert!(config.validate().is_ok());
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_ordered_collector() {
        let mut collector = OrderedCollector::new(2, 3);
        collector.insert((1, 2), "b2");
        collector.insert((0, 0), "a0");
        collector.insert((1, 0), "b0");

        let rows = collector.into_rows(|_, _| "missing");

        assert_eq!(rows, vec![vec!["a0", "missing", "missing"], vec!["b0", "missing", "b2"]]);

        let empty: OrderedCollector<&str> = OrderedCollector::new(3, 0);
        assert_eq!(empty.into_rows(|_, _| "missing"), vec![Vec::<&str>::new(); 3]);
    }
}
