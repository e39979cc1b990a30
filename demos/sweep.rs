// Sweep a small batch of synthetic images over a range of explained variances.
//
// Run with `RUST_LOG=info cargo run --example sweep`.

use rand::SeedableRng;
use svd_image_compression::prelude::*;
use svd_image_compression::random_image::{noisy_gradient_image, ramp_image, uniform_random_image};

/// Pretends to write every artifact as raw bytes.
struct RawStore;

impl ArtifactStore for RawStore {
    fn store(&self, _artifact_name: &str, image: &Image) -> svd_image_compression::types::Result<u64> {
        Ok(image.len() as u64)
    }
}

/// Prints every metrics table instead of writing CSV files.
struct PrintExporter;

impl MetricsExporter for PrintExporter {
    fn export(
        &mut self,
        file_name: &str,
        rows: &[(String, MetricsRecord)],
    ) -> svd_image_compression::types::Result<()> {
        println!("{}", file_name);
        println!("img_name,compression_ratio,peak_signal_noise_ratio,structural_similarity");
        for (name, record) in rows {
            println!(
                "{},{},{},{}",
                name,
                record.compression_ratio,
                record.peak_signal_noise_ratio,
                record.structural_similarity
            );
        }
        Ok(())
    }
}

pub fn main() {
    env_logger::init();

    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let images = vec![
        ("ramp.png", ramp_image(64, 48)),
        ("noise.png", uniform_random_image(64, 48, &mut rng)),
        ("gradient.png", noisy_gradient_image(64, 48, 10.0, &mut rng).unwrap()),
    ];

    let inputs: Vec<SweepInput> = images
        .into_iter()
        .map(|(name, image)| SweepInput {
            name: name.to_string(),
            size_bytes: image.len() as u64 / 2,
            image,
        })
        .collect();

    let config = SweepConfig::new(
        StrategyKind::SingularValueTruncation,
        [0.5, 0.75, 0.9, 0.975, 0.99]
            .iter()
            .map(|&threshold| CompressionParameter::ExplainedVariance(threshold))
            .collect(),
    );

    let store = RawStore;
    let report = SweepRunner::new(config, CompressionStrategy::SingularValueTruncation, &store)
        .unwrap()
        .run(&inputs)
        .unwrap();

    for bucket in &report.buckets {
        if let Some(summary) = bucket.summary() {
            println!(
                "{}: mean PSNR {:.2}, mean SSIM {:.4}",
                bucket.parameter, summary.peak_signal_noise_ratio.mean, summary.structural_similarity.mean
            );
        }
    }

    report.export(&mut PrintExporter).unwrap();

    println!("Failures: {}", report.failures().len());
}
