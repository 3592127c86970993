use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// Generate a labelled two-feature dataset for training and smoke tests.
#[derive(Debug, Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Output file (.csv or .parquet)
    output: PathBuf,

    /// Number of rows to generate
    #[arg(default_value_t = 1000)]
    num_rows: usize,

    /// PRNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in [0, 1).
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[derive(Debug, Serialize)]
struct Sample {
    feature1: f64,
    feature2: f64,
    label: i64,
}

/// Both features uniform in [0, 100); label 1 when they sum past 100.
fn generate(num_rows: usize, seed: u64) -> Vec<Sample> {
    let mut rng = SimpleRng::new(seed);
    let feature1: Vec<f64> = (0..num_rows).map(|_| rng.next_f64() * 100.0).collect();
    let feature2: Vec<f64> = (0..num_rows).map(|_| rng.next_f64() * 100.0).collect();

    feature1
        .into_iter()
        .zip(feature2)
        .map(|(feature1, feature2)| Sample {
            feature1,
            feature2,
            label: i64::from(feature1 + feature2 > 100.0),
        })
        .collect()
}

fn write_csv(path: &Path, samples: &[Sample]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    for sample in samples {
        writer.serialize(sample).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_parquet(path: &Path, samples: &[Sample]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("feature1", DataType::Float64, false),
        Field::new("feature2", DataType::Float64, false),
        Field::new("label", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from_iter_values(samples.iter().map(|s| s.feature1))),
            Arc::new(Float64Array::from_iter_values(samples.iter().map(|s| s.feature2))),
            Arc::new(Int64Array::from_iter_values(samples.iter().map(|s| s.label))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating Parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating Parquet writer")?;
    writer.write(&batch).context("writing Parquet batch")?;
    writer.close().context("closing Parquet writer")?;
    Ok(())
}

/// Parquet for `.parquet`/`.pq` outputs, CSV for anything else.
fn write_samples(path: &Path, samples: &[Sample]) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" | "pq" => write_parquet(path, samples),
        _ => write_csv(path, samples),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let samples = generate(args.num_rows, args.seed);
    write_samples(&args.output, &samples)?;

    log::debug!(
        "{} of {} rows labelled 1",
        samples.iter().filter(|s| s.label == 1).count(),
        samples.len()
    );
    println!(
        "Dataset with {} rows generated and saved as '{}'",
        args.num_rows,
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_and_labelled() {
        let a = generate(200, 42);
        let b = generate(200, 42);
        assert_eq!(a.len(), 200);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.feature1, y.feature1);
            assert_eq!(x.feature2, y.feature2);
            assert!((0.0..100.0).contains(&x.feature1));
            assert!((0.0..100.0).contains(&x.feature2));
            assert_eq!(x.label == 1, x.feature1 + x.feature2 > 100.0);
        }
    }

    #[test]
    fn csv_output_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        write_csv(&path, &generate(10, 1)).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let ds = rusty_predict::data::loader::decode(&bytes, rusty_predict::DataFormat::Csv).unwrap();
        assert_eq!(ds.column_names(), ["feature1", "feature2", "label"]);
        assert_eq!(ds.len(), 10);
    }

    #[test]
    fn parquet_output_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.parquet");
        write_parquet(&path, &generate(10, 1)).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let ds = rusty_predict::data::loader::decode(&bytes, rusty_predict::DataFormat::Parquet)
            .unwrap();
        assert_eq!(ds.column_names(), ["feature1", "feature2", "label"]);
        assert_eq!(ds.len(), 10);
    }

    #[test]
    fn unknown_extensions_fall_back_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["train.data", "train", "train.PQ"] {
            let path = dir.path().join(name);
            write_samples(&path, &generate(4, 7)).unwrap();
            let bytes = std::fs::read(&path).unwrap();
            let expected = if name.ends_with("PQ") {
                rusty_predict::DataFormat::Parquet
            } else {
                rusty_predict::DataFormat::Csv
            };
            assert_eq!(rusty_predict::DataFormat::sniff(&bytes), expected, "{name}");
            let ds = rusty_predict::data::loader::decode(&bytes, expected).unwrap();
            assert_eq!(ds.len(), 4);
        }
    }
}
