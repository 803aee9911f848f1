use std::collections::BTreeMap;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use e2e_tests::{cosine_similarity, random_vector};
use vecstore_index::{EngineConfig, Persistence, VectorStore};
use vecstore_types::{EngineKind, Metadata};

#[derive(Parser, Debug)]
#[command(name = "perf_bench", about = "Vecstore insert/query benchmark harness")]
struct Args {
    #[arg(long, value_enum, default_value = "hnsw")]
    engine: EngineArg,
    #[arg(long, default_value_t = 2_000)]
    count: usize,
    #[arg(long, default_value_t = 128)]
    dimension: usize,
    #[arg(long, default_value_t = 100)]
    queries: usize,
    #[arg(long, default_value_t = 10)]
    k: usize,
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Don't write metadata.json on each flush
    #[arg(long)]
    no_sidecar: bool,
}

#[derive(Clone, Copy, Debug, Serialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum EngineArg {
    Hnsw,
    Flat,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Hnsw => EngineKind::Hnsw,
            EngineArg::Flat => EngineKind::Flat,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct StepMetrics {
    p50_ms: f64,
    p90_ms: f64,
    p99_ms: f64,
    samples: usize,
    throughput_ops: f64,
}

#[derive(Debug, Serialize)]
struct BenchmarkOutput {
    engine: EngineArg,
    count: usize,
    dimension: usize,
    k: usize,
    steps: BTreeMap<String, StepMetrics>,
    recall_at_k: f64,
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

fn metrics(mut samples: Vec<f64>) -> StepMetrics {
    samples.sort_by(|a, b| a.total_cmp(b));
    let total_ms: f64 = samples.iter().sum();
    StepMetrics {
        p50_ms: percentile(&samples, 50.0),
        p90_ms: percentile(&samples, 90.0),
        p99_ms: percentile(&samples, 99.0),
        samples: samples.len(),
        throughput_ops: if total_ms > 0.0 {
            samples.len() as f64 / (total_ms / 1000.0)
        } else {
            0.0
        },
    }
}

/// Ids of the exact top-k by cosine similarity.
fn exact_top_k(vectors: &[Vec<f32>], query: &[f32], k: usize) -> Vec<String> {
    let mut scored: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, cosine_similarity(v, query)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
        .into_iter()
        .take(k)
        .map(|(i, _)| format!("v{}", i))
        .collect()
}

fn render_table(output: &BenchmarkOutput) -> String {
    let mut lines = vec![
        format!(
            "engine={:?} count={} dim={} k={} recall@k={:.3}",
            output.engine, output.count, output.dimension, output.k, output.recall_at_k
        ),
        format!(
            "{:<8} {:>10} {:>10} {:>10} {:>12}",
            "step", "p50_ms", "p90_ms", "p99_ms", "ops/s"
        ),
    ];
    for (step, m) in &output.steps {
        lines.push(format!(
            "{:<8} {:>10.3} {:>10.3} {:>10.3} {:>12.1}",
            step, m.p50_ms, m.p90_ms, m.p99_ms, m.throughput_ops
        ));
    }
    lines.join("\n")
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let temp = tempfile::TempDir::new().map_err(|e| format!("Failed to create temp dir: {e}"))?;
    let config = EngineConfig::new(args.engine.into(), args.dimension).with_capacity(args.count);
    let persistence = Persistence::new(temp.path()).with_sidecar(!args.no_sidecar);
    let store = VectorStore::open(config, persistence).map_err(|e| e.to_string())?;

    let vectors: Vec<Vec<f32>> = (0..args.count)
        .map(|_| random_vector(&mut rng, args.dimension))
        .collect();

    let mut insert_samples = Vec::with_capacity(args.count);
    for (i, v) in vectors.iter().enumerate() {
        let started = Instant::now();
        store
            .insert(&format!("v{}", i), v, Metadata::new())
            .map_err(|e| e.to_string())?;
        insert_samples.push(started.elapsed().as_secs_f64() * 1000.0);
    }

    let mut query_samples = Vec::with_capacity(args.queries);
    let mut found = 0usize;
    let mut expected = 0usize;
    for _ in 0..args.queries {
        let query = random_vector(&mut rng, args.dimension);
        let started = Instant::now();
        let hits = store.query(&query, args.k).map_err(|e| e.to_string())?;
        query_samples.push(started.elapsed().as_secs_f64() * 1000.0);

        let truth = exact_top_k(&vectors, &query, args.k);
        expected += truth.len();
        found += hits.iter().filter(|h| truth.contains(&h.id)).count();
    }

    let mut steps = BTreeMap::new();
    steps.insert("insert".to_string(), metrics(insert_samples));
    steps.insert("query".to_string(), metrics(query_samples));

    let output = BenchmarkOutput {
        engine: args.engine,
        count: args.count,
        dimension: args.dimension,
        k: args.k,
        steps,
        recall_at_k: if expected == 0 {
            1.0
        } else {
            found as f64 / expected as f64
        },
    };

    let json = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    println!("{}", render_table(&output));
    println!("\n{}", json);
    Ok(())
}
