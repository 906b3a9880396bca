use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, Float64Array, Float64Builder, Int32Array, ListBuilder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

#[derive(Parser)]
#[command(name = "generate_sample")]
#[command(about = "Write a deterministic sample measurement file (.parquet)")]
struct Cli {
    /// Output path
    #[arg(default_value = "sample_measurement.parquet")]
    output: PathBuf,

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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Physical quantity recorded by the test bench.
struct Quantity {
    name: &'static str,
    unit: &'static str,
    noise: f64,
    shape: fn(f64) -> f64,
}

static QUANTITIES: [Quantity; 4] = [
    Quantity {
        name: "eng_spd",
        unit: "rpm",
        noise: 5.0,
        shape: |t| 800.0 + 60.0 * t,
    },
    Quantity {
        name: "torque",
        unit: "Nm",
        noise: 2.0,
        shape: |t| 120.0 + 40.0 * (t / 5.0).sin(),
    },
    Quantity {
        name: "oil_temp",
        unit: "degC",
        noise: 0.1,
        shape: |t| 80.0 + 0.2 * t,
    },
    Quantity {
        name: "lambda",
        unit: "-",
        noise: 0.01,
        shape: |_| 1.0,
    },
];

/// One row of the output file = one channel of one recording.
struct Row {
    group: i32,
    name: String,
    unit: Option<String>,
    source_path: Option<String>,
    timestamps: Option<Vec<f64>>,
    samples: Option<Vec<f64>>,
    rate_hz: Option<f64>,
}

/// A recording block: every quantity sampled over `[t0, t0 + duration)`.
fn recording(
    group: i32,
    source_path: &str,
    t0: f64,
    duration: f64,
    rate_hz: f64,
    quantities: &[&Quantity],
    rng: &mut SimpleRng,
) -> Vec<Row> {
    let n = (duration * rate_hz).round() as usize;
    let timestamps: Vec<f64> = (0..n).map(|i| t0 + i as f64 / rate_hz).collect();

    quantities
        .iter()
        .map(|q| Row {
            group,
            name: q.name.to_string(),
            unit: Some(q.unit.to_string()),
            source_path: Some(source_path.to_string()),
            samples: Some(
                timestamps
                    .iter()
                    .map(|&t| (q.shape)(t) + rng.gauss(0.0, q.noise))
                    .collect(),
            ),
            timestamps: Some(timestamps.clone()),
            rate_hz: Some(rate_hz),
        })
        .collect()
}

fn list_array(rows: &[Row], column: fn(&Row) -> Option<&Vec<f64>>) -> ArrayRef {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        match column(row) {
            Some(data) => {
                builder.values().append_slice(data);
                builder.append(true);
            }
            None => builder.append(false),
        }
    }
    Arc::new(builder.finish())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut rng = SimpleRng::new(cli.seed);

    let all: Vec<&Quantity> = QUANTITIES.iter().collect();
    let slow: Vec<&Quantity> = QUANTITIES
        .iter()
        .filter(|q| matches!(q.name, "eng_spd" | "oil_temp"))
        .collect();

    // RecResult blocks are written out of index order on purpose.
    let mut rows = Vec::new();
    rows.extend(recording(0, "Concerto/RecResult[2]", 10.0, 10.0, 10.0, &all, &mut rng));
    rows.extend(recording(1, "Concerto/RecResult[1]", 0.0, 10.0, 10.0, &all, &mut rng));
    rows.extend(recording(2, "Concerto\\D[1]", 0.0, 15.0, 2.0, &slow, &mut rng));
    rows.extend(recording(3, "Concerto/RecResult[3]", 20.0, 10.0, 10.0, &all, &mut rng));
    rows.extend(recording(4, "Concerto\\D[2]", 15.0, 15.0, 2.0, &slow, &mut rng));
    rows.push(Row {
        group: 5,
        name: "comment".to_string(),
        unit: None,
        source_path: Some("Concerto/RecResult[1]".to_string()),
        timestamps: None,
        samples: None,
        rate_hz: None,
    });

    let group_array = Int32Array::from(rows.iter().map(|r| r.group).collect::<Vec<_>>());
    let name_array = StringArray::from(rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>());
    let unit_array = StringArray::from(rows.iter().map(|r| r.unit.as_deref()).collect::<Vec<_>>());
    let path_array =
        StringArray::from(rows.iter().map(|r| r.source_path.as_deref()).collect::<Vec<_>>());
    let rate_array = Float64Array::from(rows.iter().map(|r| r.rate_hz).collect::<Vec<_>>());

    let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
    let schema = Arc::new(Schema::new(vec![
        Field::new("group", DataType::Int32, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("unit", DataType::Utf8, true),
        Field::new("source_path", DataType::Utf8, true),
        Field::new("timestamps", list_type.clone(), true),
        Field::new("samples", list_type, true),
        Field::new("rate_hz", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(group_array),
            Arc::new(name_array),
            Arc::new(unit_array),
            Arc::new(path_array),
            list_array(&rows, |r| r.timestamps.as_ref()),
            list_array(&rows, |r| r.samples.as_ref()),
            Arc::new(rate_array),
        ],
    )
    .context("building record batch")?;

    // Write Parquet
    let file = std::fs::File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    println!(
        "Wrote {} channel recordings ({} groups) to {}",
        rows.len(),
        rows.last().map_or(0, |r| r.group + 1),
        cli.output.display()
    );
    Ok(())
}
