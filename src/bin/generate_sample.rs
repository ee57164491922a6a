use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use housing_explorer::data::export::export_csv_file;
use housing_explorer::data::model::{self, HousingRecord};

/// The published dataset clips house values at this amount.
const VALUE_CAP: f64 = 500001.0;
const ROWS: usize = 2000;

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

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// (category, share of rows, value multiplier, latitude range, longitude range)
type Region = (&'static str, f64, f64, (f64, f64), (f64, f64));

static REGIONS: [Region; 5] = [
    ("<1H OCEAN", 0.44, 1.25, (33.5, 34.5), (-118.8, -117.2)),
    ("INLAND", 0.32, 0.65, (34.0, 40.5), (-122.5, -116.0)),
    ("NEAR OCEAN", 0.13, 1.20, (32.6, 38.5), (-124.0, -117.1)),
    ("NEAR BAY", 0.108, 1.35, (37.4, 38.3), (-122.6, -121.9)),
    ("ISLAND", 0.002, 2.20, (33.3, 33.5), (-118.6, -118.3)),
];

fn pick_region(rng: &mut SimpleRng) -> &'static Region {
    let mut roll = rng.next_f64();
    for region in &REGIONS {
        if roll < region.1 {
            return region;
        }
        roll -= region.1;
    }
    &REGIONS[0]
}

fn generate_record(rng: &mut SimpleRng) -> HousingRecord {
    let (category, _, multiplier, lat, lon) = *pick_region(rng);

    // Income is roughly log-normal, clipped like the census data.
    let median_income = rng.gauss(1.2, 0.45).exp().clamp(0.4999, 15.0001);
    let housing_median_age = rng.uniform(1.0, 52.0).round();
    let households = rng.gauss(500.0, 250.0).max(5.0).round();
    let population = (households * rng.gauss(2.9, 0.6).max(1.0)).round();
    let total_rooms = (households * rng.gauss(5.4, 1.2).max(1.5)).round();
    let total_bedrooms = (rng.next_f64() > 0.01).then(|| (total_rooms * 0.2).round());

    let base = 45000.0 + 40000.0 * median_income;
    let median_house_value = (base * multiplier + rng.gauss(0.0, 30000.0))
        .clamp(14999.0, VALUE_CAP)
        .round();

    HousingRecord {
        longitude: (rng.uniform(lon.0, lon.1) * 100.0).round() / 100.0,
        latitude: (rng.uniform(lat.0, lat.1) * 100.0).round() / 100.0,
        housing_median_age,
        total_rooms: Some(total_rooms),
        total_bedrooms,
        population: Some(population),
        households: Some(households),
        median_income: (median_income * 10000.0).round() / 10000.0,
        median_house_value,
        ocean_proximity: category.to_string(),
    }
}

fn column(records: &[HousingRecord], f: impl Fn(&HousingRecord) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from(records.iter().map(f).collect::<Vec<_>>()))
}

fn optional(records: &[HousingRecord], f: impl Fn(&HousingRecord) -> Option<f64>) -> ArrayRef {
    Arc::new(Float64Array::from(records.iter().map(f).collect::<Vec<_>>()))
}

fn write_parquet(records: &[HousingRecord], path: &Path) {
    let schema = Arc::new(Schema::new(vec![
        Field::new(model::LONGITUDE, DataType::Float64, false),
        Field::new(model::LATITUDE, DataType::Float64, false),
        Field::new(model::HOUSING_MEDIAN_AGE, DataType::Float64, false),
        Field::new(model::TOTAL_ROOMS, DataType::Float64, true),
        Field::new(model::TOTAL_BEDROOMS, DataType::Float64, true),
        Field::new(model::POPULATION, DataType::Float64, true),
        Field::new(model::HOUSEHOLDS, DataType::Float64, true),
        Field::new(model::MEDIAN_INCOME, DataType::Float64, false),
        Field::new(model::MEDIAN_HOUSE_VALUE, DataType::Float64, false),
        Field::new(model::OCEAN_PROXIMITY, DataType::Utf8, false),
    ]));

    let categories = StringArray::from(
        records
            .iter()
            .map(|r| r.ocean_proximity.as_str())
            .collect::<Vec<_>>(),
    );

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            column(records, |r| r.longitude),
            column(records, |r| r.latitude),
            column(records, |r| r.housing_median_age),
            optional(records, |r| r.total_rooms),
            optional(records, |r| r.total_bedrooms),
            optional(records, |r| r.population),
            optional(records, |r| r.households),
            column(records, |r| r.median_income),
            column(records, |r| r.median_house_value),
            Arc::new(categories) as ArrayRef,
        ],
    )
    .expect("Failed to create RecordBatch");

    let file = std::fs::File::create(path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
}

fn main() {
    env_logger::init();

    let stem = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_housing".to_string());
    let mut rng = SimpleRng::new(42);
    let records: Vec<HousingRecord> = (0..ROWS).map(|_| generate_record(&mut rng)).collect();

    let csv_path = PathBuf::from(format!("{stem}.csv"));
    export_csv_file(&records, &csv_path).expect("Failed to write CSV");

    let parquet_path = PathBuf::from(format!("{stem}.parquet"));
    write_parquet(&records, &parquet_path);

    println!(
        "Wrote {} housing records to {} and {}",
        records.len(),
        csv_path.display(),
        parquet_path.display()
    );
}
