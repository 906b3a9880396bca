#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float32Builder, Float64Builder, Int64Array, LargeListBuilder, ListBuilder,
    StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// `eng_spd` and `torque` recorded in two RecResult blocks written in
/// reverse order, `eng_spd` also under D[1], plus an empty `comment` entry.
pub const BENCH_JSON: &str = r#"{
  "groups": [
    { "channels": [
        { "name": "eng_spd", "unit": "rpm", "source_path": "Concerto/RecResult[2]",
          "timestamps": [2.0, 3.0], "samples": [820.0, 830.0], "attrs": { "ecu": "ME17" } },
        { "name": "torque", "unit": "Nm", "source_path": "Concerto/RecResult[2]",
          "timestamps": [2.0, 3.0], "samples": [12.0, 13.0] }
    ] },
    { "channels": [
        { "name": "eng_spd", "unit": "rpm", "source_path": "Concerto/RecResult[1]",
          "timestamps": [0.0, 1.0], "samples": [800.0, 810.0], "attrs": { "ecu": "ME17" } },
        { "name": "torque", "unit": "Nm", "source_path": "Concerto/RecResult[1]",
          "timestamps": [0.0, 1.0], "samples": [10.0, 11.0] }
    ] },
    { "channels": [
        { "name": "eng_spd", "unit": "1/min", "source_path": "Concerto\\D[1]",
          "timestamps": [0.0, 1.5, 3.0], "samples": [801.0, 815.0, 829.0] },
        { "name": "comment", "source_path": "Concerto/RecResult[1]" }
    ] }
  ]
}"#;

/// The same measurement as [`BENCH_JSON`].
pub const BENCH_CSV: &str = "\
group,name,unit,source_path,timestamps,samples,ecu
0,eng_spd,rpm,Concerto/RecResult[2],2.0;3.0,820.0;830.0,ME17
0,torque,Nm,Concerto/RecResult[2],2.0;3.0,12.0;13.0,
1,eng_spd,rpm,Concerto/RecResult[1],0.0;1.0,800.0;810.0,ME17
1,torque,Nm,Concerto/RecResult[1],0.0;1.0,10.0;11.0,
2,eng_spd,1/min,Concerto\\D[1],0.0;1.5;3.0,801.0;815.0;829.0,
2,comment,,Concerto/RecResult[1],,,
";

pub fn write(dir: &Path, file_name: &str, contents: &str) -> PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, contents).unwrap();
    path
}

/// One parquet row per channel.
pub struct ParquetRow {
    pub group: i64,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub source_path: Option<&'static str>,
    pub timestamps: Option<Vec<f64>>,
    pub samples: Option<Vec<f32>>,
}

/// Writes `timestamps` as LargeList<Float64> and `samples` as
/// List<Float32>, with an Int64 group column.
pub fn write_parquet(dir: &Path, file_name: &str, rows: &[ParquetRow]) -> PathBuf {
    let mut time_builder = LargeListBuilder::new(Float64Builder::new());
    let mut sample_builder = ListBuilder::new(Float32Builder::new());
    for row in rows {
        match &row.timestamps {
            Some(t) => {
                time_builder.values().append_slice(t);
                time_builder.append(true);
            }
            None => time_builder.append(false),
        }
        match &row.samples {
            Some(s) => {
                sample_builder.values().append_slice(s);
                sample_builder.append(true);
            }
            None => sample_builder.append(false),
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("group", DataType::Int64, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("unit", DataType::Utf8, true),
        Field::new("source_path", DataType::Utf8, true),
        Field::new(
            "timestamps",
            DataType::LargeList(Arc::new(Field::new("item", DataType::Float64, true))),
            true,
        ),
        Field::new(
            "samples",
            DataType::List(Arc::new(Field::new("item", DataType::Float32, true))),
            true,
        ),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(rows.iter().map(|r| r.group).collect::<Vec<_>>())),
        Arc::new(StringArray::from(rows.iter().map(|r| r.name).collect::<Vec<_>>())),
        Arc::new(StringArray::from(rows.iter().map(|r| r.unit).collect::<Vec<_>>())),
        Arc::new(StringArray::from(rows.iter().map(|r| r.source_path).collect::<Vec<_>>())),
        Arc::new(time_builder.finish()),
        Arc::new(sample_builder.finish()),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let path = dir.join(file_name);
    let file = fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    path
}

pub fn bench_parquet_rows() -> Vec<ParquetRow> {
    vec![
        ParquetRow {
            group: 0,
            name: "eng_spd",
            unit: Some("rpm"),
            source_path: Some("Concerto/RecResult[2]"),
            timestamps: Some(vec![2.0, 3.0]),
            samples: Some(vec![820.0, 830.0]),
        },
        ParquetRow {
            group: 1,
            name: "eng_spd",
            unit: Some("rpm"),
            source_path: Some("Concerto/RecResult[1]"),
            timestamps: Some(vec![0.0, 1.0]),
            samples: Some(vec![800.0, 810.0]),
        },
        ParquetRow {
            group: 1,
            name: "comment",
            unit: None,
            source_path: Some("Concerto/RecResult[1]"),
            timestamps: None,
            samples: None,
        },
    ]
}
