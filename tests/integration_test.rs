//! End-to-end runs over TSV and Parquet metadata files
//!
//! load -> infer -> stratify -> summarize -> render -> report

use arrow::array::{BooleanArray, Float32Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use xplor_distros::diagnostics::WarningKind;
use xplor_distros::dtypes::Dtype;
use xplor_distros::pipeline::{prepare_tables, ChartKey};
use xplor_distros::{run, Config};

const GUT: &str = "\
sample_id\tsex\tcountry\thost\tage\tbmi\tph\tstatus
a1\tmale\tFR\th1\t34\t22.5\t6.1\tTrue
a2\tfemale\tFR\th2\t51\t27.0\tUnknown\tTrue
a3\tfemale\tUS\th3\t29\tNA\t6.8\tFalsw
a4\tmale\tUS\th4\t62\t30.1\t7.2\tTrue
a5\tNA\tUS\th5\t45\t24.3\t5.9\tFalsw
a6\tfemale\tJP\th6\t38\t21.0\tmissing\tTrue
";

const SKIN: &str = "\
#SampleID\tsex\tmoisture\tnotes
b1\tmale\t0.3\tfoo
b2\tfemale\t0.5\tbar
b3\tfemale\t0.4\t1
";

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn create_test_parquet<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("site", DataType::Utf8, true),
        Field::new("depth", DataType::Float32, true),
        Field::new("treated", DataType::Boolean, true),
    ]);

    let batch = RecordBatch::try_new(
        Arc::new(schema.clone()),
        vec![
            Arc::new(Int32Array::from_iter_values(0..6)),
            Arc::new(StringArray::from(vec![
                Some("reef"),
                Some("reef"),
                Some("lagoon"),
                None,
                Some("lagoon"),
                Some("reef"),
            ])),
            Arc::new(Float32Array::from(vec![
                Some(1.5),
                Some(2.5),
                None,
                Some(4.0),
                Some(0.5),
                Some(3.0),
            ])),
            Arc::new(BooleanArray::from(vec![true, false, true, true, false, false])),
        ],
    )?;

    let file = File::create(path.as_ref())?;
    let props = WriterProperties::builder().set_max_row_group_size(4).build();
    let mut writer = ArrowWriter::try_new(file, Arc::new(schema), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

#[test]
fn test_inference_over_messy_columns() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder(dir.path().join("out"))
        .metadata_file(write(&dir, "gut.tsv", GUT))
        .build()
        .unwrap();

    let prepared = prepare_tables(&config).unwrap();
    let dtypes = &prepared[0].dtypes;
    assert_eq!(dtypes.get("age"), Some(Dtype::Int));
    assert_eq!(dtypes.get("bmi"), Some(Dtype::Float));
    assert_eq!(dtypes.get("ph"), Some(Dtype::Float));
    assert_eq!(dtypes.get("sex"), Some(Dtype::Categorical));
    assert_eq!(dtypes.get("status"), Some(Dtype::Categorical));
    assert_eq!(dtypes.get("sample_name"), None);

    assert_eq!(prepared[0].split.numeric, vec!["age", "bmi", "ph"]);
    assert_eq!(
        prepared[0].split.categorical,
        vec!["sex", "country", "host", "status"]
    );
}

#[test]
fn test_stratified_run_over_two_tables() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder(dir.path().join("nested").join("distros"))
        .metadata_file(write(&dir, "gut.tsv", GUT))
        .metadata_file(write(&dir, "skin.tsv", SKIN))
        .stratify(["sex", "country", "host", "age", "moisture"])
        .max_strata(5)
        .number_of_samples(2)
        .seed(Some(42))
        .build()
        .unwrap();

    let summary = run(&config).unwrap();

    let keys: Vec<(&str, &str)> = summary
        .rows
        .iter()
        .map(|k| (k.strata.as_str(), k.group.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("sex", "female"),
            ("sex", "male"),
            ("country", "FR"),
            ("country", "JP"),
            ("country", "US"),
            ("sex", "female"),
            ("sex", "male"),
        ]
    );

    let log = &summary.log;
    let too_many: Vec<_> = log.of_kind(WarningKind::TooManyFactors).collect();
    assert_eq!(too_many.len(), 1);
    assert_eq!(too_many[0].subject(), "host");
    assert_eq!(too_many[0].number(), Some(6));

    let not_in: Vec<&str> = log.of_kind(WarningKind::NotIn).map(|e| e.subject()).collect();
    assert_eq!(not_in, vec!["moisture", "country", "host", "age"]);

    let not_categorical: Vec<&str> = log
        .of_kind(WarningKind::NotCategorical)
        .map(|e| e.subject())
        .collect();
    assert_eq!(not_categorical, vec!["age", "moisture"]);

    // JP (1), skin male (1)
    assert_eq!(log.of_kind(WarningKind::NotEnoughSamples).count(), 2);

    let output = summary.output.unwrap();
    assert!(output.ends_with("nested/distros.html"));
    let html = fs::read_to_string(output).unwrap();
    assert!(html.contains("brush_6"));
    assert!(!html.contains("brush_7"));
}

#[test]
fn test_merged_stratification() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder(dir.path().join("out.html"))
        .metadata_file(write(&dir, "gut.tsv", GUT))
        .stratify(["sex", "country"])
        .merge(true)
        .seed(Some(1))
        .build()
        .unwrap();

    let summary = run(&config).unwrap();
    let groups: Vec<&str> = summary.rows.iter().map(|k| k.group.as_str()).collect();
    assert_eq!(
        groups,
        vec!["female__FR", "female__JP", "female__US", "male__FR", "male__US", "nan__US"]
    );
    assert!(summary.rows.iter().all(|k| k.strata == "sex__country"));
    // every group is smaller than the default 100 samples
    assert_eq!(summary.log.of_kind(WarningKind::NotEnoughSamples).count(), 6);
}

#[test]
fn test_parquet_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reef.parquet");
    create_test_parquet(&path).unwrap();

    let config = Config::builder(dir.path().join("out"))
        .metadata_file(&path)
        .stratify(["site", "treated"])
        .number_of_samples(2)
        .seed(Some(9))
        .build()
        .unwrap();

    let prepared = prepare_tables(&config).unwrap();
    assert_eq!(prepared[0].split.numeric, vec!["depth"]);
    assert_eq!(prepared[0].split.categorical, vec!["site", "treated"]);

    let summary = run(&config).unwrap();
    let keys: Vec<(&str, &str)> = summary
        .rows
        .iter()
        .map(|k| (k.strata.as_str(), k.group.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("site", "lagoon"),
            ("site", "reef"),
            ("treated", "False"),
            ("treated", "True"),
        ]
    );
    assert!(summary.log.is_empty());
}

#[test]
fn test_seeded_runs_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let gut = write(&dir, "gut.tsv", GUT);
    let build = |out: &str| {
        Config::builder(dir.path().join(out))
            .metadata_file(&gut)
            .stratify(["sex", "country", "nope"])
            .number_of_samples(2)
            .seed(Some(2024))
            .build()
            .unwrap()
    };

    let first_config = build("first.html");
    let second_config = build("second.html");
    let first = run(&first_config).unwrap();
    let second = run(&second_config).unwrap();

    assert_eq!(first.rows, second.rows);
    assert_eq!(first.log.report(20), second.log.report(20));

    let first_html = fs::read_to_string(first.output.unwrap()).unwrap();
    let second_html = fs::read_to_string(second.output.unwrap()).unwrap();
    assert_eq!(first_html, second_html);
}

#[test]
fn test_report_after_run() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "gut.tsv", GUT);
    let config = Config::builder(dir.path().join("out"))
        .metadata_file(&path)
        .stratify(["host", "bmi"])
        .max_strata(3)
        .build()
        .unwrap();

    let summary = run(&config).unwrap();
    assert!(summary.rows.is_empty());
    assert!(summary.output.is_none());

    let table = path.display().to_string();
    let expected = format!(
        "[not categorical]\n{table}\n - bmi\n\
         [too many factors]\n{table}\n - variable host has 6 factor(s) (max 3 [option \"-s\"])\n"
    );
    assert_eq!(summary.log.report(config.max_strata()), expected);
}

#[test]
fn test_chart_keys_sort_like_titles() {
    let a = ChartKey {
        table_path: "a.tsv".to_string(),
        strata: "sex".to_string(),
        group: "male".to_string(),
    };
    let b = ChartKey {
        table_path: "a.tsv".to_string(),
        strata: "sex".to_string(),
        group: "female".to_string(),
    };
    assert!(b < a);
}
