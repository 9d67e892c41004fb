//! End-to-end export runs over synthetic WRF datasets.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use forecast_export::batch::write_compressed_json;
use forecast_export::BatchArchive;

use flate2::read::GzDecoder;
use serde_json::Value;

use forecast_export::summary::read_summary;
use forecast_export::{ExportConfig, ExportError, Exporter, SUMMARY_FILENAME};
use test_utils::{
    assert_approx_eq, create_temperature_series, domain, time, temp_test_dir, WrfFixture,
};

fn config(base: &Path) -> ExportConfig {
    ExportConfig {
        output_base: base.to_path_buf(),
        ..Default::default()
    }
}

fn read_archive(path: &Path) -> (String, Value) {
    let mut text = String::new();
    GzDecoder::new(File::open(path).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    let value = serde_json::from_str(&text).unwrap();
    (text, value)
}

fn variable_names(step: &Value) -> Vec<String> {
    step["variables"]
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect()
}

#[test]
fn test_full_run_layout() {
    let base = temp_test_dir();
    let source = WrfFixture::new(domain::SMALL, 7).build();

    let report = Exporter::new(&source, config(base.path()))
        .unwrap()
        .run()
        .unwrap();

    let out = base.path().join(time::INITIAL_DATE);
    assert_eq!(report.output_dir, out);
    assert!(out.join("001.json_gz").is_file());
    assert!(out.join("002.json_gz").is_file());
    assert!(!out.join("003.json_gz").exists());
    assert_eq!(report.summary_path, Some(out.join(SUMMARY_FILENAME)));

    let summary = read_summary(&out.join(SUMMARY_FILENAME)).unwrap();
    assert_eq!(summary.total_batches, 2);
    assert_eq!(summary.batch_size, 5);
    assert_eq!(summary.total_timesteps, 7);
    assert_eq!(summary.total_files_created, 2);
    assert_eq!(summary.output_format, "json_gz");
    assert_eq!(summary.batch_files, vec!["001.json_gz", "002.json_gz"]);
    assert!(summary.failed_batches.is_empty());
    assert!(summary.total_size_mb > 0.0);
    assert_eq!(
        summary.variables_processed,
        vec!["T2", "TSK", "SST", "U10", "V10", "RH", "TOTAL_RAIN"]
    );
}

#[test]
fn test_archive_contents() {
    let base = temp_test_dir();
    let source = WrfFixture::new(domain::SMALL, 7).build();
    Exporter::new(&source, config(base.path()))
        .unwrap()
        .run()
        .unwrap();
    let out = base.path().join(time::INITIAL_DATE);

    let (text, first) = read_archive(&out.join("001.json_gz"));
    let metadata = &first["metadata"];
    assert_eq!(metadata["batch_info"]["batch_number"], 1);
    assert_eq!(metadata["batch_info"]["total_batches"], 2);
    assert_eq!(metadata["batch_info"]["batch_size"], 5);
    assert_eq!(metadata["initial_timestamp"], "2025-05-14_00:00:00");
    assert_eq!(metadata["final_timestamp"], "2025-05-14_06:00:00");
    assert_eq!(metadata["total_timestamps"], 7);
    assert_eq!(metadata["points_per_time"], 20);
    assert_eq!(metadata["variable_scales"]["T2"], 100);
    assert_eq!(metadata["variable_scales"]["TOTAL_RAIN"], 100);

    assert_eq!(first["grid_info"]["corner"], serde_json::json!([20.0, 60.0]));
    assert_eq!(first["grid_info"]["steps"], serde_json::json!([0.5, 0.5]));
    assert_eq!(first["grid_info"]["size"], serde_json::json!([4, 5]));

    // Keys keep the configured processing order on disk.
    let t2 = text.find("\"T2\":[").unwrap();
    let tsk = text.find("\"TSK\":[").unwrap();
    let rh = text.find("\"RH\":[").unwrap();
    assert!(t2 < tsk && tsk < rh);
    assert!(text.starts_with("{\"metadata\":{\"batch_info\":"));

    let series = first["time_series"].as_array().unwrap();
    assert_eq!(series.len(), 5);
    let times: Vec<f64> = series.iter().map(|s| s["time"].as_f64().unwrap()).collect();
    assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

    // No hourly rain at the first timestep.
    let mut first_step = variable_names(&series[0]);
    first_step.sort();
    assert_eq!(first_step, vec!["RH", "SST", "T2", "TSK", "U10", "V10"]);
    assert!(variable_names(&series[1]).contains(&"TOTAL_RAIN".to_string()));

    // 1.25 mm/h from each of RAINC and RAINNC → 2.5 mm → 250
    let rain = series[1]["variables"]["TOTAL_RAIN"].as_array().unwrap();
    assert_eq!(rain.len(), 20);
    assert!(rain.iter().all(|v| v == 250));

    let (_, second) = read_archive(&out.join("002.json_gz"));
    assert_eq!(second["metadata"]["batch_info"]["batch_size"], 2);
    assert_eq!(second["metadata"]["initial_timestamp"], "2025-05-14_00:00:00");
    let series = second["time_series"].as_array().unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0]["time"].as_f64(), Some(5.0));
    // Lookback carries across the batch boundary.
    assert!(series[0]["variables"]["TOTAL_RAIN"]
        .as_array()
        .unwrap()
        .iter()
        .all(|v| v == 250));
}

#[test]
fn test_temperature_round_trip() {
    let base = temp_test_dir();
    let source = WrfFixture::new(domain::SMALL, 1).build();
    Exporter::new(&source, config(base.path()))
        .unwrap()
        .run()
        .unwrap();

    let (_, archive) = read_archive(&base.path().join(time::INITIAL_DATE).join("001.json_gz"));
    let encoded = archive["time_series"][0]["variables"]["T2"].as_array().unwrap();
    let expected = create_temperature_series(1, domain::SMALL.ny, domain::SMALL.nx);
    assert_eq!(encoded.len(), expected.len());
    for (raw, kelvin) in encoded.iter().zip(&expected) {
        let celsius = raw.as_i64().unwrap() as f64 / 100.0;
        assert_approx_eq!(celsius + 273.15, *kelvin, 0.011);
    }
}

#[test]
fn test_invalid_coordinates_are_excluded() {
    let base = temp_test_dir();
    let source = WrfFixture::new(domain::SMALL, 2).invalid_cell(3).build();
    Exporter::new(&source, config(base.path()))
        .unwrap()
        .run()
        .unwrap();

    let (_, archive) = read_archive(&base.path().join(time::INITIAL_DATE).join("001.json_gz"));
    assert_eq!(archive["metadata"]["points_per_time"], 19);
    for step in archive["time_series"].as_array().unwrap() {
        for (_, values) in step["variables"].as_object().unwrap() {
            assert_eq!(values.as_array().unwrap().len(), 19);
        }
    }
}

#[test]
fn test_missing_and_float_variables() {
    let base = temp_test_dir();
    let source = WrfFixture::new(domain::SMALL, 1).omit("SST").build();
    let config = ExportConfig {
        variables: vec!["SST".into(), "P".into(), "QVAPOR".into(), "NOPE".into()],
        ..config(base.path())
    };
    Exporter::new(&source, config).unwrap().run().unwrap();

    let (_, archive) = read_archive(&base.path().join(time::INITIAL_DATE).join("001.json_gz"));
    let step = &archive["time_series"][0];
    let mut names = variable_names(step);
    names.sort();
    assert_eq!(names, vec!["P", "QVAPOR"]);

    // P is stored unscaled from the lowest level: 500 + cell index.
    let pressure = step["variables"]["P"].as_array().unwrap();
    assert_eq!(pressure[0].as_f64(), Some(500.0));
    assert_eq!(pressure[19].as_f64(), Some(519.0));
    // QVAPOR lowest level is 0.012 kg/kg at scale 1e6
    let qvapor = step["variables"]["QVAPOR"].as_array().unwrap();
    let q = qvapor[0].as_u64().unwrap();
    assert!((11_999..=12_000).contains(&q), "{q}");

    assert_eq!(archive["metadata"]["variable_scales"]["NOPE"], 1);
}

fn fail_first_batch(path: &Path, archive: &BatchArchive, level: u32) -> forecast_export::Result<u64> {
    if archive.metadata.batch_info.batch_number == 1 {
        return Err(ExportError::Write {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        });
    }
    write_compressed_json(path, archive, level)
}

#[test]
fn test_failed_batch_is_skipped() {
    let base = temp_test_dir();
    let source = WrfFixture::new(domain::SMALL, 7).build();
    let report = Exporter::new(&source, config(base.path()))
        .unwrap()
        .with_writer(fail_first_batch)
        .run()
        .unwrap();

    let out = base.path().join(time::INITIAL_DATE);
    assert!(!out.join("001.json_gz").exists());
    assert!(out.join("002.json_gz").is_file());

    let summary = read_summary(&out.join(SUMMARY_FILENAME)).unwrap();
    assert_eq!(summary.failed_batches, vec!["001.json_gz"]);
    assert_eq!(summary.batch_files, vec!["002.json_gz"]);
    assert_eq!(summary.total_files_created, 1);
    assert_eq!(summary.total_batches, 2);
    assert_eq!(report.summary.failed_batches.len(), 1);
}

#[test]
fn test_rerun_replaces_output_directory() {
    let base = temp_test_dir();
    let out = base.path().join(time::INITIAL_DATE);
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("009.json_gz"), b"stale").unwrap();

    let source = WrfFixture::new(domain::SMALL, 3).build();
    let exporter = Exporter::new(&source, config(base.path())).unwrap();
    exporter.run().unwrap();
    exporter.run().unwrap();

    let mut files: Vec<String> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, vec!["001.json_gz", SUMMARY_FILENAME]);
}

#[test]
fn test_missing_coordinates_is_fatal() {
    let base = temp_test_dir();
    let source = WrfFixture::new(domain::SMALL, 2).omit("XLONG").build();
    let result = Exporter::new(&source, config(base.path())).unwrap().run();

    assert!(matches!(result, Err(ExportError::MissingCoordinates(_))));
    assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
}

#[test]
fn test_run_without_time_metadata() {
    let base = temp_test_dir();
    let source = WrfFixture::new(domain::POINT, 3)
        .without_timestamps()
        .omit("XTIME")
        .build();
    let report = Exporter::new(&source, config(base.path()))
        .unwrap()
        .run()
        .unwrap();

    // A single step dated today.
    assert_eq!(report.summary.total_timesteps, 1);
    let dir_name = report.output_dir.file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(dir_name.len(), 8);
    assert!(dir_name.chars().all(|c| c.is_ascii_digit()));

    let (_, archive) = read_archive(&report.output_dir.join("001.json_gz"));
    assert_eq!(archive["metadata"]["initial_timestamp"], "hour_0");
    assert_eq!(archive["metadata"]["final_timestamp"], "hour_0");
    assert_eq!(archive["metadata"]["total_timestamps"], 1);
    assert_eq!(archive["grid_info"]["steps"], serde_json::json!([0.0, 0.0]));
}

#[test]
fn test_batch_count_matches_ceiling() {
    for (steps, batch_size, expected) in [(1, 5, 1), (5, 5, 1), (6, 5, 2), (4, 1, 4)] {
        let base = temp_test_dir();
        let source = WrfFixture::new(domain::POINT, steps).build();
        let config = ExportConfig {
            batch_size,
            ..config(base.path())
        };
        let report = Exporter::new(&source, config).unwrap().run().unwrap();
        assert_eq!(report.summary.total_batches, expected, "{steps} steps / {batch_size}");
        assert_eq!(report.summary.batch_files.len(), expected);
    }
}
