//! Reads a real `wrfout` file when one is available.
//!
//! Place a file named `wrfout_sample.nc` in `crates/wrf-reader/testdata/` or
//! point `TEST_DATA_DIR` at a directory containing it.

#![cfg(feature = "netcdf")]

use test_utils::require_test_file;
use wrf_reader::{GridLayout, GridSource, NetCdfSource};

#[test]
fn test_sample_coordinates() {
    let path = require_test_file!("wrfout_sample.nc");
    let source = NetCdfSource::open(&path).expect("sample should open");

    let shape = source.variable_shape("XLAT").expect("XLAT should exist");
    let layout = GridLayout::from_shape(&shape).expect("XLAT should be 2D or 3D");
    let (ny, nx) = layout.plane_shape();

    let extents = layout.plane_extents(0, 0).expect("first plane");
    let lats = source.read_f32("XLAT", &extents).unwrap();
    assert_eq!(lats.len(), ny * nx);
    assert!(lats.iter().any(|v| v.is_finite()));
    assert!(lats.iter().filter(|v| v.is_finite()).all(|v| (-90.0..=90.0).contains(v)));
}

#[test]
fn test_sample_times() {
    let path = require_test_file!("wrfout_sample.nc");
    let source = NetCdfSource::open(&path).expect("sample should open");
    if !source.has_variable("Times") {
        return;
    }

    let rows = source.read_text_rows("Times").unwrap();
    assert!(!rows.is_empty());
    // "YYYY-MM-DD_HH:MM:SS"
    assert_eq!(rows[0].get(10), Some(&b'_'));
}

#[test]
fn test_sample_variable_listing() {
    let path = require_test_file!("wrfout_sample.nc");
    let source = NetCdfSource::open(&path).expect("sample should open");
    let names = source.variable_names();
    assert!(names.iter().any(|n| n == "XLONG"));
    for name in names.iter().take(20) {
        assert!(source.variable_shape(name).is_some(), "{name} listed without a shape");
    }
}
