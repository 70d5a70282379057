use std::fs::File;
use std::path::Path;

use dhalo::HaloError;
use dhalo::catalog::{COLUMNS, HaloCatalog, load_catalog, save_cache};
use dhalo::genealogy::host_mass;
use ndarray::{Array1, Array2};
use ndarray_npy::{NpzWriter, write_npy};

const ROWS: [[i64; 7]; 5] = [
    [1, -1, 2, 150, 1, -1, 1],
    [2, 1, 1, 100, 2, 1, 1],
    [3, 1, 1, 20, 2, 1, 0],
    [4, 2, 0, 30, 4, 2, 1],
    [5, 3, 0, 5, 4, 2, 0],
];

fn write_npz(path: &Path, rows: &[[i64; 7]], suffix: &str) {
    let mut npz = NpzWriter::new(File::create(path).unwrap());
    for (c, name) in COLUMNS.iter().enumerate() {
        let col: Array1<i64> = rows.iter().map(|r| r[c]).collect();
        npz.add_array(format!("{name}{suffix}"), &col).unwrap();
    }
    npz.finish().unwrap();
}

#[test]
fn loads_columnar_npz() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trees.npz");
    write_npz(&path, &ROWS, ".npy");

    let cat = load_catalog(&path).unwrap();
    assert_eq!(cat.len(), 5);
    assert_eq!(host_mass(&cat, 2).unwrap(), 120);
    assert_eq!(cat.get(1).unwrap().descendant_host, None);
}

#[test]
fn accepts_bare_column_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bare.npz");
    write_npz(&path, &ROWS, "");
    assert_eq!(load_catalog(&path).unwrap().len(), 5);
}

#[test]
fn cache_reloads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("trees_cache.npy");
    let cat = HaloCatalog::from_rows(&ROWS).unwrap();
    save_cache(&cache, &cat).unwrap();

    let back = load_catalog(&cache).unwrap();
    assert_eq!(back.records(), cat.records());
}

#[test]
fn npz_missing_a_column_fails_with_its_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.npz");
    let mut npz = NpzWriter::new(File::create(&path).unwrap());
    npz.add_array("nodeIndex.npy", &Array1::from_vec(vec![1i64]))
        .unwrap();
    npz.finish().unwrap();

    let err = load_catalog(&path).unwrap_err();
    assert!(format!("{err:#}").contains("descendantIndex"));
}

#[test]
fn npy_with_wrong_width_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("narrow.npy");
    write_npy(&path, &Array2::<i64>::zeros((3, 4))).unwrap();

    let err = load_catalog(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HaloError>(),
        Some(HaloError::MalformedCatalog(_))
    ));
}

#[test]
fn unknown_extension_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trees.hdf5");
    std::fs::write(&path, b"not a table").unwrap();

    let err = load_catalog(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HaloError>(),
        Some(HaloError::UnsupportedFormat(p)) if p == &path
    ));
}
