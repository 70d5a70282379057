use anyhow::{Context, Result};
use ndarray::{Array1, Array2};
use ndarray_npy::{NpzReader, read_npy, write_npy};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::HaloCatalog;
use super::types::{COLUMNS, RawRow};
use crate::error::HaloError;

/// On-disk catalogue encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    /// Columnar table: one int64 array per DHalo column.
    Npz,
    /// Cached snapshot: one (n, 7) int64 array.
    Npy,
}

impl CatalogFormat {
    pub fn detect(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("npz") => Ok(CatalogFormat::Npz),
            Some("npy") => Ok(CatalogFormat::Npy),
            _ => Err(HaloError::UnsupportedFormat(path.to_path_buf()).into()),
        }
    }
}

fn read_column<R: std::io::Read + std::io::Seek>(
    npz: &mut NpzReader<R>,
    name: &str,
) -> Result<Vec<i64>> {
    // numpy.savez stores "<name>.npy"; accept the bare name too
    let arr: Array1<i64> = match npz.by_name(&format!("{}.npy", name)) {
        Ok(arr) => arr,
        Err(_) => npz
            .by_name(name)
            .with_context(|| format!("missing column {}", name))?,
    };
    Ok(arr.to_vec())
}

pub fn load_npz(path: &Path) -> Result<HaloCatalog> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut npz = NpzReader::new(f).context("read npz")?;

    let mut columns: [Vec<i64>; 7] = Default::default();
    for (slot, name) in columns.iter_mut().zip(COLUMNS) {
        *slot = read_column(&mut npz, name)
            .with_context(|| format!("in {}", path.display()))?;
    }
    Ok(HaloCatalog::from_columns(&columns)?)
}

pub fn load_npy(path: &Path) -> Result<HaloCatalog> {
    let table: Array2<i64> =
        read_npy(path).with_context(|| format!("read npy {}", path.display()))?;
    if table.ncols() != COLUMNS.len() {
        return Err(HaloError::MalformedCatalog(format!(
            "{} has shape {:?}, expected (n, {})",
            path.display(),
            table.shape(),
            COLUMNS.len()
        ))
        .into());
    }
    let rows: Vec<RawRow> = table
        .outer_iter()
        .map(|row| std::array::from_fn(|c| row[c]))
        .collect();
    Ok(HaloCatalog::from_rows(&rows)?)
}

/// Loads a catalogue, dispatching on the file extension.
pub fn load_catalog(path: &Path) -> Result<HaloCatalog> {
    let catalog = match CatalogFormat::detect(path)? {
        CatalogFormat::Npz => load_npz(path)?,
        CatalogFormat::Npy => load_npy(path)?,
    };
    tracing::info!(
        path = %path.display(),
        records = catalog.len(),
        "loaded catalogue"
    );
    Ok(catalog)
}

/// Writes the `.npy` cache: an (n, 7) int64 table in DHalo column order.
pub fn save_cache(path: &Path, catalog: &HaloCatalog) -> Result<()> {
    let flat: Vec<i64> = catalog
        .records()
        .iter()
        .flat_map(|r| r.to_row())
        .collect();
    let table = Array2::from_shape_vec((catalog.len(), COLUMNS.len()), flat)
        .context("shape cache table")?;
    write_npy(path, &table).with_context(|| format!("create {}", path.display()))?;
    Ok(())
}

/// `<dir>/<stem>_cache.npy` next to the input catalogue.
pub fn default_cache_path(input: &Path) -> PathBuf {
    let parent = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("catalogue");
    parent.join(format!("{stem}_cache.npy"))
}
