//! Dataset store: the immutable model table loaded once at startup.

mod csv;
pub mod row;

pub use row::{Cell, Column, DatasetRow, Factor, Framework, Predictor};

use crate::logging::ts_now;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("dataset not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema mismatch: {0}")]
    Schema(String),

    #[error("invalid json dataset: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported dataset format: {0}")]
    Format(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub path: String,
    pub hash_sha256: String,
    pub row_count: u64,
    pub columns: Vec<String>,
    /// Missing-value counts per categorical column.
    pub missing: BTreeMap<String, u64>,
    pub generated_at: String,
}

/// The model table, sorted ascending by `post_mean`.
///
/// Read-only after construction; share it across sessions behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<DatasetRow>,
    manifest: DatasetManifest,
}

impl Dataset {
    /// Load a `.csv` or `.json` table. Any failure here is fatal to startup.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        if !path.exists() {
            return Err(DataError::NotFound(path.to_path_buf()));
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if ext != "csv" && ext != "json" {
            return Err(DataError::Format(format!("{:?}", ext)));
        }
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (columns, rows) = if ext == "csv" {
            csv::parse_rows(&text)?
        } else {
            let rows: Vec<DatasetRow> = serde_json::from_str(&text)?;
            let columns = Column::ALL.iter().map(|c| c.as_str().to_string()).collect();
            (columns, rows)
        };
        let hash = file_sha256(path)?;
        Self::build(path.display().to_string(), hash, columns, rows)
    }

    /// Build from in-memory rows; the fingerprint covers their JSON form.
    pub fn from_rows(rows: Vec<DatasetRow>) -> Result<Self, DataError> {
        let bytes = serde_json::to_vec(&rows)?;
        let hash = hex::encode(Sha256::digest(&bytes));
        let columns = Column::ALL.iter().map(|c| c.as_str().to_string()).collect();
        Self::build("<memory>".to_string(), hash, columns, rows)
    }

    fn build(
        path: String,
        hash_sha256: String,
        columns: Vec<String>,
        mut rows: Vec<DatasetRow>,
    ) -> Result<Self, DataError> {
        for r in &mut rows {
            r.normalize_missing();
        }
        if let Some(bad) = rows.iter().find(|r| !r.post_mean.is_finite()) {
            return Err(DataError::Schema(format!(
                "non-finite post_mean for model {:?}",
                bad.model_id
            )));
        }
        // Stable: ties keep file order.
        rows.sort_by(|a, b| a.post_mean.total_cmp(&b.post_mean));

        let mut seen = HashSet::new();
        for r in &rows {
            if !seen.insert(r.model_id.as_str()) {
                return Err(DataError::Schema(format!(
                    "duplicate model_id {:?}",
                    r.model_id
                )));
            }
        }

        let mut missing = BTreeMap::new();
        for factor in Factor::ALL {
            let n = rows.iter().filter(|r| r.factor(factor).is_none()).count();
            missing.insert(factor.as_str().to_string(), n as u64);
        }

        let manifest = DatasetManifest {
            path,
            hash_sha256,
            row_count: rows.len() as u64,
            columns,
            missing,
            generated_at: ts_now(),
        };
        Ok(Self { rows, manifest })
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn manifest(&self) -> &DatasetManifest {
        &self.manifest
    }

    /// Model ids in table order (the forest plot's category order).
    pub fn model_levels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.model_id.as_str()).collect()
    }

    pub fn project(&self, columns: &[Column]) -> Vec<Vec<Cell>> {
        self.rows
            .iter()
            .map(|r| columns.iter().map(|c| r.cell(*c)).collect())
            .collect()
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<&DatasetRow>
    where
        P: Fn(&DatasetRow) -> bool,
    {
        self.rows.iter().filter(|r| predicate(r)).collect()
    }
}

pub fn file_sha256(path: &Path) -> Result<String, DataError> {
    let io_err = |source| DataError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn default_manifest_path(dataset_path: &Path) -> PathBuf {
    let mut p = dataset_path.to_path_buf();
    let fname = dataset_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("models.csv");
    p.set_file_name(format!("{}.manifest.json", fname));
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, pm: f64) -> DatasetRow {
        DatasetRow::new(id, Framework::Frequentist, pm)
    }

    #[test]
    fn rows_sorted_by_post_mean_stable() {
        let ds = Dataset::from_rows(vec![row("c", 0.3), row("a", 0.1), row("b", 0.1)]).unwrap();
        assert_eq!(ds.model_levels(), vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_model_id_rejected() {
        let err = Dataset::from_rows(vec![row("a", 0.1), row("a", 0.2)]).unwrap_err();
        assert!(matches!(err, DataError::Schema(_)));
    }

    #[test]
    fn nan_post_mean_rejected() {
        let err = Dataset::from_rows(vec![row("a", f64::NAN)]).unwrap_err();
        assert!(matches!(err, DataError::Schema(_)));
    }

    #[test]
    fn project_keeps_order_and_missing() {
        let mut r = row("b", 0.2);
        r.outcome = Some("f0".into());
        let ds = Dataset::from_rows(vec![r, row("a", 0.1)]).unwrap();
        let cells = ds.project(&[Column::ModelId, Column::Outcome]);
        assert_eq!(cells[0], vec![Cell::Text("a".into()), Cell::Missing]);
        assert_eq!(cells[1], vec![Cell::Text("b".into()), Cell::Text("f0".into())]);
    }

    #[test]
    fn filter_returns_matching_rows() {
        let mut b = row("b", 0.2);
        b.framework = Framework::Bayesian;
        let ds = Dataset::from_rows(vec![row("a", 0.1), b]).unwrap();
        let hits = ds.filter(|r| r.framework == Framework::Bayesian);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].model_id, "b");
    }

    #[test]
    fn manifest_counts_missing() {
        let mut a = row("a", 0.1);
        a.outcome = Some("f0".into());
        let ds = Dataset::from_rows(vec![a, row("b", 0.2)]).unwrap();
        assert_eq!(ds.manifest().missing["outcome"], 1);
        assert_eq!(ds.manifest().missing["typicality"], 2);
        assert_eq!(ds.manifest().row_count, 2);
    }

    #[test]
    fn manifest_path_appends_suffix() {
        let p = default_manifest_path(Path::new("data/models.csv"));
        assert_eq!(p, PathBuf::from("data/models.csv.manifest.json"));
    }
}
