//! Precedent vector index: exact squared-L2 search over an in-memory flat
//! index, persisted as an Arrow IPC vector file paired with a JSON metadata
//! list.
//!
//! The two on-disk artifacts move together: a successful `add` rewrites
//! both before reporting success, each replacement is atomic (temp file +
//! rename), and a load that finds them out of step discards both rather
//! than serving a desynchronized index.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use arrow::array::{Array, FixedSizeListArray, FixedSizeListBuilder, Float32Array, Float32Builder};
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use juris_core::index::{EMBEDDING_COLUMN, precedent_index_schema};

use crate::error::StoreError;

/// Binary vector file: one `embedding` column in insertion order.
pub const INDEX_FILE: &str = "precedents.arrow";
/// Parallel metadata list; its length always equals the vector count.
pub const META_FILE: &str = "meta.json";

/// `{id, text}` record stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedentMeta {
    pub id: String,
    pub text: String,
}

/// In-memory flat index over fixed-dimension vectors.
#[derive(Debug, Clone)]
pub struct PrecedentIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl PrecedentIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append a vector; rejects anything that is not `dim` floats.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<(), StoreError> {
        if vector.len() != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        self.vectors.push(vector);
        Ok(())
    }

    /// Exact k-nearest-neighbor search by squared Euclidean distance.
    ///
    /// Returns `(position, distance)` pairs in ascending distance order;
    /// `k` is clamped to the index size, so an empty index yields an empty
    /// result for any `k`. A query of the wrong dimension matches nothing.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if query.len() != self.dim {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, squared_l2(query, v)))
            .collect();
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k.min(self.vectors.len()));
        scored
    }

    fn iter(&self) -> impl Iterator<Item = &Vec<f32>> {
        self.vectors.iter()
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Durable store: owns the on-disk location and serializes writers.
///
/// Readers load the last-persisted snapshot without taking the lock;
/// concurrent `add` calls queue on the single write lock around
/// load → mutate → persist.
pub struct IndexStore {
    root: PathBuf,
    dim: usize,
    write_lock: Mutex<()>,
}

impl IndexStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>, dim: usize) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            dim,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn meta_path(&self) -> PathBuf {
        self.root.join(META_FILE)
    }

    /// Load the persisted index and metadata, or start empty.
    ///
    /// Absent, unreadable, or desynchronized files all initialize an empty
    /// index; the precedent data is lost but the caller keeps working.
    /// Availability over durability.
    pub fn load_or_create(&self) -> (PrecedentIndex, Vec<PrecedentMeta>) {
        let index_path = self.index_path();
        let meta_path = self.meta_path();

        if !index_path.exists() || !meta_path.exists() {
            return (PrecedentIndex::new(self.dim), Vec::new());
        }

        let index = match read_index(&index_path) {
            Ok(index) => index,
            Err(e) => {
                warn!(path = %index_path.display(), error = %e, "unreadable vector file, starting empty");
                return (PrecedentIndex::new(self.dim), Vec::new());
            }
        };
        let meta = match read_meta(&meta_path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %meta_path.display(), error = %e, "unreadable metadata file, starting empty");
                return (PrecedentIndex::new(self.dim), Vec::new());
            }
        };

        if index.len() != meta.len() || index.dim() != self.dim {
            warn!(
                vectors = index.len(),
                meta = meta.len(),
                file_dim = index.dim(),
                expected_dim = self.dim,
                "persisted index and metadata are out of step, starting empty"
            );
            return (PrecedentIndex::new(self.dim), Vec::new());
        }

        (index, meta)
    }

    /// Append one `(vector, text, id)` triple and persist, returning the
    /// new total. Write errors surface: a caller must never believe an
    /// unpersisted add succeeded.
    pub fn add(&self, vector: Vec<f32>, text: &str, id: &str) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().unwrap();
        let (mut index, mut meta) = self.load_or_create();
        index.add(vector)?;
        meta.push(PrecedentMeta {
            id: id.to_string(),
            text: text.to_string(),
        });
        self.persist(&index, &meta)?;
        info!(total = meta.len(), "precedent added");
        Ok(meta.len())
    }

    /// Atomically replace both on-disk artifacts.
    ///
    /// Each file is written to a temp in the same directory and renamed
    /// over the target, so a concurrent reader never sees a half-written
    /// file; a crash between the two renames is caught by the size check
    /// in [`load_or_create`].
    pub fn persist(
        &self,
        index: &PrecedentIndex,
        meta: &[PrecedentMeta],
    ) -> Result<(), StoreError> {
        if index.len() != meta.len() {
            return Err(StoreError::SizeMismatch {
                vectors: index.len(),
                meta: meta.len(),
            });
        }

        let mut index_tmp = NamedTempFile::new_in(&self.root)?;
        write_index(index_tmp.as_file_mut(), index)?;
        let mut meta_tmp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(meta_tmp.as_file_mut(), meta)?;

        index_tmp
            .persist(self.index_path())
            .map_err(|e| StoreError::Io(e.error))?;
        meta_tmp
            .persist(self.meta_path())
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Delete both persisted artifacts; the next load starts empty.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap();
        for path in [self.index_path(), self.meta_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(root = %self.root.display(), "precedent index cleared");
        Ok(())
    }

    /// Number of stored precedents in the last-persisted snapshot.
    pub fn count(&self) -> usize {
        self.load_or_create().1.len()
    }
}

// ── File formats ──

fn write_index(file: &mut File, index: &PrecedentIndex) -> Result<(), StoreError> {
    let schema = std::sync::Arc::new(precedent_index_schema(index.dim() as i32));

    let mut builder = FixedSizeListBuilder::new(Float32Builder::new(), index.dim() as i32);
    for vector in index.iter() {
        let values = builder.values();
        for &v in vector {
            values.append_value(v);
        }
        builder.append(true);
    }
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![std::sync::Arc::new(builder.finish())],
    )?;

    let mut writer = FileWriter::try_new(file, &schema)?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(())
}

fn read_index(path: &Path) -> Result<PrecedentIndex, StoreError> {
    let file = File::open(path)?;
    let reader = FileReader::try_new(file, None)?;

    let mut index: Option<PrecedentIndex> = None;
    for batch in reader {
        let batch = batch?;
        let column = batch
            .column_by_name(EMBEDDING_COLUMN)
            .ok_or_else(|| arrow::error::ArrowError::SchemaError(
                format!("missing '{EMBEDDING_COLUMN}' column"),
            ))?;
        let lists = column
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .ok_or_else(|| arrow::error::ArrowError::SchemaError(
                format!("'{EMBEDDING_COLUMN}' column is not FixedSizeList"),
            ))?;
        let dim = lists.value_length() as usize;
        let flat = lists
            .values()
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| arrow::error::ArrowError::SchemaError(
                "embedding values are not Float32".to_string(),
            ))?;

        let index = index.get_or_insert_with(|| PrecedentIndex::new(dim));
        for row in 0..batch.num_rows() {
            let offset = row * dim;
            index.add(flat.values()[offset..offset + dim].to_vec())?;
        }
    }

    // A file with no batches carries no dimension; report it as empty at
    // dim 0 and let the caller's dimension check reset it.
    Ok(index.unwrap_or_else(|| PrecedentIndex::new(0)))
}

fn read_meta(path: &Path) -> Result<Vec<PrecedentMeta>, StoreError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}
