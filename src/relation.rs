//! Column-major relation storage.
//!
//! A [`Relation`] is an immutable table of unsigned 64-bit integers stored
//! column by column. A relation either owns its columns or borrows them from
//! a read-only memory map of a relation file; the distinction only matters
//! when the relation is dropped. All query execution reads columns through
//! the uniform [`Relation::column`] view.
//!
//! # File format
//!
//! Relation files are binary, little-endian:
//!
//! ```text
//! +----------------+----------------+-----------------+-----------------+
//! | rows: u64      | columns: u64   | column 0 values | column 1 values | ...
//! +----------------+----------------+-----------------+-----------------+
//! ^ offset 0       ^ offset 8       ^ offset 16         rows * 8 bytes each
//! ```
//!
//! Every column block starts at a multiple of 8 bytes, so a mapped file can
//! be reinterpreted as `u64` values in place.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::mem::size_of;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

/// Identifies a loaded relation. Dense, assigned in load order.
pub type RelationId = usize;

/// Size of the fixed file header: row count and column count, 8 bytes each.
const HEADER_SIZE: usize = 2 * size_of::<u64>();

/// An immutable column-major table of `u64` values.
pub struct Relation {
    rows: u64,
    storage: Storage,
}

/// Where the column data lives.
enum Storage {
    /// Columns allocated by this process.
    Owned(Vec<Vec<u64>>),
    /// Columns backed by a read-only file mapping. `offsets[c]` is the byte
    /// offset of column `c` within the map.
    Mapped { map: Mmap, offsets: Vec<usize> },
}

impl Relation {
    /// Creates a relation from owned column data.
    ///
    /// Every column must have exactly `rows` entries.
    pub fn new(rows: u64, columns: Vec<Vec<u64>>) -> Self {
        assert!(
            columns.iter().all(|c| c.len() as u64 == rows),
            "every column must have {rows} rows"
        );
        Self {
            rows,
            storage: Storage::Owned(columns),
        }
    }

    /// Creates the canonical test fixture: `cols` columns where every column
    /// holds the values `0..rows` in row order.
    pub fn sequential(rows: u64, cols: usize) -> Self {
        let column: Vec<u64> = (0..rows).collect();
        Self::new(rows, vec![column; cols])
    }

    /// Memory-maps a relation file.
    ///
    /// The returned relation borrows the mapped bytes for its lifetime;
    /// nothing is copied.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or mapped, if it is shorter than
    /// the 16-byte header, or if it is too small for the column blocks the
    /// header declares.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RelationError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RelationError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: the map is read-only and the relation file is never
        // modified while the map is alive.
        let map = unsafe { Mmap::map(&file) }.map_err(|source| RelationError::Map {
            path: path.to_path_buf(),
            source,
        })?;

        if map.len() < HEADER_SIZE {
            return Err(RelationError::InvalidHeader {
                path: path.to_path_buf(),
            });
        }

        let rows = read_u64(&map, 0);
        let cols = read_u64(&map, size_of::<u64>()) as usize;

        let column_bytes = (rows as usize)
            .checked_mul(size_of::<u64>())
            .ok_or_else(|| RelationError::InvalidHeader {
                path: path.to_path_buf(),
            })?;
        let expected = column_bytes
            .checked_mul(cols)
            .and_then(|data| data.checked_add(HEADER_SIZE))
            .ok_or_else(|| RelationError::InvalidHeader {
                path: path.to_path_buf(),
            })?;
        if map.len() < expected {
            return Err(RelationError::Truncated {
                path: path.to_path_buf(),
                expected,
                actual: map.len(),
            });
        }

        let offsets = (0..cols).map(|c| HEADER_SIZE + c * column_bytes).collect();
        Ok(Self {
            rows,
            storage: Storage::Mapped { map, offsets },
        })
    }

    /// The number of tuples.
    pub fn row_count(&self) -> u64 {
        self.rows
    }

    /// The number of columns.
    pub fn column_count(&self) -> usize {
        match &self.storage {
            Storage::Owned(columns) => columns.len(),
            Storage::Mapped { offsets, .. } => offsets.len(),
        }
    }

    /// The values of column `col`, in row order.
    pub fn column(&self, col: usize) -> &[u64] {
        match &self.storage {
            Storage::Owned(columns) => &columns[col],
            Storage::Mapped { map, offsets } => {
                let start = offsets[col];
                let bytes = &map[start..start + self.rows as usize * size_of::<u64>()];
                // SAFETY: column blocks start at a multiple of 8 within a
                // page-aligned mapping, so the cast cannot split values.
                let (head, values, tail) = unsafe { bytes.align_to::<u64>() };
                debug_assert!(head.is_empty() && tail.is_empty());
                values
            }
        }
    }

    /// Writes the relation in the binary file format.
    pub fn store(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(&self.rows.to_le_bytes())?;
        out.write_all(&(self.column_count() as u64).to_le_bytes())?;
        for col in 0..self.column_count() {
            for value in self.column(col) {
                out.write_all(&value.to_le_bytes())?;
            }
        }
        out.flush()
    }

    /// Writes the relation as `|`-delimited rows, e.g. for loading into an
    /// external DBMS.
    pub fn store_csv(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for row in 0..self.rows as usize {
            for col in 0..self.column_count() {
                write!(out, "{}|", self.column(col)[row])?;
            }
            writeln!(out)?;
        }
        out.flush()
    }

    /// Renders a PostgreSQL script that creates table `r<relation_id>` and
    /// loads it from the matching `.tbl` file.
    pub fn sql_schema(&self, relation_id: RelationId) -> String {
        let mut script = format!("CREATE TABLE r{relation_id} (");
        for col in 0..self.column_count() {
            script.push_str(&format!("c{col} bigint"));
            if col + 1 < self.column_count() {
                script.push(',');
            }
        }
        script.push_str(");\n");
        script.push_str(&format!(
            "copy r{relation_id} from 'r{relation_id}.tbl' delimiter '|';\n"
        ));
        script
    }
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(
        bytes[offset..offset + size_of::<u64>()]
            .try_into()
            .expect("slice is 8 bytes"),
    )
}

/// Errors raised while loading a relation file.
#[derive(Debug)]
pub enum RelationError {
    /// The file could not be opened.
    Open { path: PathBuf, source: io::Error },
    /// The file could not be memory-mapped.
    Map { path: PathBuf, source: io::Error },
    /// The file is shorter than the 16-byte header, or the header declares
    /// an impossible geometry.
    InvalidHeader { path: PathBuf },
    /// The file is too small for the column data the header declares.
    Truncated {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for RelationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationError::Open { path, source } => {
                write!(f, "cannot open {}: {}", path.display(), source)
            }
            RelationError::Map { path, source } => {
                write!(f, "cannot map {}: {}", path.display(), source)
            }
            RelationError::InvalidHeader { path } => {
                write!(
                    f,
                    "relation file {} does not contain a valid header",
                    path.display()
                )
            }
            RelationError::Truncated {
                path,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "relation file {} is truncated: expected {} bytes, found {}",
                    path.display(),
                    expected,
                    actual
                )
            }
        }
    }
}

impl std::error::Error for RelationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelationError::Open { source, .. } | RelationError::Map { source, .. } => Some(source),
            _ => None,
        }
    }
}
