//! Dimension-checked vector collection addressed by dense integer id

use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use rayon::prelude::*;

use crate::error::{NnsError, Result};
use crate::vector::check_dimension;

/// An ordered set of `d`-dimensional vectors stored row-major in one buffer.
///
/// A vector's id is its insertion position (`0..len`). Ids are never reused:
/// the only mutation is [`VectorDataset::push`], and removal goes through
/// [`VectorDataset::filtered`], which produces a new dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDataset {
    data: Vec<f32>,
    dimension: usize,
}

impl VectorDataset {
    /// Create an empty dataset of the given dimension.
    pub fn new(dimension: usize) -> Result<Self> {
        Self::with_capacity(dimension, 0)
    }

    /// Create an empty dataset with room for `capacity` vectors.
    pub fn with_capacity(dimension: usize, capacity: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(NnsError::invalid("dimension", "must be at least 1"));
        }
        let len = dimension.checked_mul(capacity).ok_or_else(|| {
            NnsError::invalid(
                "capacity",
                format!("{capacity} vectors of dimension {dimension} overflow usize"),
            )
        })?;
        Ok(Self {
            data: Vec::with_capacity(len),
            dimension,
        })
    }

    /// Build a dataset from rows, checking every row against `dimension`.
    pub fn from_rows<I, V>(dimension: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[f32]>,
    {
        let mut dataset = Self::new(dimension)?;
        for row in rows {
            dataset.push(row.as_ref())?;
        }
        Ok(dataset)
    }

    /// Build a dataset from an `n x d` matrix.
    pub fn from_array(array: Array2<f32>) -> Result<Self> {
        let dimension = array.ncols();
        if dimension == 0 {
            return Err(NnsError::invalid("dimension", "must be at least 1"));
        }
        // Logical iteration order is row-major regardless of memory layout.
        let data: Vec<f32> = array.iter().copied().collect();
        Ok(Self { data, dimension })
    }

    /// Generate `n` vectors with components drawn uniformly from `[0, 1)`.
    pub fn random<R: Rng + ?Sized>(n: usize, dimension: usize, rng: &mut R) -> Result<Self> {
        if dimension == 0 {
            return Err(NnsError::invalid("dimension", "must be at least 1"));
        }
        let array = Array2::<f32>::random_using((n, dimension), Uniform::new(0.0f32, 1.0), rng);
        Self::from_array(array)
    }

    /// Number of components per vector.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The vector stored under `id`, if any.
    pub fn get(&self, id: usize) -> Option<&[f32]> {
        let start = id.checked_mul(self.dimension)?;
        self.data.get(start..start.checked_add(self.dimension)?)
    }

    /// Iterate over `(id, vector)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f32])> + '_ {
        self.data.chunks_exact(self.dimension).enumerate()
    }

    /// Parallel iterator over rows in id order.
    pub fn par_rows(&self) -> rayon::slice::ChunksExact<'_, f32> {
        self.data.par_chunks_exact(self.dimension)
    }

    /// Fail with `DimensionMismatch` unless `vector` matches this dataset.
    pub fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        check_dimension(self.dimension, vector)
    }

    /// Append a vector and return its id.
    pub fn push(&mut self, vector: &[f32]) -> Result<usize> {
        self.check_dimension(vector)?;
        let id = self.len();
        self.data.extend_from_slice(vector);
        Ok(id)
    }

    /// Copy the vectors for which `keep` returns true into a new dataset.
    ///
    /// Returns the new dataset and, for each new id, the id it had here.
    pub fn filtered<F>(&self, mut keep: F) -> (VectorDataset, Vec<usize>)
    where
        F: FnMut(usize, &[f32]) -> bool,
    {
        let mut data = Vec::new();
        let mut old_ids = Vec::new();
        for (id, vector) in self.iter() {
            if keep(id, vector) {
                data.extend_from_slice(vector);
                old_ids.push(id);
            }
        }
        let dataset = VectorDataset {
            data,
            dimension: self.dimension,
        };
        (dataset, old_ids)
    }
}
