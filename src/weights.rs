use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::engine::Action;
use crate::features::{Feature, FeatureVector, NUM_FEATURES};

pub const NUM_WEIGHTS: usize = Action::COUNT * NUM_FEATURES;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to access weight file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("expected {expected} weights, found {found}")]
    WrongCount { expected: usize, found: usize },
    #[error("weight #{index} is not a number: {token:?}")]
    InvalidNumber { index: usize, token: String },
    #[error("weight #{index} is not finite")]
    NonFinite { index: usize },
}

/// Linear action-value weights, one row per action and one column per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    rows: [[f64; NUM_FEATURES]; Action::COUNT],
}

impl WeightMatrix {
    pub fn zeros() -> Self {
        WeightMatrix {
            rows: [[0.0; NUM_FEATURES]; Action::COUNT],
        }
    }

    /// Independent uniform values in [0, 1).
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut matrix = WeightMatrix::zeros();
        for cell in matrix.rows.iter_mut().flatten() {
            *cell = rng.gen::<f64>();
        }
        matrix
    }

    /// Builds a matrix from action-major values.
    pub fn from_flat(values: &[f64]) -> Result<Self, PersistenceError> {
        if values.len() != NUM_WEIGHTS {
            return Err(PersistenceError::WrongCount {
                expected: NUM_WEIGHTS,
                found: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(PersistenceError::NonFinite { index });
        }
        let mut matrix = WeightMatrix::zeros();
        for (cell, value) in matrix.rows.iter_mut().flatten().zip(values) {
            *cell = *value;
        }
        Ok(matrix)
    }

    /// Parses the whitespace-separated persistence format.
    pub fn parse(text: &str) -> Result<Self, PersistenceError> {
        let values = text
            .split_whitespace()
            .enumerate()
            .map(|(index, token)| {
                token.parse::<f64>().map_err(|_| PersistenceError::InvalidNumber {
                    index,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        WeightMatrix::from_flat(&values)
    }

    /// One line per action row; `parse` only cares about whitespace.
    pub fn serialize(&self) -> String {
        let mut out = self.rows.iter().map(|row| row.iter().join(" ")).join("\n");
        out.push('\n');
        out
    }

    pub fn get(&self, action: Action, feature: Feature) -> f64 {
        self.rows[action.index()][feature.index()]
    }

    pub fn set(&mut self, action: Action, feature: Feature, value: f64) {
        self.rows[action.index()][feature.index()] = value;
    }

    pub fn row(&self, action: Action) -> &[f64; NUM_FEATURES] {
        &self.rows[action.index()]
    }

    pub fn row_mut(&mut self, action: Action) -> &mut [f64; NUM_FEATURES] {
        &mut self.rows[action.index()]
    }

    /// Action-major iteration over every cell.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().flatten().copied()
    }

    pub fn is_finite(&self) -> bool {
        self.values().all(f64::is_finite)
    }

    /// Estimated value of `action`: the dot product of its row with the features.
    pub fn q_value(&self, action: Action, features: &FeatureVector) -> f64 {
        self.row(action)
            .iter()
            .enumerate()
            .map(|(idx, w)| w * features.value(idx))
            .sum()
    }

    /// Best estimated value over the whole action space.
    pub fn max_q(&self, features: &FeatureVector) -> f64 {
        Action::ALL
            .iter()
            .map(|a| self.q_value(*a, features))
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl fmt::Display for WeightMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>9}", "")?;
        for feature in Feature::ALL {
            write!(f, " {:>7}", feature.label())?;
        }
        for action in Action::ALL {
            writeln!(f)?;
            write!(f, "{:>9}", action.name())?;
            for w in self.row(action) {
                write!(f, " {:>7.3}", w)?;
            }
        }
        Ok(())
    }
}

/// File-backed checkpoint of a `WeightMatrix`.
#[derive(Debug, Clone)]
pub struct WeightStore {
    path: PathBuf,
}

impl WeightStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        WeightStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been persisted yet.
    pub fn try_load(&self) -> Result<Option<WeightMatrix>, PersistenceError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        WeightMatrix::parse(&text).map(Some)
    }

    /// Restores the persisted matrix, or starts from random weights when there is
    /// none or it cannot be read. Bad weights are relearned, so this never fails.
    pub fn load<R: Rng + ?Sized>(&self, rng: &mut R) -> WeightMatrix {
        match self.try_load() {
            Ok(Some(weights)) => {
                info!(path = %self.path.display(), "restored weights");
                weights
            }
            Ok(None) => {
                info!(path = %self.path.display(), "no saved weights, cold start");
                WeightMatrix::random(rng)
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "discarding saved weights, cold start");
                WeightMatrix::random(rng)
            }
        }
    }

    /// Overwrites the file unconditionally.
    pub fn save(&self, weights: &WeightMatrix) -> Result<(), PersistenceError> {
        fs::write(&self.path, weights.serialize()).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
