// promp_bbo/src/prelude.rs

// A "prelude" module that re-exports the most commonly used items, so that
// downstream code can `use promp_bbo::prelude::*`.

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::cost::{CostError, CostFunction};
pub use crate::updater::{Updater, WeightingMethod};

// --- Core Data Structures ---
pub use crate::distribution::DistributionGaussian;
pub use crate::updater::{DistributionUpdate, UpdaterCovarDecay};

// --- The Optimization Loop ---
pub use crate::run::{run_optimization, OptimizationOutcome, FAILED_SAMPLE_COST};

// --- Errors ---
pub use crate::error::BboError;
