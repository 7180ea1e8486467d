//! TMSim - Air-bone gap simulation for tympanic membrane perforations
//!
//! Copyright (C) 2025 Pierre Aubert pierre(at)spinorama(dot)org
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.
//!
//! This crate models the conductive hearing loss (air-bone gap, ABG) caused by a
//! perforated tympanic membrane. It integrates:
//!
//! - an empirical-physical ABG model blended with literature data (`model`)
//! - an alternate leakage/transmission formulation (`propagation`)
//! - an experiment sweep over grade, position and middle-ear volume (`sweep`)
//! - a validation engine scoring the model against patient audiograms (`validation`)

/// Common CLI argument definitions shared across binaries
pub mod cli;
/// Physical constants, standard frequencies and grade tables
pub mod constants;
/// Error types
pub mod error;
/// CSV import and export of simulation tables
pub mod export;
/// Literature and empirical reference tables
pub mod literature;
/// The ABG composer and the model trait
pub mod model;
/// Individual physical effect terms
pub mod physical;
/// Leakage and transmission-efficiency ABG formulation
pub mod propagation;
/// Clinical severity classification
pub mod severity;
/// Stateful simulator facade for interactive consumers
pub mod simulator;
/// Perforation state types
pub mod state;
/// Experiment sweep engine
pub mod sweep;
/// Post-sweep analysis against clinical data
pub mod analysis;
/// Patient validation engine
pub mod validation;
/// Shared workflow steps used by binaries
pub mod workflow;

// Re-export commonly used items
pub use constants::*;
pub use error::{Result, TmSimError};
pub use model::{AbgModel, BandAverages, EarModel, compute_abg};
pub use propagation::TransmissionModel;
pub use severity::Severity;
pub use simulator::EarSimulator;
pub use state::{FrequencyResponseRequest, PerforationGrade, PerforationState};
