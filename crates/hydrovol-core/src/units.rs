//! Physical-unit derivation of per-cell scalar fields.
//!
//! A [`UnitContext`] is computed once per build from the snapshot header and
//! turns raw code-unit samples into a display density (dimensionless
//! overdensity for cosmological runs, kg/m^3 otherwise) and a gas
//! temperature in Kelvin. Malformed unit scales never error; they fall back
//! to identity scaling so the pipeline always produces usable output.

use serde::{Deserialize, Serialize};

use crate::cell::{FieldInstance, RawCell, SnapshotHeader};
use crate::options::PipelineOptions;

/// Gravitational constant, m^3 kg^-1 s^-2.
pub const G_SI: f64 = 6.674_30e-11;
/// One megaparsec in meters.
pub const MPC_IN_M: f64 = 3.085_677_581_491_367e22;
/// Boltzmann constant, J/K.
pub const K_BOLTZMANN: f64 = 1.380_649e-23;
/// Hydrogen atom mass, kg.
pub const M_HYDROGEN: f64 = 1.673_557_5e-27;

/// How converted density values are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DensityMode {
    /// Density relative to the cosmological mean baryon density.
    Overdensity,
    /// Absolute physical density in kg/m^3 (or code units on fallback).
    Absolute,
}

/// Per-build unit conversion context.
///
/// Fixed for the whole build: the interpretation mode drives both the
/// converter and the quantile tuning of the range estimator.
#[derive(Debug, Clone)]
pub struct UnitContext {
    mode: DensityMode,
    /// Code density to kg/m^3; 1.0 when the header scale is unusable.
    density_scale: f64,
    /// Mean baryon density, kg/m^3. 1.0 in absolute mode.
    rho_bar_b: f64,
    /// Code pressure to Pascals; 1.0 when any length/time/density scale
    /// is unusable.
    pressure_unit: f64,
    min_overdensity: f32,
    max_overdensity: f32,
}

fn usable(scale: f64) -> bool {
    scale.is_finite() && scale > 0.0
}

impl UnitContext {
    /// Derives the conversion context from the snapshot header.
    #[must_use]
    pub fn from_header(header: &SnapshotHeader, options: &PipelineOptions) -> Self {
        let mode = if header.omega_b > 0.0 {
            DensityMode::Overdensity
        } else {
            DensityMode::Absolute
        };

        // Critical density today, kg/m^3, from H0 in km/s/Mpc.
        let h0_si = header.h0 * 1000.0 / MPC_IN_M;
        let rho_crit0 = 3.0 * h0_si * h0_si / (8.0 * std::f64::consts::PI * G_SI);
        let rho_bar_b = if mode == DensityMode::Overdensity {
            let a = header.aexp;
            header.omega_b * rho_crit0 / (a * a * a)
        } else {
            1.0
        };

        let density_scale = if usable(header.unit_d) {
            header.unit_d
        } else {
            1.0
        };

        let pressure_unit =
            if usable(header.unit_d) && usable(header.unit_l) && usable(header.unit_t) {
                header.unit_d * header.unit_l * header.unit_l / (header.unit_t * header.unit_t)
            } else {
                1.0
            };

        if density_scale == 1.0 && mode == DensityMode::Absolute {
            log::debug!("unit_d unusable, densities stay in code units");
        }

        Self {
            mode,
            density_scale,
            rho_bar_b,
            pressure_unit,
            min_overdensity: options.min_overdensity,
            max_overdensity: options.max_overdensity,
        }
    }

    /// Returns the density interpretation mode for this build.
    #[must_use]
    pub fn mode(&self) -> DensityMode {
        self.mode
    }

    /// Returns true when densities are dimensionless overdensities.
    #[must_use]
    pub fn is_overdensity(&self) -> bool {
        self.mode == DensityMode::Overdensity
    }

    /// Converts one raw cell into a retained field instance.
    ///
    /// Returns `None` when the cell is rejected: non-finite or negative
    /// converted density, or (in overdensity mode) a value outside the
    /// configured overdensity window.
    #[must_use]
    pub fn convert(&self, cell: &RawCell) -> Option<FieldInstance> {
        let rho_phys = f64::from(cell.density) * self.density_scale;
        #[allow(clippy::cast_possible_truncation)]
        let value = match self.mode {
            DensityMode::Overdensity => (rho_phys / self.rho_bar_b) as f32,
            DensityMode::Absolute => rho_phys as f32,
        };

        if !value.is_finite() || value < 0.0 {
            return None;
        }
        if self.mode == DensityMode::Overdensity
            && (value < self.min_overdensity || value > self.max_overdensity)
        {
            return None;
        }

        // Ideal-gas temperature T = P/rho * mH/kB, zero for empty cells.
        let p_phys = f64::from(cell.pressure) * self.pressure_unit;
        let t = if rho_phys > 0.0 {
            (p_phys / rho_phys) * (M_HYDROGEN / K_BOLTZMANN)
        } else {
            0.0
        };
        #[allow(clippy::cast_possible_truncation)]
        let temperature = if t.is_finite() { t as f32 } else { 0.0 };

        Some(FieldInstance::new(
            cell.center,
            cell.level,
            value,
            temperature,
        ))
    }
}
