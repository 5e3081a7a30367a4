//! Lookup table of precomputed trajectories
//!
//! Each row maps a reached terminal pose `(x, y, yaw)` to the parameters
//! `(s, km, kf)` that produced it. The planner seeds the optimizer from the
//! row nearest to each target.

use itertools::iproduct;
use nalgebra::Vector3;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::common::{MotionModel, PlannerError, PlannerResult, Pose2D};

use super::motion_model::BicycleModel;
use super::trajectory_generator::TrajectoryParams;

/// Header line written by [`LookupTable::to_csv`]
pub const CSV_HEADER: &str = "x,y,yaw,s,km,kf";

/// Lookup table entry for trajectory generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupTableEntry {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub s: f64,
    pub km: f64,
    pub kf: f64,
}

impl LookupTableEntry {
    pub fn new(x: f64, y: f64, yaw: f64, s: f64, km: f64, kf: f64) -> Self {
        Self { x, y, yaw, s, km, kf }
    }

    /// Terminal pose of the entry
    pub fn pose(&self) -> Pose2D {
        Pose2D {
            x: self.x,
            y: self.y,
            yaw: self.yaw,
        }
    }

    /// Get trajectory parameters from entry
    pub fn params(&self) -> TrajectoryParams {
        Vector3::new(self.s, self.km, self.kf)
    }

    /// Euclidean distance over (x, y, yaw)
    ///
    /// Yaw is compared as a plain number, not on the circle, and weighs the
    /// same as a metre of position. Seed choice (and so convergence) depends
    /// on this metric.
    pub fn distance_to(&self, target: &Pose2D) -> f64 {
        let dx = self.x - target.x;
        let dy = self.y - target.y;
        let dyaw = self.yaw - target.yaw;
        (dx * dx + dy * dy + dyaw * dyaw).sqrt()
    }
}

/// Source of lookup table rows
pub trait LookupRowSource {
    fn read_rows(&self) -> PlannerResult<Vec<LookupTableEntry>>;
}

impl LookupRowSource for [LookupTableEntry] {
    fn read_rows(&self) -> PlannerResult<Vec<LookupTableEntry>> {
        Ok(self.to_vec())
    }
}

impl LookupRowSource for Vec<LookupTableEntry> {
    fn read_rows(&self) -> PlannerResult<Vec<LookupTableEntry>> {
        Ok(self.clone())
    }
}

/// CSV text with `x,y,yaw,s,km,kf` columns
///
/// Blank lines, `#` comments and a leading header are skipped. Columns past
/// the sixth are ignored.
#[derive(Debug, Clone, Copy)]
pub struct CsvRows<'a> {
    text: &'a str,
}

impl<'a> CsvRows<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }
}

impl LookupRowSource for CsvRows<'_> {
    fn read_rows(&self) -> PlannerResult<Vec<LookupTableEntry>> {
        let mut entries = Vec::new();

        for (index, raw) in self.text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("x,") {
                continue;
            }

            let mut values = [0.0; 6];
            let mut parts = line.split(',');
            for (slot, value) in values.iter_mut().enumerate() {
                let field = parts.next().ok_or_else(|| PlannerError::LookupTable {
                    line: index + 1,
                    reason: format!("expected 6 fields, found {}", slot),
                })?;
                *value = field.trim().parse::<f64>().map_err(|e| PlannerError::LookupTable {
                    line: index + 1,
                    reason: format!("field {} ({:?}): {}", slot + 1, field.trim(), e),
                })?;
            }

            let [x, y, yaw, s, km, kf] = values;
            entries.push(LookupTableEntry::new(x, y, yaw, s, km, kf));
        }

        Ok(entries)
    }
}

/// Lookup table for trajectory initialization
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: Vec<LookupTableEntry>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn from_entries(entries: Vec<LookupTableEntry>) -> Self {
        Self { entries }
    }

    /// Load every row from `source`
    pub fn from_source<R: LookupRowSource + ?Sized>(source: &R) -> PlannerResult<Self> {
        let entries = source.read_rows()?;
        debug!(rows = entries.len(), "lookup table loaded");
        Ok(Self { entries })
    }

    /// Create lookup table from CSV data
    pub fn from_csv(csv_data: &str) -> PlannerResult<Self> {
        Self::from_source(&CsvRows::new(csv_data))
    }

    /// Sweep the motion model over every `(s, km, kf)` combination
    pub fn generate<M: MotionModel + ?Sized>(
        model: &M,
        k0: f64,
        s_values: &[f64],
        k_values: &[f64],
    ) -> Self {
        let entries = iproduct!(s_values.iter(), k_values.iter(), k_values.iter())
            .map(|(&s, &km, &kf)| {
                let last = model.generate_last_state(s, km, kf, k0);
                LookupTableEntry::new(last.x, last.y, last.yaw, s, km, kf)
            })
            .collect();

        Self { entries }
    }

    /// Default bicycle model over common arc lengths and curvatures, k0 = 0
    pub fn generate_default() -> Self {
        Self::generate_default_for(&BicycleModel::with_defaults())
    }

    /// `model` over common arc lengths and curvatures, k0 = 0
    pub fn generate_default_for<M: MotionModel + ?Sized>(model: &M) -> Self {
        let s_values = [1.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0];
        let k_values = [-0.2, -0.1, -0.05, 0.0, 0.05, 0.1, 0.2];

        Self::generate(model, 0.0, &s_values, &k_values)
    }

    /// Find nearest entry to target state, with its distance
    ///
    /// Linear scan; the first of several equally near rows wins.
    pub fn find_nearest(&self, target: &Pose2D) -> Option<(&LookupTableEntry, f64)> {
        self.entries
            .iter()
            .map(|entry| (entry, entry.distance_to(target)))
            .min_by_key(|&(_, distance)| OrderedFloat(distance))
    }

    /// Add entry to table
    pub fn add(&mut self, entry: LookupTableEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LookupTableEntry] {
        &self.entries
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert to CSV string
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        csv.push('\n');
        for entry in &self.entries {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                entry.x, entry.y, entry.yaw, entry.s, entry.km, entry.kf
            ));
        }
        csv
    }
}
