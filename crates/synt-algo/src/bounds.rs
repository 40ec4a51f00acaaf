//! Physical bounds of the bounded plant variables.
//!
//! Bounds are built in layers for every (plant, stage, block):
//!
//! 1. the baseline `(0, +inf)`
//! 2. limits of single-term flow constraints on the variable, divided by the
//!    term's coefficient, replacing the baseline where they exist
//! 3. registration limits (maximum turbined flow)
//!
//! Sources of layers 2 and 3 that meet on the same row merge tightest-wins.
//! Block 0 then gets the duration-weighted average of the block bounds.
//! Keys without a bound rule are `(-inf, +inf)`.

use std::collections::HashMap;
use synt_core::{OperationSynthesis, SpatialResolution, SyntResult, Variable};

use crate::deck::{Calendar, FlowConstraint, HydroPlant};
use crate::operation::frame::SynthesisFrame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub const UNBOUNDED: Bounds = Bounds {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    pub const NON_NEGATIVE: Bounds = Bounds {
        lower: 0.0,
        upper: f64::INFINITY,
    };

    /// Tightest of both: highest lower bound, lowest upper bound.
    pub fn tighten(self, other: Bounds) -> Bounds {
        Bounds {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        self.lower - tolerance <= value && value <= self.upper + tolerance
    }
}

/// Constraint tag acting on `synthesis`, when it is a bounded key.
pub fn constraint_tag(synthesis: &OperationSynthesis) -> Option<&'static str> {
    if synthesis.resolution != SpatialResolution::Uhe {
        return None;
    }
    match synthesis.variable {
        Variable::Qver => Some("QVER"),
        Variable::Qtur => Some("QTUR"),
        Variable::Qdef => Some("QDEF"),
        _ => None,
    }
}

pub fn is_bounded(synthesis: &OperationSynthesis) -> bool {
    constraint_tag(synthesis).is_some()
}

/// Collaborators of the bounded keys.
pub struct BoundSources<'a> {
    pub constraints: &'a [FlowConstraint],
    pub plants: &'a [HydroPlant],
    pub calendar: &'a Calendar,
}

/// Sets `lower_bound` / `upper_bound` on every row of `frame`.
pub fn attach_bounds(
    synthesis: &OperationSynthesis,
    frame: &mut SynthesisFrame,
    sources: Option<&BoundSources<'_>>,
) -> SyntResult<()> {
    let (Some(tag), Some(sources)) = (constraint_tag(synthesis), sources) else {
        for row in &mut frame.rows {
            row.lower_bound = Bounds::UNBOUNDED.lower;
            row.upper_bound = Bounds::UNBOUNDED.upper;
        }
        return Ok(());
    };
    let table = bound_table(synthesis, tag, sources)?;
    for row in &mut frame.rows {
        let plant = row.entity.first().copied().unwrap_or_default();
        let bounds = table
            .get(&(plant, row.stage, row.block))
            .copied()
            .unwrap_or(Bounds::NON_NEGATIVE);
        row.lower_bound = bounds.lower;
        row.upper_bound = bounds.upper;
    }
    Ok(())
}

/// Bounds per (plant, stage, block), block 0 included.
pub fn bound_table(
    synthesis: &OperationSynthesis,
    tag: &str,
    sources: &BoundSources<'_>,
) -> SyntResult<HashMap<(i64, i64, i64), Bounds>> {
    let mut overrides: HashMap<(i64, i64, i64), Bounds> = HashMap::new();
    let mut merge = |key: (i64, i64, i64), bounds: Bounds| {
        overrides
            .entry(key)
            .and_modify(|current| *current = current.tighten(bounds))
            .or_insert(bounds);
    };

    for constraint in sources.constraints.iter().filter(|c| c.kind == tag) {
        if constraint.coefficient == 0.0 {
            continue;
        }
        for (&(stage, block), limits) in &constraint.limits {
            let mut lower = limits.lower.map_or(f64::NEG_INFINITY, |l| l / constraint.coefficient);
            let mut upper = limits.upper.map_or(f64::INFINITY, |u| u / constraint.coefficient);
            if constraint.coefficient < 0.0 {
                std::mem::swap(&mut lower, &mut upper);
                if limits.lower.is_none() {
                    upper = f64::INFINITY;
                }
                if limits.upper.is_none() {
                    lower = f64::NEG_INFINITY;
                }
            }
            merge((constraint.plant, stage, block), Bounds { lower, upper });
        }
    }

    let mut table: HashMap<(i64, i64, i64), Bounds> = HashMap::new();
    let stages = sources.calendar.stage_codes();
    for plant in sources.plants {
        for &stage in &stages {
            let blocks = sources.calendar.blocks(stage);
            let mut weighted = (0.0, 0.0, 0.0);
            for &block in &blocks {
                let mut bounds = Bounds::NON_NEGATIVE;
                if let Some(constraint) = overrides.get(&(plant.code, stage, block)) {
                    if constraint.lower.is_finite() {
                        bounds.lower = constraint.lower;
                    }
                    if constraint.upper.is_finite() {
                        bounds.upper = constraint.upper;
                    }
                }
                if synthesis.variable == Variable::Qtur {
                    bounds = bounds.tighten(Bounds {
                        lower: f64::NEG_INFINITY,
                        upper: plant.max_turbined_flow,
                    });
                }
                let hours = sources.calendar.block_hours(stage, block)?;
                weighted.0 += bounds.lower * hours;
                weighted.1 += bounds.upper * hours;
                weighted.2 += hours;
                table.insert((plant.code, stage, block), bounds);
            }
            if weighted.2 > 0.0 {
                table.insert(
                    (plant.code, stage, 0),
                    Bounds {
                        lower: weighted.0 / weighted.2,
                        upper: weighted.1 / weighted.2,
                    },
                );
            }
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Limits;
    use polars::prelude::*;
    use std::collections::BTreeMap;
    use synt_core::columns::*;

    fn calendar() -> Calendar {
        let blocks = df![
            ESTAGIO => &[1i64, 1, 1],
            PATAMAR => &[0i64, 1, 2],
            DURACAO => &[4.0f64, 1.0, 3.0]
        ]
        .unwrap();
        let stages = df![
            ESTAGIO => &[1i64],
            DATA_INICIO => &["2023-01-07T00:00:00"],
            DATA_FIM => &["2023-01-07T04:00:00"],
            DURACAO_ESTAGIO => &[4.0f64]
        ]
        .unwrap();
        Calendar::from_frames(&blocks, &stages).unwrap()
    }

    fn plant() -> HydroPlant {
        HydroPlant {
            code: 6,
            name: "FURNAS".into(),
            ree: 10,
            ree_name: "PARANA".into(),
            submarket: 1,
            submarket_name: "SE".into(),
            min_volume: 5733.0,
            max_volume: 22950.0,
            max_turbined_flow: 1692.0,
        }
    }

    fn constraint(kind: &str, coefficient: f64, lower: Option<f64>, upper: Option<f64>) -> FlowConstraint {
        let mut limits = BTreeMap::new();
        limits.insert((1, 1), Limits { lower, upper });
        FlowConstraint {
            code: 1,
            first_stage: 1,
            last_stage: 1,
            plant: 6,
            kind: kind.into(),
            coefficient,
            limits,
        }
    }

    #[test]
    fn constraint_limits_replace_the_baseline_in_their_blocks() {
        let constraints = vec![constraint("QVER", 2.0, Some(100.0), Some(400.0))];
        let plants = vec![plant()];
        let calendar = calendar();
        let sources = BoundSources {
            constraints: &constraints,
            plants: &plants,
            calendar: &calendar,
        };
        let key = OperationSynthesis::parse("QVER_UHE").unwrap();
        let table = bound_table(&key, "QVER", &sources).unwrap();
        assert_eq!(table[&(6, 1, 1)], Bounds { lower: 50.0, upper: 200.0 });
        assert_eq!(table[&(6, 1, 2)], Bounds::NON_NEGATIVE);
        assert_eq!(table[&(6, 1, 0)].lower, 12.5);
        assert_eq!(table[&(6, 1, 0)].upper, f64::INFINITY);
    }

    #[test]
    fn negative_coefficients_swap_sides() {
        let constraints = vec![constraint("QDEF", -1.0, Some(-300.0), None)];
        let plants = vec![plant()];
        let calendar = calendar();
        let sources = BoundSources {
            constraints: &constraints,
            plants: &plants,
            calendar: &calendar,
        };
        let key = OperationSynthesis::parse("QDEF_UHE").unwrap();
        let table = bound_table(&key, "QDEF", &sources).unwrap();
        assert_eq!(table[&(6, 1, 1)], Bounds { lower: 0.0, upper: 300.0 });
    }

    #[test]
    fn turbined_flow_is_capped_by_registration() {
        let constraints = vec![
            constraint("QTUR", 1.0, None, Some(2000.0)),
            constraint("QTUR", 1.0, Some(10.0), Some(1500.0)),
        ];
        let plants = vec![plant()];
        let calendar = calendar();
        let sources = BoundSources {
            constraints: &constraints,
            plants: &plants,
            calendar: &calendar,
        };
        let key = OperationSynthesis::parse("QTUR_UHE").unwrap();
        let table = bound_table(&key, "QTUR", &sources).unwrap();
        assert_eq!(table[&(6, 1, 1)], Bounds { lower: 10.0, upper: 1500.0 });
        assert_eq!(table[&(6, 1, 2)], Bounds { lower: 0.0, upper: 1692.0 });
    }

    #[test]
    fn unbounded_keys_are_open_on_both_sides() {
        let key = OperationSynthesis::parse("GHID_UHE").unwrap();
        assert!(!is_bounded(&key));
        assert!(is_bounded(&OperationSynthesis::parse("QVER_UHE").unwrap()));
        assert!(!is_bounded(&OperationSynthesis::parse("QVER_SIN").unwrap()));
        assert!(Bounds::UNBOUNDED.contains(1e300, 0.0));
        assert!(!Bounds::NON_NEGATIVE.contains(-1.0, 1e-6));
    }
}
