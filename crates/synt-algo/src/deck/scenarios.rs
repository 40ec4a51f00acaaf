//! Scenario axis normalization.
//!
//! Operational reports record deterministic stages once and the stochastic
//! stage once per scenario. Every later step wants one row per scenario on
//! every stage, so deterministic rows are tiled across the scenario list.

use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use synt_core::columns::{CENARIO, ESTAGIO, PATAMAR};
use synt_core::{SchemaVersion, SyntError, SyntResult};
use synt_io::frame::{has_column, i64_values, take_rows, with_i64};
use tracing::debug;

/// Single entry point for version-gated scenario handling.
///
/// Files at or below the legacy schema number scenarios as tree nodes and
/// are renumbered before the grid is expanded.
pub fn normalize_scenarios(
    df: &DataFrame,
    version: Option<&SchemaVersion>,
    num_stages: usize,
    keys: &[&str],
) -> SyntResult<DataFrame> {
    let df = match version {
        Some(version) if version.uses_legacy_node_numbering() => {
            debug!(%version, "renumbering legacy scenario nodes");
            renumber_legacy_nodes(df, num_stages)?
        }
        _ => df.clone(),
    };
    expand_scenarios(&df, keys)
}

/// Forces non-terminal stages to scenario 1 and shifts the terminal stage
/// down by `num_stages - 1`.
pub fn renumber_legacy_nodes(df: &DataFrame, num_stages: usize) -> SyntResult<DataFrame> {
    let terminal = num_stages as i64;
    let stages = i64_values(df, ESTAGIO)?;
    let scenarios = i64_values(df, CENARIO)?;
    let renumbered = stages
        .iter()
        .zip(&scenarios)
        .map(|(&stage, &scenario)| {
            if stage < terminal {
                1
            } else {
                scenario - (terminal - 1)
            }
        })
        .collect();
    let mut out = df.clone();
    with_i64(&mut out, CENARIO, renumbered)?;
    Ok(out)
}

/// Tiles deterministic stages across the scenarios of the stochastic one.
///
/// `keys` identify one record within a stage and scenario (entity codes);
/// `patamar` is added when present. Deterministic rows repeated under the
/// same key keep their first occurrence. More than one stochastic stage is
/// an [`SyntError::UnsupportedScenarioLayout`].
pub fn expand_scenarios(df: &DataFrame, keys: &[&str]) -> SyntResult<DataFrame> {
    let stages = i64_values(df, ESTAGIO)?;
    let scenarios = i64_values(df, CENARIO)?;

    let mut per_stage: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for (stage, scenario) in stages.iter().zip(&scenarios) {
        per_stage.entry(*stage).or_default().insert(*scenario);
    }
    let stochastic: Vec<i64> = per_stage
        .iter()
        .filter(|(_, set)| set.len() > 1)
        .map(|(stage, _)| *stage)
        .collect();
    let scenario_list: Vec<i64> = match stochastic.as_slice() {
        [] => return Ok(df.clone()),
        [stage] => per_stage[stage].iter().copied().collect(),
        _ => return Err(SyntError::UnsupportedScenarioLayout(stochastic)),
    };
    let stochastic_stage = stochastic[0];

    let mut key_columns = keys
        .iter()
        .map(|key| i64_values(df, key))
        .collect::<SyntResult<Vec<_>>>()?;
    if has_column(df, PATAMAR) {
        key_columns.push(i64_values(df, PATAMAR)?);
    }
    let row_key = |row: usize| -> Vec<i64> { key_columns.iter().map(|c| c[row]).collect() };

    let mut indices = Vec::with_capacity(df.height());
    let mut new_scenarios = Vec::with_capacity(df.height());
    for &stage in per_stage.keys() {
        let rows: Vec<usize> = (0..stages.len()).filter(|&r| stages[r] == stage).collect();
        if stage == stochastic_stage {
            for row in rows {
                indices.push(row);
                new_scenarios.push(scenarios[row]);
            }
            continue;
        }
        let mut seen = HashSet::new();
        let unique: Vec<usize> = rows.into_iter().filter(|&r| seen.insert(row_key(r))).collect();
        for &scenario in &scenario_list {
            for &row in &unique {
                indices.push(row);
                new_scenarios.push(scenario);
            }
        }
    }

    let mut out = take_rows(df, &indices)?;
    with_i64(&mut out, CENARIO, new_scenarios)?;
    Ok(out)
}
