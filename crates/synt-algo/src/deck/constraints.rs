//! Hydraulic flow constraints of the decision deck (`hq`, `lq`, `cq`).

use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use synt_core::columns::*;
use synt_core::SyntResult;
use synt_io::frame::{f64_values, i64_values, optional_f64_values, require_columns, str_values};
use tracing::debug;

/// Raw limits of one constraint in one (stage, block).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// A flow constraint acting on a single plant variable.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConstraint {
    pub code: i64,
    pub first_stage: i64,
    pub last_stage: i64,
    pub plant: i64,
    /// Variable tag of the `cq` term (`QVER`, `QTUR`, `QDEF`, ...).
    pub kind: String,
    pub coefficient: f64,
    /// Limits per (stage, block), every stage of the validity range filled.
    pub limits: BTreeMap<(i64, i64), Limits>,
}

/// Builds the single-term constraints; constraints combining several plants
/// or variables are skipped.
pub fn flow_constraints(
    hq: &DataFrame,
    lq: &DataFrame,
    cq: &DataFrame,
) -> SyntResult<Vec<FlowConstraint>> {
    require_columns(hq, "hq", &[CODIGO_RESTRICAO, ESTAGIO_INICIAL, ESTAGIO_FINAL])?;
    require_columns(
        lq,
        "lq",
        &[CODIGO_RESTRICAO, ESTAGIO, PATAMAR, LIMITE_INFERIOR, LIMITE_SUPERIOR],
    )?;
    require_columns(
        cq,
        "cq",
        &[CODIGO_RESTRICAO, ESTAGIO, CODIGO_USINA, COEFICIENTE, TIPO],
    )?;

    let mut terms: BTreeMap<i64, (BTreeSet<(i64, String)>, f64)> = BTreeMap::new();
    let cq_codes = i64_values(cq, CODIGO_RESTRICAO)?;
    let cq_plants = i64_values(cq, CODIGO_USINA)?;
    let coefficients = f64_values(cq, COEFICIENTE)?;
    let kinds = str_values(cq, TIPO)?;
    for row in 0..cq_codes.len() {
        let entry = terms
            .entry(cq_codes[row])
            .or_insert_with(|| (BTreeSet::new(), coefficients[row]));
        entry.0.insert((cq_plants[row], kinds[row].to_uppercase()));
    }

    let mut limits: BTreeMap<i64, BTreeMap<(i64, i64), Limits>> = BTreeMap::new();
    let lq_codes = i64_values(lq, CODIGO_RESTRICAO)?;
    let lq_stages = i64_values(lq, ESTAGIO)?;
    let lq_blocks = i64_values(lq, PATAMAR)?;
    let lowers = optional_f64_values(lq, LIMITE_INFERIOR)?;
    let uppers = optional_f64_values(lq, LIMITE_SUPERIOR)?;
    for row in 0..lq_codes.len() {
        limits.entry(lq_codes[row]).or_default().insert(
            (lq_stages[row], lq_blocks[row]),
            Limits {
                lower: lowers[row],
                upper: uppers[row],
            },
        );
    }

    let hq_codes = i64_values(hq, CODIGO_RESTRICAO)?;
    let firsts = i64_values(hq, ESTAGIO_INICIAL)?;
    let lasts = i64_values(hq, ESTAGIO_FINAL)?;
    let mut constraints = Vec::new();
    for row in 0..hq_codes.len() {
        let code = hq_codes[row];
        let Some((plants, coefficient)) = terms.get(&code) else {
            debug!(code, "flow constraint without terms");
            continue;
        };
        if plants.len() != 1 {
            debug!(code, terms = plants.len(), "skipping multi-term flow constraint");
            continue;
        }
        let Some((plant, kind)) = plants.iter().next().cloned() else {
            continue;
        };
        let raw = limits.remove(&code).unwrap_or_default();
        constraints.push(FlowConstraint {
            code,
            first_stage: firsts[row],
            last_stage: lasts[row],
            plant,
            kind,
            coefficient: *coefficient,
            limits: carry_forward(&raw, firsts[row], lasts[row]),
        });
    }
    Ok(constraints)
}

/// Fills stages of `first..=last` without limits from the nearest earlier
/// stage that has them.
fn carry_forward(
    raw: &BTreeMap<(i64, i64), Limits>,
    first: i64,
    last: i64,
) -> BTreeMap<(i64, i64), Limits> {
    let mut filled = BTreeMap::new();
    let mut previous: Vec<(i64, Limits)> = Vec::new();
    for stage in first..=last {
        let current: Vec<(i64, Limits)> = raw
            .range((stage, i64::MIN)..=(stage, i64::MAX))
            .map(|((_, block), limits)| (*block, *limits))
            .collect();
        if !current.is_empty() {
            previous = current;
        }
        for (block, limits) in &previous {
            filled.insert((stage, *block), *limits);
        }
    }
    filled
}
