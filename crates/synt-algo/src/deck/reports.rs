//! Narrative reports: costs, convergence, timing and the violation log.

use polars::prelude::*;
use synt_core::columns::*;
use synt_core::{SyntResult, FINAL_SIMULATION_ITERATION};
use std::collections::BTreeSet;
use synt_io::frame::{cast_column, i64_values, require_columns, sort_by, with_i64};

pub const CUSTOS: &str = "custos";
pub const CUSTO_PRESENTE: &str = "custo_presente";
pub const CUSTO_FUTURO: &str = "custo_futuro";

const COST_COLUMNS: [&str; 4] = [ESTAGIO, CENARIO, CUSTO_PRESENTE, CUSTO_FUTURO];

/// The cost columns of a report's `custos` table, with their types fixed.
pub fn cost_table(df: &DataFrame, table: &str) -> SyntResult<DataFrame> {
    require_columns(df, table, &COST_COLUMNS)?;
    Ok(df
        .clone()
        .lazy()
        .select([
            col(ESTAGIO).cast(DataType::Int64),
            col(CENARIO).cast(DataType::Int64),
            col(CUSTO_PRESENTE).cast(DataType::Float64),
            col(CUSTO_FUTURO).cast(DataType::Float64),
        ])
        .collect()?)
}

/// Appends the next-month costs after the current ones.
///
/// Both tables come from [`cost_table`] and are already on their own
/// scenario grids. The next month's stages continue after the last stage of
/// `current`. A next month with a single scenario is repeated under every
/// scenario of `current`.
pub fn stitch_costs(current: &DataFrame, next: Option<&DataFrame>) -> SyntResult<DataFrame> {
    let Some(next) = next else {
        return Ok(current.clone());
    };
    let offset = i64_values(current, ESTAGIO)?.into_iter().max().unwrap_or(0);
    let next = next
        .clone()
        .lazy()
        .with_column(col(ESTAGIO) + lit(offset))
        .collect()?;

    let scenarios: BTreeSet<i64> = i64_values(current, CENARIO)?.into_iter().collect();
    let next_scenarios: BTreeSet<i64> = i64_values(&next, CENARIO)?.into_iter().collect();
    let mut stitched = current.clone();
    if next_scenarios.len() == 1 && scenarios.len() > 1 {
        for &scenario in &scenarios {
            let mut tiled = next.clone();
            with_i64(&mut tiled, CENARIO, vec![scenario; next.height()])?;
            stitched.vstack_mut(&tiled)?;
        }
    } else {
        stitched.vstack_mut(&next)?;
    }
    sort_by(&stitched, &[ESTAGIO, CENARIO])
}

const VIOLATION_COLUMNS: [&str; 6] = [ITERACAO, ESTAGIO, CENARIO, RESTRICAO, VIOLACAO, UNIDADE];

/// Mid-iteration violations followed by the final simulation ones, the
/// latter tagged with [`FINAL_SIMULATION_ITERATION`].
pub fn violation_log(iterations: &DataFrame, final_simulation: &DataFrame) -> SyntResult<DataFrame> {
    require_columns(iterations, "iteracoes", &VIOLATION_COLUMNS)?;
    require_columns(
        final_simulation,
        "simulacao_final",
        &[ESTAGIO, CENARIO, RESTRICAO, VIOLACAO, UNIDADE],
    )?;
    let mut log = normalized_violations(iterations)?;
    let mut last = final_simulation.clone();
    with_i64(
        &mut last,
        ITERACAO,
        vec![FINAL_SIMULATION_ITERATION; final_simulation.height()],
    )?;
    log.vstack_mut(&normalized_violations(&last)?)?;
    Ok(log)
}

fn normalized_violations(df: &DataFrame) -> SyntResult<DataFrame> {
    let mut out = df.select(VIOLATION_COLUMNS)?;
    for column in [ITERACAO, ESTAGIO, CENARIO] {
        cast_column(&mut out, column, &DataType::Int64)?;
    }
    cast_column(&mut out, RESTRICAO, &DataType::Utf8)?;
    cast_column(&mut out, VIOLACAO, &DataType::Float64)?;
    cast_column(&mut out, UNIDADE, &DataType::Utf8)?;
    Ok(out)
}
