//! Scenario-ensemble statistics of a synthesis.

use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use synt_core::columns::*;
use synt_core::{OperationSynthesis, SyntResult};

use crate::deck::calendar::format_date;
use crate::operation::frame::{AxisIndex, SynthesisFrame, SynthesisRow};

/// Labels written to the `cenario` column of statistics rows, in order.
pub const STATISTICS: [&str; 9] = ["min", "p10", "p25", "p50", "p75", "p90", "max", "mean", "std"];

const QUANTILES: [(&str, f64); 5] = [
    ("p10", 0.10),
    ("p25", 0.25),
    ("p50", 0.50),
    ("p75", 0.75),
    ("p90", 0.90),
];

/// Quantile of sorted `values` with linear interpolation between ranks.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let position = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let below = position.floor() as usize;
            let above = position.ceil() as usize;
            let fraction = position - below as f64;
            sorted[below] + (sorted[above] - sorted[below]) * fraction
        }
    }
}

pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return values.iter().sum::<f64>() / values.len() as f64;
    }
    values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total
}

/// Weighted standard deviation with the n/(n-1) sample correction; 0 for a
/// single scenario.
pub fn weighted_std(values: &[f64], weights: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    let mean = weighted_mean(values, weights);
    let total: f64 = weights.iter().sum();
    let variance = if total > 0.0 {
        values
            .iter()
            .zip(weights)
            .map(|(v, w)| w * (v - mean).powi(2))
            .sum::<f64>()
            / total
    } else {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64
    };
    (variance * n as f64 / (n - 1) as f64).sqrt()
}

/// Values in [`STATISTICS`] order.
pub fn summarize(values: &[f64], weights: &[f64]) -> [f64; 9] {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut out = [0.0; 9];
    out[0] = sorted.first().copied().unwrap_or(f64::NAN);
    for (i, (_, q)) in QUANTILES.iter().enumerate() {
        out[i + 1] = quantile(&sorted, *q);
    }
    out[6] = sorted.last().copied().unwrap_or(f64::NAN);
    out[7] = weighted_mean(values, weights);
    out[8] = weighted_std(values, weights);
    out
}

/// Scenario weights per (stage, scenario).
#[derive(Debug, Clone, Default)]
pub struct ScenarioWeights {
    weights: Option<HashMap<(i64, i64), f64>>,
}

impl ScenarioWeights {
    pub fn new(weights: HashMap<(i64, i64), f64>) -> Self {
        ScenarioWeights {
            weights: Some(weights),
        }
    }

    /// Every scenario weighs the same.
    pub fn uniform() -> Self {
        ScenarioWeights { weights: None }
    }

    pub fn is_uniform(&self) -> bool {
        self.weights.is_none()
    }

    /// Weights of `scenarios` in `stage`; uniform when any is unknown.
    pub fn of(&self, stage: i64, scenarios: &[i64]) -> Vec<f64> {
        let uniform = || vec![1.0; scenarios.len()];
        let Some(weights) = &self.weights else {
            return uniform();
        };
        scenarios
            .iter()
            .map(|s| weights.get(&(stage, *s)).copied())
            .collect::<Option<Vec<_>>>()
            .unwrap_or_else(uniform)
    }
}

/// Statistics rows of one synthesis, ordered by `index`.
pub fn statistics_frame(
    synthesis: &OperationSynthesis,
    frame: &SynthesisFrame,
    index: &AxisIndex,
    weights: &ScenarioWeights,
) -> SyntResult<DataFrame> {
    let mut groups: BTreeMap<(usize, usize, usize), Vec<&SynthesisRow>> = BTreeMap::new();
    for row in &frame.rows {
        groups
            .entry(index.position(&row.entity, row.stage, row.block))
            .or_default()
            .push(row);
    }

    let entity_columns = synthesis.resolution.entity_columns();
    let mut entities: Vec<Vec<i64>> = vec![Vec::new(); entity_columns.len()];
    let mut stages = Vec::new();
    let mut starts = Vec::new();
    let mut ends = Vec::new();
    let mut blocks = Vec::new();
    let mut hours = Vec::new();
    let mut labels = Vec::new();
    let mut values = Vec::new();
    for rows in groups.values() {
        let first = rows[0];
        let scenarios: Vec<i64> = rows.iter().map(|r| r.scenario).collect();
        let samples: Vec<f64> = rows.iter().map(|r| r.value).collect();
        let summary = summarize(&samples, &weights.of(first.stage, &scenarios));
        for (label, value) in STATISTICS.iter().zip(summary) {
            for (column, code) in entities.iter_mut().zip(&first.entity) {
                column.push(*code);
            }
            stages.push(first.stage);
            starts.push(format_date(&first.start));
            ends.push(format_date(&first.end));
            blocks.push(first.block);
            hours.push(first.block_hours);
            labels.push(label.to_string());
            values.push(value);
        }
    }

    let mut columns = vec![Series::new(
        VARIAVEL,
        vec![synthesis.variable.code().to_string(); values.len()],
    )];
    for (name, codes) in entity_columns.iter().zip(entities) {
        columns.push(Series::new(name, codes));
    }
    columns.extend([
        Series::new(ESTAGIO, stages),
        Series::new(DATA_INICIO, starts),
        Series::new(DATA_FIM, ends),
        Series::new(PATAMAR, blocks),
        Series::new(DURACAO_PATAMAR, hours),
        Series::new(CENARIO, labels),
        Series::new(VALOR, values),
    ]);
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synt_io::frame::{f64_values, str_values};

    #[test]
    fn quantiles_interpolate_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&sorted, 0.5), 3.0);
        assert!((quantile(&sorted, 0.1) - 1.4).abs() < 1e-12);
        assert!((quantile(&sorted, 0.75) - 4.0).abs() < 1e-12);
        assert_eq!(quantile(&[7.0], 0.9), 7.0);
    }

    #[test]
    fn weighted_moments() {
        let values = [10.0, 20.0];
        let weights = [0.25, 0.75];
        assert_eq!(weighted_mean(&values, &weights), 17.5);
        // biased variance 18.75, corrected by 2/1
        assert!((weighted_std(&values, &weights) - 37.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(weighted_std(&[3.0], &[1.0]), 0.0);
    }

    #[test]
    fn unknown_scenarios_fall_back_to_uniform() {
        let weights = ScenarioWeights::new(HashMap::from([((1, 1), 0.2), ((1, 2), 0.8)]));
        assert_eq!(weights.of(1, &[1, 2]), vec![0.2, 0.8]);
        assert_eq!(weights.of(1, &[1, 3]), vec![1.0, 1.0]);
        assert!(ScenarioWeights::uniform().is_uniform());
    }

    #[test]
    fn one_block_of_rows_per_group() {
        use crate::deck::calendar::parse_date;
        use synt_core::SpatialResolution;

        let start = parse_date("2023-01-07T00:00:00").unwrap();
        let make = |scenario: i64, value: f64| SynthesisRow {
            entity: vec![1],
            stage: 2,
            start,
            end: start,
            scenario,
            block: 0,
            block_hours: 168.0,
            value,
            lower_bound: f64::NEG_INFINITY,
            upper_bound: f64::INFINITY,
        };
        let frame = SynthesisFrame::new(
            SpatialResolution::Sbm,
            vec![make(1, 100.0), make(2, 200.0)],
        );
        let key = OperationSynthesis::parse("CMO_SBM").unwrap();
        let df = statistics_frame(
            &key,
            &frame,
            &AxisIndex::of(&frame),
            &ScenarioWeights::new(HashMap::from([((2, 1), 0.5), ((2, 2), 0.5)])),
        )
        .unwrap();
        assert_eq!(df.height(), STATISTICS.len());
        assert_eq!(str_values(&df, CENARIO).unwrap()[7], "mean");
        assert_eq!(f64_values(&df, VALOR).unwrap()[7], 150.0);
        assert_eq!(f64_values(&df, VALOR).unwrap()[0], 100.0);
        assert_eq!(str_values(&df, VARIAVEL).unwrap()[0], "CMO");
    }
}
