//! Typed rows of one synthesis result.

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use synt_core::columns::*;
use synt_core::{SpatialResolution, SyntError, SyntResult};
use synt_io::frame::{f64_values, i64_values, sort_by, str_values};

use crate::deck::calendar::{format_date, parse_date};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRow {
    /// Codes of [`SpatialResolution::entity_columns`], in that order.
    pub entity: Vec<i64>,
    pub stage: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub scenario: i64,
    pub block: i64,
    pub block_hours: f64,
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisFrame {
    pub resolution: SpatialResolution,
    pub rows: Vec<SynthesisRow>,
}

impl SynthesisFrame {
    pub fn new(resolution: SpatialResolution, rows: Vec<SynthesisRow>) -> Self {
        SynthesisFrame { resolution, rows }
    }

    /// Reads `value_column` of a deck dataset, one row per record. Bounds
    /// start unlimited.
    pub fn from_dataframe(
        resolution: SpatialResolution,
        df: &DataFrame,
        value_column: &str,
    ) -> SyntResult<Self> {
        let entity_columns = resolution
            .entity_columns()
            .iter()
            .map(|column| i64_values(df, column))
            .collect::<SyntResult<Vec<_>>>()?;
        let stages = i64_values(df, ESTAGIO)?;
        let starts = str_values(df, DATA_INICIO)?;
        let ends = str_values(df, DATA_FIM)?;
        let scenarios = i64_values(df, CENARIO)?;
        let blocks = i64_values(df, PATAMAR)?;
        let hours = f64_values(df, DURACAO)?;
        let values = f64_values(df, value_column)?;

        let mut rows = Vec::with_capacity(stages.len());
        for row in 0..stages.len() {
            rows.push(SynthesisRow {
                entity: entity_columns.iter().map(|c| c[row]).collect(),
                stage: stages[row],
                start: parse_date(&starts[row])?,
                end: parse_date(&ends[row])?,
                scenario: scenarios[row],
                block: blocks[row],
                block_hours: hours[row],
                value: values[row],
                lower_bound: f64::NEG_INFINITY,
                upper_bound: f64::INFINITY,
            });
        }
        Ok(SynthesisFrame::new(resolution, rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Canonical order: entity, stage, scenario, block.
    pub fn sort(&mut self) {
        self.rows.sort_by(|a, b| {
            (&a.entity, a.stage, a.scenario, a.block).cmp(&(&b.entity, b.stage, b.scenario, b.block))
        });
    }

    /// Sums rows into the coarser `target` resolution.
    ///
    /// The target's entity columns must be a suffix of this frame's, so the
    /// coarser codes are already on every row.
    pub fn regroup(&self, target: SpatialResolution) -> SyntResult<SynthesisFrame> {
        if !self.resolution.entity_columns().ends_with(target.entity_columns()) {
            return Err(SyntError::Other(format!(
                "{} rows cannot be grouped into {}",
                self.resolution, target
            )));
        }
        summed(target, self.to_dataframe()?)
    }

    /// Row-wise sum of frames at the same resolution.
    pub fn sum(frames: &[SynthesisFrame]) -> SyntResult<SynthesisFrame> {
        let Some(first) = frames.first() else {
            return Err(SyntError::Other("nothing to sum".into()));
        };
        let mut stacked = first.to_dataframe()?;
        for frame in &frames[1..] {
            if frame.resolution != first.resolution {
                return Err(SyntError::Other(format!(
                    "cannot sum {} rows with {} rows",
                    frame.resolution, first.resolution
                )));
            }
            stacked.vstack_mut(&frame.to_dataframe()?)?;
        }
        summed(first.resolution, stacked)
    }

    pub fn to_dataframe(&self) -> SyntResult<DataFrame> {
        let mut columns: Vec<Series> = self
            .resolution
            .entity_columns()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                Series::new(name, self.rows.iter().map(|r| r.entity[i]).collect::<Vec<_>>())
            })
            .collect();
        columns.extend([
            Series::new(ESTAGIO, self.rows.iter().map(|r| r.stage).collect::<Vec<_>>()),
            Series::new(
                DATA_INICIO,
                self.rows
                    .iter()
                    .map(|r| format_date(&r.start))
                    .collect::<Vec<_>>(),
            ),
            Series::new(
                DATA_FIM,
                self.rows
                    .iter()
                    .map(|r| format_date(&r.end))
                    .collect::<Vec<_>>(),
            ),
            Series::new(CENARIO, self.rows.iter().map(|r| r.scenario).collect::<Vec<_>>()),
            Series::new(PATAMAR, self.rows.iter().map(|r| r.block).collect::<Vec<_>>()),
            Series::new(
                DURACAO_PATAMAR,
                self.rows.iter().map(|r| r.block_hours).collect::<Vec<_>>(),
            ),
            Series::new(VALOR, self.rows.iter().map(|r| r.value).collect::<Vec<_>>()),
            Series::new(
                LIMITE_INFERIOR,
                self.rows.iter().map(|r| r.lower_bound).collect::<Vec<_>>(),
            ),
            Series::new(
                LIMITE_SUPERIOR,
                self.rows.iter().map(|r| r.upper_bound).collect::<Vec<_>>(),
            ),
        ]);
        Ok(DataFrame::new(columns)?)
    }
}

/// Sums `VALOR` of exported rows per `resolution` key, in canonical order.
/// Bounds are dropped.
fn summed(resolution: SpatialResolution, df: DataFrame) -> SyntResult<SynthesisFrame> {
    let mut keys: Vec<&str> = resolution.entity_columns().to_vec();
    keys.extend([ESTAGIO, CENARIO, PATAMAR]);
    let grouped = df
        .lazy()
        .group_by(keys.iter().map(|key| col(key)).collect::<Vec<_>>())
        .agg([
            col(DATA_INICIO).first(),
            col(DATA_FIM).first(),
            col(DURACAO_PATAMAR).first().alias(DURACAO),
            col(VALOR).sum(),
        ])
        .collect()?;
    let sorted = sort_by(&grouped, &keys)?;
    SynthesisFrame::from_dataframe(resolution, &sorted, VALOR)
}

/// Sorted unique values of each axis of a resolved synthesis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisIndex {
    pub entities: Vec<Vec<i64>>,
    pub stages: Vec<i64>,
    pub scenarios: Vec<i64>,
    pub blocks: Vec<i64>,
}

impl AxisIndex {
    pub fn of(frame: &SynthesisFrame) -> Self {
        let mut entities = BTreeSet::new();
        let mut stages = BTreeSet::new();
        let mut scenarios = BTreeSet::new();
        let mut blocks = BTreeSet::new();
        for row in &frame.rows {
            entities.insert(row.entity.clone());
            stages.insert(row.stage);
            scenarios.insert(row.scenario);
            blocks.insert(row.block);
        }
        AxisIndex {
            entities: entities.into_iter().collect(),
            stages: stages.into_iter().collect(),
            scenarios: scenarios.into_iter().collect(),
            blocks: blocks.into_iter().collect(),
        }
    }

    /// Position of (entity, stage, block) in export order.
    pub fn position(&self, entity: &[i64], stage: i64, block: i64) -> (usize, usize, usize) {
        let find = |values: &[i64], v: i64| values.binary_search(&v).unwrap_or(values.len());
        let entity = self
            .entities
            .binary_search_by(|e| e.as_slice().cmp(entity))
            .unwrap_or(self.entities.len());
        (entity, find(&self.stages, stage), find(&self.blocks, block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entity: Vec<i64>, stage: i64, scenario: i64, block: i64, value: f64) -> SynthesisRow {
        let start = parse_date("2023-01-07T00:00:00").unwrap();
        SynthesisRow {
            entity,
            stage,
            start,
            end: start,
            scenario,
            block,
            block_hours: 1.0,
            value,
            lower_bound: 0.0,
            upper_bound: 1.0,
        }
    }

    #[test]
    fn regrouping_sums_matching_rows() {
        let frame = SynthesisFrame::new(
            SpatialResolution::Uhe,
            vec![
                row(vec![6, 10, 1], 1, 1, 1, 2.0),
                row(vec![7, 10, 1], 1, 1, 1, 3.0),
                row(vec![20, 11, 2], 1, 1, 1, 5.0),
                row(vec![6, 10, 1], 1, 2, 1, 7.0),
            ],
        );
        let ree = frame.regroup(SpatialResolution::Ree).unwrap();
        assert_eq!(ree.len(), 3);
        assert_eq!(ree.rows[0].entity, vec![10, 1]);
        assert_eq!(ree.rows[0].value, 5.0);
        assert_eq!(ree.rows[0].upper_bound, f64::INFINITY);

        let sin = frame.regroup(SpatialResolution::Sin).unwrap();
        assert_eq!(sin.rows.iter().map(|r| r.value).collect::<Vec<_>>(), vec![10.0, 7.0]);
        assert!(sin.rows[0].entity.is_empty());

        assert!(ree.regroup(SpatialResolution::Ute).is_err());
    }

    #[test]
    fn frames_sum_by_key() {
        let a = SynthesisFrame::new(SpatialResolution::Uhe, vec![row(vec![6, 10, 1], 1, 1, 1, 2.0)]);
        let b = SynthesisFrame::new(
            SpatialResolution::Uhe,
            vec![
                row(vec![6, 10, 1], 1, 1, 1, 0.5),
                row(vec![6, 10, 1], 1, 1, 2, 1.0),
            ],
        );
        let total = SynthesisFrame::sum(&[a, b]).unwrap();
        assert_eq!(total.len(), 2);
        assert_eq!(total.rows[0].value, 2.5);
    }

    #[test]
    fn export_columns_follow_the_resolution() {
        let frame = SynthesisFrame::new(SpatialResolution::Ree, vec![row(vec![10, 1], 1, 1, 0, 4.0)]);
        let df = frame.to_dataframe().unwrap();
        let names: Vec<&str> = df.get_column_names();
        assert_eq!(
            names,
            vec![
                CODIGO_REE,
                CODIGO_SUBMERCADO,
                ESTAGIO,
                DATA_INICIO,
                DATA_FIM,
                CENARIO,
                PATAMAR,
                DURACAO_PATAMAR,
                VALOR,
                LIMITE_INFERIOR,
                LIMITE_SUPERIOR
            ]
        );
    }

    #[test]
    fn index_positions_follow_sorted_axes() {
        let mut frame = SynthesisFrame::new(
            SpatialResolution::Sbm,
            vec![row(vec![2], 2, 1, 1, 0.0), row(vec![1], 1, 1, 0, 0.0)],
        );
        frame.sort();
        assert_eq!(frame.rows[0].entity, vec![1]);
        let index = AxisIndex::of(&frame);
        assert_eq!(index.stages, vec![1, 2]);
        assert_eq!(index.position(&[2], 2, 1), (1, 1, 1));
    }
}
