//! Study calendar: block durations, stage spans and date columns.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::BTreeMap;
use synt_core::columns::*;
use synt_core::{SyntError, SyntResult};
use synt_io::frame::{f64_values, i64_values, require_columns, str_values, with_str};

/// Format of every exported timestamp.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn format_date(date: &NaiveDateTime) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(text: &str) -> SyntResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| SyntError::Other(format!("invalid timestamp '{text}': {e}")))
}

/// Midnight of the first `dt` record.
pub fn study_start(dt: &DataFrame) -> SyntResult<NaiveDateTime> {
    require_columns(dt, "dt", &["ano", "mes", "dia"])?;
    let years = i64_values(dt, "ano")?;
    let months = i64_values(dt, "mes")?;
    let days = i64_values(dt, "dia")?;
    let (year, month, day) = match (years.first(), months.first(), days.first()) {
        (Some(y), Some(m), Some(d)) => (*y, *m, *d),
        _ => return Err(SyntError::Lookup("dt has no records".into())),
    };
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| SyntError::Lookup(format!("invalid study start {year}-{month}-{day}")))
}

/// Block durations in hours of the lowest-coded submarket, plus block 0
/// holding each stage total.
pub fn blocks_durations(dp: &DataFrame) -> SyntResult<DataFrame> {
    require_columns(dp, "dp", &[ESTAGIO, CODIGO_SUBMERCADO, PATAMAR, DURACAO])?;
    let stages = i64_values(dp, ESTAGIO)?;
    let submarkets = i64_values(dp, CODIGO_SUBMERCADO)?;
    let blocks = i64_values(dp, PATAMAR)?;
    let hours = f64_values(dp, DURACAO)?;

    let Some(reference) = submarkets.iter().copied().min() else {
        return Err(SyntError::Lookup("dp has no records".into()));
    };
    let mut durations: BTreeMap<(i64, i64), f64> = BTreeMap::new();
    for row in 0..stages.len() {
        if submarkets[row] != reference || blocks[row] == 0 {
            continue;
        }
        durations.entry((stages[row], blocks[row])).or_insert(hours[row]);
    }
    let mut totals: BTreeMap<i64, f64> = BTreeMap::new();
    for ((stage, _), h) in &durations {
        *totals.entry(*stage).or_default() += h;
    }
    for (stage, total) in totals {
        durations.insert((stage, 0), total);
    }

    let (keys, hours): (Vec<(i64, i64)>, Vec<f64>) = durations.into_iter().unzip();
    let (stages, blocks): (Vec<i64>, Vec<i64>) = keys.into_iter().unzip();
    Ok(DataFrame::new(vec![
        Series::new(ESTAGIO, stages),
        Series::new(PATAMAR, blocks),
        Series::new(DURACAO, hours),
    ])?)
}

/// Stage spans laid end to end from `start`.
pub fn stages_durations(blocks: &DataFrame, start: NaiveDateTime) -> SyntResult<DataFrame> {
    let stages = i64_values(blocks, ESTAGIO)?;
    let block_ids = i64_values(blocks, PATAMAR)?;
    let hours = f64_values(blocks, DURACAO)?;

    let mut codes = Vec::new();
    let mut starts = Vec::new();
    let mut ends = Vec::new();
    let mut durations = Vec::new();
    let mut cursor = start;
    for row in 0..stages.len() {
        if block_ids[row] != 0 {
            continue;
        }
        let end = cursor + hours_to_duration(hours[row]);
        codes.push(stages[row]);
        starts.push(format_date(&cursor));
        ends.push(format_date(&end));
        durations.push(hours[row]);
        cursor = end;
    }
    Ok(DataFrame::new(vec![
        Series::new(ESTAGIO, codes),
        Series::new(DATA_INICIO, starts),
        Series::new(DATA_FIM, ends),
        Series::new(DURACAO_ESTAGIO, durations),
    ])?)
}

fn hours_to_duration(hours: f64) -> Duration {
    Duration::seconds((hours * 3600.0).round() as i64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageSpan {
    pub stage: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub hours: f64,
}

/// Typed view over the block and stage duration tables.
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    stages: BTreeMap<i64, StageSpan>,
    blocks: BTreeMap<(i64, i64), f64>,
}

impl Calendar {
    pub fn from_frames(blocks: &DataFrame, stages: &DataFrame) -> SyntResult<Self> {
        let mut calendar = Calendar::default();
        let block_stages = i64_values(blocks, ESTAGIO)?;
        let block_ids = i64_values(blocks, PATAMAR)?;
        let block_hours = f64_values(blocks, DURACAO)?;
        for row in 0..block_stages.len() {
            calendar
                .blocks
                .insert((block_stages[row], block_ids[row]), block_hours[row]);
        }

        let codes = i64_values(stages, ESTAGIO)?;
        let starts = str_values(stages, DATA_INICIO)?;
        let ends = str_values(stages, DATA_FIM)?;
        let hours = f64_values(stages, DURACAO_ESTAGIO)?;
        for row in 0..codes.len() {
            calendar.stages.insert(
                codes[row],
                StageSpan {
                    stage: codes[row],
                    start: parse_date(&starts[row])?,
                    end: parse_date(&ends[row])?,
                    hours: hours[row],
                },
            );
        }
        Ok(calendar)
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn stage_codes(&self) -> Vec<i64> {
        self.stages.keys().copied().collect()
    }

    pub fn stage(&self, stage: i64) -> SyntResult<&StageSpan> {
        self.stages
            .get(&stage)
            .ok_or_else(|| SyntError::Lookup(format!("stage {stage} is outside the study")))
    }

    /// Span of `stage`, continuing past the last stage with its duration.
    ///
    /// Next-month reports carry stages the decision deck does not list.
    pub fn extended_stage(&self, stage: i64) -> SyntResult<StageSpan> {
        if let Some(span) = self.stages.get(&stage) {
            return Ok(span.clone());
        }
        let Some((&last, span)) = self.stages.iter().next_back() else {
            return Err(SyntError::Lookup("study has no stages".into()));
        };
        if stage < last {
            return Err(SyntError::Lookup(format!("stage {stage} is outside the study")));
        }
        let step = hours_to_duration(span.hours);
        let offset = (stage - last) as i32;
        Ok(StageSpan {
            stage,
            start: span.start + step * offset,
            end: span.end + step * offset,
            hours: span.hours,
        })
    }

    /// Duration in hours of `block` in `stage`; block 0 is the whole stage.
    pub fn block_hours(&self, stage: i64, block: i64) -> SyntResult<f64> {
        self.blocks.get(&(stage, block)).copied().ok_or_else(|| {
            SyntError::Lookup(format!("no duration for stage {stage} block {block}"))
        })
    }

    /// Real blocks of `stage`, in order, without block 0.
    pub fn blocks(&self, stage: i64) -> Vec<i64> {
        self.blocks
            .range((stage, 1)..=(stage, i64::MAX))
            .map(|((_, block), _)| *block)
            .collect()
    }
}

/// Adds `data_inicio` / `data_fim` from each row's stage.
pub fn add_dates(df: &DataFrame, calendar: &Calendar) -> SyntResult<DataFrame> {
    let stages = i64_values(df, ESTAGIO)?;
    let mut starts = Vec::with_capacity(stages.len());
    let mut ends = Vec::with_capacity(stages.len());
    for stage in stages {
        let span = calendar.extended_stage(stage)?;
        starts.push(format_date(&span.start));
        ends.push(format_date(&span.end));
    }
    let mut out = df.clone();
    with_str(&mut out, DATA_INICIO, starts)?;
    with_str(&mut out, DATA_FIM, ends)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dp() -> DataFrame {
        df![
            ESTAGIO => &[1i64, 1, 1, 1, 2, 2],
            CODIGO_SUBMERCADO => &[2i64, 2, 1, 1, 1, 1],
            PATAMAR => &[1i64, 2, 1, 2, 1, 2],
            DURACAO => &[10.0f64, 10.0, 48.0, 120.0, 100.0, 68.0]
        ]
        .unwrap()
    }

    #[test]
    fn blocks_use_lowest_submarket_and_total_in_block_zero() {
        let blocks = blocks_durations(&dp()).unwrap();
        assert_eq!(i64_values(&blocks, ESTAGIO).unwrap(), vec![1, 1, 1, 2, 2, 2]);
        assert_eq!(i64_values(&blocks, PATAMAR).unwrap(), vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(
            f64_values(&blocks, DURACAO).unwrap(),
            vec![168.0, 48.0, 120.0, 168.0, 100.0, 68.0]
        );
    }

    #[test]
    fn stages_are_contiguous() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let blocks = blocks_durations(&dp()).unwrap();
        let stages = stages_durations(&blocks, start).unwrap();
        assert_eq!(
            str_values(&stages, DATA_INICIO).unwrap(),
            vec!["2023-01-07T00:00:00", "2023-01-14T00:00:00"]
        );
        assert_eq!(
            str_values(&stages, DATA_FIM).unwrap(),
            vec!["2023-01-14T00:00:00", "2023-01-21T00:00:00"]
        );

        let calendar = Calendar::from_frames(&blocks, &stages).unwrap();
        assert_eq!(calendar.num_stages(), 2);
        assert_eq!(calendar.blocks(2), vec![1, 2]);
        assert_eq!(calendar.block_hours(2, 0).unwrap(), 168.0);
        let beyond = calendar.extended_stage(4).unwrap();
        assert_eq!(format_date(&beyond.start), "2023-01-28T00:00:00");
        assert!(calendar.stage(4).is_err());
    }

    #[test]
    fn study_start_is_midnight() {
        let dt = df!["ano" => &[2023i64], "mes" => &[1i64], "dia" => &[7i64]].unwrap();
        assert_eq!(format_date(&study_start(&dt).unwrap()), "2023-01-07T00:00:00");
        let bad = df!["ano" => &[2023i64], "mes" => &[13i64], "dia" => &[7i64]].unwrap();
        assert!(study_start(&bad).is_err());
    }
}
