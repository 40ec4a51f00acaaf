//! Operation synthesis engine.
//!
//! Requested tokens become [`OperationSynthesis`] keys, are expanded with
//! their dependencies and resolved in dependency-first order. Each key goes
//! through the same steps:
//!
//! 1. run cache lookup
//! 2. the key's [`rules::Strategy`] (deck column, grouping, sum or
//!    percentage recomputation)
//! 3. canonical sort, axis index and bounds
//! 4. run cache store, for keys other keys depend on
//! 5. scenario statistics and export of the per-scenario table
//!
//! A failure in any step skips that key only. Statistics and metadata are
//! written once, after the last key.

pub mod cache;
pub mod frame;
pub mod rules;
pub mod statistics;

use anyhow::{Context, Result};
use once_cell::unsync::OnceCell;
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use synt_core::columns::{CENARIO, ESTAGIO, PROBABILIDADE, VARIAVEL};
use synt_core::dependencies::expand;
use synt_core::{unit, OperationSynthesis, SpatialResolution, SyntError, SyntResult};
use synt_io::frame::{f64_values, i64_values};
use synt_io::{Exporter, FileRepository};
use tracing::{debug, error, info, warn};

use crate::bounds::{attach_bounds, is_bounded, BoundSources};
use crate::deck::{Deck, HydroPlant};
use crate::synthesizer::{is_wildcard, merge_by_key, wildcard, SynthesisReport, Synthesizer};

pub use cache::SynthesisCache;
pub use frame::{AxisIndex, SynthesisFrame, SynthesisRow};
pub use rules::{strategy, supported_keys, Capacity, Source, Strategy};
pub use statistics::{statistics_frame, ScenarioWeights, STATISTICS};

/// Metadata of every synthesized key.
pub const METADADOS_OPERACAO: &str = "METADADOS_OPERACAO";
/// Prefix of the per-resolution statistics tables.
pub const ESTATISTICAS_OPERACAO: &str = "ESTATISTICAS_OPERACAO";
pub const CHAVE: &str = "chave";

pub fn statistics_name(resolution: SpatialResolution) -> String {
    format!("{ESTATISTICAS_OPERACAO}_{}", resolution.code())
}

/// Keys selected by `tokens`; every supported key when empty.
///
/// Unknown tokens are an error. Tokens that name a valid pair without a
/// rule are skipped with a warning.
pub fn parse_tokens(tokens: &[String]) -> SyntResult<Vec<OperationSynthesis>> {
    let supported = supported_keys();
    if tokens.is_empty() {
        return Ok(supported);
    }
    let mut selected = Vec::new();
    for token in tokens {
        let token = token.trim().to_uppercase();
        if is_wildcard(&token) {
            let pattern = wildcard(&token)?;
            let matches: Vec<_> = supported
                .iter()
                .filter(|s| pattern.is_match(&s.to_string()))
                .copied()
                .collect();
            if matches.is_empty() {
                warn!(pattern = %token, "pattern matches no supported synthesis");
            }
            selected.extend(matches);
            continue;
        }
        let synthesis = OperationSynthesis::parse(&token)
            .ok_or_else(|| SyntError::UnknownVariable(token.clone()))?;
        if supported.contains(&synthesis) {
            selected.push(synthesis);
        } else {
            warn!(%synthesis, "synthesis is not available for this model, skipping");
        }
    }
    let mut unique = Vec::with_capacity(selected.len());
    for synthesis in selected {
        if !unique.contains(&synthesis) {
            unique.push(synthesis);
        }
    }
    Ok(unique)
}

/// One metadata row per key, in the given order.
pub fn metadata_frame(keys: &[OperationSynthesis]) -> SyntResult<DataFrame> {
    let text = |f: fn(&OperationSynthesis) -> String| keys.iter().map(f).collect::<Vec<_>>();
    Ok(DataFrame::new(vec![
        Series::new(CHAVE, text(|s| s.to_string())),
        Series::new("nome_curto_variavel", text(|s| s.variable.short_name().to_string())),
        Series::new("nome_longo_variavel", text(|s| s.variable.long_name().to_string())),
        Series::new("nome_curto_agregacao", text(|s| s.resolution.code().to_string())),
        Series::new("nome_longo_agregacao", text(|s| s.resolution.long_name().to_string())),
        Series::new("unidade", text(|s| unit(s).as_str().to_string())),
        Series::new(
            "calculado",
            keys.iter()
                .map(|s| strategy(s).is_some_and(|rule| rule.is_calculated()))
                .collect::<Vec<_>>(),
        ),
        Series::new("limitar", keys.iter().map(is_bounded).collect::<Vec<_>>()),
    ])?)
}

/// Scenario weights from the deck's probability table.
fn load_weights<R: FileRepository>(deck: &mut Deck<R>) -> ScenarioWeights {
    let table = deck.probabilities().and_then(|df| {
        let stages = i64_values(&df, ESTAGIO)?;
        let scenarios = i64_values(&df, CENARIO)?;
        let weights = f64_values(&df, PROBABILIDADE)?;
        Ok(stages
            .into_iter()
            .zip(scenarios)
            .zip(weights)
            .collect::<HashMap<_, _>>())
    });
    match table {
        Ok(weights) => ScenarioWeights::new(weights),
        Err(e) => {
            warn!("scenario probabilities unavailable, statistics use uniform weights: {e}");
            ScenarioWeights::uniform()
        }
    }
}

/// Resolves operation syntheses over one deck.
///
/// The run cache, axis indices and statistics accumulator live as long as the
/// synthesizer; build a new one for every run.
pub struct OperationSynthesizer<'d, R: FileRepository> {
    deck: &'d mut Deck<R>,
    cache: SynthesisCache,
    indices: BTreeMap<OperationSynthesis, AxisIndex>,
    statistics: BTreeMap<SpatialResolution, Vec<(OperationSynthesis, DataFrame)>>,
    weights: OnceCell<ScenarioWeights>,
}

impl<'d, R: FileRepository> OperationSynthesizer<'d, R> {
    pub fn new(deck: &'d mut Deck<R>) -> Self {
        OperationSynthesizer {
            deck,
            cache: SynthesisCache::new(),
            indices: BTreeMap::new(),
            statistics: BTreeMap::new(),
            weights: OnceCell::new(),
        }
    }

    pub fn cache(&self) -> &SynthesisCache {
        &self.cache
    }

    /// Axis index recorded when `synthesis` was last resolved.
    pub fn index(&self, synthesis: &OperationSynthesis) -> Option<&AxisIndex> {
        self.indices.get(synthesis)
    }

    /// Resolves one key, pulling its dependencies through the run cache.
    pub fn resolve(&mut self, synthesis: OperationSynthesis) -> SyntResult<SynthesisFrame> {
        if let Some(frame) = self.cache.get(&synthesis) {
            debug!(%synthesis, "run cache hit");
            return Ok(frame);
        }
        let rule =
            strategy(&synthesis).ok_or_else(|| SyntError::UnknownVariable(synthesis.to_string()))?;
        let mut frame = self.compute(synthesis, rule)?;
        self.finish(synthesis, &mut frame)?;
        if self.cache.store(synthesis, &frame) {
            debug!(%synthesis, rows = frame.len(), "stored in run cache");
        }
        Ok(frame)
    }

    fn compute(&mut self, synthesis: OperationSynthesis, rule: Strategy) -> SyntResult<SynthesisFrame> {
        match rule {
            Strategy::Column { source, column } => {
                let df = self.source(source)?;
                SynthesisFrame::from_dataframe(synthesis.resolution, &df, column)
            }
            Strategy::Group { source } => self.resolve(source)?.regroup(synthesis.resolution),
            Strategy::Sum { parts } => {
                let frames = parts
                    .iter()
                    .map(|part| self.resolve(*part))
                    .collect::<SyntResult<Vec<_>>>()?;
                SynthesisFrame::sum(&frames)
            }
            Strategy::Percentage { absolute, capacity } => {
                self.percentage(synthesis.resolution, absolute, capacity)
            }
        }
    }

    fn source(&mut self, source: Source) -> SyntResult<DataFrame> {
        match source {
            Source::DecOperSist => self.deck.dec_oper_sist(),
            Source::DecOperRee => self.deck.dec_oper_ree(),
            Source::DecOperUsih => self.deck.dec_oper_usih(),
            Source::DecOperUsit => self.deck.dec_oper_usit(),
            Source::DecOperInterc => self.deck.dec_oper_interc(),
            Source::OperationCosts => self.deck.operation_costs(),
        }
    }

    /// 100 × numerator / capacity, both summed at `target` first.
    fn percentage(
        &mut self,
        target: SpatialResolution,
        absolute: OperationSynthesis,
        capacity: Capacity,
    ) -> SyntResult<SynthesisFrame> {
        let mut numerator = self.resolve(absolute)?;
        let mut denominator = numerator.clone();
        match capacity {
            Capacity::StorageEnergy => {
                let capacities = self.deck.storage_capacity_map()?;
                for row in &mut denominator.rows {
                    let submarket = row.entity.first().copied().unwrap_or_default();
                    row.value = capacities.get(&(submarket, row.stage)).copied().ok_or_else(|| {
                        SyntError::Lookup(format!(
                            "no storage capacity for submarket {submarket} in stage {}",
                            row.stage
                        ))
                    })?;
                }
            }
            Capacity::UsefulVolume => {
                let plants: HashMap<i64, HydroPlant> = self
                    .deck
                    .hydro_registry()?
                    .into_iter()
                    .map(|plant| (plant.code, plant))
                    .collect();
                for (num, den) in numerator.rows.iter_mut().zip(&mut denominator.rows) {
                    let code = num.entity.first().copied().unwrap_or_default();
                    let plant = plants.get(&code).ok_or_else(|| {
                        SyntError::Lookup(format!("hydro plant {code} is not registered"))
                    })?;
                    num.value -= plant.min_volume;
                    den.value = plant.useful_volume();
                }
            }
        }
        let numerator = numerator.regroup(target)?;
        let denominator = denominator.regroup(target)?;
        let rows = numerator
            .rows
            .into_iter()
            .zip(denominator.rows)
            .map(|(mut row, capacity)| {
                row.value = if capacity.value != 0.0 {
                    100.0 * row.value / capacity.value
                } else {
                    0.0
                };
                row
            })
            .collect();
        Ok(SynthesisFrame::new(target, rows))
    }

    fn finish(&mut self, synthesis: OperationSynthesis, frame: &mut SynthesisFrame) -> SyntResult<()> {
        frame.sort();
        self.indices.insert(synthesis, AxisIndex::of(frame));
        if !is_bounded(&synthesis) {
            return attach_bounds(&synthesis, frame, None);
        }
        let constraints = self.deck.flow_constraints()?;
        let plants = self.deck.hydro_registry()?;
        let calendar = self.deck.calendar()?;
        let sources = BoundSources {
            constraints: &constraints,
            plants: &plants,
            calendar: &calendar,
        };
        attach_bounds(&synthesis, frame, Some(&sources))
    }

    fn process(&mut self, synthesis: OperationSynthesis, exporter: &mut dyn Exporter) -> Result<()> {
        let frame = self.resolve(synthesis)?;
        let index = match self.indices.get(&synthesis) {
            Some(index) => index.clone(),
            None => AxisIndex::of(&frame),
        };
        let deck = &mut *self.deck;
        let weights = self.weights.get_or_init(|| load_weights(deck));
        let summary = statistics_frame(&synthesis, &frame, &index, weights)
            .with_context(|| format!("computing statistics of {synthesis}"))?;

        let mut df = frame.to_dataframe()?;
        exporter.write(&synthesis.to_string(), &mut df)?;
        self.statistics
            .entry(synthesis.resolution)
            .or_default()
            .push((synthesis, summary));
        Ok(())
    }

    /// Writes the accumulated statistics and the metadata of `succeeded`.
    fn flush(&mut self, succeeded: &[OperationSynthesis], exporter: &mut dyn Exporter) -> Result<()> {
        for (resolution, entries) in std::mem::take(&mut self.statistics) {
            let name = statistics_name(resolution);
            let replaced: Vec<String> = entries
                .iter()
                .map(|(synthesis, _)| synthesis.variable.code().to_string())
                .collect();
            let mut frames = entries.into_iter().map(|(_, df)| df);
            let Some(mut fresh) = frames.next() else {
                continue;
            };
            for df in frames {
                fresh.vstack_mut(&df)?;
            }
            let mut merged = merge_by_key(exporter.read(&name)?, fresh, VARIAVEL, &replaced)?;
            exporter
                .write(&name, &mut merged)
                .with_context(|| format!("writing {name}"))?;
        }

        if succeeded.is_empty() {
            return Ok(());
        }
        let replaced: Vec<String> = succeeded.iter().map(|s| s.to_string()).collect();
        let fresh = metadata_frame(succeeded)?;
        let mut merged = merge_by_key(exporter.read(METADADOS_OPERACAO)?, fresh, CHAVE, &replaced)?;
        exporter
            .write(METADADOS_OPERACAO, &mut merged)
            .context("writing operation metadata")?;
        Ok(())
    }
}

impl<'d, R: FileRepository> Synthesizer for OperationSynthesizer<'d, R> {
    fn name(&self) -> &'static str {
        "operacao"
    }

    fn synthesize(&mut self, tokens: &[String], exporter: &mut dyn Exporter) -> Result<SynthesisReport> {
        let requested = parse_tokens(tokens)?;
        let ordered = expand(&requested);
        info!(
            requested = requested.len(),
            total = ordered.len(),
            "starting operation synthesis"
        );

        let mut report = SynthesisReport::default();
        let mut succeeded = Vec::with_capacity(ordered.len());
        for synthesis in ordered {
            info!(%synthesis, "synthesizing");
            match self.process(synthesis, exporter) {
                Ok(()) => {
                    succeeded.push(synthesis);
                    report.succeeded.push(synthesis.to_string());
                }
                Err(e) => {
                    error!(%synthesis, "synthesis failed, skipping: {e:#}");
                    report.failed.push(synthesis.to_string());
                }
            }
        }
        self.flush(&succeeded, exporter)?;
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            cache_hits = self.cache.hits(),
            cache_misses = self.cache.misses(),
            "operation synthesis finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_token_list_selects_every_supported_key() {
        assert_eq!(parse_tokens(&[]).unwrap(), supported_keys());
    }

    #[test]
    fn wildcards_expand_against_supported_keys() {
        let keys = parse_tokens(&tokens(&["earp?_*"])).unwrap();
        let names: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert!(names.contains(&"EARPF_SIN".to_string()));
        assert!(names.contains(&"EARPI_REE".to_string()));
        assert!(names.iter().all(|n| n.starts_with("EARP")));
    }

    #[test]
    fn unknown_tokens_abort_and_unsupported_pairs_are_skipped() {
        assert!(matches!(
            parse_tokens(&tokens(&["CMO_SBM", "FOO_SBM"])),
            Err(SyntError::UnknownVariable(t)) if t == "FOO_SBM"
        ));
        let keys = parse_tokens(&tokens(&["CMO_UEE", "CMO_SBM", "CMO_SBM"])).unwrap();
        assert_eq!(keys, vec![OperationSynthesis::parse("CMO_SBM").unwrap()]);
    }

    #[test]
    fn metadata_flags_follow_rules_and_bounds() {
        let keys = vec![
            OperationSynthesis::parse("QVER_UHE").unwrap(),
            OperationSynthesis::parse("CMO_SBM").unwrap(),
        ];
        let df = metadata_frame(&keys).unwrap();
        assert_eq!(df.height(), 2);
        let calculated: Vec<Option<bool>> = df.column("calculado").unwrap().bool().unwrap().into_iter().collect();
        let bounded: Vec<Option<bool>> = df.column("limitar").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(calculated, vec![Some(true), Some(false)]);
        assert_eq!(bounded, vec![Some(true), Some(false)]);
    }
}
