//! Deck facade: derived datasets over the parsed files of one case.
//!
//! A [`Deck`] owns its repository and a cache keyed by [`Dataset`]. Every
//! accessor builds its dataset on first use and hands out copies afterwards,
//! so callers can reshape what they get without touching the cache. One deck
//! serves one synthesis run; [`Deck::reset`] drops everything derived.
//!
//! Operational reports go through the same pipeline before anyone sees them:
//!
//! 1. legacy scenario renumbering, when the file's schema asks for it
//! 2. scenario grid expansion
//! 3. block 0 (duration-weighted average of the stage)
//! 4. stage dates
//! 5. aggregation keys (plant rows gain their REE and submarket)

pub mod blocks;
pub mod calendar;
pub mod constraints;
pub mod registry;
pub mod reports;
pub mod scenarios;

use chrono::NaiveDateTime;
use polars::prelude::*;
use std::collections::HashMap;
use synt_core::columns::*;
use synt_core::{SchemaVersion, SyntError, SyntResult};
use synt_io::frame::{f64_values, i64_values, require_columns, sort_by, with_f64, with_i64};
use synt_io::{FileKind, FileRepository};
use tracing::debug;

pub use calendar::{Calendar, StageSpan, DATE_FORMAT};
pub use constraints::{FlowConstraint, Limits};
pub use registry::HydroPlant;

use blocks::add_block_zero;
use calendar::add_dates;
use scenarios::normalize_scenarios;

/// Table holding the rows of every `dec_oper_*` file.
pub const OPERACAO: &str = "operacao";
const TOTAL: &str = "_total";
const CONTAGEM: &str = "_contagem";

/// Sum of scheduled and anticipated thermal generation.
pub const GERACAO_TERMICA_TOTAL: &str = "geracao_termica_total_MW";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    BlocksDurations,
    StagesDurations,
    Submarkets,
    Rees,
    ThermalPlants,
    HydroPlants,
    DecOperSist,
    DecOperRee,
    DecOperUsih,
    DecOperUsit,
    DecOperInterc,
    StorageCapacity,
    Probabilities,
    OperationCosts,
    Convergence,
    CostBreakdown,
    RunTimes,
    ViolationLog,
}

pub struct Deck<R: FileRepository> {
    repository: R,
    frames: HashMap<Dataset, DataFrame>,
    study_start: Option<NaiveDateTime>,
    flow_constraints: Option<Vec<FlowConstraint>>,
}

impl<R: FileRepository> Deck<R> {
    pub fn new(repository: R) -> Self {
        Deck {
            repository,
            frames: HashMap::new(),
            study_start: None,
            flow_constraints: None,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Drops every derived dataset.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.study_start = None;
        self.flow_constraints = None;
    }

    pub fn is_cached(&self, dataset: Dataset) -> bool {
        self.frames.contains_key(&dataset)
    }

    fn cached<F>(&mut self, dataset: Dataset, build: F) -> SyntResult<DataFrame>
    where
        F: FnOnce(&mut Self) -> SyntResult<DataFrame>,
    {
        if let Some(df) = self.frames.get(&dataset) {
            return Ok(df.clone());
        }
        debug!(?dataset, "building deck dataset");
        let df = build(self)?;
        self.frames.insert(dataset, df.clone());
        Ok(df)
    }

    fn table(&self, kind: FileKind, name: &str) -> SyntResult<DataFrame> {
        self.repository.file(kind)?.table(name)
    }

    /// Schema version declared by the file of `kind`, if any.
    pub fn version(&self, kind: FileKind) -> SyntResult<Option<SchemaVersion>> {
        Ok(self.repository.file(kind)?.version().cloned())
    }

    pub fn study_start(&mut self) -> SyntResult<NaiveDateTime> {
        if let Some(start) = self.study_start {
            return Ok(start);
        }
        let start = calendar::study_start(&self.table(FileKind::Dadger, "dt")?)?;
        self.study_start = Some(start);
        Ok(start)
    }

    pub fn blocks_durations(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::BlocksDurations, |deck| {
            calendar::blocks_durations(&deck.table(FileKind::Dadger, "dp")?)
        })
    }

    pub fn stages_durations(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::StagesDurations, |deck| {
            let start = deck.study_start()?;
            calendar::stages_durations(&deck.blocks_durations()?, start)
        })
    }

    pub fn calendar(&mut self) -> SyntResult<Calendar> {
        Calendar::from_frames(&self.blocks_durations()?, &self.stages_durations()?)
    }

    pub fn num_stages(&mut self) -> SyntResult<usize> {
        Ok(self.stages_durations()?.height())
    }

    pub fn submarkets(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::Submarkets, |deck| {
            registry::submarkets(&deck.table(FileKind::Dadger, "sb")?)
        })
    }

    pub fn rees(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::Rees, |deck| {
            registry::rees(&deck.table(FileKind::Dadger, "ree")?)
        })
    }

    pub fn thermal_plants(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::ThermalPlants, |deck| {
            registry::thermal_plants(&deck.table(FileKind::Dadger, "ct")?)
        })
    }

    /// Plant → REE → submarket join table with names and volumes.
    pub fn hydro_plants(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::HydroPlants, |deck| {
            let uh = deck.table(FileKind::Dadger, "uh")?;
            let cadastro = deck.table(FileKind::Hidr, "cadastro")?;
            let plants = registry::hydro_plants(&uh, &cadastro, &deck.rees()?, &deck.submarkets()?)?;
            registry::hydro_plants_frame(&plants)
        })
    }

    pub fn hydro_registry(&mut self) -> SyntResult<Vec<HydroPlant>> {
        registry::hydro_plants_from_frame(&self.hydro_plants()?)
    }

    fn operation_report(&mut self, kind: FileKind, keys: &[&str]) -> SyntResult<DataFrame> {
        let file = self.repository.file(kind)?;
        let version = file.version().cloned();
        let raw = file.table(OPERACAO)?;
        require_columns(&raw, kind.stem(), &[ESTAGIO, CENARIO, PATAMAR, DURACAO])?;
        require_columns(&raw, kind.stem(), keys)?;

        let num_stages = self.num_stages()?;
        let expanded = normalize_scenarios(&raw, version.as_ref(), num_stages, keys)?;
        let averaged = add_block_zero(&expanded, keys)?;
        add_dates(&averaged, &self.calendar()?)
    }

    pub fn dec_oper_sist(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::DecOperSist, |deck| {
            let mut df = deck.operation_report(FileKind::DecOperSist, &[CODIGO_SUBMERCADO])?;
            let scheduled = f64_values(&df, "geracao_termica_MW")?;
            let anticipated = match f64_values(&df, "geracao_termica_antecipada_MW") {
                Ok(values) => values,
                Err(SyntError::MissingColumn { .. }) => vec![0.0; scheduled.len()],
                Err(e) => return Err(e),
            };
            let total = scheduled
                .iter()
                .zip(&anticipated)
                .map(|(s, a)| s + a)
                .collect();
            with_f64(&mut df, GERACAO_TERMICA_TOTAL, total)?;
            Ok(df)
        })
    }

    pub fn dec_oper_ree(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::DecOperRee, |deck| {
            let df = deck.operation_report(FileKind::DecOperRee, &[CODIGO_REE])?;
            let rees = deck.rees()?.select([CODIGO_REE, CODIGO_SUBMERCADO])?;
            registry::attach(&df, &rees, CODIGO_REE, "REE")
        })
    }

    pub fn dec_oper_usih(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::DecOperUsih, |deck| {
            let df = deck.operation_report(FileKind::DecOperUsih, &[CODIGO_USINA])?;
            let plants = deck
                .hydro_plants()?
                .select([CODIGO_USINA, CODIGO_REE, CODIGO_SUBMERCADO])?;
            registry::attach(&df, &plants, CODIGO_USINA, "hydro plant")
        })
    }

    pub fn dec_oper_usit(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::DecOperUsit, |deck| {
            deck.operation_report(FileKind::DecOperUsit, &[CODIGO_USINA, CODIGO_SUBMERCADO])
        })
    }

    pub fn dec_oper_interc(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::DecOperInterc, |deck| {
            deck.operation_report(
                FileKind::DecOperInterc,
                &[CODIGO_SUBMERCADO_DE, CODIGO_SUBMERCADO_PARA],
            )
        })
    }

    /// Maximum storable energy per (submarket, stage).
    pub fn storage_capacity(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::StorageCapacity, |deck| {
            let capacity = deck
                .dec_oper_sist()?
                .lazy()
                .select([
                    col(CODIGO_SUBMERCADO).cast(DataType::Int64),
                    col(ESTAGIO).cast(DataType::Int64),
                    col(EARM_MAXIMO).cast(DataType::Float64),
                ])
                .group_by_stable([col(CODIGO_SUBMERCADO), col(ESTAGIO)])
                .agg([col(EARM_MAXIMO).first()])
                .collect()?;
            sort_by(&capacity, &[CODIGO_SUBMERCADO, ESTAGIO])
        })
    }

    pub fn storage_capacity_map(&mut self) -> SyntResult<HashMap<(i64, i64), f64>> {
        let df = self.storage_capacity()?;
        Ok(i64_values(&df, CODIGO_SUBMERCADO)?
            .into_iter()
            .zip(i64_values(&df, ESTAGIO)?)
            .zip(f64_values(&df, EARM_MAXIMO)?)
            .collect())
    }

    /// Scenario probabilities on the expanded grid, summing to 1 per stage.
    pub fn probabilities(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::Probabilities, |deck| {
            let version = deck.version(FileKind::Vazoes)?;
            let raw = deck.table(FileKind::Vazoes, "probabilidades")?;
            require_columns(&raw, "probabilidades", &[ESTAGIO, CENARIO, PROBABILIDADE])?;
            let num_stages = deck.num_stages()?;
            let df = normalize_scenarios(&raw, version.as_ref(), num_stages, &[])?;

            let totals = df
                .clone()
                .lazy()
                .group_by([col(ESTAGIO)])
                .agg([
                    col(PROBABILIDADE).cast(DataType::Float64).sum().alias(TOTAL),
                    col(PROBABILIDADE).count().cast(DataType::Float64).alias(CONTAGEM),
                ]);
            let columns: Vec<Expr> = df.get_column_names().into_iter().map(col).collect();
            Ok(df
                .lazy()
                .left_join(totals, col(ESTAGIO), col(ESTAGIO))
                .with_column(
                    when(col(TOTAL).gt(lit(0.0)))
                        .then(col(PROBABILIDADE).cast(DataType::Float64) / col(TOTAL))
                        .otherwise(lit(1.0) / col(CONTAGEM))
                        .alias(PROBABILIDADE),
                )
                .select(columns)
                .collect()?)
        })
    }

    /// Present and future costs of both narrative reports, one block 0 row
    /// per (stage, scenario).
    pub fn operation_costs(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::OperationCosts, |deck| {
            let num_stages = deck.num_stages()?;
            let current = reports::cost_table(
                &deck.table(FileKind::Relato, reports::CUSTOS)?,
                "relato.custos",
            )?;
            let version = deck.version(FileKind::Relato)?;
            let current = normalize_scenarios(&current, version.as_ref(), num_stages, &[])?;

            let next = if deck.repository.has_file(FileKind::Relato2) {
                let raw = reports::cost_table(
                    &deck.table(FileKind::Relato2, reports::CUSTOS)?,
                    "relato2.custos",
                )?;
                let next_stages = i64_values(&raw, ESTAGIO)?.into_iter().max().unwrap_or(1);
                let version = deck.version(FileKind::Relato2)?;
                Some(normalize_scenarios(&raw, version.as_ref(), next_stages as usize, &[])?)
            } else {
                debug!("no next-month report, costs cover the current month only");
                None
            };
            let mut df = reports::stitch_costs(&current, next.as_ref())?;

            let calendar = deck.calendar()?;
            let hours = i64_values(&df, ESTAGIO)?
                .into_iter()
                .map(|stage| calendar.extended_stage(stage).map(|span| span.hours))
                .collect::<SyntResult<Vec<_>>>()?;
            with_i64(&mut df, PATAMAR, vec![0; hours.len()])?;
            with_f64(&mut df, DURACAO, hours)?;
            add_dates(&df, &calendar)
        })
    }

    pub fn convergence(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::Convergence, |deck| {
            let df = deck.table(FileKind::Relato, "convergencia")?;
            require_columns(
                &df,
                "convergencia",
                &[ITERACAO, "zinf", "zsup", "gap_percentual", "tempo_s"],
            )?;
            Ok(df)
        })
    }

    pub fn cost_breakdown(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::CostBreakdown, |deck| {
            let df = deck.table(FileKind::Relato, "parcelas_custo")?;
            require_columns(
                &df,
                "parcelas_custo",
                &["parcela", "valor_esperado", "desvio_padrao"],
            )?;
            Ok(df)
        })
    }

    pub fn run_times(&mut self) -> SyntResult<DataFrame> {
        self.cached(Dataset::RunTimes, |deck| {
            let df = deck.table(FileKind::DecompTim, "tempos")?;
            require_columns(&df, "tempos", &["etapa", "tempo_s"])?;
            Ok(df)
        })
    }

    /// All recorded violations, or `None` when the run produced no log.
    pub fn violation_log(&mut self) -> SyntResult<Option<DataFrame>> {
        if !self.repository.has_file(FileKind::Inviabilidades) {
            return Ok(None);
        }
        self.cached(Dataset::ViolationLog, |deck| {
            let file = deck.repository.inviabilidades()?;
            reports::violation_log(&file.table("iteracoes")?, &file.table("simulacao_final")?)
        })
        .map(Some)
    }

    pub fn flow_constraints(&mut self) -> SyntResult<Vec<FlowConstraint>> {
        if let Some(constraints) = &self.flow_constraints {
            return Ok(constraints.clone());
        }
        let file = self.repository.dadger()?;
        let parsed = constraints::flow_constraints(
            &file.table("hq")?,
            &file.table("lq")?,
            &file.table("cq")?,
        )?;
        debug!(count = parsed.len(), "loaded single-term flow constraints");
        self.flow_constraints = Some(parsed.clone());
        Ok(parsed)
    }
}
