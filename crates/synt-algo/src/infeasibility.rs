//! Classification of the violation log into [`Infeasibility`] records.
//!
//! Message parsing lives in `synt_core::infeasibility`; this module adds the
//! registry lookups (plant names to codes) and the deficit conversion to a
//! share of the submarket's maximum stored energy.

use polars::prelude::*;
use std::collections::HashMap;
use synt_core::columns::*;
use synt_core::{
    parse_violation, Infeasibility, InfeasibilityKind, SyntError, SyntResult, ViolationMessage,
};
use synt_io::frame::{f64_values, i64_values, str_values};
use synt_io::FileRepository;
use tracing::warn;

use crate::deck::{Calendar, Deck};

/// Unit of deficit violations after conversion.
pub const DEFICIT_UNIT: &str = "%EARMmax";

/// One row of the violation log.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationRecord {
    pub iteration: i64,
    pub stage: i64,
    pub scenario: i64,
    pub message: String,
    pub violation: f64,
    pub unit: String,
}

pub fn violation_records(log: &DataFrame) -> SyntResult<Vec<ViolationRecord>> {
    let iterations = i64_values(log, ITERACAO)?;
    let stages = i64_values(log, ESTAGIO)?;
    let scenarios = i64_values(log, CENARIO)?;
    let messages = str_values(log, RESTRICAO)?;
    let violations = f64_values(log, VIOLACAO)?;
    let units = str_values(log, UNIDADE)?;
    Ok((0..iterations.len())
        .map(|row| ViolationRecord {
            iteration: iterations[row],
            stage: stages[row],
            scenario: scenarios[row],
            message: messages[row].clone(),
            violation: violations[row],
            unit: units[row].clone(),
        })
        .collect())
}

/// Registry data the classifier needs.
#[derive(Debug, Clone, Default)]
pub struct ClassifierContext {
    /// Upper-cased plant name → plant code.
    pub plants: HashMap<String, i64>,
    /// Upper-cased submarket name → submarket code.
    pub submarkets: HashMap<String, i64>,
    /// Maximum stored energy per (submarket, stage), when available.
    pub capacity: Option<HashMap<(i64, i64), f64>>,
    pub calendar: Calendar,
}

impl ClassifierContext {
    pub fn from_deck<R: FileRepository>(deck: &mut Deck<R>) -> SyntResult<Self> {
        let cadastro = deck.repository().hidr()?.table("cadastro")?;
        let plants = str_values(&cadastro, NOME_USINA)?
            .into_iter()
            .map(|name| name.to_uppercase())
            .zip(i64_values(&cadastro, CODIGO_USINA)?)
            .collect();
        let sb = deck.submarkets()?;
        let submarkets = str_values(&sb, NOME_SUBMERCADO)?
            .into_iter()
            .map(|name| name.to_uppercase())
            .zip(i64_values(&sb, CODIGO_SUBMERCADO)?)
            .collect();
        let capacity = match deck.storage_capacity_map() {
            Ok(capacity) => Some(capacity),
            Err(e) => {
                warn!("storage capacity unavailable, deficits cannot be converted: {e}");
                None
            }
        };
        Ok(ClassifierContext {
            plants,
            submarkets,
            capacity,
            calendar: deck.calendar()?,
        })
    }

    fn plant_code(&self, name: &str) -> SyntResult<i64> {
        self.plants
            .get(&name.trim().to_uppercase())
            .copied()
            .ok_or_else(|| SyntError::Lookup(format!("unknown hydro plant '{name}'")))
    }
}

/// Classifies one log row.
pub fn classify(record: &ViolationRecord, context: &ClassifierContext) -> SyntResult<Infeasibility> {
    let parsed = parse_violation(&record.message)?;
    let mut violation = record.violation;
    let mut unit = record.unit.clone();
    let kind = match parsed {
        ViolationMessage::ElectricConstraint { code, block, bound } => {
            InfeasibilityKind::ElectricConstraint { code, block, bound }
        }
        ViolationMessage::FlowConstraint { code, block, bound } => {
            InfeasibilityKind::FlowConstraint { code, block, bound }
        }
        ViolationMessage::VolumeConstraint { code, bound } => {
            InfeasibilityKind::VolumeConstraint { code, bound }
        }
        ViolationMessage::EnergyConstraint { code, bound } => {
            InfeasibilityKind::EnergyConstraint { code, bound }
        }
        ViolationMessage::Irrigation { plant } => InfeasibilityKind::Irrigation {
            plant: context.plant_code(&plant)?,
        },
        ViolationMessage::Evaporation { plant } => InfeasibilityKind::Evaporation {
            plant: context.plant_code(&plant)?,
        },
        ViolationMessage::Spillage { plant } => InfeasibilityKind::Spillage {
            plant: context.plant_code(&plant)?,
        },
        ViolationMessage::Deficit { submarket, block } => {
            violation = deficit_share(record, &submarket, block, context)?;
            unit = DEFICIT_UNIT.to_string();
            InfeasibilityKind::Deficit { submarket, block }
        }
    };
    Ok(Infeasibility {
        iteration: record.iteration,
        stage: record.stage,
        scenario: record.scenario,
        violation,
        unit,
        kind,
    })
}

/// Deficit of one block as a percentage of the submarket's maximum stored
/// energy, weighted by the block's share of the stage.
fn deficit_share(
    record: &ViolationRecord,
    submarket: &str,
    block: i64,
    context: &ClassifierContext,
) -> SyntResult<f64> {
    let code = context
        .submarkets
        .get(&submarket.to_uppercase())
        .copied()
        .ok_or_else(|| SyntError::Lookup(format!("unknown submarket '{submarket}'")))?;
    let capacity = context
        .capacity
        .as_ref()
        .and_then(|capacity| capacity.get(&(code, record.stage)))
        .copied()
        .ok_or_else(|| {
            SyntError::Lookup(format!(
                "no stored energy capacity for submarket {code} stage {}",
                record.stage
            ))
        })?;
    if capacity <= 0.0 {
        return Err(SyntError::Lookup(format!(
            "submarket {code} has no storage in stage {}",
            record.stage
        )));
    }
    let block_hours = context.calendar.block_hours(record.stage, block)?;
    let stage_hours = context.calendar.block_hours(record.stage, 0)?;
    Ok(100.0 * record.violation * block_hours / stage_hours / capacity)
}

/// Export table of classified violations.
pub fn infeasibilities_frame(items: &[Infeasibility]) -> SyntResult<DataFrame> {
    Ok(DataFrame::new(vec![
        Series::new(ITERACAO, items.iter().map(|i| i.iteration).collect::<Vec<_>>()),
        Series::new(ESTAGIO, items.iter().map(|i| i.stage).collect::<Vec<_>>()),
        Series::new(CENARIO, items.iter().map(|i| i.scenario).collect::<Vec<_>>()),
        Series::new(
            TIPO,
            items
                .iter()
                .map(|i| i.kind.tag().to_string())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "codigo",
            items.iter().map(|i| i.kind.code()).collect::<Vec<_>>(),
        ),
        Series::new(PATAMAR, items.iter().map(|i| i.kind.block()).collect::<Vec<_>>()),
        Series::new(
            "limite",
            items
                .iter()
                .map(|i| i.kind.bound().map(|b| b.to_string()))
                .collect::<Vec<_>>(),
        ),
        Series::new(
            NOME_SUBMERCADO,
            items
                .iter()
                .map(|i| i.kind.submarket().map(str::to_string))
                .collect::<Vec<_>>(),
        ),
        Series::new(VIOLACAO, items.iter().map(|i| i.violation).collect::<Vec<_>>()),
        Series::new(UNIDADE, items.iter().map(|i| i.unit.clone()).collect::<Vec<_>>()),
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synt_core::BoundSide;

    fn record(message: &str, violation: f64) -> ViolationRecord {
        ViolationRecord {
            iteration: 2,
            stage: 1,
            scenario: 1,
            message: message.to_string(),
            violation,
            unit: "MWmed".to_string(),
        }
    }

    fn context() -> ClassifierContext {
        let blocks = df![
            ESTAGIO => &[1i64, 1, 1],
            PATAMAR => &[0i64, 1, 2],
            DURACAO => &[168.0f64, 42.0, 126.0]
        ]
        .unwrap();
        let stages = df![
            ESTAGIO => &[1i64],
            DATA_INICIO => &["2023-01-07T00:00:00"],
            DATA_FIM => &["2023-01-14T00:00:00"],
            DURACAO_ESTAGIO => &[168.0f64]
        ]
        .unwrap();
        ClassifierContext {
            plants: HashMap::from([("FURNAS".to_string(), 6)]),
            submarkets: HashMap::from([("SE".to_string(), 1)]),
            capacity: Some(HashMap::from([((1, 1), 200.0)])),
            calendar: Calendar::from_frames(&blocks, &stages).unwrap(),
        }
    }

    #[test]
    fn electric_constraint_keeps_raw_violation() {
        let classified = classify(
            &record("RESTRICAO ELETRICA 181PATAMAR1(L. INF)", 3.52589265),
            &context(),
        )
        .unwrap();
        assert_eq!(classified.kind.tag(), "RE");
        assert_eq!(classified.kind.code(), Some(181));
        assert_eq!(classified.kind.block(), Some(1));
        assert_eq!(classified.kind.bound(), Some(BoundSide::Lower));
        assert_eq!(classified.violation, 3.52589265);
        assert_eq!(classified.unit, "MWmed");
    }

    #[test]
    fn plant_names_resolve_to_codes() {
        let classified = classify(&record("VERTIMENTO, USINA furnas", 1.0), &context()).unwrap();
        assert_eq!(classified.kind, InfeasibilityKind::Spillage { plant: 6 });
        assert!(classify(&record("IRRIGACAO, USINA ITAIPU", 1.0), &context()).is_err());
    }

    #[test]
    fn deficit_becomes_share_of_stored_energy() {
        let classified =
            classify(&record("DEFICIT SUBMERCADO SE PATAMAR 1", 80.0), &context()).unwrap();
        assert_eq!(classified.unit, DEFICIT_UNIT);
        assert!((classified.violation - 100.0 * 80.0 * 42.0 / 168.0 / 200.0).abs() < 1e-12);
    }

    #[test]
    fn ambiguous_messages_are_errors() {
        let err = classify(&record("RHV 3 (L. INF) EVAPORACAO", 1.0), &context()).unwrap_err();
        assert!(matches!(err, SyntError::Classification(_)));
    }

    #[test]
    fn export_frame_has_one_row_per_violation() {
        let items = vec![
            classify(&record("RHQ 305 PATAMAR 2 (L. SUP)", 1.0), &context()).unwrap(),
            classify(&record("DEFICIT SUBMERCADO SE PATAMAR 2", 10.0), &context()).unwrap(),
        ];
        let df = infeasibilities_frame(&items).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(
            str_values(&df, TIPO).unwrap(),
            vec!["RHQ".to_string(), "DEFICIT".to_string()]
        );
    }
}
