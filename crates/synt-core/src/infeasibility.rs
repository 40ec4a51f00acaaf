//! Constraint-violation records and the parser for their free-text messages.
//!
//! The optimization log describes each violation with a semi-structured
//! message such as `RESTRICAO ELETRICA 181 PATAMAR 1 (L. INF)`. The message
//! selects exactly one violation type through a fixed set of distinguishing
//! substrings; a message matching none or several of them is rejected
//! instead of being attributed to a guessed type.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Iteration index given to violations from the final simulation pass.
pub const FINAL_SIMULATION_ITERATION: i64 = -1;

/// Which side of a constraint was violated, as written in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundSide {
    Lower,
    Upper,
}

impl BoundSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundSide::Lower => "L. INF",
            BoundSide::Upper => "L. SUP",
        }
    }

    fn parse(literal: &str) -> Option<Self> {
        match literal.trim() {
            "L. INF" | "L.INF" => Some(BoundSide::Lower),
            "L. SUP" | "L.SUP" => Some(BoundSide::Upper),
            _ => None,
        }
    }
}

impl fmt::Display for BoundSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("no violation type matches message '{0}'")]
    NoMatch(String),

    #[error("message '{message}' is ambiguous between {matches:?}")]
    Ambiguous {
        message: String,
        matches: Vec<&'static str>,
    },

    #[error("malformed {tag} message '{message}'")]
    Malformed { tag: &'static str, message: String },
}

/// Fields extracted from a message, before any registry lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationMessage {
    ElectricConstraint {
        code: i64,
        block: i64,
        bound: BoundSide,
    },
    FlowConstraint {
        code: i64,
        block: i64,
        bound: BoundSide,
    },
    VolumeConstraint {
        code: i64,
        bound: BoundSide,
    },
    EnergyConstraint {
        code: i64,
        bound: BoundSide,
    },
    Irrigation {
        plant: String,
    },
    Evaporation {
        plant: String,
    },
    Spillage {
        plant: String,
    },
    Deficit {
        submarket: String,
        block: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Electric,
    Flow,
    Volume,
    Energy,
    Irrigation,
    Evaporation,
    Spillage,
    Deficit,
}

const PATTERNS: &[(&str, Pattern)] = &[
    ("RESTRICAO ELETRICA", Pattern::Electric),
    ("RHQ", Pattern::Flow),
    ("RHV", Pattern::Volume),
    ("RHE", Pattern::Energy),
    ("IRRIGACAO", Pattern::Irrigation),
    ("EVAPORACAO", Pattern::Evaporation),
    ("VERTIMENTO", Pattern::Spillage),
    ("DEFICIT", Pattern::Deficit),
];

impl Pattern {
    fn tag(&self) -> &'static str {
        match self {
            Pattern::Electric => "RE",
            Pattern::Flow => "RHQ",
            Pattern::Volume => "RHV",
            Pattern::Energy => "RHE",
            Pattern::Irrigation => "TI",
            Pattern::Evaporation => "EV",
            Pattern::Spillage => "VERT",
            Pattern::Deficit => "DEFICIT",
        }
    }
}

/// Selects the single violation type of `message` and extracts its fields.
pub fn parse_violation(message: &str) -> Result<ViolationMessage, ClassificationError> {
    let matches: Vec<Pattern> = PATTERNS
        .iter()
        .filter(|(needle, _)| message.contains(needle))
        .map(|(_, pattern)| *pattern)
        .collect();
    let pattern = match matches.as_slice() {
        [] => return Err(ClassificationError::NoMatch(message.to_string())),
        [single] => *single,
        several => {
            return Err(ClassificationError::Ambiguous {
                message: message.to_string(),
                matches: several.iter().map(Pattern::tag).collect(),
            })
        }
    };
    let malformed = || ClassificationError::Malformed {
        tag: pattern.tag(),
        message: message.to_string(),
    };
    let parsed = match pattern {
        Pattern::Electric => {
            let (code, block, bound) =
                code_block_bound(after(message, "RESTRICAO ELETRICA")).ok_or_else(malformed)?;
            ViolationMessage::ElectricConstraint { code, block, bound }
        }
        Pattern::Flow => {
            let (code, block, bound) =
                code_block_bound(after(message, "RHQ")).ok_or_else(malformed)?;
            ViolationMessage::FlowConstraint { code, block, bound }
        }
        Pattern::Volume => {
            let (code, bound) = code_bound(after(message, "RHV")).ok_or_else(malformed)?;
            ViolationMessage::VolumeConstraint { code, bound }
        }
        Pattern::Energy => {
            let (code, bound) = code_bound(after(message, "RHE")).ok_or_else(malformed)?;
            ViolationMessage::EnergyConstraint { code, bound }
        }
        Pattern::Irrigation => ViolationMessage::Irrigation {
            plant: plant_name(message).ok_or_else(malformed)?,
        },
        Pattern::Evaporation => ViolationMessage::Evaporation {
            plant: plant_name(message).ok_or_else(malformed)?,
        },
        Pattern::Spillage => ViolationMessage::Spillage {
            plant: plant_name(message).ok_or_else(malformed)?,
        },
        Pattern::Deficit => {
            let rest = after(message, "SUBMERCADO");
            let (submarket, block) = rest.split_once("PATAMAR").ok_or_else(malformed)?;
            let submarket = submarket.trim().trim_matches(':').trim();
            if submarket.is_empty() {
                return Err(malformed());
            }
            let block = block
                .trim()
                .trim_matches(':')
                .trim()
                .parse()
                .map_err(|_| malformed())?;
            ViolationMessage::Deficit {
                submarket: submarket.to_string(),
                block,
            }
        }
    };
    Ok(parsed)
}

impl ViolationMessage {
    pub fn tag(&self) -> &'static str {
        self.pattern().tag()
    }

    fn pattern(&self) -> Pattern {
        match self {
            ViolationMessage::ElectricConstraint { .. } => Pattern::Electric,
            ViolationMessage::FlowConstraint { .. } => Pattern::Flow,
            ViolationMessage::VolumeConstraint { .. } => Pattern::Volume,
            ViolationMessage::EnergyConstraint { .. } => Pattern::Energy,
            ViolationMessage::Irrigation { .. } => Pattern::Irrigation,
            ViolationMessage::Evaporation { .. } => Pattern::Evaporation,
            ViolationMessage::Spillage { .. } => Pattern::Spillage,
            ViolationMessage::Deficit { .. } => Pattern::Deficit,
        }
    }
}

fn after<'a>(message: &'a str, keyword: &str) -> &'a str {
    message
        .split_once(keyword)
        .map(|(_, rest)| rest)
        .unwrap_or("")
}

/// `<code> PATAMAR <block> (<bound>)`
fn code_block_bound(rest: &str) -> Option<(i64, i64, BoundSide)> {
    let (code, tail) = rest.split_once("PATAMAR")?;
    let (block, bound) = tail.split_once('(')?;
    let bound = bound.split_once(')')?.0;
    Some((
        code.trim().parse().ok()?,
        block.trim().parse().ok()?,
        BoundSide::parse(bound)?,
    ))
}

/// `<code> (<bound>)`
fn code_bound(rest: &str) -> Option<(i64, BoundSide)> {
    let (code, bound) = rest.split_once('(')?;
    let bound = bound.split_once(')')?.0;
    Some((code.trim().parse().ok()?, BoundSide::parse(bound)?))
}

/// `..., USINA <name>`
fn plant_name(message: &str) -> Option<String> {
    let name = message.split_once("USINA")?.1.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// One classified violation, with registry codes already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infeasibility {
    pub iteration: i64,
    pub stage: i64,
    pub scenario: i64,
    pub violation: f64,
    pub unit: String,
    pub kind: InfeasibilityKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InfeasibilityKind {
    ElectricConstraint {
        code: i64,
        block: i64,
        bound: BoundSide,
    },
    FlowConstraint {
        code: i64,
        block: i64,
        bound: BoundSide,
    },
    VolumeConstraint {
        code: i64,
        bound: BoundSide,
    },
    EnergyConstraint {
        code: i64,
        bound: BoundSide,
    },
    Irrigation {
        plant: i64,
    },
    Evaporation {
        plant: i64,
    },
    Spillage {
        plant: i64,
    },
    Deficit {
        submarket: String,
        block: i64,
    },
}

impl InfeasibilityKind {
    pub fn tag(&self) -> &'static str {
        self.pattern().tag()
    }

    fn pattern(&self) -> Pattern {
        match self {
            InfeasibilityKind::ElectricConstraint { .. } => Pattern::Electric,
            InfeasibilityKind::FlowConstraint { .. } => Pattern::Flow,
            InfeasibilityKind::VolumeConstraint { .. } => Pattern::Volume,
            InfeasibilityKind::EnergyConstraint { .. } => Pattern::Energy,
            InfeasibilityKind::Irrigation { .. } => Pattern::Irrigation,
            InfeasibilityKind::Evaporation { .. } => Pattern::Evaporation,
            InfeasibilityKind::Spillage { .. } => Pattern::Spillage,
            InfeasibilityKind::Deficit { .. } => Pattern::Deficit,
        }
    }

    /// Constraint or plant code, when the type carries one.
    pub fn code(&self) -> Option<i64> {
        match self {
            InfeasibilityKind::ElectricConstraint { code, .. }
            | InfeasibilityKind::FlowConstraint { code, .. }
            | InfeasibilityKind::VolumeConstraint { code, .. }
            | InfeasibilityKind::EnergyConstraint { code, .. } => Some(*code),
            InfeasibilityKind::Irrigation { plant }
            | InfeasibilityKind::Evaporation { plant }
            | InfeasibilityKind::Spillage { plant } => Some(*plant),
            InfeasibilityKind::Deficit { .. } => None,
        }
    }

    pub fn block(&self) -> Option<i64> {
        match self {
            InfeasibilityKind::ElectricConstraint { block, .. }
            | InfeasibilityKind::FlowConstraint { block, .. }
            | InfeasibilityKind::Deficit { block, .. } => Some(*block),
            _ => None,
        }
    }

    pub fn bound(&self) -> Option<BoundSide> {
        match self {
            InfeasibilityKind::ElectricConstraint { bound, .. }
            | InfeasibilityKind::FlowConstraint { bound, .. }
            | InfeasibilityKind::VolumeConstraint { bound, .. }
            | InfeasibilityKind::EnergyConstraint { bound, .. } => Some(*bound),
            _ => None,
        }
    }

    pub fn submarket(&self) -> Option<&str> {
        match self {
            InfeasibilityKind::Deficit { submarket, .. } => Some(submarket),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn electric_constraint_fields_follow_the_text() {
        let parsed = parse_violation("RESTRICAO ELETRICA 181PATAMAR1(L. INF)").unwrap();
        assert_eq!(
            parsed,
            ViolationMessage::ElectricConstraint {
                code: 181,
                block: 1,
                bound: BoundSide::Lower
            }
        );
        assert_eq!(parsed.tag(), "RE");
    }

    #[test]
    fn spaced_messages_parse_the_same() {
        let parsed = parse_violation("RESTRICAO ELETRICA 181 PATAMAR 1 (L. INF)").unwrap();
        assert!(matches!(
            parsed,
            ViolationMessage::ElectricConstraint { code: 181, block: 1, .. }
        ));
    }

    #[test]
    fn hydraulic_variants_are_distinguished() {
        assert_eq!(
            parse_violation("RHQ 305 PATAMAR 2 (L. SUP)").unwrap(),
            ViolationMessage::FlowConstraint {
                code: 305,
                block: 2,
                bound: BoundSide::Upper
            }
        );
        assert_eq!(
            parse_violation("RHV 52 (L. INF)").unwrap(),
            ViolationMessage::VolumeConstraint {
                code: 52,
                bound: BoundSide::Lower
            }
        );
        assert_eq!(
            parse_violation("RHE 5 (L. SUP)").unwrap(),
            ViolationMessage::EnergyConstraint {
                code: 5,
                bound: BoundSide::Upper
            }
        );
    }

    #[test]
    fn plant_messages_keep_the_name() {
        assert_eq!(
            parse_violation("IRRIGACAO, USINA SOBRADINHO").unwrap(),
            ViolationMessage::Irrigation {
                plant: "SOBRADINHO".into()
            }
        );
        assert_eq!(
            parse_violation("EVAPORACAO, USINA FURNAS").unwrap().tag(),
            "EV"
        );
        assert_eq!(
            parse_violation("VERTIMENTO, USINA ITAIPU").unwrap().tag(),
            "VERT"
        );
    }

    #[test]
    fn deficit_extracts_submarket_and_block() {
        assert_eq!(
            parse_violation("DEFICIT SUBMERCADO SE PATAMAR 3").unwrap(),
            ViolationMessage::Deficit {
                submarket: "SE".into(),
                block: 3
            }
        );
    }

    #[test]
    fn unknown_and_ambiguous_messages_fail() {
        assert!(matches!(
            parse_violation("RESTRICAO DESCONHECIDA 12"),
            Err(ClassificationError::NoMatch(_))
        ));
        let err = parse_violation("RHQ 5 PATAMAR 1 (L. INF) RHV").unwrap_err();
        match err {
            ClassificationError::Ambiguous { matches, .. } => {
                assert_eq!(matches, vec!["RHQ", "RHV"])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn messages_and_kinds_share_one_tag() {
        let lower = BoundSide::Lower;
        let pairs = [
            (
                "RESTRICAO ELETRICA 181 PATAMAR 1 (L. INF)",
                InfeasibilityKind::ElectricConstraint { code: 181, block: 1, bound: lower },
            ),
            (
                "RHQ 305 PATAMAR 2 (L. INF)",
                InfeasibilityKind::FlowConstraint { code: 305, block: 2, bound: lower },
            ),
            ("RHV 52 (L. INF)", InfeasibilityKind::VolumeConstraint { code: 52, bound: lower }),
            ("RHE 5 (L. INF)", InfeasibilityKind::EnergyConstraint { code: 5, bound: lower }),
            ("IRRIGACAO, USINA FURNAS", InfeasibilityKind::Irrigation { plant: 6 }),
            ("EVAPORACAO, USINA FURNAS", InfeasibilityKind::Evaporation { plant: 6 }),
            ("VERTIMENTO, USINA FURNAS", InfeasibilityKind::Spillage { plant: 6 }),
            (
                "DEFICIT SUBMERCADO SE PATAMAR 1",
                InfeasibilityKind::Deficit { submarket: "SE".into(), block: 1 },
            ),
        ];
        for (message, kind) in &pairs {
            let parsed = parse_violation(message).unwrap();
            assert_eq!(parsed.pattern(), kind.pattern(), "{message}");
            assert_eq!(parsed.tag(), kind.tag(), "{message}");
        }
        let tags: Vec<&str> = PATTERNS.iter().map(|(_, pattern)| pattern.tag()).collect();
        assert_eq!(tags, vec!["RE", "RHQ", "RHV", "RHE", "TI", "EV", "VERT", "DEFICIT"]);
    }

    #[test]
    fn malformed_fields_fail() {
        assert!(matches!(
            parse_violation("RESTRICAO ELETRICA XX PATAMAR 1 (L. INF)"),
            Err(ClassificationError::Malformed { tag: "RE", .. })
        ));
        assert!(matches!(
            parse_violation("RHV 52 (MEIO)"),
            Err(ClassificationError::Malformed { tag: "RHV", .. })
        ));
    }
}
