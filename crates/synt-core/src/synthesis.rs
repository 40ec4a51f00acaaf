//! Synthesis keys: which quantity, at which level of spatial aggregation.
//!
//! An [`OperationSynthesis`] pairs a [`Variable`] with a [`SpatialResolution`]
//! and is written as `VAR_RES` (e.g. `GHID_UHE`). Keys are plain values: they
//! are hashed into caches and dependency tables and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::columns;

/// Physical quantities reported by the operation syntheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    Cmo,
    Cter,
    Cop,
    Cfu,
    Earmi,
    Earpi,
    Earmf,
    Earpf,
    Enaa,
    Ghid,
    Gter,
    Geol,
    Int,
    Def,
    Mer,
    Qafl,
    Qinc,
    Qdef,
    Qtur,
    Qver,
    Qvert,
    Qvernt,
    Varmi,
    Varmf,
    Varpi,
    Varpf,
}

impl Variable {
    pub const ALL: &'static [Variable] = &[
        Variable::Cmo,
        Variable::Cter,
        Variable::Cop,
        Variable::Cfu,
        Variable::Earmi,
        Variable::Earpi,
        Variable::Earmf,
        Variable::Earpf,
        Variable::Enaa,
        Variable::Ghid,
        Variable::Gter,
        Variable::Geol,
        Variable::Int,
        Variable::Def,
        Variable::Mer,
        Variable::Qafl,
        Variable::Qinc,
        Variable::Qdef,
        Variable::Qtur,
        Variable::Qver,
        Variable::Qvert,
        Variable::Qvernt,
        Variable::Varmi,
        Variable::Varmf,
        Variable::Varpi,
        Variable::Varpf,
    ];

    /// Token used in `VAR_RES` strings and output file names.
    pub fn code(&self) -> &'static str {
        match self {
            Variable::Cmo => "CMO",
            Variable::Cter => "CTER",
            Variable::Cop => "COP",
            Variable::Cfu => "CFU",
            Variable::Earmi => "EARMI",
            Variable::Earpi => "EARPI",
            Variable::Earmf => "EARMF",
            Variable::Earpf => "EARPF",
            Variable::Enaa => "ENAA",
            Variable::Ghid => "GHID",
            Variable::Gter => "GTER",
            Variable::Geol => "GEOL",
            Variable::Int => "INT",
            Variable::Def => "DEF",
            Variable::Mer => "MER",
            Variable::Qafl => "QAFL",
            Variable::Qinc => "QINC",
            Variable::Qdef => "QDEF",
            Variable::Qtur => "QTUR",
            Variable::Qver => "QVER",
            Variable::Qvert => "QVERT",
            Variable::Qvernt => "QVERNT",
            Variable::Varmi => "VARMI",
            Variable::Varmf => "VARMF",
            Variable::Varpi => "VARPI",
            Variable::Varpf => "VARPF",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Variable::Cmo => "CMO",
            Variable::Cter => "Custo de GT",
            Variable::Cop => "COPER",
            Variable::Cfu => "CFU",
            Variable::Earmi => "EAR Inicial",
            Variable::Earpi => "EAR Percentual Inicial",
            Variable::Earmf => "EAR Final",
            Variable::Earpf => "EAR Percentual Final",
            Variable::Enaa => "ENA",
            Variable::Ghid => "GH",
            Variable::Gter => "GT",
            Variable::Geol => "GEOL",
            Variable::Int => "Intercâmbio",
            Variable::Def => "Déficit",
            Variable::Mer => "Mercado",
            Variable::Qafl => "Vazão Afluente",
            Variable::Qinc => "Vazão Incremental",
            Variable::Qdef => "Vazão Defluente",
            Variable::Qtur => "Vazão Turbinada",
            Variable::Qver => "Vazão Vertida",
            Variable::Qvert => "Vazão Vertida Turbinável",
            Variable::Qvernt => "Vazão Vertida Não-Turbinável",
            Variable::Varmi => "VAR Inicial",
            Variable::Varmf => "VAR Final",
            Variable::Varpi => "VAR Percentual Inicial",
            Variable::Varpf => "VAR Percentual Final",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            Variable::Cmo => "Custo Marginal de Operação",
            Variable::Cter => "Custo de Geração Térmica",
            Variable::Cop => "Custo de Operação",
            Variable::Cfu => "Custo Futuro",
            Variable::Earmi => "Energia Armazenada Absoluta Inicial",
            Variable::Earpi => "Energia Armazenada Percentual Inicial",
            Variable::Earmf => "Energia Armazenada Absoluta Final",
            Variable::Earpf => "Energia Armazenada Percentual Final",
            Variable::Enaa => "Energia Natural Afluente Absoluta",
            Variable::Ghid => "Geração Hidráulica",
            Variable::Gter => "Geração Térmica",
            Variable::Geol => "Geração Eólica",
            Variable::Int => "Intercâmbio de Energia",
            Variable::Def => "Déficit de Energia",
            Variable::Mer => "Mercado de Energia",
            Variable::Qafl => "Vazão Afluente",
            Variable::Qinc => "Vazão Incremental",
            Variable::Qdef => "Vazão Defluente",
            Variable::Qtur => "Vazão Turbinada",
            Variable::Qver => "Vazão Vertida",
            Variable::Qvert => "Vazão Vertida Turbinável",
            Variable::Qvernt => "Vazão Vertida Não-Turbinável",
            Variable::Varmi => "Volume Armazenado Absoluto Inicial",
            Variable::Varmf => "Volume Armazenado Absoluto Final",
            Variable::Varpi => "Volume Armazenado Percentual Inicial",
            Variable::Varpf => "Volume Armazenado Percentual Final",
        }
    }

    pub fn from_code(code: &str) -> Option<Variable> {
        Variable::ALL.iter().copied().find(|v| v.code() == code)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Levels of the spatial aggregation hierarchy.
///
/// Plants (`Uhe`, `Ute`, `Uee`) roll up into reservoir-equivalent groups
/// (`Ree`, hydro only), then submarkets (`Sbm`), then the interconnected
/// system (`Sin`). `Sbp` indexes pairs of submarkets for exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpatialResolution {
    Sin,
    Sbm,
    Sbp,
    Ree,
    Uhe,
    Ute,
    Uee,
}

impl SpatialResolution {
    pub const ALL: &'static [SpatialResolution] = &[
        SpatialResolution::Sin,
        SpatialResolution::Sbm,
        SpatialResolution::Sbp,
        SpatialResolution::Ree,
        SpatialResolution::Uhe,
        SpatialResolution::Ute,
        SpatialResolution::Uee,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            SpatialResolution::Sin => "SIN",
            SpatialResolution::Sbm => "SBM",
            SpatialResolution::Sbp => "SBP",
            SpatialResolution::Ree => "REE",
            SpatialResolution::Uhe => "UHE",
            SpatialResolution::Ute => "UTE",
            SpatialResolution::Uee => "UEE",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            SpatialResolution::Sin => "Sistema Interligado",
            SpatialResolution::Sbm => "Submercado",
            SpatialResolution::Sbp => "Par de Submercados",
            SpatialResolution::Ree => "Reservatório Equivalente",
            SpatialResolution::Uhe => "Usina Hidroelétrica",
            SpatialResolution::Ute => "Usina Termelétrica",
            SpatialResolution::Uee => "Usina Eólica",
        }
    }

    /// Columns that identify one entity at this resolution, outermost key last.
    ///
    /// Coarser levels reachable by summation use a suffix of these columns,
    /// which is what lets plant rows be regrouped without another join.
    pub fn entity_columns(&self) -> &'static [&'static str] {
        match self {
            SpatialResolution::Sin => &[],
            SpatialResolution::Sbm => &[columns::CODIGO_SUBMERCADO],
            SpatialResolution::Sbp => &[
                columns::CODIGO_SUBMERCADO_DE,
                columns::CODIGO_SUBMERCADO_PARA,
            ],
            SpatialResolution::Ree => &[columns::CODIGO_REE, columns::CODIGO_SUBMERCADO],
            SpatialResolution::Uhe => &[
                columns::CODIGO_USINA,
                columns::CODIGO_REE,
                columns::CODIGO_SUBMERCADO,
            ],
            SpatialResolution::Ute => &[columns::CODIGO_USINA, columns::CODIGO_SUBMERCADO],
            SpatialResolution::Uee => &[columns::CODIGO_USINA, columns::CODIGO_SUBMERCADO],
        }
    }

    pub fn from_code(code: &str) -> Option<SpatialResolution> {
        SpatialResolution::ALL
            .iter()
            .copied()
            .find(|r| r.code() == code)
    }
}

impl fmt::Display for SpatialResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A requested derived quantity: one variable at one spatial resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationSynthesis {
    pub variable: Variable,
    pub resolution: SpatialResolution,
}

impl OperationSynthesis {
    pub const fn new(variable: Variable, resolution: SpatialResolution) -> Self {
        Self {
            variable,
            resolution,
        }
    }

    /// Parses a `VAR_RES` token, returning `None` when either half is unknown.
    pub fn parse(token: &str) -> Option<Self> {
        let (variable, resolution) = token.trim().split_once('_')?;
        Some(Self::new(
            Variable::from_code(variable)?,
            SpatialResolution::from_code(resolution)?,
        ))
    }
}

impl fmt::Display for OperationSynthesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.variable.code(), self.resolution.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tokens() {
        let key = OperationSynthesis::parse("GHID_UHE").unwrap();
        assert_eq!(key.variable, Variable::Ghid);
        assert_eq!(key.resolution, SpatialResolution::Uhe);
        assert_eq!(key.to_string(), "GHID_UHE");
    }

    #[test]
    fn spillage_codes_do_not_collide() {
        assert_eq!(
            OperationSynthesis::parse("QVERNT_UHE").unwrap().variable,
            Variable::Qvernt
        );
        assert_eq!(
            OperationSynthesis::parse("QVERT_UHE").unwrap().variable,
            Variable::Qvert
        );
    }

    #[test]
    fn unknown_tokens_yield_none() {
        assert!(OperationSynthesis::parse("FOO_SBM").is_none());
        assert!(OperationSynthesis::parse("CMO_XYZ").is_none());
        assert!(OperationSynthesis::parse("CMO").is_none());
        assert!(OperationSynthesis::parse("").is_none());
    }

    #[test]
    fn every_code_roundtrips() {
        for variable in Variable::ALL {
            assert_eq!(Variable::from_code(variable.code()), Some(*variable));
        }
        for resolution in SpatialResolution::ALL {
            assert_eq!(
                SpatialResolution::from_code(resolution.code()),
                Some(*resolution)
            );
        }
    }

    #[test]
    fn coarser_levels_use_a_suffix_of_plant_columns() {
        let uhe = SpatialResolution::Uhe.entity_columns();
        let ree = SpatialResolution::Ree.entity_columns();
        let sbm = SpatialResolution::Sbm.entity_columns();
        assert!(uhe.ends_with(ree));
        assert!(ree.ends_with(sbm));
    }

    #[test]
    fn keys_serialize_as_enum_names() {
        let key = OperationSynthesis::parse("EARPF_SIN").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"{"variable":"Earpf","resolution":"Sin"}"#);
    }
}
