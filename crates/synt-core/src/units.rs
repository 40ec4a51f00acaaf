//! Physical units attached to each synthesis for reporting.
//!
//! Units are metadata only: nothing in the engine converts between them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::synthesis::{OperationSynthesis, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Currency (R$)
    Currency,
    /// Marginal cost (R$/MWh)
    CurrencyPerMwh,
    /// Energy (MWmes)
    MwMonth,
    /// Average power (MWmed)
    MwAverage,
    /// Volume (hm3)
    Hm3,
    /// Flow (m3/s)
    M3s,
    /// Percentage (%)
    Percent,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Currency => "R$",
            Unit::CurrencyPerMwh => "R$/MWh",
            Unit::MwMonth => "MWmes",
            Unit::MwAverage => "MWmed",
            Unit::Hm3 => "hm3",
            Unit::M3s => "m3/s",
            Unit::Percent => "%",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of the values exported for `synthesis`.
pub fn unit(synthesis: &OperationSynthesis) -> Unit {
    match synthesis.variable {
        Variable::Cmo => Unit::CurrencyPerMwh,
        Variable::Cter | Variable::Cop | Variable::Cfu => Unit::Currency,
        Variable::Earmi | Variable::Earmf | Variable::Enaa => Unit::MwMonth,
        Variable::Earpi | Variable::Earpf | Variable::Varpi | Variable::Varpf => Unit::Percent,
        Variable::Ghid
        | Variable::Gter
        | Variable::Geol
        | Variable::Int
        | Variable::Def
        | Variable::Mer => Unit::MwAverage,
        Variable::Qafl
        | Variable::Qinc
        | Variable::Qdef
        | Variable::Qtur
        | Variable::Qver
        | Variable::Qvert
        | Variable::Qvernt => Unit::M3s,
        Variable::Varmi | Variable::Varmf => Unit::Hm3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_follow_the_variable() {
        let cmo = OperationSynthesis::parse("CMO_SBM").unwrap();
        let earp = OperationSynthesis::parse("EARPF_SIN").unwrap();
        let qtur = OperationSynthesis::parse("QTUR_UHE").unwrap();
        assert_eq!(unit(&cmo).as_str(), "R$/MWh");
        assert_eq!(unit(&earp), Unit::Percent);
        assert_eq!(unit(&qtur).to_string(), "m3/s");
    }
}
