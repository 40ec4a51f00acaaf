//! Rule table: how each supported synthesis is resolved.

use synt_core::{OperationSynthesis, SpatialResolution, Variable};

use crate::deck::GERACAO_TERMICA_TOTAL;

/// Deck dataset a column rule reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    DecOperSist,
    DecOperRee,
    DecOperUsih,
    DecOperUsit,
    DecOperInterc,
    OperationCosts,
}

/// Denominator of a recomputed percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// Maximum stored energy of each submarket and stage.
    StorageEnergy,
    /// Useful volume (maximum minus minimum) of each plant; the numerator is
    /// offset by the minimum volume.
    UsefulVolume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One column of a deck dataset.
    Column { source: Source, column: &'static str },
    /// Sum of a finer synthesis over the coarser entities.
    Group { source: OperationSynthesis },
    /// Row-wise sum of syntheses at the same resolution.
    Sum { parts: &'static [OperationSynthesis] },
    /// 100 × absolute / capacity, both summed at the target resolution.
    Percentage {
        absolute: OperationSynthesis,
        capacity: Capacity,
    },
}

impl Strategy {
    /// Whether the values are derived from other syntheses.
    pub fn is_calculated(&self) -> bool {
        !matches!(self, Strategy::Column { .. })
    }
}

const fn key(variable: Variable, resolution: SpatialResolution) -> OperationSynthesis {
    OperationSynthesis::new(variable, resolution)
}

const SPILLAGE_PARTS: &[OperationSynthesis] = &[
    key(Variable::Qvert, SpatialResolution::Uhe),
    key(Variable::Qvernt, SpatialResolution::Uhe),
];

pub fn strategy(synthesis: &OperationSynthesis) -> Option<Strategy> {
    use SpatialResolution as R;
    use Variable as V;

    let column = |source, column| Some(Strategy::Column { source, column });
    let group = |variable, resolution| {
        Some(Strategy::Group {
            source: key(variable, resolution),
        })
    };
    match (synthesis.variable, synthesis.resolution) {
        (V::Cmo, R::Sbm) => column(Source::DecOperSist, "cmo"),
        (V::Cter, R::Sbm) => column(Source::DecOperSist, "custo_geracao_termica"),
        (V::Earmi, R::Sbm) => column(Source::DecOperSist, "earm_inicial_MWmes"),
        (V::Earmf, R::Sbm) => column(Source::DecOperSist, "earm_final_MWmes"),
        (V::Earpi, R::Sbm) => column(Source::DecOperSist, "earm_inicial_percentual"),
        (V::Earpf, R::Sbm) => column(Source::DecOperSist, "earm_final_percentual"),
        (V::Enaa, R::Sbm) => column(Source::DecOperSist, "ena_MWmes"),
        (V::Ghid, R::Sbm) => column(Source::DecOperSist, "geracao_hidraulica_MW"),
        (V::Gter, R::Sbm) => column(Source::DecOperSist, GERACAO_TERMICA_TOTAL),
        (V::Geol, R::Sbm) => column(Source::DecOperSist, "geracao_eolica_MW"),
        (V::Def, R::Sbm) => column(Source::DecOperSist, "deficit_MW"),
        (V::Mer, R::Sbm) => column(Source::DecOperSist, "demanda_MW"),

        (V::Earmi, R::Ree) => column(Source::DecOperRee, "earm_inicial_MWmes"),
        (V::Earmf, R::Ree) => column(Source::DecOperRee, "earm_final_MWmes"),
        (V::Earpi, R::Ree) => column(Source::DecOperRee, "earm_inicial_percentual"),
        (V::Earpf, R::Ree) => column(Source::DecOperRee, "earm_final_percentual"),
        (V::Enaa, R::Ree) => column(Source::DecOperRee, "ena_MWmes"),

        (V::Varmi, R::Uhe) => column(Source::DecOperUsih, "volume_inicial_hm3"),
        (V::Varmf, R::Uhe) => column(Source::DecOperUsih, "volume_final_hm3"),
        (V::Varpi, R::Uhe) => column(Source::DecOperUsih, "volume_inicial_percentual"),
        (V::Varpf, R::Uhe) => column(Source::DecOperUsih, "volume_final_percentual"),
        (V::Qafl, R::Uhe) => column(Source::DecOperUsih, "vazao_afluente_m3s"),
        (V::Qinc, R::Uhe) => column(Source::DecOperUsih, "vazao_incremental_m3s"),
        (V::Qdef, R::Uhe) => column(Source::DecOperUsih, "vazao_defluente_m3s"),
        (V::Qtur, R::Uhe) => column(Source::DecOperUsih, "vazao_turbinada_m3s"),
        (V::Qvert, R::Uhe) => column(Source::DecOperUsih, "vazao_vertida_turbinavel_m3s"),
        (V::Qvernt, R::Uhe) => column(Source::DecOperUsih, "vazao_vertida_nao_turbinavel_m3s"),
        (V::Ghid, R::Uhe) => column(Source::DecOperUsih, "geracao_hidraulica_MW"),
        (V::Qver, R::Uhe) => Some(Strategy::Sum {
            parts: SPILLAGE_PARTS,
        }),

        (V::Gter, R::Ute) => column(Source::DecOperUsit, "geracao_termica_MW"),
        (V::Cter, R::Ute) => column(Source::DecOperUsit, "custo_geracao_termica"),

        (V::Int, R::Sbp) => column(Source::DecOperInterc, "intercambio_MW"),

        (V::Cop, R::Sin) => column(Source::OperationCosts, "custo_presente"),
        (V::Cfu, R::Sin) => column(Source::OperationCosts, "custo_futuro"),

        (V::Ghid, R::Ree) => group(V::Ghid, R::Uhe),
        (V::Varmi, R::Ree | R::Sbm | R::Sin) => group(V::Varmi, R::Uhe),
        (V::Varmf, R::Ree | R::Sbm | R::Sin) => group(V::Varmf, R::Uhe),
        (
            V::Cter | V::Earmi | V::Earmf | V::Enaa | V::Ghid | V::Gter | V::Geol | V::Def | V::Mer,
            R::Sin,
        ) => group(synthesis.variable, R::Sbm),

        (V::Earpi, R::Sin) => Some(Strategy::Percentage {
            absolute: key(V::Earmi, R::Sbm),
            capacity: Capacity::StorageEnergy,
        }),
        (V::Earpf, R::Sin) => Some(Strategy::Percentage {
            absolute: key(V::Earmf, R::Sbm),
            capacity: Capacity::StorageEnergy,
        }),
        (V::Varpi, R::Ree | R::Sbm | R::Sin) => Some(Strategy::Percentage {
            absolute: key(V::Varmi, R::Uhe),
            capacity: Capacity::UsefulVolume,
        }),
        (V::Varpf, R::Ree | R::Sbm | R::Sin) => Some(Strategy::Percentage {
            absolute: key(V::Varmf, R::Uhe),
            capacity: Capacity::UsefulVolume,
        }),

        _ => None,
    }
}

/// Every key with a rule, in variable then resolution order.
pub fn supported_keys() -> Vec<OperationSynthesis> {
    Variable::ALL
        .iter()
        .flat_map(|variable| {
            SpatialResolution::ALL
                .iter()
                .map(move |resolution| key(*variable, *resolution))
        })
        .filter(|synthesis| strategy(synthesis).is_some())
        .collect()
}
