//! Static dependency table between syntheses.
//!
//! A derived key lists the keys it is computed from (system stored energy
//! needs submarket stored energy, total spillage needs both spillage parts).
//! The table is acyclic by construction; [`expand`] orders a request so that
//! every prerequisite precedes its dependents.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::synthesis::{OperationSynthesis, SpatialResolution as R, Variable as V};

const fn key(variable: V, resolution: R) -> OperationSynthesis {
    OperationSynthesis::new(variable, resolution)
}

const GHID_UHE: OperationSynthesis = key(V::Ghid, R::Uhe);
const GHID_SBM: OperationSynthesis = key(V::Ghid, R::Sbm);
const VARMI_UHE: OperationSynthesis = key(V::Varmi, R::Uhe);
const VARMF_UHE: OperationSynthesis = key(V::Varmf, R::Uhe);
const QVERT_UHE: OperationSynthesis = key(V::Qvert, R::Uhe);
const QVERNT_UHE: OperationSynthesis = key(V::Qvernt, R::Uhe);
const EARMI_SBM: OperationSynthesis = key(V::Earmi, R::Sbm);
const EARMF_SBM: OperationSynthesis = key(V::Earmf, R::Sbm);
const CTER_SBM: OperationSynthesis = key(V::Cter, R::Sbm);
const ENAA_SBM: OperationSynthesis = key(V::Enaa, R::Sbm);
const GTER_SBM: OperationSynthesis = key(V::Gter, R::Sbm);
const GEOL_SBM: OperationSynthesis = key(V::Geol, R::Sbm);
const DEF_SBM: OperationSynthesis = key(V::Def, R::Sbm);
const MER_SBM: OperationSynthesis = key(V::Mer, R::Sbm);

/// Direct prerequisites of `synthesis` (empty for keys read straight from the deck).
pub fn dependencies(synthesis: &OperationSynthesis) -> &'static [OperationSynthesis] {
    match (synthesis.variable, synthesis.resolution) {
        (V::Ghid, R::Ree) => &[GHID_UHE],
        (V::Ghid, R::Sin) => &[GHID_SBM],
        (V::Varmi, R::Ree | R::Sbm | R::Sin) => &[VARMI_UHE],
        (V::Varmf, R::Ree | R::Sbm | R::Sin) => &[VARMF_UHE],
        (V::Varpi, R::Ree | R::Sbm | R::Sin) => &[VARMI_UHE],
        (V::Varpf, R::Ree | R::Sbm | R::Sin) => &[VARMF_UHE],
        (V::Qver, R::Uhe) => &[QVERT_UHE, QVERNT_UHE],
        (V::Earmi, R::Sin) | (V::Earpi, R::Sin) => &[EARMI_SBM],
        (V::Earmf, R::Sin) | (V::Earpf, R::Sin) => &[EARMF_SBM],
        (V::Cter, R::Sin) => &[CTER_SBM],
        (V::Enaa, R::Sin) => &[ENAA_SBM],
        (V::Gter, R::Sin) => &[GTER_SBM],
        (V::Geol, R::Sin) => &[GEOL_SBM],
        (V::Def, R::Sin) => &[DEF_SBM],
        (V::Mer, R::Sin) => &[MER_SBM],
        _ => &[],
    }
}

static MUST_CACHE: Lazy<HashSet<OperationSynthesis>> = Lazy::new(|| {
    let mut keys = HashSet::new();
    for variable in V::ALL {
        for resolution in R::ALL {
            let synthesis = OperationSynthesis::new(*variable, *resolution);
            keys.extend(dependencies(&synthesis).iter().copied());
        }
    }
    keys
});

/// Whether `synthesis` is a prerequisite of at least one other key.
pub fn must_cache(synthesis: &OperationSynthesis) -> bool {
    MUST_CACHE.contains(synthesis)
}

/// Expands `requested` with its transitive prerequisites.
///
/// Depth-first, keeping first appearance order and dropping duplicates; every
/// key appears after all of its dependencies.
pub fn expand(requested: &[OperationSynthesis]) -> Vec<OperationSynthesis> {
    fn visit(
        synthesis: OperationSynthesis,
        seen: &mut HashSet<OperationSynthesis>,
        ordered: &mut Vec<OperationSynthesis>,
    ) {
        if !seen.insert(synthesis) {
            return;
        }
        for dependency in dependencies(&synthesis) {
            visit(*dependency, seen, ordered);
        }
        ordered.push(synthesis);
    }

    let mut seen = HashSet::new();
    let mut ordered = Vec::with_capacity(requested.len());
    for synthesis in requested {
        visit(*synthesis, &mut seen, &mut ordered);
    }
    ordered
}
