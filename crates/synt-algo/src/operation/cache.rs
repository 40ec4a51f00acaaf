use std::collections::HashMap;
use synt_core::dependencies::must_cache;
use synt_core::OperationSynthesis;

use crate::operation::frame::SynthesisFrame;

/// Results kept for the length of one synthesis run.
///
/// Only keys that another synthesis depends on are stored.
#[derive(Debug, Default)]
pub struct SynthesisCache {
    frames: HashMap<OperationSynthesis, SynthesisFrame>,
    hits: usize,
    misses: usize,
}

impl SynthesisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, synthesis: &OperationSynthesis) -> Option<SynthesisFrame> {
        match self.frames.get(synthesis) {
            Some(frame) => {
                self.hits += 1;
                Some(frame.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Stores `frame` when `synthesis` is a dependency of some other key.
    pub fn store(&mut self, synthesis: OperationSynthesis, frame: &SynthesisFrame) -> bool {
        if !must_cache(&synthesis) {
            return false;
        }
        self.frames.insert(synthesis, frame.clone());
        true
    }

    pub fn contains(&self, synthesis: &OperationSynthesis) -> bool {
        self.frames.contains_key(synthesis)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synt_core::SpatialResolution;

    #[test]
    fn only_dependencies_are_stored() {
        let mut cache = SynthesisCache::new();
        let frame = SynthesisFrame::new(SpatialResolution::Sbm, Vec::new());
        let dependency = OperationSynthesis::parse("EARMF_SBM").unwrap();
        let leaf = OperationSynthesis::parse("CMO_SBM").unwrap();

        assert!(cache.store(dependency, &frame));
        assert!(!cache.store(leaf, &frame));
        assert!(cache.get(&dependency).is_some());
        assert!(cache.get(&leaf).is_none());
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.hits(), 0);
    }
}
