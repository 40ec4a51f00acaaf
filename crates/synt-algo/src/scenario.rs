//! Scenario probabilities on the expanded grid.

use anyhow::Result;
use polars::prelude::DataFrame;
use synt_core::SyntError;
use synt_io::{Exporter, FileRepository};

use crate::deck::Deck;
use crate::synthesizer::{export_tables, select_names, SynthesisReport, Synthesizer};

pub const SCENARIO_SYNTHESES: [&str; 1] = ["PROBABILIDADES"];

pub struct ScenarioSynthesizer<'d, R: FileRepository> {
    deck: &'d mut Deck<R>,
}

impl<'d, R: FileRepository> ScenarioSynthesizer<'d, R> {
    pub fn new(deck: &'d mut Deck<R>) -> Self {
        ScenarioSynthesizer { deck }
    }

    pub fn table(&mut self, name: &str) -> Result<DataFrame> {
        match name {
            "PROBABILIDADES" => Ok(self.deck.probabilities()?),
            other => Err(SyntError::UnknownVariable(other.to_string()).into()),
        }
    }
}

impl<'d, R: FileRepository> Synthesizer for ScenarioSynthesizer<'d, R> {
    fn name(&self) -> &'static str {
        "cenarios"
    }

    fn synthesize(&mut self, tokens: &[String], exporter: &mut dyn Exporter) -> Result<SynthesisReport> {
        let names = select_names(tokens, &SCENARIO_SYNTHESES)?;
        let name = self.name();
        Ok(export_tables(name, &names, exporter, |table| {
            self.table(table).map(Some)
        }))
    }
}
