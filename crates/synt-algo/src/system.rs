//! Registration tables of the studied system.

use anyhow::Result;
use polars::prelude::DataFrame;
use synt_core::SyntError;
use synt_io::{Exporter, FileRepository};

use crate::deck::Deck;
use crate::synthesizer::{export_tables, select_names, SynthesisReport, Synthesizer};

/// Tables in export order.
pub const SYSTEM_SYNTHESES: [&str; 6] = ["EST", "PAT", "SBM", "REE", "UTE", "UHE"];

pub struct SystemSynthesizer<'d, R: FileRepository> {
    deck: &'d mut Deck<R>,
}

impl<'d, R: FileRepository> SystemSynthesizer<'d, R> {
    pub fn new(deck: &'d mut Deck<R>) -> Self {
        SystemSynthesizer { deck }
    }

    pub fn table(&mut self, name: &str) -> Result<DataFrame> {
        let df = match name {
            "EST" => self.deck.stages_durations()?,
            "PAT" => self.deck.blocks_durations()?,
            "SBM" => self.deck.submarkets()?,
            "REE" => self.deck.rees()?,
            "UTE" => self.deck.thermal_plants()?,
            "UHE" => self.deck.hydro_plants()?,
            other => return Err(SyntError::UnknownVariable(other.to_string()).into()),
        };
        Ok(df)
    }
}

impl<'d, R: FileRepository> Synthesizer for SystemSynthesizer<'d, R> {
    fn name(&self) -> &'static str {
        "sistema"
    }

    fn synthesize(&mut self, tokens: &[String], exporter: &mut dyn Exporter) -> Result<SynthesisReport> {
        let names = select_names(tokens, &SYSTEM_SYNTHESES)?;
        let name = self.name();
        Ok(export_tables(name, &names, exporter, |table| {
            self.table(table).map(Some)
        }))
    }
}
