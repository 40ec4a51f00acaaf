//! Execution metadata: program, convergence, timing, costs and violations.

use anyhow::{Context, Result};
use polars::prelude::*;
use synt_core::{SyntError, SyntResult};
use synt_io::{Exporter, FileKind, FileRepository};
use tracing::debug;

use crate::deck::Deck;
use crate::infeasibility::{classify, infeasibilities_frame, violation_records, ClassifierContext};
use crate::synthesizer::{export_tables, select_names, SynthesisReport, Synthesizer};

pub const EXECUTION_SYNTHESES: [&str; 5] =
    ["PROGRAMA", "CONVERGENCIA", "TEMPO", "CUSTOS", "INVIABILIDADES"];

/// Model whose outputs this workspace reads.
pub const PROGRAM: &str = "DECOMP";

pub struct ExecutionSynthesizer<'d, R: FileRepository> {
    deck: &'d mut Deck<R>,
}

impl<'d, R: FileRepository> ExecutionSynthesizer<'d, R> {
    pub fn new(deck: &'d mut Deck<R>) -> Self {
        ExecutionSynthesizer { deck }
    }

    /// Program name and the first schema version declared by any file.
    fn program(&mut self) -> SyntResult<DataFrame> {
        let repository = self.deck.repository();
        let mut version = String::new();
        for kind in FileKind::ALL {
            if !repository.has_file(kind) {
                continue;
            }
            if let Some(declared) = repository.file(kind)?.version() {
                version = declared.to_string();
                break;
            }
        }
        Ok(df![
            "programa" => &[PROGRAM],
            "versao" => &[version.as_str()]
        ]?)
    }

    /// Classified violations, `None` when the run left no violation log.
    fn infeasibilities(&mut self) -> Result<Option<DataFrame>> {
        let Some(log) = self.deck.violation_log()? else {
            debug!("no violation log in this case");
            return Ok(None);
        };
        let context = ClassifierContext::from_deck(self.deck)?;
        let items = violation_records(&log)?
            .iter()
            .map(|record| {
                classify(record, &context).with_context(|| {
                    format!(
                        "classifying '{}' (iteration {}, stage {})",
                        record.message, record.iteration, record.stage
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(infeasibilities_frame(&items)?))
    }

    pub fn table(&mut self, name: &str) -> Result<Option<DataFrame>> {
        let df = match name {
            "PROGRAMA" => self.program()?,
            "CONVERGENCIA" => self.deck.convergence()?,
            "TEMPO" => self.deck.run_times()?,
            "CUSTOS" => self.deck.cost_breakdown()?,
            "INVIABILIDADES" => return self.infeasibilities(),
            other => return Err(SyntError::UnknownVariable(other.to_string()).into()),
        };
        Ok(Some(df))
    }
}

impl<'d, R: FileRepository> Synthesizer for ExecutionSynthesizer<'d, R> {
    fn name(&self) -> &'static str {
        "execucao"
    }

    fn synthesize(&mut self, tokens: &[String], exporter: &mut dyn Exporter) -> Result<SynthesisReport> {
        let names = select_names(tokens, &EXECUTION_SYNTHESES)?;
        let name = self.name();
        Ok(export_tables(name, &names, exporter, |table| self.table(table)))
    }
}
