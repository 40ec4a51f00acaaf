use anyhow::{Context, Result};
use std::path::Path;
use synt_algo::{
    Deck, ExecutionSynthesizer, OperationSynthesizer, ScenarioSynthesizer, SynthesisReport,
    Synthesizer, SystemSynthesizer,
};
use synt_io::{DirectoryExporter, DirectoryRepository, Exporter, OutputFormat};
use tracing::{info, warn};

use crate::cli::{Commands, SynthesisArgs};
use crate::settings::Settings;

/// Runs one subcommand against the case in `base_dir`.
///
/// Errors are fatal to the whole command. Failures of single syntheses are
/// logged and listed in the returned report.
pub fn run(command: &Commands, settings: &Settings, base_dir: &Path) -> Result<SynthesisReport> {
    let format = match command.format() {
        Some(value) => value.parse::<OutputFormat>()?,
        None => settings.format,
    };
    let mut exporter = DirectoryExporter::new(settings.synthesis_path(base_dir), format);

    if let Commands::Completa(args) | Commands::Limpeza(args) = command {
        if !args.variaveis.is_empty() {
            warn!(ignored = ?args.variaveis, "this command acts on every synthesis");
        }
    }
    if let Commands::Limpeza(_) = command {
        exporter.clean()?;
        return Ok(SynthesisReport::default());
    }

    let repository = DirectoryRepository::open(base_dir)
        .with_context(|| format!("opening case in '{}'", base_dir.display()))?;
    let mut deck = Deck::new(repository);
    let report = match command {
        Commands::Sistema(args) => synthesize(SystemSynthesizer::new(&mut deck), args, &mut exporter)?,
        Commands::Execucao(args) => {
            synthesize(ExecutionSynthesizer::new(&mut deck), args, &mut exporter)?
        }
        Commands::Cenarios(args) => {
            synthesize(ScenarioSynthesizer::new(&mut deck), args, &mut exporter)?
        }
        Commands::Operacao(args) => {
            synthesize(OperationSynthesizer::new(&mut deck), args, &mut exporter)?
        }
        Commands::Completa(_) => {
            let all = SynthesisArgs::default();
            let mut report = synthesize(SystemSynthesizer::new(&mut deck), &all, &mut exporter)?;
            report.merge(synthesize(ExecutionSynthesizer::new(&mut deck), &all, &mut exporter)?);
            report.merge(synthesize(ScenarioSynthesizer::new(&mut deck), &all, &mut exporter)?);
            report.merge(synthesize(OperationSynthesizer::new(&mut deck), &all, &mut exporter)?);
            report
        }
        Commands::Limpeza(_) => SynthesisReport::default(),
    };
    Ok(report)
}

fn synthesize<S: Synthesizer>(
    mut synthesizer: S,
    args: &SynthesisArgs,
    exporter: &mut DirectoryExporter,
) -> Result<SynthesisReport> {
    let name = synthesizer.name();
    info!(synthesizer = name, dir = %exporter.dir().display(), "starting");
    let report = synthesizer
        .synthesize(&args.variaveis, exporter)
        .with_context(|| format!("running '{name}'"))?;
    if report.is_complete() {
        info!(synthesizer = name, exported = report.succeeded.len(), "finished");
    } else {
        warn!(
            synthesizer = name,
            exported = report.succeeded.len(),
            failed = ?report.failed,
            "finished with failures"
        );
    }
    Ok(report)
}
