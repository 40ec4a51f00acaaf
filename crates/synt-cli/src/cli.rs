use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "synt", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level (defaults to the settings file, then "info")
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    /// Directory holding the case files (overrides SYNT_DIR)
    #[arg(long, global = true)]
    pub diretorio: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Registration tables: EST, PAT, SBM, REE, UTE, UHE
    Sistema(SynthesisArgs),
    /// Execution tables: PROGRAMA, CONVERGENCIA, TEMPO, CUSTOS, INVIABILIDADES
    Execucao(SynthesisArgs),
    /// Scenario tables: PROBABILIDADES
    Cenarios(SynthesisArgs),
    /// Operation syntheses named VAR_RES (e.g. CMO_SBM, EARPF_SIN)
    Operacao(SynthesisArgs),
    /// Every synthesis of every group over one shared deck; names are ignored
    Completa(SynthesisArgs),
    /// Remove the synthesis directory; names are ignored
    Limpeza(SynthesisArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SynthesisArgs {
    /// Names to synthesize; `*` and `?` wildcards allowed. Empty means all.
    pub variaveis: Vec<String>,

    /// Output format
    #[arg(long)]
    pub formato: Option<String>,
}

impl Commands {
    /// Output format requested on the command line, if any.
    pub fn format(&self) -> Option<&str> {
        self.args().formato.as_deref()
    }

    pub fn args(&self) -> &SynthesisArgs {
        match self {
            Commands::Sistema(args)
            | Commands::Execucao(args)
            | Commands::Cenarios(args)
            | Commands::Operacao(args)
            | Commands::Completa(args)
            | Commands::Limpeza(args) => args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn variables_and_format_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "synt",
            "--log-level",
            "debug",
            "operacao",
            "CMO_SBM",
            "EARP?_*",
            "--formato",
            "csv",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Some(tracing::Level::DEBUG));
        let Commands::Operacao(args) = &cli.command else {
            panic!("expected operacao, got {:?}", cli.command);
        };
        assert_eq!(args.variaveis, vec!["CMO_SBM", "EARP?_*"]);
        assert_eq!(cli.command.format(), Some("csv"));
    }

    #[test]
    fn directory_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["synt", "limpeza", "--diretorio", "/tmp/caso"]).unwrap();
        assert_eq!(cli.diretorio, Some(PathBuf::from("/tmp/caso")));
        assert!(matches!(cli.command, Commands::Limpeza(_)));
    }

    #[test]
    fn every_subcommand_takes_a_variable_list() {
        for name in ["sistema", "execucao", "cenarios", "operacao", "completa", "limpeza"] {
            let cli = Cli::try_parse_from(["synt", name, "CMO_SBM", "EST", "--formato", "csv"])
                .unwrap_or_else(|e| panic!("{name}: {e}"));
            assert_eq!(cli.command.args().variaveis, vec!["CMO_SBM", "EST"], "{name}");
            assert_eq!(cli.command.format(), Some("csv"), "{name}");
        }
    }
}
