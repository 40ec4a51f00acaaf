//! Shared contract of the synthesizers behind each CLI subcommand.

use anyhow::Result;
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use synt_core::{SyntError, SyntResult};
use synt_io::frame::{cast_column, has_column, str_values, take_rows};
use synt_io::Exporter;
use tracing::{error, info, warn};

/// Outcome of one batch: keys written and keys skipped after an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl SynthesisReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: SynthesisReport) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }
}

pub trait Synthesizer {
    /// Subcommand name, used in logs.
    fn name(&self) -> &'static str;

    /// Writes every synthesis selected by `tokens` (all of them when empty).
    ///
    /// Unknown tokens abort before anything is written. Failures of single
    /// keys are logged and reported in [`SynthesisReport::failed`].
    fn synthesize(&mut self, tokens: &[String], exporter: &mut dyn Exporter)
        -> Result<SynthesisReport>;
}

pub fn is_wildcard(token: &str) -> bool {
    token.contains(['*', '?'])
}

/// Anchored regex for a glob pattern: `*` matches any run, `?` one character.
pub fn wildcard(pattern: &str) -> SyntResult<Regex> {
    let mut expression = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expression.push_str(".*"),
            '?' => expression.push('.'),
            c => expression.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    expression.push('$');
    Regex::new(&expression)
        .map_err(|e| SyntError::Other(format!("invalid pattern '{pattern}': {e}")))
}

/// Names of `supported` selected by `tokens`, in `supported` order.
///
/// Used by the synthesizers whose keys are plain table names.
pub fn select_names(tokens: &[String], supported: &[&'static str]) -> SyntResult<Vec<&'static str>> {
    if tokens.is_empty() {
        return Ok(supported.to_vec());
    }
    let mut selected = vec![false; supported.len()];
    for token in tokens {
        let token = token.trim().to_uppercase();
        if is_wildcard(&token) {
            let pattern = wildcard(&token)?;
            for (flag, name) in selected.iter_mut().zip(supported) {
                *flag |= pattern.is_match(name);
            }
            continue;
        }
        let position = supported
            .iter()
            .position(|name| *name == token)
            .ok_or_else(|| SyntError::UnknownVariable(token.clone()))?;
        selected[position] = true;
    }
    Ok(supported
        .iter()
        .zip(selected)
        .filter_map(|(name, keep)| keep.then_some(*name))
        .collect())
}

/// Builds and writes each of `names`, logging and skipping failures.
///
/// `build` returns `None` for a table that has nothing to export.
pub fn export_tables<F>(
    synthesizer: &str,
    names: &[&'static str],
    exporter: &mut dyn Exporter,
    mut build: F,
) -> SynthesisReport
where
    F: FnMut(&str) -> Result<Option<DataFrame>>,
{
    let mut report = SynthesisReport::default();
    for &name in names {
        info!(synthesizer, name, "synthesizing");
        let outcome = build(name).and_then(|table| match table {
            Some(mut df) => exporter.write(name, &mut df).map(|()| true),
            None => Ok(false),
        });
        match outcome {
            Ok(true) => report.succeeded.push(name.to_string()),
            Ok(false) => info!(synthesizer, name, "nothing to export"),
            Err(e) => {
                error!(synthesizer, name, "synthesis failed, skipping: {e:#}");
                report.failed.push(name.to_string());
            }
        }
    }
    info!(
        synthesizer,
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "synthesis finished"
    );
    report
}

/// Appends `fresh` to the rows of `previous` whose `key_column` is not in
/// `replaced`.
///
/// Previous columns are cast to the fresh dtypes and reordered to match.
/// When the previous table lacks any fresh column it is discarded.
pub fn merge_by_key(
    previous: Option<DataFrame>,
    fresh: DataFrame,
    key_column: &str,
    replaced: &[String],
) -> SyntResult<DataFrame> {
    let Some(previous) = previous else {
        return Ok(fresh);
    };
    let names = fresh.get_column_names();
    if let Some(missing) = names.iter().find(|name| !has_column(&previous, name)) {
        warn!(column = %missing, "previous export has a different layout, overwriting");
        return Ok(fresh);
    }
    let keys = str_values(&previous, key_column)?;
    let kept: Vec<usize> = keys
        .iter()
        .enumerate()
        .filter(|(_, key)| !replaced.contains(key))
        .map(|(row, _)| row)
        .collect();
    let mut merged = take_rows(&previous, &kept)?.select(names)?;
    for series in fresh.get_columns() {
        cast_column(&mut merged, series.name(), series.dtype())?;
    }
    merged.vstack_mut(&fresh)?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn glob_patterns_are_anchored() {
        let pattern = wildcard("EARM?_*").unwrap();
        assert!(pattern.is_match("EARMF_SIN"));
        assert!(!pattern.is_match("EARPF_SIN"));
        assert!(!pattern.is_match("XEARMF_SIN"));
        assert!(wildcard("Q.V*").unwrap().is_match("Q.VER"));
        assert!(!wildcard("Q.V*").unwrap().is_match("QXVER"));
    }

    #[test]
    fn names_keep_their_declared_order() {
        let supported = ["EST", "PAT", "SBM", "REE"];
        assert_eq!(select_names(&[], &supported).unwrap(), supported.to_vec());
        assert_eq!(
            select_names(&tokens(&["ree", "est"]), &supported).unwrap(),
            vec!["EST", "REE"]
        );
        assert_eq!(
            select_names(&tokens(&["?B*"]), &supported).unwrap(),
            vec!["SBM"]
        );
        assert!(matches!(
            select_names(&tokens(&["UEE"]), &supported),
            Err(SyntError::UnknownVariable(_))
        ));
    }

    #[test]
    fn failed_tables_do_not_stop_the_batch() {
        let mut exporter = synt_io::MemoryExporter::new();
        let report = export_tables("teste", &["A", "B", "C"], &mut exporter, |name| match name {
            "A" => Ok(Some(df!["x" => &[1i64]]?)),
            "B" => anyhow::bail!("broken"),
            _ => Ok(None),
        });
        assert_eq!(report.succeeded, vec!["A"]);
        assert_eq!(report.failed, vec!["B"]);
        assert!(!report.is_complete());
        assert_eq!(exporter.len(), 1);
    }

    #[test]
    fn merging_replaces_rows_by_key() {
        let previous = df![
            "chave" => &["CMO_SBM", "GHID_UHE"],
            "valor" => &[1i64, 2]
        ]
        .unwrap();
        let fresh = df![
            "chave" => &["GHID_UHE"],
            "valor" => &[20.0f64]
        ]
        .unwrap();
        let merged = merge_by_key(Some(previous), fresh, "chave", &["GHID_UHE".into()]).unwrap();
        assert_eq!(merged.height(), 2);
        assert_eq!(str_values(&merged, "chave").unwrap(), vec!["CMO_SBM", "GHID_UHE"]);
        assert_eq!(merged.column("valor").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn incompatible_exports_are_overwritten() {
        let previous = df!["chave" => &["CMO_SBM"]].unwrap();
        let fresh = df!["chave" => &["CMO_SBM"], "valor" => &[1.0f64]].unwrap();
        let merged = merge_by_key(Some(previous), fresh, "chave", &[]).unwrap();
        assert_eq!(merged.get_column_names(), vec!["chave", "valor"]);
        assert_eq!(merged.height(), 1);
    }
}
