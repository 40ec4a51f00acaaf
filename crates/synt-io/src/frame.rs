//! Column access helpers over polars frames.
//!
//! Parsed tables come from an external library with loosely typed columns
//! (integers stored as floats, codes stored as strings). These helpers cast
//! on the way out so the rest of the pipeline works with plain vectors.

use polars::prelude::*;
use synt_core::{SyntError, SyntResult};

/// Fails with [`SyntError::MissingColumn`] unless every column is present.
pub fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> SyntResult<()> {
    let names = df.get_column_names();
    for column in columns {
        if !names.contains(column) {
            return Err(SyntError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

pub fn column<'a>(df: &'a DataFrame, name: &str) -> SyntResult<&'a Series> {
    df.column(name).map_err(|_| SyntError::MissingColumn {
        table: format!("{:?}", df.get_column_names()),
        column: name.to_string(),
    })
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().contains(&name)
}

pub fn i64_values(df: &DataFrame, name: &str) -> SyntResult<Vec<i64>> {
    let series = column(df, name)?.cast(&DataType::Int64)?;
    let values = series.i64()?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.ok_or_else(|| null_value(name, row)))
        .collect()
}

pub fn f64_values(df: &DataFrame, name: &str) -> SyntResult<Vec<f64>> {
    let series = column(df, name)?.cast(&DataType::Float64)?;
    let values = series.f64()?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.ok_or_else(|| null_value(name, row)))
        .collect()
}

/// Like [`f64_values`], keeping nulls (an absent limit, an empty cell).
pub fn optional_f64_values(df: &DataFrame, name: &str) -> SyntResult<Vec<Option<f64>>> {
    let series = column(df, name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

pub fn str_values(df: &DataFrame, name: &str) -> SyntResult<Vec<String>> {
    let series = column(df, name)?.cast(&DataType::Utf8)?;
    let values = series.utf8()?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .map(|v| v.trim().to_string())
                .ok_or_else(|| null_value(name, row))
        })
        .collect()
}

fn null_value(name: &str, row: usize) -> SyntError {
    SyntError::Other(format!("null value in column '{name}' at row {row}"))
}

/// Gathers `indices` (in order, repeats allowed) into a new frame.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> SyntResult<DataFrame> {
    let indices: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::new("row_idx", indices.as_slice());
    Ok(df.take(&idx)?)
}

/// Stable ascending sort of the rows by `keys`, first key outermost.
pub fn sort_by(df: &DataFrame, keys: &[&str]) -> SyntResult<DataFrame> {
    Ok(df.sort(keys, vec![false; keys.len()], true)?)
}

pub fn with_i64(df: &mut DataFrame, name: &str, values: Vec<i64>) -> SyntResult<()> {
    df.with_column(Series::new(name, values))?;
    Ok(())
}

pub fn with_f64(df: &mut DataFrame, name: &str, values: Vec<f64>) -> SyntResult<()> {
    df.with_column(Series::new(name, values))?;
    Ok(())
}

pub fn with_str(df: &mut DataFrame, name: &str, values: Vec<String>) -> SyntResult<()> {
    df.with_column(Series::new(name, values))?;
    Ok(())
}

/// Casts `name` in place so frames built from different sources stack cleanly.
pub fn cast_column(df: &mut DataFrame, name: &str, dtype: &DataType) -> SyntResult<()> {
    let cast = column(df, name)?.cast(dtype)?;
    df.with_column(cast)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_columns_are_cast() {
        let df = df!["estagio" => &[1.0f64, 2.0, 3.0]].unwrap();
        assert_eq!(i64_values(&df, "estagio").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn missing_columns_are_reported() {
        let df = df!["estagio" => &[1i64]].unwrap();
        let err = require_columns(&df, "dp", &["estagio", "duracao"]).unwrap_err();
        assert!(err.to_string().contains("duracao"));
        assert!(i64_values(&df, "cenario").is_err());
    }

    #[test]
    fn nulls_are_kept_only_when_asked() {
        let df = df!["limite" => &[Some(1.0f64), None]].unwrap();
        assert!(f64_values(&df, "limite").is_err());
        assert_eq!(
            optional_f64_values(&df, "limite").unwrap(),
            vec![Some(1.0), None]
        );
    }

    #[test]
    fn sorting_uses_every_key() {
        let df = df![
            "a" => &[2i64, 1, 1],
            "b" => &[1i64, 2, 1],
            "v" => &["x", "y", "z"]
        ]
        .unwrap();
        let sorted = sort_by(&df, &["a", "b"]).unwrap();
        assert_eq!(str_values(&sorted, "v").unwrap(), vec!["z", "y", "x"]);
    }

    #[test]
    fn sorting_keeps_the_order_of_ties() {
        let df = df![
            "a" => &[1i64, 0, 1, 0],
            "v" => &["w", "x", "y", "z"]
        ]
        .unwrap();
        let sorted = sort_by(&df, &["a"]).unwrap();
        assert_eq!(str_values(&sorted, "v").unwrap(), vec!["x", "z", "w", "y"]);
    }

    #[test]
    fn take_rows_repeats_indices() {
        let df = df!["v" => &[10i64, 20]].unwrap();
        let taken = take_rows(&df, &[1, 1, 0]).unwrap();
        assert_eq!(i64_values(&taken, "v").unwrap(), vec![20, 20, 10]);
    }
}
