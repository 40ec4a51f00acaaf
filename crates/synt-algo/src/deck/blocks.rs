//! Block 0: the duration-weighted average of a stage's blocks.

use polars::prelude::*;
use synt_core::columns::{CENARIO, DURACAO, ESTAGIO, PATAMAR};
use synt_core::SyntResult;

/// Replaces any block 0 rows of `df` with the duration-weighted average of
/// the real blocks of each (stage, scenario, `keys`) group.
///
/// Every other numeric column is averaged and comes out as `Float64`; other
/// columns keep the value of the group's first block. The result holds the
/// real blocks followed by the block 0 rows.
pub fn add_block_zero(df: &DataFrame, keys: &[&str]) -> SyntResult<DataFrame> {
    let mut group: Vec<&str> = vec![ESTAGIO, CENARIO];
    group.extend_from_slice(keys);

    let mut casts = vec![
        col(PATAMAR).cast(DataType::Int64),
        col(DURACAO).cast(DataType::Float64),
    ];
    let mut aggregations = vec![col(DURACAO).sum()];
    for series in df.get_columns() {
        let name = series.name();
        if group.contains(&name) || name == PATAMAR || name == DURACAO {
            continue;
        }
        if series.dtype().is_numeric() {
            casts.push(col(name).cast(DataType::Float64));
            aggregations.push(weighted_average(name));
        } else {
            aggregations.push(col(name).first());
        }
    }

    let real = df
        .clone()
        .lazy()
        .filter(col(PATAMAR).neq(lit(0)))
        .with_columns(casts)
        .collect()?;
    let order: Vec<Expr> = real.get_column_names().into_iter().map(col).collect();
    let zero = real
        .clone()
        .lazy()
        .group_by_stable(group.iter().map(|name| col(name)).collect::<Vec<_>>())
        .agg(aggregations)
        .with_column(lit(0i64).alias(PATAMAR))
        .select(order)
        .collect()?;

    let mut out = real;
    out.vstack_mut(&zero)?;
    Ok(out)
}

/// Duration-weighted mean of `name`, or the plain mean when the blocks
/// carry no duration.
fn weighted_average(name: &str) -> Expr {
    when(col(DURACAO).sum().gt(lit(0.0)))
        .then((col(name) * col(DURACAO)).sum() / col(DURACAO).sum())
        .otherwise(col(name).mean())
        .alias(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synt_io::frame::{f64_values, i64_values, str_values};

    #[test]
    fn block_zero_is_weighted_by_duration() {
        let df = df![
            ESTAGIO => &[1i64, 1, 1, 1],
            CENARIO => &[1i64, 1, 1, 1],
            "codigo_submercado" => &[1i64, 1, 2, 2],
            PATAMAR => &[1i64, 2, 1, 2],
            DURACAO => &[40.0f64, 128.0, 40.0, 128.0],
            "cmo" => &[100i64, 16, 10, 10]
        ]
        .unwrap();
        let out = add_block_zero(&df, &["codigo_submercado"]).unwrap();
        assert_eq!(out.height(), 6);
        assert_eq!(i64_values(&out, PATAMAR).unwrap(), vec![1, 2, 1, 2, 0, 0]);
        assert_eq!(
            f64_values(&out, DURACAO).unwrap()[4..],
            [168.0, 168.0]
        );
        let cmo = f64_values(&out, "cmo").unwrap();
        assert!((cmo[4] - (100.0 * 40.0 + 16.0 * 128.0) / 168.0).abs() < 1e-9);
        assert!((cmo[5] - 10.0).abs() < 1e-9);
        assert_eq!(i64_values(&out, "codigo_submercado").unwrap()[4..], [1, 2]);
    }

    #[test]
    fn existing_block_zero_rows_are_recomputed() {
        let df = df![
            ESTAGIO => &[1i64, 1, 1],
            CENARIO => &[1i64, 1, 1],
            PATAMAR => &[0i64, 1, 2],
            DURACAO => &[99.0f64, 1.0, 3.0],
            "valor" => &[-1.0f64, 4.0, 8.0]
        ]
        .unwrap();
        let out = add_block_zero(&df, &[]).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(f64_values(&out, "valor").unwrap(), vec![4.0, 8.0, 7.0]);
    }

    #[test]
    fn text_columns_keep_the_first_block() {
        let df = df![
            ESTAGIO => &[1i64, 1, 2],
            CENARIO => &[1i64, 1, 1],
            PATAMAR => &[1i64, 2, 1],
            DURACAO => &[0.0f64, 0.0, 10.0],
            "nome" => &["SE", "SE2", "S"],
            "valor" => &[2.0f64, 4.0, 5.0]
        ]
        .unwrap();
        let out = add_block_zero(&df, &[]).unwrap();
        assert_eq!(out.get_column_names(), df.get_column_names());
        assert_eq!(str_values(&out, "nome").unwrap()[3..], ["SE", "S"]);
        assert_eq!(i64_values(&out, ESTAGIO).unwrap()[3..], [1, 2]);
        // no duration: plain mean
        assert_eq!(f64_values(&out, "valor").unwrap()[3..], [3.0, 5.0]);
    }
}
