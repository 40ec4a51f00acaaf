//! Registration tables: submarkets, REEs, thermal and hydro plants.

use polars::prelude::*;
use synt_core::columns::*;
use synt_core::{SyntError, SyntResult};
use synt_io::frame::{f64_values, i64_values, require_columns, sort_by, str_values};

const REGISTERED: &str = "_registrado";

/// Keeps the first row of each distinct `key`, then orders by it.
pub fn unique_by(df: &DataFrame, table: &str, key: &str, columns: &[&str]) -> SyntResult<DataFrame> {
    require_columns(df, table, columns)?;
    let firsts: Vec<Expr> = columns
        .iter()
        .filter(|c| **c != key)
        .map(|c| col(c).first())
        .collect();
    let unique = df
        .clone()
        .lazy()
        .with_column(col(key).cast(DataType::Int64))
        .group_by_stable([col(key)])
        .agg(firsts)
        .select(columns.iter().map(|c| col(c)).collect::<Vec<_>>())
        .collect()?;
    sort_by(&unique, &[key])
}

/// Left-joins the columns of `registry` onto `df` by `key`.
///
/// Columns of `df` that the registry also carries are replaced. Fails with
/// [`SyntError::Lookup`] on the first code missing from the registry.
pub fn attach(df: &DataFrame, registry: &DataFrame, key: &str, what: &str) -> SyntResult<DataFrame> {
    let added = registry.get_column_names();
    let kept: Vec<&str> = df
        .get_column_names()
        .into_iter()
        .filter(|c| *c == key || !added.contains(c))
        .collect();
    let joined = df
        .select(kept)?
        .lazy()
        .with_column(col(key).cast(DataType::Int64))
        .left_join(
            registry
                .clone()
                .lazy()
                .with_columns([col(key).cast(DataType::Int64), lit(true).alias(REGISTERED)]),
            col(key),
            col(key),
        )
        .collect()?;
    let missing = joined.column(REGISTERED)?.is_null();
    if let Some(row) = missing.into_iter().position(|null| null == Some(true)) {
        let code = i64_values(&joined, key)?[row];
        return Err(SyntError::Lookup(format!("{what} {code} is not registered")));
    }
    Ok(joined.drop(REGISTERED)?)
}

pub fn submarkets(sb: &DataFrame) -> SyntResult<DataFrame> {
    unique_by(sb, "sb", CODIGO_SUBMERCADO, &[CODIGO_SUBMERCADO, NOME_SUBMERCADO])
}

pub fn rees(ree: &DataFrame) -> SyntResult<DataFrame> {
    unique_by(ree, "ree", CODIGO_REE, &[CODIGO_REE, NOME_REE, CODIGO_SUBMERCADO])
}

pub fn thermal_plants(ct: &DataFrame) -> SyntResult<DataFrame> {
    unique_by(ct, "ct", CODIGO_USINA, &[CODIGO_USINA, NOME_USINA, CODIGO_SUBMERCADO])
}

/// A hydro plant with its aggregation keys and registration data.
#[derive(Debug, Clone, PartialEq)]
pub struct HydroPlant {
    pub code: i64,
    pub name: String,
    pub ree: i64,
    pub ree_name: String,
    pub submarket: i64,
    pub submarket_name: String,
    pub min_volume: f64,
    pub max_volume: f64,
    pub max_turbined_flow: f64,
}

impl HydroPlant {
    pub fn useful_volume(&self) -> f64 {
        self.max_volume - self.min_volume
    }
}

/// Joins the deck's plant list with the registration cadastre and the
/// REE and submarket tables.
pub fn hydro_plants(
    uh: &DataFrame,
    cadastro: &DataFrame,
    rees: &DataFrame,
    submarkets: &DataFrame,
) -> SyntResult<Vec<HydroPlant>> {
    require_columns(uh, "uh", &[CODIGO_USINA, CODIGO_REE])?;
    let registered = [
        CODIGO_USINA,
        NOME_USINA,
        VOLUME_MINIMO,
        VOLUME_MAXIMO,
        VAZAO_TURBINADA_MAXIMA,
    ];
    require_columns(cadastro, "cadastro", &registered)?;

    let plants = unique_by(uh, "uh", CODIGO_USINA, &[CODIGO_USINA, CODIGO_REE])?;
    let plants = attach(&plants, &cadastro.select(registered)?, CODIGO_USINA, "hydro plant")?;
    let plants = attach(
        &plants,
        &rees.select([CODIGO_REE, NOME_REE, CODIGO_SUBMERCADO])?,
        CODIGO_REE,
        "REE",
    )?;
    let named = plants
        .lazy()
        .with_column(col(CODIGO_SUBMERCADO).cast(DataType::Int64))
        .left_join(
            submarkets
                .select([CODIGO_SUBMERCADO, NOME_SUBMERCADO])?
                .lazy()
                .with_column(col(CODIGO_SUBMERCADO).cast(DataType::Int64)),
            col(CODIGO_SUBMERCADO),
            col(CODIGO_SUBMERCADO),
        )
        .with_column(col(NOME_SUBMERCADO).fill_null(lit("")))
        .collect()?;
    hydro_plants_from_frame(&sort_by(&named, &[CODIGO_USINA])?)
}

pub fn hydro_plants_frame(plants: &[HydroPlant]) -> SyntResult<DataFrame> {
    Ok(DataFrame::new(vec![
        Series::new(CODIGO_USINA, plants.iter().map(|p| p.code).collect::<Vec<_>>()),
        Series::new(NOME_USINA, plants.iter().map(|p| p.name.clone()).collect::<Vec<_>>()),
        Series::new(CODIGO_REE, plants.iter().map(|p| p.ree).collect::<Vec<_>>()),
        Series::new(NOME_REE, plants.iter().map(|p| p.ree_name.clone()).collect::<Vec<_>>()),
        Series::new(
            CODIGO_SUBMERCADO,
            plants.iter().map(|p| p.submarket).collect::<Vec<_>>(),
        ),
        Series::new(
            NOME_SUBMERCADO,
            plants
                .iter()
                .map(|p| p.submarket_name.clone())
                .collect::<Vec<_>>(),
        ),
        Series::new(
            VOLUME_MINIMO,
            plants.iter().map(|p| p.min_volume).collect::<Vec<_>>(),
        ),
        Series::new(
            VOLUME_MAXIMO,
            plants.iter().map(|p| p.max_volume).collect::<Vec<_>>(),
        ),
        Series::new(
            VAZAO_TURBINADA_MAXIMA,
            plants.iter().map(|p| p.max_turbined_flow).collect::<Vec<_>>(),
        ),
    ])?)
}

pub fn hydro_plants_from_frame(df: &DataFrame) -> SyntResult<Vec<HydroPlant>> {
    let codes = i64_values(df, CODIGO_USINA)?;
    let names = str_values(df, NOME_USINA)?;
    let rees = i64_values(df, CODIGO_REE)?;
    let ree_names = str_values(df, NOME_REE)?;
    let submarkets = i64_values(df, CODIGO_SUBMERCADO)?;
    let submarket_names = str_values(df, NOME_SUBMERCADO)?;
    let min_volumes = f64_values(df, VOLUME_MINIMO)?;
    let max_volumes = f64_values(df, VOLUME_MAXIMO)?;
    let max_flows = f64_values(df, VAZAO_TURBINADA_MAXIMA)?;
    Ok((0..codes.len())
        .map(|row| HydroPlant {
            code: codes[row],
            name: names[row].clone(),
            ree: rees[row],
            ree_name: ree_names[row].clone(),
            submarket: submarkets[row],
            submarket_name: submarket_names[row].clone(),
            min_volume: min_volumes[row],
            max_volume: max_volumes[row],
            max_turbined_flow: max_flows[row],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> (DataFrame, DataFrame, DataFrame, DataFrame) {
        let uh = df![
            CODIGO_USINA => &[6i64, 1, 6],
            CODIGO_REE => &[10i64, 10, 10]
        ]
        .unwrap();
        let cadastro = df![
            CODIGO_USINA => &[1i64, 6],
            NOME_USINA => &["CAMARGOS", "FURNAS"],
            VOLUME_MINIMO => &[120.0f64, 5733.0],
            VOLUME_MAXIMO => &[792.0f64, 22950.0],
            VAZAO_TURBINADA_MAXIMA => &[220.0f64, 1692.0]
        ]
        .unwrap();
        let rees = df![
            CODIGO_REE => &[10i64],
            NOME_REE => &["PARANA"],
            CODIGO_SUBMERCADO => &[1i64]
        ]
        .unwrap();
        let sb = df![
            CODIGO_SUBMERCADO => &[1i64],
            NOME_SUBMERCADO => &["SE"]
        ]
        .unwrap();
        (uh, cadastro, rees, sb)
    }

    #[test]
    fn plants_carry_their_aggregation_keys() {
        let (uh, cadastro, rees, sb) = fixtures();
        let plants = hydro_plants(&uh, &cadastro, &rees, &sb).unwrap();
        assert_eq!(plants.len(), 2);
        assert_eq!(plants[0].name, "CAMARGOS");
        assert_eq!(plants[1].ree, 10);
        assert_eq!(plants[1].submarket_name, "SE");
        assert_eq!(plants[1].useful_volume(), 22950.0 - 5733.0);

        let frame = hydro_plants_frame(&plants).unwrap();
        assert_eq!(hydro_plants_from_frame(&frame).unwrap(), plants);
    }

    #[test]
    fn unregistered_plants_fail() {
        let (_, cadastro, rees, sb) = fixtures();
        let uh = df![CODIGO_USINA => &[99i64], CODIGO_REE => &[10i64]].unwrap();
        assert!(matches!(
            hydro_plants(&uh, &cadastro, &rees, &sb),
            Err(SyntError::Lookup(_))
        ));
    }

    #[test]
    fn attached_columns_replace_existing_ones() {
        let (_, _, rees, _) = fixtures();
        let df = df![
            CODIGO_REE => &[10.0f64, 10.0],
            CODIGO_SUBMERCADO => &[9i64, 9],
            "valor" => &[1.0f64, 2.0]
        ]
        .unwrap();
        let tagged = attach(&df, &rees, CODIGO_REE, "REE").unwrap();
        assert_eq!(i64_values(&tagged, CODIGO_SUBMERCADO).unwrap(), vec![1, 1]);
        assert_eq!(str_values(&tagged, NOME_REE).unwrap(), vec!["PARANA", "PARANA"]);
        assert_eq!(f64_values(&tagged, "valor").unwrap(), vec![1.0, 2.0]);
        assert_eq!(tagged.width(), 4);

        let unknown = df![CODIGO_REE => &[10i64, 12]].unwrap();
        let err = attach(&unknown, &rees, CODIGO_REE, "REE").unwrap_err();
        assert!(err.to_string().contains("REE 12"));
    }

    #[test]
    fn thermal_plants_are_unique() {
        let ct = df![
            CODIGO_USINA => &[3i64, 1, 3],
            NOME_USINA => &["ANGRA 2", "ANGRA 1", "ANGRA 2"],
            CODIGO_SUBMERCADO => &[1i64, 1, 1],
            ESTAGIO => &[1i64, 1, 2]
        ]
        .unwrap();
        let plants = thermal_plants(&ct).unwrap();
        assert_eq!(i64_values(&plants, CODIGO_USINA).unwrap(), vec![1, 3]);
        assert_eq!(plants.width(), 3);
    }
}
