//! A small complete deck for tests and demos.
//!
//! Two weekly stages starting 2023-01-07, two load blocks of 40 h and 128 h.
//! Stage 1 is deterministic and stage 2 has two inflow scenarios. Two
//! submarkets (1 SE, 2 S), one REE each, hydro plants 6 and 7 in REE 1 and
//! 20 in REE 2, thermal plants 1 (SE) and 2 (S).

use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use synt_core::columns::*;
use synt_core::{SchemaVersion, SyntResult};
use synt_io::{
    DirectoryExporter, Exporter, FileKind, FileRepository, MemoryRepository, OutputFormat,
    ParsedFile, CASE_FILE, MANIFEST_FILE,
};

use crate::deck::{Deck, OPERACAO};

pub const CASE: &str = "rv0";
pub const SCHEMA_VERSION: &str = "31.1.0";
pub const LEGACY_SCHEMA_VERSION: &str = "31.0.2";

/// (stage, scenario) nodes of the sample run.
pub const NODES: [(i64, i64); 3] = [(1, 1), (2, 1), (2, 2)];
/// (block, hours) of every stage.
pub const BLOCKS: [(i64, f64); 2] = [(1, 40.0), (2, 128.0)];
/// (plant, REE, submarket)
pub const HYDRO_PLANTS: [(i64, i64, i64); 3] = [(6, 1, 1), (7, 1, 1), (20, 2, 2)];

/// One cell of an operational report.
#[derive(Debug, Clone)]
pub struct Point {
    pub entity: Vec<i64>,
    pub stage: i64,
    pub scenario: i64,
    pub block: i64,
}

type Value<'a> = (&'a str, &'a dyn Fn(&Point) -> f64);

/// Maximum stored energy of a submarket, in MWmes.
pub fn storage_capacity(submarket: i64) -> f64 {
    if submarket == 1 {
        200_000.0
    } else {
        20_000.0
    }
}

/// Stored fraction of a submarket at the end of a stage; equal in every block.
pub fn storage_fraction(submarket: i64, stage: i64, scenario: i64) -> f64 {
    0.40 + 0.05 * stage as f64 + 0.02 * scenario as f64 - 0.10 * (submarket - 1) as f64
}

/// (minimum, maximum) volume of a hydro plant, in hm3.
pub fn plant_volumes(plant: i64) -> (f64, f64) {
    match plant {
        6 => (5733.0, 22950.0),
        7 => (890.0, 6150.0),
        _ => (1974.0, 5779.0),
    }
}

pub fn max_turbined_flow(plant: i64) -> f64 {
    match plant {
        6 => 1692.0,
        7 => 800.0,
        _ => 1200.0,
    }
}

pub fn turbined_flow(point: &Point) -> f64 {
    300.0 + 10.0 * point.stage as f64 + point.scenario as f64 + 5.0 * point.block as f64
}

pub fn turbinable_spillage(point: &Point) -> f64 {
    50.0 + 10.0 * point.block as f64
}

pub fn non_turbinable_spillage(point: &Point) -> f64 {
    20.0 + point.scenario as f64
}

fn operation_table(key_columns: &[&str], entities: &[Vec<i64>], nodes: &[(i64, i64)], values: &[Value]) -> SyntResult<DataFrame> {
    let mut points = Vec::new();
    let mut hours = Vec::new();
    for &(stage, scenario) in nodes {
        for &(block, duration) in &BLOCKS {
            for entity in entities {
                points.push(Point {
                    entity: entity.clone(),
                    stage,
                    scenario,
                    block,
                });
                hours.push(duration);
            }
        }
    }
    let mut columns: Vec<Series> = key_columns
        .iter()
        .enumerate()
        .map(|(i, name)| Series::new(name, points.iter().map(|p| p.entity[i]).collect::<Vec<_>>()))
        .collect();
    columns.extend([
        Series::new(ESTAGIO, points.iter().map(|p| p.stage).collect::<Vec<_>>()),
        Series::new(CENARIO, points.iter().map(|p| p.scenario).collect::<Vec<_>>()),
        Series::new(PATAMAR, points.iter().map(|p| p.block).collect::<Vec<_>>()),
        Series::new(DURACAO, hours),
    ]);
    for (name, value) in values {
        columns.push(Series::new(name, points.iter().map(|p| value(p)).collect::<Vec<_>>()));
    }
    Ok(DataFrame::new(columns)?)
}

fn versioned(kind: FileKind, version: &str) -> SyntResult<ParsedFile> {
    Ok(ParsedFile::new(kind).with_version(version.parse::<SchemaVersion>()?))
}

fn dadger() -> SyntResult<ParsedFile> {
    let mut dp_stages = Vec::new();
    let mut dp_submarkets = Vec::new();
    let mut dp_blocks = Vec::new();
    let mut dp_hours = Vec::new();
    for stage in [1i64, 2] {
        for submarket in [1i64, 2] {
            for (block, hours) in BLOCKS {
                dp_stages.push(stage);
                dp_submarkets.push(submarket);
                dp_blocks.push(block);
                dp_hours.push(hours);
            }
        }
    }
    let dp = DataFrame::new(vec![
        Series::new(ESTAGIO, dp_stages),
        Series::new(CODIGO_SUBMERCADO, dp_submarkets),
        Series::new(PATAMAR, dp_blocks),
        Series::new(DURACAO, dp_hours),
    ])?;
    Ok(ParsedFile::new(FileKind::Dadger)
        .with_table("dt", df!["ano" => &[2023i64], "mes" => &[1i64], "dia" => &[7i64]]?)
        .with_table("dp", dp)
        .with_table(
            "sb",
            df![CODIGO_SUBMERCADO => &[1i64, 2], NOME_SUBMERCADO => &["SE", "S"]]?,
        )
        .with_table(
            "ree",
            df![
                CODIGO_REE => &[1i64, 2],
                NOME_REE => &["SUDESTE", "SUL"],
                CODIGO_SUBMERCADO => &[1i64, 2]
            ]?,
        )
        .with_table(
            "uh",
            df![
                CODIGO_USINA => &[6i64, 7, 20],
                CODIGO_REE => &[1i64, 1, 2],
                "volume_inicial_percentual" => &[45.0f64, 45.0, 45.0]
            ]?,
        )
        .with_table(
            "ct",
            df![
                CODIGO_USINA => &[1i64, 2],
                NOME_USINA => &["ANGRA 1", "CANDIOTA"],
                CODIGO_SUBMERCADO => &[1i64, 2]
            ]?,
        )
        .with_table(
            "hq",
            df![
                CODIGO_RESTRICAO => &[10i64, 11, 12],
                ESTAGIO_INICIAL => &[1i64, 1, 1],
                ESTAGIO_FINAL => &[2i64, 2, 2]
            ]?,
        )
        .with_table(
            "lq",
            df![
                CODIGO_RESTRICAO => &[10i64, 10, 11, 11, 12],
                ESTAGIO => &[1i64, 1, 1, 1, 1],
                PATAMAR => &[1i64, 2, 1, 2, 1],
                LIMITE_INFERIOR => &[0.0f64, 0.0, 10.0, 10.0, 0.0],
                LIMITE_SUPERIOR => &[Some(500.0f64), Some(400.0), None, None, Some(100.0)]
            ]?,
        )
        .with_table(
            "cq",
            df![
                CODIGO_RESTRICAO => &[10i64, 11, 12, 12],
                ESTAGIO => &[1i64, 1, 1, 1],
                CODIGO_USINA => &[6i64, 7, 6, 7],
                COEFICIENTE => &[1.0f64, 1.0, 1.0, 1.0],
                TIPO => &["QVER", "QTUR", "QDEF", "QDEF"]
            ]?,
        ))
}

fn hidr() -> SyntResult<ParsedFile> {
    let codes: Vec<i64> = HYDRO_PLANTS.iter().map(|p| p.0).collect();
    Ok(ParsedFile::new(FileKind::Hidr).with_table(
        "cadastro",
        DataFrame::new(vec![
            Series::new(CODIGO_USINA, codes.clone()),
            Series::new(NOME_USINA, &["FURNAS", "MARIMBONDO", "G. B. MUNHOZ"]),
            Series::new(VOLUME_MINIMO, codes.iter().map(|c| plant_volumes(*c).0).collect::<Vec<_>>()),
            Series::new(VOLUME_MAXIMO, codes.iter().map(|c| plant_volumes(*c).1).collect::<Vec<_>>()),
            Series::new(
                VAZAO_TURBINADA_MAXIMA,
                codes.iter().map(|c| max_turbined_flow(*c)).collect::<Vec<_>>(),
            ),
        ])?,
    ))
}

fn vazoes() -> SyntResult<ParsedFile> {
    Ok(versioned(FileKind::Vazoes, SCHEMA_VERSION)?.with_table(
        "probabilidades",
        df![
            ESTAGIO => &[1i64, 2, 2],
            CENARIO => &[1i64, 1, 2],
            PROBABILIDADE => &[1.0f64, 0.3, 0.5]
        ]?,
    ))
}

/// `dec_oper_sist` rows for `nodes`.
pub fn dec_oper_sist(nodes: &[(i64, i64)]) -> SyntResult<DataFrame> {
    let capacity = |p: &Point| storage_capacity(p.entity[0]);
    operation_table(
        &[CODIGO_SUBMERCADO],
        &[vec![1], vec![2]],
        nodes,
        &[
            ("cmo", &|p: &Point| 100.0 + 10.0 * p.stage as f64 + p.scenario as f64 + p.block as f64),
            ("custo_geracao_termica", &|p: &Point| 1000.0 * p.stage as f64),
            ("geracao_hidraulica_MW", &|p: &Point| 5000.0 + 100.0 * p.entity[0] as f64 + p.block as f64),
            ("geracao_termica_MW", &|p: &Point| 1000.0 + 10.0 * p.block as f64),
            ("geracao_termica_antecipada_MW", &|_: &Point| 50.0),
            ("geracao_eolica_MW", &|_: &Point| 300.0),
            ("demanda_MW", &|p: &Point| 10_000.0 * p.entity[0] as f64),
            ("deficit_MW", &|_: &Point| 0.0),
            ("earm_inicial_MWmes", &|p: &Point| {
                capacity(p) * (storage_fraction(p.entity[0], p.stage, p.scenario) - 0.05)
            }),
            ("earm_final_MWmes", &|p: &Point| capacity(p) * storage_fraction(p.entity[0], p.stage, p.scenario)),
            ("earm_inicial_percentual", &|p: &Point| {
                100.0 * (storage_fraction(p.entity[0], p.stage, p.scenario) - 0.05)
            }),
            ("earm_final_percentual", &|p: &Point| 100.0 * storage_fraction(p.entity[0], p.stage, p.scenario)),
            (EARM_MAXIMO, &capacity),
            ("ena_MWmes", &|p: &Point| 3000.0 + p.scenario as f64),
        ],
    )
}

fn dec_oper_ree() -> SyntResult<DataFrame> {
    operation_table(
        &[CODIGO_REE],
        &[vec![1], vec![2]],
        &NODES,
        &[
            ("earm_inicial_MWmes", &|p: &Point| 1000.0 * p.entity[0] as f64),
            ("earm_final_MWmes", &|p: &Point| 1100.0 * p.entity[0] as f64 + p.scenario as f64),
            ("earm_inicial_percentual", &|_: &Point| 40.0),
            ("earm_final_percentual", &|p: &Point| 40.0 + p.scenario as f64),
            ("ena_MWmes", &|p: &Point| 500.0 + p.stage as f64),
        ],
    )
}

fn dec_oper_usih() -> SyntResult<DataFrame> {
    let volume = |p: &Point, shift: f64| {
        let (min, max) = plant_volumes(p.entity[0]);
        min + (max - min) * (storage_fraction(1, p.stage, p.scenario) - shift)
    };
    let defluent = |p: &Point| turbined_flow(p) + turbinable_spillage(p) + non_turbinable_spillage(p);
    operation_table(
        &[CODIGO_USINA],
        &HYDRO_PLANTS.iter().map(|p| vec![p.0]).collect::<Vec<_>>(),
        &NODES,
        &[
            ("volume_inicial_hm3", &|p: &Point| volume(p, 0.05)),
            ("volume_final_hm3", &|p: &Point| volume(p, 0.0)),
            ("volume_inicial_percentual", &|p: &Point| {
                100.0 * (storage_fraction(1, p.stage, p.scenario) - 0.05)
            }),
            ("volume_final_percentual", &|p: &Point| 100.0 * storage_fraction(1, p.stage, p.scenario)),
            ("vazao_afluente_m3s", &|p: &Point| defluent(p) + 10.0),
            ("vazao_incremental_m3s", &|_: &Point| 100.0),
            ("vazao_defluente_m3s", &defluent),
            ("vazao_turbinada_m3s", &turbined_flow),
            ("vazao_vertida_turbinavel_m3s", &turbinable_spillage),
            ("vazao_vertida_nao_turbinavel_m3s", &non_turbinable_spillage),
            ("geracao_hidraulica_MW", &|p: &Point| 0.9 * turbined_flow(p)),
        ],
    )
}

fn dec_oper_usit() -> SyntResult<DataFrame> {
    operation_table(
        &[CODIGO_USINA, CODIGO_SUBMERCADO],
        &[vec![1, 1], vec![2, 2]],
        &NODES,
        &[
            ("geracao_termica_MW", &|p: &Point| 400.0 + p.block as f64),
            ("custo_geracao_termica", &|_: &Point| 150.0),
        ],
    )
}

fn dec_oper_interc() -> SyntResult<DataFrame> {
    operation_table(
        &[CODIGO_SUBMERCADO_DE, CODIGO_SUBMERCADO_PARA],
        &[vec![1, 2]],
        &NODES,
        &[("intercambio_MW", &|p: &Point| 1000.0 - 100.0 * p.block as f64)],
    )
}

fn relato() -> SyntResult<ParsedFile> {
    Ok(versioned(FileKind::Relato, SCHEMA_VERSION)?
        .with_table(
            "custos",
            df![
                ESTAGIO => &[1i64, 2, 2],
                CENARIO => &[1i64, 1, 2],
                "custo_presente" => &[1.5e6f64, 1.2e6, 1.4e6],
                "custo_futuro" => &[9.0e7f64, 8.0e7, 8.5e7]
            ]?,
        )
        .with_table(
            "convergencia",
            df![
                ITERACAO => &[1i64, 2],
                "zinf" => &[9.0e7f64, 9.1e7],
                "zsup" => &[9.5e7f64, 9.12e7],
                "gap_percentual" => &[5.26f64, 0.21],
                "tempo_s" => &[30.0f64, 61.0]
            ]?,
        )
        .with_table(
            "parcelas_custo",
            df![
                "parcela" => &["GERACAO TERMICA", "DEFICIT"],
                "valor_esperado" => &[2.1e6f64, 0.0],
                "desvio_padrao" => &[1.0e5f64, 0.0]
            ]?,
        ))
}

fn relato2() -> SyntResult<ParsedFile> {
    Ok(versioned(FileKind::Relato2, SCHEMA_VERSION)?.with_table(
        "custos",
        df![
            ESTAGIO => &[1i64],
            CENARIO => &[1i64],
            "custo_presente" => &[2.0e6f64],
            "custo_futuro" => &[7.0e7f64]
        ]?,
    ))
}

fn inviabilidades() -> SyntResult<ParsedFile> {
    Ok(ParsedFile::new(FileKind::Inviabilidades)
        .with_table(
            "iteracoes",
            df![
                ITERACAO => &[1i64],
                ESTAGIO => &[1i64],
                CENARIO => &[1i64],
                RESTRICAO => &["RESTRICAO ELETRICA 181PATAMAR1(L. INF)"],
                VIOLACAO => &[3.52589265f64],
                UNIDADE => &["MWmed"]
            ]?,
        )
        .with_table(
            "simulacao_final",
            df![
                ESTAGIO => &[2i64],
                CENARIO => &[2i64],
                RESTRICAO => &["DEFICIT SUBMERCADO SE PATAMAR 2"],
                VIOLACAO => &[2100.0f64],
                UNIDADE => &["MWmed"]
            ]?,
        ))
}

fn operation_file(kind: FileKind, version: &str, table: DataFrame) -> SyntResult<ParsedFile> {
    Ok(versioned(kind, version)?.with_table(OPERACAO, table))
}

/// Every file of the sample deck.
pub fn sample_repository() -> SyntResult<MemoryRepository> {
    Ok(MemoryRepository::new(CASE)
        .with_file(dadger()?)
        .with_file(hidr()?)
        .with_file(vazoes()?)
        .with_file(relato()?)
        .with_file(relato2()?)
        .with_file(inviabilidades()?)
        .with_file(ParsedFile::new(FileKind::DecompTim).with_table(
            "tempos",
            df!["etapa" => &["Tempo Total"], "tempo_s" => &[91.0f64]]?,
        ))
        .with_file(operation_file(FileKind::DecOperSist, SCHEMA_VERSION, dec_oper_sist(&NODES)?)?)
        .with_file(operation_file(FileKind::DecOperRee, SCHEMA_VERSION, dec_oper_ree()?)?)
        .with_file(operation_file(FileKind::DecOperUsih, SCHEMA_VERSION, dec_oper_usih()?)?)
        .with_file(operation_file(FileKind::DecOperUsit, SCHEMA_VERSION, dec_oper_usit()?)?)
        .with_file(operation_file(FileKind::DecOperInterc, SCHEMA_VERSION, dec_oper_interc()?)?))
}

/// The sample deck with a legacy `dec_oper_sist`: scenarios numbered as tree
/// nodes, two entries recorded for stage 1 and nodes 2 and 3 for stage 2.
pub fn legacy_repository() -> SyntResult<MemoryRepository> {
    let nodes = [(1, 1), (1, 2), (2, 2), (2, 3)];
    Ok(sample_repository()?.with_file(operation_file(
        FileKind::DecOperSist,
        LEGACY_SCHEMA_VERSION,
        dec_oper_sist(&nodes)?,
    )?))
}

pub fn sample_deck() -> SyntResult<Deck<MemoryRepository>> {
    Ok(Deck::new(sample_repository()?))
}

/// Lays `repository` out as a deck directory under `root`.
pub fn write_repository<R: FileRepository>(repository: &R, root: &Path) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("creating '{}'", root.display()))?;
    fs::write(root.join(CASE_FILE), format!("{}\n", repository.case_name()))?;
    for kind in FileKind::ALL {
        if !repository.has_file(kind) {
            continue;
        }
        let file = repository.file(kind)?;
        let dir = root.join(format!("{}.{}.tables", kind.stem(), repository.case_name()));
        let mut exporter = DirectoryExporter::new(&dir, OutputFormat::Parquet);
        for name in file.table_names() {
            exporter.write(name, &mut file.table(name)?)?;
        }
        let manifest = serde_json::json!({
            "kind": kind.stem(),
            "schema_version": file.version().map(|v| v.to_string()),
        });
        fs::write(dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&manifest)?)?;
    }
    Ok(())
}
