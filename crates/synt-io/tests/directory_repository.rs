use std::fs;
use std::path::Path;

use polars::prelude::NamedFrom;
use synt_core::{SchemaVersion, SyntError};
use synt_io::frame::{f64_values, i64_values};
use synt_io::{DirectoryExporter, Exporter, FileKind, FileRepository, OutputFormat};
use synt_io::DirectoryRepository;
use tempfile::tempdir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn reads_tables_and_manifest_once() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("caso.dat"), "\n  rv0  \n");
    let tables = dir.path().join("dadger.rv0.tables");
    write(
        &tables.join("manifest.json"),
        r#"{"kind": "dadger", "schema_version": "31.0.2"}"#,
    );
    write(
        &tables.join("dp.csv"),
        "estagio,codigo_submercado,patamar,duracao\n1,1,1,40.0\n1,1,2,128.0\n",
    );
    write(&tables.join("notes.txt"), "ignored");

    let repo = DirectoryRepository::open(dir.path()).unwrap();
    assert_eq!(repo.case_name(), "rv0");
    assert!(repo.has_file(FileKind::Dadger));
    assert!(!repo.has_file(FileKind::Relato));

    let dadger = repo.dadger().unwrap();
    assert_eq!(dadger.version(), Some(&SchemaVersion::new(31, 0, 2)));
    assert_eq!(dadger.table_names().collect::<Vec<_>>(), vec!["dp"]);
    let dp = dadger.table("dp").unwrap();
    assert_eq!(i64_values(&dp, "patamar").unwrap(), vec![1, 2]);
    assert_eq!(f64_values(&dp, "duracao").unwrap(), vec![40.0, 128.0]);

    repo.dadger().unwrap();
    repo.file(FileKind::Dadger).unwrap();
    assert_eq!(repo.reads(), 1);
}

#[test]
fn manifest_of_another_kind_is_rejected() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("caso.dat"), "rv1\n");
    write(
        &dir.path().join("relato.rv1.tables/manifest.json"),
        r#"{"kind": "relato2"}"#,
    );
    let repo = DirectoryRepository::open(dir.path()).unwrap();
    let err = repo.relato().unwrap_err();
    match err {
        SyntError::InvalidFileType { path, expected, found } => {
            assert!(std::path::Path::new(&path).is_dir(), "{path}");
            assert_eq!((expected.as_str(), found.as_str()), ("relato", "relato2"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_files_and_cases_are_errors() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        DirectoryRepository::open(dir.path()),
        Err(SyntError::InvalidCase(_))
    ));

    write(&dir.path().join("caso.dat"), "   \n\n");
    assert!(matches!(
        DirectoryRepository::open(dir.path()),
        Err(SyntError::InvalidCase(_))
    ));

    write(&dir.path().join("caso.dat"), "rv0");
    let repo = DirectoryRepository::open(dir.path()).unwrap();
    assert!(matches!(repo.hidr(), Err(SyntError::MissingFile(_))));
}

#[test]
fn directory_exporter_roundtrips_csv() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("sintese");
    let mut exporter = DirectoryExporter::new(&out, OutputFormat::Csv);
    let mut df = polars::df!["estagio" => &[1i64, 2], "valor" => &[10.5f64, 11.0]].unwrap();
    exporter.write("CMO_SBM", &mut df).unwrap();
    assert!(out.join("CMO_SBM.csv").is_file());

    let back = exporter.read("CMO_SBM").unwrap().unwrap();
    assert_eq!(f64_values(&back, "valor").unwrap(), vec![10.5, 11.0]);
    assert!(exporter.read("CMO_SIN").unwrap().is_none());

    exporter.clean().unwrap();
    assert!(!out.exists());
}
