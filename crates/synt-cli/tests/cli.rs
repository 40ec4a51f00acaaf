use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use synt_algo::test_utils::{sample_repository, write_repository};
use synt_io::frame::str_values;
use synt_io::{DirectoryExporter, Exporter, OutputFormat};
use tempfile::{tempdir, TempDir};

fn case_dir() -> TempDir {
    let dir = tempdir().unwrap();
    write_repository(&sample_repository().unwrap(), dir.path()).unwrap();
    dir
}

fn synt(case: &Path, install: &Path) -> Command {
    let mut cmd = Command::cargo_bin("synt").unwrap();
    cmd.env("SYNT_INSTALLDIR", install)
        .env_remove("SYNT_DIR")
        .arg("--diretorio")
        .arg(case);
    cmd
}

#[test]
fn sistema_writes_registration_tables() {
    let case = case_dir();
    let install = tempdir().unwrap();
    synt(case.path(), install.path())
        .arg("sistema")
        .assert()
        .success()
        .stdout(predicate::str::contains("sistema"));
    for name in ["EST", "PAT", "SBM", "REE", "UTE", "UHE"] {
        assert!(case.path().join("sintese").join(format!("{name}.parquet")).is_file());
    }
}

#[test]
fn operacao_honors_the_requested_format() {
    let case = case_dir();
    let install = tempdir().unwrap();
    synt(case.path(), install.path())
        .args(["operacao", "CMO_SBM", "--formato", "csv"])
        .assert()
        .success();

    let out = case.path().join("sintese");
    for name in ["CMO_SBM", "ESTATISTICAS_OPERACAO_SBM", "METADADOS_OPERACAO"] {
        assert!(out.join(format!("{name}.csv")).is_file(), "{name}.csv missing");
    }
    assert!(!out.join("CMO_SBM.parquet").exists());
}

#[test]
fn later_runs_extend_the_metadata() {
    let case = case_dir();
    let install = tempdir().unwrap();
    synt(case.path(), install.path())
        .args(["operacao", "CMO_SBM"])
        .assert()
        .success();
    synt(case.path(), install.path())
        .args(["operacao", "EARPF_SIN"])
        .assert()
        .success();

    let exporter = DirectoryExporter::new(case.path().join("sintese"), OutputFormat::Parquet);
    let metadata = exporter.read("METADADOS_OPERACAO").unwrap().unwrap();
    let mut keys = str_values(&metadata, "chave").unwrap();
    keys.sort();
    assert_eq!(keys, vec!["CMO_SBM", "EARMF_SBM", "EARPF_SIN"]);
}

#[test]
fn unknown_variables_fail_the_command() {
    let case = case_dir();
    let install = tempdir().unwrap();
    synt(case.path(), install.path())
        .args(["operacao", "CMO_SBM", "XPTO_SIN"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("XPTO_SIN"));
    assert!(!case.path().join("sintese").exists());
}

#[test]
fn missing_case_descriptor_is_fatal() {
    let case = tempdir().unwrap();
    let install = tempdir().unwrap();
    synt(case.path(), install.path())
        .arg("execucao")
        .assert()
        .failure();
}

#[test]
fn case_settings_choose_the_output_directory() {
    let case = case_dir();
    let install = tempdir().unwrap();
    fs::write(install.path().join("synt.toml"), "format = \"csv\"\n").unwrap();
    fs::write(case.path().join("synt.toml"), "synthesis_dir = \"saida\"\n").unwrap();
    synt(case.path(), install.path())
        .args(["cenarios"])
        .assert()
        .success();
    assert!(case.path().join("saida").join("PROBABILIDADES.csv").is_file());
}

#[test]
fn completa_then_limpeza() {
    let case = case_dir();
    let install = tempdir().unwrap();
    // names are accepted and ignored: every synthesis is still written
    synt(case.path(), install.path())
        .args(["completa", "CMO_SBM"])
        .assert()
        .success();
    let out = case.path().join("sintese");
    for name in ["EST", "INVIABILIDADES", "PROBABILIDADES", "CMO_SBM", "METADADOS_OPERACAO"] {
        assert!(out.join(format!("{name}.parquet")).is_file(), "{name} missing");
    }

    synt(case.path(), install.path())
        .args(["limpeza", "CMO_SBM"])
        .assert()
        .success();
    assert!(!out.exists());
    assert!(case.path().join("caso.dat").is_file());
}
