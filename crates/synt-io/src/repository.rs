//! File repository: the boundary with the library that parses result files.
//!
//! Parsing the proprietary formats happens elsewhere. What reaches this crate
//! is a set of named tables per file, plus the schema version the file
//! declared. A repository hands each parsed file out by reference and reads
//! it from storage at most once.
//!
//! On disk a parsed deck looks like:
//!
//! ```text
//! caso.dat                       # first non-empty line: case name, e.g. "rv0"
//! dadger.rv0.tables/
//!     manifest.json              # {"kind": "dadger", "schema_version": "31.0.2"}
//!     dt.parquet
//!     dp.csv
//!     ...
//! dec_oper_sist.rv0.tables/
//!     operacao.parquet
//! ```

use once_cell::unsync::OnceCell;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use synt_core::{SchemaVersion, SyntError, SyntResult};
use tracing::debug;

/// Case descriptor file name.
pub const CASE_FILE: &str = "caso.dat";
/// Per-file metadata written next to the tables.
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Dadger,
    Relato,
    Relato2,
    Inviabilidades,
    DecOperSist,
    DecOperRee,
    DecOperUsih,
    DecOperUsit,
    DecOperInterc,
    Hidr,
    Vazoes,
    DecompTim,
}

impl FileKind {
    pub const COUNT: usize = 12;

    pub const ALL: [FileKind; FileKind::COUNT] = [
        FileKind::Dadger,
        FileKind::Relato,
        FileKind::Relato2,
        FileKind::Inviabilidades,
        FileKind::DecOperSist,
        FileKind::DecOperRee,
        FileKind::DecOperUsih,
        FileKind::DecOperUsit,
        FileKind::DecOperInterc,
        FileKind::Hidr,
        FileKind::Vazoes,
        FileKind::DecompTim,
    ];

    /// File name stem, before the case extension.
    pub fn stem(&self) -> &'static str {
        match self {
            FileKind::Dadger => "dadger",
            FileKind::Relato => "relato",
            FileKind::Relato2 => "relato2",
            FileKind::Inviabilidades => "inviab_unic",
            FileKind::DecOperSist => "dec_oper_sist",
            FileKind::DecOperRee => "dec_oper_ree",
            FileKind::DecOperUsih => "dec_oper_usih",
            FileKind::DecOperUsit => "dec_oper_usit",
            FileKind::DecOperInterc => "dec_oper_interc",
            FileKind::Hidr => "hidr",
            FileKind::Vazoes => "vazoes",
            FileKind::DecompTim => "decomp",
        }
    }

    pub fn from_stem(stem: &str) -> Option<FileKind> {
        FileKind::ALL.iter().copied().find(|k| k.stem() == stem)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

/// The tables of one parsed result file.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    kind: FileKind,
    version: Option<SchemaVersion>,
    tables: BTreeMap<String, DataFrame>,
}

impl ParsedFile {
    pub fn new(kind: FileKind) -> Self {
        ParsedFile {
            kind,
            version: None,
            tables: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: SchemaVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_table(mut self, name: impl Into<String>, table: DataFrame) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn version(&self) -> Option<&SchemaVersion> {
        self.version.as_ref()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// A copy of table `name`.
    pub fn table(&self, name: &str) -> SyntResult<DataFrame> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| SyntError::MissingTable {
                file: self.kind.stem().to_string(),
                table: name.to_string(),
            })
    }

    /// Fails with [`SyntError::FileKindMismatch`] unless this file is a `kind`.
    pub fn ensure_kind(&self, kind: FileKind) -> SyntResult<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(SyntError::FileKindMismatch {
                expected: kind.stem().to_string(),
                found: self.kind.stem().to_string(),
            })
        }
    }
}

/// Source of parsed result files for one case.
///
/// Implementations memoize: asking twice for the same kind returns the same
/// parse. Missing or malformed files are errors; callers that can live
/// without a file check [`FileRepository::has_file`] first.
pub trait FileRepository {
    /// Case name, the extension shared by every file of the deck.
    fn case_name(&self) -> &str;

    fn has_file(&self, kind: FileKind) -> bool;

    /// The parsed file of `kind`, checked to actually be of that kind.
    fn file(&self, kind: FileKind) -> SyntResult<&ParsedFile>;

    fn dadger(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::Dadger)
    }

    fn relato(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::Relato)
    }

    fn relato2(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::Relato2)
    }

    fn inviabilidades(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::Inviabilidades)
    }

    fn dec_oper_sist(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::DecOperSist)
    }

    fn dec_oper_ree(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::DecOperRee)
    }

    fn dec_oper_usih(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::DecOperUsih)
    }

    fn dec_oper_usit(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::DecOperUsit)
    }

    fn dec_oper_interc(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::DecOperInterc)
    }

    fn hidr(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::Hidr)
    }

    fn vazoes(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::Vazoes)
    }

    fn decomp_tim(&self) -> SyntResult<&ParsedFile> {
        self.file(FileKind::DecompTim)
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    kind: String,
    #[serde(default)]
    schema_version: Option<String>,
}

/// Reads parsed tables from a deck directory.
#[derive(Debug)]
pub struct DirectoryRepository {
    root: PathBuf,
    case_name: String,
    files: [OnceCell<ParsedFile>; FileKind::COUNT],
    reads: Cell<usize>,
}

impl DirectoryRepository {
    /// Opens the deck at `root`, reading its case descriptor.
    pub fn open(root: impl AsRef<Path>) -> SyntResult<Self> {
        let root = root.as_ref().to_path_buf();
        let case_name = read_case_name(&root.join(CASE_FILE))?;
        debug!(root = %root.display(), case = %case_name, "opened deck directory");
        Ok(DirectoryRepository {
            root,
            case_name,
            files: std::array::from_fn(|_| OnceCell::new()),
            reads: Cell::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the tables of `kind`.
    pub fn file_dir(&self, kind: FileKind) -> PathBuf {
        self.root
            .join(format!("{}.{}.tables", kind.stem(), self.case_name))
    }

    /// How many files were actually loaded from storage.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    fn load(&self, kind: FileKind) -> SyntResult<ParsedFile> {
        let dir = self.file_dir(kind);
        if !dir.is_dir() {
            return Err(SyntError::MissingFile(dir.display().to_string()));
        }
        self.reads.set(self.reads.get() + 1);

        let mut parsed = ParsedFile::new(kind);
        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.is_file() {
            let content = fs::read_to_string(&manifest_path)?;
            let manifest: Manifest = serde_json::from_str(&content).map_err(|e| {
                SyntError::Other(format!("invalid {}: {e}", manifest_path.display()))
            })?;
            if manifest.kind != kind.stem() {
                return Err(SyntError::InvalidFileType {
                    path: dir.display().to_string(),
                    expected: kind.stem().to_string(),
                    found: manifest.kind,
                });
            }
            if let Some(version) = manifest.schema_version {
                parsed = parsed.with_version(version.parse()?);
            }
        }

        let mut entries = fs::read_dir(&dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();
        for path in entries {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let table = match path.extension().and_then(|s| s.to_str()) {
                Some("parquet") => ParquetReader::new(File::open(&path)?).finish()?,
                Some("csv") => CsvReader::new(File::open(&path)?)
                    .has_header(true)
                    .finish()?,
                _ => continue,
            };
            debug!(file = %kind, table = name, rows = table.height(), "loaded table");
            parsed = parsed.with_table(name, table);
        }
        Ok(parsed)
    }
}

impl FileRepository for DirectoryRepository {
    fn case_name(&self) -> &str {
        &self.case_name
    }

    fn has_file(&self, kind: FileKind) -> bool {
        self.files[kind.index()].get().is_some() || self.file_dir(kind).is_dir()
    }

    fn file(&self, kind: FileKind) -> SyntResult<&ParsedFile> {
        self.files[kind.index()].get_or_try_init(|| self.load(kind))
    }
}

fn read_case_name(path: &Path) -> SyntResult<String> {
    let content = fs::read_to_string(path)
        .map_err(|e| SyntError::InvalidCase(format!("{}: {e}", path.display())))?;
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SyntError::InvalidCase(format!("{} is empty", path.display())))
}

/// In-memory repository, filled through a builder.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    case_name: String,
    files: BTreeMap<FileKind, ParsedFile>,
}

impl MemoryRepository {
    pub fn new(case_name: impl Into<String>) -> Self {
        MemoryRepository {
            case_name: case_name.into(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, file: ParsedFile) -> Self {
        self.files.insert(file.kind(), file);
        self
    }

    /// Registers `file` under `kind` regardless of what it declares.
    pub fn with_file_as(mut self, kind: FileKind, file: ParsedFile) -> Self {
        self.files.insert(kind, file);
        self
    }

    pub fn without_file(mut self, kind: FileKind) -> Self {
        self.files.remove(&kind);
        self
    }
}

impl FileRepository for MemoryRepository {
    fn case_name(&self) -> &str {
        &self.case_name
    }

    fn has_file(&self, kind: FileKind) -> bool {
        self.files.contains_key(&kind)
    }

    fn file(&self, kind: FileKind) -> SyntResult<&ParsedFile> {
        let file = self
            .files
            .get(&kind)
            .ok_or_else(|| SyntError::MissingFile(format!("{}.{}", kind.stem(), self.case_name)))?;
        file.ensure_kind(kind)?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_roundtrip() {
        for kind in FileKind::ALL {
            assert_eq!(FileKind::from_stem(kind.stem()), Some(kind));
        }
        assert_eq!(FileKind::ALL[FileKind::DecompTim.index()], FileKind::DecompTim);
    }

    #[test]
    fn memory_repository_checks_declared_kind() {
        let repo = MemoryRepository::new("rv0")
            .with_file(ParsedFile::new(FileKind::Hidr))
            .with_file_as(FileKind::Vazoes, ParsedFile::new(FileKind::Relato));
        assert!(repo.hidr().is_ok());
        match repo.vazoes() {
            Err(SyntError::FileKindMismatch { expected, found }) => {
                assert_eq!(expected, "vazoes");
                assert_eq!(found, "relato");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(repo.dadger(), Err(SyntError::MissingFile(_))));
        assert!(!repo.has_file(FileKind::Dadger));
    }

    #[test]
    fn missing_tables_name_the_file() {
        let file = ParsedFile::new(FileKind::Dadger);
        let err = file.table("dp").unwrap_err();
        assert!(err.to_string().contains("dadger"));
        assert!(err.to_string().contains("dp"));
    }
}
