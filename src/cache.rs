//! Файловый кэш распакованных отчётов и временные файлы без кэша.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

use crate::error::ReportError;
use crate::types::{DateGranularity, ReportQuery, ReportSubType, ReportType};

/// Ключ отчёта в кэше.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportIdentity {
    /// Тип отчёта.
    pub report_type: ReportType,
    /// Подтип отчёта.
    pub subtype: ReportSubType,
    /// Период.
    pub granularity: DateGranularity,
    /// Поставщик.
    pub vendor: String,
    /// Дата в каноническом формате.
    pub date: String,
}

impl ReportIdentity {
    /// Ключ для запроса отчёта указанного поставщика.
    pub fn new(query: &ReportQuery, vendor: &str) -> Self {
        Self {
            report_type: query.report_type,
            subtype: query.subtype,
            granularity: query.granularity,
            vendor: vendor.to_string(),
            date: query.date.clone(),
        }
    }

    /// Имя файла вида `S_S_D_{vendor}_{date}.txt`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}.txt",
            initial(self.report_type.as_str()),
            initial(self.subtype.as_str()),
            initial(self.granularity.as_str()),
            self.vendor,
            self.date
        )
    }
}

fn initial(name: &str) -> String {
    name.chars().next().map(|c| c.to_ascii_uppercase()).into_iter().collect()
}

/// Проверяет каталог кэша: существует, является каталогом и доступен на запись.
pub fn validate_folder(folder: &str) -> Result<PathBuf, ReportError> {
    let folder = folder.trim();
    if folder.is_empty() {
        return Err(ReportError::Configuration(
            "Please specify a folder to save reports to".into(),
        ));
    }
    let path = PathBuf::from(folder);
    if !path.is_dir() {
        return Err(ReportError::Configuration(format!(
            "Folder {folder} does not exist"
        )));
    }
    // Пробный файл удаляется при выходе из области видимости.
    NamedTempFile::new_in(&path).map_err(|_| {
        ReportError::Configuration(format!("We do not have write permission in {folder}"))
    })?;
    Ok(path)
}

/// Каталог с отчётами, по одному файлу на ключ.
#[derive(Debug, Clone)]
pub struct ReportCache {
    folder: PathBuf,
}

impl ReportCache {
    /// Кэш в уже проверенном каталоге.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Путь файла для ключа.
    pub fn path_for(&self, identity: &ReportIdentity) -> PathBuf {
        self.folder.join(identity.file_name())
    }

    /// Путь к сохранённому отчёту, если он есть.
    pub fn lookup(&self, identity: &ReportIdentity) -> Option<PathBuf> {
        let path = self.path_for(identity);
        let hit = path.is_file();
        debug!(
            path = %path.display(),
            report_type = %identity.report_type,
            subtype = %identity.subtype,
            hit,
            "report cache lookup"
        );
        hit.then_some(path)
    }

    /// Сохраняет отчёт атомарно: запись во временный файл и переименование.
    pub fn store(&self, identity: &ReportIdentity, contents: &str) -> Result<PathBuf, ReportError> {
        let path = self.path_for(identity);
        let mut tmp = NamedTempFile::new_in(&self.folder)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| err.error)?;
        info!(path = %path.display(), bytes = contents.len(), "report cached");
        Ok(path)
    }
}

/// Файл отчёта, из которого читает агрегатор.
///
/// Временный вариант удаляет свой каталог при `Drop`, в том числе на путях ошибок.
#[derive(Debug)]
pub enum Artifact {
    /// Файл в каталоге кэша.
    Cached(PathBuf),
    /// Файл во временном каталоге текущего запроса.
    Transient {
        /// Владелец временного каталога.
        dir: TempDir,
        /// Путь к файлу внутри каталога.
        path: PathBuf,
    },
}

impl Artifact {
    /// Записывает отчёт во временный каталог.
    pub fn transient(identity: &ReportIdentity, contents: &str) -> Result<Self, ReportError> {
        let dir = tempfile::Builder::new().prefix("itc-report-").tempdir()?;
        let path = dir.path().join(identity.file_name());
        fs::write(&path, contents)?;
        debug!(path = %path.display(), "report stored temporarily");
        Ok(Self::Transient { dir, path })
    }

    /// Путь к файлу.
    pub fn path(&self) -> &Path {
        match self {
            Self::Cached(path) | Self::Transient { path, .. } => path,
        }
    }

    /// Читает текст отчёта.
    pub fn read(&self) -> Result<String, ReportError> {
        fs::read_to_string(self.path()).map_err(|err| {
            ReportError::Decode(format!(
                "Unable to open file {}: {err}",
                self.path().display()
            ))
        })
    }
}
