// ABOUTME: Zip container holding manifest.json plus one JSONL entry per table
// ABOUTME: Archives are written atomically by export and consumed read-only afterwards

pub mod manifest;

pub use manifest::{ColumnManifest, Manifest, TableManifest};

use crate::error::DumpError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// The one manifest format this build reads and writes. A mismatch is a hard
/// failure, never an upgrade path.
pub const FORMAT_VERSION: u32 = 1;

pub const MANIFEST_ENTRY: &str = "manifest.json";
const TABLES_PREFIX: &str = "tables/";

pub fn table_entry_name(table: &str) -> String {
    format!("{}{}.jsonl", TABLES_PREFIX, table)
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Streaming writer used by export. Entries must be written sequentially:
/// `start_table`, then row lines through the `Write` impl, then the next
/// entry; `write_manifest` + `finish` close the archive.
pub struct ArchiveWriter {
    zip: ZipWriter<BufWriter<File>>,
}

impl ArchiveWriter {
    pub fn create(path: &Path) -> Result<Self, DumpError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(ArchiveWriter {
            zip: ZipWriter::new(BufWriter::new(file)),
        })
    }

    pub fn start_table(&mut self, table: &str) -> Result<(), DumpError> {
        self.zip
            .start_file(table_entry_name(table).as_str(), entry_options())?;
        Ok(())
    }

    pub fn write_manifest(&mut self, manifest: &Manifest) -> Result<(), DumpError> {
        self.zip.start_file(MANIFEST_ENTRY, entry_options())?;
        let bytes = serde_json::to_vec(manifest)?;
        self.zip.write_all(&bytes)?;
        Ok(())
    }

    pub fn finish(self) -> Result<(), DumpError> {
        let mut inner = self.zip.finish()?;
        inner.flush()?;
        Ok(())
    }
}

impl Write for ArchiveWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.zip.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.zip.flush()
    }
}

/// Read side used by validate and import.
pub struct ArchiveReader {
    zip: ZipArchive<BufReader<File>>,
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader").finish_non_exhaustive()
    }
}

impl ArchiveReader {
    /// Open an existing archive. A missing file or a non-zip file is an
    /// archive-structure error, not an I/O error.
    pub fn open(path: &Path) -> Result<Self, DumpError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DumpError::ArchiveStructure(format!(
                    "archive not found: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let zip = ZipArchive::new(BufReader::new(file)).map_err(|e| {
            DumpError::ArchiveStructure(format!("{} is not a zip archive: {}", path.display(), e))
        })?;
        Ok(ArchiveReader { zip })
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.zip.file_names().any(|n| n == name)
    }

    pub fn read_manifest(&mut self) -> Result<Manifest, DumpError> {
        if !self.has_entry(MANIFEST_ENTRY) {
            return Err(DumpError::ArchiveStructure(format!(
                "missing archive entry: {}",
                MANIFEST_ENTRY
            )));
        }
        let mut raw = String::new();
        self.zip.by_name(MANIFEST_ENTRY)?.read_to_string(&mut raw)?;
        serde_json::from_str(&raw)
            .map_err(|e| DumpError::ArchiveStructure(format!("manifest.json is not valid: {}", e)))
    }

    /// Buffered reader over one table's JSONL entry.
    pub fn table_reader(
        &mut self,
        table: &str,
    ) -> Result<BufReader<Box<dyn Read + '_>>, DumpError> {
        let name = table_entry_name(table);
        if !self.has_entry(&name) {
            return Err(DumpError::ArchiveStructure(format!(
                "missing archive entry: {}",
                name
            )));
        }
        let entry = self.zip.by_name(&name)?;
        Ok(BufReader::new(Box::new(entry) as Box<dyn Read + '_>))
    }
}
