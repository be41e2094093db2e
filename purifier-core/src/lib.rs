use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod bits;
pub mod cursor;
pub mod flags;
pub mod header;
pub mod scan;
pub mod substitution;
pub mod tile;

use header::WorldHeader;
use scan::{purify_tiles, ScanReport};
use substitution::SubstitutionTable;
use tile::WriteMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurifySettings {
    pub input_path: PathBuf,
    /// Defaults to `<stem>_purified.wld` next to the input.
    pub output_path: Option<PathBuf>,
    pub purify_hallow: bool,
    /// Scan and count without writing an output world.
    pub dry_run: bool,
    /// Leave the `.cpy` scratch file behind after a successful run.
    pub keep_scratch: bool,
    /// Write the run summary as JSON here.
    pub report_path: Option<PathBuf>,
}

impl PurifySettings {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
            purify_hallow: false,
            dry_run: false,
            keep_scratch: false,
            report_path: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum PurifierError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unexpected end of file at 0x{offset:08X}")]
    UnexpectedEof { offset: u64 },
    #[error("tile section should end at 0x{end:08X} but the last record ends at 0x{reached:08X}")]
    SectionOverrun { end: u64, reached: u64 },
    #[error("invalid section table: {0}")]
    InvalidSectionTable(String),
    #[error("frame-importance bitmap of {bits} bits needs {need} bytes, only {have} present")]
    BitmapTruncated { bits: usize, need: usize, have: usize },
    #[error("tile {id} at 0x{offset:08X} is outside the {known}-entry frame-importance table")]
    UnknownTileId { offset: u64, id: u16, known: usize },
    #[error("replacement tile {id} does not fit the {width}-byte field at 0x{offset:08X}")]
    IdentifierOverflow { offset: u64, id: u16, width: usize },
    #[error("replacing tile {from} with {to} at 0x{offset:08X} would change the record layout")]
    FrameImportanceMismatch { offset: u64, from: u16, to: u16 },
}

impl PurifierError {
    /// True when the world does not match the expected layout, as opposed to
    /// an environment problem like a missing file.
    pub fn is_format_error(&self) -> bool {
        !matches!(
            self,
            PurifierError::Io(_) | PurifierError::Json(_) | PurifierError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PurifierError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurifyReport {
    pub input_path: PathBuf,
    /// `None` for dry runs.
    pub output_path: Option<PathBuf>,
    pub scratch_path: Option<PathBuf>,
    pub world_version: i32,
    pub purify_hallow: bool,
    pub scan: ScanReport,
}

/// `world.wld` -> `world.cpy`, next to the input.
pub fn scratch_path(input: &Path) -> PathBuf {
    input.with_extension("cpy")
}

/// `world.wld` -> `world_purified.wld`, next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "world".to_string());
    input.with_file_name(format!("{stem}_purified.wld"))
}

/// Canonical form of `path` for collision checks. The file itself may not
/// exist yet; its directory is resolved instead.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(full) = fs::canonicalize(path) {
        return full;
    }
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (fs::canonicalize(dir), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

/// Purify one world file.
///
/// Works on a scratch copy of the input. The output is only written once
/// the whole tile section has been scanned; on failure the scratch copy is
/// left on disk and the input is never touched.
pub fn run(settings: PurifySettings) -> Result<PurifyReport> {
    if !settings.input_path.is_file() {
        return Err(PurifierError::Config(format!(
            "Input world does not exist: {}",
            settings.input_path.display()
        )));
    }
    SubstitutionTable::validate().map_err(PurifierError::Config)?;

    let output_path = settings
        .output_path
        .clone()
        .unwrap_or_else(|| default_output_path(&settings.input_path));
    let scratch = scratch_path(&settings.input_path);

    let input_full = resolve(&settings.input_path);
    let scratch_full = resolve(&scratch);
    if scratch_full == input_full {
        return Err(PurifierError::Config(format!(
            "Input world {} already uses the .cpy scratch name; rename it first",
            settings.input_path.display()
        )));
    }
    let output_full = resolve(&output_path);
    if output_full == input_full || output_full == scratch_full {
        return Err(PurifierError::Config(format!(
            "Output path would overwrite {}",
            output_path.display()
        )));
    }

    fs::copy(&settings.input_path, &scratch)?;
    log::info!(
        "Purifying {} (hallow: {})",
        settings.input_path.display(),
        if settings.purify_hallow { "yes" } else { "no" }
    );

    let mut world = Cursor::new(fs::read(&scratch)?);
    let original_len = world.get_ref().len();

    let header = WorldHeader::read(&mut world)?;
    let table = SubstitutionTable::new(settings.purify_hallow);
    let mode = if settings.dry_run {
        WriteMode::DryRun
    } else {
        WriteMode::Patch
    };
    let scan = purify_tiles(
        &mut world,
        header.sections.tiles(),
        &header.frame_important,
        &table,
        mode,
    )?;

    let patched = world.into_inner();
    debug_assert_eq!(patched.len(), original_len);

    let mut report = PurifyReport {
        input_path: settings.input_path.clone(),
        output_path: None,
        scratch_path: None,
        world_version: header.version,
        purify_hallow: settings.purify_hallow,
        scan,
    };

    if settings.dry_run {
        fs::remove_file(&scratch)?;
    } else {
        fs::write(&scratch, &patched)?;
        fs::copy(&scratch, &output_path)?;
        if settings.keep_scratch {
            report.scratch_path = Some(scratch);
        } else {
            fs::remove_file(&scratch)?;
        }
        report.output_path = Some(output_path);
    }

    log::info!(
        "{} of {} tile records purified ({} corruption, {} crimson, {} hallow)",
        report.scan.tiles_purified,
        report.scan.records,
        report.scan.by_biome.corruption,
        report.scan.by_biome.crimson,
        report.scan.by_biome.hallow,
    );

    if let Some(path) = &settings.report_path {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }

    Ok(report)
}
