/// Stage loading.
///
/// ## Sources (priority order):
///   1. `stages_dir` from the config: every `*.toml` in it, by file name
///   2. Built-in stages embedded in the binary
///
/// ## Stage format (`.toml`):
///   ```toml
///   width = 5
///   height = 3
///
///   [properties]
///   name = "First Push"
///   turns = "12"
///
///   [[layers]]
///   rows = [
///     "1  1  1  1  1",
///     "1 17  2  0  1",
///     "1  1  1  1  1",
///   ]
///   ```
///
/// Rows are whitespace-separated tile ids. Only layer 0 is read by the game;
/// further layers are parsed and kept so editors can round-trip them.
/// `name` is required, `turns` defaults to 0. Property values may also be
/// written as bare TOML integers.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::entity::Point;
use crate::domain::tile::{self, TileId};

// ══════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("stage syntax error: {0}")]
    Syntax(#[from] toml::de::Error),

    #[error("missing stage property `{0}`")]
    MissingProperty(&'static str),

    #[error("stage property `{name}` is not a number: {value:?}")]
    NonNumericProperty { name: &'static str, value: String },

    #[error("layer {layer}, row {row}: {token:?} is not a tile id")]
    NonNumericCell { layer: usize, row: usize, token: String },

    #[error("layer {layer} has {actual} rows, expected {expected}")]
    RowCount { layer: usize, expected: usize, actual: usize },

    #[error("layer {layer}, row {row} has {actual} cells, expected {expected}")]
    CellCount { layer: usize, row: usize, expected: usize, actual: usize },

    #[error("stage has no layer {0}")]
    MissingLayer(usize),

    #[error("stage is {width}x{height}, both sides must be positive")]
    EmptyMap { width: usize, height: usize },

    #[error("stage is {width}x{height}, larger than {} cells", MAX_CELLS)]
    TooLarge { width: usize, height: usize },

    #[error("stage has no player spawn (tile {})", tile::SPAWN_PLAYER)]
    NoPlayerSpawn,

    #[error("no stage files in {}", .path.display())]
    NoStages { path: PathBuf },

    #[error("{}: {source}", .path.display())]
    InFile { path: PathBuf, #[source] source: Box<LoadError> },

    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, #[source] source: io::Error },
}

/// Upper bound on `width * height`, checked before any layer is parsed.
pub const MAX_CELLS: usize = 1 << 20;

/// Reject empty or oversized dimensions.
fn check_size(width: usize, height: usize) -> Result<usize, LoadError> {
    if width == 0 || height == 0 {
        return Err(LoadError::EmptyMap { width, height });
    }
    width.checked_mul(height)
        .filter(|&cells| cells <= MAX_CELLS)
        .ok_or(LoadError::TooLarge { width, height })
}

// ══════════════════════════════════════════════════════════════
// Tilemap source
// ══════════════════════════════════════════════════════════════

/// Read-only view of a stage, whatever it was loaded from.
pub trait TilemapSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn property(&self, name: &str) -> Option<&str>;
    /// Row-major ids, `width * height` long.
    fn layer(&self, index: usize) -> Option<&[TileId]>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap {
    width: usize,
    height: usize,
    properties: BTreeMap<String, String>,
    layers: Vec<Vec<TileId>>,
}

impl Tilemap {
    pub fn new(
        width: usize,
        height: usize,
        properties: BTreeMap<String, String>,
        layers: Vec<Vec<TileId>>,
    ) -> Self {
        Tilemap { width, height, properties, layers }
    }

    pub fn from_toml_str(text: &str) -> Result<Tilemap, LoadError> {
        let file: StageFile = toml::from_str(text)?;
        check_size(file.width, file.height)?;

        let properties = file.properties.into_iter()
            .map(|(k, v)| {
                let v = match v {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();

        let layers = file.layers.iter()
            .enumerate()
            .map(|(i, layer)| parse_layer(i, &layer.rows, file.width, file.height))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Tilemap::new(file.width, file.height, properties, layers))
    }
}

impl TilemapSource for Tilemap {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    fn layer(&self, index: usize) -> Option<&[TileId]> {
        self.layers.get(index).map(Vec::as_slice)
    }
}

// ══════════════════════════════════════════════════════════════
// Stage header
// ══════════════════════════════════════════════════════════════

/// The parts of a stage every consumer needs, validated.
#[derive(Clone, Debug, PartialEq)]
pub struct StageHeader {
    pub name: String,
    pub turn_limit: u32,
    pub player: Point,
}

/// Validate a stage and pull out its header.
/// The first player spawn in row-major order wins.
pub fn read_header(source: &impl TilemapSource) -> Result<StageHeader, LoadError> {
    let (width, height) = (source.width(), source.height());
    let cells = check_size(width, height)?;

    let name = source.property("name").ok_or(LoadError::MissingProperty("name"))?;
    let turn_limit = match source.property("turns") {
        None => 0,
        Some(raw) => raw.trim().parse::<u32>().map_err(|_| LoadError::NonNumericProperty {
            name: "turns",
            value: raw.to_string(),
        })?,
    };

    let layer0 = source.layer(0).ok_or(LoadError::MissingLayer(0))?;
    let spawn = layer0.iter()
        .take(cells)
        .position(|&id| id == tile::SPAWN_PLAYER)
        .ok_or(LoadError::NoPlayerSpawn)?;

    Ok(StageHeader {
        name: name.to_string(),
        turn_limit,
        player: Point::new((spawn % width) as i32, (spawn / width) as i32),
    })
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load the stage list: the configured directory if any, otherwise the
/// built-in stages. Every stage is validated up front.
pub fn load_stages(stages_dir: Option<&Path>) -> Result<Vec<Tilemap>, LoadError> {
    match stages_dir {
        Some(dir) => load_from_directory(dir),
        None => builtin_stages(),
    }
}

pub fn builtin_stages() -> Result<Vec<Tilemap>, LoadError> {
    BUILTIN_STAGES.iter()
        .map(|(file, text)| parse_checked(text).map_err(|e| in_file(PathBuf::from(file), e)))
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Internal
// ══════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct StageFile {
    width: usize,
    height: usize,
    #[serde(default)]
    properties: BTreeMap<String, toml::Value>,
    #[serde(default)]
    layers: Vec<StageLayer>,
}

#[derive(Deserialize, Debug)]
struct StageLayer {
    #[serde(default)]
    rows: Vec<String>,
}

fn parse_layer(
    layer: usize,
    rows: &[String],
    width: usize,
    height: usize,
) -> Result<Vec<TileId>, LoadError> {
    if rows.len() != height {
        return Err(LoadError::RowCount { layer, expected: height, actual: rows.len() });
    }
    let mut cells = Vec::new();
    for (row, line) in rows.iter().enumerate() {
        let before = cells.len();
        for token in line.split_whitespace() {
            let id = token.parse::<TileId>().map_err(|_| LoadError::NonNumericCell {
                layer,
                row,
                token: token.to_string(),
            })?;
            cells.push(id);
        }
        let actual = cells.len() - before;
        if actual != width {
            return Err(LoadError::CellCount { layer, row, expected: width, actual });
        }
    }
    Ok(cells)
}

fn parse_checked(text: &str) -> Result<Tilemap, LoadError> {
    let map = Tilemap::from_toml_str(text)?;
    read_header(&map)?;
    Ok(map)
}

fn in_file(path: PathBuf, source: LoadError) -> LoadError {
    LoadError::InFile { path, source: Box::new(source) }
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .toml files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Result<Vec<Tilemap>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |e| e == "toml"))
        .collect::<Vec<_>>();
    paths.sort();

    if paths.is_empty() {
        return Err(LoadError::NoStages { path: dir.to_path_buf() });
    }

    let mut stages = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let map = parse_checked(&text).map_err(|e| in_file(path.clone(), e))?;
        log::debug!("loaded stage file {}", path.display());
        stages.push(map);
    }
    Ok(stages)
}

// ══════════════════════════════════════════════════════════════
// Embedded stages
// ══════════════════════════════════════════════════════════════

const BUILTIN_STAGES: &[(&str, &str)] = &[
    ("01.toml", include_str!("../../stages/01.toml")),
    ("02.toml", include_str!("../../stages/02.toml")),
    ("03.toml", include_str!("../../stages/03.toml")),
    ("04.toml", include_str!("../../stages/04.toml")),
    ("05.toml", include_str!("../../stages/05.toml")),
    ("06.toml", include_str!("../../stages/06.toml")),
];

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
