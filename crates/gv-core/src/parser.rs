//! Parser for the tab-separated fixation export → `Dataset`.
//!
//! Built on `winnow` 0.7. The first line is a header naming the columns;
//! columns are located by name so their order does not matter. Rows are
//! grouped into scanpaths by `(StimuliName, user, description)` and each
//! scanpath is sorted by `Timestamp`.
//!
//! ```text
//! Timestamp	StimuliName	FixationIndex	FixationDuration	MappedFixationPointX	MappedFixationPointY	user	description
//! 2586	01_Antwerpen_S1.jpg	1	250	1151	458	p1	color
//! ```

use crate::error::{CoreError, Result};
use crate::id::{ColorTag, ImageId, PersonId};
use crate::model::{Dataset, ImageData, Point};
use crate::scanpath::ScanPath;
use std::collections::HashMap;
use winnow::ascii::{digit0, digit1, line_ending};
use winnow::combinator::{opt, separated, terminated};
use winnow::prelude::*;
use winnow::token::{one_of, take_till};

const COL_TIMESTAMP: &str = "Timestamp";
const COL_IMAGE: &str = "StimuliName";
const COL_FIXATION_INDEX: &str = "FixationIndex";
const COL_DURATION: &str = "FixationDuration";
const COL_X: &str = "MappedFixationPointX";
const COL_Y: &str = "MappedFixationPointY";
const COL_USER: &str = "user";
const COL_DESCRIPTION: &str = "description";

/// Viewing condition used when the export has no `description` column.
pub const DEFAULT_COLOR_TAG: &str = "color";

/// Column positions resolved from the header line.
#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    image: usize,
    x: usize,
    y: usize,
    user: usize,
    fixation_index: Option<usize>,
    duration: Option<usize>,
    description: Option<usize>,
}

impl Columns {
    fn from_header(header: &[&str]) -> Result<Self> {
        let find = |name: &str| header.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| CoreError::Parse {
                line: 1,
                message: format!("missing column `{name}`"),
            })
        };
        Ok(Self {
            timestamp: require(COL_TIMESTAMP)?,
            image: require(COL_IMAGE)?,
            x: require(COL_X)?,
            y: require(COL_Y)?,
            user: require(COL_USER)?,
            fixation_index: find(COL_FIXATION_INDEX),
            duration: find(COL_DURATION),
            description: find(COL_DESCRIPTION),
        })
    }
}

type PathKey = (ImageId, PersonId, ColorTag);

/// Parse a fixation table into a `Dataset`.
#[must_use = "parsing result should be used"]
pub fn parse_fixation_table(input: &str) -> Result<Dataset> {
    let mut rest = input.strip_prefix('\u{feff}').unwrap_or(input);

    let header = parse_record
        .parse_next(&mut rest)
        .map_err(|e| CoreError::Parse {
            line: 1,
            message: format!("unreadable header: {e}"),
        })?;
    let columns = Columns::from_header(&header)?;

    // Points grouped per scanpath; `order` keeps first-seen order per image.
    let mut groups: HashMap<PathKey, Vec<Point>> = HashMap::new();
    let mut order: Vec<PathKey> = Vec::new();
    let mut line = 1;

    while !rest.is_empty() {
        line += 1;
        let before = rest.len();
        let fields = parse_record
            .parse_next(&mut rest)
            .map_err(|e| CoreError::Parse {
                line,
                message: format!("unreadable row: {e}"),
            })?;
        if rest.len() == before {
            return Err(CoreError::Parse {
                line,
                message: "stray carriage return".to_string(),
            });
        }
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let (key, point) = parse_row(&fields, &columns, line)?;
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(point);
    }

    let mut per_image: HashMap<ImageId, Vec<ScanPath>> = HashMap::new();
    let mut image_order: Vec<ImageId> = Vec::new();
    for key in order {
        let (image, person, color) = key;
        let points = groups.remove(&key).unwrap_or_default();
        let path = ScanPath::new(person, color, points)?;
        per_image
            .entry(image)
            .or_insert_with(|| {
                image_order.push(image);
                Vec::new()
            })
            .push(path);
    }

    let mut dataset = Dataset::new();
    for image in image_order {
        let paths = per_image.remove(&image).unwrap_or_default();
        log::debug!("loaded {} scanpaths for {}", paths.len(), image);
        dataset.insert(ImageData::new(image, paths));
    }
    Ok(dataset)
}

fn field<'a>(fields: &[&'a str], idx: usize, name: &str, line: usize) -> Result<&'a str> {
    fields
        .get(idx)
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| CoreError::Parse {
            line,
            message: format!("empty `{name}`"),
        })
}

fn numeric_field(fields: &[&str], idx: usize, name: &str, line: usize) -> Result<f64> {
    let raw = field(fields, idx, name, line)?;
    parse_number.parse(raw).map_err(|_| CoreError::Parse {
        line,
        message: format!("`{name}` is not a number: {raw:?}"),
    })
}

fn parse_row(fields: &[&str], columns: &Columns, line: usize) -> Result<(PathKey, Point)> {
    let text = |idx: usize, name: &str| field(fields, idx, name, line);
    let number = |idx: usize, name: &str| numeric_field(fields, idx, name, line);

    let time = number(columns.timestamp, COL_TIMESTAMP)?;
    let x = number(columns.x, COL_X)? as f32;
    let y = number(columns.y, COL_Y)? as f32;
    let image = ImageId::intern(text(columns.image, COL_IMAGE)?);
    let person = PersonId::intern(text(columns.user, COL_USER)?);
    let color = match columns.description {
        Some(idx) => ColorTag::intern(text(idx, COL_DESCRIPTION)?),
        None => ColorTag::intern(DEFAULT_COLOR_TAG),
    };
    let duration = match columns.duration {
        Some(idx) => number(idx, COL_DURATION)? as f32,
        None => 0.0,
    };
    let fixation_index = match columns.fixation_index {
        Some(idx) => number(idx, COL_FIXATION_INDEX)? as u32,
        None => 0,
    };

    Ok((
        (image, person, color),
        Point {
            x,
            y,
            time,
            duration,
            fixation_index,
        },
    ))
}

// ─── Low-level parsers ──────────────────────────────────────────────────

fn parse_field<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_till(0.., ['\t', '\r', '\n']).parse_next(input)
}

/// One tab-separated line, including its line ending if any.
fn parse_record<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    terminated(separated(1.., parse_field, '\t'), opt(line_ending)).parse_next(input)
}

fn parse_number(input: &mut &str) -> ModalResult<f64> {
    (opt('-'), digit1, opt((one_of(['.', ',']), digit0)))
        .take()
        .try_map(|s: &str| s.replace(',', ".").parse::<f64>())
        .parse_next(input)
}
