//! Album input parsing, validation and index arithmetic.

use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::Error;

const DEFAULT_NAME_FIELD: &str = "name";

/// Unvalidated album description, as handed to a load.
///
/// Deserializes from YAML/JSON with kebab-case keys:
///
/// ```yaml
/// name: holidays
/// location: photos\2019
/// images: [beach.jpg, ~, sunset.jpg]
/// ```
///
/// `images` may also be a mapping (its values are taken in document order) or
/// a sequence of records, in which case `name-field` (alias `imageNameField`)
/// names the member holding each file name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AlbumSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Value,
    #[serde(default)]
    pub images: Value,
    #[serde(default, alias = "imageNameField")]
    pub name_field: Option<String>,
}

impl AlbumSource {
    /// An album of bare file names without a base location.
    pub fn new<I, S>(name: impl Into<String>, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: Some(name.into()),
            location: Value::Null,
            images: Value::Sequence(images.into_iter().map(|s| Value::String(s.into())).collect()),
            name_field: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Value::String(location.into());
        self
    }

    pub fn with_images(mut self, images: Value) -> Self {
        self.images = images;
        self
    }

    pub fn with_name_field(mut self, field: impl Into<String>) -> Self {
        self.name_field = Some(field.into());
        self
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, Error> {
        serde_yaml::from_str(s).map_err(|e| Error::InvalidAlbum(e.to_string()))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidAlbum(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&s)
    }
}

/// One present image of an album.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageEntry {
    Name(String),
    Record { name: String, fields: Mapping },
}

impl ImageEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Record { name, .. } => name,
        }
    }

    /// Extra member of a structured entry.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Name(_) => None,
            Self::Record { fields, .. } => fields.get(key),
        }
    }
}

/// A validated album. Always holds at least one present entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    name: String,
    base_location: Option<String>,
    entries: Vec<Option<ImageEntry>>,
    name_field: String,
    structured: bool,
}

impl Album {
    pub fn from_source(source: &AlbumSource) -> Result<Self, Error> {
        let name = match source.name.as_deref() {
            Some(n) if !n.is_empty() => n.to_owned(),
            _ => return Err(invalid("album must have a non-empty name")),
        };

        let raw: Vec<&Value> = match &source.images {
            Value::Sequence(seq) => seq.iter().collect(),
            Value::Mapping(map) => map.values().collect(),
            Value::Null => return Err(invalid("album must list its images")),
            _ => return Err(invalid("images must be a sequence or a mapping")),
        };
        if raw.is_empty() {
            return Err(invalid("album must contain at least one image"));
        }

        let base_location = match &source.location {
            Value::Null => None,
            Value::String(loc) => normalize_location(loc),
            _ => return Err(invalid("location must be a string or null")),
        };

        let name_field = source
            .name_field
            .clone()
            .unwrap_or_else(|| DEFAULT_NAME_FIELD.to_owned());

        let Some(first) = raw.iter().find(|v| !v.is_null()) else {
            return Err(invalid("album must contain at least one image"));
        };
        let structured = !first.is_string();

        let mut entries = Vec::with_capacity(raw.len());
        for (idx, value) in raw.into_iter().enumerate() {
            let entry = match value {
                Value::Null => None,
                Value::String(s) if !structured => Some(ImageEntry::Name(s.clone())),
                Value::Mapping(fields) if structured => {
                    let Some(name) = fields.get(name_field.as_str()).and_then(Value::as_str) else {
                        return Err(invalid(format!(
                            "image {idx} has no string `{name_field}` member"
                        )));
                    };
                    Some(ImageEntry::Record {
                        name: name.to_owned(),
                        fields: fields.clone(),
                    })
                }
                _ => {
                    let expected = if structured { "a record" } else { "a file name" };
                    return Err(invalid(format!("image {idx} is not {expected}")));
                }
            };
            entries.push(entry);
        }

        Ok(Self {
            name,
            base_location,
            entries,
            name_field,
            structured,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_location(&self) -> Option<&str> {
        self.base_location.as_deref()
    }

    pub fn name_field(&self) -> &str {
        &self.name_field
    }

    /// Whether entries are records rather than bare names.
    pub fn is_structured(&self) -> bool {
        self.structured
    }

    /// Length of the entry sequence, absent entries included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that are actually present.
    pub fn present_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn entry(&self, index: usize) -> Option<&ImageEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    pub fn image_name(&self, index: usize) -> Option<&str> {
        self.entry(index).map(ImageEntry::name)
    }

    /// Correct an arbitrary index into one that points at a present entry.
    ///
    /// Past either end the index wraps when `endless`, otherwise it clamps.
    /// An absent entry is skipped by scanning forward; when nothing follows,
    /// the first present entry is used.
    pub fn safe_index(&self, requested: i64, endless: bool) -> usize {
        let len = self.entries.len() as i64;
        let mut idx = requested;
        if idx >= len {
            idx = if endless { 0 } else { len - 1 };
        }
        if idx < 0 {
            idx = if endless { len - 1 } else { 0 };
        }
        let start = idx as usize;
        self.entries[start..]
            .iter()
            .position(Option::is_some)
            .map(|offset| start + offset)
            .unwrap_or_else(|| self.first_present())
    }

    fn first_present(&self) -> usize {
        self.entries.iter().position(Option::is_some).unwrap_or(0)
    }

    pub fn last_present(&self) -> Option<usize> {
        self.entries.iter().rposition(Option::is_some)
    }

    /// Index of the first present entry named `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.as_ref().is_some_and(|e| e.name() == name))
    }

    /// File name joined onto the base location, if any.
    pub fn source_url(&self, index: usize) -> Option<String> {
        let name = self.image_name(index)?;
        Some(match &self.base_location {
            Some(base) => format!("{base}{name}"),
            None => name.to_owned(),
        })
    }

    /// Last path segment of the entry's name.
    pub fn alt_text(&self, index: usize) -> Option<String> {
        let name = self.image_name(index)?;
        let start = name.rfind('/').map_or(0, |pos| pos + 1);
        Some(name[start..].to_owned())
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidAlbum(msg.into())
}

fn normalize_location(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let mut loc = raw.replace('\\', "/");
    if !loc.ends_with('/') {
        loc.push('/');
    }
    Some(loc)
}
