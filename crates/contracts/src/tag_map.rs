//! TagMap - Node input channel registry
//!
//! Maps declarative stream specs (`TAG:index:name`, `TAG:name`, `name`) to dense
//! [`ChannelId`]s and resolves `TAG:index` references back to ids.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::{ChannelId, ContractError};

/// Parsed `TAG:index` reference.
///
/// Accepted forms: `TAG` (index 0), `TAG:2`, `:1` (empty tag).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagIndex {
    pub tag: String,
    pub index: usize,
}

impl TagIndex {
    /// Parse a tag/index reference.
    ///
    /// # Errors
    /// Returns [`ContractError::InvalidTagIndex`] on malformed input.
    pub fn parse(spec: &str) -> Result<Self, ContractError> {
        let (tag, index) = match spec.split_once(':') {
            Some((tag, index)) => {
                let index = index.parse::<usize>().map_err(|_| {
                    ContractError::invalid_tag_index(spec, format!("bad index '{index}'"))
                })?;
                (tag, index)
            }
            None => (spec, 0),
        };

        if tag.is_empty() && !spec.starts_with(':') {
            return Err(ContractError::invalid_tag_index(spec, "empty reference"));
        }
        if !tag.is_empty() && !is_valid_tag(tag) {
            return Err(ContractError::invalid_tag_index(
                spec,
                "tag must match [A-Z_][A-Z0-9_]*",
            ));
        }

        Ok(Self {
            tag: tag.to_string(),
            index,
        })
    }
}

impl fmt::Display for TagIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag, self.index)
    }
}

#[derive(Debug, Clone, Copy)]
struct TagRange {
    first: usize,
    count: usize,
}

/// Registry of a node's input channels.
#[derive(Debug, Clone, Default)]
pub struct TagMap {
    tags: BTreeMap<String, TagRange>,
    /// Stream name per channel id
    names: Vec<String>,
    /// Tag/index per channel id
    tag_indices: Vec<TagIndex>,
    by_name: HashMap<String, ChannelId>,
}

struct StreamSpec<'a> {
    tag: &'a str,
    index: Option<usize>,
    name: &'a str,
}

impl TagMap {
    /// Build the registry from stream declarations.
    ///
    /// Ids are assigned tag by tag in ascending order (the empty tag first),
    /// then by index.
    ///
    /// # Errors
    /// - Malformed declaration
    /// - Duplicate stream name
    /// - Indices of one tag not contiguous from 0, or explicit and implicit
    ///   indices mixed for one tag
    pub fn from_streams<S: AsRef<str>>(streams: &[S]) -> Result<Self, ContractError> {
        let mut per_tag: BTreeMap<&str, Vec<(Option<usize>, &str)>> = BTreeMap::new();
        let mut seen_names = HashMap::new();

        for raw in streams {
            let raw = raw.as_ref();
            let spec = parse_stream_spec(raw)?;
            if seen_names.insert(spec.name, raw).is_some() {
                return Err(ContractError::invalid_stream_spec(
                    raw,
                    format!("duplicate stream name '{}'", spec.name),
                ));
            }
            per_tag
                .entry(spec.tag)
                .or_default()
                .push((spec.index, spec.name));
        }

        let mut map = TagMap::default();
        for (tag, mut entries) in per_tag {
            let explicit = entries.iter().filter(|(index, _)| index.is_some()).count();
            if explicit != 0 && explicit != entries.len() {
                return Err(ContractError::invalid_stream_spec(
                    tag,
                    "explicit and implicit indices mixed for one tag",
                ));
            }
            if explicit != 0 {
                entries.sort_by_key(|(index, _)| *index);
                for (expected, (index, name)) in entries.iter().enumerate() {
                    if *index != Some(expected) {
                        return Err(ContractError::invalid_stream_spec(
                            format!("{tag}:{}:{name}", index.unwrap_or_default()),
                            format!("indices of tag '{tag}' must be contiguous from 0"),
                        ));
                    }
                }
            }

            let first = map.names.len();
            for (index, (_, name)) in entries.iter().enumerate() {
                let id = ChannelId::new(map.names.len());
                map.names.push((*name).to_string());
                map.tag_indices.push(TagIndex {
                    tag: tag.to_string(),
                    index,
                });
                map.by_name.insert((*name).to_string(), id);
            }
            map.tags.insert(
                tag.to_string(),
                TagRange {
                    first,
                    count: entries.len(),
                },
            );
        }

        Ok(map)
    }

    /// Number of channels
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the node has no inputs
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate every channel id in order
    pub fn ids(&self) -> impl Iterator<Item = ChannelId> {
        ChannelId::range(self.len())
    }

    /// Look up `tag`/`index`
    pub fn get_id(&self, tag: &str, index: usize) -> Option<ChannelId> {
        self.tags
            .get(tag)
            .filter(|range| index < range.count)
            .map(|range| ChannelId::new(range.first + index))
    }

    /// Look up a stream by name
    pub fn id_by_name(&self, name: &str) -> Option<ChannelId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a reference which is either `TAG:index` or a stream name.
    ///
    /// # Errors
    /// Malformed reference, or no such channel.
    pub fn resolve(&self, reference: &str) -> Result<ChannelId, ContractError> {
        if reference.starts_with(|c: char| c.is_ascii_lowercase()) {
            return self.id_by_name(reference).ok_or_else(|| {
                ContractError::invalid_tag_index(reference, "stream is not found")
            });
        }
        let tag_index = TagIndex::parse(reference)?;
        self.get_id(&tag_index.tag, tag_index.index)
            .ok_or_else(|| ContractError::invalid_tag_index(reference, "stream is not found"))
    }

    /// Stream name of a channel
    pub fn name(&self, id: ChannelId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    /// Tag/index of a channel
    pub fn tag_index(&self, id: ChannelId) -> Option<&TagIndex> {
        self.tag_indices.get(id.index())
    }

    /// Sorted tags (empty tag included when present)
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }
}

fn parse_stream_spec(raw: &str) -> Result<StreamSpec<'_>, ContractError> {
    let parts: Vec<&str> = raw.split(':').collect();
    let spec = match parts.as_slice() {
        [name] => StreamSpec {
            tag: "",
            index: None,
            name,
        },
        [tag, name] => StreamSpec {
            tag,
            index: None,
            name,
        },
        [tag, index, name] => {
            let index = index.parse::<usize>().map_err(|_| {
                ContractError::invalid_stream_spec(raw, format!("bad index '{index}'"))
            })?;
            StreamSpec {
                tag,
                index: Some(index),
                name,
            }
        }
        _ => {
            return Err(ContractError::invalid_stream_spec(
                raw,
                "expected TAG:index:name, TAG:name or name",
            ))
        }
    };

    if !spec.tag.is_empty() && !is_valid_tag(spec.tag) {
        return Err(ContractError::invalid_stream_spec(
            raw,
            "tag must match [A-Z_][A-Z0-9_]*",
        ));
    }
    if !is_valid_name(spec.name) {
        return Err(ContractError::invalid_stream_spec(
            raw,
            "name must match [a-z_][a-z0-9_]*",
        ));
    }
    Ok(spec)
}

fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase() || c == '_')
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
