//! Stream filters.
//!
//! A [`FilterRegistry`] maps filter names to decoders and, optionally,
//! encoders. Filter chains from `/Filter` and `/DecodeParms` are applied in
//! order when decoding and in reverse order when encoding.

pub(crate) mod ascii_85;
pub(crate) mod ascii_hex;
pub(crate) mod flate;
pub(crate) mod run_length;

use crate::error::FilterError;
use crate::object::dict::keys::*;
use crate::object::{Dict, Name, Object};
use core::fmt::{self, Debug, Formatter};
use log::warn;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A function that transforms stream data, given the decode parameters of
/// the filter. Returns `None` if the data is invalid.
pub type FilterFn = Arc<dyn Fn(&[u8], Option<&Dict>) -> Option<Vec<u8>> + Send + Sync>;

#[derive(Clone)]
struct FilterEntry {
    decoder: FilterFn,
    encoder: Option<FilterFn>,
}

/// A set of named filters.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: FxHashMap<Name, FilterEntry>,
}

impl FilterRegistry {
    /// Create a registry without any filters.
    pub fn empty() -> Self {
        Self {
            filters: FxHashMap::default(),
        }
    }

    /// Create a registry with the built-in filters.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_with_encoder(
            FLATE_DECODE,
            |data, params| flate::decode(data, params),
            |data, params| {
                // Predictors are only supported for decoding.
                let predictor = params.and_then(|p| p.get_int(PREDICTOR)).unwrap_or(1);
                (predictor <= 1).then(|| flate::encode(data)).flatten()
            },
        );
        registry.register_with_encoder(
            ASCII_HEX_DECODE,
            |data, _| ascii_hex::decode(data),
            |data, _| Some(ascii_hex::encode(data)),
        );
        registry.register_with_encoder(
            ASCII85_DECODE,
            |data, _| ascii_85::decode(data),
            |data, _| Some(ascii_85::encode(data)),
        );
        registry.register_with_encoder(
            RUN_LENGTH_DECODE,
            |data, _| run_length::decode(data),
            |data, _| Some(run_length::encode(data)),
        );

        registry.alias(FLATE_DECODE_ABBREVIATION, FLATE_DECODE);
        registry.alias(ASCII_HEX_DECODE_ABBREVIATION, ASCII_HEX_DECODE);
        registry.alias(ASCII85_DECODE_ABBREVIATION, ASCII85_DECODE);
        registry.alias(RUN_LENGTH_DECODE_ABBREVIATION, RUN_LENGTH_DECODE);

        registry
    }

    /// Register a filter that can only decode. An existing filter with the
    /// same name is replaced.
    pub fn register(
        &mut self,
        name: impl Into<Name>,
        decoder: impl Fn(&[u8], Option<&Dict>) -> Option<Vec<u8>> + Send + Sync + 'static,
    ) {
        self.filters.insert(
            name.into(),
            FilterEntry {
                decoder: Arc::new(decoder),
                encoder: None,
            },
        );
    }

    /// Register a filter that can decode and encode.
    pub fn register_with_encoder(
        &mut self,
        name: impl Into<Name>,
        decoder: impl Fn(&[u8], Option<&Dict>) -> Option<Vec<u8>> + Send + Sync + 'static,
        encoder: impl Fn(&[u8], Option<&Dict>) -> Option<Vec<u8>> + Send + Sync + 'static,
    ) {
        self.filters.insert(
            name.into(),
            FilterEntry {
                decoder: Arc::new(decoder),
                encoder: Some(Arc::new(encoder)),
            },
        );
    }

    /// Make a registered filter available under another name as well.
    pub fn alias(&mut self, alias: impl Into<Name>, name: &[u8]) {
        if let Some(entry) = self.filters.get(name).cloned() {
            self.filters.insert(alias.into(), entry);
        }
    }

    /// Whether a filter is registered under this name.
    pub fn contains(&self, name: &[u8]) -> bool {
        self.filters.contains_key(name)
    }

    /// Decode data with a single filter.
    pub fn decode(
        &self,
        name: &Name,
        data: &[u8],
        params: Option<&Dict>,
    ) -> Result<Vec<u8>, FilterError> {
        let entry = self.entry(name)?;

        (entry.decoder)(data, params).ok_or_else(|| FilterError::Corrupt(name.to_string()))
    }

    /// Encode data with a single filter.
    pub fn encode(
        &self,
        name: &Name,
        data: &[u8],
        params: Option<&Dict>,
    ) -> Result<Vec<u8>, FilterError> {
        let encoder = self
            .entry(name)?
            .encoder
            .as_ref()
            .ok_or_else(|| FilterError::NoEncoder(name.to_string()))?;

        encoder(data, params).ok_or_else(|| FilterError::Corrupt(name.to_string()))
    }

    /// Decode the data of a stream with all filters named in its dictionary.
    pub fn decode_stream(&self, dict: &Dict, data: &[u8]) -> Result<Vec<u8>, FilterError> {
        let mut current = data.to_vec();

        for (name, params) in filter_chain(dict)? {
            current = self.decode(&name, &current, params.as_ref())?;
        }

        Ok(current)
    }

    /// Encode plain data so that it matches the filters named in the
    /// dictionary.
    pub fn encode_stream(&self, dict: &Dict, data: &[u8]) -> Result<Vec<u8>, FilterError> {
        let mut current = data.to_vec();

        for (name, params) in filter_chain(dict)?.into_iter().rev() {
            current = self.encode(&name, &current, params.as_ref())?;
        }

        Ok(current)
    }

    fn entry(&self, name: &Name) -> Result<&FilterEntry, FilterError> {
        self.filters.get(name).ok_or_else(|| {
            warn!("unknown filter: {name}");

            FilterError::Unknown(name.to_string())
        })
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for FilterRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut names = self.filters.keys().collect::<Vec<_>>();
        names.sort();

        f.debug_set().entries(names).finish()
    }
}

/// Return the filters of a stream dictionary together with their decode
/// parameters. The entries must already be direct objects.
pub fn filter_chain(dict: &Dict) -> Result<Vec<(Name, Option<Dict>)>, FilterError> {
    let names = match dict.get(FILTER) {
        None | Some(Object::Null) => return Ok(vec![]),
        Some(Object::Name(n)) => vec![n.clone()],
        Some(Object::Array(a)) => a
            .iter()
            .map(|o| o.as_name().cloned())
            .collect::<Option<Vec<_>>>()
            .ok_or(FilterError::InvalidParameters)?,
        Some(_) => return Err(FilterError::InvalidParameters),
    };

    let params = match dict.get(DECODE_PARMS) {
        None | Some(Object::Null) => vec![None; names.len()],
        Some(Object::Dict(d)) => vec![Some(d.clone())],
        Some(Object::Array(a)) => a
            .iter()
            .map(|o| match o {
                Object::Dict(d) => Ok(Some(d.clone())),
                Object::Null => Ok(None),
                _ => Err(FilterError::InvalidParameters),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(FilterError::InvalidParameters),
    };

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, params.get(i).cloned().flatten()))
        .collect())
}
