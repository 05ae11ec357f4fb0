//! Trial request templates.
//!
//! A template is a YAML file holding one `SplitsPlacer`, or one `Split` per
//! document for split trials. Templates are re-read at the start of every
//! trial so each submission starts from the same body.

use std::path::Path;

use kube::ResourceExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::crd::{Split, SplitsPlacer};
use crate::trial::error::{Error, Result};

/// Parse every non-empty YAML document in `content`.
pub fn parse_documents<T: DeserializeOwned>(content: &str) -> Result<Vec<T>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        documents.push(serde_yaml::from_value(value)?);
    }
    Ok(documents)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Template(format!("cannot read {}: {e}", path.display())))
}

/// The `SplitsPlacer` in the first document of `content`.
pub fn parse_splits_placer(content: &str) -> Result<SplitsPlacer> {
    let placer = parse_documents::<SplitsPlacer>(content)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Template("no SplitsPlacer document".into()))?;
    if placer.metadata.name.is_none() {
        return Err(Error::Template("SplitsPlacer has no metadata.name".into()));
    }
    Ok(placer)
}

/// Every `Split` document in `content`.
pub fn parse_splits(content: &str) -> Result<Vec<Split>> {
    let splits = parse_documents::<Split>(content)?;
    if splits.is_empty() {
        return Err(Error::Template("no Split documents".into()));
    }
    if let Some(unnamed) = splits.iter().position(|s| s.metadata.name.is_none()) {
        return Err(Error::Template(format!("Split document {unnamed} has no metadata.name")));
    }
    let mut names: Vec<String> = splits.iter().map(|s| s.name_any()).collect();
    names.sort_unstable();
    if names.windows(2).any(|w| w.first() == w.last()) {
        return Err(Error::Template("Split names must be unique".into()));
    }
    Ok(splits)
}

pub fn load_splits_placer(path: &Path) -> Result<SplitsPlacer> {
    parse_splits_placer(&read(path)?)
}

pub fn load_splits(path: &Path) -> Result<Vec<Split>> {
    parse_splits(&read(path)?)
}
