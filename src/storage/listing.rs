// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Parsing of Azure `EnumerationResults` documents (List Containers, List Blobs)

use serde::Deserialize;

use super::StorageError;

/// One page of a listing: the names found plus the continuation marker
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingPage {
    pub names: Vec<String>,
    pub next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerEnumeration {
    #[serde(default)]
    containers: ContainerList,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContainerList {
    #[serde(rename = "Container", default)]
    items: Vec<NamedItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobEnumeration {
    #[serde(default)]
    blobs: BlobList,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobList {
    #[serde(rename = "Blob", default)]
    items: Vec<NamedItem>,
}

#[derive(Debug, Deserialize)]
struct NamedItem {
    #[serde(rename = "Name")]
    name: String,
}

pub fn parse_container_page(xml: &str) -> Result<ListingPage, StorageError> {
    let parsed: ContainerEnumeration = quick_xml::de::from_str(strip_bom(xml))
        .map_err(|e| StorageError::SerializationError(format!("container listing: {}", e)))?;
    Ok(ListingPage {
        names: parsed.containers.items.into_iter().map(|i| i.name).collect(),
        next_marker: non_empty(parsed.next_marker),
    })
}

pub fn parse_blob_page(xml: &str) -> Result<ListingPage, StorageError> {
    let parsed: BlobEnumeration = quick_xml::de::from_str(strip_bom(xml))
        .map_err(|e| StorageError::SerializationError(format!("blob listing: {}", e)))?;
    Ok(ListingPage {
        names: parsed.blobs.items.into_iter().map(|i| i.name).collect(),
        next_marker: non_empty(parsed.next_marker),
    })
}

// Azure prefixes its XML bodies with a UTF-8 byte order mark
fn strip_bom(xml: &str) -> &str {
    xml.trim_start_matches('\u{feff}')
}

fn non_empty(marker: Option<String>) -> Option<String> {
    marker.filter(|m| !m.trim().is_empty())
}
