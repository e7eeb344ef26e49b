//! Metadata schema reconciliation.
//!
//! Documents from different loaders carry different metadata fields, but a
//! collection's schema is fixed by the first batch it receives. Before chunking,
//! every document is padded to the union of observed fields and every field
//! name is rewritten to the `[A-Za-z0-9_]` alphabet the store accepts.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::error::NormalizeError;
use super::types::{Document, MetadataKind, MetadataValue};

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
#[must_use]
pub fn sanitize_field_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Union of field names with the value kind used to pad missing entries.
///
/// A field's kind is the first non-null kind observed in document order.
/// Later observations of a different non-null kind are reported and ignored.
fn field_schema(documents: &[Document]) -> BTreeMap<String, MetadataKind> {
    let mut schema: BTreeMap<String, MetadataKind> = BTreeMap::new();
    let mut conflicts: BTreeMap<&str, BTreeSet<MetadataKind>> = BTreeMap::new();

    for doc in documents {
        for (name, value) in &doc.metadata {
            let kind = value.kind();
            match schema.entry(name.clone()) {
                Entry::Vacant(e) => {
                    e.insert(kind);
                }
                Entry::Occupied(mut e) => {
                    let current = *e.get();
                    if current == kind || kind == MetadataKind::Null {
                        continue;
                    }
                    if current == MetadataKind::Null {
                        e.insert(kind);
                    } else {
                        conflicts.entry(name).or_default().insert(kind);
                    }
                }
            }
        }
    }

    for (name, kinds) in &conflicts {
        tracing::warn!(
            field = %name,
            kept = ?schema.get(*name),
            ignored = ?kinds,
            "metadata field observed with conflicting value types"
        );
    }

    schema
}

/// Pad every document with the fields it is missing.
///
/// The inserted value is the zero of the kind observed for that field in
/// other documents, so a field seen as an integer elsewhere is padded with `0`.
#[must_use]
pub fn pad_fields(documents: &[Document]) -> Vec<Document> {
    let schema = field_schema(documents);
    documents
        .iter()
        .map(|doc| {
            let mut doc = doc.clone();
            for (name, kind) in &schema {
                doc.metadata
                    .entry(name.clone())
                    .or_insert_with(|| MetadataValue::zero_of(*kind));
            }
            doc
        })
        .collect()
}

/// Rename every metadata field to its sanitized form.
///
/// # Errors
///
/// Returns [`NormalizeError::FieldCollision`] when two distinct field names
/// sanitize to the same name, since one of them would silently overwrite the other.
pub fn rename_fields(documents: &[Document]) -> Result<Vec<Document>, NormalizeError> {
    let names: BTreeSet<&str> = documents
        .iter()
        .flat_map(|d| d.metadata.keys().map(String::as_str))
        .collect();

    let mut claimed: HashMap<String, &str> = HashMap::with_capacity(names.len());
    for name in names {
        let sanitized = sanitize_field_name(name);
        if let Some(first) = claimed.insert(sanitized.clone(), name) {
            return Err(NormalizeError::FieldCollision {
                first: first.to_owned(),
                second: name.to_owned(),
                sanitized,
            });
        }
    }

    Ok(documents
        .iter()
        .map(|doc| Document {
            content: doc.content.clone(),
            metadata: doc
                .metadata
                .iter()
                .map(|(k, v)| (sanitize_field_name(k), v.clone()))
                .collect(),
        })
        .collect())
}

/// Pad then rename: the full normalization pass run before chunking.
///
/// # Errors
///
/// Returns an error if field renaming detects a collision.
pub fn normalize(documents: &[Document]) -> Result<Vec<Document>, NormalizeError> {
    let padded = pad_fields(documents);
    rename_fields(&padded)
}
