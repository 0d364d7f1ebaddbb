use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::ObjectListing;

/// A row in the folder view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    File {
        key: String,
        name: String,
        size: u64,
        #[serde(rename = "lastModified")]
        last_modified: DateTime<Utc>,
    },
    Folder {
        prefix: String,
        name: String,
    },
}

impl Content {
    pub fn name(&self) -> &str {
        match self {
            Content::File { name, .. } | Content::Folder { name, .. } => name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Content::Folder { .. })
    }
}

/// Turns a listing of `prefix` into folder-view rows: files first, then
/// folders, each in listing order.
///
/// Names are relative to `prefix`. The object whose key equals `prefix`
/// (the folder's own placeholder) is skipped.
pub fn contents_from_listing(prefix: &str, listing: ObjectListing) -> Vec<Content> {
    let relative = |full: &str| full.strip_prefix(prefix).unwrap_or(full).to_string();

    let files = listing.objects.into_iter().filter_map(|obj| {
        let name = relative(&obj.key);
        (!name.is_empty()).then(|| Content::File {
            name,
            key: obj.key,
            size: obj.size,
            last_modified: obj.last_modified,
        })
    });
    let folders = listing.common_prefixes.into_iter().map(|p| Content::Folder {
        name: relative(&p),
        prefix: p,
    });
    files.chain(folders).collect()
}
