//! Sources and the crawl catalog.
//!
//! A source is a remote community feed. The catalog is an ordered list of
//! sources; its order is the crawl order.

use serde::{Deserialize, Serialize};

/// A remote content origin the harvester crawls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Stable identifier (the community name on the remote side)
    pub id: String,

    /// Descriptive tag applied to every item this source produces
    pub description: String,
}

impl Source {
    /// Create a new source
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// Built-in catalog used when no config file overrides it
pub fn default_catalog() -> Vec<Source> {
    vec![
        Source::new("itookapicture", "Photography"),
        Source::new("portraits", "Portrait photography"),
        Source::new("art", "Art"),
        Source::new("malefashion", "Fashion"),
        Source::new("techwear", "Techwear"),
        Source::new("techwearclothing", "Techwear"),
        Source::new("darkwearclothing", "Darkwear"),
        Source::new("JustNiceFits", "Outfits"),
    ]
}

/// Restrict a catalog to the selected ids, keeping catalog order.
///
/// An empty selection keeps the whole catalog. Ids are compared
/// case-insensitively; unknown ids are returned separately.
pub fn select_sources(catalog: &[Source], selected: &[String]) -> (Vec<Source>, Vec<String>) {
    if selected.is_empty() {
        return (catalog.to_vec(), Vec::new());
    }

    let chosen = catalog
        .iter()
        .filter(|s| selected.iter().any(|id| id.eq_ignore_ascii_case(&s.id)))
        .cloned()
        .collect();

    let unknown = selected
        .iter()
        .filter(|id| !catalog.iter().any(|s| s.id.eq_ignore_ascii_case(id)))
        .cloned()
        .collect();

    (chosen, unknown)
}
