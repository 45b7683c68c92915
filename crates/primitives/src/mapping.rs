//! Index naming and mapping construction
//!
//! A source declares its completion fields as dotted paths into its payload
//! (`vertalingen.productTitelDecentraal`). Those paths are folded into a
//! [`CompletionTree`], which renders to the `properties` sub-tree stored under
//! the source name in the index mapping.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

/// Prefix of every index managed by searchsync.
const INDEX_PREFIX: &str = "search-";

/// Physical index name for a logical source name.
#[must_use]
pub fn index_name(source: &str) -> String {
    format!("{INDEX_PREFIX}{}", source.to_lowercase())
}

/// Trie of payload field paths keyed by path segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionTree {
    /// A field; `true` when it takes part in search-as-you-type completion.
    Leaf(bool),
    Node(BTreeMap<String, CompletionTree>),
}

impl From<bool> for CompletionTree {
    fn from(include: bool) -> Self {
        Self::Leaf(include)
    }
}

impl CompletionTree {
    /// Groups the paths on their first segment and recurses on the
    /// remainders. A segment without a non-blank remainder is a completion
    /// leaf, unless a longer path below it turns it into a node.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for path in paths {
            let path = path.as_ref();
            let (first, rest) = path.split_once('.').unwrap_or((path, ""));
            let remainders = groups.entry(first.to_owned()).or_default();

            if !rest.trim().is_empty() {
                remainders.push(rest.to_owned());
            }
        }

        if groups.is_empty() {
            return Self::Leaf(true);
        }

        Self::Node(
            groups
                .into_iter()
                .map(|(segment, remainders)| (segment, Self::from_paths(remainders)))
                .collect(),
        )
    }

    /// Renders this tree as an index field mapping.
    #[must_use]
    pub fn to_mapping(&self) -> Value {
        match self {
            Self::Leaf(true) => completion_field(),
            Self::Leaf(false) => json!({ "type": "text" }),
            Self::Node(children) => json!({ "properties": Self::properties(children) }),
        }
    }

    fn properties(children: &BTreeMap<String, Self>) -> Map<String, Value> {
        children
            .iter()
            .map(|(segment, child)| (segment.clone(), child.to_mapping()))
            .collect()
    }

    /// Body of the create-index request for `source`.
    ///
    /// The base properties describe the envelope fields every document
    /// carries. When the tree has nested fields they are added as an object
    /// property named after the source.
    #[must_use]
    pub fn index_body(&self, source: &str) -> Value {
        let mut properties = Map::new();
        drop(properties.insert("id".to_owned(), json!({ "type": "keyword" })));
        drop(properties.insert("title".to_owned(), completion_field()));
        drop(properties.insert("object_meta".to_owned(), json!({ "type": "text" })));
        drop(properties.insert("object_bron".to_owned(), json!({ "type": "keyword" })));

        if let Self::Node(children) = self {
            drop(properties.insert(
                source.to_owned(),
                json!({
                    "type": "object",
                    "properties": Self::properties(children),
                }),
            ));
        }

        json!({ "mappings": { "properties": properties } })
    }
}

fn completion_field() -> Value {
    json!({
        "type": "text",
        "fields": {
            "completion": { "type": "search_as_you_type" }
        }
    })
}
