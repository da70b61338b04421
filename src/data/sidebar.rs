//! Documentation sidebar tree.
//!
//! A sidebar is an ordered list of items. A bare string refers to an internal
//! document; objects are categories (with nested items and an optional landing
//! page) or external links. Ordering is preserved through parse and render.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Ordered navigation tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sidebar {
    pub items: Vec<SidebarItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SidebarItem {
    /// Shorthand reference to an internal document id
    Doc(String),
    Node(SidebarNode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SidebarNode {
    Doc {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Category {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        link: Option<CategoryLink>,
        items: Vec<SidebarItem>,
    },
    Link {
        label: String,
        href: String,
    },
}

/// Landing page of a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CategoryLink {
    Doc {
        id: String,
    },
    GeneratedIndex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slug: Option<String>,
    },
}

impl SidebarItem {
    /// Internal document id this item points at, if any
    pub fn doc_id(&self) -> Option<&str> {
        match self {
            SidebarItem::Doc(id) => Some(id.as_str()),
            SidebarItem::Node(SidebarNode::Doc { id, .. }) => Some(id.as_str()),
            SidebarItem::Node(SidebarNode::Category {
                link: Some(CategoryLink::Doc { id }),
                ..
            }) => Some(id.as_str()),
            SidebarItem::Node(_) => None,
        }
    }

    fn children(&self) -> &[SidebarItem] {
        match self {
            SidebarItem::Node(SidebarNode::Category { items, .. }) => items.as_slice(),
            _ => &[],
        }
    }
}

impl Sidebar {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Every item, depth-first in declaration order
    pub fn walk(&self) -> Vec<(usize, &SidebarItem)> {
        fn visit<'a>(items: &'a [SidebarItem], depth: usize, out: &mut Vec<(usize, &'a SidebarItem)>) {
            for item in items {
                out.push((depth, item));
                visit(item.children(), depth + 1, out);
            }
        }

        let mut out = Vec::new();
        visit(&self.items, 0, &mut out);
        out
    }

    /// Internal document ids in navigation order, including category landing pages
    pub fn doc_ids(&self) -> Vec<&str> {
        self.walk()
            .into_iter()
            .filter_map(|(_, item)| item.doc_id())
            .collect()
    }

    /// External hyperlinks as (label, href) pairs, in navigation order
    pub fn external_links(&self) -> Vec<(&str, &str)> {
        self.walk()
            .into_iter()
            .filter_map(|(_, item)| match item {
                SidebarItem::Node(SidebarNode::Link { label, href }) => {
                    Some((label.as_str(), href.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    /// Indented text outline of the tree
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for (depth, item) in self.walk() {
            let indent = "  ".repeat(depth);
            let line = match item {
                SidebarItem::Doc(id) => format!("- {id}"),
                SidebarItem::Node(SidebarNode::Doc { id, label: None }) => format!("- {id}"),
                SidebarItem::Node(SidebarNode::Doc { id, label: Some(label) }) => {
                    format!("- {label} ({id})")
                }
                SidebarItem::Node(SidebarNode::Category { label, link, .. }) => match link {
                    Some(CategoryLink::Doc { id }) => format!("+ {label} ({id})"),
                    _ => format!("+ {label}"),
                },
                SidebarItem::Node(SidebarNode::Link { label, href }) => {
                    format!("> {label} <{href}>")
                }
            };
            let _ = writeln!(out, "{indent}{line}");
        }
        out
    }
}
