use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generate_code;

pub type CategoryCode = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub code: CategoryCode,
    pub name: String,
    /// Parent in the category hierarchy, `None` for a root category
    pub parent_category_code: Option<CategoryCode>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            code: generate_code(),
            name: name.into(),
            parent_category_code: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_parent(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_category_code = Some(parent_code.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_category_code.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub code: CategoryCode,
    pub name: String,
    pub children: Vec<CategoryNode>,
}

/// Build the category forest from a flat list.
/// A category whose parent is missing from the list is treated as a root.
/// Siblings keep the order of the input list.
pub fn build_category_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let known: HashSet<&str> = categories.iter().map(|c| c.code.as_str()).collect();

    let mut children_of: HashMap<&str, Vec<&Category>> = HashMap::new();
    let mut roots = Vec::new();
    for category in categories {
        match category.parent_category_code.as_deref() {
            Some(parent) if known.contains(parent) && parent != category.code => {
                children_of.entry(parent).or_default().push(category)
            }
            _ => roots.push(category),
        }
    }

    let mut visited = HashSet::new();
    roots
        .into_iter()
        .map(|root| build_node(root, &children_of, &mut visited))
        .collect()
}

fn build_node<'a>(
    category: &'a Category,
    children_of: &HashMap<&str, Vec<&'a Category>>,
    visited: &mut HashSet<&'a str>,
) -> CategoryNode {
    visited.insert(category.code.as_str());
    let children = children_of
        .get(category.code.as_str())
        .map(|children| {
            let mut nodes = Vec::with_capacity(children.len());
            for &child in children {
                if !visited.contains(child.code.as_str()) {
                    nodes.push(build_node(child, children_of, visited));
                }
            }
            nodes
        })
        .unwrap_or_default();

    CategoryNode {
        code: category.code.clone(),
        name: category.name.clone(),
        children,
    }
}

/// Walk up the parent chain of `code` and return the topmost known ancestor.
/// Returns `None` if `code` itself is unknown. A cycle stops at the last
/// category before the repeat.
pub fn root_of<'a>(code: &str, categories: &'a [Category]) -> Option<&'a Category> {
    let by_code: HashMap<&str, &Category> =
        categories.iter().map(|c| (c.code.as_str(), c)).collect();
    root_in(code, &by_code)
}

/// Whether placing `code` below `new_parent` would make it its own ancestor.
pub fn creates_cycle(code: &str, new_parent: &str, categories: &[Category]) -> bool {
    let by_code: HashMap<&str, &Category> =
        categories.iter().map(|c| (c.code.as_str(), c)).collect();

    let mut seen = HashSet::new();
    let mut current = new_parent;
    loop {
        if current == code {
            return true;
        }
        if !seen.insert(current) {
            return false;
        }
        match by_code.get(current) {
            Some(category) if !category.is_root() => {
                current = category.parent_category_code.as_deref().unwrap_or_default();
            }
            _ => return false,
        }
    }
}

pub(crate) fn root_in<'a>(
    code: &str,
    by_code: &HashMap<&str, &'a Category>,
) -> Option<&'a Category> {
    let mut current = *by_code.get(code)?;
    let mut seen = HashSet::new();
    seen.insert(current.code.as_str());

    while let Some(parent_code) = current.parent_category_code.as_deref() {
        match by_code.get(parent_code) {
            Some(parent) if seen.insert(parent.code.as_str()) => current = parent,
            _ => break,
        }
    }
    Some(current)
}
