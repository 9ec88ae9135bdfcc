//! RELAX NG grammars (XML syntax) loaded into an owned tree.

use crate::utils::error::{DiceError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const RELAXNG_NS: &str = "http://relaxng.org/ns/structure/1.0";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaNode {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<SchemaNode>,
}

impl SchemaNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: SchemaNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.attr("name")
    }

    pub fn find_child(&self, tag: &str) -> Option<&SchemaNode> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a SchemaNode> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    pub fn has_child(&self, tag: &str) -> bool {
        self.find_child(tag).is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    root: SchemaNode,
    source: Option<PathBuf>,
}

impl Schema {
    /// 從 .rng 檔案載入，遞迴展開 include
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut stack = Vec::new();
        let root = load_grammar(path, &mut stack)?;
        tracing::debug!(
            "Loaded schema {} with {} top-level nodes",
            path.display(),
            root.children.len()
        );
        Ok(Self {
            root,
            source: Some(path.to_path_buf()),
        })
    }

    /// Parse schema text; includes resolve against `base_dir`.
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self> {
        let mut root = parse_node_tree(text)?;
        let mut stack = Vec::new();
        root.children = expand_grammar(std::mem::take(&mut root.children), base_dir, &mut stack)?;
        Ok(Self { root, source: None })
    }

    pub fn from_root(root: SchemaNode) -> Self {
        Self { root, source: None }
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut SchemaNode {
        &mut self.root
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// `<start>` of a grammar. A schema whose root is a bare pattern (no
    /// `<grammar>`) is its own start.
    pub fn start(&self) -> Option<&SchemaNode> {
        if self.root.tag == "grammar" {
            self.root.find_child("start")
        } else {
            Some(&self.root)
        }
    }

    pub fn defines(&self, name: &str) -> Vec<&SchemaNode> {
        self.root
            .children_named("define")
            .filter(|d| d.name() == Some(name))
            .collect()
    }

    pub fn define(&self, name: &str) -> Option<&SchemaNode> {
        self.defines(name).into_iter().next()
    }

    /// Drop every top-level node with the given tag; returns how many went.
    pub fn remove_children(&mut self, tag: &str) -> usize {
        let before = self.root.children.len();
        self.root.children.retain(|c| c.tag != tag);
        before - self.root.children.len()
    }
}

fn load_grammar(path: &Path, stack: &mut Vec<PathBuf>) -> Result<SchemaNode> {
    let canonical = fs::canonicalize(path)?;
    if stack.contains(&canonical) {
        return Err(DiceError::schema(format!(
            "include cycle through {}",
            path.display()
        )));
    }

    let text = fs::read_to_string(path)?;
    let mut root = parse_node_tree(&text)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    stack.push(canonical);
    let children = expand_grammar(std::mem::take(&mut root.children), base_dir, stack);
    stack.pop();

    root.children = children?;
    Ok(root)
}

/// 把 include 換成被引入文法的頂層節點（放在前面），div 攤平
fn expand_grammar(
    children: Vec<SchemaNode>,
    base_dir: &Path,
    stack: &mut Vec<PathBuf>,
) -> Result<Vec<SchemaNode>> {
    let mut included = Vec::new();
    let mut rest = Vec::new();
    collect_children(children, base_dir, stack, &mut included, &mut rest)?;
    included.extend(rest);
    Ok(included)
}

fn collect_children(
    children: Vec<SchemaNode>,
    base_dir: &Path,
    stack: &mut Vec<PathBuf>,
    included: &mut Vec<SchemaNode>,
    rest: &mut Vec<SchemaNode>,
) -> Result<()> {
    for child in children {
        match child.tag.as_str() {
            "include" => {
                let href = child
                    .attr("href")
                    .ok_or_else(|| DiceError::schema("<include> without href"))?;
                let grammar = load_grammar(&base_dir.join(href), stack)?;
                included.extend(apply_include_overrides(grammar.children, child.children));
            }
            "div" => collect_children(child.children, base_dir, stack, included, rest)?,
            _ => rest.push(child),
        }
    }
    Ok(())
}

/// Definitions inside `<include>` replace same-name ones of the included grammar.
fn apply_include_overrides(
    grammar: Vec<SchemaNode>,
    overrides: Vec<SchemaNode>,
) -> Vec<SchemaNode> {
    let overrides: Vec<SchemaNode> = overrides
        .into_iter()
        .flat_map(|o| if o.tag == "div" { o.children } else { vec![o] })
        .collect();

    let replaced = |node: &SchemaNode| {
        overrides.iter().any(|o| {
            o.tag == node.tag && (node.tag == "start" || (node.tag == "define" && o.name() == node.name()))
        })
    };

    let mut merged: Vec<SchemaNode> = grammar.into_iter().filter(|n| !replaced(n)).collect();
    merged.extend(overrides);
    merged
}

fn parse_node_tree(text: &str) -> Result<SchemaNode> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let document = roxmltree::Document::parse_with_options(text, options)?;
    convert(document.root_element())
        .ok_or_else(|| DiceError::schema("root element is not a RELAX NG pattern"))
}

fn convert(node: roxmltree::Node) -> Option<SchemaNode> {
    match node.tag_name().namespace() {
        None | Some(RELAXNG_NS) => {}
        // 註解用的外部命名空間元素（a:documentation 等）
        Some(_) => return None,
    }

    let tag = node.tag_name().name().to_string();
    let attrs = node
        .attributes()
        .filter(|a| a.namespace().is_none())
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect();

    let raw: String = node
        .children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();
    let text = if raw.trim().is_empty() {
        None
    } else if tag == "value" {
        Some(raw)
    } else {
        Some(raw.trim().to_string())
    };

    let children = node
        .children()
        .filter(|c| c.is_element())
        .filter_map(convert)
        .collect();

    Some(SchemaNode {
        tag,
        attrs,
        text,
        children,
    })
}
