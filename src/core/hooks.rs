//! Extension points of the XML generator.
//!
//! A [`GenerationHook`] sees every schema node before the generator does and
//! may replace its outcome. [`PathOverrides`] is the hook built from the
//! `[[overrides]]` table of a config file.

use crate::core::document::Element;
use crate::core::rnd::Rnd;
use crate::core::schema::{Schema, SchemaNode};
use crate::utils::error::{DiceError, Result};
use serde::{Deserialize, Serialize};

/// Outcome of walking one schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Nothing,
    Text(String),
    /// A finished element with no open parent to attach to.
    Element(Element),
    /// An element that was appended to the enclosing element.
    Attached,
    /// An attribute for the enclosing element.
    Attribute(String, String),
}

impl Fragment {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Fragment::Nothing)
    }
}

#[derive(Debug, Clone)]
pub struct NodeContext<'a> {
    pub tag: &'a str,
    /// `/` + names of the open output elements, plus the node's own name.
    pub xml_path: String,
    /// Schema path from the current `start`/`define` down to the node.
    pub node_path: String,
}

pub trait GenerationHook: Send + Sync {
    /// Runs once on the loaded schema before any document is generated.
    fn prepare(&self, _schema: &mut Schema) -> Result<()> {
        Ok(())
    }

    /// `Some` replaces the node's outcome, `None` lets the generator proceed.
    fn intercept(
        &self,
        _ctx: &NodeContext<'_>,
        _node: &SchemaNode,
        _rnd: &mut Rnd,
    ) -> Option<Fragment> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub xml_path: String,
    /// Limit the rule to `element` or `attribute` nodes.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub skip: bool,
}

impl OverrideRule {
    fn matches(&self, ctx: &NodeContext<'_>) -> bool {
        let tag_ok = match &self.tag {
            Some(tag) => tag == ctx.tag,
            None => matches!(ctx.tag, "element" | "attribute"),
        };
        tag_ok && self.xml_path == ctx.xml_path
    }
}

/// Fixed values or omissions keyed by output path.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    rules: Vec<OverrideRule>,
}

impl PathOverrides {
    pub fn new(rules: Vec<OverrideRule>) -> Result<Self> {
        for rule in &rules {
            if !rule.xml_path.starts_with('/') {
                return Err(DiceError::InvalidConfigValueError {
                    field: "overrides.xml_path".to_string(),
                    value: rule.xml_path.clone(),
                    reason: "Path must start with '/'".to_string(),
                });
            }
            if rule.value.is_none() && !rule.skip {
                return Err(DiceError::ConfigValidationError {
                    field: "overrides".to_string(),
                    message: format!("rule for {} needs either value or skip", rule.xml_path),
                });
            }
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

impl GenerationHook for PathOverrides {
    fn intercept(
        &self,
        ctx: &NodeContext<'_>,
        node: &SchemaNode,
        _rnd: &mut Rnd,
    ) -> Option<Fragment> {
        // 沒有 name 屬性的 element/attribute，xml_path 仍是父節點的路徑
        let named = matches!(node.tag.as_str(), "element" | "attribute");
        let name = node.name().map(|n| n.trim().to_string());
        if named && name.is_none() {
            return None;
        }

        let rule = self.rules.iter().find(|r| r.matches(ctx))?;
        tracing::debug!("Override applied at {} ({})", ctx.xml_path, ctx.node_path);

        if rule.skip {
            return Some(Fragment::Nothing);
        }

        let value = rule.value.clone()?;
        match (node.tag.as_str(), name) {
            ("attribute", Some(name)) => Some(Fragment::Attribute(name, value)),
            ("element", Some(name)) => {
                let mut element = Element::new(name);
                element.text = Some(value);
                Some(Fragment::Element(element))
            }
            _ => Some(Fragment::Text(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(tag: &'a str, xml_path: &str) -> NodeContext<'a> {
        NodeContext {
            tag,
            xml_path: xml_path.to_string(),
            node_path: "/start".to_string(),
        }
    }

    #[test]
    fn test_element_override() {
        let hook = PathOverrides::new(vec![OverrideRule {
            xml_path: "/domain/name".to_string(),
            tag: None,
            value: Some("vm1".to_string()),
            skip: false,
        }])
        .unwrap();
        let mut rnd = Rnd::from_seed(Some(1));
        let node = SchemaNode::new("element").with_attr("name", "name");

        match hook.intercept(&ctx("element", "/domain/name"), &node, &mut rnd) {
            Some(Fragment::Element(el)) => {
                assert_eq!(el.name, "name");
                assert_eq!(el.text.as_deref(), Some("vm1"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(hook
            .intercept(&ctx("element", "/domain/uuid"), &node, &mut rnd)
            .is_none());
        // 預設只比對 element / attribute
        assert!(hook
            .intercept(&ctx("ref", "/domain/name"), &node, &mut rnd)
            .is_none());
    }

    #[test]
    fn test_attribute_and_skip() {
        let hook = PathOverrides::new(vec![
            OverrideRule {
                xml_path: "/domain/type".to_string(),
                tag: Some("attribute".to_string()),
                value: Some("kvm".to_string()),
                skip: false,
            },
            OverrideRule {
                xml_path: "/domain/devices".to_string(),
                tag: None,
                value: None,
                skip: true,
            },
        ])
        .unwrap();
        let mut rnd = Rnd::from_seed(Some(2));
        let attr = SchemaNode::new("attribute").with_attr("name", "type");
        assert_eq!(
            hook.intercept(&ctx("attribute", "/domain/type"), &attr, &mut rnd),
            Some(Fragment::Attribute("type".to_string(), "kvm".to_string()))
        );
        let devices = SchemaNode::new("element").with_attr("name", "devices");
        assert_eq!(
            hook.intercept(&ctx("element", "/domain/devices"), &devices, &mut rnd),
            Some(Fragment::Nothing)
        );
    }

    #[test]
    fn test_nameless_element_is_not_overridden() {
        let hook = PathOverrides::new(vec![OverrideRule {
            xml_path: "/vm".to_string(),
            tag: None,
            value: Some("fixed".to_string()),
            skip: false,
        }])
        .unwrap();
        let mut rnd = Rnd::from_seed(Some(3));

        // <element><name>foo</name> 看到的 xml_path 是父節點 /vm
        let child = SchemaNode::new("element").with_child(SchemaNode::new("name").with_text("foo"));
        assert!(hook
            .intercept(&ctx("element", "/vm"), &child, &mut rnd)
            .is_none());

        let vm = SchemaNode::new("element").with_attr("name", "vm");
        assert!(matches!(
            hook.intercept(&ctx("element", "/vm"), &vm, &mut rnd),
            Some(Fragment::Element(el)) if el.name == "vm"
        ));
    }

    #[test]
    fn test_invalid_rules() {
        assert!(PathOverrides::new(vec![OverrideRule {
            xml_path: "domain".to_string(),
            tag: None,
            value: Some("x".to_string()),
            skip: false,
        }])
        .is_err());
        assert!(PathOverrides::new(vec![OverrideRule {
            xml_path: "/domain".to_string(),
            tag: None,
            value: None,
            skip: false,
        }])
        .is_err());
    }
}
