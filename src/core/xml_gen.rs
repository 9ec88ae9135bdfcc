//! Random XML instances generated from a RELAX NG grammar.

use crate::core::document::Element;
use crate::core::hooks::{Fragment, GenerationHook, NodeContext};
use crate::core::regex_gen::{self, RegexOptions};
use crate::core::rnd::Rnd;
use crate::core::schema::{Schema, SchemaNode};
use crate::utils::error::{DiceError, Result};

pub const STRING_BASE: &str = r"[a-zA-Z0-9_\-.]+";

const INTEGER_TYPES: &[&str] = &[
    "short",
    "int",
    "integer",
    "long",
    "byte",
    "unsignedShort",
    "unsignedInt",
    "unsignedLong",
    "unsignedByte",
    "positiveInteger",
    "nonNegativeInteger",
    "negativeInteger",
    "nonPositiveInteger",
];

const WALK_STACK_BASE: usize = 2 * 1024 * 1024;
const WALK_STACK_PER_NODE: usize = 32 * 1024;

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Open output elements beyond this depth produce nothing. Also caps
    /// chains of `ref` hops that open no element.
    pub max_depth: usize,
    /// Schema nodes open at once; bounds the walker's stack.
    pub max_nesting: usize,
    pub optional_probability: f64,
    pub shuffle_interleave: bool,
    /// Rate of the exponential draw for `zeroOrMore`/`oneOrMore`.
    pub repeat_rate: f64,
    pub max_repeat: usize,
    /// Once this many elements exist, optional and repeated parts stop growing.
    pub max_elements: usize,
    /// Root children removed from every generated document.
    pub strip_elements: Vec<String>,
    pub regex: RegexOptions,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            max_depth: 100,
            max_nesting: 1024,
            optional_probability: 1.0,
            shuffle_interleave: false,
            repeat_rate: 0.5,
            max_repeat: 64,
            max_elements: 10_000,
            strip_elements: vec!["commandline".to_string()],
            regex: RegexOptions::default(),
        }
    }
}

pub struct XmlGenerator {
    schema: Schema,
    options: GeneratorOptions,
    hook: Option<Box<dyn GenerationHook>>,
}

impl XmlGenerator {
    pub fn new(schema: Schema, options: GeneratorOptions) -> Self {
        Self {
            schema,
            options,
            hook: None,
        }
    }

    /// Install a hook; its `prepare` step runs on the schema right away.
    pub fn with_hook(mut self, hook: Box<dyn GenerationHook>) -> Result<Self> {
        hook.prepare(&mut self.schema)?;
        self.hook = Some(hook);
        Ok(self)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Walk from `<start>`, or from `<define name=start>` when given.
    pub fn generate(&self, rnd: &mut Rnd, start: Option<&str>) -> Result<Element> {
        let entry = match start {
            None => self
                .schema
                .start()
                .ok_or_else(|| DiceError::schema("grammar has no <start>"))?,
            Some(name) => self
                .schema
                .define(name)
                .ok_or_else(|| DiceError::schema(format!("no <define name=\"{}\">", name)))?,
        };

        // 遞迴深度由 schema 決定，在 stack 夠大的 thread 上走
        let stack_size = WALK_STACK_BASE
            .saturating_add(self.options.max_nesting.saturating_mul(WALK_STACK_PER_NODE));
        let span = tracing::Span::current();
        let outcome = std::thread::scope(|scope| -> Result<Fragment> {
            let handle = std::thread::Builder::new()
                .name("dice-xml-walk".to_string())
                .stack_size(stack_size)
                .spawn_scoped(scope, move || span.in_scope(|| self.walk(entry, rnd)))?;
            handle
                .join()
                .unwrap_or_else(|_| Err(DiceError::generation("XML walker panicked")))
        })?;

        match outcome {
            Fragment::Element(mut root) => {
                for tag in &self.options.strip_elements {
                    root.remove_all(tag);
                }
                tracing::debug!(
                    "Generated <{}> with {} elements",
                    root.name,
                    root.count()
                );
                Ok(root)
            }
            other => Err(DiceError::generation(format!(
                "schema produced no root element (got {:?})",
                other
            ))),
        }
    }

    pub fn generate_document(&self, rnd: &mut Rnd, start: Option<&str>) -> Result<String> {
        Ok(self.generate(rnd, start)?.to_pretty_string())
    }

    fn walk<'g>(&'g self, entry: &'g SchemaNode, rnd: &mut Rnd) -> Result<Fragment> {
        let mut walk = Walk {
            generator: self,
            rnd,
            elements: Vec::new(),
            path: Vec::new(),
            nesting: 0,
            ref_chain: 0,
            emitted: 0,
        };
        walk.node(entry)
    }
}

struct Walk<'g, 'r> {
    generator: &'g XmlGenerator,
    rnd: &'r mut Rnd,
    elements: Vec<Element>,
    path: Vec<String>,
    nesting: usize,
    /// `ref` hops since the last opened element.
    ref_chain: usize,
    emitted: usize,
}

impl<'g, 'r> Walk<'g, 'r> {
    fn options(&self) -> &'g GeneratorOptions {
        &self.generator.options
    }

    fn node(&mut self, node: &'g SchemaNode) -> Result<Fragment> {
        let options = self.options();
        if self.elements.len() > options.max_depth || self.nesting >= options.max_nesting {
            tracing::trace!("depth limit reached at {}", self.node_path());
            return Ok(Fragment::Nothing);
        }
        tracing::trace!("parsing {}", node.tag);

        let segment = match node.name() {
            Some(name) => format!("{}[@name=\"{}\"]", node.tag, name),
            None => node.tag.clone(),
        };
        let saved = if matches!(node.tag.as_str(), "start" | "define") {
            Some(std::mem::replace(&mut self.path, vec![segment]))
        } else {
            self.path.push(segment);
            None
        };

        self.nesting += 1;
        let result = self.visit(node);
        self.nesting -= 1;

        match saved {
            Some(previous) => self.path = previous,
            None => {
                self.path.pop();
            }
        }
        result
    }

    fn visit(&mut self, node: &'g SchemaNode) -> Result<Fragment> {
        let generator: &'g XmlGenerator = self.generator;
        if let Some(hook) = generator.hook.as_deref() {
            let ctx = NodeContext {
                tag: &node.tag,
                xml_path: self.xml_path(node),
                node_path: self.node_path(),
            };
            if let Some(fragment) = hook.intercept(&ctx, node, self.rnd) {
                return self.settle(fragment);
            }
        }

        let children = node.children.iter();
        match node.tag.as_str() {
            "start" | "define" => self.last_outcome(children),
            "group" | "mixed" => self.sequence(children),
            "interleave" => {
                let mut order: Vec<&'g SchemaNode> = node.children.iter().collect();
                if self.options().shuffle_interleave {
                    self.rnd.shuffle(&mut order);
                }
                self.sequence(order.into_iter())
            }
            "ref" => self.reference(node),
            "element" => self.element(node),
            "attribute" => self.attribute(node),
            "empty" | "notAllowed" => Ok(Fragment::Nothing),
            "optional" => {
                if self.include_optional() {
                    self.sequence(children)
                } else {
                    Ok(Fragment::Nothing)
                }
            }
            "choice" => {
                let picked = self.rnd.choice(&node.children);
                match picked {
                    Some(child) => self.node(child),
                    None => Ok(Fragment::Nothing),
                }
            }
            "zeroOrMore" | "oneOrMore" => {
                let count = self.repeat_count(&node.tag);
                let mut last = Fragment::Nothing;
                for _ in 0..count {
                    let fragment = self.sequence(node.children.iter())?;
                    if !fragment.is_nothing() {
                        last = fragment;
                    }
                }
                Ok(last)
            }
            "list" => {
                let mut items = Vec::new();
                for child in &node.children {
                    self.list_items(child, &mut items)?;
                }
                Ok(Fragment::Text(items.join(" ")))
            }
            "value" => Ok(Fragment::Text(node.text.clone().unwrap_or_default())),
            "text" | "anyName" => Ok(Fragment::Text(self.rnd.text())),
            "anyURI" => Ok(Fragment::Text(self.rnd.uri())),
            "data" => self.data(node),
            other => Err(DiceError::schema(format!(
                "unhandled node <{}> at {}",
                other,
                self.node_path()
            ))),
        }
    }

    /// Walk nodes in order. Returns the last text outcome, or else the last
    /// non-empty one.
    fn sequence(&mut self, nodes: impl Iterator<Item = &'g SchemaNode>) -> Result<Fragment> {
        let mut last_text = None;
        let mut last = Fragment::Nothing;
        for child in nodes {
            match self.node(child)? {
                Fragment::Nothing => {}
                Fragment::Text(text) => last_text = Some(text),
                other => last = other,
            }
        }
        Ok(last_text.map(Fragment::Text).unwrap_or(last))
    }

    /// Walk nodes in order and keep the last non-empty outcome.
    fn last_outcome(&mut self, nodes: impl Iterator<Item = &'g SchemaNode>) -> Result<Fragment> {
        let mut last = Fragment::Nothing;
        for child in nodes {
            let fragment = self.node(child)?;
            if !fragment.is_nothing() {
                last = fragment;
            }
        }
        Ok(last)
    }

    fn reference(&mut self, node: &'g SchemaNode) -> Result<Fragment> {
        let name = node
            .name()
            .ok_or_else(|| DiceError::schema("<ref> without name"))?;
        let schema: &'g Schema = &self.generator.schema;
        let choices: Vec<&'g SchemaNode> = schema
            .defines(name)
            .into_iter()
            .filter(|d| !d.has_child("notAllowed"))
            .collect();

        // 沒有開新元素的 ref 連鎖（例如自我參照的 choice）到 max_depth 就停
        if self.ref_chain >= self.options().max_depth {
            tracing::debug!("ref chain too long at {}", name);
            return Ok(Fragment::Nothing);
        }

        let picked = self.rnd.choice(&choices).copied();
        match picked {
            Some(define) => {
                self.ref_chain += 1;
                let result = self.node(define);
                self.ref_chain -= 1;
                result
            }
            None => {
                tracing::debug!("No usable <define> for ref {}", name);
                Ok(Fragment::Nothing)
            }
        }
    }

    fn element(&mut self, node: &'g SchemaNode) -> Result<Fragment> {
        let (name, content) = self.name_class(node)?;
        self.elements.push(Element::new(name));
        self.emitted += 1;
        let chain = std::mem::take(&mut self.ref_chain);

        for child in content {
            if let Fragment::Text(text) = self.node(child)? {
                if let Some(current) = self.elements.last_mut() {
                    current.text = Some(text);
                }
            }
        }
        self.ref_chain = chain;

        let element = self
            .elements
            .pop()
            .ok_or_else(|| DiceError::generation("element stack underflow"))?;
        self.settle(Fragment::Element(element))
    }

    fn attribute(&mut self, node: &'g SchemaNode) -> Result<Fragment> {
        let (name, content) = self.name_class(node)?;
        let value = match content.first() {
            Some(child) => match self.node(child)? {
                Fragment::Text(text) => Some(text),
                _ => None,
            },
            None => Some(self.rnd.text()),
        };

        match value {
            Some(value) => self.settle(Fragment::Attribute(name, value)),
            None => Ok(Fragment::Nothing),
        }
    }

    /// Attach elements and attributes to the enclosing element.
    fn settle(&mut self, fragment: Fragment) -> Result<Fragment> {
        match fragment {
            Fragment::Element(element) => match self.elements.last_mut() {
                Some(parent) => {
                    parent.append(element);
                    Ok(Fragment::Attached)
                }
                None => Ok(Fragment::Element(element)),
            },
            Fragment::Attribute(name, value) => {
                let current = self.elements.last_mut().ok_or_else(|| {
                    DiceError::generation(format!(
                        "attribute '{}' outside of any element at {}",
                        name,
                        self.path.join("/")
                    ))
                })?;
                current.set(name, value);
                Ok(Fragment::Nothing)
            }
            other => Ok(other),
        }
    }

    /// Name of an element/attribute and the nodes describing its content.
    fn name_class(&mut self, node: &'g SchemaNode) -> Result<(String, &'g [SchemaNode])> {
        if let Some(name) = node.name() {
            return Ok((name.trim().to_string(), &node.children));
        }

        let (first, rest) = node.children.split_first().ok_or_else(|| {
            DiceError::schema(format!("cannot find {} name at {}", node.tag, self.node_path()))
        })?;
        let name = self.pick_name(first).ok_or_else(|| {
            DiceError::schema(format!("cannot find {} name at {}", node.tag, self.node_path()))
        })?;
        Ok((name, rest))
    }

    fn pick_name(&mut self, name_class: &'g SchemaNode) -> Option<String> {
        match name_class.tag.as_str() {
            "name" => name_class.text.clone(),
            "anyName" | "nsName" => Some(self.rnd.ncname()),
            "choice" => {
                let picked = self.rnd.choice(&name_class.children)?;
                self.pick_name(picked)
            }
            _ => None,
        }
    }

    fn list_items(&mut self, node: &'g SchemaNode, out: &mut Vec<String>) -> Result<()> {
        match node.tag.as_str() {
            "group" | "interleave" => {
                for child in &node.children {
                    self.list_items(child, out)?;
                }
            }
            "oneOrMore" | "zeroOrMore" => {
                for _ in 0..self.repeat_count(&node.tag) {
                    for child in &node.children {
                        self.list_items(child, out)?;
                    }
                }
            }
            "optional" => {
                if self.include_optional() {
                    for child in &node.children {
                        self.list_items(child, out)?;
                    }
                }
            }
            "choice" => {
                let picked = self.rnd.choice(&node.children);
                if let Some(child) = picked {
                    self.list_items(child, out)?;
                }
            }
            _ => {
                if let Fragment::Text(text) = self.node(node)? {
                    out.push(text);
                }
            }
        }
        Ok(())
    }

    fn include_optional(&mut self) -> bool {
        let options = self.options();
        self.emitted < options.max_elements && self.rnd.random() < options.optional_probability
    }

    fn repeat_count(&mut self, tag: &str) -> usize {
        let min = usize::from(tag == "oneOrMore");
        if self.emitted >= self.options().max_elements {
            return min;
        }
        let options = self.options();
        let extra = self.rnd.expovariate(options.repeat_rate) as usize;
        extra.min(options.max_repeat) + min
    }

    fn data(&mut self, node: &'g SchemaNode) -> Result<Fragment> {
        let data_type = node.attr("type").unwrap_or("string");
        let param = |name: &str| {
            node.children_named("param")
                .find(|p| p.name() == Some(name))
                .and_then(|p| p.text.as_deref())
        };

        let value = if INTEGER_TYPES.contains(&data_type) {
            let (mut min, mut max) = integer_defaults(data_type);
            if let Some(v) = param("minInclusive") {
                min = parse_param("minInclusive", v)?;
            }
            if let Some(v) = param("maxInclusive") {
                max = parse_param("maxInclusive", v)?;
            }
            if let Some(v) = param("minExclusive") {
                min = parse_param("minExclusive", v)?.saturating_add(1);
            }
            if let Some(v) = param("maxExclusive") {
                max = parse_param("maxExclusive", v)?.saturating_sub(1);
            }
            if min > max {
                return Err(DiceError::schema(format!(
                    "empty range {}..{} for {} at {}",
                    min,
                    max,
                    data_type,
                    self.node_path()
                )));
            }
            self.rnd.randint(min, max).to_string()
        } else {
            match data_type {
                "double" | "float" | "decimal" => self.rnd.expovariate(0.1).to_string(),
                "boolean" => if self.rnd.coin_flip() { "true" } else { "false" }.to_string(),
                "dateTime" => self.rnd.date_time(),
                "NCName" => self.rnd.ncname(),
                "anyURI" => self.rnd.uri(),
                "string" | "token" => {
                    let pattern = param("pattern").unwrap_or(STRING_BASE);
                    let options = self.options();
                    regex_gen::generate(self.rnd, pattern, &options.regex)?
                }
                other => {
                    tracing::warn!("Unhandled data type {} at {}", other, self.node_path());
                    return Ok(Fragment::Nothing);
                }
            }
        };
        Ok(Fragment::Text(value))
    }

    fn xml_path(&self, node: &SchemaNode) -> String {
        let mut names: Vec<&str> = self.elements.iter().map(|e| e.name.as_str()).collect();
        if let Some(name) = node.name() {
            names.push(name);
        }
        format!("/{}", names.join("/"))
    }

    fn node_path(&self) -> String {
        format!("/{}", self.path.join("/"))
    }
}

fn integer_defaults(data_type: &str) -> (i64, i64) {
    match data_type {
        "positiveInteger" => (1, 100),
        "negativeInteger" => (-100, -1),
        "nonPositiveInteger" => (-100, 0),
        "nonNegativeInteger" => (0, 100),
        t if t.starts_with("unsigned") => (0, 100),
        _ => (-100, 100),
    }
}

fn parse_param(name: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| DiceError::schema(format!("bad {} '{}': {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    fn generator(text: &str) -> XmlGenerator {
        XmlGenerator::new(
            Schema::parse(text, Path::new(".")).unwrap(),
            GeneratorOptions::default(),
        )
    }

    #[test]
    fn test_integer_params() {
        let gen = generator(
            r#"<element name="n" xmlns="http://relaxng.org/ns/structure/1.0">
  <data type="unsignedInt"><param name="minInclusive">5</param><param name="maxInclusive">7</param></data>
</element>"#,
        );
        let mut rnd = Rnd::from_seed(Some(1));
        for _ in 0..50 {
            let el = gen.generate(&mut rnd, None).unwrap();
            let v: i64 = el.text.unwrap().parse().unwrap();
            assert!((5..=7).contains(&v));
        }
    }

    #[test]
    fn test_exclusive_bounds_and_defaults() {
        let gen = generator(
            r#"<element name="n" xmlns="http://relaxng.org/ns/structure/1.0">
  <data type="int"><param name="minExclusive">0</param><param name="maxExclusive">2</param></data>
</element>"#,
        );
        let mut rnd = Rnd::from_seed(Some(2));
        assert_eq!(gen.generate(&mut rnd, None).unwrap().text.as_deref(), Some("1"));

        assert_eq!(integer_defaults("positiveInteger"), (1, 100));
        assert_eq!(integer_defaults("unsignedShort"), (0, 100));
        assert_eq!(integer_defaults("long"), (-100, 100));
    }

    #[test]
    fn test_empty_integer_range_is_schema_error() {
        let gen = generator(
            r#"<element name="n" xmlns="http://relaxng.org/ns/structure/1.0">
  <data type="int"><param name="minInclusive">9</param><param name="maxInclusive">1</param></data>
</element>"#,
        );
        let mut rnd = Rnd::from_seed(Some(3));
        assert!(matches!(
            gen.generate(&mut rnd, None),
            Err(DiceError::SchemaError { .. })
        ));
    }

    #[test]
    fn test_unhandled_data_type_yields_nothing() {
        let gen = generator(
            r#"<element name="n" xmlns="http://relaxng.org/ns/structure/1.0"><data type="hexBinary"/></element>"#,
        );
        let mut rnd = Rnd::from_seed(Some(4));
        assert_eq!(gen.generate(&mut rnd, None).unwrap().text, None);
    }

    #[test]
    fn test_unhandled_node_is_error() {
        let gen = generator(
            r#"<element name="n" xmlns="http://relaxng.org/ns/structure/1.0"><externalRef href="x.rng"/></element>"#,
        );
        let mut rnd = Rnd::from_seed(Some(5));
        assert!(matches!(
            gen.generate(&mut rnd, None),
            Err(DiceError::SchemaError { .. })
        ));
    }

    #[test]
    fn test_list_joins_items() {
        let gen = generator(
            r#"<element name="n" xmlns="http://relaxng.org/ns/structure/1.0">
  <list><value>a</value><oneOrMore><value>b</value></oneOrMore></list>
</element>"#,
        );
        let mut rnd = Rnd::from_seed(Some(6));
        let text = gen.generate(&mut rnd, None).unwrap().text.unwrap();
        let items: Vec<&str> = text.split(' ').collect();
        assert_eq!(items[0], "a");
        assert!(items.len() >= 2);
        assert!(items[1..].iter().all(|i| *i == "b"));
    }

    #[test]
    fn test_name_classes() {
        let gen = generator(
            r#"<element xmlns="http://relaxng.org/ns/structure/1.0">
  <name>root</name>
  <attribute><choice><name>x</name><name>y</name></choice><value>1</value></attribute>
  <element><anyName/><empty/></element>
</element>"#,
        );
        let mut rnd = Rnd::from_seed(Some(7));
        let root = gen.generate(&mut rnd, None).unwrap();
        assert_eq!(root.name, "root");
        assert!(root.get("x") == Some("1") || root.get("y") == Some("1"));
        assert_eq!(root.children.len(), 1);
        assert!(!root.children[0].name.is_empty());
    }

    #[test]
    fn test_attribute_without_element_is_error() {
        let gen = generator(
            r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
  <start><attribute name="a"/></start>
</grammar>"#,
        );
        let mut rnd = Rnd::from_seed(Some(8));
        assert!(matches!(
            gen.generate(&mut rnd, None),
            Err(DiceError::GenerationError { .. })
        ));
    }

    #[test]
    fn test_recursion_is_bounded() {
        let gen = XmlGenerator::new(
            Schema::parse(
                r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
  <start><ref name="node"/></start>
  <define name="node"><element name="node"><oneOrMore><ref name="node"/></oneOrMore></element></define>
</grammar>"#,
                Path::new("."),
            )
            .unwrap(),
            GeneratorOptions {
                max_depth: 5,
                max_elements: 200,
                ..GeneratorOptions::default()
            },
        );
        let mut rnd = Rnd::from_seed(Some(9));
        let root = gen.generate(&mut rnd, None).unwrap();
        assert!(root.depth() <= 7);
    }

    #[test]
    fn test_deep_recursive_grammar_with_defaults() {
        let gen = generator(
            r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
  <start><ref name="node"/></start>
  <define name="node">
    <element name="node">
      <optional><attribute name="a"/></optional>
      <oneOrMore><ref name="node"/></oneOrMore>
    </element>
  </define>
</grammar>"#,
        );
        let mut rnd = Rnd::from_seed(Some(3));
        let root = gen.generate(&mut rnd, None).unwrap();
        assert_eq!(root.name, "node");
        assert!(root.depth() <= GeneratorOptions::default().max_depth + 1);
    }

    #[test]
    fn test_ref_loop_without_elements() {
        let gen = generator(
            r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
  <start><element name="r"><ref name="a"/></element></start>
  <define name="a"><choice><ref name="a"/><ref name="a"/></choice></define>
</grammar>"#,
        );
        let mut rnd = Rnd::from_seed(Some(10));
        let root = gen.generate(&mut rnd, None).unwrap();
        assert_eq!(root.name, "r");
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_nesting_limit_cuts_the_walk() {
        let gen = XmlGenerator::new(
            Schema::parse(
                r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
  <start><element name="r"><group><group><group><element name="deep"/></group></group></group></element></start>
</grammar>"#,
                Path::new("."),
            )
            .unwrap(),
            GeneratorOptions {
                max_nesting: 4,
                ..GeneratorOptions::default()
            },
        );
        let mut rnd = Rnd::from_seed(Some(11));
        let root = gen.generate(&mut rnd, None).unwrap();
        assert!(root.find("deep").is_none());
    }

    #[test]
    fn test_start_keeps_last_non_empty_outcome() {
        let gen = generator(
            r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
  <start><value>v</value><element name="root"/><empty/></start>
</grammar>"#,
        );
        let mut rnd = Rnd::from_seed(Some(12));
        assert_eq!(gen.generate(&mut rnd, None).unwrap().name, "root");
    }

    #[test]
    fn test_ref_skips_not_allowed_defines() {
        let gen = generator(
            r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
  <start><element name="r"><ref name="v"/></element></start>
  <define name="v"><notAllowed/></define>
  <define name="v"><value>ok</value></define>
</grammar>"#,
        );
        for seed in 0..20 {
            let mut rnd = Rnd::from_seed(Some(seed));
            let root = gen.generate(&mut rnd, None).unwrap();
            assert_eq!(root.text.as_deref(), Some("ok"));
        }
    }

    #[test]
    fn test_interleave_order() {
        let schema = r#"<element name="r" xmlns="http://relaxng.org/ns/structure/1.0">
  <interleave><element name="a"/><element name="b"/><element name="c"/></interleave>
</element>"#;
        let order = |gen: &XmlGenerator, seed: u64| -> Vec<String> {
            let mut rnd = Rnd::from_seed(Some(seed));
            let root = gen.generate(&mut rnd, None).unwrap();
            root.children.iter().map(|c| c.name.clone()).collect()
        };

        let fixed = generator(schema);
        for seed in 0..10 {
            assert_eq!(order(&fixed, seed), vec!["a", "b", "c"]);
        }

        let shuffled = XmlGenerator::new(
            Schema::parse(schema, Path::new(".")).unwrap(),
            GeneratorOptions {
                shuffle_interleave: true,
                ..GeneratorOptions::default()
            },
        );
        let orders: HashSet<Vec<String>> = (0..20).map(|seed| order(&shuffled, seed)).collect();
        assert!(orders.len() > 1);
        for o in &orders {
            let mut sorted = o.clone();
            sorted.sort();
            assert_eq!(sorted, vec!["a", "b", "c"]);
        }
    }

    struct DropDefines;

    impl GenerationHook for DropDefines {
        fn prepare(&self, schema: &mut Schema) -> Result<()> {
            schema.remove_children("define");
            Ok(())
        }
    }

    #[test]
    fn test_hook_prepare_edits_schema() {
        let schema = r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
  <start><element name="r"><ref name="extra"/></element></start>
  <define name="extra"><element name="e"/></define>
</grammar>"#;
        let mut rnd = Rnd::from_seed(Some(13));

        let plain = generator(schema);
        assert!(plain.generate(&mut rnd, None).unwrap().find("e").is_some());

        let hooked = generator(schema).with_hook(Box::new(DropDefines)).unwrap();
        assert!(hooked.schema().defines("extra").is_empty());
        let root = hooked.generate(&mut rnd, None).unwrap();
        assert_eq!(root.name, "r");
        assert!(root.children.is_empty());
    }

    type Seen = Arc<Mutex<Vec<(String, String, String)>>>;

    struct Recorder(Seen);

    impl GenerationHook for Recorder {
        fn intercept(
            &self,
            ctx: &NodeContext<'_>,
            _node: &SchemaNode,
            _rnd: &mut Rnd,
        ) -> Option<Fragment> {
            if matches!(ctx.tag, "element" | "attribute") {
                let entry = (
                    ctx.tag.to_string(),
                    ctx.xml_path.clone(),
                    ctx.node_path.clone(),
                );
                self.0.lock().unwrap().push(entry);
            }
            None
        }
    }

    #[test]
    fn test_hook_sees_paths_during_walk() {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let gen = generator(
            r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
  <start><element name="domain"><ref name="devs"/></element></start>
  <define name="devs">
    <element name="devices"><attribute name="type"><value>pci</value></attribute></element>
  </define>
</grammar>"#,
        )
        .with_hook(Box::new(Recorder(seen.clone())))
        .unwrap();

        let mut rnd = Rnd::from_seed(Some(14));
        let root = gen.generate(&mut rnd, None).unwrap();
        assert_eq!(root.find("devices").and_then(|d| d.get("type")), Some("pci"));

        let seen = seen.lock().unwrap();
        let expected =
            |tag: &str, xml: &str, node: &str| (tag.to_string(), xml.to_string(), node.to_string());
        assert_eq!(
            *seen,
            vec![
                expected("element", "/domain", r#"/start/element[@name="domain"]"#),
                expected(
                    "element",
                    "/domain/devices",
                    r#"/define[@name="devs"]/element[@name="devices"]"#
                ),
                expected(
                    "attribute",
                    "/domain/devices/type",
                    r#"/define[@name="devs"]/element[@name="devices"]/attribute[@name="type"]"#
                ),
            ]
        );
    }

    #[test]
    fn test_data_types() {
        let gen = generator(
            r#"<element name="r" xmlns="http://relaxng.org/ns/structure/1.0">
  <attribute name="b"><data type="boolean"/></attribute>
  <attribute name="t"><data type="dateTime"/></attribute>
  <attribute name="n"><data type="NCName"/></attribute>
  <attribute name="u"><data type="anyURI"/></attribute>
  <attribute name="f"><data type="float"/></attribute>
  <attribute name="k"><data type="token"><param name="pattern">[A-Z]{3}</param></data></attribute>
</element>"#,
        );
        let token = regex::Regex::new("^[A-Z]{3}$").unwrap();

        for seed in 0..30 {
            let mut rnd = Rnd::from_seed(Some(seed));
            let root = gen.generate(&mut rnd, None).unwrap();
            let attr = |name: &str| root.get(name).unwrap().to_string();

            assert!(matches!(attr("b").as_str(), "true" | "false"));
            let stamp = attr("t");
            assert!(chrono::NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%dT%H:%M:%S").is_ok());

            let ncname = attr("n");
            let first = ncname.chars().next().unwrap();
            assert!(first.is_ascii_alphabetic() || first == '_');
            assert!(!ncname.contains(':'));

            assert!(url::Url::parse(&attr("u")).is_ok());
            assert!(attr("f").parse::<f64>().unwrap() >= 0.0);
            assert!(token.is_match(&attr("k")));
        }
    }

    #[test]
    fn test_max_elements_caps_growth() {
        let schema = r#"<element name="r" xmlns="http://relaxng.org/ns/structure/1.0">
  <oneOrMore><element name="c"><oneOrMore><element name="d"/></oneOrMore></element></oneOrMore>
</element>"#;
        let build = |max_elements: usize| {
            XmlGenerator::new(
                Schema::parse(schema, Path::new(".")).unwrap(),
                GeneratorOptions {
                    repeat_rate: 0.001,
                    max_elements,
                    ..GeneratorOptions::default()
                },
            )
        };
        let capped = build(50);
        let uncapped = build(usize::MAX);

        let mut largest = 0;
        for seed in 0..5 {
            let mut rnd = Rnd::from_seed(Some(seed));
            let root = capped.generate(&mut rnd, None).unwrap();
            // 超過上限後每個 oneOrMore 只產生一次
            assert!(root.count() <= 200, "{} elements", root.count());
            assert!(root.find_all("c").all(|c| !c.children.is_empty()));

            let mut rnd = Rnd::from_seed(Some(seed));
            largest = largest.max(uncapped.generate(&mut rnd, None).unwrap().count());
        }
        assert!(largest > 1000);
    }
}
