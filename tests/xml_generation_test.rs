use dice::core::xml_gen::GeneratorOptions;
use dice::{DiceError, Rnd, Schema, XmlGenerator};
use regex::Regex;
use std::fs;
use tempfile::TempDir;

const COMMON: &str = r#"<?xml version="1.0"?>
<grammar xmlns="http://relaxng.org/ns/structure/1.0"
         xmlns:a="http://relaxng.org/ns/compatibility/annotations/1.0"
         datatypeLibrary="http://www.w3.org/2001/XMLSchema-datatypes">
  <a:documentation>Shared types</a:documentation>
  <define name="uuid">
    <data type="string">
      <param name="pattern">[0-9a-f]{8}-[0-9a-f]{4}</param>
    </data>
  </define>
  <define name="disk">
    <element name="disk">
      <attribute name="device">
        <choice>
          <value>disk</value>
          <value>cdrom</value>
        </choice>
      </attribute>
    </element>
  </define>
</grammar>
"#;

const DOMAIN: &str = r#"<?xml version="1.0"?>
<grammar xmlns="http://relaxng.org/ns/structure/1.0"
         datatypeLibrary="http://www.w3.org/2001/XMLSchema-datatypes">
  <include href="common.rng"/>
  <start>
    <element name="domain">
      <attribute name="type">
        <choice>
          <value>kvm</value>
          <value>qemu</value>
        </choice>
      </attribute>
      <element name="name"><text/></element>
      <element name="uuid"><ref name="uuid"/></element>
      <optional>
        <element name="memory">
          <data type="unsignedInt">
            <param name="maxInclusive">4096</param>
          </data>
        </element>
      </optional>
      <element name="commandline"><text/></element>
      <element name="devices">
        <zeroOrMore>
          <ref name="disk"/>
        </zeroOrMore>
      </element>
    </element>
  </start>
</grammar>
"#;

fn schema_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("common.rng"), COMMON).unwrap();
    fs::write(dir.path().join("domain.rng"), DOMAIN).unwrap();
    dir
}

fn generator(dir: &TempDir) -> XmlGenerator {
    let schema = Schema::load(dir.path().join("domain.rng")).unwrap();
    XmlGenerator::new(schema, GeneratorOptions::default())
}

#[test]
fn test_document_follows_grammar() {
    let dir = schema_dir();
    let generator = generator(&dir);
    let uuid = Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}$").unwrap();

    for seed in 0..20 {
        let mut rnd = Rnd::from_seed(Some(seed));
        let text = generator.generate_document(&mut rnd, None).unwrap();
        let doc = roxmltree::Document::parse(&text).unwrap();
        let root = doc.root_element();

        assert_eq!(root.tag_name().name(), "domain");
        assert!(matches!(root.attribute("type"), Some("kvm") | Some("qemu")));

        let child = |name: &str| root.children().find(|n| n.has_tag_name(name));
        let uuid_text = child("uuid").and_then(|n| n.text()).unwrap();
        assert!(uuid.is_match(uuid_text), "bad uuid {}", uuid_text);

        // optional_probability 預設為 1.0
        let memory: u64 = child("memory").and_then(|n| n.text()).unwrap().parse().unwrap();
        assert!(memory <= 4096);

        // commandline 會被移除
        assert!(child("commandline").is_none());

        for disk in child("devices").unwrap().children().filter(|n| n.is_element()) {
            assert_eq!(disk.tag_name().name(), "disk");
            assert!(matches!(disk.attribute("device"), Some("disk") | Some("cdrom")));
        }
    }
}

#[test]
fn test_same_seed_same_document() {
    let dir = schema_dir();
    let generator = generator(&dir);

    let mut a = Rnd::from_seed(Some(99));
    let mut b = Rnd::from_seed(Some(99));
    assert_eq!(
        generator.generate_document(&mut a, None).unwrap(),
        generator.generate_document(&mut b, None).unwrap()
    );
}

#[test]
fn test_start_from_define() {
    let dir = schema_dir();
    let generator = generator(&dir);

    let mut rnd = Rnd::from_seed(Some(3));
    let disk = generator.generate(&mut rnd, Some("disk")).unwrap();
    assert_eq!(disk.name, "disk");
    assert!(disk.get("device").is_some());

    let err = generator.generate(&mut rnd, Some("missing")).unwrap_err();
    assert!(matches!(err, DiceError::SchemaError { .. }));
}

#[test]
fn test_optional_can_be_disabled() {
    let dir = schema_dir();
    let schema = Schema::load(dir.path().join("domain.rng")).unwrap();
    let options = GeneratorOptions {
        optional_probability: 0.0,
        ..GeneratorOptions::default()
    };
    let generator = XmlGenerator::new(schema, options);

    let mut rnd = Rnd::from_seed(Some(5));
    let root = generator.generate(&mut rnd, None).unwrap();
    assert!(root.find("memory").is_none());
    assert!(root.find("name").is_some());
}

#[test]
fn test_include_cycle_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("a.rng"),
        r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0"><include href="b.rng"/></grammar>"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("b.rng"),
        r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0"><include href="a.rng"/></grammar>"#,
    )
    .unwrap();

    let err = Schema::load(dir.path().join("a.rng")).unwrap_err();
    assert!(matches!(err, DiceError::SchemaError { .. }));
}

#[test]
fn test_missing_schema_file() {
    let dir = TempDir::new().unwrap();
    assert!(Schema::load(dir.path().join("nope.rng")).is_err());
}
