use dice::config::toml_config::{JobType, TomlConfig};
use dice::core::symbol::{SymbolKind, SymbolSpec};
use dice::core::RunSettings;
use dice::utils::validation::Validate;
use dice::{DiceEngine, LocalStorage, SymbolWorkload, XmlWorkload};
use std::io::Read;
use tempfile::TempDir;

const SCHEMA: &str = r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0"
         datatypeLibrary="http://www.w3.org/2001/XMLSchema-datatypes">
  <start>
    <element name="network">
      <attribute name="name"><data type="NCName"/></attribute>
      <element name="mtu">
        <data type="int">
          <param name="minInclusive">576</param>
          <param name="maxInclusive">9000</param>
        </data>
      </element>
      <oneOrMore>
        <element name="ip">
          <attribute name="family"><value>ipv4</value></attribute>
        </element>
      </oneOrMore>
    </element>
  </start>
</grammar>
"#;

fn write_schema(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("network.rng");
    std::fs::write(&path, SCHEMA).unwrap();
    path
}

#[tokio::test]
async fn test_end_to_end_xml_files() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(&temp_dir);
    let output_path = temp_dir.path().join("out").to_str().unwrap().to_string();

    let workload =
        XmlWorkload::from_schema_file(&schema, Default::default(), vec![], None).unwrap();
    let settings = RunSettings {
        seed: Some(11),
        count: 3,
        ..RunSettings::default()
    };
    let engine = DiceEngine::new(workload, settings);
    let storage = LocalStorage::new(output_path.clone());

    let report = engine.run(&storage).await.unwrap();
    assert_eq!(report.generated, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(
        report.files,
        vec![
            "network-0000.xml".to_string(),
            "network-0001.xml".to_string(),
            "network-0002.xml".to_string()
        ]
    );

    for file in &report.files {
        let text = std::fs::read_to_string(std::path::Path::new(&output_path).join(file)).unwrap();
        let doc = roxmltree::Document::parse(&text).unwrap();
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "network");
        assert!(root.attribute("name").is_some());

        let mtu: i64 = root
            .children()
            .find(|n| n.has_tag_name("mtu"))
            .and_then(|n| n.text())
            .unwrap()
            .parse()
            .unwrap();
        assert!((576..=9000).contains(&mtu));
        assert!(root.children().filter(|n| n.has_tag_name("ip")).count() >= 1);
    }
}

#[tokio::test]
async fn test_end_to_end_symbol_archive() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let mut spec = SymbolSpec::new(SymbolKind::Integer);
    spec.minimum = Some(1);
    spec.maximum = Some(6);
    let workload = SymbolWorkload::new(spec, "die");
    let settings = RunSettings {
        seed: Some(6),
        count: 10,
        keep_going: false,
        archive: Some("rolls.zip".to_string()),
    };

    let engine = DiceEngine::new(workload, settings);
    let report = engine
        .run(&LocalStorage::new(output_path.clone()))
        .await
        .unwrap();
    assert_eq!(report.files, vec!["rolls.zip".to_string()]);

    let zip_data = std::fs::read(temp_dir.path().join("rolls.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    assert_eq!(archive.len(), 10);

    let mut content = String::new();
    archive
        .by_name("die-0007.bin")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    let roll: i64 = content.parse().unwrap();
    assert!((1..=6).contains(&roll));
}

#[tokio::test]
async fn test_same_seed_same_corpus() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(&temp_dir);

    let mut outputs = Vec::new();
    for run in 0..2 {
        let dir = temp_dir.path().join(format!("run{}", run));
        let workload =
            XmlWorkload::from_schema_file(&schema, Default::default(), vec![], None).unwrap();
        let settings = RunSettings {
            seed: Some(2024),
            count: 2,
            ..RunSettings::default()
        };
        let storage = LocalStorage::new(dir.to_str().unwrap().to_string());
        DiceEngine::new(workload, settings).run(&storage).await.unwrap();
        outputs.push(std::fs::read_to_string(dir.join("network-0001.xml")).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn test_toml_jobs_drive_the_engine() {
    let temp_dir = TempDir::new().unwrap();
    write_schema(&temp_dir);
    let output_path = temp_dir.path().join("corpus");

    let config_text = format!(
        r#"
[campaign]
name = "net"
seed = 5
output_path = "{}"

[generator]
optional_probability = 1.0

[[overrides]]
xml_path = "/network/name"
value = "default"

[[jobs]]
name = "networks"
type = "xml"
schema = "network.rng"
count = 2
"#,
        output_path.display()
    );
    let config_path = temp_dir.path().join("dice.toml");
    std::fs::write(&config_path, config_text).unwrap();

    let config = TomlConfig::from_file(&config_path).unwrap();
    config.validate().unwrap();

    let job = config.enabled_jobs().next().unwrap();
    assert_eq!(job.r#type, JobType::Xml);

    let workload = XmlWorkload::from_schema_file(
        config.resolve_path(job.schema.as_deref().unwrap()),
        config.generator_options(),
        config.override_rules(),
        job.start.clone(),
    )
    .unwrap();
    let storage = LocalStorage::new(output_path.to_str().unwrap().to_string());
    let report = DiceEngine::new(workload, job.settings(config.seed()))
        .run(&storage)
        .await
        .unwrap();
    assert_eq!(report.generated, 2);

    let text = std::fs::read_to_string(output_path.join("network-0000.xml")).unwrap();
    assert!(text.starts_with("<network name=\"default\">"));
}
