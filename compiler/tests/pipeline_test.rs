#![cfg(test)]

use std::fs;
use std::path::Path;

use bufobjects_compiler::{
    bundle::TemplateSet,
    classifier::classify,
    compile_documents,
    error::BufObjectsError,
    parse_document,
    run,
    types::{ElementType, FieldShape, ScalarType},
    CompilerConfig,
    DocumentConfig,
};

fn config_for(root: &Path) -> CompilerConfig {
    let mut config = CompilerConfig::new("go", format!("{}/schemas/*.yml", root.display()));
    config.output = root.join("out").join("gen.go");
    config
}

fn write_schema(root: &Path, name: &str, text: &str) {
    let dir = root.join("schemas");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), text).unwrap();
}

#[test]
fn test_point_is_fixed_size_with_allocated_id() {
    let source = parse_document("point.yml", "Point:\n  x: int32\n  y: int32\n").unwrap();
    let templates = TemplateSet::builtin("go").unwrap();
    let (doc, _) = compile_documents(&[source], &DocumentConfig::default(), &templates).unwrap();

    assert_eq!(doc.records.len(), 1);
    let point = &doc.records[0];
    assert!(point.id >= 1);
    assert!(!point.is_variable_size);
    assert_eq!(point.fields.len(), 2);
    for field in &point.fields {
        assert_eq!(field.shape(), FieldShape::Scalar);
        assert_eq!(field.base_size(), Some(4));
    }
}

#[test]
fn test_player_is_variable_size_because_of_name() {
    let sources = [
        parse_document("player.yml", "Player:\n  name: string\n  position: Point\n").unwrap(),
        parse_document("point.yml", "Point:\n  x: int32\n  y: int32\n").unwrap(),
    ];
    let templates = TemplateSet::builtin("go").unwrap();
    let (doc, text) = compile_documents(&sources, &DocumentConfig::default(), &templates).unwrap();

    let player = doc.record_by_raw_name("Player").unwrap();
    let point = doc.record_by_raw_name("Point").unwrap();
    assert!(player.is_variable_size);
    assert!(!point.is_variable_size);
    assert_ne!(player.id, point.id);

    // Records are emitted in ingestion order, source by source.
    let player_at = text.find("type Player struct").unwrap();
    let point_at = text.find("type Point struct").unwrap();
    assert!(player_at < point_at);
    assert!(text.contains("// Source: player.yml"));
    assert!(text.contains("n += o.position.Marshal(buf[n:])"));
}

#[test]
fn test_duplicate_id_fails_without_output() {
    let root = tempfile::tempdir().unwrap();
    write_schema(root.path(), "ids.yml", "A:\n  _id: 5\nB:\n  _id: 5\n");
    let config = config_for(root.path());

    let err = run(&config).unwrap_err();
    assert!(matches!(err, BufObjectsError::DuplicateIdentifier { id: 5, .. }));
    assert!(!config.output.exists());
}

#[test]
fn test_duplicate_id_across_files() {
    let root = tempfile::tempdir().unwrap();
    write_schema(root.path(), "a.yml", "A:\n  _id: 7\n");
    write_schema(root.path(), "b.yml", "B:\n  _id: 7\n");

    let err = run(&config_for(root.path())).unwrap_err();
    match err {
        BufObjectsError::DuplicateIdentifier { at, id, record } => {
            assert_eq!((id, record.as_str()), (7, "B"));
            assert!(at.ends_with("b.yml:2:3"), "{at}");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_classification_of_containers() {
    let fixed = classify("[4]int32").unwrap();
    assert_eq!(fixed.shape, FieldShape::FixedArray);
    assert_eq!(fixed.element, ElementType::Scalar(ScalarType::Int32));
    assert_eq!(fixed.array_length, Some(4));

    let points = classify("[]Point").unwrap();
    assert_eq!(points.shape, FieldShape::ObjectDynamicSequence);
    assert_eq!(points.element.name(), "Point");

    // Reclassifying the bare element agrees with the combined shape.
    assert_eq!(classify(fixed.element.name()).unwrap().shape, FieldShape::Scalar);
    assert_eq!(classify(points.element.name()).unwrap().shape, FieldShape::ObjectReference);
}

#[test]
fn test_zero_sources_is_a_noop() {
    let root = tempfile::tempdir().unwrap();
    let config = config_for(root.path());
    assert_eq!(run(&config).unwrap(), None);
    assert!(!config.output.exists());
}

#[test]
fn test_run_writes_go_output() {
    let root = tempfile::tempdir().unwrap();
    write_schema(root.path(), "a_shapes.yml", "Shape:\n  _id: 10\n  corners: \"[4]Vec\"\n  scale: float64\n");
    write_schema(root.path(), "b_vec.yml", "# vectors\nVec:\n  x: float32\n  y: float32\nPing:\n");

    let mut config = config_for(root.path());
    config.document.package_name = "geo".to_string();
    config.document.name_suffix = "Msg".to_string();

    let written = run(&config).unwrap();
    assert_eq!(written.as_deref(), Some(config.output.as_path()));

    let text = fs::read_to_string(&config.output).unwrap();
    assert!(text.contains("package geo"));
    assert!(text.contains("type ShapeMsg struct {\n\tcorners [4]VecMsg\n\tscale float64\n}"));
    assert!(text.contains("func (o *ShapeMsg) Id() uint16 {\n\treturn 10\n}"));
    // 4 * (4 + 4) + 8
    assert!(text.contains("func (o *ShapeMsg) Size() int {\n\treturn 40\n}"));
    assert!(text.contains("func (o *PingMsg) Size() int {\n\treturn 0\n}"));
    assert_eq!(text.matches("\t\"math\"\n").count(), 1);
    assert!(text.contains("n += o.corners[i].Marshal(buf[n:])"));
}

#[test]
fn test_unresolved_reference_fails_without_output() {
    let root = tempfile::tempdir().unwrap();
    write_schema(root.path(), "a.yml", "A:\n  b: Missing\n");
    let config = config_for(root.path());

    let err = run(&config).unwrap_err();
    assert!(matches!(err, BufObjectsError::UnresolvedReference { ref field, .. } if field == "b"));
    assert!(!config.output.exists());
}

#[test]
fn test_cycle_across_files_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    write_schema(root.path(), "a.yml", "A:\n  b: B\n");
    write_schema(root.path(), "b.yml", "B:\n  a: \"[2]A\"\n");

    let err = run(&config_for(root.path())).unwrap_err();
    assert!(matches!(err, BufObjectsError::CyclicReference { .. }));
}

#[test]
fn test_custom_template_dir() {
    let root = tempfile::tempdir().unwrap();
    write_schema(root.path(), "a.yml", "A:\n  n: uint8\n");

    let bundle = root.path().join("templates").join("txt");
    fs::create_dir_all(bundle.join("write")).unwrap();
    fs::create_dir_all(bundle.join("read")).unwrap();
    fs::write(bundle.join("doc.tmpl"), "{{#each records}}{{name}}={{id}}\n{{/each}}").unwrap();
    fs::write(bundle.join("objects.tmpl"), "").unwrap();
    fs::write(bundle.join("record.tmpl"), "").unwrap();
    fs::write(bundle.join("array_index.tmpl"), "{{name}}[i]").unwrap();
    fs::write(bundle.join("write").join("write_uint8.tmpl"), "").unwrap();
    fs::write(bundle.join("read").join("read_uint8.tmpl"), "").unwrap();

    let mut config = config_for(root.path());
    config.language = "txt".to_string();
    config.template_dir = Some(root.path().join("templates"));
    config.output = root.path().join("out.txt");

    run(&config).unwrap();
    assert_eq!(fs::read_to_string(&config.output).unwrap(), "A=1\n");
}

#[test]
fn test_missing_template_for_used_shape() {
    let root = tempfile::tempdir().unwrap();
    write_schema(root.path(), "a.yml", "A:\n  s: string\n");

    let bundle = root.path().join("templates").join("txt");
    fs::create_dir_all(&bundle).unwrap();
    fs::write(bundle.join("doc.tmpl"), "{{body}}").unwrap();

    let mut config = config_for(root.path());
    config.language = "txt".to_string();
    config.template_dir = Some(root.path().join("templates"));

    let err = run(&config).unwrap_err();
    assert!(matches!(err, BufObjectsError::MissingTemplate { ref key } if key == "write/write_string"));
    assert!(!config.output.exists());
}
