use cfgtree_core::{parse, Config, ConfigError, Data, ParseError, SettingType};
use std::fs;
use std::path::PathBuf;

fn include_fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("include")
}

#[test]
fn test_nested_document_to_json() {
    let source = r#"
        app = {
            name = "My App";
            ports = [ 80, 0x1BB ];
            backends = (
                { host = "a.internal"; weight = 0.5; },
                { host = "b.internal"; weight = 1.5; }
            );
        };
        debug = false;
    "#;

    let expected_json = serde_json::json!({
        "app": {
            "name": "My App",
            "ports": [80, 443],
            "backends": [
                { "host": "a.internal", "weight": 0.5 },
                { "host": "b.internal", "weight": 1.5 },
            ],
        },
        "debug": false,
    });

    let config = parse(source, "test.cfg").unwrap();
    let result = config.to_json().unwrap();
    let result_json: serde_json::Value = serde_json::from_str(&result).unwrap();

    assert_eq!(result_json, expected_json);
}

#[test]
fn test_yaml_keeps_document_order() {
    let source = r#"
        zulu = 1;
        alpha = "first";
        list = ( 1, "x" );
    "#;

    let expected_yaml = "zulu: 1\nalpha: first\nlist:\n- 1\n- x\n";

    let config = parse(source, "test.cfg").unwrap();
    assert_eq!(config.to_yaml().unwrap(), expected_yaml);
}

#[test]
fn test_to_value_projection() {
    let config = parse("a = { b = [ 1, 2 ]; };", "test.cfg").unwrap();
    let value = config.to_value();
    assert_eq!(
        value.get("a").and_then(|a| a.get("b")),
        Some(&Data::Sequence(vec![Data::Int(1), Data::Int(2)]))
    );
}

#[test]
fn test_non_finite_float_fails_to_export() {
    let mut config = Config::new();
    config.root_mut().add_value("x", f64::INFINITY).unwrap();
    assert!(matches!(
        config.write_string(),
        Err(ConfigError::Unrepresentable { .. })
    ));
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.cfg");

    let mut config = Config::new();
    let mut root = config.root_mut();
    let mut db = root.add("database", SettingType::Group).unwrap();
    db.add_value("url", "postgres://localhost/app").unwrap();
    db.add_value("pool", 16).unwrap();
    config.write_file(&path).unwrap();

    let mut reread = Config::new();
    reread.read_file(&path).unwrap();
    assert_eq!(reread, config);
    assert_eq!(fs::read_to_string(&path).unwrap(), config.write_string().unwrap());
}

#[test]
fn test_write_file_leaves_no_file_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.cfg");
    let mut config = Config::new();
    config.root_mut().add_value("nan", f64::NAN).unwrap();
    assert!(config.write_file(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_read_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::new();
    let err = config.read_file(dir.path().join("missing.cfg")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_read_file_names_the_file_in_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.cfg");
    fs::write(&path, "ok = 1;\nbroken = ;\n").unwrap();
    let mut config = Config::new();
    let err = config.read_file(&path).unwrap_err();
    assert_eq!(err.line(), Some(2));
    match err {
        ConfigError::Parse(ParseError::UnexpectedToken { src, .. }) => {
            assert!(src.name().ends_with("broken.cfg"), "{}", src.name());
        }
        other => panic!("unexpected error: {:?}", miette::Report::new(other)),
    }
}

#[test]
fn test_include_from_fixture_dir() {
    let dir = include_fixture_dir();
    let mut config = Config::new();
    config.set_include_dir(&dir);
    config.read_file(dir.join("main.cfg")).unwrap();

    assert_eq!(config.lookup("name").unwrap().as_str().unwrap(), "main");
    assert_eq!(config.lookup("shared.retries").unwrap().as_int().unwrap(), 3);
    assert_eq!(config.lookup("local.value").unwrap().as_int().unwrap(), 7);
    let names: Vec<_> = config.root().children().filter_map(|c| c.name()).collect();
    assert_eq!(names, ["name", "shared", "local"]);
}

#[test]
fn test_parse_resolves_includes_next_to_the_file() {
    let dir = include_fixture_dir();
    let main = dir.join("main.cfg");
    let source = fs::read_to_string(&main).unwrap();
    let config = parse(&source, &main.to_string_lossy()).unwrap();
    assert_eq!(config.lookup("shared.timeout").unwrap().as_float().unwrap(), 1.5);
}

#[test]
fn test_include_cycle_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.cfg"), "@include \"b.cfg\"\n").unwrap();
    fs::write(dir.path().join("b.cfg"), "@include \"a.cfg\"\n").unwrap();
    let mut config = Config::new();
    config.set_include_dir(dir.path());
    let err = config.read_str("@include \"a.cfg\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(ParseError::Include { .. })));
}

#[test]
fn test_included_duplicate_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("extra.cfg"), "x = 2;\n").unwrap();
    let mut config = Config::new();
    config.set_include_dir(dir.path());
    let err = config.read_str("x = 1;\n@include \"extra.cfg\"\n").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Parse(ParseError::DuplicateSetting { .. })
    ));
}
