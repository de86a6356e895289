use indoc::indoc;
use quickcheck::quickcheck;
use yaml_roundtrip::{Engine, Mode, Value, Yaml};

fn round_trip(source: &str) -> Value {
    let engine = Engine::new(Mode::RoundTrip);
    let value = engine.load(source).unwrap();
    assert_eq!(engine.dump(&value).unwrap(), source);
    value
}

#[test]
fn test_key_order_is_kept() {
    let value = round_trip("zeta: 1\nalpha: 2\nmid: 3\n");
    let keys: Vec<_> = value
        .as_hash()
        .unwrap()
        .keys()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(keys, ["zeta", "alpha", "mid"]);
}

#[test]
fn test_merge_key() {
    let value = round_trip(indoc! {"
        base: &b {x: 1}
        derived:
          <<: *b
          y: 2
    "});
    assert_eq!(value["derived"]["x"].as_i64(), Some(1));
    assert_eq!(value["derived"]["y"].as_i64(), Some(2));
}

#[test]
fn test_number_spellings() {
    let value = round_trip(indoc! {"
        hex: 0x1F
        octal: 0o17
        float: 1.50
        exp: 1e+3
        flag: True
    "});
    assert_eq!(value["hex"].as_i64(), Some(31));
    assert_eq!(value["octal"].as_i64(), Some(15));
    assert_eq!(value["flag"].as_bool(), Some(true));
}

#[test]
fn test_edit_keeps_comments() {
    let engine = Engine::new(Mode::RoundTrip);
    let mut value = engine
        .load("# settings\nname: web   # the service\nport: 80\n")
        .unwrap();
    value.insert("port", 8080);
    value.insert("debug", false);
    assert_eq!(
        engine.dump(&value).unwrap(),
        "# settings\nname: web   # the service\nport: 8080\ndebug: false\n"
    );
}

#[test]
fn test_set_trailing_comment() {
    let engine = Engine::new(Mode::RoundTrip);
    let mut value = engine.load("port: 80\n").unwrap();
    value.insert("port", 8080);
    value
        .as_hash_mut()
        .and_then(|hash| hash.get_mut(&Value::from("port")))
        .unwrap()
        .set_trailing_comment("changed");
    assert_eq!(engine.dump(&value).unwrap(), "port: 8080  # changed\n");
}

#[test]
fn test_explicit_document_markers() {
    round_trip("--- # the only document\na: 1\n...\n");
}

#[test]
fn test_version_directive() {
    let value = round_trip("%YAML 1.1\n---\n- yes\n- 010\n");
    assert_eq!(value[0].as_bool(), Some(true));
    assert_eq!(value[1].as_i64(), Some(8));
}

#[test]
fn test_safe_dump_quotes_ambiguous_strings() {
    let engine = Engine::new(Mode::Safe);
    let value = Value::from(vec![
        Value::from("yes"),
        Value::from("1.0"),
        Value::from("null"),
        Value::from("- a"),
    ]);
    assert_eq!(
        engine.dump(&value).unwrap(),
        "[yes, '1.0', 'null', '- a']\n"
    );
}

#[test]
fn test_recursive_values_dump_in_every_mode() {
    for mode in [Mode::Safe, Mode::Unsafe, Mode::RoundTrip] {
        let engine = Engine::new(mode);

        let value = engine.load("&a [1, *a]\n").unwrap();
        let text = engine.dump(&value).unwrap();
        let again = engine.load(&text).unwrap();
        assert_eq!(again[0].as_i64(), Some(1), "{mode:?}: {text}");
        assert_eq!(again[1].data, Yaml::Alias("a".to_owned()), "{mode:?}: {text}");

        let value = engine.load("&m {n: 1, self: *m}\n").unwrap();
        let text = engine.dump(&value).unwrap();
        let again = engine.load(&text).unwrap();
        assert_eq!(again["n"].as_i64(), Some(1), "{mode:?}: {text}");
        assert_eq!(again["self"].data, Yaml::Alias("m".to_owned()), "{mode:?}: {text}");

        let value = engine.load("x: &a [1, *a]\ny: *a\n").unwrap();
        let text = engine.dump(&value).unwrap();
        assert_eq!(text.matches("&a").count(), 1, "{mode:?}: {text}");
        let again = engine.load(&text).unwrap();
        assert_eq!(again["y"][1].data, Yaml::Alias("a".to_owned()), "{mode:?}: {text}");
    }
}

const ALPHABET: &[char] = &[
    'a', 'b', 'z', '0', '1', '9', ' ', ' ', '\n', '\t', '-', '?', ':', ',', '[', ']', '{', '}',
    '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`', '\\', '.', '~', 'é', '你',
];

fn restrict(text: &str) -> String {
    text.chars()
        .map(|c| ALPHABET[u32::from(c) as usize % ALPHABET.len()])
        .collect()
}

quickcheck! {
    fn prop_safe_strings_survive(text: String) -> bool {
        let text = restrict(&text);
        let engine = Engine::new(Mode::Safe);
        let mut map = Value::new(yaml_roundtrip::Yaml::Hash(Default::default()));
        map.insert(text.as_str(), vec![Value::from(text.as_str())]);
        let doc = Value::from(vec![Value::from(text.as_str()), map]);
        let dumped = engine.dump(&doc).unwrap();
        engine.load(&dumped).map_or(false, |back| back == doc)
    }

    fn prop_round_trip_strings_survive(text: String) -> bool {
        let text = restrict(&text);
        let engine = Engine::new(Mode::RoundTrip);
        let doc = Value::from(vec![Value::from(text.as_str())]);
        let dumped = engine.dump(&doc).unwrap();
        engine.load(&dumped).map_or(false, |back| back == doc)
    }
}
