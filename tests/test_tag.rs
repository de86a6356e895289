use indoc::indoc;
use yaml_roundtrip::{Engine, Mode, Value};

fn round_trip_with(engine: &Engine, source: &str) -> Value {
    let value = engine.load(source).unwrap();
    assert_eq!(engine.dump(&value).unwrap(), source);
    value
}

fn round_trip(source: &str) -> Value {
    round_trip_with(&Engine::new(Mode::RoundTrip), source)
}

fn tagged_text(value: &Value) -> (&str, &str) {
    let tagged = value.as_tagged().unwrap();
    (tagged.tag.as_str(), tagged.value.as_str().unwrap())
}

#[test]
fn test_tag() {
    round_trip(indoc! {"
        !!python/object:__main__.Developer
        name: Anthon
        location: Germany
        language: python
    "});
}

#[test]
fn test_full_tag() {
    round_trip(indoc! {"
        !!tag:yaml.org,2002:python/object:__main__.Developer
        name: Anthon
        location: Germany
        language: python
    "});
}

#[test]
fn test_standard_tag() {
    round_trip(indoc! {"
        !!tag:yaml.org,2002:python/object:map
        name: Anthon
        location: Germany
        language: python
    "});
}

#[test]
fn test_local_tag() {
    let value = round_trip(indoc! {"
        !yyy
        name: Anthon
        location: Germany
        language: python
    "});
    let tagged = value.as_tagged().unwrap();
    assert_eq!(tagged.tag, "!yyy");
    assert_eq!(tagged.value["name"].as_str(), Some("Anthon"));
}

#[test]
fn test_secondary_tag() {
    let value = round_trip(indoc! {"
        !!yyy
        name: Anthon
        location: Germany
        language: python
    "});
    assert_eq!(value.as_tagged().unwrap().tag, "tag:yaml.org,2002:yyy");
}

#[test]
fn test_custom_constructor_keeps_tag() {
    let mut engine = Engine::new(Mode::RoundTrip);
    engine.add_constructor("!xxx", |c, node| {
        let fields = c.construct_mapping(node)?;
        Ok(Value::tagged(&node.tag, Value::from(fields)))
    });
    round_trip_with(
        &engine,
        indoc! {"
            !xxx
            name: Anthon
            location: Germany
            language: python
        "},
    );
}

#[test]
fn test_scalar_00() {
    let value = round_trip(indoc! {r#"
        Outputs:
          Vpc:
            Value: !Ref: vpc    # first tag
            Export:
              Name: !Sub "${AWS::StackName}-Vpc"  # second tag
    "#});
    let vpc = &value["Outputs"]["Vpc"];
    assert_eq!(tagged_text(&vpc["Value"]), ("!Ref:", "vpc"));
    assert_eq!(
        tagged_text(&vpc["Export"]["Name"]),
        ("!Sub", "${AWS::StackName}-Vpc")
    );
}

#[test]
fn test_encoded_unicode_tag() {
    let value = Engine::new(Mode::RoundTrip)
        .load("s: !!python/%75nicode 'abc'\n")
        .unwrap();
    assert_eq!(
        tagged_text(&value["s"]),
        ("tag:yaml.org,2002:python/unicode", "abc")
    );
}

#[test]
fn test_implicit_tagged_scalars() {
    let data = round_trip(indoc! {"
        - !SString abcdefg
        - !SFloat 1.0
        - !SInt 1961
        - !SBool true
        - !SLit |
          glitter in the dark near the Tanh√§user gate
    "});
    let count = |i: usize, c: char| tagged_text(&data[i]).1.matches(c).count();
    assert_eq!(count(0, 'd'), 1);
    assert_eq!(count(1, '1'), 1);
    assert_eq!(count(2, '1'), 2);
    assert_eq!(count(3, 'u'), 1);
    assert_eq!(count(4, 'a'), 4);
}

#[test]
fn test_tagged_mapping() {
    round_trip("- !Mapping {a: 1, b: 2}\n");
}

#[test]
fn test_tagged_sequence() {
    let mut engine = Engine::new(Mode::RoundTrip);
    engine.emitter.brace_single_entry_mapping_in_flow_sequence = true;
    engine.emitter.mapping_value_align = true;
    round_trip_with(&engine, "- !Sequence [a, {b: 1}, {c: {d: 3}}]\n");
}

#[test]
fn test_tagged_sequence_bare_pairs() {
    let mut engine = Engine::new(Mode::RoundTrip);
    engine.emitter.mapping_value_align = true;
    round_trip_with(&engine, "- !Sequence [a, b: 1, c: {d: 3}]\n");
}

#[test]
fn test_unknown_tags_in_safe_mode() {
    let engine = Engine::new(Mode::Safe);
    let value = engine.load("- !SInt 1961\n- !Mapping {a: 1}\n").unwrap();
    assert_eq!(tagged_text(&value[0]), ("!SInt", "1961"));
    assert_eq!(
        engine.dump(&value).unwrap(),
        "- !SInt 1961\n- !Mapping {a: 1}\n"
    );
}

#[test]
fn test_unknown_tag_in_unsafe_mode() {
    let err = Engine::new(Mode::Unsafe).load("- !SInt 1961\n").unwrap_err();
    assert!(err.to_string().contains("!SInt"), "{err}");
}

#[test]
fn test_core_tags() {
    let value = round_trip(indoc! {"
        a: !!str 123
        b: !!float 1
        c: !!int '7'
    "});
    assert_eq!(value["a"].as_str(), Some("123"));
    assert_eq!(value["b"].as_f64(), Some(1.0));
    assert_eq!(value["c"].as_i64(), Some(7));
}

#[test]
fn test_tag_directive() {
    let value = round_trip(indoc! {"
        %TAG !e! tag:example.com,2000:app/
        --- !e!foo bar
    "});
    assert_eq!(tagged_text(&value), ("tag:example.com,2000:app/foo", "bar"));
}
