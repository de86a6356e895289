use libtest_mimic::{run_tests, Arguments, Outcome, Test};

use yaml_roundtrip::{
    parser::{Event, EventReceiver, Parser, Tag},
    ParserError, TScalarStyle,
};

struct EventTest {
    yaml: &'static str,
    /// Expected event stream, one event per line; `None` when parsing must fail.
    tree: Option<&'static str>,
}

/// Name, input, event tree.
#[rustfmt::skip]
static CASES: &[(&str, &str, Option<&str>)] = &[
    ("sequence-of-scalars", "- Mark McGwire\n- Sammy Sosa\n- Ken Griffey\n", Some("
        +STR
        +DOC
        +SEQ
        =VAL :Mark McGwire
        =VAL :Sammy Sosa
        =VAL :Ken Griffey
        -SEQ
        -DOC
        -STR")),
    ("mapping-with-comments", "hr:  65    # Home runs\navg: 0.278 # Batting average\n", Some("
        +STR
        +DOC
        +MAP
        =VAL :hr
        =VAL :65
        =VAL :avg
        =VAL :0.278
        -MAP
        -DOC
        -STR")),
    ("flow-in-block", "a: [b, c]\nd: {e: f}\n", Some("
        +STR
        +DOC
        +MAP
        =VAL :a
        +SEQ []
        =VAL :b
        =VAL :c
        -SEQ
        =VAL :d
        +MAP {}
        =VAL :e
        =VAL :f
        -MAP
        -MAP
        -DOC
        -STR")),
    ("indentless-sequence", "a:\n- b\n- c\n", Some("
        +STR
        +DOC
        +MAP
        =VAL :a
        +SEQ
        =VAL :b
        =VAL :c
        -SEQ
        -MAP
        -DOC
        -STR")),
    ("two-documents", "---\n- a\n...\n---\nb\n", Some("
        +STR
        +DOC ---
        +SEQ
        =VAL :a
        -SEQ
        -DOC ...
        +DOC ---
        =VAL :b
        -DOC
        -STR")),
    ("anchor-and-alias", "- &anchor a\n- *anchor\n", Some("
        +STR
        +DOC
        +SEQ
        =VAL &anchor :a
        =ALI *anchor
        -SEQ
        -DOC
        -STR")),
    ("secondary-tag", "--- !!str a\n", Some("
        +STR
        +DOC ---
        =VAL <tag:yaml.org,2002:str> :a
        -DOC
        -STR")),
    ("local-tag-on-flow-mapping", "!foo {a: b}\n", Some("
        +STR
        +DOC
        +MAP {} <!foo>
        =VAL :a
        =VAL :b
        -MAP
        -DOC
        -STR")),
    ("tag-directive", "%TAG !e! tag:e.com,2000:\n---\n!e!x a\n", Some("
        +STR
        +DOC ---
        =VAL <tag:e.com,2000:x> :a
        -DOC
        -STR")),
    ("literal-scalar", "a: |\n  line1\n  line2\n", Some("
        +STR
        +DOC
        +MAP
        =VAL :a
        =VAL |line1\\nline2\\n
        -MAP
        -DOC
        -STR")),
    ("folded-scalar", "a: >\n  one\n  two\n\n  three\n", Some("
        +STR
        +DOC
        +MAP
        =VAL :a
        =VAL >one two\\nthree\\n
        -MAP
        -DOC
        -STR")),
    ("quoted-scalars", "- 'it''s'\n- \"a\\tb\"\n", Some("
        +STR
        +DOC
        +SEQ
        =VAL 'it's
        =VAL \"a\\tb
        -SEQ
        -DOC
        -STR")),
    ("multi-line-plain", "a: b\n  c\n", Some("
        +STR
        +DOC
        +MAP
        =VAL :a
        =VAL :b c
        -MAP
        -DOC
        -STR")),
    ("empty-values", "a:\nb: 1\n", Some("
        +STR
        +DOC
        +MAP
        =VAL :a
        =VAL :
        =VAL :b
        =VAL :1
        -MAP
        -DOC
        -STR")),
    ("complex-key", "? a\n: b\n", Some("
        +STR
        +DOC
        +MAP
        =VAL :a
        =VAL :b
        -MAP
        -DOC
        -STR")),
    ("single-pair-in-flow-sequence", "[a: b]\n", Some("
        +STR
        +DOC
        +SEQ []
        +MAP {}
        =VAL :a
        =VAL :b
        -MAP
        -SEQ
        -DOC
        -STR")),
    ("version-directive", "%YAML 1.2\n---\na\n", Some("
        +STR
        +DOC ---
        =VAL :a
        -DOC
        -STR")),
    ("comment-only-stream", "# nothing here\n", Some("
        +STR
        -STR")),
    ("empty-explicit-document", "---\n...\n", Some("
        +STR
        +DOC ---
        =VAL :
        -DOC ...
        -STR")),
    ("unterminated-single-quote", "a: 'unterminated\n", None),
    ("unterminated-flow-sequence", "[a, b\n", None),
    ("nested-implicit-mapping", "a: b: c\n", None),
    ("mapping-after-sequence", "- a\nb: c\n", None),
    ("duplicate-version-directive", "%YAML 1.2\n%YAML 1.2\n---\na\n", None),
    ("undefined-tag-handle", "!e!x a\n", None),
];

fn main() {
    let arguments = Arguments::from_args();
    let tests = CASES
        .iter()
        .map(|&(name, yaml, tree)| Test {
            name: name.to_owned(),
            kind: String::new(),
            is_ignored: false,
            is_bench: false,
            data: EventTest { yaml, tree },
        })
        .collect();
    run_tests(&arguments, tests, run_event_test).exit();
}

fn run_event_test(test: &Test<EventTest>) -> Outcome {
    let desc = &test.data;
    let error_text = match (parse_to_events(desc.yaml), desc.tree) {
        (Ok(_), None) => Some("no error when expected".to_owned()),
        (Err(_), None) => None,
        (Err(e), Some(_)) => Some(format!("unexpected error {e}")),
        (Ok(events), Some(tree)) => events_differ(&events, tree),
    };
    match error_text {
        None => Outcome::Passed,
        Some(text) => Outcome::Failed {
            msg: Some(format!("{text}\n### Input:\n{}\n### End", desc.yaml)),
        },
    }
}

fn parse_to_events(source: &str) -> Result<Vec<String>, ParserError> {
    let mut reporter = EventReporter { events: vec![] };
    Parser::new_from_str(source).load(&mut reporter, true)?;
    Ok(reporter.events)
}

struct EventReporter {
    events: Vec<String>,
}

impl EventReceiver for EventReporter {
    fn on_event(&mut self, ev: Event) {
        let line: String = match ev {
            Event::StreamStart => "+STR".into(),
            Event::StreamEnd => "-STR".into(),

            Event::DocumentStart(true) => "+DOC ---".into(),
            Event::DocumentStart(false) => "+DOC".into(),
            Event::DocumentEnd(true) => "-DOC ...".into(),
            Event::DocumentEnd(false) => "-DOC".into(),

            Event::SequenceStart(anchor, tag, flow) => format!(
                "+SEQ{}{}{}",
                if flow { " []" } else { "" },
                format_anchor(anchor.as_deref()),
                format_tag(tag.as_ref())
            ),
            Event::SequenceEnd => "-SEQ".into(),

            Event::MappingStart(anchor, tag, flow) => format!(
                "+MAP{}{}{}",
                if flow { " {}" } else { "" },
                format_anchor(anchor.as_deref()),
                format_tag(tag.as_ref())
            ),
            Event::MappingEnd => "-MAP".into(),

            Event::Scalar(ref text, style, ref anchor, ref tag) => {
                let kind = match style {
                    TScalarStyle::Plain => ":",
                    TScalarStyle::SingleQuoted => "'",
                    TScalarStyle::DoubleQuoted => r#"""#,
                    TScalarStyle::Literal => "|",
                    TScalarStyle::Folded => ">",
                };
                format!(
                    "=VAL{}{} {}{}",
                    format_anchor(anchor.as_deref()),
                    format_tag(tag.as_ref()),
                    kind,
                    escape_text(text)
                )
            }
            Event::Alias(name) => format!("=ALI *{name}"),
            Event::Nothing => return,
        };
        self.events.push(line);
    }
}

fn format_anchor(anchor: Option<&str>) -> String {
    anchor.map_or_else(String::new, |a| format!(" &{a}"))
}

fn format_tag(tag: Option<&Tag>) -> String {
    tag.map_or_else(String::new, |t| format!(" <{}>", t.full))
}

fn escape_text(text: &str) -> String {
    let mut text = text.to_owned();
    for (ch, replacement) in [
        ('\\', r"\\"),
        ('\n', "\\n"),
        ('\r', "\\r"),
        ('\x08', "\\b"),
        ('\t', "\\t"),
    ] {
        text = text.replace(ch, replacement);
    }
    text
}

fn events_differ(actual: &[String], expected: &str) -> Option<String> {
    let expected: Vec<&str> = expected
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    for (idx, (act, exp)) in actual.iter().zip(&expected).enumerate() {
        if act != exp {
            return Some(format!("line {idx} differs: expected `{exp}`, found `{act}`"));
        }
    }
    if let Some(extra) = actual.get(expected.len()) {
        return Some(format!("extra actual line: {extra:?}"));
    }
    expected
        .get(actual.len())
        .map(|extra| format!("extra expected line: {extra:?}"))
}
