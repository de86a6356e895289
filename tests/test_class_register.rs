use hashlink::LinkedHashMap;
use yaml_roundtrip::{
    Constructor, ConstructorError, Engine, Mode, NodeRef, Representer, RepresenterError, Value,
    YamlClass,
};

#[derive(Debug, PartialEq)]
struct User0 {
    name: String,
    age: i64,
}

impl YamlClass for User0 {
    fn fields(&self) -> Vec<(String, Value)> {
        vec![
            ("name".into(), self.name.as_str().into()),
            ("age".into(), self.age.into()),
        ]
    }

    fn from_fields(fields: LinkedHashMap<Value, Value>) -> Result<Self, String> {
        let name = fields.get(&Value::from("name")).and_then(Value::as_str);
        let age = fields.get(&Value::from("age")).and_then(Value::as_i64);
        match (name, age) {
            (Some(name), Some(age)) => Ok(User0 {
                name: name.to_owned(),
                age,
            }),
            _ => Err("a user needs a name and an age".to_owned()),
        }
    }
}

#[derive(Debug, PartialEq)]
struct User1 {
    name: String,
    age: i64,
}

impl YamlClass for User1 {
    fn yaml_tag() -> String {
        "!user".to_owned()
    }

    fn from_yaml(c: &mut Constructor<'_>, node: &NodeRef) -> Result<Self, ConstructorError> {
        let text = c.construct_scalar(node)?;
        text.rsplit_once('-')
            .and_then(|(name, age)| {
                Some(User1 {
                    name: name.to_owned(),
                    age: age.parse().ok()?,
                })
            })
            .ok_or_else(|| ConstructorError::new(node.start, &node.tag, "expected name-age"))
    }

    fn to_yaml(&self, r: &mut Representer<'_>) -> Result<NodeRef, RepresenterError> {
        Ok(r.represent_scalar(&Self::yaml_tag(), &format!("{}-{}", self.name, self.age)))
    }
}

#[derive(Debug, PartialEq)]
struct User3 {
    name: String,
}

impl YamlClass for User3 {
    fn yaml_tag() -> String {
        "!USER".to_owned()
    }

    fn fields(&self) -> Vec<(String, Value)> {
        vec![("name".into(), self.name.as_str().into())]
    }

    fn from_fields(fields: LinkedHashMap<Value, Value>) -> Result<Self, String> {
        fields
            .get(&Value::from("name"))
            .and_then(Value::as_str)
            .map(|name| User3 {
                name: name.to_owned(),
            })
            .ok_or_else(|| "missing name".to_owned())
    }
}

#[derive(Debug, PartialEq)]
struct Pair(i64, i64);

impl YamlClass for Pair {
    fn yaml_tag() -> String {
        "!pair".to_owned()
    }

    fn from_yaml(c: &mut Constructor<'_>, node: &NodeRef) -> Result<Self, ConstructorError> {
        let items = c.construct_sequence(node)?;
        match items.as_slice() {
            [a, b] => match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => Ok(Pair(a, b)),
                _ => Err(ConstructorError::new(node.start, &node.tag, "expected integers")),
            },
            _ => Err(ConstructorError::new(node.start, &node.tag, "expected two items")),
        }
    }

    fn to_yaml(&self, r: &mut Representer<'_>) -> Result<NodeRef, RepresenterError> {
        r.represent_sequence(&Self::yaml_tag(), &[self.0.into(), self.1.into()])
    }
}

fn engine(mode: Mode) -> Engine {
    let mut engine = Engine::new(mode);
    engine
        .register_class::<User0>()
        .register_class::<User1>()
        .register_class::<User3>()
        .register_class::<Pair>();
    engine
}

fn anthon0() -> Value {
    Value::from(vec![Value::object(User0 {
        name: "Anthon".to_owned(),
        age: 18,
    })])
}

#[test]
fn test_register_0_rt() {
    let engine = engine(Mode::RoundTrip);
    let source = "- !User0\n  name: Anthon\n  age: 18\n";
    let value = engine.load(source).unwrap();
    assert_eq!(
        value[0].as_object::<User0>(),
        Some(&User0 {
            name: "Anthon".to_owned(),
            age: 18
        })
    );
    assert_eq!(engine.dump(&value).unwrap(), source);
    assert_eq!(engine.dump(&anthon0()).unwrap(), source);
}

#[test]
fn test_register_0_safe() {
    let engine = engine(Mode::Safe);
    let value = engine.load("- !User0\n  name: Anthon\n  age: 18\n").unwrap();
    assert!(value[0].as_object::<User0>().is_some());
    assert_eq!(
        engine.dump(&value).unwrap(),
        "- !User0 {age: 18, name: Anthon}\n"
    );
}

#[test]
fn test_register_0_unsafe() {
    let engine = engine(Mode::Unsafe);
    let value = engine.load("- !User0 {age: 18, name: Anthon}\n").unwrap();
    assert_eq!(value[0].as_object::<User0>().map(|u| u.age), Some(18));
    assert_eq!(
        engine.dump(&anthon0()).unwrap(),
        "- !User0 {age: 18, name: Anthon}\n"
    );
}

#[test]
fn test_register_1_rt() {
    let engine = engine(Mode::RoundTrip);
    let value = engine.load("- !user Anthon-18\n").unwrap();
    assert_eq!(
        value[0].as_object::<User1>(),
        Some(&User1 {
            name: "Anthon".to_owned(),
            age: 18
        })
    );
    assert_eq!(engine.dump(&value).unwrap(), "- !user Anthon-18\n");
}

#[test]
fn test_register_1_safe() {
    let engine = engine(Mode::Safe);
    let value = engine.load("- !user Anthon-18\n").unwrap();
    assert!(value[0].as_object::<User1>().is_some());
    assert_eq!(engine.dump(&value).unwrap(), "[!user Anthon-18]\n");
}

#[test]
fn test_explicit_tag() {
    let engine = engine(Mode::RoundTrip);
    let value = engine.load("- !USER\n  name: Anthon\n").unwrap();
    assert_eq!(value[0].as_object::<User3>().map(|u| u.name.as_str()), Some("Anthon"));
    assert_eq!(engine.dump(&value).unwrap(), "- !USER\n  name: Anthon\n");
}

#[test]
fn test_registration_is_per_engine() {
    let value = Engine::new(Mode::Safe)
        .load("!User0 {age: 18, name: Anthon}\n")
        .unwrap();
    assert!(value.as_object::<User0>().is_none());
    assert_eq!(value.as_tagged().map(|t| t.tag.as_str()), Some("!User0"));
}

#[test]
fn test_invalid_instance() {
    let err = engine(Mode::Safe).load("!User0 {name: Anthon}\n").unwrap_err();
    assert!(err.to_string().contains("a user needs a name and an age"), "{err}");
    assert!(engine(Mode::Safe).load("!user Anthon\n").is_err());
}

#[test]
fn test_unregistered_object() {
    #[derive(Debug)]
    struct Unknown;
    let err = Engine::new(Mode::Safe)
        .dump(&Value::object(Unknown))
        .unwrap_err();
    assert!(err.to_string().contains("cannot represent an object"), "{err}");
}

#[test]
fn test_sequence_class() {
    let engine = engine(Mode::Safe);
    let value = engine.load("- !pair [1, 2]\n").unwrap();
    assert_eq!(value[0].as_object::<Pair>(), Some(&Pair(1, 2)));
    assert_eq!(engine.dump(&value).unwrap(), "- !pair [1, 2]\n");
    assert!(engine.load("!pair [1]\n").is_err());
}

#[test]
fn test_last_registration_wins() {
    #[derive(Debug)]
    struct Replacement;
    impl YamlClass for Replacement {
        fn yaml_tag() -> String {
            "!User0".to_owned()
        }

        fn from_fields(_: LinkedHashMap<Value, Value>) -> Result<Self, String> {
            Ok(Replacement)
        }
    }

    let mut engine = engine(Mode::RoundTrip);
    engine.register_class::<Replacement>();
    let value = engine.load("!User0 {age: 18, name: Anthon}\n").unwrap();
    assert!(value.as_object::<Replacement>().is_some());
    assert!(value.as_object::<User0>().is_none());
}
