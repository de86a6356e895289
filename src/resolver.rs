//! Implicit tag resolution.
//!
//! An untagged plain scalar gets its tag from the first entry of an ordered `(regex, tag)` table
//! that matches its text. Entries are indexed by the first character they can match, so only a
//! handful of expressions run per scalar. YAML 1.1 and 1.2 have different tables.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

pub const NULL: &str = "tag:yaml.org,2002:null";
pub const BOOL: &str = "tag:yaml.org,2002:bool";
pub const INT: &str = "tag:yaml.org,2002:int";
pub const FLOAT: &str = "tag:yaml.org,2002:float";
pub const STR: &str = "tag:yaml.org,2002:str";
pub const TIMESTAMP: &str = "tag:yaml.org,2002:timestamp";
pub const MERGE: &str = "tag:yaml.org,2002:merge";
pub const VALUE: &str = "tag:yaml.org,2002:value";
pub const SEQ: &str = "tag:yaml.org,2002:seq";
pub const MAP: &str = "tag:yaml.org,2002:map";
pub const OMAP: &str = "tag:yaml.org,2002:omap";
pub const SET: &str = "tag:yaml.org,2002:set";

/// The version used when a document has no `%YAML` directive.
pub const DEFAULT_VERSION: (u32, u32) = (1, 2);

const TIMESTAMP_RE: &str = r"^(?:[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]|[0-9][0-9][0-9][0-9]-[0-9][0-9]?-[0-9][0-9]?(?:[Tt]|[ \t]+)[0-9][0-9]?:[0-9][0-9]:[0-9][0-9](?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9][0-9]?(?::[0-9][0-9])?))?)$";

/// `(tag, regex, first characters)`, in priority order.
const RESOLVERS_1_2: &[(&str, &str, &str)] = &[
    (
        BOOL,
        r"^(?:true|True|TRUE|false|False|FALSE)$",
        "tTfF",
    ),
    (
        FLOAT,
        r"^(?:[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?|[-+]?(?:[0-9][0-9_]*)(?:[eE][-+]?[0-9]+)|\.[0-9_]+(?:[eE][-+][0-9]+)?|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
        "-+0123456789.",
    ),
    (
        INT,
        r"^(?:[-+]?0b[0-1_]+|[-+]?0o[0-7_]+|[-+]?[0-9][0-9_]*|[-+]?0x[0-9a-fA-F_]+)$",
        "-+0123456789",
    ),
    (MERGE, r"^(?:<<)$", "<"),
    (NULL, r"^(?:~|null|Null|NULL|)$", "~nN\0"),
    (TIMESTAMP, TIMESTAMP_RE, "0123456789"),
];

const RESOLVERS_1_1: &[(&str, &str, &str)] = &[
    (
        BOOL,
        r"^(?:yes|Yes|YES|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF)$",
        "yYnNtTfFoO",
    ),
    (
        FLOAT,
        r"^(?:[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?|\.[0-9_]+(?:[eE][-+][0-9]+)?|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
        "-+0123456789.",
    ),
    (
        INT,
        r"^(?:[-+]?0b[0-1_]+|[-+]?0[0-7_]+|[-+]?(?:0|[1-9][0-9_]*)|[-+]?0x[0-9a-fA-F_]+|[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+)$",
        "-+0123456789",
    ),
    (MERGE, r"^(?:<<)$", "<"),
    (NULL, r"^(?:~|null|Null|NULL|)$", "~nN\0"),
    (TIMESTAMP, TIMESTAMP_RE, "0123456789"),
    (VALUE, r"^(?:=)$", "="),
];

type Table = HashMap<char, Vec<(&'static str, Regex)>>;

fn build(resolvers: &[(&'static str, &str, &str)]) -> Table {
    let mut table: Table = HashMap::new();
    for (tag, re, first) in resolvers {
        // The expressions are constants.
        let Ok(re) = Regex::new(re) else {
            continue;
        };
        for c in first.chars() {
            table.entry(c).or_default().push((*tag, re.clone()));
        }
    }
    table
}

fn table(version: (u32, u32)) -> &'static Table {
    static V1_1: OnceLock<Table> = OnceLock::new();
    static V1_2: OnceLock<Table> = OnceLock::new();
    if version == (1, 1) {
        V1_1.get_or_init(|| build(RESOLVERS_1_1))
    } else {
        V1_2.get_or_init(|| build(RESOLVERS_1_2))
    }
}

/// What kind of node a tag is being resolved for.
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
pub enum NodeClass {
    /// A scalar, and whether it was written in plain style.
    Scalar(bool),
    Sequence,
    Mapping,
}

/// Implicit tag resolver for one YAML version.
#[derive(Clone, Copy, Debug)]
pub struct Resolver {
    version: (u32, u32),
    table: &'static Table,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(DEFAULT_VERSION)
    }
}

impl Resolver {
    /// A resolver for `version`. Anything but 1.1 resolves as 1.2.
    #[must_use]
    pub fn new(version: (u32, u32)) -> Resolver {
        Resolver {
            version,
            table: table(version),
        }
    }

    #[must_use]
    pub fn version(&self) -> (u32, u32) {
        self.version
    }

    /// Tag of an untagged plain scalar.
    #[must_use]
    pub fn resolve_plain(&self, value: &str) -> &'static str {
        let first = value.chars().next().unwrap_or('\0');
        if let Some(candidates) = self.table.get(&first) {
            for (tag, re) in candidates {
                if re.is_match(value) {
                    return *tag;
                }
            }
        }
        STR
    }

    /// Tag of a node written without a specific tag.
    #[must_use]
    pub fn resolve(&self, class: NodeClass, value: &str) -> &'static str {
        match class {
            NodeClass::Scalar(true) => self.resolve_plain(value),
            NodeClass::Scalar(false) => STR,
            NodeClass::Sequence => SEQ,
            NodeClass::Mapping => MAP,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_core_schema() {
        let r = Resolver::new((1, 2));
        assert_eq!(r.resolve_plain(""), NULL);
        assert_eq!(r.resolve_plain("~"), NULL);
        assert_eq!(r.resolve_plain("True"), BOOL);
        assert_eq!(r.resolve_plain("yes"), STR);
        assert_eq!(r.resolve_plain("0x1F"), INT);
        assert_eq!(r.resolve_plain("0o17"), INT);
        assert_eq!(r.resolve_plain("-12"), INT);
        assert_eq!(r.resolve_plain("1.5"), FLOAT);
        assert_eq!(r.resolve_plain("1e3"), FLOAT);
        assert_eq!(r.resolve_plain(".inf"), FLOAT);
        assert_eq!(r.resolve_plain("2001-12-14"), TIMESTAMP);
        assert_eq!(r.resolve_plain("<<"), MERGE);
        assert_eq!(r.resolve_plain("Anthon-18"), STR);
        assert_eq!(r.resolve_plain("1961"), INT);
    }

    #[test]
    fn test_yaml_1_1() {
        let r = Resolver::new((1, 1));
        assert_eq!(r.resolve_plain("yes"), BOOL);
        assert_eq!(r.resolve_plain("Off"), BOOL);
        assert_eq!(r.resolve_plain("017"), INT);
        assert_eq!(r.resolve_plain("190:20:30"), INT);
        assert_eq!(r.resolve_plain("1e3"), STR);
        assert_eq!(r.resolve_plain("="), VALUE);
    }

    #[test]
    fn test_non_plain() {
        let r = Resolver::default();
        assert_eq!(r.resolve(NodeClass::Scalar(false), "1"), STR);
        assert_eq!(r.resolve(NodeClass::Sequence, ""), SEQ);
        assert_eq!(r.resolve(NodeClass::Mapping, ""), MAP);
    }
}
