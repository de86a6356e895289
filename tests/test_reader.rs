use std::io::{self, Read};

use yaml_roundtrip::{Engine, Mode, YamlError};

fn utf16(text: &str, big_endian: bool) -> Vec<u8> {
    let mut bytes = if big_endian {
        vec![0xfe, 0xff]
    } else {
        vec![0xff, 0xfe]
    };
    for unit in text.encode_utf16() {
        if big_endian {
            bytes.extend_from_slice(&unit.to_be_bytes());
        } else {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
    }
    bytes
}

/// Hands the input out a few bytes at a time.
struct Trickle<'a>(&'a [u8]);

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.0.len().min(buf.len()).min(3);
        buf[..n].copy_from_slice(&self.0[..n]);
        self.0 = &self.0[n..];
        Ok(n)
    }
}

#[test]
fn test_utf16_le() {
    let engine = Engine::new(Mode::Safe);
    let value = engine.load_bytes(&utf16("key: välue\n", false)).unwrap();
    assert_eq!(value["key"].as_str(), Some("välue"));
}

#[test]
fn test_utf16_be() {
    let engine = Engine::new(Mode::Safe);
    let value = engine.load_bytes(&utf16("- 1\n- two\n", true)).unwrap();
    assert_eq!(value[0].as_i64(), Some(1));
    assert_eq!(value[1].as_str(), Some("two"));
}

#[test]
fn test_utf8_bom() {
    let engine = Engine::new(Mode::Safe);
    let value = engine.load_bytes(b"\xef\xbb\xbfa: b\n").unwrap();
    assert_eq!(value["a"].as_str(), Some("b"));
}

#[test]
fn test_invalid_utf8() {
    let err = Engine::new(Mode::Safe)
        .load_bytes(b"a: b\nc: \xff\n")
        .unwrap_err();
    let YamlError::Reader(err) = err else {
        panic!("expected a reader error, got {err:?}");
    };
    assert_eq!(err.offset, 8);
    assert_eq!(err.encoding, "UTF-8");
}

#[test]
fn test_non_printable() {
    let err = Engine::new(Mode::Safe).load("a: b\x01\n").unwrap_err();
    let YamlError::Reader(err) = err else {
        panic!("expected a reader error, got {err:?}");
    };
    assert_eq!(err.mark.line(), 1);
    assert_eq!(err.mark.col(), 4);
}

#[test]
fn test_chunked_read() {
    let source = "- éé\n- ü: ä\n- plain\n".as_bytes();
    let value = Engine::new(Mode::Safe).load_read(Trickle(source)).unwrap();
    assert_eq!(value[0].as_str(), Some("éé"));
    assert_eq!(value[1]["ü"].as_str(), Some("ä"));
    assert_eq!(value[2].as_str(), Some("plain"));
}

#[test]
fn test_read_error() {
    struct Failing;
    impl Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }
    let err = Engine::new(Mode::Safe).load_read(Failing).unwrap_err();
    assert!(err.to_string().contains("disk on fire"), "{err}");
}

#[test]
fn test_utf16_stream_of_documents() {
    let docs = Engine::new(Mode::Safe)
        .load_all_bytes(&utf16("a\n---\nb\n", false))
        .unwrap();
    let texts: Vec<_> = docs.iter().filter_map(|d| d.as_str()).collect();
    assert_eq!(texts, ["a", "b"]);
}
