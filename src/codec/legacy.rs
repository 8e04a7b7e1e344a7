//! Printer and parser for the legacy native-serialization wire format.
//!
//! The format is length-prefixed and self-describing: `N;` null, `b:0;` /
//! `b:1;` booleans, `i:<n>;` integers, `d:<n>;` doubles, `s:<bytes>:"…";`
//! strings, `a:<count>:{<key><value>…}` arrays, and
//! `O:8:"stdClass":<count>:{…}` for object-shaped maps. Array keys are
//! integers or strings; an array whose keys are exactly `0..count` decodes
//! as a JSON list, anything else as a JSON map. The format cannot represent
//! an empty list distinctly from an empty map; empty decodes as a map.

use serde_json::{Map, Number, Value};

use super::CodecError;

/// Serializes `value`. With `object_root` set, a top-level map is written in
/// the object form instead of the array form; nested maps are unaffected.
pub(super) fn serialize(value: &Value, object_root: bool) -> Vec<u8> {
    let mut out = Vec::new();
    match value {
        Value::Object(map) if object_root => write_map(&mut out, map, true),
        _ => write_value(&mut out, value),
    }
    out
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"N;"),
        Value::Bool(b) => {
            out.extend_from_slice(if *b { b"b:1;" } else { b"b:0;" });
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.extend_from_slice(format!("i:{};", i).as_bytes());
            } else {
                // u64 beyond i64 range and fractional values both travel as
                // doubles, matching how the original runtime widens them.
                let f = n.as_f64().unwrap_or(f64::MAX);
                out.extend_from_slice(format!("d:{};", f).as_bytes());
            }
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.extend_from_slice(format!("a:{}:{{", items.len()).as_bytes());
            for (index, item) in items.iter().enumerate() {
                out.extend_from_slice(format!("i:{};", index).as_bytes());
                write_value(out, item);
            }
            out.push(b'}');
        }
        Value::Object(map) => write_map(out, map, false),
    }
}

fn write_map(out: &mut Vec<u8>, map: &Map<String, Value>, object_form: bool) {
    if object_form {
        out.extend_from_slice(format!("O:8:\"stdClass\":{}:{{", map.len()).as_bytes());
    } else {
        out.extend_from_slice(format!("a:{}:{{", map.len()).as_bytes());
    }
    for (key, value) in map {
        write_string(out, key);
        write_value(out, value);
    }
    out.push(b'}');
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    // Length-prefixed raw bytes, no escaping.
    out.extend_from_slice(format!("s:{}:\"", s.len()).as_bytes());
    out.extend_from_slice(s.as_bytes());
    out.extend_from_slice(b"\";");
}

pub(super) fn unserialize(raw: &[u8]) -> Result<Value, CodecError> {
    let mut reader = Reader { input: raw, pos: 0 };
    let value = reader.parse_value()?;
    if reader.pos != raw.len() {
        return Err(reader.err("trailing data after value"));
    }
    Ok(value)
}

enum Key {
    Int(i64),
    Str(String),
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn err(&self, reason: &str) -> CodecError {
        CodecError::Malformed(format!("{} at byte {}", reason, self.pos))
    }

    fn next(&mut self) -> Result<u8, CodecError> {
        let byte = *self
            .input
            .get(self.pos)
            .ok_or_else(|| self.err("unexpected end of input"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect(&mut self, expected: u8) -> Result<(), CodecError> {
        let got = self.next()?;
        if got != expected {
            self.pos -= 1;
            return Err(self.err(&format!("expected '{}'", expected as char)));
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.err("length prefix exceeds input"))?;
        let slice = &self.input[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Reads up to (and consumes) `stop`, returning the bytes before it.
    fn read_until(&mut self, stop: u8) -> Result<&'a [u8], CodecError> {
        let start = self.pos;
        while let Some(&byte) = self.input.get(self.pos) {
            self.pos += 1;
            if byte == stop {
                return Ok(&self.input[start..self.pos - 1]);
            }
        }
        Err(self.err("unexpected end of input"))
    }

    fn parse_value(&mut self) -> Result<Value, CodecError> {
        match self.next()? {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                let flag = match self.next()? {
                    b'0' => false,
                    b'1' => true,
                    _ => return Err(self.err("invalid boolean")),
                };
                self.expect(b';')?;
                Ok(Value::Bool(flag))
            }
            b'i' => {
                self.expect(b':')?;
                Ok(Value::Number(self.parse_int_body()?.into()))
            }
            b'd' => {
                self.expect(b':')?;
                let body = self.read_until(b';')?;
                let f = std::str::from_utf8(body)
                    .ok()
                    .and_then(|s| s.parse::<f64>().ok())
                    .ok_or_else(|| self.err("invalid double"))?;
                let number =
                    Number::from_f64(f).ok_or_else(|| self.err("non-finite double"))?;
                Ok(Value::Number(number))
            }
            b's' => Ok(Value::String(self.parse_string_body()?)),
            b'a' => {
                self.expect(b':')?;
                let count = self.parse_count()?;
                let entries = self.parse_entries(count)?;
                Ok(assemble_array(entries))
            }
            b'O' => {
                // O:<len>:"<class>":<count>:{…} — class name is irrelevant,
                // the body is read the same way as an array.
                self.expect(b':')?;
                let name_len = self.parse_count_until(b':')?;
                self.expect(b'"')?;
                self.take(name_len)?;
                self.expect(b'"')?;
                self.expect(b':')?;
                let count = self.parse_count()?;
                let entries = self.parse_entries(count)?;
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key_to_string(key), value);
                }
                Ok(Value::Object(map))
            }
            _ => {
                self.pos -= 1;
                Err(self.err("unknown type tag"))
            }
        }
    }

    fn parse_int_body(&mut self) -> Result<i64, CodecError> {
        let body = self.read_until(b';')?;
        std::str::from_utf8(body)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| self.err("invalid integer"))
    }

    /// `<count>:{` — the count prefix of an array or object body.
    fn parse_count(&mut self) -> Result<usize, CodecError> {
        let count = self.parse_count_until(b':')?;
        self.expect(b'{')?;
        Ok(count)
    }

    fn parse_count_until(&mut self, stop: u8) -> Result<usize, CodecError> {
        let body = self.read_until(stop)?;
        std::str::from_utf8(body)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| self.err("invalid length prefix"))
    }

    /// `<len>:"<bytes>";` following an `s` tag.
    fn parse_string_body(&mut self) -> Result<String, CodecError> {
        self.expect(b':')?;
        let len = self.parse_count_until(b':')?;
        self.expect(b'"')?;
        let bytes = self.take(len)?;
        let s = std::str::from_utf8(bytes)
            .map_err(|_| self.err("string is not valid UTF-8"))?
            .to_string();
        self.expect(b'"')?;
        self.expect(b';')?;
        Ok(s)
    }

    fn parse_entries(&mut self, count: usize) -> Result<Vec<(Key, Value)>, CodecError> {
        let mut entries = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let key = match self.next()? {
                b'i' => {
                    self.expect(b':')?;
                    Key::Int(self.parse_int_body()?)
                }
                b's' => Key::Str(self.parse_string_body()?),
                _ => {
                    self.pos -= 1;
                    return Err(self.err("invalid array key"));
                }
            };
            let value = self.parse_value()?;
            entries.push((key, value));
        }
        self.expect(b'}')?;
        Ok(entries)
    }
}

fn key_to_string(key: Key) -> String {
    match key {
        Key::Int(i) => i.to_string(),
        Key::Str(s) => s,
    }
}

fn assemble_array(entries: Vec<(Key, Value)>) -> Value {
    let sequential = !entries.is_empty()
        && entries
            .iter()
            .enumerate()
            .all(|(index, (key, _))| matches!(key, Key::Int(i) if *i == index as i64));

    if sequential {
        Value::Array(entries.into_iter().map(|(_, value)| value).collect())
    } else {
        let mut map = Map::new();
        for (key, value) in entries {
            map.insert(key_to_string(key), value);
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(unserialize(b"N;").unwrap(), Value::Null);
        assert_eq!(unserialize(b"b:1;").unwrap(), json!(true));
        assert_eq!(unserialize(b"b:0;").unwrap(), json!(false));
        assert_eq!(unserialize(b"i:-42;").unwrap(), json!(-42));
        assert_eq!(unserialize(b"d:1.5;").unwrap(), json!(1.5));
        assert_eq!(unserialize(b"s:5:\"hello\";").unwrap(), json!("hello"));
    }

    #[test]
    fn test_serialize_scalars() {
        assert_eq!(serialize(&Value::Null, false), b"N;");
        assert_eq!(serialize(&json!(7), false), b"i:7;");
        assert_eq!(serialize(&json!("abc"), false), b"s:3:\"abc\";");
    }

    #[test]
    fn test_string_length_is_bytes() {
        // Multi-byte UTF-8: "héllo" is 6 bytes, 5 chars.
        let raw = serialize(&json!("héllo"), false);
        assert_eq!(raw, "s:6:\"héllo\";".as_bytes());
        assert_eq!(unserialize(&raw).unwrap(), json!("héllo"));
    }

    #[test]
    fn test_string_with_embedded_quote() {
        let raw = serialize(&json!(r#"a"b"#), false);
        assert_eq!(unserialize(&raw).unwrap(), json!(r#"a"b"#));
    }

    #[test]
    fn test_sequential_array_round_trip() {
        let value = json!(["foo/foo.php", "bar/bar.php"]);
        assert_eq!(unserialize(&serialize(&value, false)).unwrap(), value);
    }

    #[test]
    fn test_nested_map_round_trip() {
        let value = json!({
            "plugins": { "foo/foo.php": { "Version": "1.2", "Network": false } },
            "active": ["foo/foo.php"],
            "checked": null
        });
        assert_eq!(unserialize(&serialize(&value, false)).unwrap(), value);
    }

    #[test]
    fn test_object_root_round_trip() {
        let value = json!({ "plugins": {}, "active": ["a.php"] });
        let raw = serialize(&value, true);
        assert!(raw.starts_with(b"O:8:\"stdClass\":2:{"));
        assert_eq!(unserialize(&raw).unwrap(), value);
    }

    #[test]
    fn test_non_sequential_int_keys_decode_as_map() {
        let value = unserialize(b"a:2:{i:0;s:1:\"a\";i:5;s:1:\"b\";}").unwrap();
        assert_eq!(value, json!({ "0": "a", "5": "b" }));
    }

    #[test]
    fn test_empty_decodes_as_map() {
        assert_eq!(unserialize(b"a:0:{}").unwrap(), json!({}));
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(unserialize(b"").is_err());
        assert!(unserialize(b"x:1;").is_err());
        assert!(unserialize(b"i:notanint;").is_err());
        assert!(unserialize(b"s:10:\"short\";").is_err());
        assert!(unserialize(b"a:2:{i:0;s:1:\"a\";}").is_err());
        assert!(unserialize(b"i:1;i:2;").is_err());
        assert!(unserialize(b"a:1:{b:1;s:1:\"a\";}").is_err());
    }
}
