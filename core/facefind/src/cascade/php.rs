//! Reader for PHP `serialize()` output, enough to decode cascade dumps.
//!
//! Arrays whose keys are exactly `0..n` in order become JSON arrays; any
//! other array becomes a JSON object keyed by the stringified keys.

use serde_json::{Map, Number, Value};

use crate::error::FaceFindError;

/// True when the data starts (after whitespace) like a serialized PHP array.
pub(super) fn looks_serialized(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"a:")
}

pub(super) fn parse(bytes: &[u8]) -> Result<Value, FaceFindError> {
    let mut reader = Reader {
        input: bytes,
        pos: bytes.iter().take_while(|b| b.is_ascii_whitespace()).count(),
    };
    let value = reader.value().map_err(|msg| reader.error(msg))?;
    if reader.input[reader.pos..].iter().any(|b| !b.is_ascii_whitespace()) {
        return Err(reader.error("trailing data"));
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

impl Reader<'_> {
    fn error(&self, msg: &str) -> FaceFindError {
        FaceFindError::ModelParse(format!("php serialized data: {msg} at byte {}", self.pos))
    }

    fn value(&mut self) -> Result<Value, &'static str> {
        let tag = self.next().ok_or("unexpected end of input")?;
        match tag {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                match self.until(b';')? {
                    "0" => Ok(Value::Bool(false)),
                    "1" => Ok(Value::Bool(true)),
                    _ => Err("invalid boolean"),
                }
            }
            b'i' => {
                self.expect(b':')?;
                Ok(Value::from(self.int(b';')?))
            }
            b'd' => {
                self.expect(b':')?;
                let text = self.until(b';')?;
                let float: f64 = text.parse().map_err(|_| "invalid double")?;
                Number::from_f64(float)
                    .map(Value::Number)
                    .ok_or("non-finite double")
            }
            b's' => {
                self.expect(b':')?;
                Ok(Value::String(self.string()?))
            }
            b'a' => self.array(),
            _ => Err("unsupported type tag"),
        }
    }

    fn array(&mut self) -> Result<Value, &'static str> {
        self.expect(b':')?;
        let len = usize::try_from(self.int(b':')?).map_err(|_| "negative array length")?;
        self.expect(b'{')?;

        let mut entries = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            let key = match self.next().ok_or("unexpected end of input")? {
                b'i' => {
                    self.expect(b':')?;
                    Key::Int(self.int(b';')?)
                }
                b's' => {
                    self.expect(b':')?;
                    Key::Str(self.string()?)
                }
                _ => return Err("invalid array key"),
            };
            entries.push((key, self.value()?));
        }
        self.expect(b'}')?;

        let is_list = entries
            .iter()
            .enumerate()
            .all(|(i, (key, _))| matches!(key, Key::Int(k) if *k == i as i64));
        if is_list {
            return Ok(Value::Array(entries.into_iter().map(|(_, v)| v).collect()));
        }
        let map: Map<String, Value> = entries
            .into_iter()
            .map(|(key, v)| match key {
                Key::Int(k) => (k.to_string(), v),
                Key::Str(s) => (s, v),
            })
            .collect();
        Ok(Value::Object(map))
    }

    /// `<len>:"<bytes>";`, the length counted in bytes.
    fn string(&mut self) -> Result<String, &'static str> {
        let len = usize::try_from(self.int(b':')?).map_err(|_| "negative string length")?;
        self.expect(b'"')?;
        let end = self.pos.checked_add(len).ok_or("string length overflow")?;
        let raw = self.input.get(self.pos..end).ok_or("string runs past end of input")?;
        let text = String::from_utf8_lossy(raw).into_owned();
        self.pos = end;
        self.expect(b'"')?;
        self.expect(b';')?;
        Ok(text)
    }

    fn int(&mut self, terminator: u8) -> Result<i64, &'static str> {
        self.until(terminator)?.parse().map_err(|_| "invalid integer")
    }

    /// Text up to (not including) `terminator`; consumes the terminator.
    fn until(&mut self, terminator: u8) -> Result<&str, &'static str> {
        let rest = &self.input[self.pos..];
        let len = rest
            .iter()
            .position(|b| *b == terminator)
            .ok_or("missing terminator")?;
        let text = std::str::from_utf8(&rest[..len]).map_err(|_| "invalid utf-8")?;
        self.pos += len + 1;
        Ok(text)
    }

    fn expect(&mut self, byte: u8) -> Result<(), &'static str> {
        match self.next() {
            Some(b) if b == byte => Ok(()),
            Some(_) => Err("unexpected character"),
            None => Err("unexpected end of input"),
        }
    }

    fn next(&mut self) -> Option<u8> {
        let byte = self.input.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        byte
    }
}
