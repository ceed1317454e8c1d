//! Compact JSON output built from events.
//!
//! The writer tracks only what it needs to place commas: one member count
//! per open container. Values can be written from typed data or copied
//! verbatim from a source buffer, which is how unmatched structure passes
//! through a rewrite untouched.

/// Append-only JSON writer.
#[derive(Debug, Default)]
pub struct JsonWriter {
    out: Vec<u8>,
    counts: Vec<usize>,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.out.clear();
        self.counts.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Copy of the output, leaving the buffer in place for reuse.
    pub fn to_vec(&self) -> Vec<u8> {
        self.out.clone()
    }

    fn begin_value(&mut self, key: Option<&str>) {
        if let Some(count) = self.counts.last_mut() {
            if *count > 0 {
                self.out.push(b',');
            }
            *count += 1;
        }
        if let Some(key) = key {
            self.write_escaped(key);
            self.out.push(b':');
        }
    }

    pub fn object_start(&mut self, key: Option<&str>) {
        self.begin_value(key);
        self.out.push(b'{');
        self.counts.push(0);
    }

    pub fn object_end(&mut self) {
        self.counts.pop();
        self.out.push(b'}');
    }

    pub fn array_start(&mut self, key: Option<&str>) {
        self.begin_value(key);
        self.out.push(b'[');
        self.counts.push(0);
    }

    pub fn array_end(&mut self) {
        self.counts.pop();
        self.out.push(b']');
    }

    pub fn write_string(&mut self, key: Option<&str>, value: &str) {
        self.begin_value(key);
        self.write_escaped(value);
    }

    /// Write an already serialized JSON value.
    pub fn write_raw(&mut self, key: Option<&str>, json: &[u8]) {
        self.begin_value(key);
        self.out.extend_from_slice(json);
    }

    fn write_escaped(&mut self, s: &str) {
        self.out.push(b'"');
        for c in s.chars() {
            match c {
                '"' => self.out.extend_from_slice(b"\\\""),
                '\\' => self.out.extend_from_slice(b"\\\\"),
                '\n' => self.out.extend_from_slice(b"\\n"),
                '\r' => self.out.extend_from_slice(b"\\r"),
                '\t' => self.out.extend_from_slice(b"\\t"),
                c if c.is_control() => {
                    self.out
                        .extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
                }
                c => {
                    let mut buf = [0u8; 4];
                    self.out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        self.out.push(b'"');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commas_and_keys() {
        let mut w = JsonWriter::new();
        w.object_start(None);
        w.write_raw(Some("a"), b"1");
        w.array_start(Some("b"));
        w.write_string(None, "x");
        w.write_raw(None, b"null");
        w.array_end();
        w.object_end();
        assert_eq!(w.as_bytes(), br#"{"a":1,"b":["x",null]}"#);
    }

    #[test]
    fn test_escaping() {
        let mut w = JsonWriter::new();
        w.write_string(None, "a\"b\\c\n\u{1}");
        assert_eq!(w.as_bytes(), br#""a\"b\\c\n\u0001""#);
    }
}
