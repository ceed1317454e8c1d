use std::{fmt, ops::Range};

/// Default limit on object/array nesting.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Kind of the token the reader is positioned on.
///
/// Member names are not events of their own: when a value sits inside an
/// object, [`JsonReader::key`] returns the name it was stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonEvent {
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
    ValueString,
    ValueNumber,
    ValueBool,
    ValueNull,
    Eof,
    Error,
}

impl JsonEvent {
    pub fn is_container_start(self) -> bool {
        matches!(self, JsonEvent::ObjectStart | JsonEvent::ArrayStart)
    }
}

/// Malformed input, with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for ReadError {}

#[derive(Debug, Clone, Copy)]
struct Frame {
    is_object: bool,
    count: usize,
}

/// Pull-based JSON tokenizer over a byte buffer.
///
/// Every call to [`next_event`](JsonReader::next_event) consumes one token.
/// The reader validates the grammar as it goes and stops at the first
/// error: from then on it keeps returning [`JsonEvent::Error`].
pub struct JsonReader<'a> {
    input: &'a [u8],
    position: usize,
    stack: Vec<Frame>,
    max_depth: usize,
    root_done: bool,
    event: JsonEvent,
    key: String,
    has_key: bool,
    value: String,
    bool_value: bool,
    number_is_integer: bool,
    value_start: usize,
    error: Option<ReadError>,
    events_read: usize,
    skipped: usize,
}

impl<'a> JsonReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_max_depth(input, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(input: &'a [u8], max_depth: usize) -> Self {
        JsonReader {
            input,
            position: 0,
            stack: Vec::new(),
            max_depth,
            root_done: false,
            event: JsonEvent::Eof,
            key: String::new(),
            has_key: false,
            value: String::new(),
            bool_value: false,
            number_is_integer: false,
            value_start: 0,
            error: None,
            events_read: 0,
            skipped: 0,
        }
    }

    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    /// Byte offset just past the last token read.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Member name of the current value, if it sits inside an object.
    pub fn key(&self) -> Option<&str> {
        self.has_key.then_some(self.key.as_str())
    }

    pub fn key_equals(&self, name: &str) -> bool {
        self.has_key && self.key == name
    }

    /// String contents for `ValueString`, source text for `ValueNumber`.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn bool_value(&self) -> bool {
        self.bool_value
    }

    /// `true` when the current number has no fraction or exponent.
    pub fn number_is_integer(&self) -> bool {
        self.number_is_integer
    }

    pub fn error(&self) -> Option<&ReadError> {
        self.error.as_ref()
    }

    /// Number of events produced so far, including those consumed by skips.
    pub fn events_read(&self) -> usize {
        self.events_read
    }

    /// Number of subtrees passed over by [`skip_tree`](JsonReader::skip_tree).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn fail(&mut self, message: impl Into<String>) -> JsonEvent {
        if self.error.is_none() {
            self.error = Some(ReadError {
                message: message.into(),
                position: self.position,
            });
        }
        self.event = JsonEvent::Error;
        JsonEvent::Error
    }

    fn current_byte(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.current_byte() {
            self.position += 1;
        }
    }

    pub fn next_event(&mut self) -> JsonEvent {
        if self.error.is_some() {
            return JsonEvent::Error;
        }
        self.has_key = false;
        self.events_read += 1;
        self.skip_whitespace();

        let Some(frame) = self.stack.last().copied() else {
            if self.root_done {
                if self.position < self.input.len() {
                    return self.fail("unexpected trailing characters");
                }
                self.event = JsonEvent::Eof;
                return JsonEvent::Eof;
            }
            if self.position >= self.input.len() {
                self.root_done = true;
                self.event = JsonEvent::Eof;
                return JsonEvent::Eof;
            }
            return self.read_value();
        };

        let close = if frame.is_object { b'}' } else { b']' };
        match self.current_byte() {
            None => return self.fail("unexpected end of input"),
            Some(b) if b == close => {
                self.position += 1;
                self.stack.pop();
                if self.stack.is_empty() {
                    self.root_done = true;
                }
                self.event = if frame.is_object {
                    JsonEvent::ObjectEnd
                } else {
                    JsonEvent::ArrayEnd
                };
                return self.event;
            }
            Some(_) => {}
        }

        if frame.count > 0 {
            if self.current_byte() != Some(b',') {
                return self.fail(format!("expected ',' or '{}'", close as char));
            }
            self.position += 1;
            self.skip_whitespace();
        }
        if let Some(top) = self.stack.last_mut() {
            top.count += 1;
        }

        if frame.is_object {
            if self.current_byte() != Some(b'"') {
                return self.fail("expected member name");
            }
            match self.read_string() {
                Ok(name) => self.key = name,
                Err(message) => return self.fail(message),
            }
            self.skip_whitespace();
            if self.current_byte() != Some(b':') {
                return self.fail("expected ':' after member name");
            }
            self.position += 1;
            self.skip_whitespace();
            self.has_key = true;
        }
        self.read_value()
    }

    fn read_value(&mut self) -> JsonEvent {
        self.value_start = self.position;
        let event = match self.current_byte() {
            None => return self.fail("unexpected end of input"),
            Some(b'{') | Some(b'[') => {
                if self.stack.len() >= self.max_depth {
                    return self.fail(format!("nesting exceeds maximum depth {}", self.max_depth));
                }
                let is_object = self.current_byte() == Some(b'{');
                self.position += 1;
                self.stack.push(Frame { is_object, count: 0 });
                if is_object {
                    JsonEvent::ObjectStart
                } else {
                    JsonEvent::ArrayStart
                }
            }
            Some(b'"') => match self.read_string() {
                Ok(s) => {
                    self.value = s;
                    JsonEvent::ValueString
                }
                Err(message) => return self.fail(message),
            },
            Some(b'-') | Some(b'0'..=b'9') => match self.read_number() {
                Ok(()) => JsonEvent::ValueNumber,
                Err(message) => return self.fail(message),
            },
            Some(b't') => return self.read_literal("true", JsonEvent::ValueBool, true),
            Some(b'f') => return self.read_literal("false", JsonEvent::ValueBool, false),
            Some(b'n') => return self.read_literal("null", JsonEvent::ValueNull, false),
            Some(b) => return self.fail(format!("unexpected character '{}'", b as char)),
        };
        self.finish_value(event)
    }

    fn finish_value(&mut self, event: JsonEvent) -> JsonEvent {
        if self.stack.is_empty() {
            self.root_done = true;
        }
        self.event = event;
        event
    }

    fn read_literal(&mut self, word: &str, event: JsonEvent, value: bool) -> JsonEvent {
        if self.input[self.position..].starts_with(word.as_bytes()) {
            self.position += word.len();
            self.bool_value = value;
            self.finish_value(event)
        } else {
            self.fail("invalid literal")
        }
    }

    fn read_number(&mut self) -> Result<(), String> {
        let start = self.position;
        let mut is_integer = true;

        if self.current_byte() == Some(b'-') {
            self.position += 1;
        }
        match self.current_byte() {
            Some(b'0') => self.position += 1,
            Some(b'1'..=b'9') => self.skip_digits(),
            _ => return Err("invalid number".into()),
        }
        if self.current_byte() == Some(b'.') {
            is_integer = false;
            self.position += 1;
            if !matches!(self.current_byte(), Some(b'0'..=b'9')) {
                return Err("expected digit after '.'".into());
            }
            self.skip_digits();
        }
        if let Some(b'e' | b'E') = self.current_byte() {
            is_integer = false;
            self.position += 1;
            if let Some(b'+' | b'-') = self.current_byte() {
                self.position += 1;
            }
            if !matches!(self.current_byte(), Some(b'0'..=b'9')) {
                return Err("expected digit in exponent".into());
            }
            self.skip_digits();
        }

        self.value.clear();
        // digits, sign, '.', 'e' are ASCII
        for &b in &self.input[start..self.position] {
            self.value.push(b as char);
        }
        self.number_is_integer = is_integer;
        Ok(())
    }

    fn skip_digits(&mut self) {
        while let Some(b'0'..=b'9') = self.current_byte() {
            self.position += 1;
        }
    }

    fn read_hex4(&mut self) -> Result<u32, String> {
        let digits = self
            .input
            .get(self.position..self.position + 4)
            .ok_or("unterminated unicode escape")?;
        let text = std::str::from_utf8(digits).map_err(|_| "invalid unicode escape")?;
        let code = u32::from_str_radix(text, 16).map_err(|_| "invalid unicode escape")?;
        self.position += 4;
        Ok(code)
    }

    fn read_string(&mut self) -> Result<String, String> {
        self.position += 1; // opening quote
        let mut bytes = Vec::new();

        loop {
            let Some(b) = self.current_byte() else {
                return Err("unterminated string".into());
            };
            self.position += 1;
            match b {
                b'"' => break,
                b'\\' => {
                    let Some(esc) = self.current_byte() else {
                        return Err("unterminated string".into());
                    };
                    self.position += 1;
                    let ch = match esc {
                        b'"' => '"',
                        b'\\' => '\\',
                        b'/' => '/',
                        b'b' => '\u{8}',
                        b'f' => '\u{c}',
                        b'n' => '\n',
                        b'r' => '\r',
                        b't' => '\t',
                        b'u' => {
                            let high = self.read_hex4()?;
                            let code = if (0xD800..0xDC00).contains(&high) {
                                if !self.input[self.position..].starts_with(b"\\u") {
                                    return Err("unpaired surrogate in unicode escape".into());
                                }
                                self.position += 2;
                                let low = self.read_hex4()?;
                                if !(0xDC00..0xE000).contains(&low) {
                                    return Err("invalid low surrogate in unicode escape".into());
                                }
                                0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                            } else {
                                high
                            };
                            char::from_u32(code).ok_or("invalid unicode escape")?
                        }
                        other => return Err(format!("invalid escape sequence '\\{}'", other as char)),
                    };
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
                0x00..=0x1F => return Err("control character in string".into()),
                _ => bytes.push(b),
            }
        }

        String::from_utf8(bytes).map_err(|_| "invalid UTF-8 in string".to_string())
    }

    /// Byte range of the current scalar value in the input.
    pub fn value_span(&self) -> Range<usize> {
        self.value_start..self.position
    }

    /// Pass over the current value without reporting its contents.
    ///
    /// Positioned on `ObjectStart`/`ArrayStart`, consumes everything up to
    /// and including the matching end. On a scalar it does nothing. Returns
    /// the byte range of the whole value.
    pub fn skip_tree(&mut self) -> Result<Range<usize>, ReadError> {
        let start = self.value_start;
        match self.event {
            JsonEvent::ObjectStart | JsonEvent::ArrayStart => {
                let depth = self.stack.len();
                loop {
                    match self.next_event() {
                        JsonEvent::Error => break,
                        JsonEvent::ObjectEnd | JsonEvent::ArrayEnd if self.stack.len() < depth => {
                            break;
                        }
                        JsonEvent::Eof => {
                            self.fail("unexpected end of input");
                            break;
                        }
                        _ => {}
                    }
                }
            }
            JsonEvent::Error => {}
            _ => {}
        }
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.skipped += 1;
        tracing::trace!(start, end = self.position, "skipped subtree");
        Ok(start..self.position)
    }

    /// Error for an `Error` event, or a generic one if none was recorded.
    pub fn take_error(&self) -> ReadError {
        self.error.clone().unwrap_or_else(|| ReadError {
            message: "unexpected end of input".into(),
            position: self.position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &str) -> Vec<JsonEvent> {
        let mut reader = JsonReader::new(input.as_bytes());
        let mut out = vec![];
        loop {
            let ev = reader.next_event();
            out.push(ev);
            if matches!(ev, JsonEvent::Eof | JsonEvent::Error) {
                return out;
            }
        }
    }

    #[test]
    fn test_object_events() {
        use JsonEvent::*;
        assert_eq!(
            events(r#"{"a": 1, "b": [true, null, "x"]}"#),
            vec![ObjectStart, ValueNumber, ArrayStart, ValueBool, ValueNull, ValueString, ArrayEnd, ObjectEnd, Eof]
        );
    }

    #[test]
    fn test_keys_and_values() {
        let mut reader = JsonReader::new(br#"{"name":"Fo\"o","n":-1.5e2}"#);
        assert_eq!(reader.next_event(), JsonEvent::ObjectStart);
        assert_eq!(reader.key(), None);
        assert_eq!(reader.next_event(), JsonEvent::ValueString);
        assert!(reader.key_equals("name"));
        assert_eq!(reader.value(), "Fo\"o");
        assert_eq!(reader.next_event(), JsonEvent::ValueNumber);
        assert_eq!(reader.value(), "-1.5e2");
        assert!(!reader.number_is_integer());
    }

    #[test]
    fn test_empty_document_is_eof() {
        assert_eq!(events("  "), vec![JsonEvent::Eof]);
    }

    #[test]
    fn test_malformed_reports_position() {
        let mut reader = JsonReader::new(br#"{"a" 1}"#);
        reader.next_event();
        assert_eq!(reader.next_event(), JsonEvent::Error);
        let err = reader.error().unwrap();
        assert_eq!(err.position, 5);
        assert!(err.message.contains("':'"));
    }

    #[test]
    fn test_trailing_comma_rejected() {
        assert_eq!(events("[1,]").last(), Some(&JsonEvent::Error));
        assert_eq!(events(r#"{"a":1,}"#).last(), Some(&JsonEvent::Error));
    }

    #[test]
    fn test_skip_tree_span() {
        let input = br#"{"a":{"x":[1,2]},"b":2}"#;
        let mut reader = JsonReader::new(input);
        reader.next_event();
        assert_eq!(reader.next_event(), JsonEvent::ObjectStart);
        let span = reader.skip_tree().unwrap();
        assert_eq!(&input[span], br#"{"x":[1,2]}"#);
        assert_eq!(reader.next_event(), JsonEvent::ValueNumber);
        assert!(reader.key_equals("b"));
        assert_eq!(reader.skipped(), 1);
    }

    #[test]
    fn test_max_depth() {
        let mut reader = JsonReader::with_max_depth(b"[[[1]]]", 2);
        reader.next_event();
        reader.next_event();
        assert_eq!(reader.next_event(), JsonEvent::Error);
    }

    #[test]
    fn test_surrogate_pair() {
        let mut reader = JsonReader::new(br#""\ud83d\ude00""#);
        assert_eq!(reader.next_event(), JsonEvent::ValueString);
        assert_eq!(reader.value(), "😀");
    }
}
