use std::fmt;

/// One step of a field or selector path.
///
/// # Examples
///
/// For the path `items[0].tags[*]`:
/// - `PathSegment::Key("items")`
/// - `PathSegment::Index(0)`
/// - `PathSegment::Key("tags")`
/// - `PathSegment::Wildcard`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object member by name
    Key(String),

    /// Array element by position
    Index(usize),

    /// Every element of an array (`[*]`)
    Wildcard,
}

/// A parsed path, first segment outermost.
pub type Path = Vec<PathSegment>;

/// Error raised for malformed path text.
#[derive(Debug, Clone, PartialEq)]
pub struct PathError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path '{}': {}", self.path, self.message)
    }
}

impl std::error::Error for PathError {}

/// Parse dotted/bracket path text into segments.
///
/// ```
/// use jsonsieve::path::{parse_path, PathSegment};
///
/// let path = parse_path("a.b[2][*]").unwrap();
/// assert_eq!(path, vec![
///     PathSegment::Key("a".into()),
///     PathSegment::Key("b".into()),
///     PathSegment::Index(2),
///     PathSegment::Wildcard,
/// ]);
/// ```
pub fn parse_path(text: &str) -> Result<Path, PathError> {
    let err = |message: &str| PathError {
        path: text.to_string(),
        message: message.to_string(),
    };

    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut position = 0;

    if chars.is_empty() {
        return Err(err("empty path"));
    }

    while position < chars.len() {
        match chars[position] {
            '.' => {
                if segments.is_empty() {
                    return Err(err("path starts with '.'"));
                }
                position += 1;
                let start = position;
                while position < chars.len() && chars[position] != '.' && chars[position] != '[' {
                    position += 1;
                }
                if start == position {
                    return Err(err("empty member name"));
                }
                segments.push(PathSegment::Key(chars[start..position].iter().collect()));
            }
            '[' => {
                position += 1;
                let close = chars[position..]
                    .iter()
                    .position(|c| *c == ']')
                    .ok_or_else(|| err("missing ']'"))?;
                let inner: String = chars[position..position + close].iter().collect();
                position += close + 1;
                let inner = inner.trim();
                let segment = if inner == "*" {
                    PathSegment::Wildcard
                } else if let Some(quoted) = inner
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
                {
                    PathSegment::Key(quoted.to_string())
                } else {
                    let index = inner
                        .parse::<usize>()
                        .map_err(|_| err("expected index, '*' or quoted name in brackets"))?;
                    PathSegment::Index(index)
                };
                segments.push(segment);
            }
            _ if segments.is_empty() => {
                let start = position;
                while position < chars.len() && chars[position] != '.' && chars[position] != '[' {
                    position += 1;
                }
                segments.push(PathSegment::Key(chars[start..position].iter().collect()));
            }
            _ => return Err(err("expected '.' or '['")),
        }
    }

    Ok(segments)
}

/// Render segments back to path text.
pub fn format_path(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            PathSegment::Key(name) if name.contains(['.', '[', ']']) => {
                out.push_str(&format!("['{}']", name));
            }
            PathSegment::Key(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathSegment::Index(i) => out.push_str(&format!("[{}]", i)),
            PathSegment::Wildcard => out.push_str("[*]"),
        }
    }
    out
}

pub fn has_wildcard(segments: &[PathSegment]) -> bool {
    segments.iter().any(|s| *s == PathSegment::Wildcard)
}
