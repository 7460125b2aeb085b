//! Document tree for API description files
//!
//! A [`Document`] is an immutable, ordered tree of [`Node`]s built from YAML or JSON.
//! Mapping keys keep their insertion order and are always strings; non-string keys
//! in the source (such as `200:` response codes) are stringified while loading.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while building a document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported mapping key at {path}: {reason}")]
    UnsupportedKey { path: String, reason: String },
}

/// A single node in a document tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Sequence(Vec<Node>),
    Mapping(Vec<(String, Node)>),
}

impl Node {
    /// Look up a mapping entry by key
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Look up a sequence item by index
    pub fn index(&self, index: usize) -> Option<&Node> {
        match self {
            Node::Sequence(items) => items.get(index),
            _ => None,
        }
    }

    /// Follow a list of keys through nested mappings
    pub fn get_path<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Node> {
        keys.iter().try_fold(self, |node, key| node.get(key.as_ref()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(String, Node)]> {
        match self {
            Node::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Node::Sequence(_) | Node::Mapping(_))
    }

    /// Human-readable type name used in messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Sequence(_) => "array",
            Node::Mapping(_) => "object",
        }
    }

    /// JavaScript-like truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Node::Null => false,
            Node::Bool(b) => *b,
            Node::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
            Node::String(s) => !s.is_empty(),
            Node::Sequence(_) | Node::Mapping(_) => true,
        }
    }

    /// String form of a scalar; `None` for collections
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Node::Null => Some("null".to_string()),
            Node::Bool(b) => Some(b.to_string()),
            Node::Number(n) => Some(n.to_string()),
            Node::String(s) => Some(s.clone()),
            Node::Sequence(_) | Node::Mapping(_) => None,
        }
    }

    /// Scalar equality with numeric comparison by value (`1` equals `1.0`)
    pub fn scalar_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Number(a), Node::Number(b)) => a.as_f64() == b.as_f64(),
            _ => self == other,
        }
    }

    /// Convert from a YAML value, stringifying non-string keys
    pub fn from_yaml_value(value: serde_yaml::Value) -> Result<Self, DocumentError> {
        Self::convert_yaml(value, &mut NodePath::root())
    }

    fn convert_yaml(value: serde_yaml::Value, at: &mut NodePath) -> Result<Self, DocumentError> {
        use serde_yaml::Value;

        Ok(match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(yaml_number(&n)),
            Value::String(s) => Node::String(s),
            Value::Sequence(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    at.push(PathSegment::Index(i));
                    nodes.push(Self::convert_yaml(item, at)?);
                    at.pop();
                }
                Node::Sequence(nodes)
            }
            Value::Mapping(map) => {
                let mut entries: Vec<(String, Node)> = Vec::with_capacity(map.len());
                for (key, item) in map {
                    let key = yaml_key(key, at)?;
                    at.push(PathSegment::Key(key.clone()));
                    let node = Self::convert_yaml(item, at)?;
                    at.pop();
                    // `200` and `"200"` collapse to one key; the later entry wins
                    if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                        slot.1 = node;
                    } else {
                        entries.push((key, node));
                    }
                }
                Node::Mapping(entries)
            }
            Value::Tagged(tagged) => Self::convert_yaml(tagged.value, at)?,
        })
    }

    /// Convert from a JSON value
    pub fn from_json_value(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(s),
            Value::Array(items) => {
                Node::Sequence(items.into_iter().map(Self::from_json_value).collect())
            }
            Value::Object(map) => Node::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json_value(v)))
                    .collect(),
            ),
        }
    }
}

fn yaml_number(n: &serde_yaml::Number) -> serde_json::Number {
    if let Some(i) = n.as_i64() {
        serde_json::Number::from(i)
    } else if let Some(u) = n.as_u64() {
        serde_json::Number::from(u)
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .unwrap_or_else(|| serde_json::Number::from(0))
    }
}

fn yaml_key(key: serde_yaml::Value, at: &NodePath) -> Result<String, DocumentError> {
    use serde_yaml::Value;

    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Tagged(tagged) => yaml_key(tagged.value, at),
        Value::Sequence(_) | Value::Mapping(_) => Err(DocumentError::UnsupportedKey {
            path: at.to_string(),
            reason: "complex keys are not supported".to_string(),
        }),
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scalar_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "{}", self.type_name()),
        }
    }
}

/// One step in a [`NodePath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Location of a node: the ordered keys/indices from the root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    /// New path with one more segment
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    /// New path with all segments of `suffix` appended
    pub fn join(&self, suffix: &NodePath) -> Self {
        let mut path = self.clone();
        path.0.extend(suffix.0.iter().cloned());
        path
    }

    pub fn parent(&self) -> Option<NodePath> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Last mapping key on the path, if any
    pub fn last_key(&self) -> Option<&str> {
        self.0.iter().rev().find_map(|s| match s {
            PathSegment::Key(k) => Some(k.as_str()),
            PathSegment::Index(_) => None,
        })
    }

    /// RFC 6901 JSON pointer
    pub fn to_pointer(&self) -> String {
        let mut out = String::new();
        for segment in &self.0 {
            out.push('/');
            match segment {
                PathSegment::Key(k) => out.push_str(&k.replace('~', "~0").replace('/', "~1")),
                PathSegment::Index(i) => out.push_str(&i.to_string()),
            }
        }
        out
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
                PathSegment::Key(k) if is_plain_key(k) => write!(f, ".{}", k)?,
                PathSegment::Key(k) => write!(f, "['{}']", k.replace('\'', "\\'"))?,
            }
        }
        Ok(())
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '$')
}

impl<S: Into<PathSegment>> FromIterator<S> for NodePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A parsed API description
#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
    source: Option<PathBuf>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self { root, source: None }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn from_yaml(content: &str) -> Result<Self, DocumentError> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        Ok(Self::new(Node::from_yaml_value(value)?))
    }

    pub fn from_json(content: &str) -> Result<Self, DocumentError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        Ok(Self::new(Node::from_json_value(value)))
    }

    /// Parse by file extension; anything other than `.json` is read as YAML
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let document = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        Ok(document.with_source(path))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Resolve a path to a node
    pub fn resolve(&self, path: &NodePath) -> Option<&Node> {
        path.segments()
            .iter()
            .try_fold(&self.root, |node, segment| match segment {
                PathSegment::Key(k) => node.get(k),
                PathSegment::Index(i) => node.index(*i),
            })
    }

    /// Resolve a local JSON pointer such as `#/components/parameters/Limit`
    pub fn resolve_pointer(&self, pointer: &str) -> Option<&Node> {
        let pointer = pointer.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(&self.root);
        }
        pointer
            .strip_prefix('/')?
            .split('/')
            .map(|token| token.replace("~1", "/").replace("~0", "~"))
            .try_fold(&self.root, |node, token| match node {
                Node::Sequence(_) => token.parse().ok().and_then(|i| node.index(i)),
                _ => node.get(&token),
            })
    }
}
