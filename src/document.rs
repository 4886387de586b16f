use serde::ser::{Serialize, SerializeMap, Serializer};

/// One node of the snapshot document tree. Objects keep insertion order
/// and unique keys; arrays keep insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Object(ObjectNode),
    Array(Vec<Node>),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectNode {
    entries: Vec<(String, Node)>,
}

impl ObjectNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key, replacing the value in place if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Node>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl From<ObjectNode> for Node {
    fn from(value: ObjectNode) -> Self {
        Node::Object(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::Array(value)
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Str(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Str(value.to_string())
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int(value)
    }
}

impl From<u64> for Node {
    fn from(value: u64) -> Self {
        Node::Int(value as i64)
    }
}

impl From<u32> for Node {
    fn from(value: u32) -> Self {
        Node::Int(i64::from(value))
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Float(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.entries.len()))?;
                for (key, value) in &object.entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Node::Array(items) => items.serialize(serializer),
            Node::Str(value) => serializer.serialize_str(value),
            Node::Int(value) => serializer.serialize_i64(*value),
            Node::Float(value) => serializer.serialize_f64(*value),
            Node::Bool(value) => serializer.serialize_bool(*value),
        }
    }
}

/// Renders a node as canonical JSON. Deterministic: the same tree always
/// serializes to the same bytes.
pub fn emit(node: &Node) -> String {
    serde_json::to_string(node).expect("string-keyed document tree always serializes")
}
