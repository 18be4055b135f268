//! Node records: identity, payload values and default payloads.

use std::collections::BTreeMap;
use std::fmt;

use generational_arena::Index;

/// Well-known payload keys of a BOM line.
pub mod fields {
    pub const PART_NUMBER: &str = "partNumber";
    pub const PART_NAME: &str = "partName";
    pub const QUANTITY: &str = "quantity";
    pub const TYPE: &str = "type";
}

/// Stable identifier of a node.
///
/// Backed by a generational arena index: a slot freed by a delete is
/// reissued with a new generation, so an id is never handed out twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

impl NodeId {
    pub fn into_raw_parts(self) -> (usize, u64) {
        self.0.into_raw_parts()
    }

    pub fn from_raw_parts(slot: usize, generation: u64) -> Self {
        Self(Index::from_raw_parts(slot, generation))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{}.{}", slot, generation)
    }
}

/// Leading character that forces a cell to be read as text.
pub const TEXT_MARKER: char = '\'';

/// A single payload value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl FieldValue {
    /// Interpret raw cell text: numbers become `Number`, everything else `Text`.
    ///
    /// Only text that renders back identically counts as a number, so
    /// "007" or "1.50" stay text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && Self::Number(n).to_string() == trimmed => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Cell text for tabular export.
    ///
    /// Text that is empty, starts with [`TEXT_MARKER`], or would read back as
    /// a number is written with a leading marker so it stays text.
    pub fn to_cell(&self) -> String {
        match self {
            Self::Text(s)
                if s.is_empty()
                    || s.starts_with(TEXT_MARKER)
                    || matches!(Self::parse(s), Self::Number(_)) =>
            {
                format!("{}{}", TEXT_MARKER, s)
            }
            other => other.to_string(),
        }
    }

    /// Inverse of [`FieldValue::to_cell`]. An empty cell holds no value.
    pub fn from_cell(cell: &str) -> Option<Self> {
        if cell.is_empty() {
            return None;
        }
        match cell.strip_prefix(TEXT_MARKER) {
            Some(text) => Some(Self::Text(text.to_string())),
            None => Some(Self::parse(cell)),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

/// Domain attributes of a node, keyed by field name.
pub type Payload = BTreeMap<String, FieldValue>;

/// A BOM line: an assembly, sub-assembly or part.
#[derive(Debug, Clone, PartialEq)]
pub struct BomNode {
    pub id: NodeId,
    /// None for roots
    pub parent: Option<NodeId>,
    /// Ordered child ids, no duplicates
    pub children: Vec<NodeId>,
    /// 0 for roots, parent level + 1 otherwise
    pub level: usize,
    pub payload: Payload,
}

impl BomNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.payload.get(key)
    }

    /// Display label taken from `key`, falling back to the node id.
    pub fn label(&self, key: &str) -> String {
        self.payload
            .get(key)
            .map(|v| v.to_string())
            .unwrap_or_else(|| self.id.to_string())
    }
}

impl fmt::Display for BomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let number = self.label(fields::PART_NUMBER);
        match self.field(fields::PART_NAME) {
            Some(name) => write!(f, "{} {}", number, name),
            None => f.write_str(&number),
        }
    }
}

/// Default payload of a new top-level assembly.
pub fn assembly_payload(seq: u64) -> Payload {
    new_line_payload(seq, "New Assembly", "ASSY")
}

/// Default payload of a new child or sibling part.
pub fn part_payload(seq: u64) -> Payload {
    new_line_payload(seq, "New Part", "PART")
}

fn new_line_payload(seq: u64, name: &str, kind: &str) -> Payload {
    let mut payload = Payload::new();
    payload.insert(fields::PART_NUMBER.into(), format!("NEW-{:04}", seq).into());
    payload.insert(fields::PART_NAME.into(), name.into());
    payload.insert(fields::TYPE.into(), kind.into());
    payload.insert(fields::QUANTITY.into(), FieldValue::Number(1.0));
    payload
}
