//! Field definition parsing.

use std::fmt;
use std::str::FromStr;

use nounbase_core::ServiceError;
use serde_json::Value;

/// Leading characters that mark a definition as a relationship operator.
/// A definition starting with any of these must be a well-formed marker.
const OPERATOR_CHARS: &[char] = &['-', '~', '<', '>', '=', '!', '|'];

/// Scalar field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Number,
    Boolean,
    Date,
    DateTime,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
            Primitive::Date => "date",
            Primitive::DateTime => "datetime",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Primitive::String),
            "number" => Some(Primitive::Number),
            "boolean" => Some(Primitive::Boolean),
            "date" => Some(Primitive::Date),
            "datetime" => Some(Primitive::DateTime),
            _ => None,
        }
    }

    /// Date-like values are compared by instant rather than by string.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Primitive::Date | Primitive::DateTime)
    }
}

/// The four relationship operators.
///
/// Fuzzy operators parse and resolve exactly like their exact counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationOp {
    /// `->`: the source record stores the target id.
    ForwardExact,
    /// `~>`
    ForwardFuzzy,
    /// `<-`: target records store the source id.
    BackwardExact,
    /// `<~`
    BackwardFuzzy,
}

impl RelationOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            RelationOp::ForwardExact => "->",
            RelationOp::ForwardFuzzy => "~>",
            RelationOp::BackwardExact => "<-",
            RelationOp::BackwardFuzzy => "<~",
        }
    }

    fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "->" => Some(RelationOp::ForwardExact),
            "~>" => Some(RelationOp::ForwardFuzzy),
            "<-" => Some(RelationOp::BackwardExact),
            "<~" => Some(RelationOp::BackwardFuzzy),
            _ => None,
        }
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, RelationOp::ForwardExact | RelationOp::ForwardFuzzy)
    }

    pub fn is_backward(&self) -> bool {
        !self.is_forward()
    }

    pub fn is_fuzzy(&self) -> bool {
        matches!(self, RelationOp::ForwardFuzzy | RelationOp::BackwardFuzzy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Primitive(Primitive),
    /// Union of string literals.
    Enum(Vec<String>),
    /// Reference to another noun by name.
    Relation { op: RelationOp, target: String },
}

/// A parsed field definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub kind: FieldKind,
    /// `?` suffix: the field may be absent or null.
    pub optional: bool,
    /// Array-wrapped: `["->Tag"]` or `->Tag[]`.
    pub many: bool,
}

impl FieldDef {
    pub fn primitive(p: Primitive) -> Self {
        Self { kind: FieldKind::Primitive(p), optional: false, many: false }
    }

    pub fn relation(op: RelationOp, target: &str) -> Self {
        Self {
            kind: FieldKind::Relation { op, target: target.to_string() },
            optional: false,
            many: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    /// Parse a definition from its JSON form: a string, or a one-element
    /// array of strings for array-wrapped fields.
    pub fn from_value(value: &Value) -> Result<Self, ServiceError> {
        match value {
            Value::String(s) => s.parse(),
            Value::Array(items) => match items.as_slice() {
                [Value::String(s)] => {
                    let def: FieldDef = s.parse()?;
                    Ok(def.many())
                }
                _ => Err(ServiceError::MalformedSchema(format!(
                    "array field definition must wrap exactly one string, got {}",
                    value
                ))),
            },
            other => Err(ServiceError::MalformedSchema(format!(
                "field definition must be a string, got {}",
                other
            ))),
        }
    }

    /// The relation operator and target, if this is a relationship field.
    pub fn as_relation(&self) -> Option<(RelationOp, &str)> {
        match &self.kind {
            FieldKind::Relation { op, target } => Some((*op, target.as_str())),
            _ => None,
        }
    }

    pub fn is_relation(&self) -> bool {
        self.as_relation().is_some()
    }

    pub fn primitive_type(&self) -> Option<Primitive> {
        match self.kind {
            FieldKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_temporal(&self) -> bool {
        self.primitive_type().is_some_and(|p| p.is_temporal())
    }
}

impl FromStr for FieldDef {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut s = raw.trim();
        let mut many = false;
        let mut optional = false;

        if let Some(rest) = s.strip_suffix("[]") {
            many = true;
            s = rest.trim_end();
        }
        if let Some(rest) = s.strip_suffix('?') {
            optional = true;
            s = rest.trim_end();
        }
        if s.is_empty() {
            return Err(ServiceError::MalformedSchema(format!(
                "empty field definition '{}'",
                raw
            )));
        }

        let kind = if s.starts_with(OPERATOR_CHARS) {
            parse_relation(s, raw)?
        } else if s.contains('|') {
            parse_enum(s, raw)?
        } else {
            match Primitive::parse(s) {
                Some(p) => FieldKind::Primitive(p),
                None => {
                    return Err(ServiceError::MalformedSchema(format!(
                        "unknown field type '{}'",
                        raw
                    )));
                }
            }
        };

        Ok(FieldDef { kind, optional, many })
    }
}

fn parse_relation(s: &str, raw: &str) -> Result<FieldKind, ServiceError> {
    let (symbol, target) = match s.char_indices().nth(2) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    };
    let op = RelationOp::from_symbol(symbol).ok_or_else(|| {
        ServiceError::MalformedSchema(format!("invalid relation operator in '{}'", raw))
    })?;
    if target.is_empty() {
        return Err(ServiceError::MalformedSchema(format!(
            "relation '{}' has no target noun",
            raw
        )));
    }
    if !is_noun_name(target) {
        return Err(ServiceError::MalformedSchema(format!(
            "invalid relation target '{}' in '{}'",
            target, raw
        )));
    }
    Ok(FieldKind::Relation { op, target: target.to_string() })
}

fn parse_enum(s: &str, raw: &str) -> Result<FieldKind, ServiceError> {
    let mut variants = Vec::new();
    for part in s.split('|') {
        let literal = strip_quotes(part.trim());
        if literal.is_empty() {
            return Err(ServiceError::MalformedSchema(format!(
                "empty literal in union '{}'",
                raw
            )));
        }
        if !variants.iter().any(|v| v == literal) {
            variants.push(literal.to_string());
        }
    }
    Ok(FieldKind::Enum(variants))
}

fn strip_quotes(s: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return inner;
        }
    }
    s
}

/// Noun names: a letter, then letters, digits or underscores.
pub fn is_noun_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FieldKind::Primitive(p) => write!(f, "{}", p.as_str())?,
            FieldKind::Enum(variants) => write!(f, "{}", variants.join(" | "))?,
            FieldKind::Relation { op, target } => write!(f, "{}{}", op.symbol(), target)?,
        }
        if self.optional {
            write!(f, "?")?;
        }
        if self.many {
            write!(f, "[]")?;
        }
        Ok(())
    }
}
