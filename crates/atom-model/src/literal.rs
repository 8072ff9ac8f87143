//! Literal values with datatype-aware comparison keys
//!
//! A literal keeps its lexical form, an optional datatype IRI and an
//! optional language tag. Equality, hashing and ordering go through a
//! precomputed [`ComparisonKey`] derived per [`LiteralPolicy`]: under
//! the default normalized policy `"01"^^xsd:integer` and
//! `"1"^^xsd:integer` are the same value, under the lexical policy
//! they are not.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// XSD namespace prefix recognized by the normalizer
const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Datatype IRI for `xsd:integer`
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
/// Datatype IRI for `xsd:decimal`
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
/// Datatype IRI for `xsd:boolean`
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
/// Datatype IRI for `xsd:string`
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Session-wide policy deciding how literal keys are derived
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LiteralPolicy {
    /// Compare by the value obtained by parsing the lexical form
    /// according to its datatype (XSD subset)
    #[default]
    NormalizedValue,
    /// Compare by the raw lexical form
    Lexical,
}

/// Comparison key of a literal
///
/// `Eq`/`Hash`/`Ord` are lawful and variant-first (an integer key is
/// never `Eq` to a decimal key); the cross-numeric semantics used by
/// comparison predicates live in [`ComparisonKey::compare_values`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComparisonKey {
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Decimal value (ordered by `f64::total_cmp`)
    Decimal(f64),
    /// Textual value (lexical fallback)
    Text(Arc<str>),
}

impl ComparisonKey {
    fn rank(&self) -> u8 {
        match self {
            ComparisonKey::Boolean(_) => 0,
            ComparisonKey::Integer(_) => 1,
            ComparisonKey::Decimal(_) => 2,
            ComparisonKey::Text(_) => 3,
        }
    }

    /// Value-level comparison as used by the comparison predicates
    ///
    /// Integers and decimals compare numerically across variants;
    /// values of incomparable kinds return `None` (the comparison atom
    /// then contributes zero tuples).
    pub fn compare_values(&self, other: &ComparisonKey) -> Option<std::cmp::Ordering> {
        use ComparisonKey::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Decimal(a), Decimal(b)) => Some(a.total_cmp(b)),
            (Integer(a), Decimal(b)) => Some((*a as f64).total_cmp(b)),
            (Decimal(a), Integer(b)) => Some(a.total_cmp(&(*b as f64))),
            (Text(a), Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Value-level equality (numeric across integer/decimal)
    pub fn same_value(&self, other: &ComparisonKey) -> bool {
        self.compare_values(other) == Some(std::cmp::Ordering::Equal)
    }
}

impl PartialEq for ComparisonKey {
    fn eq(&self, other: &Self) -> bool {
        use ComparisonKey::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Decimal(a), Decimal(b)) => a.to_bits() == b.to_bits(),
            (Text(a), Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ComparisonKey {}

impl Hash for ComparisonKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            ComparisonKey::Boolean(b) => b.hash(state),
            ComparisonKey::Integer(i) => i.hash(state),
            ComparisonKey::Decimal(d) => d.to_bits().hash(state),
            ComparisonKey::Text(t) => t.hash(state),
        }
    }
}

impl PartialOrd for ComparisonKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComparisonKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use ComparisonKey::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Decimal(a), Decimal(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// A literal term
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Literal {
    lexical: Arc<str>,
    datatype: Option<Arc<str>>,
    language: Option<Arc<str>>,
    key: ComparisonKey,
}

impl Literal {
    /// Create a literal under the given key-derivation policy
    pub fn new(
        lexical: impl Into<Arc<str>>,
        datatype: Option<Arc<str>>,
        language: Option<Arc<str>>,
        policy: LiteralPolicy,
    ) -> Self {
        let lexical: Arc<str> = lexical.into();
        let key = match policy {
            LiteralPolicy::Lexical => ComparisonKey::Text(lexical.clone()),
            LiteralPolicy::NormalizedValue => normalized_key(&lexical, datatype.as_deref()),
        };
        Self {
            lexical,
            datatype,
            language,
            key,
        }
    }

    /// Create a plain string literal (no datatype, no language)
    pub fn plain(lexical: impl Into<Arc<str>>) -> Self {
        Self::new(lexical, None, None, LiteralPolicy::default())
    }

    /// Create a language-tagged literal
    pub fn lang(lexical: impl Into<Arc<str>>, tag: impl Into<Arc<str>>) -> Self {
        Self::new(lexical, None, Some(tag.into()), LiteralPolicy::default())
    }

    /// Create a typed literal under the default policy
    pub fn typed(lexical: impl Into<Arc<str>>, datatype: impl Into<Arc<str>>) -> Self {
        Self::new(
            lexical,
            Some(datatype.into()),
            None,
            LiteralPolicy::default(),
        )
    }

    /// Create an `xsd:integer` literal with canonical lexical form
    pub fn integer(value: i64) -> Self {
        Self::new(
            value.to_string(),
            Some(XSD_INTEGER.into()),
            None,
            LiteralPolicy::default(),
        )
    }

    /// Create an `xsd:decimal` literal with canonical lexical form
    pub fn decimal(value: f64) -> Self {
        Self::new(
            value.to_string(),
            Some(XSD_DECIMAL.into()),
            None,
            LiteralPolicy::default(),
        )
    }

    /// Create an `xsd:boolean` literal
    pub fn boolean(value: bool) -> Self {
        Self::new(
            if value { "true" } else { "false" },
            Some(XSD_BOOLEAN.into()),
            None,
            LiteralPolicy::default(),
        )
    }

    /// The lexical form
    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    /// The datatype IRI, if any
    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }

    /// The language tag, if any
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// The comparison key this literal was built with
    pub fn key(&self) -> &ComparisonKey {
        &self.key
    }

    /// The integer value, when the key is numeric
    pub fn as_i64(&self) -> Option<i64> {
        match self.key {
            ComparisonKey::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// The decimal value, when the key is numeric
    pub fn as_f64(&self) -> Option<f64> {
        match self.key {
            ComparisonKey::Integer(i) => Some(i as f64),
            ComparisonKey::Decimal(d) => Some(d),
            _ => None,
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.language == other.language
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.language.hash(state);
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.language.cmp(&other.language))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.lexical)?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")?;
        } else if let Some(dt) = &self.datatype {
            write!(f, "^^<{dt}>")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Derive a normalized comparison key from a lexical form and datatype
///
/// Recognizes the XSD integer family, decimal/double/float, boolean
/// and string; anything else (including untyped literals) falls back
/// to the lexical form. A lexical form that fails to parse under its
/// datatype also falls back rather than erroring.
fn normalized_key(lexical: &str, datatype: Option<&str>) -> ComparisonKey {
    let Some(datatype) = datatype else {
        return ComparisonKey::Text(lexical.into());
    };
    match local_name(datatype) {
        Some("integer" | "long" | "int" | "short" | "byte" | "nonNegativeInteger"
        | "positiveInteger" | "negativeInteger" | "nonPositiveInteger" | "unsignedLong"
        | "unsignedInt" | "unsignedShort" | "unsignedByte") => lexical
            .trim()
            .parse::<i64>()
            .map(ComparisonKey::Integer)
            .unwrap_or_else(|_| ComparisonKey::Text(lexical.into())),
        Some("decimal" | "double" | "float") => lexical
            .trim()
            .parse::<f64>()
            .map(ComparisonKey::Decimal)
            .unwrap_or_else(|_| ComparisonKey::Text(lexical.into())),
        Some("boolean") => match lexical.trim() {
            "true" | "1" => ComparisonKey::Boolean(true),
            "false" | "0" => ComparisonKey::Boolean(false),
            _ => ComparisonKey::Text(lexical.into()),
        },
        _ => ComparisonKey::Text(lexical.into()),
    }
}

/// Local name of an XSD datatype IRI, `None` for foreign namespaces
fn local_name(datatype: &str) -> Option<&str> {
    datatype.strip_prefix(XSD)
}
