//! Expected-type descriptors consumed by `tyjson-core` to drive a type-directed
//! JSON parse.
//!
//! The parser never builds a generic value tree first; it asks this crate
//! "what do you expect here" at every structural boundary. `ExpectedType` is
//! the concrete, in-repo stand-in for that capability: a record with a field
//! table and an optional rest type, a homogeneous map, an array with an open
//! or closed size, a positional tuple, a union of member types, the
//! unconstrained `Any`, or one of the scalar kinds.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

/// A target type the parser is asked to produce a value for.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedType {
    Record(RecordType),
    Map(Box<ExpectedType>),
    Array(ArrayType),
    Tuple(TupleType),
    Union(Vec<ExpectedType>),
    /// Unconstrained JSON value; disables field/required-ness bookkeeping in
    /// every descendant scope.
    Any,
    Scalar(ScalarKind),
}

/// The leaf scalar kinds a lexeme can be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    String,
}

/// A record (JSON object with a known field set).
///
/// `fields` is a `BTreeMap` rather than a hash map so that required-field
/// reporting and any other externally observable iteration is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub fields: BTreeMap<String, FieldDesc>,
    /// Type for fields not named in `fields`. `None` means extra fields are
    /// rejected entirely (closed record).
    pub rest: Option<Box<ExpectedType>>,
}

impl RecordType {
    #[must_use]
    pub fn new(fields: BTreeMap<String, FieldDesc>, rest: Option<ExpectedType>) -> Self {
        Self {
            fields,
            rest: rest.map(Box::new),
        }
    }
}

/// A single declared field of a `RecordType`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDesc {
    pub name: String,
    pub ty: ExpectedType,
    pub required: bool,
}

impl FieldDesc {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ExpectedType, required: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            required,
        }
    }
}

/// Whether an array accepts any number of elements or exactly `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayState {
    Open,
    Closed(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub element: Box<ExpectedType>,
    pub state: ArrayState,
}

impl ArrayType {
    #[must_use]
    pub fn open(element: ExpectedType) -> Self {
        Self {
            element: Box::new(element),
            state: ArrayState::Open,
        }
    }

    #[must_use]
    pub fn closed(element: ExpectedType, size: usize) -> Self {
        Self {
            element: Box::new(element),
            state: ArrayState::Closed(size),
        }
    }
}

/// A positional product type: `members[i]` types position `i`, `rest` (if
/// any) types every position beyond `members.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleType {
    pub members: Vec<ExpectedType>,
    pub rest: Option<Box<ExpectedType>>,
}

impl TupleType {
    #[must_use]
    pub fn new(members: Vec<ExpectedType>, rest: Option<ExpectedType>) -> Self {
        Self {
            members,
            rest: rest.map(Box::new),
        }
    }

    /// The type expected at tuple position `index`, or `None` if `index` is
    /// beyond both the fixed members and an absent rest type.
    #[must_use]
    pub fn member_at(&self, index: usize) -> Option<&ExpectedType> {
        self.members
            .get(index)
            .or_else(|| self.rest.as_deref())
    }
}

/// Is `Union(members)` one the parser can accept?
///
/// A union is supported only when none of its members is itself a composite
/// that would require the parser (rather than the value builder) to decide
/// between shapes: `Record`, `Map`, `Array`, `Tuple`, or `Any`. A nested
/// `Union` is supported only if *its* members are, recursively.
///
/// Recurses on the nested member list when it encounters a nested `Union`,
/// not on the outer union being checked — recursing on the outer union
/// would either loop forever or always re-check the same members.
#[must_use]
pub fn is_supported_union(members: &[ExpectedType]) -> bool {
    members.iter().all(|member| match member {
        ExpectedType::Scalar(_) => true,
        ExpectedType::Union(nested) => is_supported_union(nested),
        ExpectedType::Record(_)
        | ExpectedType::Map(_)
        | ExpectedType::Array(_)
        | ExpectedType::Tuple(_)
        | ExpectedType::Any => false,
    })
}
