//! `C3`: the type context stack — the parallel stacks of expected type,
//! pending field map, rest type, parser context, and array index, plus the
//! operations the driver uses to push, pop, and query them.

use std::collections::BTreeMap;

use tyjson_types::{ArrayState, ExpectedType, FieldDesc, RecordType, TupleType};

use crate::location::Location;

/// The enclosing composite kind, needed to choose which terminal state to
/// return to once a nested value completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserContext {
    Map,
    Array,
}

/// One entry of the `expectedTypes` stack. `None` is the projection
/// sentinel: "skip this subtree", tainting every descendant scope until the
/// composite it was pushed for closes.
pub type ExpectedSlot = Option<ExpectedType>;

#[derive(Debug)]
pub struct TypeContext {
    expected_types: Vec<ExpectedSlot>,
    field_hierarchy: Vec<BTreeMap<String, FieldDesc>>,
    rest_type: Vec<ExpectedSlot>,
    parser_contexts: Vec<ParserContext>,
    array_indexes: Vec<usize>,
    json_field_depth: usize,
    current_field: Option<FieldDesc>,
}

/// What a field name resolved to.
#[derive(Debug, Clone)]
pub enum FieldResolution {
    /// Matched a declared field; its type was pushed onto `expectedTypes`.
    Known(FieldDesc),
    /// No declared field matched; the record's rest type (possibly absent)
    /// was pushed instead.
    Rest,
}

impl TypeContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            expected_types: Vec::new(),
            field_hierarchy: Vec::new(),
            rest_type: Vec::new(),
            parser_contexts: Vec::new(),
            array_indexes: Vec::new(),
            json_field_depth: 0,
            current_field: None,
        }
    }

    pub fn reset(&mut self) {
        self.expected_types.clear();
        self.field_hierarchy.clear();
        self.rest_type.clear();
        self.parser_contexts.clear();
        self.array_indexes.clear();
        self.json_field_depth = 0;
        self.current_field = None;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expected_types.is_empty()
            && self.field_hierarchy.is_empty()
            && self.rest_type.is_empty()
            && self.parser_contexts.is_empty()
            && self.array_indexes.is_empty()
    }

    #[must_use]
    pub fn current_field(&self) -> Option<&FieldDesc> {
        self.current_field.as_ref()
    }

    /// `true` when the innermost scope is a `None` (projection) sentinel —
    /// its contents should be skipped entirely rather than built. Being
    /// inside an `Any` scope is *not* projection: `Any` values are still
    /// materialized, just without field-presence bookkeeping, which is why
    /// this only inspects the sentinel and not `json_field_depth`.
    #[must_use]
    pub fn top_is_projected(&self) -> bool {
        matches!(self.expected_types.last(), Some(None))
    }

    pub fn push_expected(&mut self, slot: ExpectedSlot) {
        self.expected_types.push(slot);
    }

    pub fn pop_expected(&mut self) -> ExpectedSlot {
        self.expected_types.pop().unwrap_or(None)
    }

    #[must_use]
    pub fn peek_expected(&self) -> Option<&ExpectedType> {
        self.expected_types.last().and_then(|slot| slot.as_ref())
    }

    pub fn push_parser_context(&mut self, ctx: ParserContext) {
        self.parser_contexts.push(ctx);
    }

    pub fn pop_parser_context(&mut self) -> Option<ParserContext> {
        self.parser_contexts.pop()
    }

    #[must_use]
    pub fn current_parser_context(&self) -> Option<ParserContext> {
        self.parser_contexts.last().copied()
    }

    // NOTE: none of the `enter_*` scope methods below push onto
    // `expected_types`. That push happens exactly once per value position,
    // before the parser knows whether the value will turn out to be a
    // composite or a scalar — at the document root (`Machine::on_doc_start`),
    // in `resolve_field` (field values), and in `resolve_element` callers
    // (array/tuple elements). Once a `{`/`[` reveals the value is a
    // composite, these methods only push the *auxiliary* scope stacks
    // (`field_hierarchy`/`rest_type`/`array_indexes`), reading the type
    // itself back out of the already-pushed `expected_types` top.

    /// Enter a record scope: push a fresh copy of its field table and its
    /// rest type. Assumes `Record(record)` is already the top of
    /// `expected_types`.
    pub fn enter_record(&mut self, record: &RecordType) {
        self.field_hierarchy.push(record.fields.clone());
        self.rest_type.push(record.rest.as_deref().cloned());
    }

    /// Enter a map scope: the value type serves as the rest type for every
    /// key, and there is no fixed field table. Assumes `Map(value_type)` is
    /// already the top of `expected_types`.
    pub fn enter_map(&mut self, value_type: &ExpectedType) {
        self.field_hierarchy.push(BTreeMap::new());
        self.rest_type.push(Some(value_type.clone()));
    }

    /// Enter an `Any`-typed object scope. Field bookkeeping is disabled for
    /// the whole subtree via `json_field_depth`. Assumes `Any` is already
    /// the top of `expected_types`.
    pub fn enter_any_object(&mut self) {
        self.field_hierarchy.push(BTreeMap::new());
        self.rest_type.push(Some(ExpectedType::Any));
        self.json_field_depth += 1;
    }

    /// Enter an array/tuple scope's element-index bookkeeping. Assumes the
    /// array/tuple type is already the top of `expected_types`.
    pub fn enter_array(&mut self, _element: &ExpectedType, _state: ArrayState) {
        self.array_indexes.push(0);
    }

    pub fn enter_tuple(&mut self, _tuple: &TupleType) {
        self.array_indexes.push(0);
    }

    /// Push the auxiliary scope stacks for a composite whose contents
    /// should be skipped entirely. Assumes a `None` projection sentinel is
    /// already the top of `expected_types`.
    pub fn enter_projected(&mut self, is_array: bool) {
        if is_array {
            self.array_indexes.push(0);
        } else {
            self.field_hierarchy.push(BTreeMap::new());
            self.rest_type.push(None);
        }
    }

    /// Resolve a field name against the top field map, removing it from the
    /// map on a hit (so a duplicate occurrence of the same name later
    /// resolves against the rest type instead).
    pub fn resolve_field(&mut self, name: &str) -> FieldResolution {
        self.current_field = None;
        if self.top_is_projected() {
            self.expected_types.push(None);
            return FieldResolution::Rest;
        }
        if let Some(fields) = self.field_hierarchy.last_mut() {
            if let Some(desc) = fields.remove(name) {
                self.expected_types.push(Some(desc.ty.clone()));
                self.current_field = Some(desc.clone());
                return FieldResolution::Known(desc);
            }
        }
        let rest = self.rest_type.last().cloned().flatten();
        self.expected_types.push(rest);
        FieldResolution::Rest
    }

    /// Resolve the type for the array/tuple element at `index`.
    #[must_use]
    pub fn resolve_element(&self, index: usize) -> Option<ExpectedType> {
        if self.top_is_projected() {
            return None;
        }
        match self.peek_expected() {
            Some(ExpectedType::Array(array)) => Some((*array.element).clone()),
            Some(ExpectedType::Tuple(tuple)) => tuple.member_at(index).cloned(),
            Some(ExpectedType::Any) => Some(ExpectedType::Any),
            _ => None,
        }
    }

    pub fn bump_array_index(&mut self) -> usize {
        let idx = self.array_indexes.last_mut().expect("array index stack underflow");
        *idx += 1;
        *idx
    }

    #[must_use]
    pub fn current_array_index(&self) -> usize {
        *self.array_indexes.last().expect("array index stack underflow")
    }

    pub fn pop_array_index(&mut self) -> Option<usize> {
        self.array_indexes.pop()
    }

    /// Close a record scope: fail if any declared-required field was never
    /// consumed.
    pub fn close_record<E>(&mut self, at: Location) -> Result<(), crate::error::Error<E>> {
        if self.json_field_depth > 0 {
            self.json_field_depth -= 1;
        }
        let Some(remaining) = self.field_hierarchy.pop() else {
            return Ok(());
        };
        self.rest_type.pop();
        for (name, desc) in remaining {
            if desc.required {
                return Err(crate::error::Error::RequiredFieldMissing { name, at });
            }
        }
        Ok(())
    }

    /// Validate a closed array/tuple's final size against its declared
    /// constraint.
    pub fn validate_list_size<E>(
        &self,
        final_index: usize,
        popped: &ExpectedType,
        at: Location,
    ) -> Result<(), crate::error::Error<E>> {
        match popped {
            ExpectedType::Array(array) => {
                if let ArrayState::Closed(size) = array.state {
                    let actual = final_index;
                    if actual != size {
                        return Err(crate::error::Error::ClosedListSizeMismatch {
                            expected: size,
                            actual,
                            at,
                        });
                    }
                }
                Ok(())
            }
            ExpectedType::Tuple(tuple) => {
                let required = tuple.members.len();
                if final_index < required {
                    return Err(crate::error::Error::ClosedListSizeMismatch {
                        expected: required,
                        actual: final_index,
                        at,
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}
