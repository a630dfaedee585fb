//! `C5`: the state-machine driver tying `C1`-`C4` together.
//!
//! The base parsing states are represented as one `State` enum; the
//! escape/unicode-hex states collapse into two parameterized variants
//! (`Escape`/`UnicodeHex`) carrying a `ReturnTo` tag, rather than one
//! variant per quote-context.

use tyjson_types::{ArrayState, ExpectedType};

use crate::builder::{LexemeKind, ValueBuilder};
use crate::context::{FieldResolution, ParserContext, TypeContext};
use crate::error::Error;
use crate::escape::{code_unit_to_char, decode_simple_escape, EscapeOutcome, HexAccumulator, ReturnTo};
use crate::lexbuf::LexemeBuffer;
use crate::location::Location;
use crate::reader::{ChunkBuffer, CharSource};

/// Construction-time knobs. No environment variables or config files are
/// consulted; this is the entirety of the parser's configuration surface.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Characters read from the source per refill.
    pub chunk_size: usize,
    /// Composite nesting depth at which the parser gives up rather than
    /// recursing further.
    pub max_nesting_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            max_nesting_depth: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    DocStart,
    DocEnd,
    FirstFieldReady,
    NonFirstFieldReady,
    FieldName,
    EndFieldName,
    FieldValueReady,
    StringFieldValue,
    NonStringFieldValue,
    StringValue,
    NonStringValue,
    FieldEnd,
    FirstArrayElementReady,
    NonFirstArrayElementReady,
    StringArrayElement,
    NonStringArrayElement,
    ArrayElementEnd,
    Escape(ReturnTo),
    UnicodeHex(ReturnTo),
}

fn is_json_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

fn is_bareword_terminator(ch: char) -> bool {
    is_json_whitespace(ch) || matches!(ch, ',' | '}' | ']')
}

/// The type-directed streaming parser state machine.
///
/// One instance is meant to be reused across many parses on the same
/// thread (`reset` clears every stack without releasing their backing
/// storage); see `crate::parse` for the per-thread cached entry point.
pub struct Machine<B: ValueBuilder> {
    state: State,
    location: Location,
    lexeme: LexemeBuffer,
    hex: HexAccumulator,
    ctx: TypeContext,
    nodes_stack: Vec<B::Value>,
    field_names: Vec<String>,
    current_json_node: Option<B::Value>,
    /// Set immediately before parsing a scalar resolved against a record's
    /// rest type; a coercion failure against a rest type is swallowed
    /// rather than propagated (the projection swallow in §7).
    pending_is_rest: bool,
    quote_char: char,
    options: Options,
    builder: B,
}

impl<B: ValueBuilder> Machine<B> {
    #[must_use]
    pub fn new(builder: B, options: Options) -> Self {
        Self {
            state: State::DocStart,
            location: Location::start(),
            lexeme: LexemeBuffer::new(),
            hex: HexAccumulator::new(),
            ctx: TypeContext::new(),
            nodes_stack: Vec::new(),
            field_names: Vec::new(),
            current_json_node: None,
            pending_is_rest: false,
            quote_char: '"',
            options,
            builder,
        }
    }

    #[must_use]
    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// `true` once every parallel stack in the type context is empty —
    /// the state a freshly reset machine starts in, and the state any
    /// successful (or failed, after `reset`) parse must end in.
    #[must_use]
    pub fn context_is_empty(&self) -> bool {
        self.ctx.is_empty()
    }

    pub fn builder_mut(&mut self) -> &mut B {
        &mut self.builder
    }

    /// Reset every stack and lexing counter so the machine is ready for a
    /// fresh parse. Called on every exit path of `parse`, success or
    /// failure, per the concurrency contract in §5.
    pub fn reset(&mut self) {
        self.state = State::DocStart;
        self.location = Location::start();
        self.lexeme.clear();
        self.hex.reset();
        self.ctx.reset();
        self.nodes_stack.clear();
        self.field_names.clear();
        self.current_json_node = None;
        self.pending_is_rest = false;
    }

    /// Parse one document from `source` against `expected`, resetting the
    /// machine both before and after (even on error), so a reused cached
    /// instance is always safe to hand to the next caller.
    pub fn parse<S: CharSource>(
        &mut self,
        source: &mut S,
        expected: &ExpectedType,
    ) -> Result<B::Value, Error<B::Error>> {
        self.reset();
        let result = self.run(source, expected);
        self.reset();
        result
    }

    fn run<S: CharSource>(
        &mut self,
        source: &mut S,
        expected: &ExpectedType,
    ) -> Result<B::Value, Error<B::Error>> {
        let mut chunk = ChunkBuffer::with_capacity(self.options.chunk_size);
        let mut any_char_seen = false;
        loop {
            let next = chunk
                .next_char(source, self.options.chunk_size)
                .map_err(Error::Io)?;
            match next {
                Some(ch) => {
                    any_char_seen = true;
                    self.location.advance(ch);
                    self.step(ch, expected)?;
                    if self.state == State::DocEnd {
                        break;
                    }
                }
                None => break,
            }
        }
        if self.state != State::DocEnd {
            if !any_char_seen {
                return Err(Error::EmptyDocument);
            }
            return Err(Error::InvalidDocument);
        }
        self.current_json_node
            .take()
            .ok_or(Error::InvalidDocument)
    }

    fn step(&mut self, ch: char, root_expected: &ExpectedType) -> Result<(), Error<B::Error>> {
        match self.state {
            State::DocStart => self.on_doc_start(ch, root_expected),
            State::FirstFieldReady => self.on_first_field_ready(ch),
            State::NonFirstFieldReady => self.on_non_first_field_ready(ch),
            State::FieldName => self.on_field_name(ch),
            State::EndFieldName => self.on_end_field_name(ch),
            State::FieldValueReady => self.on_field_value_ready(ch),
            State::StringFieldValue => self.on_string_value(ch, ReturnTo::StringFieldValue),
            State::NonStringFieldValue => self.on_non_string_char(ch, ValuePosition::Field),
            State::StringValue => self.on_string_value(ch, ReturnTo::StringValue),
            State::NonStringValue => self.on_non_string_char(ch, ValuePosition::Root),
            State::FieldEnd => self.on_field_end(ch),
            State::FirstArrayElementReady => self.on_first_array_element_ready(ch),
            State::NonFirstArrayElementReady => self.on_non_first_array_element_ready(ch),
            State::StringArrayElement => self.on_string_value(ch, ReturnTo::StringArrayElement),
            State::NonStringArrayElement => self.on_non_string_char(ch, ValuePosition::Element),
            State::ArrayElementEnd => self.on_array_element_end(ch),
            State::Escape(return_to) => self.on_escape(ch, return_to),
            State::UnicodeHex(return_to) => self.on_unicode_hex(ch, return_to),
            State::DocEnd => Ok(()),
        }
    }

    fn syntax_err(&self, message: &'static str) -> Error<B::Error> {
        Error::Syntax {
            message,
            at: self.location,
        }
    }

    // ---- document-level dispatch -----------------------------------

    fn on_doc_start(&mut self, ch: char, expected: &ExpectedType) -> Result<(), Error<B::Error>> {
        if is_json_whitespace(ch) {
            return Ok(());
        }
        match ch {
            '{' => {
                self.ctx.push_expected(Some(expected.clone()));
                self.enter_object_like(expected, ParserContext::Map)
            }
            '[' => {
                self.ctx.push_expected(Some(expected.clone()));
                self.enter_array_like(expected, ParserContext::Array)
            }
            '"' => {
                self.quote_char = '"';
                self.ctx.push_expected(Some(expected.clone()));
                self.state = State::StringValue;
                Ok(())
            }
            _ => {
                self.ctx.push_expected(Some(expected.clone()));
                self.state = State::NonStringValue;
                self.on_non_string_char(ch, ValuePosition::Root)
            }
        }
    }

    fn enter_object_like(&mut self, expected: &ExpectedType, pctx: ParserContext) -> Result<(), Error<B::Error>> {
        self.check_nesting()?;
        match expected {
            ExpectedType::Record(record) => {
                let value = self.builder.init_record_or_map(expected).map_err(Error::Incompatible)?;
                self.ctx.enter_record(record);
                self.current_json_node = Some(value);
                self.ctx.push_parser_context(pctx);
                self.state = State::FirstFieldReady;
                Ok(())
            }
            ExpectedType::Map(value_ty) => {
                let value = self.builder.init_record_or_map(expected).map_err(Error::Incompatible)?;
                self.ctx.enter_map(value_ty);
                self.current_json_node = Some(value);
                self.ctx.push_parser_context(pctx);
                self.state = State::FirstFieldReady;
                Ok(())
            }
            ExpectedType::Any => {
                let value = self.builder.init_record_or_map(expected).map_err(Error::Incompatible)?;
                self.ctx.enter_any_object();
                self.current_json_node = Some(value);
                self.ctx.push_parser_context(pctx);
                self.state = State::FirstFieldReady;
                Ok(())
            }
            _ => Err(Error::UnsupportedType),
        }
    }

    fn enter_array_like(&mut self, expected: &ExpectedType, pctx: ParserContext) -> Result<(), Error<B::Error>> {
        self.check_nesting()?;
        match expected {
            ExpectedType::Array(array) => {
                let value = self.builder.init_array_or_tuple(expected).map_err(Error::Incompatible)?;
                self.ctx.enter_array(&array.element, array.state);
                self.current_json_node = Some(value);
                self.ctx.push_parser_context(pctx);
                self.state = State::FirstArrayElementReady;
                Ok(())
            }
            ExpectedType::Tuple(tuple) => {
                let value = self.builder.init_array_or_tuple(expected).map_err(Error::Incompatible)?;
                self.ctx.enter_tuple(tuple);
                self.current_json_node = Some(value);
                self.ctx.push_parser_context(pctx);
                self.state = State::FirstArrayElementReady;
                Ok(())
            }
            ExpectedType::Any => {
                let value = self.builder.init_array_or_tuple(expected).map_err(Error::Incompatible)?;
                self.ctx.enter_array(&ExpectedType::Any, ArrayState::Open);
                self.current_json_node = Some(value);
                self.ctx.push_parser_context(pctx);
                self.state = State::FirstArrayElementReady;
                Ok(())
            }
            _ => Err(Error::UnsupportedType),
        }
    }

    fn check_nesting(&self) -> Result<(), Error<B::Error>> {
        if self.nodes_stack.len() >= self.options.max_nesting_depth {
            return Err(self.syntax_err("maximum nesting depth exceeded"));
        }
        Ok(())
    }

    // ---- object field states ----------------------------------------

    fn on_first_field_ready(&mut self, ch: char) -> Result<(), Error<B::Error>> {
        if is_json_whitespace(ch) {
            return Ok(());
        }
        match ch {
            '"' => {
                self.quote_char = '"';
                self.state = State::FieldName;
                Ok(())
            }
            '}' => self.finalize_non_array_object(),
            _ => Err(self.syntax_err("expected '\"' or '}'")),
        }
    }

    fn on_non_first_field_ready(&mut self, ch: char) -> Result<(), Error<B::Error>> {
        if is_json_whitespace(ch) {
            return Ok(());
        }
        match ch {
            '"' => {
                self.quote_char = '"';
                self.state = State::FieldName;
                Ok(())
            }
            _ => Err(self.syntax_err("expected '\"'")),
        }
    }

    fn on_field_name(&mut self, ch: char) -> Result<(), Error<B::Error>> {
        if ch == '\\' {
            self.state = State::Escape(ReturnTo::FieldName);
            return Ok(());
        }
        if ch == self.quote_char {
            let name = self.lexeme.take();
            let resolution = self.ctx.resolve_field(&name);
            self.pending_is_rest =
                matches!(resolution, FieldResolution::Rest) && self.ctx.peek_expected().is_some();
            self.field_names.push(name);
            self.state = State::EndFieldName;
            return Ok(());
        }
        self.lexeme.append(ch);
        Ok(())
    }

    fn on_end_field_name(&mut self, ch: char) -> Result<(), Error<B::Error>> {
        if is_json_whitespace(ch) {
            return Ok(());
        }
        if ch == ':' {
            self.state = State::FieldValueReady;
            return Ok(());
        }
        Err(self.syntax_err("expected ':'"))
    }

    fn on_field_value_ready(&mut self, ch: char) -> Result<(), Error<B::Error>> {
        if is_json_whitespace(ch) {
            return Ok(());
        }
        match ch {
            '{' => {
                let expected = self.ctx.peek_expected().cloned().unwrap_or(ExpectedType::Any);
                self.enter_nested(&expected, ParserContext::Map, ch)
            }
            '[' => {
                let expected = self.ctx.peek_expected().cloned().unwrap_or(ExpectedType::Any);
                self.enter_nested(&expected, ParserContext::Array, ch)
            }
            '"' => {
                self.quote_char = '"';
                self.state = State::StringFieldValue;
                Ok(())
            }
            _ => {
                self.state = State::NonStringFieldValue;
                self.on_non_string_char(ch, ValuePosition::Field)
            }
        }
    }

    fn on_field_end(&mut self, ch: char) -> Result<(), Error<B::Error>> {
        if is_json_whitespace(ch) {
            return Ok(());
        }
        match ch {
            ',' => {
                self.state = State::NonFirstFieldReady;
                Ok(())
            }
            '}' => self.finalize_non_array_object(),
            _ => Err(self.syntax_err("expected ',' or '}'")),
        }
    }

    // ---- array element states ----------------------------------------

    fn on_first_array_element_ready(&mut self, ch: char) -> Result<(), Error<B::Error>> {
        if is_json_whitespace(ch) {
            return Ok(());
        }
        if ch == ']' {
            return self.finalize_array(0, true);
        }
        self.dispatch_array_value_start(ch)
    }

    fn on_non_first_array_element_ready(&mut self, ch: char) -> Result<(), Error<B::Error>> {
        if is_json_whitespace(ch) {
            return Ok(());
        }
        self.dispatch_array_value_start(ch)
    }

    fn dispatch_array_value_start(&mut self, ch: char) -> Result<(), Error<B::Error>> {
        let index = self.ctx.current_array_index();
        let element_ty = self.ctx.resolve_element(index);
        self.ctx.push_expected(element_ty);
        self.pending_is_rest = false;
        match ch {
            '{' => {
                let expected = self.ctx.peek_expected().cloned().unwrap_or(ExpectedType::Any);
                self.enter_nested(&expected, ParserContext::Map, ch)
            }
            '[' => {
                let expected = self.ctx.peek_expected().cloned().unwrap_or(ExpectedType::Any);
                self.enter_nested(&expected, ParserContext::Array, ch)
            }
            '"' => {
                self.quote_char = '"';
                self.state = State::StringArrayElement;
                Ok(())
            }
            _ => {
                self.state = State::NonStringArrayElement;
                self.on_non_string_char(ch, ValuePosition::Element)
            }
        }
    }

    fn on_array_element_end(&mut self, ch: char) -> Result<(), Error<B::Error>> {
        if is_json_whitespace(ch) {
            return Ok(());
        }
        match ch {
            ',' => {
                let idx = self.ctx.bump_array_index();
                let _ = idx;
                self.state = State::NonFirstArrayElementReady;
                Ok(())
            }
            ']' => {
                let final_index = self.ctx.current_array_index();
                self.finalize_array(final_index, false)
            }
            _ => Err(self.syntax_err("expected ',' or ']'")),
        }
    }

    // ---- entering nested composites (shared by field/array/doc-start) --

    fn enter_nested(
        &mut self,
        expected: &ExpectedType,
        pctx: ParserContext,
        opener: char,
    ) -> Result<(), Error<B::Error>> {
        self.check_nesting()?;
        if self.ctx.top_is_projected() {
            // Value is projected away: still need to balance braces/brackets
            // structurally, but never materialize a node for it.
            self.ctx.enter_projected(opener == '[');
            self.ctx.push_parser_context(pctx);
            self.state = match opener {
                '{' => State::FirstFieldReady,
                _ => State::FirstArrayElementReady,
            };
            return Ok(());
        }
        if let Some(parent) = self.current_json_node.take() {
            self.nodes_stack.push(parent);
        }
        match opener {
            '{' => {
                let value = self.builder.init_record_or_map(expected).map_err(Error::Incompatible)?;
                self.current_json_node = Some(value);
                match expected {
                    ExpectedType::Record(record) => self.ctx.enter_record(record),
                    ExpectedType::Map(value_ty) => self.ctx.enter_map(value_ty),
                    _ => self.ctx.enter_any_object(),
                }
                self.ctx.push_parser_context(pctx);
                self.state = State::FirstFieldReady;
            }
            _ => {
                let value = self.builder.init_array_or_tuple(expected).map_err(Error::Incompatible)?;
                self.current_json_node = Some(value);
                match expected {
                    ExpectedType::Array(array) => self.ctx.enter_array(&array.element, array.state),
                    ExpectedType::Tuple(tuple) => self.ctx.enter_tuple(tuple),
                    _ => self.ctx.enter_array(&ExpectedType::Any, ArrayState::Open),
                }
                self.ctx.push_parser_context(pctx);
                self.state = State::FirstArrayElementReady;
            }
        }
        Ok(())
    }

    // ---- string value states -------------------------------------------

    fn on_string_value(&mut self, ch: char, return_to: ReturnTo) -> Result<(), Error<B::Error>> {
        if ch == '\\' {
            self.state = State::Escape(return_to);
            return Ok(());
        }
        if ch == self.quote_char {
            let lexeme = self.lexeme.take();
            return self.complete_value(&lexeme, LexemeKind::QuotedString, return_to);
        }
        self.lexeme.append(ch);
        Ok(())
    }

    fn on_escape(&mut self, ch: char, return_to: ReturnTo) -> Result<(), Error<B::Error>> {
        match decode_simple_escape(ch, return_to) {
            EscapeOutcome::Appended(decoded, rt) => {
                self.lexeme.append(decoded);
                self.state = self.string_state_for(rt);
                Ok(())
            }
            EscapeOutcome::EnterUnicodeHex(rt) => {
                self.state = State::UnicodeHex(rt);
                Ok(())
            }
            EscapeOutcome::Invalid(msg) => Err(self.syntax_err(msg)),
            EscapeOutcome::Continue => Ok(()),
        }
    }

    fn on_unicode_hex(&mut self, ch: char, return_to: ReturnTo) -> Result<(), Error<B::Error>> {
        match self.hex.push(ch) {
            Ok(Some(code)) => {
                self.lexeme.append(code_unit_to_char(code));
                self.state = self.string_state_for(return_to);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(msg) => Err(self.syntax_err(msg)),
        }
    }

    fn string_state_for(&self, return_to: ReturnTo) -> State {
        match return_to {
            ReturnTo::FieldName => State::FieldName,
            ReturnTo::StringValue => State::StringValue,
            ReturnTo::StringFieldValue => State::StringFieldValue,
            ReturnTo::StringArrayElement => State::StringArrayElement,
        }
    }

    // ---- bareword (non-string) value states -----------------------------

    fn on_non_string_char(&mut self, ch: char, position: ValuePosition) -> Result<(), Error<B::Error>> {
        if is_bareword_terminator(ch) {
            let lexeme = self.lexeme.take();
            let return_to = match position {
                ValuePosition::Root => ReturnTo::StringValue,
                ValuePosition::Field => ReturnTo::StringFieldValue,
                ValuePosition::Element => ReturnTo::StringArrayElement,
            };
            self.complete_value(&lexeme, LexemeKind::Bareword, return_to)?;
            // The terminator itself still needs normal dispatch (',', '}', ']',
            // or whitespace), so replay it through the now-current state.
            return self.replay_terminator(ch, position);
        }
        self.lexeme.append(ch);
        Ok(())
    }

    fn replay_terminator(&mut self, ch: char, position: ValuePosition) -> Result<(), Error<B::Error>> {
        if is_json_whitespace(ch) {
            return Ok(());
        }
        match position {
            ValuePosition::Root => Err(self.syntax_err("unexpected trailing content")),
            ValuePosition::Field => self.on_field_end(ch),
            ValuePosition::Element => self.on_array_element_end(ch),
        }
    }

    // ---- value completion, shared by string and bareword paths ----------

    fn complete_value(
        &mut self,
        lexeme: &str,
        kind: LexemeKind,
        return_to: ReturnTo,
    ) -> Result<(), Error<B::Error>> {
        let expected = self.ctx.pop_expected();
        let coerced = match expected {
            None => None,
            Some(ExpectedType::Any) => match self.builder.coerce_any(lexeme, kind) {
                Ok(v) => Some(v),
                Err(e) => return Err(Error::Incompatible(e)),
            },
            Some(ExpectedType::Scalar(scalar)) => {
                match self.builder.coerce_scalar(lexeme, kind, &scalar) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        if self.pending_is_rest {
                            None
                        } else {
                            return Err(Error::Incompatible(e));
                        }
                    }
                }
            }
            Some(ExpectedType::Union(members)) => {
                if !tyjson_types::is_supported_union(&members) {
                    return Err(Error::UnsupportedType);
                }
                match self.coerce_union(lexeme, kind, &members) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        if self.pending_is_rest {
                            None
                        } else {
                            return Err(Error::Incompatible(e));
                        }
                    }
                }
            }
            Some(_) => return Err(Error::UnsupportedType),
        };
        self.pending_is_rest = false;

        match return_to {
            ReturnTo::StringValue => {
                self.current_json_node = coerced;
                self.state = State::DocEnd;
                Ok(())
            }
            ReturnTo::StringFieldValue => {
                if let Some(value) = coerced {
                    self.wire_field_value(value)?;
                }
                self.field_names.pop();
                self.state = State::FieldEnd;
                Ok(())
            }
            ReturnTo::StringArrayElement => {
                if let Some(value) = coerced {
                    self.wire_element_value(value)?;
                }
                self.state = State::ArrayElementEnd;
                Ok(())
            }
            ReturnTo::FieldName => unreachable!("field names never reach complete_value"),
        }
    }

    fn coerce_union(
        &mut self,
        lexeme: &str,
        kind: LexemeKind,
        members: &[ExpectedType],
    ) -> Result<B::Value, B::Error> {
        let mut last_err = None;
        for scalar in flatten_union_scalars(members) {
            match self.builder.coerce_scalar(lexeme, kind, &scalar) {
                Ok(v) => return Ok(v),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.expect("is_supported_union guarantees at least one scalar member"))
    }

    fn wire_field_value(&mut self, value: B::Value) -> Result<(), Error<B::Error>> {
        let name = self
            .field_names
            .last()
            .cloned()
            .expect("field value completion without a pending field name");
        let parent = self
            .current_json_node
            .as_mut()
            .expect("field value completion without an open parent record");
        self.builder
            .set_field(parent, &name, value)
            .map_err(Error::Incompatible)
    }

    /// The declared closed-array capacity of the array currently at the top
    /// of the expected-type stack, or `None` for an open array/tuple (a
    /// tuple always accepts a write at every index the driver reaches it
    /// for, so only `Array(Closed(n))` yields a capacity here).
    fn current_array_closed_capacity(&self) -> Option<usize> {
        match self.ctx.peek_expected() {
            Some(ExpectedType::Array(a)) => match a.state {
                ArrayState::Closed(n) => Some(n),
                ArrayState::Open => None,
            },
            _ => None,
        }
    }

    fn wire_element_value(&mut self, value: B::Value) -> Result<(), Error<B::Error>> {
        let index = self.ctx.current_array_index();
        let closed_capacity = self.current_array_closed_capacity();
        if let Some(cap) = closed_capacity {
            if index >= cap {
                return Ok(());
            }
        }
        let parent = self
            .current_json_node
            .as_mut()
            .expect("array element completion without an open parent array");
        self.builder
            .set_element(parent, index, value, closed_capacity)
            .map_err(Error::Incompatible)
    }

    // ---- scope-close / finalization -------------------------------------

    fn finalize_non_array_object(&mut self) -> Result<(), Error<B::Error>> {
        self.ctx.close_record(self.location)?;
        self.finalize_object()
    }

    fn finalize_object(&mut self) -> Result<(), Error<B::Error>> {
        self.ctx.pop_parser_context();
        let was_projected = self.ctx.pop_expected().is_none();
        if was_projected {
            return self.after_child_closed_projected();
        }
        match self.nodes_stack.pop() {
            None => {
                self.state = State::DocEnd;
                Ok(())
            }
            Some(mut parent) => {
                let child = self
                    .current_json_node
                    .take()
                    .expect("closing composite without a materialized value");
                match self.ctx.current_parser_context() {
                    Some(ParserContext::Map) => {
                        let name = self
                            .field_names
                            .pop()
                            .expect("closing object under a record/map without a pending field name");
                        self.builder
                            .set_field(&mut parent, &name, child)
                            .map_err(Error::Incompatible)?;
                        self.current_json_node = Some(parent);
                        self.state = State::FieldEnd;
                    }
                    Some(ParserContext::Array) => {
                        let index = self.ctx.current_array_index();
                        let closed_capacity = self.current_array_closed_capacity();
                        let at_capacity = closed_capacity.is_some_and(|cap| index >= cap);
                        if !at_capacity {
                            self.builder
                                .set_element(&mut parent, index, child, closed_capacity)
                                .map_err(Error::Incompatible)?;
                        }
                        self.current_json_node = Some(parent);
                        self.state = State::ArrayElementEnd;
                    }
                    None => {
                        self.current_json_node = Some(parent);
                        self.state = State::DocEnd;
                    }
                }
                Ok(())
            }
        }
    }

    fn after_child_closed_projected(&mut self) -> Result<(), Error<B::Error>> {
        match self.ctx.current_parser_context() {
            Some(ParserContext::Map) => {
                self.field_names.pop();
                self.state = State::FieldEnd;
            }
            Some(ParserContext::Array) => {
                self.state = State::ArrayElementEnd;
            }
            None => {
                self.state = State::DocEnd;
            }
        }
        Ok(())
    }

    fn finalize_array(&mut self, final_index_exclusive: usize, empty: bool) -> Result<(), Error<B::Error>> {
        let final_index = if empty { 0 } else { final_index_exclusive + 1 };
        self.ctx.pop_array_index();
        let popped = self.ctx.peek_expected().cloned();
        if let Some(ty) = &popped {
            self.ctx.validate_list_size(final_index, ty, self.location)?;
        }
        self.finalize_object()
    }
}

enum ValuePosition {
    Root,
    Field,
    Element,
}

/// Declaration-order list of scalar kinds reachable through `members`,
/// descending into nested unions (`tyjson_types::is_supported_union` allows
/// a union member to itself be a union of scalars).
fn flatten_union_scalars(members: &[ExpectedType]) -> Vec<tyjson_types::ScalarKind> {
    let mut out = Vec::new();
    for member in members {
        match member {
            ExpectedType::Scalar(kind) => out.push(*kind),
            ExpectedType::Union(nested) => out.extend(flatten_union_scalars(nested)),
            _ => {}
        }
    }
    out
}
