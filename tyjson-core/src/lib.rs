//! A type-directed streaming JSON parser engine.
//!
//! Unlike a generic JSON parser, this engine never builds a dynamic value
//! tree first and coerces it afterwards: it is driven at every structural
//! boundary by a caller-supplied [`tyjson_types::ExpectedType`], so it
//! allocates the right concrete container as it goes, rejects structurally
//! incompatible input early, and drops unexpected fields (projection)
//! without ever materializing them.
//!
//! The engine itself is agnostic to the materialized value representation:
//! callers implement [`ValueBuilder`] (or use the ready-made `tyjson-value`
//! crate) to say how a record, array, or scalar actually gets built.

use std::cell::RefCell;
use std::thread_local;

pub mod builder;
pub mod context;
pub mod driver;
pub mod error;
pub mod escape;
pub mod lexbuf;
pub mod location;
pub mod reader;

pub use builder::{LexemeKind, ValueBuilder};
pub use driver::{Machine, Options};
pub use error::{Error, IoErrorKind, Result};
pub use location::Location;
pub use reader::{CharSource, SliceReader, Utf8Reader};

use tyjson_types::ExpectedType;

/// Parses `source` against `expected` using a per-thread cached `Machine`.
///
/// The machine is reused across calls with the same `B` on the same thread,
/// avoiding repeated allocation of its stacks and lexeme buffer. Each
/// distinct `ValueBuilder` type `B` gets its own cached instance, since
/// `thread_local!` statics declared inside a generic function are
/// monomorphized once per instantiation. `Machine::parse` already resets
/// the machine on both entry and exit, so a panic unwinding out of a
/// previous call never leaves stale state behind.
///
pub fn parse<S, B>(source: &mut S, expected: &ExpectedType) -> Result<B::Value, B::Error>
where
    S: CharSource,
    B: ValueBuilder + Default + 'static,
{
    thread_local! {
        static MACHINE: RefCell<Option<Machine<B>>> = const { RefCell::new(None) };
    }
    MACHINE.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(Machine::new(B::default(), Options::default()));
        }
        slot.as_mut().expect("just initialized above").parse(source, expected)
    })
}
