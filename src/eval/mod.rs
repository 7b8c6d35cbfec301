//! Incremental evaluation of behavior nets against event streams.
//!
//! State is split off from structure: a [`BehaviorNet`](crate::net::BehaviorNet)
//! is immutable once compiled, while a [`Marking`] carries the tokens
//! accumulated so far and a [`NetEvaluator`] advances a marking one event at a
//! time.

pub mod expr;

mod evaluator;
mod marking;
mod token;

pub use evaluator::NetEvaluator;
pub use marking::Marking;
pub use token::Token;
