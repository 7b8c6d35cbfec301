//! Behavioral pattern recognition over execution event streams.
//!
//! `behavior_engine` compiles behavior definitions written in a small DSL
//! into colored Petri nets and evaluates them incrementally against streams
//! of API/syscall events. A behavior is recognized when a token reaches an
//! accepting place of its net.
//!
//! # Quick Start
//!
//! ```
//! use behavior_engine::{compile_str, CancellationToken, StreamAnalyzer};
//! use behavior_engine::{EventStream, ExecutionEvent, Timestamp};
//! use std::sync::Arc;
//!
//! // Transitions without input places fire on any matching event, so
//! // `t_write` below starts a fresh partial match for every successful
//! // `WriteFile`.
//!
//! let net = compile_str(r#"
//! behavior drops_and_runs {
//!     place dropped
//!     place executed accepting
//!
//!     transition t_write {
//!         WriteFile(path) -> ok
//!         where ok != 0
//!     }
//!     transition t_exec {
//!         CreateProcess(path)
//!     }
//!
//!     t_write -> dropped -> t_exec -> executed
//! }"#).unwrap();
//!
//! let mut analyzer = StreamAnalyzer::new();
//! analyzer.add_behavior(Arc::new(net));
//!
//! let stream: EventStream = [
//!     ExecutionEvent::new(Timestamp::from_micros(1), "WriteFile")
//!         .with_arguments([7u64])
//!         .returning(1u64),
//!     ExecutionEvent::new(Timestamp::from_micros(2), "CreateProcess")
//!         .with_arguments([7u64]),
//! ]
//! .into_iter()
//! .collect();
//!
//! let result = analyzer
//!     .analyze(&stream, &CancellationToken::new())
//!     .unwrap();
//! assert!(result.has_detections());
//! ```
//!
//! Nets can also be assembled programmatically through
//! [`BehaviorNet`] and fed one event at a time with a
//! [`NetEvaluator`]; see the module documentation of [`eval`] for the
//! matching semantics.

pub mod analyzer;
pub mod ast;
pub mod compiler;
pub mod error;
pub mod eval;
pub mod event;
pub mod net;

pub use analyzer::{AnalysisResult, CancellationToken, StreamAnalyzer};
pub use ast::{BinaryOp, Expression, ExpressionType, UnaryOp};
pub use compiler::{compile_file, compile_str};
pub use error::{BehaviorError, Result};
pub use eval::{Marking, NetEvaluator, Token};
pub use event::{EventStream, EventValue, ExecutionEvent, Timestamp};
pub use net::{ApiCallGuard, BehaviorNet, PlaceId, TransitionGuard, TransitionId};
