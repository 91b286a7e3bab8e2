//! nandasm common types: the instruction-set description.
//!
//! This crate provides what callers hand to the assembler:
//!
//! - [`AssemblerConfig`]: serde-loadable list of [`OpcodeSpec`]s
//! - [`OperandShape`] / [`OperandKind`]: legacy and typed operand forms
//! - [`InstructionSet`]: the validated lookup table built from a config
//! - [`OperandSlot`]: the canonical per-operand form both shapes convert to
//! - [`ConfigError`]: errors from validating a config

pub mod config;
pub mod error;
pub mod isa;

// Re-export commonly used types at the crate root.
pub use config::{AssemblerConfig, OpcodeSpec, OperandKind, OperandShape};
pub use error::ConfigError;
pub use isa::{InstructionSet, Opcode, OperandSlot};
