//! Error handling for the control-flow pass.
//!
//! One taxonomy: [`ControlFlowError`], raised on any verification violation
//! or on a missing successor block during loop detection. Every failure is
//! fatal to the current function's analysis. There are no warnings and
//! nothing here is recoverable within the pass; the caller decides whether
//! to abort the enclosing tool or skip the function.
//!
//! Addresses are rendered zero-padded 8-hex-digit to match existing
//! decompiler diagnostic conventions.

use thiserror::Error;

/// Malformed-CFG diagnosis raised by [`crate::analyze_control_flow`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlFlowError {
    #[error("cannot find block following loop at head {head:08X}")]
    MissingLoopNext { head: u32 },

    #[error("block {0:08X} has back edges but is no loop")]
    UnclaimedBackEdge(u32),

    #[error("block {0:08X} has conditional children but is no if")]
    UnclaimedConditional(u32),

    #[error("block {child:08X} is child of if {parent:08X} but is not an if type")]
    DanglingIfChild { parent: u32, child: u32 },

    #[error("loop blocks out of order: {head:08X}, {tail:08X}, {next:08X}")]
    LoopOrder { head: u32, tail: u32, next: u32 },

    #[error("loop blocks have no linear path: {head:08X}, {tail:08X}, {next:08X}")]
    LoopNoPath { head: u32, tail: u32, next: u32 },

    #[error("loop block jumps outside loop: {head:08X}, {tail:08X}, {next:08X}: {from:08X} => {to:08X}")]
    LoopEscape {
        head: u32,
        tail: u32,
        next: u32,
        from: u32,
        to: u32,
    },

    #[error("if blocks true and next have no linear path: {cond:08X}, {if_true:08X}, {if_next:08X}")]
    IfTrueNoPath { cond: u32, if_true: u32, if_next: u32 },

    #[error("if blocks else and next have no linear path: {cond:08X}, {if_else:08X}, {if_next:08X}")]
    IfElseNoPath { cond: u32, if_else: u32, if_next: u32 },
}

pub type Result<T> = std::result::Result<T, ControlFlowError>;
