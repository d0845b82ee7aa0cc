//! Structural control-flow recovery for NWScript basic-block graphs.
//!
//! Given a function's basic-block graph (blocks with instructions, explicit
//! parent/child edges, conditional vs. unconditional successor kinds, and a
//! natural ordering by start address), [`analyze_control_flow`] labels each
//! block with the high-level control constructs it participates in
//! (do-while, while, break, continue, return, if/if-else), identifying the
//! constituent blocks of each construct, then verifies the result is
//! structurally well-formed.
//!
//! This crate does not build the block graph itself: decoding bytecode,
//! partitioning it into basic blocks, and splitting subroutines are all
//! out of scope and treated as collaborators that produce the [`block::Blocks`]
//! this crate consumes. It does not compute dominators, does not
//! symbolically execute, does not emit source text, and does not handle
//! switch/select statements.

pub mod block;
pub mod controlflow;
pub mod controls;
pub mod error;

use block::Blocks;
use error::Result;

/// Analyze the control flow of one function's block graph, mutating it in
/// place. Fatal on a malformed CFG; already-appended markers remain on
/// `blocks` and the graph must be discarded by the caller in that case.
pub fn analyze_control_flow(blocks: &mut Blocks) -> Result<()> {
    controlflow::analyze(blocks)
}
