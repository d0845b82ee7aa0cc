//! Structural control-flow recovery: detection passes plus verification.
//!
//! [`analyze`] runs the six detection passes in their load-bearing fixed
//! order, then the three verification sweeps. Pass ordering matters:
//! do-while must precede while (it claims lone-JMP tails first); break and
//! continue must precede if (they rely on lone-JMP blocks not yet being
//! re-interpreted as if-conditions); return must precede if (shared
//! trampolines get attributed before the conditional pass inspects them);
//! if runs last.

mod break_continue;
mod do_while;
mod if_detect;
mod return_detect;
mod util;
mod verify;
mod while_loop;

use log::debug;

use crate::block::Blocks;
use crate::error::Result;

/// Label every block in `blocks` with the high-level control constructs it
/// participates in, then verify the result is structurally well-formed.
///
/// Mutates `blocks` in place; on a verification failure the already
/// appended markers remain and the graph must be discarded by the caller.
pub fn analyze(blocks: &mut Blocks) -> Result<()> {
    debug!("analyzing control flow over {} blocks", blocks.len());

    do_while::detect(blocks)?;
    while_loop::detect(blocks)?;
    break_continue::detect_break(blocks)?;
    break_continue::detect_continue(blocks)?;
    return_detect::detect(blocks)?;
    if_detect::detect(blocks)?;

    verify::verify_blocks(blocks)?;
    verify::verify_loops(blocks)?;
    verify::verify_if(blocks)?;

    debug!("control flow analysis complete");
    Ok(())
}
