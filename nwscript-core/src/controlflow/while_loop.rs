//! Detect while loops (§4.3). Identical shape to do-while detection but
//! without the lone-jump filter on parents: a while loop's tail may carry
//! the loop-controlling comparison rather than a bare JMP. The prior
//! do-while pass has already claimed bare-JMP tails, so this pass picks up
//! whatever later-parent is left unmarked; `has_main_control` prevents
//! double-claiming a tail the do-while pass already took.

use log::trace;

use crate::block::{BlockId, Blocks};
use crate::controls::ControlMarker;
use crate::error::{ControlFlowError, Result};

pub fn detect(blocks: &mut Blocks) -> Result<()> {
    // Single pass, markers applied as each triple is found: a block already
    // claimed as one loop's tail earlier in this same pass must read as
    // `has_main_control` for a later head, or it would be claimed twice.
    let ids: Vec<BlockId> = blocks.ids().collect();

    for head in ids {
        let later_parents = blocks.later_parents(head);

        let Some(tail) = blocks.latest(later_parents) else {
            continue;
        };

        if blocks.get(tail).has_main_control() {
            continue;
        }

        let Some(next) = blocks.next_block(tail) else {
            return Err(ControlFlowError::MissingLoopNext {
                head: blocks.get(head).address,
            });
        };

        trace!(
            "while: head={:08X} tail={:08X} next={:08X}",
            blocks.get(head).address,
            blocks.get(tail).address,
            blocks.get(next).address
        );
        blocks.get_mut(head).add_control(ControlMarker::WhileHead { head, tail, next });
        blocks.get_mut(tail).add_control(ControlMarker::WhileTail { head, tail, next });
        blocks.get_mut(next).add_control(ControlMarker::WhileNext { head, tail, next });
    }

    Ok(())
}
