//! Detect do-while loops (§4.2): a do-while loop has a tail block that is
//! nothing but a single JMP back to the loop head.

use log::trace;

use crate::block::{BlockId, Blocks};
use crate::controls::ControlMarker;
use crate::error::{ControlFlowError, Result};

use super::util::is_lone_jump;

pub fn detect(blocks: &mut Blocks) -> Result<()> {
    // Single pass: addresses are fixed before analysis starts, so the id
    // list can be snapshotted up front, but each marker is applied as soon
    // as its triple is found. A later head's `later_parents`/`has_main_control`
    // reads must see this pass's own earlier markers, not a stale snapshot.
    let ids: Vec<BlockId> = blocks.ids().collect();

    for head in ids {
        let lone_jump_parents: Vec<BlockId> = blocks
            .later_parents(head)
            .into_iter()
            .filter(|&p| is_lone_jump(blocks, p))
            .collect();

        let Some(tail) = blocks.latest(lone_jump_parents) else {
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
            "do-while: head={:08X} tail={:08X} next={:08X}",
            blocks.get(head).address,
            blocks.get(tail).address,
            blocks.get(next).address
        );
        blocks.get_mut(head).add_control(ControlMarker::DoWhileHead { head, tail, next });
        blocks.get_mut(tail).add_control(ControlMarker::DoWhileTail { head, tail, next });
        blocks.get_mut(next).add_control(ControlMarker::DoWhileNext { head, tail, next });
    }

    Ok(())
}
