//! Verification (§4.7): assert the annotations the detection passes left
//! behind form a well-structured program. Any violation is fatal.

use crate::block::{BlockId, Blocks};
use crate::controls::ControlKind;
use crate::error::{ControlFlowError, Result};

use super::util::is_return_control;

/// Every block with a back edge is part of some loop; every block with
/// conditional children is marked `IfCond`, and each of its children is
/// either itself an `IfCond` or is the immediate join (`IfNext`).
pub fn verify_blocks(blocks: &Blocks) -> Result<()> {
    for b in blocks.ids() {
        let block = blocks.get(b);

        if blocks.has_back_edge(b) && !block.is_loop() {
            return Err(ControlFlowError::UnclaimedBackEdge(block.address));
        }

        if block.has_conditional_children() {
            if !block.is_control(ControlKind::IfCond) {
                return Err(ControlFlowError::UnclaimedConditional(block.address));
            }

            for edge in &block.children {
                let child = blocks.get(edge.target);
                if !child.is_if_cond() && !child.is_control(ControlKind::IfNext) {
                    return Err(ControlFlowError::DanglingIfChild {
                        parent: block.address,
                        child: child.address,
                    });
                }
            }
        }
    }

    Ok(())
}

/// For each loop head marker triple, assert address ordering, that linear
/// paths exist head→tail and tail→next, and that no block in the loop
/// interior escapes to somewhere other than another interior block, next,
/// or a return.
pub fn verify_loops(blocks: &Blocks) -> Result<()> {
    let mut seen: Vec<(BlockId, BlockId, BlockId)> = Vec::new();
    for b in blocks.ids() {
        if let Some(triple) = blocks.get(b).get_loop() {
            if !seen.contains(&triple) {
                seen.push(triple);
            }
        }
    }

    for (head, tail, next) in seen {
        verify_loop(blocks, head, tail, next)?;
    }

    Ok(())
}

fn verify_loop(blocks: &Blocks, head: BlockId, tail: BlockId, next: BlockId) -> Result<()> {
    let (head_addr, tail_addr, next_addr) = (
        blocks.get(head).address,
        blocks.get(tail).address,
        blocks.get(next).address,
    );

    if !(head_addr < tail_addr && tail_addr < next_addr) {
        return Err(ControlFlowError::LoopOrder {
            head: head_addr,
            tail: tail_addr,
            next: next_addr,
        });
    }

    if !blocks.has_linear_path(head, tail) || !blocks.has_linear_path(tail, next) {
        return Err(ControlFlowError::LoopNoPath {
            head: head_addr,
            tail: tail_addr,
            next: next_addr,
        });
    }

    verify_loop_blocks(blocks, head, head, tail, next)
}

/// Recursively verify that no block inside the loop jumps to a random
/// script location. Recursion is bounded by only descending into children
/// whose address is greater than the current block's, which terminates on
/// back edges without an explicit visited set.
fn verify_loop_blocks(blocks: &Blocks, block: BlockId, head: BlockId, tail: BlockId, next: BlockId) -> Result<()> {
    let (head_addr, tail_addr, next_addr) = (
        blocks.get(head).address,
        blocks.get(tail).address,
        blocks.get(next).address,
    );
    let block_addr = blocks.get(block).address;

    if block_addr > tail_addr || block_addr < head_addr {
        return Ok(());
    }

    for (i, edge) in blocks.get(block).children.iter().enumerate() {
        if blocks.get(block).is_subroutine_child(i) {
            continue;
        }

        let child = edge.target;
        let child_addr = blocks.get(child).address;

        if child_addr < head_addr || (child_addr > tail_addr && child_addr != next_addr) {
            let escapes_via_return =
                is_return_control(blocks, block, false) || is_return_control(blocks, child, true);
            if !escapes_via_return {
                return Err(ControlFlowError::LoopEscape {
                    head: head_addr,
                    tail: tail_addr,
                    next: next_addr,
                    from: block_addr,
                    to: child_addr,
                });
            }
        }

        if child_addr > block_addr {
            verify_loop_blocks(blocks, child, head, tail, next)?;
        }
    }

    Ok(())
}

/// For every `IfCond` marker, assert linear paths true→next and else→next
/// when both ends of each pair are present.
pub fn verify_if(blocks: &Blocks) -> Result<()> {
    for b in blocks.ids() {
        let block = blocks.get(b);
        for marker in &block.controls {
            let crate::controls::ControlMarker::IfCond {
                cond,
                if_true,
                if_else,
                if_next,
            } = *marker
            else {
                continue;
            };

            if let Some(next) = if_next {
                if !blocks.has_linear_path(if_true, next) {
                    return Err(ControlFlowError::IfTrueNoPath {
                        cond: blocks.get(cond).address,
                        if_true: blocks.get(if_true).address,
                        if_next: blocks.get(next).address,
                    });
                }

                if let Some(e) = if_else {
                    if !blocks.has_linear_path(e, next) {
                        return Err(ControlFlowError::IfElseNoPath {
                            cond: blocks.get(cond).address,
                            if_else: blocks.get(e).address,
                            if_next: blocks.get(next).address,
                        });
                    }
                }
            }
        }
    }

    Ok(())
}
