//! Detect break and continue statements (§4.4). Both are lone-JMP blocks
//! with exactly one child; break targets the block directly following a
//! loop, continue targets the loop's tail. They're disjoint by
//! construction (`is_loop_next` vs. `is_loop_tail`), so detecting break
//! before continue doesn't matter for correctness, only for matching the
//! source's pass order.

use log::trace;

use crate::block::{BlockId, Blocks};
use crate::controls::ControlMarker;
use crate::error::Result;

use super::util::is_lone_jump;

pub fn detect_break(blocks: &mut Blocks) -> Result<()> {
    detect(blocks, |b| b.is_loop_next(), |head, tail, next| {
        ControlMarker::Break { head, tail, next }
    })
}

pub fn detect_continue(blocks: &mut Blocks) -> Result<()> {
    detect(blocks, |b| b.is_loop_tail(), |head, tail, next| {
        ControlMarker::Continue { head, tail, next }
    })
}

fn detect(
    blocks: &mut Blocks,
    targets_loop_edge: impl Fn(&crate::block::Block) -> bool,
    marker: impl Fn(BlockId, BlockId, BlockId) -> ControlMarker,
) -> Result<()> {
    let mut found: Vec<(BlockId, BlockId, BlockId, BlockId)> = Vec::new();

    for b in blocks.ids() {
        let block = blocks.get(b);
        if block.has_main_control() || !is_lone_jump(blocks, b) {
            continue;
        }

        if block.children.len() != 1 {
            continue;
        }
        let child = block.children[0].target;

        if !targets_loop_edge(blocks.get(child)) {
            continue;
        }

        let Some((head, tail, next)) = blocks.get(child).get_loop() else {
            continue;
        };

        found.push((b, head, tail, next));
    }

    for (b, head, tail, next) in found {
        trace!(
            "break/continue: block={:08X} loop=({:08X},{:08X},{:08X})",
            blocks.get(b).address,
            blocks.get(head).address,
            blocks.get(tail).address,
            blocks.get(next).address
        );
        blocks.get_mut(b).add_control(marker(head, tail, next));
    }

    Ok(())
}
