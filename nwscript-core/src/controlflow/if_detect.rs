//! Detect if and if-else statements (§4.6). Runs last: break, continue and
//! return must already have claimed the lone-JMP and shared-trampoline
//! blocks they rely on, and a while loop's head needs to still look
//! eligible for the conditional it also carries.

use log::trace;

use crate::block::{BlockId, Blocks};
use crate::controls::{ControlKind, ControlMarker};
use crate::error::Result;

use super::util::find_path_merge;

pub fn detect(blocks: &mut Blocks) -> Result<()> {
    // Single pass, markers applied as each if-construct is found: two
    // sequential ifs where the first's merge block is the second's
    // condition need that merge block's `IfNext` marker visible to
    // `has_main_control` by the time the second cond is examined, or it
    // would be mistaken for an unclaimed conditional and reclassified.
    let ids: Vec<BlockId> = blocks.ids().collect();

    for cond in ids {
        let block = blocks.get(cond);

        // Undetermined blocks are fair game; a while loop's head legitimately
        // carries both the loop marker and the conditional bounding it.
        if block.has_main_control() && !block.is_control(ControlKind::WhileHead) {
            continue;
        }

        if block.children.len() != 2 || !block.has_conditional_children() {
            continue;
        }

        let c0 = block.children[0].target;
        let c1 = block.children[1].target;

        let is_if_else = !blocks.has_linear_path(c0, c1);

        let (if_true, if_else, if_next) = if is_if_else {
            let if_next = find_path_merge(blocks, c0, c1);
            (c0, Some(c1), if_next)
        } else {
            let (lo, hi) = if blocks.get(c0).address < blocks.get(c1).address {
                (c0, c1)
            } else {
                (c1, c0)
            };
            (lo, None, Some(hi))
        };

        trace!(
            "if: cond={:08X} true={:08X} else={:?} next={:?}",
            blocks.get(cond).address,
            blocks.get(if_true).address,
            if_else.map(|b| blocks.get(b).address),
            if_next.map(|b| blocks.get(b).address)
        );

        blocks.get_mut(cond).add_control(ControlMarker::IfCond {
            cond,
            if_true,
            if_else,
            if_next,
        });
        blocks.get_mut(if_true).add_control(ControlMarker::IfTrue {
            cond,
            if_true,
            if_else,
            if_next,
        });
        if let Some(e) = if_else {
            blocks.get_mut(e).add_control(ControlMarker::IfElse {
                cond,
                if_true,
                if_else,
                if_next,
            });
        }
        if let Some(n) = if_next {
            blocks.get_mut(n).add_control(ControlMarker::IfNext {
                cond,
                if_true,
                if_else,
                if_next,
            });
        }
    }

    Ok(())
}
