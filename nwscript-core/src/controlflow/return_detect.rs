//! Detect return statements (§4.5). A return block contains a RETN. A bare
//! singleton RETN block is typically a shared epilogue compiled once for
//! several `return;` statements, so the marker is attributed to each
//! logical return *site* (the unconditional parent), not to the shared
//! trampoline itself, unless no parent qualifies, in which case the
//! trampoline is the return site.

use log::trace;

use crate::block::{Block, BlockId, Blocks};
use crate::controls::ControlMarker;
use crate::error::Result;

pub fn detect(blocks: &mut Blocks) -> Result<()> {
    // For each candidate, either the set of unconditional, unclaimed
    // parents to mark, or (if none) the block itself.
    enum Target {
        Parents { retn: BlockId, parents: Vec<BlockId> },
        Itself(BlockId),
    }

    let mut found: Vec<Target> = Vec::new();

    for b in blocks.ids() {
        let block = blocks.get(b);
        if block.has_main_control() || !block.is_return_block() {
            continue;
        }

        if block.sub_routine.entry_address == block.address {
            continue;
        }

        if block.singular() {
            let parents: Vec<BlockId> = block
                .parents
                .iter()
                .copied()
                .filter(|&p| {
                    let parent: &Block = blocks.get(p);
                    parent.has_unconditional_children() && !parent.has_main_control()
                })
                .collect();

            if !parents.is_empty() {
                found.push(Target::Parents { retn: b, parents });
                continue;
            }
        }

        found.push(Target::Itself(b));
    }

    for target in found {
        match target {
            Target::Parents { retn, parents } => {
                for p in parents {
                    trace!(
                        "return: attributed to parent {:08X} (shared trampoline {:08X})",
                        blocks.get(p).address,
                        blocks.get(retn).address
                    );
                    blocks.get_mut(p).add_control(ControlMarker::Return { block: retn });
                }
            }
            Target::Itself(b) => {
                trace!("return: attributed to block {:08X}", blocks.get(b).address);
                blocks.get_mut(b).add_control(ControlMarker::Return { block: b });
            }
        }
    }

    Ok(())
}
