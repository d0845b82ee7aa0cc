//! Small local helpers shared by the detection and verification passes.

use smallvec::SmallVec;

use crate::block::{BlockId, Blocks, Opcode};

/// Singleton block whose only instruction is an unconditional jump,
/// arising as the target of at least one conditional branch. This
/// distinguishes a real source-level jump (break/continue/loop-back
/// candidate) from a block that was merely split because a third block
/// jumps into its middle: a dependent block's every parent flows into it
/// unconditionally, so only a parent with conditional children makes the
/// jump "lone" in the sense this pass cares about.
pub fn is_lone_jump(blocks: &Blocks, id: BlockId) -> bool {
    let block = blocks.get(id);
    if !(block.singular() && block.instructions[0].opcode == Opcode::Jmp) {
        return false;
    }

    block
        .parents
        .iter()
        .any(|&p| blocks.get(p).has_conditional_children())
}

/// `b` is marked Return; if `check_children` and `b` has unconditional
/// children, also true if any direct child is marked Return.
pub fn is_return_control(blocks: &Blocks, id: BlockId, check_children: bool) -> bool {
    let block = blocks.get(id);
    if block.is_control(crate::controls::ControlKind::Return) {
        return true;
    }

    if check_children {
        if block.has_conditional_children() {
            return false;
        }
        return block
            .children
            .iter()
            .any(|e| blocks.get(e.target).is_control(crate::controls::ControlKind::Return));
    }

    false
}

/// The block where the control-flow paths of `b1` and `b2` reconverge, or
/// `None` if they never do (e.g. both arms return). Recursion descends
/// only through `b2`'s children and is bounded because any candidate
/// either satisfies `has_linear_path` (and is collected) or is walked
/// further regardless of address, exactly as the original analysis does;
/// termination in practice relies on the finite CFG, not on an explicit
/// visited set, matching the upstream implementation this pass is ported
/// from.
pub fn find_path_merge(blocks: &Blocks, b1: BlockId, b2: BlockId) -> Option<BlockId> {
    let (lo, hi) = if blocks.get(b1).address <= blocks.get(b2).address {
        (b1, b2)
    } else {
        (b2, b1)
    };

    let mut merges: SmallVec<[BlockId; 4]> = SmallVec::new();
    collect_path_merges(blocks, lo, hi, &mut merges);
    blocks.earliest(merges)
}

fn collect_path_merges(blocks: &Blocks, lo: BlockId, hi: BlockId, merges: &mut SmallVec<[BlockId; 4]>) {
    if blocks.get(lo).address > blocks.get(hi).address {
        return;
    }

    if blocks.has_linear_path(lo, hi) {
        merges.push(hi);
        return;
    }

    for edge in blocks.get(hi).children.clone() {
        collect_path_merges(blocks, lo, edge.target, merges);
    }
}
