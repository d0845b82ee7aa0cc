//! The block graph the control-flow pass runs over.
//!
//! This is the collaborator data model: the decoder, block-partitioner and
//! subroutine-splitter that would normally build one of these are out of
//! scope for this crate (see the crate-level docs). `Blocks` is the arena
//! those collaborators would populate; the pass borrows it for the
//! duration of analysis and mutates only each block's `controls`.
//!
//! # Memory layout
//! - `BlockId` is a `u32` arena index rather than a pointer: the graph is
//!   cyclic (back edges for loops), so blocks can't own each other.
//! - `parents`/`children` use `SmallVec<[_; 2]>` since basic blocks
//!   overwhelmingly have one or two edges of each kind.

use smallvec::SmallVec;

use crate::controls::ControlMarker;

/// Arena index of a [`Block`] within a [`Blocks`] graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// NWScript bytecode opcode.
///
/// Only [`Opcode::Jmp`] and [`Opcode::Retn`] are ever inspected by the
/// control-flow pass; the rest exist so a [`Block`]'s instruction stream
/// looks like a real decoded function rather than a two-opcode toy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Cpdownsp,
    Rsadd,
    Cptopsp,
    Const,
    Action,
    Logand,
    Logor,
    Incor,
    Excor,
    Booland,
    Equal,
    Nequal,
    Geq,
    Gt,
    Lt,
    Leq,
    Shleft,
    Shright,
    Mod,
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Comp,
    Movsp,
    Jmp,
    Jsr,
    Jz,
    Retn,
    Destruct,
    Not,
    Decsp,
    Incsp,
    Jnz,
    Cpdownbp,
    Cptopbp,
    Decbp,
    Incbp,
    Savebp,
    Restorebp,
    Nop,
}

/// A single decoded instruction. Only the opcode tag matters to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Instruction { opcode }
    }
}

/// Whether a block's terminating instruction is a conditional branch (two
/// data-dependent successors) or not (one static successor, or a call that
/// falls through).
///
/// This is a derived predicate the collaborator that builds the graph must
/// supply; the control-flow pass never infers it from an opcode itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Conditional,
    Unconditional,
}

/// An outgoing edge from a block to one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildEdge {
    pub target: BlockId,
    /// True if this edge represents a call into another subroutine rather
    /// than intra-procedural flow (excluded from loop-interior checks).
    pub is_subroutine_call: bool,
}

impl ChildEdge {
    pub fn flow(target: BlockId) -> Self {
        ChildEdge {
            target,
            is_subroutine_call: false,
        }
    }

    pub fn call(target: BlockId) -> Self {
        ChildEdge {
            target,
            is_subroutine_call: true,
        }
    }
}

/// The subroutine a block belongs to, identified by its entry address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubRoutine {
    pub entry_address: u32,
}

/// A basic block: a maximal straight-line instruction sequence with one
/// entry and one exit.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    /// Non-negative, unique within the function; defines block ordering.
    pub address: u32,
    pub instructions: Vec<Instruction>,
    pub parents: SmallVec<[BlockId; 2]>,
    pub children: SmallVec<[ChildEdge; 2]>,
    pub child_kind: ChildKind,
    pub sub_routine: SubRoutine,
    /// Control markers attached by the pass. Empty until analysis runs.
    pub controls: Vec<ControlMarker>,
}

impl Block {
    pub fn new(
        id: BlockId,
        address: u32,
        instructions: Vec<Instruction>,
        sub_routine: SubRoutine,
        child_kind: ChildKind,
    ) -> Self {
        Block {
            id,
            address,
            instructions,
            parents: SmallVec::new(),
            children: SmallVec::new(),
            child_kind,
            sub_routine,
            controls: Vec::new(),
        }
    }

    /// Has exactly one instruction.
    pub fn singular(&self) -> bool {
        self.instructions.len() == 1
    }

    pub fn has_conditional_children(&self) -> bool {
        matches!(self.child_kind, ChildKind::Conditional)
    }

    pub fn has_unconditional_children(&self) -> bool {
        matches!(self.child_kind, ChildKind::Unconditional)
    }

    /// True iff child edge `i` is a call into another subroutine.
    pub fn is_subroutine_child(&self, i: usize) -> bool {
        self.children.get(i).is_some_and(|e| e.is_subroutine_call)
    }

    /// Contains a `RETN` instruction.
    pub fn is_return_block(&self) -> bool {
        self.instructions.iter().any(|i| i.opcode == Opcode::Retn)
    }

    /// Attach a control marker, skipping it if an identical one is already
    /// present. Detection passes re-examine `WhileHead` blocks on every
    /// run (the `hasMainControl` exemption that lets an if-condition
    /// coexist with a loop marker also lets the pass revisit it), so this
    /// is what keeps re-running analysis from duplicating markers.
    pub fn add_control(&mut self, marker: ControlMarker) {
        if !self.controls.contains(&marker) {
            self.controls.push(marker);
        }
    }

    /// Any attached marker other than Break/Continue/Return. This block
    /// already claims a loop or if structure.
    pub fn has_main_control(&self) -> bool {
        self.controls.iter().any(|c| c.kind().is_main_control())
    }

    pub fn is_control(&self, kind: crate::controls::ControlKind) -> bool {
        self.controls.iter().any(|c| c.kind() == kind)
    }

    pub fn is_loop(&self) -> bool {
        self.controls.iter().any(|c| c.kind().is_loop_kind())
    }

    pub fn is_loop_next(&self) -> bool {
        self.controls
            .iter()
            .any(|c| matches!(c.kind(), crate::controls::ControlKind::DoWhileNext | crate::controls::ControlKind::WhileNext))
    }

    pub fn is_loop_tail(&self) -> bool {
        self.controls
            .iter()
            .any(|c| matches!(c.kind(), crate::controls::ControlKind::DoWhileTail | crate::controls::ControlKind::WhileTail))
    }

    /// Already accounted for by some if-construct: as its condition, its
    /// true arm, or its else arm. Used to check that a conditional block's
    /// children are either themselves nested ifs or the join point
    /// (`IfNext`), never an unclaimed dangling branch.
    pub fn is_if_cond(&self) -> bool {
        use crate::controls::ControlKind;
        self.is_control(ControlKind::IfCond) || self.is_control(ControlKind::IfTrue) || self.is_control(ControlKind::IfElse)
    }

    /// If this block is marked with any loop kind, yields its (head, tail,
    /// next) triple.
    pub fn get_loop(&self) -> Option<(BlockId, BlockId, BlockId)> {
        self.controls.iter().find_map(|c| c.loop_triple())
    }
}

/// The caller-owned arena of blocks for one function, in ascending-address
/// order. Owns the collaborator queries the pass consumes that need to
/// resolve addresses of blocks other than `self`.
#[derive(Debug, Clone)]
pub struct Blocks(Vec<Block>);

impl Blocks {
    pub fn new(blocks: Vec<Block>) -> Self {
        Blocks(blocks)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: BlockId) -> &Block {
        &self.0[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.0[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.0.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.0.iter().map(|b| b.id)
    }

    /// Block with the smallest address strictly greater than `after`'s, or
    /// `None`. Blocks are stored in ascending-address order so the first
    /// qualifying block found is the answer.
    pub fn next_block(&self, after: BlockId) -> Option<BlockId> {
        let address = self.get(after).address;
        self.0
            .iter()
            .filter(|b| b.address > address)
            .min_by_key(|b| b.address)
            .map(|b| b.id)
    }

    /// Parents of `b` whose address is greater than `b`'s own address.
    pub fn later_parents(&self, b: BlockId) -> SmallVec<[BlockId; 4]> {
        let address = self.get(b).address;
        self.get(b)
            .parents
            .iter()
            .copied()
            .filter(|&p| self.get(p).address > address)
            .collect()
    }

    /// True iff some child has an address less than or equal to `b`'s own.
    pub fn has_back_edge(&self, b: BlockId) -> bool {
        let block = self.get(b);
        block
            .children
            .iter()
            .any(|e| self.get(e.target).address <= block.address)
    }

    /// Whether `to` is reachable from `from` by walking successor edges.
    /// Branches are not a barrier; either arm of a conditional may lead to
    /// `to`. A cycle guard, not a conditional-children check, is what keeps
    /// this terminating on back edges.
    pub fn has_linear_path(&self, from: BlockId, to: BlockId) -> bool {
        let mut visited = std::collections::HashSet::new();
        self.linear_path_dfs(from, to, &mut visited)
    }

    fn linear_path_dfs(&self, from: BlockId, to: BlockId, visited: &mut std::collections::HashSet<BlockId>) -> bool {
        if from == to {
            return true;
        }
        if !visited.insert(from) {
            return false;
        }
        self.get(from)
            .children
            .iter()
            .any(|e| self.linear_path_dfs(e.target, to, visited))
    }

    /// The earliest (lowest-address) block among `ids`.
    pub fn earliest(&self, ids: impl IntoIterator<Item = BlockId>) -> Option<BlockId> {
        ids.into_iter().min_by_key(|&id| self.get(id).address)
    }

    /// The latest (highest-address) block among `ids`.
    pub fn latest(&self, ids: impl IntoIterator<Item = BlockId>) -> Option<BlockId> {
        ids.into_iter().max_by_key(|&id| self.get(id).address)
    }
}
