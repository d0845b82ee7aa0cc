//! Scenario tests for control-flow recovery, one per spec fixture.
//!
//! Each scenario asserts the markers it names, then re-runs analysis on
//! the already-annotated graph to confirm idempotence: no error, no new
//! markers.

use std::collections::HashMap;

use nwscript_core::analyze_control_flow;
use nwscript_core::block::{Block, BlockId, Blocks, ChildEdge, ChildKind, Instruction, Opcode, SubRoutine};
use nwscript_core::controls::{ControlKind, ControlMarker};
use nwscript_core::error::ControlFlowError;

fn sub() -> SubRoutine {
    SubRoutine { entry_address: 0xffff_ffff }
}

/// A leaf block with one filler instruction and no children.
fn leaf(address: u32) -> Block {
    Block::new(BlockId(address), address, vec![Instruction::new(Opcode::Nop)], sub(), ChildKind::Unconditional)
}

/// A block with a single unconditional child carrying ordinary content.
fn flow(address: u32, child: u32) -> Block {
    let mut b = Block::new(BlockId(address), address, vec![Instruction::new(Opcode::Add)], sub(), ChildKind::Unconditional);
    b.children.push(ChildEdge::flow(BlockId(child)));
    b
}

/// A bare-JMP block with a single unconditional child.
fn lone_jmp(address: u32, child: u32) -> Block {
    let mut b = Block::new(BlockId(address), address, vec![Instruction::new(Opcode::Jmp)], sub(), ChildKind::Unconditional);
    b.children.push(ChildEdge::flow(BlockId(child)));
    b
}

/// A block with a conditional branch to two children, in the given order.
fn branch(address: u32, c0: u32, c1: u32) -> Block {
    let mut b = Block::new(BlockId(address), address, vec![Instruction::new(Opcode::Jz)], sub(), ChildKind::Conditional);
    b.children.push(ChildEdge::flow(BlockId(c0)));
    b.children.push(ChildEdge::flow(BlockId(c1)));
    b
}

/// Build an arena from fixture blocks whose `id`/`children` are addresses,
/// remapping both to real arena indices. Fixtures are written in ascending
/// address order, so this is the only indirection the test helpers need.
fn build(blocks: Vec<Block>) -> Blocks {
    let addr_to_id: HashMap<u32, BlockId> =
        blocks.iter().enumerate().map(|(i, b)| (b.address, BlockId(i as u32))).collect();

    let mut remapped: Vec<Block> = blocks
        .into_iter()
        .map(|mut b| {
            b.id = addr_to_id[&b.address];
            for edge in b.children.iter_mut() {
                edge.target = addr_to_id[&edge.target.0];
            }
            b
        })
        .collect();
    remapped.sort_by_key(|b| b.id.0);

    let mut parents: Vec<Vec<BlockId>> = vec![Vec::new(); remapped.len()];
    for b in &remapped {
        for edge in &b.children {
            parents[edge.target.0 as usize].push(b.id);
        }
    }
    for (b, p) in remapped.iter_mut().zip(parents.into_iter()) {
        b.parents = p.into_iter().collect();
    }

    Blocks::new(remapped)
}

fn id_for(blocks: &Blocks, address: u32) -> BlockId {
    blocks.iter().find(|b| b.address == address).expect("block exists").id
}

fn assert_idempotent(mut blocks: Blocks) {
    let before: Vec<usize> = blocks.iter().map(|b| b.controls.len()).collect();
    analyze_control_flow(&mut blocks).expect("re-analysis must not fail");
    let after: Vec<usize> = blocks.iter().map(|b| b.controls.len()).collect();
    assert_eq!(before, after, "re-running analysis must add no new markers");
}

#[test]
fn scenario_1_simple_if_no_else() {
    // A(0) cond-> B(4), C(8); B -> C; C terminal.
    let a = branch(0, 4, 8);
    let b = flow(4, 8);
    let c = leaf(8);

    let mut blocks = build(vec![a, b, c]);
    analyze_control_flow(&mut blocks).unwrap();

    let a = id_for(&blocks, 0);
    let b = id_for(&blocks, 4);
    let c = id_for(&blocks, 8);

    assert!(blocks.get(a).is_control(ControlKind::IfCond));
    assert!(blocks.get(b).is_control(ControlKind::IfTrue));
    assert!(blocks.get(c).is_control(ControlKind::IfNext));
    assert!(!blocks.get(c).is_control(ControlKind::IfElse));

    match blocks.get(a).controls.iter().find(|m| m.kind() == ControlKind::IfCond).unwrap() {
        ControlMarker::IfCond { if_true, if_else, if_next, .. } => {
            assert_eq!(*if_true, b);
            assert_eq!(*if_else, None);
            assert_eq!(*if_next, Some(c));
        }
        _ => unreachable!(),
    }

    assert!(!blocks.get(a).is_loop());
    assert!(!blocks.get(b).is_loop());
    assert!(!blocks.get(c).is_loop());

    assert_idempotent(blocks);
}

#[test]
fn scenario_2_if_else_with_merge() {
    // A(0) cond-> B(4), C(8); B -> D(12); C -> D; D terminal.
    let a = branch(0, 4, 8);
    let b = flow(4, 12);
    let c = flow(8, 12);
    let d = leaf(12);

    let mut blocks = build(vec![a, b, c, d]);
    analyze_control_flow(&mut blocks).unwrap();

    let b = id_for(&blocks, 4);
    let c = id_for(&blocks, 8);
    let d = id_for(&blocks, 12);
    let a = id_for(&blocks, 0);

    match blocks.get(a).controls.iter().find(|m| m.kind() == ControlKind::IfCond).unwrap() {
        ControlMarker::IfCond { if_true, if_else, if_next, .. } => {
            assert_eq!(*if_true, b);
            assert_eq!(*if_else, Some(c));
            assert_eq!(*if_next, Some(d));
        }
        _ => unreachable!(),
    }
    assert!(blocks.get(b).is_control(ControlKind::IfTrue));
    assert!(blocks.get(c).is_control(ControlKind::IfElse));
    assert!(blocks.get(d).is_control(ControlKind::IfNext));

    assert_idempotent(blocks);
}

#[test]
fn scenario_3_while_loop() {
    // A(0) -> B(4); B cond-> C(8), E(20); C -> D(12); D -> B (back edge); E terminal.
    // D carries real content (not a bare JMP) so do-while's lone-jump
    // filter excludes it, leaving the while pass to claim the back edge.
    let a = flow(0, 4);
    let b = branch(4, 8, 20);
    let c = flow(8, 12);
    let mut d = Block::new(
        BlockId(12),
        12,
        vec![Instruction::new(Opcode::Add), Instruction::new(Opcode::Jmp)],
        sub(),
        ChildKind::Unconditional,
    );
    d.children.push(ChildEdge::flow(BlockId(4)));
    let e = leaf(20);

    let mut blocks = build(vec![a, b, c, d, e]);
    analyze_control_flow(&mut blocks).unwrap();

    let b = id_for(&blocks, 4);
    let c = id_for(&blocks, 8);
    let d = id_for(&blocks, 12);
    let e = id_for(&blocks, 20);

    assert!(blocks.get(b).is_control(ControlKind::WhileHead));
    assert!(blocks.get(b).is_control(ControlKind::IfCond));
    assert!(blocks.get(d).is_control(ControlKind::WhileTail));
    assert!(blocks.get(e).is_control(ControlKind::WhileNext));
    assert!(blocks.get(c).is_control(ControlKind::IfTrue));

    let (head, tail, next) = blocks.get(b).get_loop().unwrap();
    assert_eq!(head, b);
    assert_eq!(tail, d);
    assert_eq!(next, e);

    assert_idempotent(blocks);
}

#[test]
fn scenario_4_do_while_loop() {
    // A(0) -> B(4); B -> C(8); C cond-> T(10) [lone JMP back to B], D(12).
    let a = flow(0, 4);
    let b = flow(4, 8);
    let c = branch(8, 10, 12);
    let t = lone_jmp(10, 4);
    let d = leaf(12);

    let mut blocks = build(vec![a, b, c, t, d]);
    analyze_control_flow(&mut blocks).unwrap();

    let b = id_for(&blocks, 4);
    let t = id_for(&blocks, 10);
    let d = id_for(&blocks, 12);

    assert!(blocks.get(b).is_control(ControlKind::DoWhileHead));
    assert!(blocks.get(t).is_control(ControlKind::DoWhileTail));
    assert!(blocks.get(d).is_control(ControlKind::DoWhileNext));

    let (head, tail, next) = blocks.get(b).get_loop().unwrap();
    assert_eq!(head, b);
    assert_eq!(tail, t);
    assert_eq!(next, d);

    assert_idempotent(blocks);
}

#[test]
fn scenario_5_break_inside_while() {
    // As scenario 3, plus inside C an extra lone-JMP block X(9) whose
    // single child is E(20), the loop's next: a break. X sits between C(8)
    // and D(12) in address order so `getNextBlock(tail)` still resolves
    // the loop's next to E, not to X.
    let a = flow(0, 4);
    let b = branch(4, 8, 20);
    let c = branch(8, 9, 12);
    let x = lone_jmp(9, 20);
    let mut d = Block::new(
        BlockId(12),
        12,
        vec![Instruction::new(Opcode::Add), Instruction::new(Opcode::Jmp)],
        sub(),
        ChildKind::Unconditional,
    );
    d.children.push(ChildEdge::flow(BlockId(4)));
    let e = leaf(20);

    let mut blocks = build(vec![a, b, c, x, d, e]);
    analyze_control_flow(&mut blocks).unwrap();

    let b = id_for(&blocks, 4);
    let d = id_for(&blocks, 12);
    let e = id_for(&blocks, 20);
    let x = id_for(&blocks, 9);

    assert!(blocks.get(x).is_control(ControlKind::Break));
    match blocks.get(x).controls.iter().find(|m| m.kind() == ControlKind::Break).unwrap() {
        ControlMarker::Break { head, tail, next } => {
            assert_eq!(*head, b);
            assert_eq!(*tail, d);
            assert_eq!(*next, e);
        }
        _ => unreachable!(),
    }

    assert_idempotent(blocks);
}

#[test]
fn sequential_if_sharing_merge_and_cond_is_rejected() {
    // A(0) cond-> B(4), C(8); B,C -> D(12); D is the first if's merge and
    // also the second if's condition. `if_detect` claims D as `IfNext`
    // while examining A and then must skip D's own turn in the same pass
    // (`has_main_control`), so D's conditional children never get an
    // `IfCond` marker of their own: an unclaimed conditional.
    let a = branch(0, 4, 8);
    let b = flow(4, 12);
    let c = flow(8, 12);
    let d = branch(12, 16, 20);
    let e = flow(16, 24);
    let f = flow(20, 24);
    let g = leaf(24);

    let mut blocks = build(vec![a, b, c, d, e, f, g]);
    let err = analyze_control_flow(&mut blocks).unwrap_err();

    let d_addr = id_for(&blocks, 12);
    assert_eq!(err, ControlFlowError::UnclaimedConditional(blocks.get(d_addr).address));
}

#[test]
fn scenario_6_shared_return_trampoline() {
    // P1(0), P2(4), P3(8) each unconditionally JMP to R(12); R is a
    // singleton RETN and is not the subroutine entry.
    let sub_entry = SubRoutine { entry_address: 0xdead_beef };
    let mk = |addr: u32| {
        let mut b = Block::new(BlockId(addr), addr, vec![Instruction::new(Opcode::Jmp)], sub_entry, ChildKind::Unconditional);
        b.children.push(ChildEdge::flow(BlockId(12)));
        b
    };
    let p1 = mk(0);
    let p2 = mk(4);
    let p3 = mk(8);
    let r = Block::new(BlockId(12), 12, vec![Instruction::new(Opcode::Retn)], sub_entry, ChildKind::Unconditional);

    let mut blocks = build(vec![p1, p2, p3, r]);
    analyze_control_flow(&mut blocks).unwrap();

    let p1 = id_for(&blocks, 0);
    let p2 = id_for(&blocks, 4);
    let p3 = id_for(&blocks, 8);
    let r = id_for(&blocks, 12);

    assert!(blocks.get(p1).is_control(ControlKind::Return));
    assert!(blocks.get(p2).is_control(ControlKind::Return));
    assert!(blocks.get(p3).is_control(ControlKind::Return));
    assert!(!blocks.get(r).is_control(ControlKind::Return));

    assert_idempotent(blocks);
}
