//! JSON loader for a function's block graph.
//!
//! This is the decoder/block-partitioner stand-in: a real tool would build
//! `nwscript_core::block::Blocks` from decoded bytecode. The core crate
//! deliberately has no file format of its own (see its crate docs), so the
//! JSON shape here is invented purely for this CLI.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use nwscript_core::block::{Block, BlockId, Blocks, ChildEdge, ChildKind, Instruction, Opcode, SubRoutine};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GraphFile {
    pub subroutine_entry: u32,
    pub blocks: Vec<BlockFile>,
}

#[derive(Debug, Deserialize)]
pub struct BlockFile {
    pub address: u32,
    pub opcodes: Vec<String>,
    #[serde(default)]
    pub children: Vec<ChildFile>,
    pub conditional: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChildFile {
    pub address: u32,
    #[serde(default)]
    pub is_call: bool,
}

fn parse_opcode(name: &str) -> Result<Opcode> {
    Ok(match name.to_ascii_uppercase().as_str() {
        "CPDOWNSP" => Opcode::Cpdownsp,
        "RSADD" => Opcode::Rsadd,
        "CPTOPSP" => Opcode::Cptopsp,
        "CONST" => Opcode::Const,
        "ACTION" => Opcode::Action,
        "LOGAND" => Opcode::Logand,
        "LOGOR" => Opcode::Logor,
        "INCOR" => Opcode::Incor,
        "EXCOR" => Opcode::Excor,
        "BOOLAND" => Opcode::Booland,
        "EQUAL" => Opcode::Equal,
        "NEQUAL" => Opcode::Nequal,
        "GEQ" => Opcode::Geq,
        "GT" => Opcode::Gt,
        "LT" => Opcode::Lt,
        "LEQ" => Opcode::Leq,
        "SHLEFT" => Opcode::Shleft,
        "SHRIGHT" => Opcode::Shright,
        "MOD" => Opcode::Mod,
        "ADD" => Opcode::Add,
        "SUB" => Opcode::Sub,
        "MUL" => Opcode::Mul,
        "DIV" => Opcode::Div,
        "NEG" => Opcode::Neg,
        "COMP" => Opcode::Comp,
        "MOVSP" => Opcode::Movsp,
        "JMP" => Opcode::Jmp,
        "JSR" => Opcode::Jsr,
        "JZ" => Opcode::Jz,
        "RETN" => Opcode::Retn,
        "DESTRUCT" => Opcode::Destruct,
        "NOT" => Opcode::Not,
        "DECSP" => Opcode::Decsp,
        "INCSP" => Opcode::Incsp,
        "JNZ" => Opcode::Jnz,
        "CPDOWNBP" => Opcode::Cpdownbp,
        "CPTOPBP" => Opcode::Cptopbp,
        "DECBP" => Opcode::Decbp,
        "INCBP" => Opcode::Incbp,
        "SAVEBP" => Opcode::Savebp,
        "RESTOREBP" => Opcode::Restorebp,
        "NOP" => Opcode::Nop,
        other => bail!("unknown opcode mnemonic: {other}"),
    })
}

/// Build a [`Blocks`] arena from a parsed [`GraphFile`], in ascending
/// address order as the core requires.
pub fn load(file: GraphFile) -> Result<Blocks> {
    let sub_routine = SubRoutine {
        entry_address: file.subroutine_entry,
    };

    let mut sorted = file.blocks;
    sorted.sort_by_key(|b| b.address);

    let address_to_id: HashMap<u32, BlockId> = sorted
        .iter()
        .enumerate()
        .map(|(i, b)| (b.address, BlockId(i as u32)))
        .collect();

    let mut blocks = Vec::with_capacity(sorted.len());
    for (i, raw) in sorted.iter().enumerate() {
        let instructions = raw
            .opcodes
            .iter()
            .map(|name| parse_opcode(name).map(Instruction::new))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("block {:08X}", raw.address))?;

        let child_kind = if raw.conditional {
            ChildKind::Conditional
        } else {
            ChildKind::Unconditional
        };

        let mut block = Block::new(BlockId(i as u32), raw.address, instructions, sub_routine, child_kind);

        for child in &raw.children {
            let target = *address_to_id
                .get(&child.address)
                .with_context(|| format!("block {:08X} has unknown child {:08X}", raw.address, child.address))?;
            block.children.push(if child.is_call {
                ChildEdge::call(target)
            } else {
                ChildEdge::flow(target)
            });
        }

        blocks.push(block);
    }

    // Second pass: populate parents from the now-complete child edges.
    let mut parents: Vec<Vec<BlockId>> = vec![Vec::new(); blocks.len()];
    for block in &blocks {
        for edge in &block.children {
            parents[edge.target.0 as usize].push(block.id);
        }
    }
    for (block, parent_list) in blocks.iter_mut().zip(parents.into_iter()) {
        block.parents = parent_list.into_iter().collect();
    }

    Ok(Blocks::new(blocks))
}
