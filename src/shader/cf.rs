// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Control flow instructions
//!
//! A control flow instruction is 48 bits wide. It is decoded from a 32 bit
//! word `a` and the lower 16 bits of a second word `b`. The opcode always
//! resides in the upper four bits of `b`.

use core::fmt;

use crate::bits::{Unpacker, field};

/// Control flow opcode
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    Exec = 1,
    ExecEnd = 2,
    CondExec = 3,
    CondExecEnd = 4,
    CondPredExec = 5,
    CondPredExecEnd = 6,
    LoopStart = 7,
    LoopEnd = 8,
    CondCall = 9,
    Return = 10,
    CondJmp = 11,
    Alloc = 12,
    CondExecPredClean = 13,
    CondExecPredCleanEnd = 14,
    MarkVsFetchDone = 15,
}

impl Opcode {
    /// Extract the opcode from the upper word of an instruction
    pub fn from_upper(b: u32) -> Self {
        match field(b, 12, 4) {
            0 => Self::Nop,
            1 => Self::Exec,
            2 => Self::ExecEnd,
            3 => Self::CondExec,
            4 => Self::CondExecEnd,
            5 => Self::CondPredExec,
            6 => Self::CondPredExecEnd,
            7 => Self::LoopStart,
            8 => Self::LoopEnd,
            9 => Self::CondCall,
            10 => Self::Return,
            11 => Self::CondJmp,
            12 => Self::Alloc,
            13 => Self::CondExecPredClean,
            14 => Self::CondExecPredCleanEnd,
            _ => Self::MarkVsFetchDone,
        }
    }

    /// Check whether this opcode ends the program
    pub fn is_end(self) -> bool {
        matches!(
            self,
            Self::ExecEnd | Self::CondExecEnd | Self::CondPredExecEnd | Self::CondExecPredCleanEnd
        )
    }

    /// Check whether this is one of the conditional EXEC variants
    pub fn is_cond_exec(self) -> bool {
        matches!(
            self,
            Self::CondExec
                | Self::CondExecEnd
                | Self::CondPredExec
                | Self::CondPredExecEnd
                | Self::CondExecPredClean
                | Self::CondExecPredCleanEnd
        )
    }

    /// Check whether this EXEC variant loads the predicate from a boolean
    pub fn is_pred_clean(self) -> bool {
        matches!(self, Self::CondExecPredClean | Self::CondExecPredCleanEnd)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nop => "NOP",
            Self::Exec => "EXEC",
            Self::ExecEnd => "EXEC_END",
            Self::CondExec => "COND_EXEC",
            Self::CondExecEnd => "COND_EXEC_END",
            Self::CondPredExec => "COND_PRED_EXEC",
            Self::CondPredExecEnd => "COND_PRED_EXEC_END",
            Self::LoopStart => "LOOP_START",
            Self::LoopEnd => "LOOP_END",
            Self::CondCall => "COND_CALL",
            Self::Return => "RETURN",
            Self::CondJmp => "COND_JMP",
            Self::Alloc => "ALLOC",
            Self::CondExecPredClean => "COND_EXEC_PRED_CLEAN",
            Self::CondExecPredCleanEnd => "COND_EXEC_PRED_CLEAN_END",
            Self::MarkVsFetchDone => "MARK_VS_FETCH_DONE",
        };
        f.write_str(name)
    }
}

/// A decoded control flow instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    Exec(Exec),
    Alloc(Alloc),
    Loop(Loop),
    /// Calls, jumps and returns
    JmpCall(JmpCall),
    MarkVsFetchDone,
}

impl Instruction {
    /// Decode an instruction from its lower word and its upper 16 bits
    pub fn decode(a: u32, b: u32) -> Self {
        let opcode = Opcode::from_upper(b);
        match opcode {
            Opcode::Nop => Self::Nop,
            Opcode::Exec
            | Opcode::ExecEnd
            | Opcode::CondExec
            | Opcode::CondExecEnd
            | Opcode::CondPredExec
            | Opcode::CondPredExecEnd
            | Opcode::CondExecPredClean
            | Opcode::CondExecPredCleanEnd => Self::Exec(Exec::decode(opcode, a, b)),
            Opcode::Alloc => Self::Alloc(Alloc::decode(a, b)),
            Opcode::LoopStart | Opcode::LoopEnd => Self::Loop(Loop::decode(opcode, a, b)),
            Opcode::CondCall | Opcode::Return | Opcode::CondJmp => {
                Self::JmpCall(JmpCall::decode(opcode, a, b))
            }
            Opcode::MarkVsFetchDone => Self::MarkVsFetchDone,
        }
    }

    /// Retrieve the opcode
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Nop => Opcode::Nop,
            Self::Exec(e) => e.opcode,
            Self::Alloc(_) => Opcode::Alloc,
            Self::Loop(l) => l.opcode,
            Self::JmpCall(j) => j.opcode,
            Self::MarkVsFetchDone => Opcode::MarkVsFetchDone,
        }
    }

    /// Check whether this instruction ends the program
    pub fn is_end(&self) -> bool {
        self.opcode().is_end()
    }
}

/// Operands of the EXEC family
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Exec {
    pub opcode: Opcode,
    /// First instruction slot
    pub address: u32,
    /// Number of instruction slots
    pub count: u32,
    pub is_yield: bool,
    /// Two bits per slot: fetch (low) and sync (high)
    pub serialize: u32,
    pub vc: u32,
    pub bool_addr: u32,
    pub pred_condition: bool,
    pub address_mode: bool,
}

impl Exec {
    fn decode(opcode: Opcode, a: u32, b: u32) -> Self {
        let mut a = Unpacker::new(a);
        let mut b = Unpacker::new(b);
        let address = a.take(12);
        let count = a.take(3);
        let is_yield = a.flag();
        let serialize = a.take(12);
        let vc_hi = a.take(4);
        let vc_lo = b.take(2);
        Self {
            opcode,
            address,
            count,
            is_yield,
            serialize,
            vc: (vc_hi << 2) | vc_lo,
            bool_addr: b.take(8),
            pred_condition: b.flag(),
            address_mode: b.flag(),
        }
    }

    /// Check whether the instructions are executed conditionally
    pub fn is_conditional(&self) -> bool {
        self.opcode.is_cond_exec()
    }

    /// Iterate over the instruction slots executed
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..self.count).map(|i| {
            let sequence = self.serialize >> (2 * i);
            Slot {
                address: self.address + i,
                kind: if sequence & 0x1 != 0 {
                    SlotKind::Fetch
                } else {
                    SlotKind::Alu
                },
                sync: sequence & 0x2 != 0,
            }
        })
    }
}

/// An instruction slot referenced by an [`Exec`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    /// Slot index; the instruction starts at word `3 * address`
    pub address: u32,
    pub kind: SlotKind,
    pub sync: bool,
}

/// Kind of instruction held by a [`Slot`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotKind {
    Fetch,
    Alu,
}

/// Operands of ALLOC
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Alloc {
    pub size: u32,
    pub no_serial: bool,
    /// 1: position, 2: parameters, 3: memory export
    pub buffer_select: u32,
    pub alloc_mode: bool,
}

impl Alloc {
    fn decode(a: u32, b: u32) -> Self {
        let mut b = Unpacker::new(b);
        b.skip(8);
        Self {
            size: field(a, 0, 3),
            no_serial: b.flag(),
            buffer_select: b.take(2),
            alloc_mode: b.flag(),
        }
    }
}

/// Operands of LOOP_START and LOOP_END
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Loop {
    pub opcode: Opcode,
    pub address: u32,
    pub repeat: bool,
    pub loop_id: u32,
    pub pred_break: bool,
    pub condition: bool,
    pub address_mode: bool,
}

impl Loop {
    fn decode(opcode: Opcode, a: u32, b: u32) -> Self {
        let mut a = Unpacker::new(a);
        let mut b = Unpacker::new(b);
        let address = a.take(13);
        let repeat = a.flag();
        let loop_id = a.skip(2).take(5);
        let pred_break = a.flag();
        b.skip(10);
        Self {
            opcode,
            address,
            repeat,
            loop_id,
            pred_break,
            condition: b.flag(),
            address_mode: b.flag(),
        }
    }
}

/// Operands of COND_CALL, RETURN and COND_JMP
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JmpCall {
    pub opcode: Opcode,
    pub address: u32,
    pub force_call: bool,
    pub predicated_jmp: bool,
    pub direction: bool,
    pub bool_addr: u32,
    pub condition: bool,
    pub address_mode: bool,
}

impl JmpCall {
    fn decode(opcode: Opcode, a: u32, b: u32) -> Self {
        let mut a = Unpacker::new(a);
        let mut b = Unpacker::new(b);
        let address = a.take(13);
        let force_call = a.flag();
        let predicated_jmp = a.flag();
        let direction = b.skip(1).flag();
        Self {
            opcode,
            address,
            force_call,
            predicated_jmp,
            direction,
            bool_addr: b.take(8),
            condition: b.flag(),
            address_mode: b.flag(),
        }
    }
}
