// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! ALU instructions
//!
//! An ALU instruction slot co-issues a vector and a scalar operation. Both
//! share up to three source operands and may write a temporary register or an
//! export.

use crate::bits::Unpacker;

use super::swizzle::{Pattern, Swizzle};
use super::{Decompiler, Stage};

/// Raw ALU instruction
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    pub vector_dest: u32,
    pub vector_dest_rel: bool,
    pub abs_constants: bool,
    pub scalar_dest: u32,
    pub scalar_dest_rel: bool,
    /// Destinations are exports rather than temporaries
    pub export_data: bool,
    pub vector_write_mask: u32,
    pub scalar_write_mask: u32,
    pub vector_clamp: bool,
    pub scalar_clamp: bool,
    pub scalar_opc: u32,

    pub src3_swiz: u32,
    pub src2_swiz: u32,
    pub src1_swiz: u32,
    pub src3_neg: bool,
    pub src2_neg: bool,
    pub src1_neg: bool,
    pub pred_condition: bool,
    pub pred_select: bool,
    pub relative_addr: bool,
    pub const_1_rel_abs: bool,
    pub const_0_rel_abs: bool,

    pub src3_reg: u32,
    pub src2_reg: u32,
    pub src1_reg: u32,
    pub vector_opc: u32,
    /// Source 3 is a temporary (set) or a constant (clear)
    pub src3_sel: bool,
    pub src2_sel: bool,
    pub src1_sel: bool,
}

impl Instruction {
    /// Decode an instruction slot
    pub fn decode([w0, w1, w2]: [u32; 3]) -> Self {
        let mut a = Unpacker::new(w0);
        let mut b = Unpacker::new(w1);
        let mut c = Unpacker::new(w2);

        Self {
            vector_dest: a.take(6),
            vector_dest_rel: a.flag(),
            abs_constants: a.flag(),
            scalar_dest: a.take(6),
            scalar_dest_rel: a.flag(),
            export_data: a.flag(),
            vector_write_mask: a.take(4),
            scalar_write_mask: a.take(4),
            vector_clamp: a.flag(),
            scalar_clamp: a.flag(),
            scalar_opc: a.take(6),

            src3_swiz: b.take(8),
            src2_swiz: b.take(8),
            src1_swiz: b.take(8),
            src3_neg: b.flag(),
            src2_neg: b.flag(),
            src1_neg: b.flag(),
            pred_condition: b.flag(),
            pred_select: b.flag(),
            relative_addr: b.flag(),
            const_1_rel_abs: b.flag(),
            const_0_rel_abs: b.flag(),

            src3_reg: c.take(8),
            src2_reg: c.take(8),
            src1_reg: c.take(8),
            vector_opc: c.take(5),
            src3_sel: c.flag(),
            src2_sel: c.flag(),
            src1_sel: c.flag(),
        }
    }

    /// Retrieve the raw operands of a source
    fn source(&self, index: usize) -> Source {
        let (reg, sel, swiz, negate) = match index {
            0 => (self.src1_reg, self.src1_sel, self.src1_swiz, self.src1_neg),
            1 => (self.src2_reg, self.src2_sel, self.src2_swiz, self.src2_neg),
            _ => (self.src3_reg, self.src3_sel, self.src3_swiz, self.src3_neg),
        };
        // Constant slots are consumed by constant sources in order
        let slot = match index {
            0 => 0,
            1 => self.src1_sel as u8,
            _ => (self.src1_sel || self.src2_sel) as u8,
        };
        Source {
            reg,
            temporary: sel,
            swizzle: swiz,
            negate,
            slot,
        }
    }

    /// Retrieve the vector operation
    pub fn vector_op(&self) -> Operation {
        VECTOR_OPS
            .get(self.vector_opc as usize)
            .copied()
            .unwrap_or(UNKNOWN)
    }

    /// Retrieve the scalar operation
    pub fn scalar_op(&self) -> Operation {
        SCALAR_OPS
            .get(self.scalar_opc as usize)
            .copied()
            .unwrap_or(UNKNOWN)
    }

    /// Check whether the scalar operation is one of the `*_CONST_*` variants
    ///
    /// These take two operands: a constant from source 3 and a temporary whose
    /// index is aliased into the upper opcode and swizzle bits.
    pub fn is_const_op(&self) -> bool {
        (42..=47).contains(&self.scalar_opc)
    }
}

/// Name and operand count of an ALU operation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub arity: u8,
}

const fn op(name: &'static str, arity: u8) -> Operation {
    Operation { name, arity }
}

const UNKNOWN: Operation = op("UNKNOWN", 0);

/// Vector operations by opcode
pub const VECTOR_OPS: [Operation; 30] = [
    op("ADDv", 2),
    op("MULv", 2),
    op("MAXv", 2),
    op("MINv", 2),
    op("SETEv", 2),
    op("SETGTv", 2),
    op("SETGTEv", 2),
    op("SETNEv", 2),
    op("FRACv", 1),
    op("TRUNCv", 1),
    op("FLOORv", 1),
    op("MULADDv", 3),
    op("CNDEv", 3),
    op("CNDGTEv", 3),
    op("CNDGTv", 3),
    op("DOT4v", 2),
    op("DOT3v", 2),
    op("DOT2ADDv", 3),
    op("CUBEv", 2),
    op("MAX4v", 1),
    op("PRED_SETE_PUSHv", 2),
    op("PRED_SETNE_PUSHv", 2),
    op("PRED_SETGT_PUSHv", 2),
    op("PRED_SETGTE_PUSHv", 2),
    op("KILLEv", 2),
    op("KILLGTv", 2),
    op("KILLGTEv", 2),
    op("KILLNEv", 2),
    op("DSTv", 2),
    op("MOVAv", 1),
];

/// Scalar operations by opcode
pub const SCALAR_OPS: [Operation; 51] = [
    op("ADDs", 1),
    op("ADD_PREVs", 1),
    op("MULs", 1),
    op("MUL_PREVs", 1),
    op("MUL_PREV2s", 1),
    op("MAXs", 1),
    op("MINs", 1),
    op("SETEs", 1),
    op("SETGTs", 1),
    op("SETGTEs", 1),
    op("SETNEs", 1),
    op("FRACs", 1),
    op("TRUNCs", 1),
    op("FLOORs", 1),
    op("EXP_IEEE", 1),
    op("LOG_CLAMP", 1),
    op("LOG_IEEE", 1),
    op("RECIP_CLAMP", 1),
    op("RECIP_FF", 1),
    op("RECIP_IEEE", 1),
    op("RECIPSQ_CLAMP", 1),
    op("RECIPSQ_FF", 1),
    op("RECIPSQ_IEEE", 1),
    op("MOVAs", 1),
    op("MOVA_FLOORs", 1),
    op("SUBs", 1),
    op("SUB_PREVs", 1),
    op("PRED_SETEs", 1),
    op("PRED_SETNEs", 1),
    op("PRED_SETGTs", 1),
    op("PRED_SETGTEs", 1),
    op("PRED_SET_INVs", 1),
    op("PRED_SET_POPs", 1),
    op("PRED_SET_CLRs", 1),
    op("PRED_SET_RESTOREs", 1),
    op("KILLEs", 1),
    op("KILLGTs", 1),
    op("KILLGTEs", 1),
    op("KILLNEs", 1),
    op("KILLONEs", 1),
    op("SQRT_IEEE", 1),
    UNKNOWN,
    op("MUL_CONST_0", 2),
    op("MUL_CONST_1", 2),
    op("ADD_CONST_0", 2),
    op("ADD_CONST_1", 2),
    op("SUB_CONST_0", 2),
    op("SUB_CONST_1", 2),
    op("SIN", 1),
    op("COS", 1),
    op("RETAIN_PREV", 1),
];

/// Scalar opcodes which set the predicate register
const PRED_SET_OPS: [u32; 4] = [27, 28, 29, 30];

/// Raw operands of a single source
#[derive(Copy, Clone, Debug)]
struct Source {
    reg: u32,
    temporary: bool,
    swizzle: u32,
    negate: bool,
    /// Constant slot used if the source is a relatively addressed constant
    slot: u8,
}

impl Decompiler<'_> {
    /// Emit an ALU instruction slot
    pub(super) fn alu(&mut self, alu: &Instruction, condition: &str) {
        let vector_op = alu.vector_op();
        let scalar_op = alu.scalar_op();

        let mut pred = None;
        let mut vector = None;
        let mut scalar = None;

        let export_rel = alu.export_data && alu.scalar_dest_rel;
        if vector_op.arity != 0 && (alu.vector_write_mask != 0 || export_rel) {
            let args: Vec<_> = (0..usize::from(vector_op.arity))
                .map(|i| self.source(alu, alu.source(i)))
                .collect();
            let code = wrap_clamp(call(vector_op.name, &args), alu.vector_clamp);
            vector = Some(self.vector_result(alu, code));
        }

        if scalar_op.arity != 0 && (alu.scalar_write_mask != 0 || alu.vector_write_mask == 0) {
            let args = match scalar_op.arity {
                1 => vec![self.source(alu, alu.source(2))],
                2 if alu.is_const_op() => self.const_op_args(alu),
                2 => vec![
                    self.source(alu, alu.source(0)),
                    self.source(alu, alu.source(1)),
                ],
                _ => Vec::new(),
            };
            let code = call(scalar_op.name, &args);
            if PRED_SET_OPS.contains(&alu.scalar_opc) {
                pred = Some(format!("SetPredicate({code})"));
            }
            let code = wrap_clamp(code, alu.scalar_clamp);
            scalar = Some(self.scalar_result(alu, code));
        }

        for part in [pred, vector, scalar].into_iter().flatten() {
            self.lines.push(format!("{condition}{part};"));
        }
    }

    /// Format a source operand
    ///
    /// Directly addressed constants are recorded in the constant set.
    fn source(&mut self, alu: &Instruction, src: Source) -> String {
        let mut text = if src.temporary {
            let reg = format!("R{}", src.reg & 0x7F);
            if src.reg & 0x80 != 0 {
                format!("ABS({reg})")
            } else {
                reg
            }
        } else {
            let relative = (src.slot == 0 && alu.const_0_rel_abs)
                || (src.slot == 1 && alu.const_1_rel_abs);
            let constant = if relative {
                if alu.relative_addr {
                    format!("Const[A0 + {}]", src.reg)
                } else {
                    "Const[A0]".to_string()
                }
            } else {
                self.constants.insert(src.reg);
                format!("Const[{}]", src.reg)
            };
            if alu.abs_constants {
                format!("ABS({constant})")
            } else {
                constant
            }
        };

        if src.negate {
            text.insert(0, '-');
        }
        if src.swizzle != 0 {
            text = format!("{text}.{}", Pattern::source(src.swizzle));
        }
        text
    }

    fn const_op_args(&mut self, alu: &Instruction) -> Vec<String> {
        let swiz = alu.src3_swiz & !0x3C;
        let swiz_a = Swizzle::component((swiz >> 6).wrapping_sub(1));
        let swiz_b = Swizzle::component(swiz & 0x3);

        let constant = Source {
            reg: alu.src3_reg,
            temporary: false,
            swizzle: 0,
            negate: alu.src3_neg,
            slot: 0,
        };
        let temporary = Source {
            reg: (alu.scalar_opc & 0x1) | (alu.src3_swiz & 0x3C) | ((alu.src3_sel as u32) << 1),
            temporary: true,
            swizzle: 0,
            negate: false,
            slot: alu.source(2).slot,
        };

        vec![
            format!("{}.{}", self.source(alu, constant), Pattern::splat(swiz_a)),
            format!("{}.{}", self.source(alu, temporary), Pattern::splat(swiz_b)),
        ]
    }

    fn vector_result(&self, alu: &Instruction, code: String) -> String {
        let dest = self.write_reg(alu.export_data, alu.vector_dest);
        let pattern = if alu.export_data {
            Pattern([0u32, 1, 2, 3].map(|i| {
                let bit = 1 << i;
                if alu.vector_write_mask & bit != 0 {
                    if alu.scalar_write_mask & bit != 0 {
                        Swizzle::One
                    } else {
                        Swizzle::component(i)
                    }
                } else if alu.scalar_dest_rel {
                    Swizzle::Zero
                } else {
                    Swizzle::NotUsed
                }
            }))
        } else {
            Pattern::mask(alu.vector_write_mask)
        };
        format!("{dest}.{pattern} = {code}")
    }

    fn scalar_result(&self, alu: &Instruction, code: String) -> String {
        let (dest, mask) = if alu.export_data {
            (
                self.write_reg(true, alu.vector_dest),
                alu.scalar_write_mask & !alu.vector_write_mask,
            )
        } else {
            (format!("R{}", alu.scalar_dest), alu.scalar_write_mask)
        };
        format!("{dest}.{} = {code}", Pattern::mask(mask))
    }

    /// Name a destination register
    fn write_reg(&self, exported: bool, index: u32) -> String {
        if !exported {
            return format!("R{index}");
        }
        match (self.stage, index) {
            // Only the first render target has a dedicated name
            (Stage::Pixel, 0) => "COLOR0".into(),
            (Stage::Vertex, 62) => "POSITION".into(),
            (Stage::Vertex, 63) => "POINTSIZE".into(),
            (Stage::Vertex, 0..=7) => format!("INTERP{index}"),
            _ => format!("EXPORT{index}"),
        }
    }
}

fn call(name: &str, args: &[String]) -> String {
    format!("{name}({})", args.join(","))
}

fn wrap_clamp(code: String, clamp: bool) -> String {
    if clamp {
        format!("SATURATE({code})")
    } else {
        code
    }
}
