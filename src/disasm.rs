use crate::decoder::Decoded;
use crate::instructions::{PatchKind, Role};
use crate::operand::{RegisterSet, ResolvedOperand};

/// Source-like text for a decoded instruction, e.g. `add $g0, $g1, $g2`.
pub fn fmt_decoded(d: &Decoded, regs: &RegisterSet) -> String {
    let ops: Vec<String> = d
        .operands
        .iter()
        .zip(&d.spec.roles)
        .map(|(op, role)| operand(op, *role, d.spec.patch, regs))
        .collect();
    if ops.is_empty() {
        d.spec.mnemonic.clone()
    } else {
        format!("{} {}", d.spec.mnemonic, ops.join(", "))
    }
}

fn operand(op: &ResolvedOperand, role: Role, patch: PatchKind, regs: &RegisterSet) -> String {
    match (op, role) {
        (ResolvedOperand::Register(r), _) => regs.display(*r),
        (ResolvedOperand::Immediate(v), Role::Imm) if patch == PatchKind::Relative => format!("{v:+}"),
        (ResolvedOperand::Immediate(v), _) => v.to_string(),
        (ResolvedOperand::Symbol(s), _) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::{Format, ImmVariant, InstructionSpec};

    #[test]
    fn formats_registers_and_offsets() {
        let regs = RegisterSet::default();
        let add = Decoded {
            spec: InstructionSpec::new("add", Format::Reg3, 1, &[Role::Rd, Role::Rs, Role::Rt]),
            len: 3,
            operands: vec![
                ResolvedOperand::Register(8),
                ResolvedOperand::Register(9),
                ResolvedOperand::Register(10),
            ],
            encoding: None,
        };
        assert_eq!(fmt_decoded(&add, &regs), "add $g0, $g1, $g2");

        let beq = Decoded {
            spec: InstructionSpec::new("beq", Format::RegImm, 2, &[Role::Rd, Role::Rs, Role::Imm])
                .with_variant(ImmVariant::Short)
                .with_patch(PatchKind::Relative),
            len: 4,
            operands: vec![
                ResolvedOperand::Register(0),
                ResolvedOperand::Register(1),
                ResolvedOperand::Immediate(-8),
            ],
            encoding: None,
        };
        assert_eq!(fmt_decoded(&beq, &regs), "beq $zero, $at, -8");

        let halt = Decoded {
            spec: InstructionSpec::new("halt", Format::Fixed1, 0x7F, &[]),
            len: 1,
            operands: vec![],
            encoding: None,
        };
        assert_eq!(fmt_decoded(&halt, &regs), "halt");
    }
}
