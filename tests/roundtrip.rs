use pretty_assertions::assert_eq;

use vmlang_rs::disasm::fmt_decoded;
use vmlang_rs::{assemble, Decoder, InstructionSet, RegisterSet, TableDecoder};

#[test]
fn countdown_decodes_to_its_source() {
    let isa = InstructionSet::from_json(include_str!("../instruction_set.json")).unwrap();
    let program = assemble(include_str!("../demos/countdown.s"), &isa).unwrap();
    assert_eq!(program.size(), 40);
    assert_eq!(program.symbols.lookup("loop"), Ok(18));
    assert_eq!(program.symbols.lookup("done"), Ok(36));
    assert_eq!(program.directives, vec![(2, ".text".to_string())]);

    let regs = RegisterSet::default();
    let listing: Vec<(u32, String)> = TableDecoder::new(&isa)
        .decode_all(&program.bytes(), 0)
        .unwrap()
        .into_iter()
        .map(|(addr, d)| (addr, fmt_decoded(&d, &regs)))
        .collect();
    let expected: Vec<(u32, String)> = [
        (0, "li $g0, 10"),
        (7, "li $v0, 0"),
        (14, "addi $g1, $zero, -1"),
        (18, "add $v0, $v0, $g0"),
        (21, "add $g0, $g0, $g1"),
        (24, "bne $g0, $zero, -10"),
        (28, "call +1"),
        (35, "halt"),
        (36, "sll $v0, $v0, 1"),
        (39, "ret"),
    ]
    .into_iter()
    .map(|(a, s)| (a, s.to_string()))
    .collect();
    assert_eq!(listing, expected);
}

#[test]
fn every_instruction_decodes_at_its_own_address() {
    let isa = InstructionSet::from_json(include_str!("../instruction_set.json")).unwrap();
    let program = assemble(include_str!("../demos/countdown.s"), &isa).unwrap();
    let dec = TableDecoder::new(&isa);
    let bytes = program.bytes();
    for instr in &program.instructions {
        let d = dec.decode(&bytes[instr.address as usize..]).unwrap();
        assert_eq!(u32::from(d.len), u32::from(instr.len));
    }
}
