use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Serialize;
use vmlang_rs::disasm::fmt_decoded;
use vmlang_rs::{DecodeError, InstructionSet, RegisterSet, SymbolTable, TableDecoder};

use crate::model::Image;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub addr: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub bytes: Vec<u8>,
    pub text: String,
}

pub fn disassemble(
    img: &Image,
    isa: &InstructionSet,
    regs: &RegisterSet,
    symbols: Option<&SymbolTable>,
) -> Result<Vec<Row>, DecodeError> {
    let labels: HashMap<u32, &str> = symbols
        .map(|t| t.iter().map(|(name, addr)| (addr, name)).collect())
        .unwrap_or_default();
    let decoded = TableDecoder::new(isa).decode_all(&img.bytes, img.base)?;
    Ok(decoded
        .into_iter()
        .map(|(addr, d)| {
            let off = addr.wrapping_sub(img.base) as usize;
            Row {
                addr,
                label: labels.get(&addr).map(|l| l.to_string()),
                bytes: img.bytes[off..off + d.len as usize].to_vec(),
                text: fmt_decoded(&d, regs),
            }
        })
        .collect())
}

pub fn render_text(rows: &[Row], show_bytes: bool) -> String {
    let mut buf = String::new();
    for row in rows {
        if let Some(label) = &row.label {
            let _ = writeln!(buf, "{label}:");
        }
        let _ = write!(buf, "{:#010x}: ", row.addr);
        if show_bytes {
            let hex: Vec<String> = row.bytes.iter().map(|b| format!("{b:02x}")).collect();
            let _ = write!(buf, "{:<20}  ", hex.join(" "));
        }
        let _ = writeln!(buf, "{}", row.text);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmlang_rs::assemble;

    const TABLE: &str = r#"{
        "add":  { "size": 3, "opcode": "0001", "args": ["RD", "RS", "RT"] },
        "jmp":  { "size": 4, "opcode": "110", "args": ["IMM"], "patch": "rel" },
        "halt": { "size": 1, "opcode": "1111111" }
    }"#;

    #[test]
    fn disassembles_what_was_assembled() {
        let isa = InstructionSet::from_json(TABLE).unwrap();
        let src = "top:\n  add $g0, $g1, $g2\n  jmp top\n  halt\n";
        let program = assemble(src, &isa).unwrap();
        let img = Image { base: 0, bytes: program.bytes() };
        let rows = disassemble(&img, &isa, &RegisterSet::default(), Some(&program.symbols)).unwrap();

        let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["add $g0, $g1, $g2", "jmp -7", "halt"]);
        assert_eq!(rows[0].label.as_deref(), Some("top"));
        assert_eq!(rows[1].addr, 3);

        let text = render_text(&rows, true);
        assert!(text.starts_with("top:\n0x00000000: e1 89 a0"));
    }

    #[test]
    fn colliding_opcodes_disassemble_as_the_first_mnemonic() {
        let isa = InstructionSet::from_json(
            r#"{
                "mv":   { "size": 2, "opcode": "00001", "args": ["RD", "RS"] },
                "copy": { "size": 2, "opcode": "00001", "args": ["RD", "RS"] }
            }"#,
        )
        .unwrap();
        let img = Image { base: 0x40, bytes: vec![0xC1, 0x86] };
        let rows = disassemble(&img, &isa, &RegisterSet::default(), None).unwrap();
        assert_eq!(
            rows,
            vec![Row {
                addr: 0x40,
                label: None,
                bytes: vec![0xC1, 0x86],
                text: "copy $g0, $v0".into(),
            }]
        );
    }
}
