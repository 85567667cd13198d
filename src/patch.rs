use tracing::trace;

use crate::encoder::EncodedInstruction;
use crate::error::{AsmError, Range};
use crate::format::mask;
use crate::instructions::PatchKind;
use crate::symbols::SymbolTable;

/// Whether `value` is representable in `width` bits.
pub fn fits(value: i64, width: u32, range: Range) -> bool {
    if width == 0 {
        return value == 0;
    }
    if width >= 64 {
        return range == Range::Signed || value >= 0;
    }
    match range {
        Range::Unsigned => value >= 0 && (value as u64) <= mask(width),
        Range::Signed => {
            let half = 1i64 << (width - 1);
            (-half..half).contains(&value)
        }
    }
}

/// Writes the resolved label value into a pending instruction.
///
/// Unlike literal immediates, patched values are never truncated: a value
/// that does not fit the field is an error and `instr` is left untouched.
pub fn patch(instr: &mut EncodedInstruction, symbols: &SymbolTable) -> Result<(), AsmError> {
    let Some(fixup) = &instr.fixup else {
        return Ok(());
    };
    let target = i64::from(symbols.lookup(&fixup.symbol)?);
    let value = match fixup.kind {
        PatchKind::Absolute => target,
        PatchKind::Relative => target - instr.end() as i64,
    };
    if !fits(value, fixup.width, fixup.range) {
        return Err(AsmError::ImmediateOutOfRange {
            value,
            width: fixup.width,
            range: fixup.range,
        });
    }
    trace!(
        symbol = %fixup.symbol,
        address = instr.address,
        value,
        "patched"
    );
    instr.bits |= (value as u64 & mask(fixup.width)) << fixup.shift;
    instr.fixup = None;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Fixup;

    fn pending(address: u32, len: u8, width: u32, kind: PatchKind) -> EncodedInstruction {
        EncodedInstruction {
            line: 1,
            address,
            len,
            bits: 0xC000,
            fixup: Some(Fixup {
                symbol: "loop".into(),
                shift: 0,
                width,
                kind,
                range: match kind {
                    PatchKind::Absolute => Range::Unsigned,
                    PatchKind::Relative => Range::Signed,
                },
            }),
        }
    }

    #[test]
    fn range_checks() {
        assert!(fits(127, 8, Range::Signed));
        assert!(fits(-128, 8, Range::Signed));
        assert!(!fits(128, 8, Range::Signed));
        assert!(!fits(-129, 8, Range::Signed));
        assert!(fits(255, 8, Range::Unsigned));
        assert!(!fits(256, 8, Range::Unsigned));
        assert!(!fits(-1, 8, Range::Unsigned));
        assert!(fits(u32::MAX as i64, 32, Range::Unsigned));
    }

    #[test]
    fn backward_relative_offset() {
        let mut symbols = SymbolTable::new();
        symbols.define("loop", 4).unwrap();
        let mut instr = pending(10, 2, 8, PatchKind::Relative);
        patch(&mut instr, &symbols).unwrap();
        // 4 - (10 + 2)
        assert_eq!(instr.bits, 0xC000 | 0xF8);
        assert!(!instr.is_pending());
    }

    #[test]
    fn not_pending_is_a_no_op() {
        let mut instr = pending(0, 2, 8, PatchKind::Absolute);
        instr.fixup = None;
        let before = instr.clone();
        patch(&mut instr, &SymbolTable::new()).unwrap();
        assert_eq!(instr, before);
    }

    #[test]
    fn undefined_label_keeps_instruction_pending() {
        let mut instr = pending(0, 2, 8, PatchKind::Absolute);
        assert_eq!(
            patch(&mut instr, &SymbolTable::new()),
            Err(AsmError::UndefinedLabel("loop".into()))
        );
        assert!(instr.is_pending());
    }

    #[test]
    fn overflow_is_an_error_not_a_wrap() {
        let mut symbols = SymbolTable::new();
        symbols.define("loop", 300).unwrap();
        let mut instr = pending(0, 2, 8, PatchKind::Relative);
        assert_eq!(
            patch(&mut instr, &symbols),
            Err(AsmError::ImmediateOutOfRange { value: 298, width: 8, range: Range::Signed })
        );
        let mut instr = pending(0, 2, 8, PatchKind::Absolute);
        assert_eq!(
            patch(&mut instr, &symbols),
            Err(AsmError::ImmediateOutOfRange { value: 300, width: 8, range: Range::Unsigned })
        );
        assert_eq!(instr.bits, 0xC000);
    }
}
