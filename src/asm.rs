/// # asm
///
/// the other direction from `opcode::disassemble`: text in, ROM bytes out.
/// every line is
///
/// ```text
/// [label:] [MNEMONIC [operand, ...]] [; comment]
/// [label:] db VALUE[, VALUE ...]
/// [label:] dw VALUE[, VALUE ...]
/// ```
///
/// instructions are matched against the templates in the opcode table, so a
/// `disassemble_rom` listing assembles back to the bytes it came from.
/// numbers are decimal, or hex with a `$`, `x`, `0x` or `#` prefix; any
/// address operand may name a label instead. a leading `204:` address, as in
/// an address listing, is skipped. the program is placed at 0x200.
use crate::config::parse_int;
use crate::error::Chip8Error;
use crate::memory::{MAX_PROGRAM_BYTES, PROGRAM_ADDR};
use crate::opcode::{OpcodeInfo, OPCODES};
use byteorder::{BigEndian, WriteBytesExt};
use log::info;
use std::collections::HashMap;

enum Statement<'a> {
    Instruction { mnemonic: &'a str, operands: Vec<&'a str> },
    Bytes(Vec<&'a str>),
    Words(Vec<&'a str>),
}

impl Statement<'_> {
    fn size(&self) -> usize {
        match self {
            Statement::Instruction { .. } => 2,
            Statement::Bytes(values) => values.len(),
            Statement::Words(values) => 2 * values.len(),
        }
    }
}

fn asm_error(line: usize, msg: impl Into<String>) -> Chip8Error {
    Chip8Error::Asm {
        line,
        msg: msg.into(),
    }
}

fn is_label(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn split_operands(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        Vec::new()
    } else {
        s.split(',').map(str::trim).collect()
    }
}

/// "SE V{x}, {kk}" -> ("SE", ["V{x}", "{kk}"])
fn template_parts(template: &str) -> (&str, Vec<&str>) {
    match template.split_once(' ') {
        Some((mnemonic, operands)) => (mnemonic, split_operands(operands)),
        None => (template, Vec::new()),
    }
}

fn register(s: &str) -> Option<u16> {
    let digit = s.strip_prefix('V').or_else(|| s.strip_prefix('v'))?;
    if digit.len() != 1 {
        return None;
    }
    u16::from_str_radix(digit, 16).ok()
}

fn number(s: &str, max: u32) -> Option<u16> {
    parse_int(s).filter(|n| *n <= max).map(|n| n as u16)
}

/// try one table row against the operands. `Ok(None)` if the shape doesn't
/// fit; an error only if the shape fits but names an unknown label
fn fill(
    info: &OpcodeInfo,
    operands: &[&str],
    labels: &HashMap<&str, u16>,
) -> Result<Option<u16>, String> {
    let (_, shapes) = template_parts(info.template);
    if shapes.len() != operands.len() {
        return Ok(None);
    }
    let mut word = info.pattern;
    let mut missing = None;
    for (shape, text) in shapes.iter().zip(operands) {
        let bits = match *shape {
            "V{x}" => register(text).map(|r| r << 8),
            "V{y}" => register(text).map(|r| r << 4),
            "{kk}" => number(text, 0xff),
            "{b}" | "{n}" => number(text, 0xf),
            "{nnn}" => match number(text, 0xfff) {
                Some(addr) => Some(addr),
                None if is_label(text) => match labels.get(text) {
                    Some(addr) => Some(addr & 0x0fff),
                    None => {
                        missing = Some(*text);
                        Some(0)
                    }
                },
                None => None,
            },
            literal => literal.eq_ignore_ascii_case(text).then_some(0),
        };
        match bits {
            Some(bits) => word |= bits,
            None => return Ok(None),
        }
    }
    match missing {
        Some(label) => Err(format!("undefined label '{}'", label)),
        None => Ok(Some(word)),
    }
}

fn encode(mnemonic: &str, operands: &[&str], labels: &HashMap<&str, u16>) -> Result<u16, String> {
    let mut known = false;
    for info in OPCODES.iter() {
        if !template_parts(info.template).0.eq_ignore_ascii_case(mnemonic) {
            continue;
        }
        known = true;
        if let Some(word) = fill(info, operands, labels)? {
            return Ok(word);
        }
    }
    if known {
        Err(format!("bad operands for {}: '{}'", mnemonic, operands.join(", ")))
    } else {
        Err(format!("unknown instruction '{}'", mnemonic))
    }
}

fn parse_statement(text: &str) -> Option<Statement<'_>> {
    if text.is_empty() {
        return None;
    }
    let (head, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let statement = match head.to_ascii_lowercase().trim_start_matches('.') {
        "db" => Statement::Bytes(split_operands(rest)),
        "dw" => Statement::Words(split_operands(rest)),
        _ => Statement::Instruction {
            mnemonic: head,
            operands: split_operands(rest),
        },
    };
    Some(statement)
}

/// assemble a whole source file into a ROM image
pub fn assemble(source: &str) -> Result<Vec<u8>, Chip8Error> {
    // first pass: where does everything land
    let mut labels: HashMap<&str, u16> = HashMap::new();
    let mut statements = Vec::new();
    let mut addr = PROGRAM_ADDR as usize;
    for (n, raw) in source.lines().enumerate() {
        let line = n + 1;
        let mut text = raw.split_once(';').map_or(raw, |(code, _)| code).trim();
        while let Some((name, rest)) = text.split_once(':') {
            let name = name.trim();
            text = rest.trim();
            // "204:" from an address listing
            if name.starts_with(|c: char| c.is_ascii_digit())
                && name.chars().all(|c| c.is_ascii_hexdigit())
            {
                continue;
            }
            if !is_label(name) {
                return Err(asm_error(line, format!("bad label '{}'", name)));
            }
            if labels.insert(name, addr as u16).is_some() {
                return Err(asm_error(line, format!("duplicate label '{}'", name)));
            }
        }
        if let Some(statement) = parse_statement(text) {
            addr += statement.size();
            statements.push((line, text, statement));
        }
    }
    let size = addr - PROGRAM_ADDR as usize;
    if size > MAX_PROGRAM_BYTES {
        return Err(Chip8Error::RomTooLarge {
            size,
            max: MAX_PROGRAM_BYTES,
        });
    }

    // second pass: encode with every label known
    let mut rom = Vec::with_capacity(size);
    for (line, text, statement) in statements {
        let at = PROGRAM_ADDR as usize + rom.len();
        match statement {
            Statement::Instruction { mnemonic, operands } => {
                let word = encode(mnemonic, &operands, &labels).map_err(|e| asm_error(line, e))?;
                info!("{:03x}: {:04x}\t{}", at, word, text);
                rom.write_u16::<BigEndian>(word)?;
            }
            Statement::Bytes(values) => {
                for v in values {
                    let b = number(v, 0xff)
                        .ok_or_else(|| asm_error(line, format!("bad byte '{}'", v)))?;
                    rom.write_u8(b as u8)?;
                }
            }
            Statement::Words(values) => {
                for v in values {
                    let w = number(v, 0xffff)
                        .ok_or_else(|| asm_error(line, format!("bad word '{}'", v)))?;
                    rom.write_u16::<BigEndian>(w)?;
                }
            }
        }
    }
    Ok(rom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{disassemble_rom, ListingOptions};

    #[test]
    fn test_assemble_simple_program() -> Result<(), Chip8Error> {
        let rom = assemble(
            "; clear and spin\n\
             start:  CLS\n\
             \tLD V3, $12\n\
             \tadd v3, 1        ; lower case is fine\n\
             \tDRW V0, V1, 5\n\
             \tJP start\n",
        )?;
        assert_eq!(rom, vec![0x00, 0xe0, 0x63, 0x12, 0x73, 0x01, 0xd0, 0x15, 0x12, 0x00]);
        Ok(())
    }

    #[test]
    fn test_operand_shapes_pick_the_right_opcode() -> Result<(), Chip8Error> {
        let rom = assemble(
            "LD V1, V2\nLD V1, 7\nLD I, $300\nLD [I], V4\nLD V4, [I]\nLD V2, K\n\
             LD DT, V5\nLD V5, DT\nLD HF, V6\nLD R, V7\nJP V0, $400\nSCD 11\n",
        )?;
        let words: Vec<u16> = rom
            .chunks_exact(2)
            .map(|w| ((w[0] as u16) << 8) | w[1] as u16)
            .collect();
        assert_eq!(
            words,
            vec![
                0x8120, 0x6107, 0xa300, 0xf455, 0xf465, 0xf20a, 0xf515, 0xf507, 0xf630, 0xf775,
                0xb400, 0x00cb
            ]
        );
        Ok(())
    }

    #[test]
    fn test_forward_label_and_data() -> Result<(), Chip8Error> {
        let rom = assemble("LD I, sprite\nCALL draw\ndraw: RET\nsprite: db $f0, 144\ndw $1234\n")?;
        assert_eq!(
            rom,
            vec![0xa2, 0x06, 0x22, 0x04, 0x00, 0xee, 0xf0, 0x90, 0x12, 0x34]
        );
        Ok(())
    }

    #[test]
    fn test_errors_name_the_line() {
        assert!(matches!(
            assemble("CLS\nFROB V1"),
            Err(Chip8Error::Asm { line: 2, msg }) if msg.contains("unknown instruction")
        ));
        assert!(matches!(
            assemble("CLS\n\nJP nowhere"),
            Err(Chip8Error::Asm { line: 3, msg }) if msg.contains("undefined label 'nowhere'")
        ));
        assert!(matches!(
            assemble("LD V1, 300"),
            Err(Chip8Error::Asm { line: 1, msg }) if msg.contains("bad operands")
        ));
        assert!(matches!(
            assemble("a: CLS\na: RET"),
            Err(Chip8Error::Asm { line: 2, .. })
        ));
        assert!(matches!(assemble("db 256"), Err(Chip8Error::Asm { .. })));
    }

    #[test]
    fn test_too_big() {
        let source = "CLS\n".repeat(MAX_PROGRAM_BYTES / 2 + 1);
        assert!(matches!(assemble(&source), Err(Chip8Error::RomTooLarge { .. })));
    }

    #[test]
    fn test_listing_reassembles_to_rom() -> Result<(), Chip8Error> {
        #[rustfmt::skip]
        let rom: Vec<u8> = vec![
            0x00, 0xe0, // CLS
            0xa2, 0x0e, // LD I, sprite
            0x22, 0x0a, // CALL sub
            0xa0, 0x50, // LD I, $050 (outside the rom)
            0x12, 0x08, // JP self
            0xd0, 0x15, // sub: DRW V0, V1, 5
            0x00, 0xee, // RET
            0xff, 0xff, // not an instruction
            0x51, 0x21, // nor this
            0x3c,       // odd byte
        ];
        for (addresses, labels) in [(false, false), (false, true), (true, true)] {
            let listing = disassemble_rom(&rom, ListingOptions { addresses, labels });
            assert_eq!(assemble(&listing)?, rom, "{}", listing);
        }
        Ok(())
    }
}
