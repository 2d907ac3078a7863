use byteorder::{ByteOrder, LittleEndian};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::candidate::{CandidateRecord, Position};

/// Errors raised while decoding a candidate dump.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("IO error reading dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected 4 fields, got {got}")]
    FieldCount { line: usize, got: usize },

    #[error("line {line}: '{token}' is not valid hex")]
    BadHex { line: usize, token: String },

    #[error("line {line}: '{token}' decodes to {got} bytes, expected 4")]
    BadLength { line: usize, token: String, got: usize },

    #[error("line {line}: chance {chance} is above 100")]
    ChanceOutOfRange { line: usize, chance: u8 },

    #[error("dump contains no candidate rows")]
    Empty,
}

fn decode_hex(line: usize, token: &str) -> Result<[u8; 4], DumpError> {
    let trimmed = token.trim();
    let unprefixed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = unprefixed
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if digits.len() % 2 != 0 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DumpError::BadHex {
            line,
            token: token.trim().to_string(),
        });
    }

    let bytes: Vec<u8> = (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
        .collect::<Result<_, _>>()
        .map_err(|_| DumpError::BadHex {
            line,
            token: token.trim().to_string(),
        })?;

    if bytes.len() != 4 {
        return Err(DumpError::BadLength {
            line,
            token: token.trim().to_string(),
            got: bytes.len(),
        });
    }

    let mut out = [0u8; 4];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Decode a candidate table dumped from game memory.
///
/// The first row is a header. Each following row has four comma-separated
/// fields holding little-endian 32-bit words in hex: x, y, z and the packed
/// info word. Parsing stops at the first blank row.
pub fn parse_dump(text: &str) -> Result<Vec<CandidateRecord>, DumpError> {
    let mut records = Vec::new();

    for (idx, raw_line) in text.lines().enumerate().skip(1) {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            break;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 4 {
            return Err(DumpError::FieldCount {
                line: line_no,
                got: fields.len(),
            });
        }

        let x = LittleEndian::read_i32(&decode_hex(line_no, fields[0])?);
        let y = LittleEndian::read_i32(&decode_hex(line_no, fields[1])?);
        let z = LittleEndian::read_i32(&decode_hex(line_no, fields[2])?);
        let info = LittleEndian::read_u32(&decode_hex(line_no, fields[3])?);

        let record = CandidateRecord::from_packed(Position::new(x, y, z), info);
        if record.chance > 100 {
            return Err(DumpError::ChanceOutOfRange {
                line: line_no,
                chance: record.chance,
            });
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(DumpError::Empty);
    }

    Ok(records)
}

pub fn load_dump(path: &Path) -> Result<Vec<CandidateRecord>, DumpError> {
    let text = fs::read_to_string(path)?;
    let records = parse_dump(&text)?;
    log::debug!("loaded {} candidates from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "x,y,z,info\n\
        e40c0000,9e020000,b3400000,00640000\n\
        10270000,18fcffff,00000000,00320001\n\
        \n\
        ffffffff,ffffffff,ffffffff,00000000\n";

    #[test]
    fn decodes_little_endian_rows() {
        let records = parse_dump(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].position, Position::new(3300, 670, 16563));
        assert_eq!(records[0].chance, 100);
        assert!(!records[0].in_use);

        assert_eq!(records[1].position, Position::new(10000, -1000, 0));
        assert_eq!(records[1].chance, 50);
        assert!(records[1].in_use);
    }

    #[test]
    fn stops_at_blank_row() {
        let records = parse_dump(SAMPLE).unwrap();
        assert!(records.iter().all(|r| r.position.x != -1));
    }

    #[test]
    fn reports_line_of_bad_row() {
        let text = "header\n00000000,00000000,00000000,00640000\n00000000,zz000000,00000000,00000000\n";
        match parse_dump(text) {
            Err(DumpError::BadHex { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_short_rows_and_words() {
        assert!(matches!(
            parse_dump("header\n00000000,00000000,00000000\n"),
            Err(DumpError::FieldCount { line: 2, got: 3 })
        ));
        assert!(matches!(
            parse_dump("header\n000000,00000000,00000000,00000000\n"),
            Err(DumpError::BadLength { line: 2, got: 3, .. })
        ));
    }

    #[test]
    fn accepts_one_hex_prefix_of_either_case() {
        let records = parse_dump("header\n0xe40c0000,0X9e020000,b3400000,0x00640000\n").unwrap();
        assert_eq!(records[0].position, Position::new(3300, 670, 16563));
        assert_eq!(records[0].chance, 100);

        assert!(matches!(
            parse_dump("header\n0x0xe40c0000,00000000,00000000,00000000\n"),
            Err(DumpError::BadHex { line: 2, .. })
        ));
        assert!(matches!(
            parse_dump("header\n0X0Xe40c0000,00000000,00000000,00000000\n"),
            Err(DumpError::BadHex { line: 2, .. })
        ));
    }

    #[test]
    fn rejects_chance_above_100() {
        assert!(matches!(
            parse_dump("header\n00000000,00000000,00000000,00c80000\n"),
            Err(DumpError::ChanceOutOfRange { chance: 200, .. })
        ));
    }

    #[test]
    fn header_only_is_empty() {
        assert!(matches!(parse_dump("x,y,z,info\n"), Err(DumpError::Empty)));
    }
}
