//! Typed interpretations of the selected bytes.

use crate::error::HexSpliceError;
use crate::store::ByteStore;
use crate::typed::Endianness;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub offset: usize,
    /// Selected bytes in file order
    pub bytes: Vec<u8>,
    pub unsigned: Option<u64>,
    pub signed: Option<i64>,
    pub float: Option<f64>,
    /// Bits from most to least significant
    pub binary: String,
}

/// Interprets `width` bytes at `offset` of `store`. Widths of 1, 2, 4 and 8
/// yield integer values (and floats for 4 and 8); other widths only bits.
///
/// # Errors
/// Returns `OutOfBounds` if the selection runs past the end of the store.
pub fn analyze<S>(
    store: &mut S,
    offset: usize,
    width: usize,
    endian: Endianness,
) -> Result<Analysis, HexSpliceError>
where
    S: ByteStore + ?Sized,
{
    store.check_range(offset, width)?;
    let bytes = store.read_clamped(offset, width)?;

    let (unsigned, signed, float) = match width {
        1 => (
            Some(u64::from(store.read_typed::<u8>(offset, endian))),
            Some(i64::from(store.read_typed::<i8>(offset, endian))),
            None,
        ),
        2 => (
            Some(u64::from(store.read_typed::<u16>(offset, endian))),
            Some(i64::from(store.read_typed::<i16>(offset, endian))),
            None,
        ),
        4 => {
            let raw = store.read_typed::<u32>(offset, endian);
            (
                Some(u64::from(raw)),
                Some(i64::from(store.read_typed::<i32>(offset, endian))),
                Some(f64::from(f32::from_bits(raw))),
            )
        }
        8 => {
            let raw = store.read_typed::<u64>(offset, endian);
            (
                Some(raw),
                Some(store.read_typed::<i64>(offset, endian)),
                Some(f64::from_bits(raw)),
            )
        }
        _ => (None, None, None),
    };

    let mut ordered = bytes.clone();
    if !endian.is_big() {
        ordered.reverse();
    }
    let binary = ordered
        .iter()
        .map(|b| format!("{b:08b}"))
        .collect::<Vec<_>>()
        .join(" ");

    Ok(Analysis {
        offset,
        bytes,
        unsigned,
        signed,
        float,
        binary,
    })
}

/// Formats the number so that it has separators (for readability)
#[allow(clippy::needless_pass_by_value)]
pub fn format_with_separators<T: ToString>(n: T) -> String {
    let s = n.to_string();
    let (sign, digits) = s
        .strip_prefix('-')
        .map_or(("", s.as_str()), |stripped| ("-", stripped));

    let mut result = String::new();
    for (idx, ch) in digits.chars().rev().enumerate() {
        if idx != 0 && idx % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, ch);
    }
    format!("{sign}{result}")
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Offset:   0x{:X}", self.offset)?;
        if let Some(value) = self.unsigned {
            writeln!(f, "Unsigned: {}", format_with_separators(value))?;
        }
        if let Some(value) = self.signed {
            writeln!(f, "Signed:   {}", format_with_separators(value))?;
        }
        if let Some(value) = self.float {
            writeln!(f, "Float:    {value}")?;
        }
        write!(f, "Binary:   {}", self.binary)
    }
}
