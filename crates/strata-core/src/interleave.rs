//! Bit interleaving for Z-order key construction.
//!
//! A Z-order key is built by round-robin interleaving the bits of several
//! order-preserving column encodings (see [`crate::ordered_bytes`]). Sorting
//! by the interleaved key gives every participating column locality in the
//! sorted output.

/// Interleaves the bits of `columns` into a single Z-order byte array.
///
/// Columns are scanned column-index by column-index: at bit column `j`, the
/// `j`-th bit (MSB first) of every input that still has bits is emitted in
/// input order. Inputs of unequal length are allowed; an exhausted input
/// simply stops contributing while the remaining inputs continue
/// interleaving among themselves. The output length is the sum of the input
/// lengths in bytes.
///
/// The implementation packs bits with shift accumulation rather than
/// building an intermediate bit string, but is byte-exact against the
/// column-scan definition above.
#[must_use]
pub fn interleave_bits(columns: &[&[u8]]) -> Vec<u8> {
    let total_bits: usize = columns.iter().map(|c| c.len() * 8).sum();
    let mut out = vec![0u8; total_bits.div_ceil(8)];

    let mut out_bit = 0usize;
    let mut column_bit = 0usize;
    while out_bit < total_bits {
        for column in columns {
            if column_bit < column.len() * 8 {
                let bit = (column[column_bit / 8] >> (7 - (column_bit % 8))) & 1;
                out[out_bit / 8] |= bit << (7 - (out_bit % 8));
                out_bit += 1;
            }
        }
        column_bit += 1;
    }

    out
}

/// Concatenates ordered column encodings into a composite sort key.
///
/// Columns must be supplied in the fixed column order of the sort; the
/// result compares lexicographically column by column. No framing or
/// length prefix is added.
#[must_use]
pub fn concat_ordered(columns: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(columns.iter().map(|c| c.len()).sum());
    for column in columns {
        out.extend_from_slice(column);
    }
    out
}
