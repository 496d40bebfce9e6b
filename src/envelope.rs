//! The nil/indirection envelope.
//!
//! A value may sit behind any number of stacked optional-reference layers. Present layers cost
//! nothing on the wire: the pointed-to value is written directly. An absent layer is written as a
//! nil unit carrying its *depth*, the number of layers (counting from the absent one inward) that
//! are absent at once. Depth 1 is implied by a bare nil byte; anything deeper sets the indirection
//! flag and follows the header with an integer.
//!
//! Decoders skip any extension bytes in a nil header without interpreting them.

use crate::element::{write_int, Parser};
use crate::error::{Error, Result};
use crate::marker::{Marker, EXTENSION};

/// Write a nil unit for `depth` absent layers. `depth` must be at least 1.
pub fn write_nil(buf: &mut Vec<u8>, depth: usize) {
    debug_assert!(depth >= 1);
    let indirect = depth > 1;
    buf.push(
        Marker::Nil {
            extended: false,
            indirect,
        }
        .into(),
    );
    if indirect {
        write_int(buf, depth as u64);
    }
}

/// Try to read a nil unit. Returns `Ok(None)` without consuming anything if the next unit isn't
/// nil, or the absence depth if it is.
pub fn read_nil(parser: &mut Parser) -> Result<Option<usize>> {
    let (mut extended, indirect) = match parser.peek_marker() {
        Some(Marker::Nil { extended, indirect }) => (extended, indirect),
        _ => return Ok(None),
    };
    parser.read_u8("decode nil marker")?;
    while extended {
        let step = "skip nil header extension";
        let ext = parser
            .read_u8(step)
            .map_err(|_| Error::TruncatedHeader { step })?;
        extended = ext & EXTENSION != 0;
    }
    if !indirect {
        return Ok(Some(1));
    }
    let depth = parser.read_i64().map_err(|e| {
        if e.is_eof() {
            Error::TruncatedHeader {
                step: "decode indirection depth",
            }
        } else {
            Error::MalformedData(format!("bad indirection depth: {}", e))
        }
    })?;
    if depth < 1 {
        return Err(Error::MalformedData(format!(
            "indirection depth must be at least 1, got {}",
            depth
        )));
    }
    usize::try_from(depth)
        .map(Some)
        .map_err(|_| Error::MalformedData(format!("indirection depth {} is too large", depth)))
}

/// Peek at the next unit: the absence depth if it is a nil unit, without consuming it.
pub fn peek_nil(parser: &Parser) -> Result<Option<usize>> {
    let mut probe = *parser;
    read_nil(&mut probe)
}
