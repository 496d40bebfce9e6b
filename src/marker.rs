//! The info byte that leads every encoded unit.
//!
//! Layout is `SNEILLLL`:
//!
//! - `S`: sign of an integer. Decoded magnitude bytes are padded with `0xFF` when set.
//! - `N`: explicit nil. The unit is an absence marker, not data.
//! - `E`: extension. Another header byte follows; old decoders skip it.
//! - `I`: indirection count present. An integer giving the absence depth follows the header.
//! - `LLLL`: number of big-endian magnitude bytes following an integer's info byte, 0 to 8.
//!
//! The bit positions are fixed for this format version and must not move.

pub const SIGN: u8 = 0x80;
pub const NIL: u8 = 0x40;
pub const EXTENSION: u8 = 0x20;
pub const INDIRECT: u8 = 0x10;
pub const LEN_MASK: u8 = 0x0F;

/// Maximum number of magnitude bytes an integer may carry.
pub const MAX_INT_LEN: u8 = 8;

/// Decoded form of a leading info byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// An integer header: sign flag plus count of trailing magnitude bytes.
    Int { negative: bool, len: u8 },
    /// An explicit absence, possibly with extension bytes and an embedded depth.
    Nil { extended: bool, indirect: bool },
    /// Flags that can't start any unit in this format version.
    Reserved(u8),
}

impl Marker {
    /// Construct a marker from a single byte.
    pub fn from_u8(n: u8) -> Marker {
        if n & NIL != 0 {
            if n & (SIGN | LEN_MASK) != 0 {
                return Marker::Reserved(n);
            }
            return Marker::Nil {
                extended: n & EXTENSION != 0,
                indirect: n & INDIRECT != 0,
            };
        }
        if n & (EXTENSION | INDIRECT) != 0 || (n & LEN_MASK) > MAX_INT_LEN {
            return Marker::Reserved(n);
        }
        Marker::Int {
            negative: n & SIGN != 0,
            len: n & LEN_MASK,
        }
    }

    /// Converts a marker object into a single-byte representation.
    pub fn into_u8(self) -> u8 {
        match self {
            Marker::Int { negative, len } => {
                debug_assert!(len <= MAX_INT_LEN);
                (if negative { SIGN } else { 0 }) | (len & LEN_MASK)
            }
            Marker::Nil { extended, indirect } => {
                NIL | (if extended { EXTENSION } else { 0 })
                    | (if indirect { INDIRECT } else { 0 })
            }
            Marker::Reserved(n) => n,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Marker::Nil { .. })
    }
}

impl From<u8> for Marker {
    fn from(val: u8) -> Marker {
        Marker::from_u8(val)
    }
}

impl From<Marker> for u8 {
    fn from(val: Marker) -> u8 {
        val.into_u8()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn int_markers() {
        assert_eq!(
            Marker::from_u8(0x00),
            Marker::Int {
                negative: false,
                len: 0
            }
        );
        assert_eq!(
            Marker::from_u8(0x80),
            Marker::Int {
                negative: true,
                len: 0
            }
        );
        assert_eq!(
            Marker::from_u8(0x88),
            Marker::Int {
                negative: true,
                len: 8
            }
        );
        assert_eq!(Marker::from_u8(0x09), Marker::Reserved(0x09));
        assert_eq!(Marker::from_u8(0x20), Marker::Reserved(0x20));
        assert_eq!(Marker::from_u8(0x11), Marker::Reserved(0x11));
    }

    #[test]
    fn nil_markers() {
        assert_eq!(
            Marker::from_u8(0x40),
            Marker::Nil {
                extended: false,
                indirect: false
            }
        );
        assert_eq!(
            Marker::from_u8(0x70),
            Marker::Nil {
                extended: true,
                indirect: true
            }
        );
        assert_eq!(Marker::from_u8(0xC0), Marker::Reserved(0xC0));
        assert_eq!(Marker::from_u8(0x41), Marker::Reserved(0x41));
    }

    #[test]
    fn byte_roundtrip() {
        for n in 0..=u8::MAX {
            let marker = Marker::from_u8(n);
            assert_eq!(marker.into_u8(), n);
        }
    }
}
