use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut};

use super::config::ATTR_SIZE;
use super::error::{Result, StoreError};

/// Block number - addresses a block on the disk image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockNum(pub u32);

impl BlockNum {
    pub fn new(num: u32) -> Self {
        Self(num)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Decodes an on-disk block link, where -1 means no block.
    pub fn from_link(link: i32) -> Option<BlockNum> {
        u32::try_from(link).ok().map(BlockNum)
    }

    /// Encodes an optional block as an on-disk link.
    pub fn to_link(block: Option<BlockNum>) -> i32 {
        block.map(|b| b.0 as i32).unwrap_or(-1)
    }
}

impl fmt::Display for BlockNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockNum({})", self.0)
    }
}

/// Index of a relation in the open relation table
pub type RelId = usize;

/// Record identifier - a record block and a slot inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecId {
    pub block: BlockNum,
    pub slot: usize,
}

impl RecId {
    pub fn new(block: BlockNum, slot: usize) -> Self {
        Self { block, slot }
    }
}

/// Position of an entry inside a leaf index block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexId {
    pub block: BlockNum,
    pub index: usize,
}

impl IndexId {
    pub fn new(block: BlockNum, index: usize) -> Self {
        Self { block, index }
    }
}

/// Attribute type as stored in the attribute catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    Number,
    Text,
}

impl AttrType {
    pub fn code(&self) -> f64 {
        match self {
            AttrType::Number => 0.0,
            AttrType::Text => 1.0,
        }
    }

    pub fn from_code(code: f64) -> Option<AttrType> {
        if code == 0.0 {
            Some(AttrType::Number)
        } else if code == 1.0 {
            Some(AttrType::Text)
        } else {
            None
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Number => write!(f, "NUM"),
            AttrType::Text => write!(f, "STR"),
        }
    }
}

/// A single attribute value. The type is carried by the attribute catalog;
/// the bytes on disk never say which variant they hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Number(f64),
    Text(String),
}

impl Attribute {
    /// Longest string that fits a NUL-terminated attribute slot
    pub const MAX_TEXT_LEN: usize = ATTR_SIZE - 1;

    /// Builds a string attribute, rejecting values that do not fit a slot.
    pub fn text(value: &str) -> Result<Self> {
        if value.len() > Self::MAX_TEXT_LEN {
            return Err(StoreError::ValueTooLong {
                max: Self::MAX_TEXT_LEN,
            });
        }
        Ok(Attribute::Text(value.to_string()))
    }

    pub fn attr_type(&self) -> AttrType {
        match self {
            Attribute::Number(_) => AttrType::Number,
            Attribute::Text(_) => AttrType::Text,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Attribute::Number(n) => Some(*n),
            Attribute::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Attribute::Number(_) => None,
            Attribute::Text(s) => Some(s),
        }
    }

    /// Checks that the value can be stored in a slot of type `ty`.
    /// NaN has no place in the key order, so it is not a valid number.
    pub fn check(&self, ty: AttrType) -> Result<()> {
        if self.attr_type() != ty {
            return Err(StoreError::AttrTypeMismatch);
        }
        match self {
            Attribute::Number(n) if n.is_nan() => Err(StoreError::AttrTypeMismatch),
            Attribute::Text(s) if s.len() > Self::MAX_TEXT_LEN => Err(StoreError::ValueTooLong {
                max: Self::MAX_TEXT_LEN,
            }),
            _ => Ok(()),
        }
    }

    /// Writes the value into an `ATTR_SIZE` byte slot.
    /// Strings longer than a slot are cut at the slot boundary.
    pub fn encode(&self, mut out: &mut [u8]) {
        debug_assert_eq!(out.len(), ATTR_SIZE);
        match self {
            Attribute::Number(n) => {
                out.put_f64_le(*n);
                out.put_bytes(0, ATTR_SIZE - 8);
            }
            Attribute::Text(s) => {
                let len = s.len().min(Self::MAX_TEXT_LEN);
                out.put_slice(&s.as_bytes()[..len]);
                out.put_bytes(0, ATTR_SIZE - len);
            }
        }
    }

    /// Reads a value of type `ty` from an `ATTR_SIZE` byte slot.
    pub fn decode(mut bytes: &[u8], ty: AttrType) -> Self {
        debug_assert_eq!(bytes.len(), ATTR_SIZE);
        match ty {
            AttrType::Number => Attribute::Number(bytes.get_f64_le()),
            AttrType::Text => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(ATTR_SIZE);
                Attribute::Text(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
        }
    }
}

impl From<f64> for Attribute {
    fn from(value: f64) -> Self {
        Attribute::Number(value)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Number(n) => write!(f, "{}", n),
            Attribute::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The single comparator used by scans, searches and splits.
///
/// Strings compare byte-wise, numbers by the sign of their difference.
/// Values of different types never meet in practice; numbers order first.
pub fn compare_attrs(a: &Attribute, b: &Attribute) -> Ordering {
    match (a, b) {
        (Attribute::Number(x), Attribute::Number(y)) => {
            let diff = x - y;
            if diff > 0.0 {
                Ordering::Greater
            } else if diff < 0.0 {
                Ordering::Less
            } else {
                Ordering::Equal
            }
        }
        (Attribute::Text(x), Attribute::Text(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Attribute::Number(_), Attribute::Text(_)) => Ordering::Less,
        (Attribute::Text(_), Attribute::Number(_)) => Ordering::Greater,
    }
}

/// Relational operator of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    /// Whether a stored value satisfies the operator, given
    /// `ord = compare_attrs(stored, target)`.
    pub fn matches(&self, ord: Ordering) -> bool {
        match self {
            Op::Eq => ord == Ordering::Equal,
            Op::Ne => ord != Ordering::Equal,
            Op::Lt => ord == Ordering::Less,
            Op::Le => ord != Ordering::Greater,
            Op::Gt => ord == Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_link() {
        assert_eq!(BlockNum::from_link(-1), None);
        assert_eq!(BlockNum::from_link(12), Some(BlockNum::new(12)));
        assert_eq!(BlockNum::to_link(None), -1);
        assert_eq!(BlockNum::to_link(Some(BlockNum::new(9))), 9);
    }

    #[test]
    fn test_attribute_encode_decode() {
        let mut slot = [0xffu8; ATTR_SIZE];
        Attribute::Number(-12.5).encode(&mut slot);
        assert_eq!(Attribute::decode(&slot, AttrType::Number), Attribute::Number(-12.5));
        assert_eq!(&slot[8..], &[0u8; 8]);

        let value = Attribute::text("fifteen_chars__").unwrap();
        value.encode(&mut slot);
        assert_eq!(slot[15], 0);
        assert_eq!(Attribute::decode(&slot, AttrType::Text), value);
    }

    #[test]
    fn test_text_too_long() {
        assert!(matches!(
            Attribute::text("sixteen_chars___"),
            Err(StoreError::ValueTooLong { max: 15 })
        ));
    }

    #[test]
    fn test_check_rejects_nan() {
        assert!(matches!(
            Attribute::from(f64::NAN).check(AttrType::Number),
            Err(StoreError::AttrTypeMismatch)
        ));
        assert!(Attribute::from(f64::INFINITY).check(AttrType::Number).is_ok());
        assert!(Attribute::from(-0.5).check(AttrType::Number).is_ok());
    }

    #[test]
    fn test_compare_attrs() {
        let a = Attribute::from(3.0);
        let b = Attribute::from(7.5);
        assert_eq!(compare_attrs(&a, &b), Ordering::Less);
        assert_eq!(compare_attrs(&b, &a), Ordering::Greater);
        assert_eq!(compare_attrs(&a, &a), Ordering::Equal);

        let x = Attribute::text("apple").unwrap();
        let y = Attribute::text("apricot").unwrap();
        assert_eq!(compare_attrs(&x, &y), Ordering::Less);
        assert_eq!(compare_attrs(&y, &x), Ordering::Greater);
    }

    #[test]
    fn test_op_matches() {
        use Ordering::*;
        assert!(Op::Eq.matches(Equal) && !Op::Eq.matches(Less));
        assert!(Op::Ne.matches(Less) && Op::Ne.matches(Greater) && !Op::Ne.matches(Equal));
        assert!(Op::Lt.matches(Less) && !Op::Lt.matches(Equal));
        assert!(Op::Le.matches(Less) && Op::Le.matches(Equal) && !Op::Le.matches(Greater));
        assert!(Op::Gt.matches(Greater) && !Op::Gt.matches(Equal));
        assert!(Op::Ge.matches(Greater) && Op::Ge.matches(Equal) && !Op::Ge.matches(Less));
    }

    #[test]
    fn test_attr_type_code() {
        assert_eq!(AttrType::from_code(AttrType::Number.code()), Some(AttrType::Number));
        assert_eq!(AttrType::from_code(AttrType::Text.code()), Some(AttrType::Text));
        assert_eq!(AttrType::from_code(4.0), None);
    }
}
