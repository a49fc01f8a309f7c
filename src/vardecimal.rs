//! Decodes decimal values stored in the variable-length vardecimal format.
//!
//! Layout:
//!
//! ```text
//! byte 0      bit 7: sign (set = positive), bits 0-6: exponent biased by 64
//! bytes 1..   mantissa: big-endian stream of 10 bit groups, each holding 3 decimal digits (0-999)
//! ```
//!
//! The value is `0.<g0><g1>...<gn-1> * 10^exponent`.  Bits left over after the last whole group are
//! padding.  A zero-length value is zero.

use crate::sql_value::Decimal;

const SIGN_BIT: u8 = 0x80;
const EXPONENT_MASK: u8 = 0x7f;
const EXPONENT_BIAS: i32 = 64;
const GROUP_BITS: usize = 10;
const GROUP_DIGITS: i32 = 3;
const MAX_GROUP: u16 = 999;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Mantissa group {0} is larger than 999.")]
    GroupOutOfRange(u16),
    #[error("Value does not fit in a 38 digit decimal.")]
    Overflow,
    #[error("Value has more fractional digits than scale {0} allows.")]
    InexactScale(u8),
}

/// Decodes `bytes` into a decimal with the column's `scale`.
pub fn decode(bytes: &[u8], scale: u8) -> Result<Decimal, Error> {
    let Some((&head, mantissa)) = bytes.split_first() else {
        return Ok(Decimal::new(0, scale));
    };
    let positive = head & SIGN_BIT == SIGN_BIT;
    let exponent = (head & EXPONENT_MASK) as i32 - EXPONENT_BIAS;

    let groups = mantissa.len() * 8 / GROUP_BITS;
    let mut digits: i128 = 0;
    for g in 0..groups {
        let group = read_group(mantissa, g * GROUP_BITS);
        if group > MAX_GROUP {
            return Err(Error::GroupOutOfRange(group));
        }
        digits = digits
            .checked_mul(1000)
            .and_then(|d| d.checked_add(group as i128))
            .ok_or(Error::Overflow)?;
    }

    // digits * 10^(exponent - 3 * groups) rescaled to `scale` fractional digits.
    let power = exponent - GROUP_DIGITS * groups as i32 + scale as i32;
    let unscaled = if power >= 0 {
        10_i128
            .checked_pow(power as u32)
            .and_then(|p| digits.checked_mul(p))
            .ok_or(Error::Overflow)?
    } else {
        let divisor = 10_i128
            .checked_pow(power.unsigned_abs())
            .ok_or(Error::InexactScale(scale))?;
        if digits % divisor != 0 {
            return Err(Error::InexactScale(scale));
        }
        digits / divisor
    };
    Ok(Decimal::new(if positive { unscaled } else { -unscaled }, scale))
}

fn read_group(mantissa: &[u8], first_bit: usize) -> u16 {
    (first_bit..first_bit + GROUP_BITS).fold(0_u16, |acc, bit| {
        let b = (mantissa[bit / 8] >> (7 - bit % 8)) & 1;
        (acc << 1) | b as u16
    })
}

#[test]
fn test_decode_vardecimal() {
    // +123.45: exponent 3, groups 123 and 450.
    let v = decode(&[0xc3, 0x1e, 0xdc, 0x20], 2).unwrap();
    assert_eq!(v, Decimal::new(12345, 2));
    // Same digits, negative sign.
    let v = decode(&[0x43, 0x1e, 0xdc, 0x20], 2).unwrap();
    assert_eq!(v, Decimal::new(-12345, 2));
    // Wider scale pads with zeros.
    let v = decode(&[0xc3, 0x1e, 0xdc, 0x20], 4).unwrap();
    assert_eq!(v, Decimal::new(1234500, 4));
}

#[test]
fn test_decode_vardecimal_edge_cases() {
    assert_eq!(decode(&[], 2).unwrap(), Decimal::new(0, 2));
    // 123.45 cannot be represented with one fractional digit.
    assert_eq!(
        decode(&[0xc3, 0x1e, 0xdc, 0x20], 1),
        Err(Error::InexactScale(1))
    );
    // A group of 1023 is not a valid 3 digit group.
    assert_eq!(
        decode(&[0xc1, 0xff, 0xc0], 0),
        Err(Error::GroupOutOfRange(1023))
    );
}
