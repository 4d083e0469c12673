//! Number objects.

use crate::byte_reader::Reader;
use crate::object::macros::object;
use crate::reader::{Readable, ReaderContext};
use crate::trivia::is_regular_character;
use core::fmt::Debug;
use core::str::FromStr;
use log::debug;

/// A PDF number.
///
/// Integers and reals are kept apart so that they are written back the way
/// they were read, but equality is numeric.
#[derive(Clone, Copy, Debug)]
pub struct Number(pub(crate) InternalNumber);

#[derive(Clone, Copy, Debug)]
pub(crate) enum InternalNumber {
    Real(f64),
    Integer(i64),
}

impl Number {
    /// Create a new integer number.
    pub const fn from_integer(num: i64) -> Self {
        Self(InternalNumber::Integer(num))
    }

    /// Create a new real number.
    pub const fn from_real(num: f64) -> Self {
        Self(InternalNumber::Real(num))
    }

    /// Whether the number was an integer.
    pub fn is_integer(&self) -> bool {
        matches!(self.0, InternalNumber::Integer(_))
    }

    /// Returns the number as an integer. Reals are only converted if they have
    /// no fractional part.
    pub fn as_integer(&self) -> Option<i64> {
        match self.0 {
            InternalNumber::Integer(i) => Some(i),
            InternalNumber::Real(r) => {
                if r.fract() == 0.0 && r.is_finite() && r.abs() < i64::MAX as f64 {
                    Some(r as i64)
                } else {
                    debug!("real {r} cannot be used as an integer");

                    None
                }
            }
        }
    }

    /// Returns the number as a f64.
    pub fn as_f64(&self) -> f64 {
        match self.0 {
            InternalNumber::Real(r) => r,
            InternalNumber::Integer(i) => i as f64,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self.0, other.0) {
            (InternalNumber::Integer(a), InternalNumber::Integer(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl Readable for Number {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        let start = r.offset();
        let mut real = false;

        r.forward_if(|b| b == b'+' || b == b'-');

        match r.peek_byte()? {
            b'.' => {
                r.read_byte()?;
                r.forward_while_1(is_digit)?;
                real = true;
            }
            b'0'..=b'9' => {
                r.forward_while_1(is_digit)?;
                if let Some(()) = r.forward_tag(b".") {
                    r.forward_while(is_digit);
                    real = true;
                }
            }
            _ => return None,
        }

        // `12abc` is not a number followed by a keyword.
        if r.peek_byte().is_some_and(is_regular_character) {
            return None;
        }

        let text = core::str::from_utf8(r.range(start..r.offset())?).ok()?;

        if !real {
            if let Ok(i) = i64::from_str(text) {
                return Some(Self::from_integer(i));
            }

            debug!("integer {text} is out of range, reading it as a real");
        }

        // A trailing `.` is accepted by PDF but not by `f64::from_str`.
        let num = f64::from_str(text.trim_end_matches('.')).ok()?;

        Some(Self::from_real(num))
    }
}

object!(Number, Number);

pub(crate) fn is_digit(byte: u8) -> bool {
    byte.is_ascii_digit()
}
