//! Exact decimal numbers for amount columns.
//!
//! Flat files from banking and mainframe systems carry amounts that must survive a
//! read/write cycle digit for digit, so [`Decimal`] stores an arbitrary precision
//! unscaled integer ([`BigInt`]) and a scale instead of a binary float.
//!
//! ```rust
//! use serde_flatfile::Decimal;
//!
//! let amount: Decimal = "-1234.50".parse().unwrap();
//! assert_eq!(amount.scale(), 2);
//! assert_eq!(amount.to_string(), "-1234.50");
//! assert_eq!(amount, "-1234.5".parse().unwrap());
//! ```

use num_bigint::{BigInt, Sign};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// An exact base-10 number: `unscaled * 10^-scale`.
///
/// Equality is numeric, so `1.5` and `1.50` compare equal even though they keep
/// their own scale for display.
#[derive(Clone, Debug, Default)]
pub struct Decimal {
    unscaled: BigInt,
    scale: u32,
}

/// Error returned when a string is not a plain decimal number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseDecimalError(String);

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal {:?}", self.0)
    }
}

impl std::error::Error for ParseDecimalError {}

fn ten_pow(exp: u32) -> BigInt {
    BigInt::from(10u8).pow(exp)
}

impl Decimal {
    #[must_use]
    pub fn new(unscaled: BigInt, scale: u32) -> Self {
        Decimal { unscaled, scale }
    }

    #[must_use]
    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.scale
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.unscaled.sign() == Sign::Minus
    }

    /// Returns the same number with exactly `scale` fractional digits.
    ///
    /// Returns `None` when reducing the scale would drop non-zero digits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::Decimal;
    ///
    /// let d: Decimal = "12.3".parse().unwrap();
    /// assert_eq!(d.rescale(3).unwrap().to_string(), "12.300");
    /// assert_eq!(d.rescale(0), None);
    /// ```
    #[must_use]
    pub fn rescale(&self, scale: u32) -> Option<Decimal> {
        match scale.cmp(&self.scale) {
            Ordering::Equal => Some(self.clone()),
            Ordering::Greater => Some(Decimal {
                unscaled: &self.unscaled * ten_pow(scale - self.scale),
                scale,
            }),
            Ordering::Less => {
                let factor = ten_pow(self.scale - scale);
                if (&self.unscaled % &factor) != BigInt::default() {
                    return None;
                }
                Some(Decimal {
                    unscaled: &self.unscaled / factor,
                    scale,
                })
            }
        }
    }

    /// Converts to the nearest `f64`.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Converts a finite float using its shortest round-trip representation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::Decimal;
    ///
    /// assert_eq!(Decimal::from_f64(0.1).unwrap().to_string(), "0.1");
    /// assert!(Decimal::from_f64(f64::NAN).is_none());
    /// ```
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Decimal> {
        if !value.is_finite() {
            return None;
        }
        value.to_string().parse().ok()
    }

    fn cmp_numeric(&self, other: &Decimal) -> Ordering {
        let scale = self.scale.max(other.scale);
        let lhs = &self.unscaled * ten_pow(scale - self.scale);
        let rhs = &other.unscaled * ten_pow(scale - other.scale);
        lhs.cmp(&rhs)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_numeric(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_numeric(other)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_string());

        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (body, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }

        let digits = format!("{}{}", int_part, frac_part);
        let magnitude: BigInt = digits.parse().map_err(|_| err())?;
        let scale = u32::try_from(frac_part.len()).map_err(|_| err())?;

        Ok(Decimal {
            unscaled: if negative { -magnitude } else { magnitude },
            scale,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.magnitude().to_string();
        let sign = if self.is_negative() { "-" } else { "" };
        let scale = self.scale as usize;

        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }

        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal {
            unscaled: BigInt::from(value),
            scale: 0,
        }
    }
}

impl From<BigInt> for Decimal {
    fn from(value: BigInt) -> Self {
        Decimal {
            unscaled: value,
            scale: 0,
        }
    }
}

impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DecimalVisitor;

        impl<'de> de::Visitor<'de> for DecimalVisitor {
            type Value = Decimal;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a decimal number or decimal string")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Decimal, E> {
                Ok(Decimal::from(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Decimal, E> {
                Ok(Decimal::from(BigInt::from(value)))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Decimal, E> {
                Decimal::from_f64(value)
                    .ok_or_else(|| E::custom(format!("cannot represent {} as a decimal", value)))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Decimal, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DecimalVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(dec("0").to_string(), "0");
        assert_eq!(dec("-0.05").to_string(), "-0.05");
        assert_eq!(dec("+7.10").to_string(), "7.10");
        assert_eq!(dec(".5").to_string(), "0.5");
        assert_eq!(dec("12.").to_string(), "12");
        assert_eq!(
            dec("123456789012345678901234567890.99").to_string(),
            "123456789012345678901234567890.99"
        );
    }

    #[test]
    fn test_rejects_garbage() {
        for bad in ["", "-", ".", "1.2.3", "1e5", "12a", " 1"] {
            assert!(bad.parse::<Decimal>().is_err(), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_numeric_equality_and_order() {
        assert_eq!(dec("1.50"), dec("1.5"));
        assert_ne!(dec("1.51"), dec("1.5"));
        assert!(dec("-2") < dec("-1.99"));
        assert!(dec("10") > dec("9.999"));
    }

    #[test]
    fn test_rescale() {
        assert_eq!(dec("1.2").rescale(2).unwrap().to_string(), "1.20");
        assert_eq!(dec("1.20").rescale(1).unwrap().to_string(), "1.2");
        assert!(dec("1.25").rescale(1).is_none());
        assert_eq!(dec("-3").rescale(2).unwrap().unscaled(), &BigInt::from(-300));
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(dec("2.25").to_f64(), 2.25);
        assert_eq!(Decimal::from_f64(-1.5).unwrap(), dec("-1.5"));
        assert!(Decimal::from_f64(f64::INFINITY).is_none());
    }
}
