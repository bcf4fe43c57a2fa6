//! Transaction amounts.
//!
//! Offline senders are JavaScript clients: an amount arrives as a JSON
//! integer, a JSON float, or occasionally a numeric string. The canonical
//! hash must match what the sender computed with `JSON.stringify`, so an
//! [`Amount`] always serializes like a JS `Number`:
//!
//! - integral values as integers (`11` and `11.0` both become `11`)
//! - fractional values as the shortest round-trip float (`11.5`)
//! - anything unparsable as `0`

use std::{fmt, str::FromStr};

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Magnitude from which `Number.prototype.toString` switches to exponent form.
const JS_EXPONENT_THRESHOLD: u128 = 1_000_000_000_000_000_000_000;

/// A normalized, non-lossy transaction amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal, stripping trailing zeros.
    #[must_use]
    pub fn new(value: Decimal) -> Self {
        Self(value.normalize())
    }

    /// Whole-unit amount.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Convert a float the way a JS engine prints it (shortest round-trip).
    /// Non-finite values become zero.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Self::ZERO;
        }
        Decimal::from_str(&value.to_string())
            .ok()
            .or_else(|| Decimal::from_f64(value))
            .map_or(Self::ZERO, Self::new)
    }

    /// Parse a string leniently: plain decimals, scientific notation, or
    /// anything `f64` accepts. Unparsable input becomes zero.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(value) = Decimal::from_str(trimmed) {
            return Self::new(value);
        }
        if let Ok(value) = Decimal::from_scientific(trimmed) {
            return Self::new(value);
        }
        trimmed.parse::<f64>().map_or(Self::ZERO, Self::from_f64)
    }

    #[must_use]
    pub fn value(&self) -> Decimal {
        self.0
    }

    #[must_use]
    pub fn is_integral(&self) -> bool {
        self.0.fract().is_zero()
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Integral values outside the 64-bit range that JS still prints in
    /// full (below 1e21). `serde_json::Number` cannot hold these.
    fn wide_integer(&self) -> Option<i128> {
        if !self.is_integral() || self.0.to_i64().is_some() || self.0.to_u64().is_some() {
            return None;
        }
        self.0
            .to_i128()
            .filter(|v| v.unsigned_abs() < JS_EXPONENT_THRESHOLD)
    }

    /// The JSON number this amount serializes to inside a
    /// `serde_json::Value`. Integers wider than 64 bits fall back to a float
    /// here; the `Serialize` impl writes them in full.
    #[must_use]
    pub fn json_number(&self) -> serde_json::Number {
        if self.is_integral() {
            if let Some(v) = self.0.to_i64() {
                return v.into();
            }
            if let Some(v) = self.0.to_u64() {
                return v.into();
            }
        }
        self.0
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .unwrap_or_else(|| 0.into())
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(wide) = self.wide_integer() {
            return serializer.serialize_i128(wide);
        }
        self.json_number().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> de::Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a numeric string, or null")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount::new(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::new(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Ok(Amount::from_f64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Ok(Amount::parse_lenient(v))
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Amount, E> {
        Ok(Amount::ZERO)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::ZERO)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Amount, D::Error> {
        deserializer.deserialize_any(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(amount: Amount) -> String {
        serde_json::to_string(&amount).unwrap()
    }

    #[test]
    fn integral_float_serializes_as_integer() {
        let from_int: Amount = serde_json::from_str("11").unwrap();
        let from_float: Amount = serde_json::from_str("11.0").unwrap();
        assert_eq!(from_int, from_float);
        assert_eq!(json(from_int), "11");
        assert_eq!(json(from_float), "11");
    }

    #[test]
    fn fractional_keeps_shortest_form() {
        let a: Amount = serde_json::from_str("11.5").unwrap();
        assert_eq!(json(a), "11.5");
        let b: Amount = serde_json::from_str("0.1").unwrap();
        assert_eq!(json(b), "0.1");
        assert_eq!(b.value(), Decimal::new(1, 1));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let a: Amount = serde_json::from_str("\"40.50\"").unwrap();
        assert_eq!(json(a), "40.5");
        let b: Amount = serde_json::from_str("\"1e2\"").unwrap();
        assert_eq!(json(b), "100");
    }

    #[test]
    fn garbage_becomes_zero() {
        let a: Amount = serde_json::from_str("\"lots\"").unwrap();
        assert_eq!(a, Amount::ZERO);
        let b: Amount = serde_json::from_str("null").unwrap();
        assert_eq!(b, Amount::ZERO);
        assert_eq!(json(a), "0");
    }

    #[test]
    fn negative_detection() {
        assert!(Amount::from_units(-5).is_negative());
        assert!(!Amount::ZERO.is_negative());
        assert!(!Amount::from_units(5).is_negative());
    }

    #[test]
    fn integers_past_u64_print_in_full() {
        let a: Amount = serde_json::from_str("100000000000000000000").unwrap();
        assert_eq!(a.value(), Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0));
        assert_eq!(json(a), "100000000000000000000");
        let neg = Amount::new(Decimal::from_i128_with_scale(-100_000_000_000_000_000_000, 0));
        assert_eq!(json(neg), "-100000000000000000000");
        assert_eq!(json(Amount::from_units(i64::MAX)), i64::MAX.to_string());
    }

    #[test]
    fn non_finite_float_is_zero() {
        assert_eq!(Amount::from_f64(f64::NAN), Amount::ZERO);
        assert_eq!(Amount::from_f64(f64::INFINITY), Amount::ZERO);
    }
}
