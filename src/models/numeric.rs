use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

/// Numeric column type accepted from JSON bodies and CSV files.
///
/// Integer columns tolerate float spellings with no fractional part
/// (`"3.0"`), which is how dataframe tooling writes integer columns that
/// once held a missing value.
pub trait Numeric: Sized + Copy {
    fn from_i64(v: i64) -> Self;
    fn from_f64(v: f64) -> Option<Self>;
    fn to_f64(self) -> f64;
}

impl Numeric for i64 {
    fn from_i64(v: i64) -> Self {
        v
    }

    fn from_f64(v: f64) -> Option<Self> {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            Some(v as i64)
        } else {
            None
        }
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Numeric for f64 {
    fn from_i64(v: i64) -> Self {
        v as f64
    }

    fn from_f64(v: f64) -> Option<Self> {
        Some(v)
    }

    fn to_f64(self) -> f64 {
        self
    }
}

struct Lenient<T>(T);

impl<'de, T: Numeric> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_any(NumericVisitor(PhantomData))
            .map(Lenient)
    }
}

struct NumericVisitor<T>(PhantomData<T>);

impl<'de, T: Numeric> Visitor<'de> for NumericVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
        Ok(T::from_i64(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
        let v = i64::try_from(v).map_err(|_| E::custom(format!("{v} is out of range")))?;
        Ok(T::from_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<T, E> {
        T::from_f64(v).ok_or_else(|| E::invalid_value(de::Unexpected::Float(v), &"an integer"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        let trimmed = v.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Ok(T::from_i64(i));
        }
        let f: f64 = trimmed
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))?;
        self.visit_f64(f)
    }
}

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Numeric,
{
    Lenient::<T>::deserialize(deserializer).map(|v| v.0)
}

pub fn deserialize_optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Numeric,
{
    Option::<Lenient<T>>::deserialize(deserializer).map(|v| v.map(|v| v.0))
}
