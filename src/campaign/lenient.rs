//! Lenient coercion for brief values.
//!
//! Briefs arrive as loosely typed JSON: numbers as strings ("$1,200", "12.5%"),
//! lists as comma-separated text. Everything is coerced once, here, at the edge.
//! Unparseable values become `None` and are logged, never returned as errors.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::EvidenceError;

/// Parse a money/percent-like string into a finite, non-negative `f64`.
///
/// Accepts `$`, `A$`, `AUD`, `NZD`, `USD`, thousands separators, a trailing `%`
/// and `k` suffix (`"5k"` → 5000).
pub fn parse_money(raw: &str) -> Result<f64, EvidenceError> {
    static RE_NUM: OnceCell<Regex> = OnceCell::new();
    let re = RE_NUM.get_or_init(|| {
        Regex::new(r"(?i)^(?:a\$|nz\$|us\$|\$|aud|nzd|usd|gbp|£)?\s*(-?\d[\d,]*(?:\.\d+)?)\s*(k)?\s*%?$")
            .expect("money regex")
    });

    let malformed = || EvidenceError::MalformedBriefValue {
        field: "value".into(),
        raw: raw.to_string(),
    };

    let s = raw.trim();
    let caps = re.captures(s).ok_or_else(malformed)?;
    let digits = caps
        .get(1)
        .map(|m| m.as_str().replace(',', ""))
        .ok_or_else(malformed)?;
    let mut v: f64 = digits.parse().map_err(|_| malformed())?;
    if caps.get(2).is_some() {
        v *= 1_000.0;
    }
    if !v.is_finite() || v < 0.0 {
        return Err(malformed());
    }
    Ok(v)
}

fn coerce_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Null => None,
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite() && *x >= 0.0),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => match parse_money(s) {
            Ok(x) => Some(x),
            Err(e) => {
                tracing::debug!(target: "campaign", error = %e, "coerced brief value to null");
                None
            }
        },
        other => {
            tracing::debug!(target: "campaign", value = %other, "coerced non-numeric brief value to null");
            None
        }
    }
}

pub(crate) fn opt_f64<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(coerce_f64(&v))
}

pub(crate) fn opt_u64<'de, D>(d: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(coerce_f64(&v).map(|x| x.round() as u64))
}

pub(crate) fn opt_u32<'de, D>(d: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(coerce_f64(&v).map(|x| x.round().min(u32::MAX as f64) as u32))
}

/// Booleans arrive as `true`, `"yes"`, `"Y"`, `1`... Anything else is `None`.
pub(crate) fn opt_bool<'de, D>(d: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|x| x != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

pub(crate) fn flag<'de, D>(d: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_bool(d)?.unwrap_or(false))
}

/// A list of strings given either as a JSON array or as one delimited string.
pub(crate) fn string_list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    let raw: Vec<String> = match v {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|it| match it {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s.split([',', ';', '\n']).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    Ok(clean_list(raw))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if t.is_empty() || out.iter().any(|o| o.eq_ignore_ascii_case(t)) {
            continue;
        }
        out.push(t.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_formats() {
        assert_eq!(parse_money("$1,200").unwrap(), 1200.0);
        assert_eq!(parse_money("AUD 50").unwrap(), 50.0);
        assert_eq!(parse_money("12.5%").unwrap(), 12.5);
        assert_eq!(parse_money("5k").unwrap(), 5000.0);
        assert!(matches!(
            parse_money("lots"),
            Err(EvidenceError::MalformedBriefValue { .. })
        ));
        assert!(parse_money("-5").is_err());
    }

    #[test]
    fn list_accepts_delimited_string_and_dedups() {
        #[derive(Deserialize)]
        struct W {
            #[serde(deserialize_with = "string_list")]
            v: Vec<String>,
        }
        let w: W = serde_json::from_str(r#"{"v":"Coles, Woolworths; coles ,"}"#).unwrap();
        assert_eq!(w.v, vec!["Coles".to_string(), "Woolworths".to_string()]);
    }
}
