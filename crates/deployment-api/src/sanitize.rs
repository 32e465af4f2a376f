//! JSON-safe normalisation of protocol responses
//!
//! The protocol reports amounts (wei-scale escrow values, block numbers,
//! nonces) that do not fit in an IEEE-754 double. Browsers parse JSON numbers
//! as doubles, so any integer outside the safe range is re-emitted as its
//! exact decimal string before a response leaves the service.

use serde_json::{Number, Value};

/// Largest integer a double represents exactly, 2^53 - 1
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Return a copy of `value` with every unsafe integer replaced by a string
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Number(n) => match wide_integer(n) {
            Some(digits) => Value::String(digits),
            None => Value::Number(n.clone()),
        },
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), sanitize(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Decimal digits of `n` if it is an integer beyond the safe range
fn wide_integer(n: &Number) -> Option<String> {
    if let Some(u) = n.as_u64() {
        return (u > MAX_SAFE_INTEGER).then(|| u.to_string());
    }
    if let Some(i) = n.as_i64() {
        return (i.unsigned_abs() > MAX_SAFE_INTEGER).then(|| i.to_string());
    }

    // Wider than 64 bits: only reachable with arbitrary-precision numbers
    let repr = n.to_string();
    is_integer_literal(&repr).then_some(repr)
}

fn is_integer_literal(repr: &str) -> bool {
    let digits = repr.strip_prefix('-').unwrap_or(repr);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
