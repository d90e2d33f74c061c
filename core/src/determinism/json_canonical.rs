use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use serde_json::{Map, Value};

// Canonical JSON used for the report manifest and audit event hashing:
// keys sorted, no whitespace, integers only.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> CoreResult<Vec<u8>> {
    let normalized = normalize_value(serde_json::to_value(value)?)?;
    Ok(serde_json::to_vec(&normalized)?)
}

fn normalize_value(v: Value) -> CoreResult<Value> {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = Map::new();
            for (k, vv) in entries {
                out.insert(k, normalize_value(vv)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(arr) => Ok(Value::Array(
            arr.into_iter()
                .map(normalize_value)
                .collect::<CoreResult<Vec<_>>>()?,
        )),
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => Err(CoreError::DeterminismViolation(
            format!("canonical JSON forbids non-integer number {}", n),
        )),
        other => Ok(other),
    }
}
