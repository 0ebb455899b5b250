//! Conversion between strict extended JSON (`serde_json::Value`) and the
//! typed [`Value`] model.

use crate::dates::DatePolicy;
use crate::dates::relaxed_iso;
use crate::error::CompileError;
use crate::value::Binary;
use crate::value::Decimal128;
use crate::value::Document;
use crate::value::ObjectId;
use crate::value::Regex;
use crate::value::Value;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Map;
use serde_json::Value as Json;
use serde_json::json;

/// Decodes a JSON object into a [`Document`], resolving `$`-prefixed
/// wrappers into typed values at every depth.
pub fn decode_document(json: Json, policy: &DatePolicy) -> Result<Document, CompileError> {
    match json {
        Json::Object(map) => match decode_object(map, policy)? {
            Value::Document(doc) => Ok(doc),
            other => Err(CompileError::NotADocument {
                fragment: format!("a {} wrapper", other.type_name()),
            }),
        },
        other => Err(CompileError::NotADocument {
            fragment: other.to_string(),
        }),
    }
}

pub fn decode_value(json: Json, policy: &DatePolicy) -> Result<Value, CompileError> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(value) => Value::Bool(value),
        Json::Number(number) => {
            if let Some(value) = number.as_i64() {
                i32::try_from(value).map_or(Value::Int64(value), Value::Int32)
            } else {
                Value::Double(number.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(value) => Value::String(value),
        Json::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| decode_value(item, policy))
                .collect::<Result<_, _>>()?,
        ),
        Json::Object(map) => decode_object(map, policy)?,
    })
}

fn decode_object(map: Map<String, Json>, policy: &DatePolicy) -> Result<Value, CompileError> {
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    let wrapped = match keys.as_slice() {
        ["$oid"] => Some(decode_oid(&map["$oid"])?),
        ["$date"] => Some(decode_date(&map["$date"], policy)?),
        ["$numberInt"] => Some(decode_int32(&map["$numberInt"])?),
        ["$numberLong"] => Some(Value::Int64(decode_int64(&map["$numberLong"])?)),
        ["$numberDouble"] => Some(decode_double(&map["$numberDouble"])?),
        ["$numberDecimal"] => Some(decode_decimal(&map["$numberDecimal"])?),
        ["$regex"] | ["$regex", "$options"] | ["$options", "$regex"] => decode_legacy_regex(&map),
        ["$regularExpression"] => Some(decode_regular_expression(&map["$regularExpression"])?),
        ["$binary"] => Some(decode_binary(&map["$binary"])?),
        ["$binary", "$type"] | ["$type", "$binary"] => {
            Some(decode_legacy_binary(&map["$binary"], &map["$type"])?)
        }
        ["$minKey"] => Some(decode_key_marker("$minKey", &map["$minKey"], Value::MinKey)?),
        ["$maxKey"] => Some(decode_key_marker("$maxKey", &map["$maxKey"], Value::MaxKey)?),
        _ => None,
    };
    if let Some(value) = wrapped {
        return Ok(value);
    }

    let mut doc = Document::new();
    for (key, value) in map {
        let decoded = decode_value(value, policy)?;
        doc.insert(key, decoded);
    }
    Ok(Value::Document(doc))
}

fn decode_oid(raw: &Json) -> Result<Value, CompileError> {
    let Some(hex) = raw.as_str() else {
        return Err(CompileError::extended("$oid", raw, "expected a hex string"));
    };
    hex.parse::<ObjectId>()
        .map(Value::ObjectId)
        .map_err(|err| CompileError::extended("$oid", raw, err.to_string()))
}

fn decode_date(raw: &Json, policy: &DatePolicy) -> Result<Value, CompileError> {
    match raw {
        Json::String(text) => policy
            .parse_millis(text)
            .map(Value::DateTime)
            .ok_or_else(|| CompileError::InvalidDate {
                fragment: text.clone(),
            }),
        Json::Number(number) => number
            .as_i64()
            .map(Value::DateTime)
            .ok_or_else(|| CompileError::extended("$date", raw, "expected integer milliseconds")),
        Json::Object(inner) => match inner.get("$numberLong") {
            Some(millis) if inner.len() == 1 => decode_int64(millis).map(Value::DateTime),
            _ => Err(CompileError::extended(
                "$date",
                raw,
                "expected {\"$numberLong\": \"<millis>\"}",
            )),
        },
        _ => Err(CompileError::extended(
            "$date",
            raw,
            "expected a date string or milliseconds",
        )),
    }
}

fn decode_int32(raw: &Json) -> Result<Value, CompileError> {
    let parsed = match raw {
        Json::String(text) => text.trim().parse::<i32>().ok(),
        Json::Number(number) => number.as_i64().and_then(|value| i32::try_from(value).ok()),
        _ => None,
    };
    parsed
        .map(Value::Int32)
        .ok_or_else(|| CompileError::extended("$numberInt", raw, "expected a 32-bit integer"))
}

fn decode_int64(raw: &Json) -> Result<i64, CompileError> {
    let parsed = match raw {
        Json::String(text) => text.trim().parse::<i64>().ok(),
        Json::Number(number) => number.as_i64(),
        _ => None,
    };
    parsed.ok_or_else(|| CompileError::extended("$numberLong", raw, "expected a 64-bit integer"))
}

fn decode_double(raw: &Json) -> Result<Value, CompileError> {
    let parsed = match raw {
        Json::String(text) => match text.trim() {
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            "NaN" => Some(f64::NAN),
            other => other.parse::<f64>().ok(),
        },
        Json::Number(number) => number.as_f64(),
        _ => None,
    };
    parsed
        .map(Value::Double)
        .ok_or_else(|| CompileError::extended("$numberDouble", raw, "expected a double"))
}

fn decode_decimal(raw: &Json) -> Result<Value, CompileError> {
    let text = match raw {
        Json::String(text) => text.clone(),
        Json::Number(number) => number.to_string(),
        _ => {
            return Err(CompileError::extended(
                "$numberDecimal",
                raw,
                "expected a decimal string",
            ));
        }
    };
    text.parse::<Decimal128>()
        .map(Value::Decimal128)
        .map_err(|err| CompileError::extended("$numberDecimal", raw, err.to_string()))
}

/// `{"$regex": "...", "$options": "..."}` is only a regex value when both
/// parts are strings; otherwise it stays an operator document.
fn decode_legacy_regex(map: &Map<String, Json>) -> Option<Value> {
    let pattern = map.get("$regex")?.as_str()?;
    let options = match map.get("$options") {
        Some(options) => options.as_str()?,
        None => "",
    };
    Some(Value::Regex(Regex::new(pattern, options)))
}

fn decode_regular_expression(raw: &Json) -> Result<Value, CompileError> {
    let pattern = raw.get("pattern").and_then(Json::as_str);
    let options = raw.get("options").and_then(Json::as_str).unwrap_or("");
    match pattern {
        Some(pattern) => Ok(Value::Regex(Regex::new(pattern, options))),
        None => Err(CompileError::extended(
            "$regularExpression",
            raw,
            "expected {\"pattern\": ..., \"options\": ...}",
        )),
    }
}

fn decode_binary(raw: &Json) -> Result<Value, CompileError> {
    let payload = raw.get("base64").and_then(Json::as_str);
    let subtype = raw.get("subType").and_then(Json::as_str);
    match (payload, subtype) {
        (Some(payload), Some(subtype)) => binary_from_parts("$binary", raw, payload, subtype),
        _ => Err(CompileError::extended(
            "$binary",
            raw,
            "expected {\"base64\": ..., \"subType\": ...}",
        )),
    }
}

fn decode_legacy_binary(payload: &Json, subtype: &Json) -> Result<Value, CompileError> {
    match (payload.as_str(), subtype.as_str()) {
        (Some(data), Some(kind)) => binary_from_parts("$binary", payload, data, kind),
        _ => Err(CompileError::extended(
            "$binary",
            payload,
            "legacy form needs string \"$binary\" and \"$type\"",
        )),
    }
}

fn binary_from_parts(
    wrapper: &str,
    raw: &Json,
    payload: &str,
    subtype: &str,
) -> Result<Value, CompileError> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|err| CompileError::extended(wrapper, raw, err.to_string()))?;
    let subtype = u8::from_str_radix(subtype, 16)
        .map_err(|_| CompileError::extended(wrapper, raw, "subtype must be one hex byte"))?;
    Ok(Value::Binary(Binary { subtype, bytes }))
}

fn decode_key_marker(wrapper: &str, raw: &Json, marker: Value) -> Result<Value, CompileError> {
    if raw.as_i64() == Some(1) {
        Ok(marker)
    } else {
        Err(CompileError::extended(wrapper, raw, "expected 1"))
    }
}

pub fn encode_document(doc: &Document) -> Json {
    let mut map = Map::with_capacity(doc.len());
    for (key, value) in doc.iter() {
        map.insert(key.to_string(), encode_value(value));
    }
    Json::Object(map)
}

/// Canonical wrapper for each variant; see [`decode_value`] for the inverse.
pub fn encode_value(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(value) => Json::Bool(*value),
        Value::Int32(value) => Json::from(*value),
        Value::Int64(value) => json!({ "$numberLong": value.to_string() }),
        Value::Double(value) => encode_double(*value),
        Value::Decimal128(value) => json!({ "$numberDecimal": value.as_str() }),
        Value::String(value) => Json::String(value.clone()),
        Value::ObjectId(id) => json!({ "$oid": id.to_hex() }),
        Value::DateTime(millis) => match relaxed_iso(*millis) {
            Some(iso) => json!({ "$date": iso }),
            None => json!({ "$date": { "$numberLong": millis.to_string() } }),
        },
        Value::Binary(binary) => json!({
            "$binary": {
                "base64": BASE64.encode(&binary.bytes),
                "subType": format!("{:02x}", binary.subtype),
            }
        }),
        Value::Regex(regex) if regex.options.is_empty() => json!({ "$regex": regex.pattern }),
        Value::Regex(regex) => json!({ "$regex": regex.pattern, "$options": regex.options }),
        Value::MinKey => json!({ "$minKey": 1 }),
        Value::MaxKey => json!({ "$maxKey": 1 }),
        Value::Array(items) => Json::Array(items.iter().map(encode_value).collect()),
        Value::Document(doc) => encode_document(doc),
    }
}

fn encode_double(value: f64) -> Json {
    if value.is_nan() {
        return json!({ "$numberDouble": "NaN" });
    }
    if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return json!({ "$numberDouble": text });
    }
    serde_json::Number::from_f64(value)
        .map(Json::Number)
        .unwrap_or_else(|| json!({ "$numberDouble": value.to_string() }))
}
