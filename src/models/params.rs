//! Typed views over the loosely-typed `params:` map.
//!
//! The driver passes step params as an untyped JSON object. Each command
//! decodes the keys it understands exactly once, here, with explicit
//! fallbacks; unknown keys and values of the wrong type are ignored.

use serde_json::{Map, Value};
use tokio::sync::Semaphore;

pub const DEFAULT_PARALLEL: usize = 5;
pub const DEFAULT_UPLOAD_PATTERN: &str = "*";

pub type RawParams = Map<String, Value>;

/// Params understood by `in`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetParams {
    /// Maximum simultaneous downloads.
    pub parallel: usize,
}

impl Default for GetParams {
    fn default() -> Self {
        Self {
            parallel: DEFAULT_PARALLEL,
        }
    }
}

impl GetParams {
    /// `parallel` may be a JSON number (fractions truncate) or a numeric
    /// string. Anything else, and any value below 1, yields the default.
    /// Values above what a semaphore can hold are capped there.
    pub fn from_raw(raw: Option<&RawParams>) -> Self {
        let parallel = raw
            .and_then(|params| params.get("parallel"))
            .and_then(loose_integer)
            .filter(|n| *n > 0)
            .map(|n| {
                usize::try_from(n)
                    .unwrap_or(usize::MAX)
                    .min(Semaphore::MAX_PERMITS)
            })
            .unwrap_or(DEFAULT_PARALLEL);
        Self { parallel }
    }
}

/// Params understood by `out`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutParams {
    /// Uploads only happen when this is boolean `true`.
    pub upload_enabled: bool,

    /// Glob evaluated relative to the source directory.
    pub file: String,
}

impl Default for PutParams {
    fn default() -> Self {
        Self {
            upload_enabled: false,
            file: DEFAULT_UPLOAD_PATTERN.to_string(),
        }
    }
}

impl PutParams {
    pub fn from_raw(raw: Option<&RawParams>) -> Self {
        let Some(params) = raw else {
            return Self::default();
        };
        let upload_enabled = params
            .get("upload_enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let file = params
            .get("file")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_UPLOAD_PATTERN.to_string());
        Self {
            upload_enabled,
            file,
        }
    }
}

fn loose_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.parse::<i64>().ok().or_else(|| {
            // digits too large for i64
            s.parse::<u128>().ok().map(|_| i64::MAX)
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parallel_of(value: Value) -> usize {
        let raw = json!({ "parallel": value });
        GetParams::from_raw(raw.as_object()).parallel
    }

    #[test]
    fn parallel_accepts_numbers_and_numeric_strings() {
        assert_eq!(parallel_of(json!(3)), 3);
        assert_eq!(parallel_of(json!("3")), 3);
        assert_eq!(parallel_of(json!(2.9)), 2);
        assert_eq!(parallel_of(json!(12)), 12);
    }

    #[test]
    fn huge_parallel_is_capped() {
        assert_eq!(parallel_of(json!(1e19)), Semaphore::MAX_PERMITS);
        assert_eq!(parallel_of(json!(u64::MAX)), Semaphore::MAX_PERMITS);
        assert_eq!(
            parallel_of(json!("99999999999999999999999")),
            Semaphore::MAX_PERMITS
        );
        assert_eq!(parallel_of(json!(i64::MAX)), Semaphore::MAX_PERMITS);
    }

    #[test]
    fn parallel_falls_back_to_default() {
        assert_eq!(parallel_of(json!(0)), DEFAULT_PARALLEL);
        assert_eq!(parallel_of(json!(-1)), DEFAULT_PARALLEL);
        assert_eq!(parallel_of(json!("-4")), DEFAULT_PARALLEL);
        assert_eq!(parallel_of(json!("abc")), DEFAULT_PARALLEL);
        assert_eq!(parallel_of(json!(true)), DEFAULT_PARALLEL);
        assert_eq!(parallel_of(Value::Null), DEFAULT_PARALLEL);
        assert_eq!(GetParams::from_raw(None), GetParams::default());
        assert_eq!(
            GetParams::from_raw(json!({"other": 1}).as_object()).parallel,
            DEFAULT_PARALLEL
        );
    }

    #[test]
    fn put_params_defaults() {
        let params = PutParams::from_raw(None);
        assert!(!params.upload_enabled);
        assert_eq!(params.file, "*");
    }

    #[test]
    fn put_params_require_real_bool() {
        let raw = json!({"upload_enabled": "true", "file": "dist/*.tgz"});
        let params = PutParams::from_raw(raw.as_object());
        assert!(!params.upload_enabled);
        assert_eq!(params.file, "dist/*.tgz");

        let raw = json!({"upload_enabled": true, "file": 7});
        let params = PutParams::from_raw(raw.as_object());
        assert!(params.upload_enabled);
        assert_eq!(params.file, "*");
    }
}
