use boa_engine::{Context, JsString, JsValue, Source};

use super::DECRYPT_FUNCTION_NAME;
use crate::{HlsGateError, HlsGateResult};

/// Evaluates `program` in a fresh context and calls its exported function with `signature`.
///
/// Every call gets its own context so helper objects of different players never meet.
pub fn run_program(program: &str, signature: &str) -> HlsGateResult<String> {
    let failed = |reason: String| HlsGateError::DecryptionFailed(reason);

    let mut context = Context::default();
    context
        .eval(Source::from_bytes(program))
        .map_err(|error| failed(error.to_string()))?;

    let function = context
        .global_object()
        .get(JsString::from(DECRYPT_FUNCTION_NAME), &mut context)
        .map_err(|error| failed(error.to_string()))?;
    let function = function
        .as_callable()
        .ok_or_else(|| failed(format!("{DECRYPT_FUNCTION_NAME} is not a function")))?;

    let result = function
        .call(
            &JsValue::undefined(),
            &[JsValue::from(JsString::from(signature))],
            &mut context,
        )
        .map_err(|error| failed(error.to_string()))?;

    result
        .as_string()
        .map(|result| result.to_std_string_escaped())
        .ok_or_else(|| failed(format!("expected a string, got {}", result.type_of())))
}
