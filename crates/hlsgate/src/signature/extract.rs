//! Locates the signature routine inside the player script.
//!
//! This is pattern matching against minified code, not parsing. When the
//! player changes shape the extraction fails, and the failure is reported
//! with the step that broke.

use std::sync::LazyLock;

use regex::Regex;

use super::DECRYPT_FUNCTION_NAME;

static PLAYER_PATH_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""assets":.+?"js":\s*("[^"]+")"#).unwrap());

// c&&d.set(b,encodeURIComponent(XY(decodeURIComponent(c))))
static FUNCTION_NAME_REGEXP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*encodeURIComponent\s*\(\s*([a-zA-Z0-9$]+)\(",
    )
    .unwrap()
});

static HELPER_NAME_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"; ?([a-zA-Z]+?)\.").unwrap());

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("player script path not found in watch page")]
    PlayerNotFound,

    #[error("decryption function not found")]
    DecryptionFunctionNotFound,

    #[error("decryption function {0} not parsable")]
    DecryptionFunctionNotParsable(String),

    #[error("helper object not found")]
    HelperObjectNotFound,

    #[error("helper object {0} not parsable")]
    HelperObjectNotParsable(String),

    #[error("failed to download player assets: {0}")]
    Upstream(String),
}

impl ExtractError {
    /// Whether a later request may succeed where this one failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractError::Upstream(_))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct DecryptionFunction<'a> {
    pub(crate) args: &'a str,
    pub(crate) body: &'a str,
}

/// Reads the player script path out of the watch page.
pub(crate) fn extract_player_path(page: &str) -> Result<String, ExtractError> {
    let literal = PLAYER_PATH_REGEXP
        .captures(page)
        .and_then(|cap| cap.get(1))
        .ok_or(ExtractError::PlayerNotFound)?;

    // the capture is a JSON string literal, so escapes like \/ need decoding
    serde_json::from_str::<String>(literal.as_str()).map_err(|_| ExtractError::PlayerNotFound)
}

pub(crate) fn extract_function_name(player: &str) -> Option<&str> {
    FUNCTION_NAME_REGEXP
        .captures(player)
        .and_then(|cap| cap.get(1))
        .map(|name| name.as_str())
}

pub(crate) fn extract_function<'a>(name: &str, player: &'a str) -> Option<DecryptionFunction<'a>> {
    let name = regex::escape(name);
    let pattern = format!(
        r"(?:function\s+{name}|[{{;,]\s*{name}\s*=\s*function|var\s+{name}\s*=\s*function)\s*\(([^)]*)\)\s*\{{([^}}]+)\}}"
    );
    let regex = Regex::new(&pattern).ok()?;

    let captures = regex.captures(player)?;
    Some(DecryptionFunction {
        args: captures.get(1)?.as_str(),
        body: captures.get(2)?.as_str(),
    })
}

pub(crate) fn extract_helper_name(body: &str) -> Option<&str> {
    HELPER_NAME_REGEXP
        .captures(body)
        .and_then(|cap| cap.get(1))
        .map(|name| name.as_str())
}

/// Returns `var NAME = {...}` with the object literal closed at its matching brace.
pub(crate) fn extract_helper_object<'a>(name: &str, player: &'a str) -> Option<&'a str> {
    let regex = Regex::new(&format!("var {} ?= ?", regex::escape(name))).ok()?;
    let start = regex.find(player)?.start();
    let code = &player[start..];

    let mut depth = 0usize;
    let mut opened = false;
    for (index, c) in code.char_indices() {
        match c {
            '{' => {
                depth += 1;
                opened = true;
            }
            '}' => depth = depth.checked_sub(1)?,
            _ => {}
        }

        if opened && depth == 0 {
            return Some(&code[..index + c.len_utf8()]);
        }
    }

    // ran out of input before the literal closed
    None
}

/// Runs the four extraction steps and assembles a standalone program exposing
/// [`DECRYPT_FUNCTION_NAME`].
pub fn extract_program(player: &str) -> Result<String, ExtractError> {
    let function_name =
        extract_function_name(player).ok_or(ExtractError::DecryptionFunctionNotFound)?;

    let function = extract_function(function_name, player)
        .ok_or_else(|| ExtractError::DecryptionFunctionNotParsable(function_name.to_string()))?;

    let helper_name =
        extract_helper_name(function.body).ok_or(ExtractError::HelperObjectNotFound)?;

    let helper = extract_helper_object(helper_name, player)
        .ok_or_else(|| ExtractError::HelperObjectNotParsable(helper_name.to_string()))?;

    log::debug!("Extracted signature function {function_name} with helper {helper_name}");

    Ok(format!(
        "{helper}; function {DECRYPT_FUNCTION_NAME}({}) {{ {} }}",
        function.args, function.body
    ))
}
