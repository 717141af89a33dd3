//! Failure classification
//!
//! The one place engine output is turned into an [`EngineErrorKind`].
//! Machine-readable diagnostics (`-json` output) are read first and the
//! provider error codes embedded in them are matched exactly. Free-text
//! markers are only consulted when no code is recognized; provider plugins
//! change their wording between releases, so that fallback is best effort.

use crate::error::EngineErrorKind;
use serde::Deserialize;

/// A diagnostic from terraform's JSON output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Diagnostic {
    pub severity: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub detail: String,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == "error"
    }

    fn text(&self) -> String {
        format!("{}\n{}", self.summary, self.detail)
    }
}

#[derive(Deserialize)]
struct StreamLine {
    #[serde(rename = "type")]
    line_type: Option<String>,
    diagnostic: Option<Diagnostic>,
}

#[derive(Deserialize)]
struct ValidateDocument {
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
}

/// Error codes that mean "this region cannot host it right now"
const QUOTA_CODES: &[&str] = &[
    "LimitExceeded",
    "ResourceInsufficient",
    "ResourcesSoldOut",
    "OperationDenied.NoStock",
    "QuotaExceed",
    "InsufficientInstanceCapacity",
    "InstanceLimitExceeded",
    "VcpuLimitExceeded",
    "MaxSpotInstanceCountExceeded",
];

const AUTH_CODES: &[&str] = &[
    "AuthFailure",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "Forbidden.RAM",
];

const QUOTA_MARKERS: &[&str] = &[
    "配额不足",
    "库存不足",
    "quota exceeded",
    "insufficient capacity",
    "no stock",
    "sold out",
];

const AUTH_MARKERS: &[&str] = &[
    "no valid credential sources",
    "invalid credentials",
    "authentication failed",
    "the accesskey id provided does not exist",
];

/// Markers preceding an error code in provider SDK messages
const CODE_PREFIXES: &[&str] = &["Code=", "Code: ", "code: ", "ErrorCode: ", "api error "];

/// Diagnostics from `-json` output.
///
/// Accepts both the streamed one-object-per-line format of
/// `plan`/`apply`/`destroy` and the single document of `validate -json`.
pub fn parse_diagnostics(stdout: &str) -> Vec<Diagnostic> {
    if let Ok(document) = serde_json::from_str::<ValidateDocument>(stdout.trim()) {
        if !document.diagnostics.is_empty() {
            return document.diagnostics;
        }
    }

    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<StreamLine>(line.trim()).ok())
        .filter(|line| line.line_type.as_deref() == Some("diagnostic"))
        .filter_map(|line| line.diagnostic)
        .collect()
}

/// Provider error codes mentioned in `text`
pub fn extract_codes(text: &str) -> Vec<String> {
    let mut codes = Vec::new();
    for prefix in CODE_PREFIXES {
        for (start, _) in text.match_indices(prefix) {
            let rest = &text[start + prefix.len()..];
            let code: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
                .collect();
            let code = code.trim_end_matches('.').to_string();
            if !code.is_empty() && !codes.contains(&code) {
                codes.push(code);
            }
        }
    }
    codes
}

fn kind_for_code(code: &str) -> Option<EngineErrorKind> {
    if QUOTA_CODES.iter().any(|known| code.starts_with(known)) {
        return Some(EngineErrorKind::QuotaExceeded);
    }
    if AUTH_CODES.iter().any(|known| code.starts_with(known)) {
        return Some(EngineErrorKind::AuthError);
    }
    None
}

fn kind_for_text(text: &str) -> EngineErrorKind {
    let lower = text.to_lowercase();
    if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
        return EngineErrorKind::QuotaExceeded;
    }
    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        return EngineErrorKind::AuthError;
    }
    EngineErrorKind::Other
}

/// Classify a failed engine run
pub fn classify(diagnostics: &[Diagnostic], stderr: &str) -> EngineErrorKind {
    let errors: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(Diagnostic::text)
        .collect();

    for text in errors.iter().map(String::as_str).chain([stderr]) {
        if let Some(kind) = extract_codes(text).iter().find_map(|c| kind_for_code(c)) {
            return kind;
        }
    }

    let mut all = errors.join("\n");
    all.push('\n');
    all.push_str(stderr);
    kind_for_text(&all)
}

/// Short human-readable message for a failed run
pub fn summarize(diagnostics: &[Diagnostic], stderr: &str, stdout: &str) -> String {
    let errors: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| {
            if d.detail.is_empty() {
                d.summary.clone()
            } else {
                format!("{}: {}", d.summary, d.detail)
            }
        })
        .collect();
    if !errors.is_empty() {
        return errors.join("; ");
    }
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no output")
        .trim()
        .to_string()
}
