use std::sync::OnceLock;

use regex::Regex;

/// Replacement for anything that looks like a credential.
pub const REDACTED: &str = "[REDACTED]";

struct RedactPattern {
    name: &'static str,
    pattern: &'static str,
}

/// Credential shapes that can end up in adapter error messages.
static PATTERNS: &[RedactPattern] = &[
    RedactPattern { name: "openai_key", pattern: r"sk-(?:proj-)?[A-Za-z0-9_\-]{20,}" },
    RedactPattern { name: "anthropic_key", pattern: r"sk-ant-[A-Za-z0-9_\-]{20,}" },
    RedactPattern { name: "replicate_token", pattern: r"r8_[A-Za-z0-9]{20,}" },
    RedactPattern { name: "huggingface_token", pattern: r"hf_[A-Za-z0-9]{30,}" },
    RedactPattern { name: "google_api_key", pattern: r"AIza[0-9A-Za-z\-_]{35}" },
    RedactPattern { name: "aws_access_key_id", pattern: r"AKIA[0-9A-Z]{16}" },
    RedactPattern { name: "github_pat", pattern: r"gh[pousr]_[A-Za-z0-9]{36}" },
    RedactPattern { name: "jwt_token", pattern: r"eyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}" },
    RedactPattern { name: "bearer_token", pattern: r"(?i)bearer\s+[A-Za-z0-9_\-\.=]{16,}" },
    RedactPattern { name: "url_credentials", pattern: r"[a-z][a-z0-9+.\-]*://[^:/\s@]+:[^@\s]+@" },
    RedactPattern { name: "key_value_secret", pattern: r#"(?i)(api[_-]?key|token|secret|password|authorization)(["']?\s*[=:]\s*["']?)[^\s"',;&]{6,}"# },
];

fn compiled() -> &'static [(&'static str, Regex)] {
    static COMPILED: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|p| match Regex::new(p.pattern) {
                Ok(re) => Some((p.name, re)),
                Err(err) => {
                    tracing::error!(pattern = p.name, %err, "redaction pattern failed to compile");
                    None
                }
            })
            .collect()
    })
}

/// Replaces credential-like substrings in `text` with [`REDACTED`].
///
/// Key/value pairs keep their key so the message stays readable.
pub fn redact(text: &str) -> String {
    let mut out = text.to_owned();
    for (name, re) in compiled() {
        if !re.is_match(&out) {
            continue;
        }
        out = if *name == "key_value_secret" {
            re.replace_all(&out, format!("${{1}}${{2}}{REDACTED}").as_str())
                .into_owned()
        } else {
            re.replace_all(&out, REDACTED).into_owned()
        };
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/report/redact.rs"]
mod tests;
