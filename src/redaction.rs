use once_cell::sync::Lazy;
use regex::Regex;

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)(api[_-]?key|apikey|key|token|secret|password)\s*[:=]\s*["']?([A-Za-z0-9_\-\.]{6,})["']?"#)
            .expect("valid regex"),
        Regex::new(r"\b(AIza[0-9A-Za-z_\-]{35})\b").expect("valid regex"),
        Regex::new(r"\b(eyJ[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]+)\b").expect("valid regex"),
        Regex::new(r"(?i)\b(bearer)\s+[A-Za-z0-9_\-\.]{12,}").expect("valid regex"),
    ]
});

/// Scrubs credentials out of messages coming back from the AI provider and
/// the remote database before they are logged or shown.
#[derive(Debug, Default, Clone)]
pub struct Redactor {
    known_secrets: Vec<String>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also masks these exact values wherever they appear.
    pub fn with_secret(mut self, secret: &str) -> Self {
        if secret.len() >= 6 {
            self.known_secrets.push(secret.to_string());
        }
        self
    }

    pub fn redact(&self, input: &str) -> String {
        if input.is_empty() {
            return String::new();
        }

        let mut result = input.to_string();
        for secret in &self.known_secrets {
            result = result.replace(secret.as_str(), "[REDACTED]");
        }

        for pattern in SECRET_PATTERNS.iter() {
            if !pattern.is_match(&result) {
                continue;
            }
            result = pattern
                .replace_all(&result, |caps: &regex::Captures<'_>| {
                    if caps.len() > 2 {
                        let name = caps.get(1).map(|m| m.as_str()).unwrap_or("secret").to_ascii_lowercase();
                        format!("{}=[REDACTED]", name)
                    } else {
                        "[REDACTED]".to_string()
                    }
                })
                .to_string();
        }

        result
    }
}

/// Keeps the first and last four characters of a credential for display.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
