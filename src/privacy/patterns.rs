//! Fixed detection tables: content patterns and sensitive path names.

use std::sync::LazyLock;

use regex_lite::Regex;

/// Prefix of every redaction marker. Matches containing it are never redacted again.
pub const REDACTION_PREFIX: &str = "[REDACTED:";

/// A content pattern whose matches are redacted before leaving the machine.
#[derive(Debug)]
pub struct ContentPattern {
    /// Category name, used in the redaction marker and in warnings.
    pub category: &'static str,
    /// Human-readable description for warnings.
    pub description: &'static str,
    pub regex: Regex,
}

impl ContentPattern {
    fn new(category: &'static str, description: &'static str, pattern: &str) -> Self {
        Self {
            category,
            description,
            regex: Regex::new(pattern).expect("Invalid regex"),
        }
    }

    /// Marker that replaces each match.
    pub fn marker(&self) -> String {
        format!("{REDACTION_PREFIX}{}]", self.category)
    }
}

/// Ordered so that broader structures (PEM blocks, connection strings) are
/// consumed before the fragments they contain (emails, IPs).
pub static CONTENT_PATTERNS: LazyLock<Vec<ContentPattern>> = LazyLock::new(|| {
    vec![
        ContentPattern::new(
            "pem-block",
            "PEM private key block",
            r"(?s)-----BEGIN [A-Z ]*PRIVATE KEY-----.*?-----END [A-Z ]*PRIVATE KEY-----",
        ),
        ContentPattern::new(
            "jwt",
            "JSON web token",
            r"\beyJ[A-Za-z0-9_-]{5,}\.eyJ[A-Za-z0-9_-]{5,}\.[A-Za-z0-9_-]{5,}",
        ),
        ContentPattern::new(
            "cloud-credential",
            "cloud access key",
            r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b|\bAIza[0-9A-Za-z_-]{35}",
        ),
        ContentPattern::new(
            "connection-string",
            "database connection string",
            r#"(?i)\b(?:postgres(?:ql)?|mysql|mariadb|mongodb(?:\+srv)?|rediss?|amqps?|mssql|sqlserver)://[^\s'"<>]+"#,
        ),
        ContentPattern::new(
            "url-credentials",
            "URL with embedded credentials",
            r#"(?i)\b[a-z][a-z0-9+.-]*://[^\s:/@"']+:[^\s@/"']+@[^\s/"']+"#,
        ),
        ContentPattern::new(
            "credential",
            "hardcoded credential",
            r#"(?i)(?:api[_-]?key|apikey|client[_-]?secret|secret[_-]?key|secret|password|passwd|pwd|auth[_-]?token|access[_-]?token|access[_-]?key|private[_-]?key|token)\b\s*[:=]\s*(?:"[^"\s]{3,}"|'[^'\s]{3,}')"#,
        ),
        ContentPattern::new(
            "credential",
            "hardcoded credential",
            r"(?m)^[+ -]?\s*(?:export\s+)?[A-Z0-9_]*(?:API_KEY|SECRET|PASSWORD|PASSWD|TOKEN|ACCESS_KEY|PRIVATE_KEY)[A-Z0-9_]*\s*=\s*[^\s'`]{3,}",
        ),
        ContentPattern::new(
            "email",
            "email address",
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        ),
        ContentPattern::new(
            "card-number",
            "payment card number",
            r"\b(?:\d{4}[- ]?){3}\d{4}\b",
        ),
        ContentPattern::new("ssn", "social security number", r"\b\d{3}-\d{2}-\d{4}\b"),
        ContentPattern::new(
            "phone",
            "phone number",
            r"(?:\+\d{1,3}[-. ]?)?\(?\b\d{3}\)?[-. ]\d{3}[-. ]\d{4}\b",
        ),
        ContentPattern::new(
            "ipv4",
            "IPv4 address",
            r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b",
        ),
    ]
});

/// Whole-line comments (`//`, `#`, `--`, `/*`, `*`, `<!--`), after an optional diff origin.
pub static COMMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([+ -]?[ \t]*(?://+|#+|--|/\*+|\*+|<!--)[ \t]*)(.*)$")
        .expect("Invalid regex")
});

/// Words that make a comment worth redacting.
pub static SENSITIVE_COMMENT_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:password|passwd|secret|api[_-]?key|keys?|tokens?)\b")
        .expect("Invalid regex")
});

/// Extensions of files that are never sent anywhere.
pub const SENSITIVE_EXTENSIONS: &[&str] = &[
    "env", "pem", "key", "p12", "pfx", "crt", "cer", "der", "jks", "keystore", "asc", "gpg",
    "pgp", "ppk", "kdbx", "ovpn", "htpasswd", "netrc",
];

/// Extension-less names treated as sensitive file types.
pub const SENSITIVE_FILENAMES: &[&str] = &[
    ".env", ".netrc", ".npmrc", ".pypirc", ".htpasswd", "id_rsa", "id_dsa", "id_ecdsa",
    "id_ed25519",
];

/// JSON files that conventionally hold credentials.
pub const SENSITIVE_JSON_FILES: &[&str] = &[
    "credentials.json",
    "secrets.json",
    "service-account.json",
    "serviceaccount.json",
    "firebase-adminsdk.json",
    "google-services.json",
    "keyfile.json",
    "auth.json",
    "token.json",
    "tokens.json",
];

/// Directory names whose contents are never sent anywhere.
pub const SENSITIVE_DIRECTORIES: &[&str] = &[
    "secrets",
    "secret",
    "keys",
    "credentials",
    "private",
    ".ssh",
    ".aws",
    ".gnupg",
];
