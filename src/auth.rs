use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// The allow-list. Built once from `AUTHORIZED_IDENTITIES` at startup and
/// never mutated afterwards.
pub struct AuthRegistry {
    entries: HashSet<String>,
}

impl AuthRegistry {
    pub fn from_config(raw: &str) -> Self {
        Self {
            entries: parse_identities(raw),
        }
    }

    /// Denies everything. What you get when no allow-list is configured.
    pub fn empty() -> Self {
        Self {
            entries: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True iff any candidate form (numeric id, handle with or without the
    /// `@` marker) is in the registry.
    pub fn is_authorized<'a, I>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .any(|candidate| self.entries.contains(candidate))
    }
}

/// Parses the allow-list configuration string. Accepts a JSON list, a
/// bracketed or unbracketed comma list, quoted or not. Numeric entries are
/// stored in canonical form (numeric wins over handle interpretation);
/// handles are stored both with and without the leading `@`. Blank entries
/// and `#`-comments are skipped. Input that looks like JSON but doesn't
/// parse falls back to plain comma-splitting.
pub fn parse_identities(raw: &str) -> HashSet<String> {
    let trimmed = raw.trim();
    let mut entries = HashSet::new();
    if trimmed.is_empty() {
        return entries;
    }

    let parts: Vec<String> = if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            Ok(values) => values
                .iter()
                .map(|value| match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Err(_) => comma_split(trimmed),
        }
    } else {
        comma_split(trimmed)
    };

    for part in parts {
        let entry = part
            .trim()
            .trim_matches(|c| c == '"' || c == '\'' || c == '[' || c == ']')
            .trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        if let Ok(id) = entry.parse::<i64>() {
            entries.insert(id.to_string());
        } else {
            let bare = entry.trim_start_matches('@');
            entries.insert(bare.to_string());
            entries.insert(format!("@{}", bare));
        }
    }
    entries
}

fn comma_split(raw: &str) -> Vec<String> {
    raw.split(',').map(|part| part.to_string()).collect()
}

/// Append-only record of denied commands, kept apart from the application
/// log so it can be audited on its own.
pub struct AuditLog {
    file: Mutex<std::fs::File>,
}

impl AuditLog {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// One line per denial: timestamp, identity, user id, chat id.
    pub fn record_denial(&self, identity: &str, user_id: u64, chat_id: i64) {
        let line = format!(
            "{}\tdenied\t{}\t{}\t{}\n",
            chrono::Utc::now().to_rfc3339(),
            identity,
            user_id,
            chat_id
        );
        let mut file = self.file.lock().unwrap();
        if let Err(e) = file.write_all(line.as_bytes()) {
            log::error!("Failed to append to the audit log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[&str]) -> HashSet<String> {
        entries.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn plain_comma_list() {
        assert_eq!(
            parse_identities("@ana,123"),
            set(&["ana", "@ana", "123"])
        );
    }

    #[test]
    fn json_list_with_mixed_entry_kinds() {
        assert_eq!(
            parse_identities(r#"["@ana", "bob", 123]"#),
            set(&["ana", "@ana", "bob", "@bob", "123"])
        );
    }

    #[test]
    fn bracketed_quoted_comma_list() {
        assert_eq!(
            parse_identities(r#"['@ana', '456']"#),
            set(&["ana", "@ana", "456"])
        );
    }

    #[test]
    fn malformed_json_falls_back_to_comma_splitting() {
        // Trailing comma makes this invalid JSON.
        assert_eq!(
            parse_identities(r#"["@ana", 123,]"#),
            set(&["ana", "@ana", "123"])
        );
    }

    #[test]
    fn blanks_and_comments_are_skipped() {
        assert_eq!(
            parse_identities("@ana, ,# disabled entry,123"),
            set(&["ana", "@ana", "123"])
        );
    }

    #[test]
    fn numeric_form_takes_precedence() {
        // A plain number never gets handle variants.
        assert_eq!(parse_identities("123"), set(&["123"]));
    }

    #[test]
    fn empty_configuration_yields_an_empty_registry() {
        assert!(parse_identities("").is_empty());
        assert!(parse_identities("   ").is_empty());
    }

    #[test]
    fn empty_registry_denies_everyone() {
        let registry = AuthRegistry::empty();
        assert!(!registry.is_authorized(["123", "@ana", "ana"]));
    }

    #[test]
    fn is_authorized_matches_any_candidate_form() {
        let registry = AuthRegistry::from_config("@ana,123");

        // Handle presented with or without the marker.
        assert!(registry.is_authorized(["ana"]));
        assert!(registry.is_authorized(["@ana"]));
        // Numeric id.
        assert!(registry.is_authorized(["999", "123"]));
        // Nothing matches.
        assert!(!registry.is_authorized(["456", "@bob"]));
    }
}
