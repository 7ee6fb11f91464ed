//! Offline validator for question bank files.
//!
//! Usage: `validate_bank <directory>`
//!
//! Checks every `.json` file in the directory against the question record
//! invariants, prints every violation, and exits non-zero if any were found
//! so it can gate CI.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use serde_json::Value;

use rust_quizbot::quiz::bank::validate_question;
use rust_quizbot::quiz::Question;

const REQUIRED_FIELDS: [&str; 6] = ["id", "text", "options", "correct_index", "block", "topic"];

fn main() -> ExitCode {
    let dir = match std::env::args().nth(1) {
        Some(dir) => dir,
        None => {
            eprintln!("Usage: validate_bank <directory>");
            return ExitCode::from(2);
        }
    };

    let mut entries: Vec<_> = match fs::read_dir(&dir) {
        Ok(entries) => entries.filter_map(Result::ok).collect(),
        Err(e) => {
            eprintln!("Cannot read directory {}: {}", dir, e);
            return ExitCode::from(2);
        }
    };
    entries.sort_by_key(|entry| entry.path());

    let mut violations = 0usize;
    let mut files = 0usize;
    for entry in entries {
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        files += 1;
        violations += check_file(&path);
    }

    if violations > 0 {
        println!("{} violation(s) across {} file(s)", violations, files);
        ExitCode::FAILURE
    } else {
        println!("All {} file(s) passed", files);
        ExitCode::SUCCESS
    }
}

fn check_file(path: &Path) -> usize {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            println!("{}: unreadable: {}", path.display(), e);
            return 1;
        }
    };
    let problems = check_records(&raw);
    for problem in &problems {
        println!("{}: {}", path.display(), problem);
    }
    problems.len()
}

/// Per-record invariant checks on one file's worth of JSON. Returns one
/// message per violation.
fn check_records(raw: &str) -> Vec<String> {
    let records = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(records)) => records,
        Ok(_) => return vec!["top-level value is not a list".to_string()],
        Err(e) => return vec![format!("not valid JSON: {}", e)],
    };

    let mut problems = Vec::new();
    let mut seen_ids = HashSet::new();
    for (index, record) in records.iter().enumerate() {
        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .filter(|field| record.get(**field).is_none())
            .copied()
            .collect();
        for field in &missing {
            problems.push(format!("record {}: missing field '{}'", index, field));
        }
        if !missing.is_empty() {
            continue;
        }

        match serde_json::from_value::<Question>(record.clone()) {
            Ok(question) => {
                if !seen_ids.insert(question.id) {
                    problems.push(format!("record {}: duplicate id {}", index, question.id));
                }
                if let Err(reason) = validate_question(&question) {
                    problems.push(format!("record {}: {}", index, reason));
                }
            }
            Err(e) => problems.push(format!("record {}: malformed: {}", index, e)),
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_file_has_no_problems() {
        let raw = r#"[
            {"id": 1, "text": "2+2?", "options": ["3", "4"], "correct_index": 1, "block": 1, "topic": 1}
        ]"#;
        assert!(check_records(raw).is_empty());
    }

    #[test]
    fn missing_fields_are_reported_per_record() {
        let raw = r#"[{"id": 1, "text": "2+2?"}]"#;
        let problems = check_records(raw);
        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p.contains("missing field 'options'")));
        assert!(problems.iter().any(|p| p.contains("missing field 'topic'")));
    }

    #[test]
    fn out_of_range_correct_index_is_a_violation() {
        let raw = r#"[
            {"id": 1, "text": "2+2?", "options": ["3", "4"], "correct_index": 5, "block": 1, "topic": 1}
        ]"#;
        let problems = check_records(raw);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("out of range"));
    }

    #[test]
    fn duplicate_ids_are_a_violation() {
        let raw = r#"[
            {"id": 1, "text": "a?", "options": ["x", "y"], "correct_index": 0, "block": 1, "topic": 1},
            {"id": 1, "text": "b?", "options": ["x", "y"], "correct_index": 0, "block": 1, "topic": 1}
        ]"#;
        let problems = check_records(raw);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("duplicate id 1"));
    }

    #[test]
    fn wrong_field_types_are_reported() {
        let raw = r#"[
            {"id": 1, "text": "a?", "options": ["x", "y"], "correct_index": "b", "block": 1, "topic": 1}
        ]"#;
        let problems = check_records(raw);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("malformed"));
    }

    #[test]
    fn non_list_top_level_is_rejected() {
        assert_eq!(check_records("{}").len(), 1);
        assert_eq!(check_records("garbage").len(), 1);
    }
}
