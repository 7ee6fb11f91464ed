//! Heuristic converter from extracted question text plus a CSV answer key
//! to the per-topic JSON format `merge_bank` consumes.
//!
//! Usage: `convert_sheet <questions.txt> <answers.csv> <output.json>`
//!
//! The splitting is single-pass and deliberately simple: a question starts
//! at a line like `12.` or `12)`, an option at a line like `a)` or `b.`.
//! Continuation lines are appended to whatever came last. The answer key
//! has `number,letter` rows; letters map a -> 0, b -> 1 and so on.
//! Questions with fewer than two options, no key entry, or a key letter
//! past the option list are skipped with a warning.

use std::collections::HashMap;
use std::fs;
use std::process::ExitCode;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ConvertedQuestion {
    text: String,
    options: Vec<String>,
    correct_index: usize,
}

#[derive(Debug, PartialEq, Eq)]
struct DraftQuestion {
    number: u32,
    text: String,
    options: Vec<String>,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: convert_sheet <questions.txt> <answers.csv> <output.json>");
        return ExitCode::from(2);
    }

    match run(&args[1], &args[2], &args[3]) {
        Ok(count) => {
            println!("Wrote {} questions to {}", count, args[3]);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(questions_path: &str, answers_path: &str, out: &str) -> Result<usize, String> {
    let question_text = fs::read_to_string(questions_path)
        .map_err(|e| format!("Cannot read {}: {}", questions_path, e))?;
    let key_text = fs::read_to_string(answers_path)
        .map_err(|e| format!("Cannot read {}: {}", answers_path, e))?;

    let drafts = split_questions(&question_text);
    let key = parse_answer_key(&key_text);

    let mut converted = Vec::new();
    for draft in drafts {
        if draft.options.len() < 2 {
            eprintln!(
                "Skipping question {}: only {} option(s) found",
                draft.number,
                draft.options.len()
            );
            continue;
        }
        let correct_index = match key.get(&draft.number) {
            Some(&index) if index < draft.options.len() => index,
            Some(&index) => {
                eprintln!(
                    "Skipping question {}: answer letter #{} but only {} options",
                    draft.number,
                    index + 1,
                    draft.options.len()
                );
                continue;
            }
            None => {
                eprintln!("Skipping question {}: no answer key entry", draft.number);
                continue;
            }
        };
        converted.push(ConvertedQuestion {
            text: draft.text,
            options: draft.options,
            correct_index,
        });
    }

    let json = serde_json::to_string_pretty(&converted)
        .map_err(|e| format!("Serialization failed: {}", e))?;
    fs::write(out, json).map_err(|e| format!("Cannot write {}: {}", out, e))?;
    Ok(converted.len())
}

/// Splits the extracted sheet text into numbered drafts. Lines that match
/// neither pattern continue the previous question text or option.
fn split_questions(raw: &str) -> Vec<DraftQuestion> {
    let question_re = Regex::new(r"^\s*(\d+)[.)]\s*(.*)$").unwrap();
    let option_re = Regex::new(r"^\s*([a-z])[.)]\s+(.*)$").unwrap();

    let mut drafts: Vec<DraftQuestion> = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        // Options first: a `1.` line matches the question pattern, an `a)`
        // line only the option one.
        if let Some(caps) = option_re.captures(line) {
            if let Some(draft) = drafts.last_mut() {
                draft.options.push(caps[2].trim().to_string());
                continue;
            }
        }
        if let Some(caps) = question_re.captures(line) {
            if let Ok(number) = caps[1].parse() {
                drafts.push(DraftQuestion {
                    number,
                    text: caps[2].trim().to_string(),
                    options: Vec::new(),
                });
                continue;
            }
        }
        // Continuation line.
        if let Some(draft) = drafts.last_mut() {
            if let Some(option) = draft.options.last_mut() {
                option.push(' ');
                option.push_str(line.trim());
            } else {
                if !draft.text.is_empty() {
                    draft.text.push(' ');
                }
                draft.text.push_str(line.trim());
            }
        }
    }
    drafts
}

/// `number,letter` rows. Junk rows (headers, blanks) are ignored.
fn parse_answer_key(raw: &str) -> HashMap<u32, usize> {
    let mut key = HashMap::new();
    for line in raw.lines() {
        let mut fields = line.split(',');
        let number = fields.next().and_then(|f| f.trim().parse::<u32>().ok());
        let index = fields.next().and_then(letter_to_index);
        if let (Some(number), Some(index)) = (number, index) {
            key.insert(number, index);
        }
    }
    key
}

fn letter_to_index(letter: &str) -> Option<usize> {
    let c = letter.trim().chars().next()?.to_ascii_lowercase();
    if c.is_ascii_lowercase() {
        Some((c as u8 - b'a') as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_and_options_are_split() {
        let raw = "\
1. What is 2+2?
a) 3
b) 4

2) Capital of France?
a. London
b. Paris
c. Berlin
";
        let drafts = split_questions(raw);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].number, 1);
        assert_eq!(drafts[0].text, "What is 2+2?");
        assert_eq!(drafts[0].options, vec!["3", "4"]);
        assert_eq!(drafts[1].number, 2);
        assert_eq!(drafts[1].options.len(), 3);
    }

    #[test]
    fn wrapped_lines_continue_the_previous_piece() {
        let raw = "\
1. A question that keeps
going on the next line
a) short option
that also wraps
b) other
";
        let drafts = split_questions(raw);
        assert_eq!(drafts[0].text, "A question that keeps going on the next line");
        assert_eq!(drafts[0].options[0], "short option that also wraps");
    }

    #[test]
    fn answer_key_maps_letters_to_indexes() {
        let key = parse_answer_key("number,answer\n1,b\n2, c\n3,A\n");
        assert_eq!(key.get(&1), Some(&1));
        assert_eq!(key.get(&2), Some(&2));
        assert_eq!(key.get(&3), Some(&0));
    }

    #[test]
    fn junk_key_rows_are_ignored() {
        let key = parse_answer_key("\n,,\nnope,x\n5,?\n");
        assert!(key.get(&5).is_none());
        assert!(key.is_empty());
    }

    #[test]
    fn letter_mapping() {
        assert_eq!(letter_to_index("a"), Some(0));
        assert_eq!(letter_to_index(" d "), Some(3));
        assert_eq!(letter_to_index("1"), None);
        assert_eq!(letter_to_index(""), None);
    }
}
