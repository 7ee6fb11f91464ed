//! Merges per-topic question files into the combined bank the bot loads.
//!
//! Usage: `merge_bank <directory> <output.json>`
//!
//! Input files follow the `block<B>_topic<T>.json` naming convention and
//! hold partial records `{text, options, correct_index}`. The block and
//! topic come from the filename; ids are assigned sequentially across the
//! whole merged bank, ordered by block then topic.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use regex::Regex;
use serde::Deserialize;

use rust_quizbot::quiz::bank::validate_question;
use rust_quizbot::quiz::Question;

#[derive(Debug, Deserialize)]
struct PartialQuestion {
    text: String,
    options: Vec<String>,
    correct_index: usize,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: merge_bank <directory> <output.json>");
        return ExitCode::from(2);
    }

    match run(&args[1], &args[2]) {
        Ok(count) => {
            println!("Merged {} questions into {}", count, args[2]);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(dir: &str, out: &str) -> Result<usize, String> {
    let name_re = Regex::new(r"^block(\d+)_topic(\d+)\.json$").unwrap();

    let mut files: Vec<(u32, u32, PathBuf)> = fs::read_dir(dir)
        .map_err(|e| format!("Cannot read directory {}: {}", dir, e))?
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.file_name()?.to_str()?.to_string();
            let (block, topic) = parse_file_name(&name_re, &name)?;
            Some((block, topic, path))
        })
        .collect();
    if files.is_empty() {
        return Err(format!("No block<B>_topic<T>.json files found in {}", dir));
    }
    files.sort();

    let mut merged: Vec<Question> = Vec::new();
    let mut next_id = 1u32;
    for (block, topic, path) in files {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("{}: unreadable: {}", path.display(), e))?;
        let partials: Vec<PartialQuestion> = serde_json::from_str(&raw)
            .map_err(|e| format!("{}: not a valid question list: {}", path.display(), e))?;

        for partial in partials {
            let question = Question::new(
                next_id,
                partial.text,
                partial.options,
                partial.correct_index,
                block,
                topic,
            );
            // Broken source records are a merge failure, not something to
            // smuggle into the combined bank.
            validate_question(&question)
                .map_err(|reason| format!("{}: record {}: {}", path.display(), next_id, reason))?;
            merged.push(question);
            next_id += 1;
        }
    }

    let json = serde_json::to_string_pretty(&merged)
        .map_err(|e| format!("Serialization failed: {}", e))?;
    fs::write(out, json).map_err(|e| format!("Cannot write {}: {}", out, e))?;
    Ok(merged.len())
}

fn parse_file_name(re: &Regex, name: &str) -> Option<(u32, u32)> {
    let caps = re.captures(name)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_re() -> Regex {
        Regex::new(r"^block(\d+)_topic(\d+)\.json$").unwrap()
    }

    #[test]
    fn filename_convention_is_parsed() {
        let re = name_re();
        assert_eq!(parse_file_name(&re, "block1_topic9.json"), Some((1, 9)));
        assert_eq!(parse_file_name(&re, "block4_topic10.json"), Some((4, 10)));
    }

    #[test]
    fn other_filenames_are_skipped() {
        let re = name_re();
        assert_eq!(parse_file_name(&re, "notes.json"), None);
        assert_eq!(parse_file_name(&re, "block1_topic2.txt"), None);
        assert_eq!(parse_file_name(&re, "block_topic2.json"), None);
    }
}
