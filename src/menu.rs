use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::quiz::{BlockChoice, Question, Summary};

/// Quantities offered on the quantity menu.
pub const OFFERED_QUANTITIES: [usize; 2] = [50, 100];

pub const BLOCKS: [u32; 4] = [1, 2, 3, 4];

/// A parsed callback payload. The wire forms are `block:<b|random>`,
/// `topic:<t>`, `qty:<n>` and `ans:<i>`.
#[derive(Debug, PartialEq, Eq)]
pub enum MenuClick {
    Block(BlockChoice),
    Topic(u32),
    Quantity(usize),
    Answer(usize),
}

pub fn parse_click(data: &str) -> Option<MenuClick> {
    let (kind, value) = data.split_once(':')?;
    match kind {
        "block" if value == "random" => Some(MenuClick::Block(BlockChoice::Random)),
        "block" => value.parse().ok().map(|b| MenuClick::Block(BlockChoice::Block(b))),
        "topic" => value.parse().ok().map(MenuClick::Topic),
        "qty" => value.parse().ok().map(MenuClick::Quantity),
        "ans" => value.parse().ok().map(MenuClick::Answer),
        _ => None,
    }
}

pub fn block_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = BLOCKS
        .iter()
        .map(|block| {
            vec![InlineKeyboardButton::callback(
                format!("Block {}", block),
                format!("block:{}", block),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        "Random (whole bank)",
        "block:random",
    )]);
    InlineKeyboardMarkup::new(rows)
}

pub fn topic_keyboard(topics: &[u32]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = topics
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .map(|topic| {
                    InlineKeyboardButton::callback(
                        format!("Topic {}", topic),
                        format!("topic:{}", topic),
                    )
                })
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

pub fn quantity_keyboard() -> InlineKeyboardMarkup {
    let row = OFFERED_QUANTITIES
        .iter()
        .map(|n| InlineKeyboardButton::callback(n.to_string(), format!("qty:{}", n)))
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(vec![row])
}

/// Numbered answer buttons. Option texts go into the message body, the
/// buttons only carry the number (option texts can blow past the button
/// label limit).
pub fn answer_keyboard(option_count: usize) -> InlineKeyboardMarkup {
    let row = (0..option_count)
        .map(|i| InlineKeyboardButton::callback((i + 1).to_string(), format!("ans:{}", i)))
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(vec![row])
}

pub fn format_question(number: usize, total: usize, question: &Question) -> String {
    let options = question
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{}) {}", i + 1, option))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Question {}/{}\n\n{}\n\n{}",
        number + 1,
        total,
        question.text,
        options
    )
}

pub fn format_summary(summary: &Summary) -> String {
    format!(
        "Test finished! Correct answers: {} of {} ({}%).",
        summary.correct, summary.asked, summary.percent
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_payloads_round_trip() {
        assert_eq!(
            parse_click("block:random"),
            Some(MenuClick::Block(BlockChoice::Random))
        );
        assert_eq!(
            parse_click("block:2"),
            Some(MenuClick::Block(BlockChoice::Block(2)))
        );
        assert_eq!(parse_click("topic:7"), Some(MenuClick::Topic(7)));
        assert_eq!(parse_click("qty:50"), Some(MenuClick::Quantity(50)));
        assert_eq!(parse_click("ans:0"), Some(MenuClick::Answer(0)));
    }

    #[test]
    fn garbage_payloads_are_ignored() {
        assert_eq!(parse_click("nope"), None);
        assert_eq!(parse_click("block:banana"), None);
        assert_eq!(parse_click("something:1"), None);
    }

    #[test]
    fn question_text_numbers_the_options() {
        let question = Question::new(
            1,
            "2+2?".to_string(),
            vec!["3".to_string(), "4".to_string()],
            1,
            1,
            1,
        );
        let text = format_question(0, 2, &question);
        assert!(text.starts_with("Question 1/2"));
        assert!(text.contains("1) 3"));
        assert!(text.contains("2) 4"));
    }

    #[test]
    fn summary_shows_counts_and_percent() {
        let text = format_summary(&Summary::new(2, 3));
        assert!(text.contains("2 of 3"));
        assert!(text.contains("67%"));
    }
}
