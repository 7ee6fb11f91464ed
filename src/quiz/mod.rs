pub mod bank;
pub mod machine;

/// One multiple-choice question, as stored in the combined bank file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub block: u32,
    pub topic: u32,
}

impl Question {
    pub fn new(
        id: u32,
        text: String,
        options: Vec<String>,
        correct_index: usize,
        block: u32,
        topic: u32,
    ) -> Self {
        Self {
            id,
            text,
            options,
            correct_index,
            block,
            topic,
        }
    }
}

/// Block selector: one of the four fixed blocks, or the whole bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockChoice {
    Block(u32),
    Random,
}

/// How many topics each block has. Unknown blocks have none.
pub fn topics_in_block(block: u32) -> u32 {
    match block {
        1 => 9,
        2 => 5,
        3 => 9,
        4 => 10,
        _ => 0,
    }
}

/// One submitted answer, append-only within its session.
#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub question_index: usize,
    pub chosen_index: usize,
    pub correct_index: usize,
    pub was_correct: bool,
}

/// One user's in-progress test attempt. Holds its own copy of the sampled
/// questions, so a bank reload never touches a running test.
#[derive(Debug, Clone)]
pub struct TestSession {
    pub questions: Vec<Question>,
    pub current_question: usize,
    pub answers: Vec<AnswerRecord>,
    pub score: usize,
    pub block: BlockChoice,
    pub topic: Option<u32>,
    pub requested_count: usize,
}

/// Final result of a completed test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub correct: usize,
    pub asked: usize,
    pub percent: u32,
}

impl Summary {
    /// The percentage is over the questions actually asked in this run.
    pub fn new(correct: usize, asked: usize) -> Self {
        let percent = if asked == 0 {
            0
        } else {
            ((correct as f64 / asked as f64) * 100.0).round() as u32
        };
        Self {
            correct,
            asked,
            percent,
        }
    }
}
