use std::collections::HashMap;
use std::sync::Mutex;

use rand::seq::SliceRandom;
use thiserror::Error;

use super::bank::QuestionBank;
use super::{topics_in_block, AnswerRecord, BlockChoice, Question, Summary, TestSession};

/// Errors a user can run into while walking the test flow. None of them is
/// fatal and none of them changes state, except `EmptySelection` which sends
/// the user back to block selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("no active test session")]
    NoActiveSession,

    #[error("no questions match the selection")]
    EmptySelection,

    #[error("unexpected action for the current step")]
    InvalidTransition,
}

/// Where a user currently is in the block -> topic -> quantity -> questions
/// flow. One entry per user, created by `begin`.
#[derive(Debug, Clone)]
enum Stage {
    AwaitingBlock,
    AwaitingTopic {
        block: u32,
    },
    AwaitingQuantity {
        block: BlockChoice,
        topic: Option<u32>,
    },
    InProgress(TestSession),
}

/// Question sampling is injected so tests can run without real randomness.
pub trait Sampler: Send + Sync {
    /// Draws up to `n` questions from the pool, without replacement.
    fn draw(&self, pool: &[Question], n: usize) -> Vec<Question>;
}

/// Uniform sampling without replacement.
pub struct RandomSampler;

impl Sampler for RandomSampler {
    fn draw(&self, pool: &[Question], n: usize) -> Vec<Question> {
        pool.choose_multiple(&mut rand::thread_rng(), n)
            .cloned()
            .collect()
    }
}

/// What the delivery layer should show after a block was chosen.
#[derive(Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Topic menu for the chosen block. Empty for unknown blocks.
    Topics(Vec<u32>),
    /// Random mode skips the topic step.
    Quantity,
}

/// A question to put in front of the user, with its position in the run.
#[derive(Debug)]
pub struct NextQuestion {
    pub number: usize,
    pub total: usize,
    pub question: Question,
}

#[derive(Debug)]
pub enum Progress {
    Next(NextQuestion),
    Finished(Summary),
}

/// The outcome of one submitted answer.
#[derive(Debug)]
pub struct Answered {
    pub was_correct: bool,
    pub correct_option: String,
    pub progress: Progress,
}

/// The per-user session store plus the transition rules. A single mutex over
/// the map is enough here: every transition is a pure in-memory operation, so
/// holding the lock for its duration gives the required per-user exclusion.
pub struct TestFlow {
    stages: Mutex<HashMap<u64, Stage>>,
    sampler: Box<dyn Sampler>,
}

impl TestFlow {
    pub fn new(sampler: Box<dyn Sampler>) -> Self {
        Self {
            stages: Mutex::new(HashMap::new()),
            sampler,
        }
    }

    /// Starts (or restarts) the selection flow. Any existing session for
    /// this user is silently replaced.
    pub fn begin(&self, user: u64) {
        self.stages
            .lock()
            .unwrap()
            .insert(user, Stage::AwaitingBlock);
    }

    pub fn select_block(&self, user: u64, block: BlockChoice) -> Result<BlockOutcome, FlowError> {
        let mut stages = self.stages.lock().unwrap();
        match stages.get(&user) {
            Some(Stage::AwaitingBlock) => {}
            _ => return Err(FlowError::InvalidTransition),
        }
        match block {
            BlockChoice::Random => {
                stages.insert(user, Stage::AwaitingQuantity { block, topic: None });
                Ok(BlockOutcome::Quantity)
            }
            BlockChoice::Block(number) => {
                stages.insert(user, Stage::AwaitingTopic { block: number });
                Ok(BlockOutcome::Topics((1..=topics_in_block(number)).collect()))
            }
        }
    }

    pub fn select_topic(&self, user: u64, topic: u32) -> Result<(), FlowError> {
        let mut stages = self.stages.lock().unwrap();
        let block = match stages.get(&user) {
            Some(Stage::AwaitingTopic { block }) => *block,
            _ => return Err(FlowError::InvalidTransition),
        };
        stages.insert(
            user,
            Stage::AwaitingQuantity {
                block: BlockChoice::Block(block),
                topic: Some(topic),
            },
        );
        Ok(())
    }

    /// Filters the bank by the recorded block/topic, draws at most `n`
    /// questions and opens the session. An empty filtered set sends the user
    /// back to block selection.
    pub fn select_quantity(
        &self,
        user: u64,
        n: usize,
        bank: &QuestionBank,
    ) -> Result<NextQuestion, FlowError> {
        let mut stages = self.stages.lock().unwrap();
        let (block, topic) = match stages.get(&user) {
            Some(Stage::AwaitingQuantity { block, topic }) => (*block, *topic),
            _ => return Err(FlowError::InvalidTransition),
        };
        // The menu never offers 0, but the payload can be forged.
        if n == 0 {
            return Err(FlowError::InvalidTransition);
        }

        let pool = bank.filter(block, topic);
        if pool.is_empty() {
            stages.insert(user, Stage::AwaitingBlock);
            return Err(FlowError::EmptySelection);
        }

        let questions = self.sampler.draw(&pool, n.min(pool.len()));
        let total = questions.len();
        let first = questions[0].clone();
        stages.insert(
            user,
            Stage::InProgress(TestSession {
                questions,
                current_question: 0,
                answers: Vec::new(),
                score: 0,
                block,
                topic,
                requested_count: n,
            }),
        );
        Ok(NextQuestion {
            number: 0,
            total,
            question: first,
        })
    }

    pub fn submit_answer(&self, user: u64, chosen_index: usize) -> Result<Answered, FlowError> {
        let mut stages = self.stages.lock().unwrap();
        let session = match stages.get_mut(&user) {
            Some(Stage::InProgress(session)) => session,
            _ => return Err(FlowError::NoActiveSession),
        };

        let question = &session.questions[session.current_question];
        let was_correct = chosen_index == question.correct_index;
        let correct_option = question.options[question.correct_index].clone();
        session.answers.push(AnswerRecord {
            question_index: session.current_question,
            chosen_index,
            correct_index: question.correct_index,
            was_correct,
        });
        if was_correct {
            session.score += 1;
        }
        session.current_question += 1;

        let progress = if session.current_question == session.questions.len() {
            let summary = Summary::new(session.score, session.questions.len());
            stages.remove(&user);
            Progress::Finished(summary)
        } else {
            let number = session.current_question;
            Progress::Next(NextQuestion {
                number,
                total: session.questions.len(),
                question: session.questions[number].clone(),
            })
        };

        Ok(Answered {
            was_correct,
            correct_option,
            progress,
        })
    }

    /// Drops whatever state the user has. Returns whether there was anything
    /// to cancel; calling it with no entry is fine.
    pub fn cancel(&self, user: u64) -> bool {
        self.stages.lock().unwrap().remove(&user).is_some()
    }

    /// Whether the user currently has a question in front of them.
    pub fn has_active_session(&self, user: u64) -> bool {
        matches!(
            self.stages.lock().unwrap().get(&user),
            Some(Stage::InProgress(_))
        )
    }
}
