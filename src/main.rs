use std::sync::{Arc, RwLock};

use dotenv::dotenv;
use teloxide::{prelude::*, types::User, utils::command::BotCommands};

use rust_quizbot::auth::{AuditLog, AuthRegistry};
use rust_quizbot::menu::{self, MenuClick};
use rust_quizbot::quiz::bank::QuestionBank;
use rust_quizbot::quiz::machine::{BlockOutcome, FlowError, Progress, RandomSampler, TestFlow};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Everything the handlers need. Built once in `main` and handed to the
/// dispatcher through `dptree::deps!`, so there are no ambient globals.
struct App {
    registry: AuthRegistry,
    audit: AuditLog,
    bank: RwLock<QuestionBank>,
    flow: TestFlow,
    bank_path: String,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
enum Command {
    #[command(description = "greeting and help")]
    Start,
    #[command(description = "start a test")]
    Test,
    #[command(description = "cancel the current test")]
    Cancel,
    #[command(description = "reload the question bank")]
    Reload,
}

const GREETING_TEXT: &str =
    "Hi! I run multiple-choice tests. Send /test to pick a block and start, /cancel to abort a running test.";
const DENIED_TEXT: &str = "You are not on the allow-list for this bot.";

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting quiz bot...");

    let bot = Bot::from_env();

    let registry = match std::env::var("AUTHORIZED_IDENTITIES") {
        Ok(raw) => AuthRegistry::from_config(&raw),
        Err(_) => {
            log::warn!("AUTHORIZED_IDENTITIES is not set, every command will be denied");
            AuthRegistry::empty()
        }
    };
    log::info!("Authorization registry holds {} entries", registry.len());

    let bank_path =
        std::env::var("QUESTION_BANK").unwrap_or_else(|_| "questions.json".to_string());
    let bank = match QuestionBank::load(&bank_path) {
        Ok(bank) => {
            log::info!("Loaded {} questions from {}", bank.len(), bank_path);
            bank
        }
        Err(e) => {
            // Degraded but alive: the bot runs with an empty bank until a
            // successful /reload.
            log::error!("Failed to load the question bank from {}: {}", bank_path, e);
            QuestionBank::default()
        }
    };

    let audit_path = std::env::var("AUDIT_LOG").unwrap_or_else(|_| "denied.log".to_string());
    let audit = AuditLog::open(&audit_path).expect("Failed to open the audit log file");

    let app = Arc::new(App {
        registry,
        audit,
        bank: RwLock::new(bank),
        flow: TestFlow::new(Box::new(RandomSampler)),
        bank_path,
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_callback_query().endpoint(handle_click));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// The authorization guard, run at the top of every handler. A denial is
/// logged and written to the audit file; the caller sends the refusal.
fn is_allowed(app: &App, user: &User, chat_id: ChatId) -> bool {
    let mut candidates = vec![user.id.0.to_string()];
    if let Some(username) = &user.username {
        candidates.push(username.clone());
        candidates.push(format!("@{}", username));
    }
    if app
        .registry
        .is_authorized(candidates.iter().map(String::as_str))
    {
        return true;
    }

    let identity = user.username.as_deref().unwrap_or(&user.first_name);
    log::warn!(
        "Denied command from {} (id {}) in chat {}",
        identity,
        user.id.0,
        chat_id
    );
    app.audit.record_denial(identity, user.id.0, chat_id.0);
    false
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, app: Arc<App>) -> HandlerResult {
    let user = match msg.from() {
        Some(user) => user,
        None => return Ok(()),
    };
    if !is_allowed(&app, user, msg.chat.id) {
        bot.send_message(msg.chat.id, DENIED_TEXT).await?;
        return Ok(());
    }

    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, GREETING_TEXT).await?;
        }
        Command::Test => {
            app.flow.begin(user.id.0);
            bot.send_message(msg.chat.id, "Choose a block:")
                .reply_markup(menu::block_keyboard())
                .await?;
        }
        Command::Cancel => {
            let text = if app.flow.cancel(user.id.0) {
                "Test cancelled."
            } else {
                "Nothing to cancel."
            };
            bot.send_message(msg.chat.id, text).await?;
        }
        Command::Reload => match QuestionBank::load(&app.bank_path) {
            Ok(bank) => {
                let count = bank.len();
                *app.bank.write().unwrap() = bank;
                log::info!("Question bank reloaded: {} questions", count);
                bot.send_message(
                    msg.chat.id,
                    format!("Question bank reloaded: {} questions.", count),
                )
                .await?;
            }
            Err(e) => {
                log::error!("Question bank reload failed: {}", e);
                bot.send_message(msg.chat.id, format!("Reload failed: {}", e))
                    .await?;
            }
        },
    }
    Ok(())
}

async fn handle_click(bot: Bot, q: CallbackQuery, app: Arc<App>) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let chat_id = match q.message.as_ref() {
        Some(msg) => msg.chat.id,
        None => return Ok(()),
    };
    if !is_allowed(&app, &q.from, chat_id) {
        bot.send_message(chat_id, DENIED_TEXT).await?;
        return Ok(());
    }
    let click = match q.data.as_deref().and_then(menu::parse_click) {
        Some(click) => click,
        // Stale or foreign payloads are silently dropped.
        None => return Ok(()),
    };
    let user = q.from.id.0;

    match click {
        MenuClick::Block(block) => match app.flow.select_block(user, block) {
            Ok(BlockOutcome::Topics(topics)) if topics.is_empty() => {
                bot.send_message(chat_id, "That block has no topics. Send /test to start over.")
                    .await?;
            }
            Ok(BlockOutcome::Topics(topics)) => {
                bot.send_message(chat_id, "Choose a topic:")
                    .reply_markup(menu::topic_keyboard(&topics))
                    .await?;
            }
            Ok(BlockOutcome::Quantity) => {
                bot.send_message(chat_id, "How many questions?")
                    .reply_markup(menu::quantity_keyboard())
                    .await?;
            }
            Err(e) => {
                bot.send_message(chat_id, flow_notice(&e)).await?;
            }
        },
        MenuClick::Topic(topic) => match app.flow.select_topic(user, topic) {
            Ok(()) => {
                bot.send_message(chat_id, "How many questions?")
                    .reply_markup(menu::quantity_keyboard())
                    .await?;
            }
            Err(e) => {
                bot.send_message(chat_id, flow_notice(&e)).await?;
            }
        },
        MenuClick::Quantity(n) => {
            // The read guard must not live across an await.
            let outcome = {
                let bank = app.bank.read().unwrap();
                app.flow.select_quantity(user, n, &bank)
            };
            match outcome {
                Ok(first) => {
                    bot.send_message(
                        chat_id,
                        menu::format_question(first.number, first.total, &first.question),
                    )
                    .reply_markup(menu::answer_keyboard(first.question.options.len()))
                    .await?;
                }
                Err(FlowError::EmptySelection) => {
                    bot.send_message(
                        chat_id,
                        "No questions match that selection. Choose a block again:",
                    )
                    .reply_markup(menu::block_keyboard())
                    .await?;
                }
                Err(e) => {
                    bot.send_message(chat_id, flow_notice(&e)).await?;
                }
            }
        }
        MenuClick::Answer(chosen_index) => match app.flow.submit_answer(user, chosen_index) {
            Ok(answered) => {
                let feedback = if answered.was_correct {
                    "Correct!".to_string()
                } else {
                    format!("Wrong. The correct answer was: {}", answered.correct_option)
                };
                bot.send_message(chat_id, feedback).await?;

                match answered.progress {
                    Progress::Next(next) => {
                        bot.send_message(
                            chat_id,
                            menu::format_question(next.number, next.total, &next.question),
                        )
                        .reply_markup(menu::answer_keyboard(next.question.options.len()))
                        .await?;
                    }
                    Progress::Finished(summary) => {
                        bot.send_message(chat_id, menu::format_summary(&summary))
                            .await?;
                    }
                }
            }
            Err(e) => {
                bot.send_message(chat_id, flow_notice(&e)).await?;
            }
        },
    }
    Ok(())
}

fn flow_notice(e: &FlowError) -> &'static str {
    match e {
        FlowError::NoActiveSession => "You have no active test. Send /test to start one.",
        FlowError::EmptySelection => "No questions match that selection.",
        FlowError::InvalidTransition => "That button doesn't fit where you are right now.",
    }
}
