use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use chrono::Local;
use clap::Subcommand;
use quizgate_core::attempt::format_remaining;
use quizgate_core::clock::to_datetime;
use quizgate_core::{
    AttemptController, AttemptError, Answers, Config, CoreError, Database, Event, HttpSink,
    LockReason, SessionState, SubmitOutcome, SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Subcommand)]
pub enum AttemptAction {
    /// Print the current attempt state
    Status {
        /// Print the state snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the attempt with the student's full name
    Start {
        /// Full name (quotes optional)
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Grade the answers and send them to the collector
    Submit {
        /// One answer, e.g. --answer q1=B (repeatable)
        #[arg(long = "answer", value_name = "QID=OPTION")]
        answers: Vec<String>,
        /// JSON object of answers, e.g. {"q1": "B"}
        #[arg(long)]
        answers_file: Option<PathBuf>,
        /// Print the submitted payload as JSON
        #[arg(long)]
        json: bool,
    },
    /// Teacher reset: unlock a new attempt on this device
    Reset {
        /// Secret (prompted for when omitted)
        #[arg(long)]
        secret: Option<String>,
    },
    /// Take the quiz interactively with a live countdown
    Take,
}

fn open_controller() -> quizgate_core::error::Result<Arc<AttemptController>> {
    let config = Config::load()?;
    let sink = HttpSink::new(config.endpoint_url()?);
    let store = Database::open()?;
    Ok(Arc::new(AttemptController::new(
        config.attempt_settings(),
        Arc::new(store),
        Arc::new(SystemClock),
        Arc::new(sink),
    )))
}

/// Wrap an attempt error so it displays as the message the student sees.
fn status_error(err: AttemptError) -> CoreError {
    tracing::debug!(error = ?err, "attempt command failed");
    CoreError::from(err)
}

fn describe(state: &SessionState, student: Option<&str>) -> String {
    match state {
        SessionState::NotStarted => "Not started. Enter your name to begin.".to_string(),
        SessionState::InProgress { remaining_seconds } => format!(
            "In progress for {}. Time remaining: {}",
            student.unwrap_or("unknown"),
            format_remaining(*remaining_seconds)
        ),
        SessionState::Expired => "Time is up.".to_string(),
        SessionState::Locked => {
            "Locked: this device has already used its attempt. Ask the teacher to reset it."
                .to_string()
        }
    }
}

fn started_label(started_at_ms: i64) -> String {
    to_datetime(started_at_ms)
        .with_timezone(&Local)
        .format("%H:%M:%S")
        .to_string()
}

/// Parse `QID=OPTION`.
fn parse_answer(raw: &str) -> Result<(String, String), String> {
    let (question, option) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected QID=OPTION, got '{raw}'"))?;
    let (question, option) = (question.trim(), option.trim());
    if question.is_empty() || option.is_empty() {
        return Err(format!("expected QID=OPTION, got '{raw}'"));
    }
    Ok((question.to_string(), option.to_string()))
}

fn read_answers_file(path: &Path) -> quizgate_core::error::Result<Answers> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn collect_answers(flags: &[String], file: Option<&Path>) -> CliResult<Answers> {
    let mut answers = match file {
        Some(path) => read_answers_file(path)?,
        None => Answers::new(),
    };
    for raw in flags {
        let (question, option) = parse_answer(raw)?;
        answers.insert(question, option);
    }
    Ok(answers)
}

fn prompt_line(prompt: &str) -> CliResult<String> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn run(action: AttemptAction) -> CliResult {
    let controller = open_controller()?;

    match action {
        AttemptAction::Status { json } => {
            controller.resolve().map_err(status_error)?;
            let snapshot = controller.snapshot().map_err(status_error)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else if let Event::StateSnapshot {
                state,
                student_name,
                ..
            } = &snapshot
            {
                println!("{}", describe(state, student_name.as_deref()));
                if let (SessionState::InProgress { .. }, Some(started_at)) =
                    (state, controller.record().map_err(status_error)?.started_at)
                {
                    println!("Started at {}", started_label(started_at));
                }
            }
        }
        AttemptAction::Start { name } => {
            controller.resolve().map_err(status_error)?;
            let name = name.join(" ");
            let state = controller.start(&name).map_err(status_error)?;
            println!("{}", describe(&state, Some(name.trim())));
        }
        AttemptAction::Submit {
            answers,
            answers_file,
            json,
        } => {
            let answers = collect_answers(&answers, answers_file.as_deref())?;
            let outcome = controller.submit(answers).await.map_err(status_error)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.payload)?);
            } else {
                println!("{}", outcome.status_text());
            }
        }
        AttemptAction::Reset { secret } => {
            let secret = match secret {
                Some(secret) => secret,
                None => prompt_line("Teacher secret: ")?,
            };
            controller.reset(&secret).map_err(status_error)?;
            println!("New attempt unlocked on this device.");
        }
        AttemptAction::Take => take(&controller).await?,
    }
    Ok(())
}

type PendingSubmit<'a> =
    Pin<Box<dyn Future<Output = Result<SubmitOutcome, AttemptError>> + 'a>>;

/// Drive the outstanding submit, if any. Never resolves without one.
async fn poll_submit(
    pending: &mut Option<PendingSubmit<'_>>,
) -> Result<SubmitOutcome, AttemptError> {
    match pending {
        Some(submit) => submit.await,
        None => std::future::pending().await,
    }
}

const TAKE_HELP: &str = "Type QID=OPTION to answer (e.g. q1=B), 'answers' to review, \
'time' for the clock, 'submit' to send, 'quit' to leave (the clock keeps running).";

/// Interactive session. Ticks come from the controller's own task, and the
/// submit is polled as one more branch of the loop, so the countdown, the
/// expiry notice and Ctrl-C all stay live while a submission is awaited.
async fn take(controller: &Arc<AttemptController>) -> CliResult {
    let mut events = controller.subscribe();
    let state = controller.init().map_err(status_error)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    match state {
        SessionState::Locked | SessionState::Expired => {
            println!("{}", describe(&SessionState::Locked, None));
            controller.dispose();
            return Ok(());
        }
        SessionState::InProgress { remaining_seconds } => {
            let record = controller.record().map_err(status_error)?;
            println!(
                "Resuming attempt for {}. Time remaining: {}",
                record.student_name.as_deref().unwrap_or("unknown"),
                format_remaining(remaining_seconds)
            );
        }
        SessionState::NotStarted => loop {
            eprint!("Full name: ");
            std::io::stderr().flush()?;
            let Some(name) = lines.next_line().await? else {
                controller.dispose();
                return Ok(());
            };
            match controller.start(&name) {
                Ok(state) => {
                    println!("{}", describe(&state, Some(name.trim())));
                    break;
                }
                Err(err @ AttemptError::Validation { .. }) => println!("{}", err.status_text()),
                Err(err) => {
                    controller.dispose();
                    return Err(status_error(err).into());
                }
            }
        },
    }
    println!("{TAKE_HELP}");

    let mut answers = Answers::new();
    let mut submitting: Option<PendingSubmit<'_>> = None;
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(Event::Tick { remaining_seconds, .. }) => {
                    if remaining_seconds % 60 == 0 || remaining_seconds <= 10 {
                        println!("Time remaining: {}", format_remaining(remaining_seconds));
                    }
                }
                Ok(Event::AttemptLocked { reason: LockReason::Expired, .. }) => {
                    println!("{}", AttemptError::Expired.status_text());
                    break;
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event receiver lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            result = poll_submit(&mut submitting), if submitting.is_some() => {
                submitting = None;
                match result {
                    Ok(outcome) => {
                        println!("{}", outcome.status_text());
                        break;
                    }
                    Err(err) if err.is_recoverable() => println!("{}", status_error(err)),
                    Err(err) => {
                        println!("{}", err.status_text());
                        break;
                    }
                }
                if !stdin_open {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // Input closed: let an outstanding submit finish first.
                    stdin_open = false;
                    if submitting.is_none() {
                        break;
                    }
                    continue;
                };
                match line.trim() {
                    "" => {}
                    "quit" => break,
                    "time" => {
                        let state = controller.state().map_err(status_error)?;
                        println!("{}", describe(&state, None));
                    }
                    "answers" => {
                        for (question, option) in &answers {
                            println!("{question} = {option}");
                        }
                    }
                    "submit" if submitting.is_some() => println!("Still sending, please wait."),
                    "submit" => {
                        println!("Sending...");
                        submitting = Some(Box::pin(controller.submit(answers.clone())));
                    }
                    other => match parse_answer(other) {
                        Ok((question, option)) => {
                            answers.insert(question, option);
                        }
                        Err(msg) => println!("{msg}"),
                    },
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    controller.dispose();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_answer_splits_on_equals() {
        assert_eq!(
            parse_answer(" q1 = B "),
            Ok(("q1".to_string(), "B".to_string()))
        );
        assert!(parse_answer("q1").is_err());
        assert!(parse_answer("=B").is_err());
        assert!(parse_answer("q1=").is_err());
    }

    #[test]
    fn flags_override_file_answers() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(&path, r#"{"q1": "A", "q2": "C"}"#).unwrap();
        let answers = collect_answers(&["q1=B".to_string()], Some(&path)).unwrap();
        assert_eq!(answers.get("q1").map(String::as_str), Some("B"));
        assert_eq!(answers.get("q2").map(String::as_str), Some("C"));
    }

    #[test]
    fn describe_formats_countdown() {
        let text = describe(
            &SessionState::InProgress {
                remaining_seconds: 125,
            },
            Some("Ada Lovelace"),
        );
        assert!(text.contains("Ada Lovelace"));
        assert!(text.contains("02:05"));
    }
}
