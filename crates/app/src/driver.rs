//! Line-oriented terminal front end for a quiz session.

use std::error::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use quiz_core::QuestionBank;
use quiz_core::model::{AnswerOption, ChapterId, HistoryEntry, HistoryStore, QuizMode, SessionState};
use quiz_core::scoring::format_time;
use services::{AppServices, CompletedQuiz, QuizWorkflow, WorkflowError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Answer(AnswerOption),
    Next,
    Previous,
    GoTo(usize),
    Submit,
    Quit,
    Help,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "n" | "next" => Input::Next,
        "p" | "prev" => Input::Previous,
        "s" | "submit" => Input::Submit,
        "q" | "quit" => Input::Quit,
        "h" | "help" | "?" => Input::Help,
        lower => {
            if let Ok(option) = lower.to_ascii_uppercase().parse::<AnswerOption>() {
                return Input::Answer(option);
            }
            lower
                .strip_prefix("g ")
                .or_else(|| lower.strip_prefix("goto "))
                .and_then(|n| n.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .map_or_else(|| Input::Unknown(trimmed.to_owned()), Input::GoTo)
        }
    }
}

fn print_controls() {
    println!("  a/b/c/d  choose an answer");
    println!("  n        next question (or just Enter)");
    println!("  p        previous question");
    println!("  g <n>    go to question n");
    println!("  s        submit and see the score");
    println!("  q        quit without submitting");
}

/// Drive an in-progress session from stdin until it is submitted, quit or timed out.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or the session cannot be completed.
pub async fn run_session(flow: &mut QuizWorkflow) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut countdown = flow.time_remaining();
    let mode = flow.with_session(|s| s.mode());
    print_controls();

    loop {
        render_current(flow);
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = time_up(countdown.as_mut()) => {
                println!("\nTime is up.");
                break;
            }
        };
        let Some(line) = line else {
            return Ok(());
        };

        let outcome = match parse_input(&line) {
            Input::Answer(option) => answer_current(flow, option, mode).await,
            Input::Next => flow.next().await.map(drop),
            Input::Previous => flow.previous().await.map(drop),
            Input::GoTo(n) => flow.go_to(n - 1).await.map(drop),
            Input::Submit => break,
            Input::Quit => {
                if mode == QuizMode::Practice {
                    println!("Progress saved. Run the same command to continue.");
                }
                return Ok(());
            }
            Input::Help => {
                print_controls();
                Ok(())
            }
            Input::Unknown(raw) => {
                println!("Unrecognised input {raw:?}; type h for help.");
                Ok(())
            }
        };
        if let Err(err) = outcome {
            println!("{err}");
            if flow.state() == SessionState::Completed {
                break;
            }
        }
    }

    let done = flow.complete().await?;
    print_result(&done);
    Ok(())
}

async fn time_up(countdown: Option<&mut watch::Receiver<Option<u32>>>) {
    if let Some(rx) = countdown {
        if rx.wait_for(|left| *left == Some(0)).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await;
}

async fn answer_current(
    flow: &mut QuizWorkflow,
    option: AnswerOption,
    mode: QuizMode,
) -> Result<(), WorkflowError> {
    let Some((id, key)) = flow.with_session(|s| {
        s.current_question()
            .map(|q| (q.id().clone(), q.correct_answer()))
    }) else {
        return Ok(());
    };
    flow.answer(&id, option).await?;

    // Practice gives immediate feedback; exams only reveal answers at the end.
    if mode == QuizMode::Practice {
        if option == key {
            println!("Correct.");
        } else {
            println!("Incorrect, the answer is {key}.");
        }
    }
    Ok(())
}

fn render_current(flow: &QuizWorkflow) {
    flow.with_session(|s| {
        let Some(question) = s.current_question() else {
            return;
        };
        let progress = s.progress();
        let clock = s
            .time_remaining()
            .map(|left| format!("  [{} left]", format_time(u64::from(left))))
            .unwrap_or_default();
        let chosen = s.answer_for(question.id());

        println!();
        println!(
            "Question {}/{}  ({} answered){clock}",
            s.current_index() + 1,
            progress.total,
            progress.answered
        );
        println!("{}", question.text());
        for (option, text) in question.options() {
            let marker = if chosen == Some(option) { '*' } else { ' ' };
            println!(" {marker} {option}) {text}");
        }
    });
}

fn print_result(done: &CompletedQuiz) {
    let result = &done.result;
    println!();
    println!(
        "Score: {}/{} ({}%) in {}",
        result.correct,
        result.total,
        result.percentage,
        format_time(result.time_spent_secs)
    );
    for (index, review) in result.answers.iter().enumerate() {
        if review.is_correct {
            continue;
        }
        let given = review
            .user_answer
            .map_or_else(|| "-".to_owned(), |a| a.to_string());
        println!(
            "  {:>3}. {} (yours: {given}, correct: {})",
            index + 1,
            review.question.text(),
            review.correct_answer
        );
    }
    match &done.entry {
        Some(entry) => println!("Saved as {}.", entry.id),
        None => println!("The result could not be saved."),
    }
}

pub fn print_history(store: &HistoryStore) {
    if store.all_results.is_empty() {
        println!("No results yet.");
        return;
    }
    for mode in [QuizMode::Practice, QuizMode::Exam] {
        if let Some(latest) = store.latest(mode) {
            println!(
                "latest {mode}: {}% on {}",
                latest.percentage,
                latest.date.format("%Y-%m-%d %H:%M")
            );
        }
    }
    println!();
    for entry in &store.all_results {
        let scope = entry
            .chapter
            .map_or_else(|| "exam".to_owned(), |c| format!("chapter {c}"));
        println!(
            "{:<22} {}  {:<10} {:>3}/{:<3} {:>3}%  {}",
            entry.id,
            entry.date.format("%Y-%m-%d %H:%M"),
            scope,
            entry.correct,
            entry.total,
            entry.percentage,
            entry.time_spent_formatted
        );
    }
}

pub fn print_entry(entry: &HistoryEntry, bank: &QuestionBank) {
    println!(
        "{} ({}) on {}: {}/{} correct, {}%, {}",
        entry.id,
        entry.mode,
        entry.date.format("%Y-%m-%d %H:%M"),
        entry.correct,
        entry.total,
        entry.percentage,
        entry.time_spent_formatted
    );
    for (index, reviewed) in entry.review(bank).iter().enumerate() {
        let answer = reviewed.answer;
        println!();
        println!("{}. {}", index + 1, answer.question_text);
        match reviewed.question {
            Some(question) => {
                for (option, text) in question.options() {
                    println!("   {option}) {text}");
                }
            }
            None => println!("   (question no longer in the bank)"),
        }
        let letter = |a: Option<AnswerOption>| a.map_or_else(|| "-".to_owned(), |a| a.to_string());
        println!(
            "   yours: {}  correct: {}  {}",
            letter(answer.user_answer),
            letter(answer.correct_answer),
            if answer.is_correct { "ok" } else { "wrong" }
        );
    }
}

pub async fn print_progress(services: &AppServices) {
    let store = services.history().load().await;
    let questions = services.questions();
    for chapter in ChapterId::ALL {
        let count = questions.chapter_question_count(chapter);
        if count == 0 {
            println!("chapter {chapter}: unavailable");
            continue;
        }
        match store.chapter_progress.get(&chapter) {
            Some(progress) => println!(
                "chapter {chapter}: {}/{count} answered, {} correct, {} incorrect (at question {}, updated {})",
                progress.total_answered,
                progress.correct_count,
                progress.incorrect_count,
                progress.current_index + 1,
                progress.last_updated.format("%Y-%m-%d %H:%M"),
            ),
            None => println!("chapter {chapter}: {count} questions, not started"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_case_insensitive_answers() {
        assert_eq!(parse_input("b"), Input::Answer(AnswerOption::B));
        assert_eq!(parse_input(" D \n"), Input::Answer(AnswerOption::D));
    }

    #[test]
    fn navigation_commands() {
        assert_eq!(parse_input(""), Input::Next);
        assert_eq!(parse_input("P"), Input::Previous);
        assert_eq!(parse_input("g 12"), Input::GoTo(12));
        assert_eq!(parse_input("goto 3"), Input::GoTo(3));
        assert_eq!(parse_input("s"), Input::Submit);
    }

    #[test]
    fn go_to_zero_or_garbage_is_unknown() {
        assert_eq!(parse_input("g 0"), Input::Unknown("g 0".into()));
        assert_eq!(parse_input("e"), Input::Unknown("e".into()));
    }
}
