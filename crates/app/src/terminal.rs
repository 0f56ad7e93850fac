use std::error::Error;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::time::MissedTickBehavior;

use exam_core::model::{
    AttemptReview, MaterialId, Phase, QuestionKind, SubmitTrigger, is_answered,
};
use services::{ControllerError, EntryView, SessionNotifier, SubmitOutcome, TestSessionController};

/// Prints controller notifications straight to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl SessionNotifier for ConsoleNotifier {
    fn auto_submit_notice(&self, _material_id: &MaterialId) {
        println!();
        println!("Time is up. Your answers are being submitted automatically.");
    }

    fn submitted(&self, _material_id: &MaterialId, _trigger: SubmitTrigger) {
        println!("Your answers were submitted.");
    }

    fn submission_failed(&self, _material_id: &MaterialId, message: &str) {
        println!("{message}");
        println!("Type `s` to try again.");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Start,
    Next,
    Prev,
    /// Zero-based target; the controller clamps it.
    Goto(i64),
    Answer(String),
    Submit,
    Time,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "" => Input::Empty,
        "start" => Input::Start,
        "n" | "next" => Input::Next,
        "p" | "prev" => Input::Prev,
        "g" | "go" => match rest.parse::<i64>() {
            Ok(number) => Input::Goto(number.saturating_sub(1)),
            Err(_) => Input::Unknown(line.to_owned()),
        },
        "a" | "answer" => Input::Answer(rest.to_owned()),
        "s" | "submit" => Input::Submit,
        "t" | "time" => Input::Time,
        "h" | "help" | "?" => Input::Help,
        "q" | "quit" => Input::Quit,
        _ => Input::Unknown(line.to_owned()),
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn print_help() {
    println!("Commands:");
    println!("  n / p        next / previous question");
    println!("  g <number>   go to question <number>");
    println!("  a <text>     answer the current question (choice number or free text)");
    println!("  t            show remaining time and progress");
    println!("  s            submit your answers");
    println!("  q            leave without submitting");
}

fn print_review(review: &AttemptReview) {
    println!("You already completed this test. Your submitted answers:");
    for item in &review.items {
        println!();
        println!("{}. {}", item.ordinal, item.prompt);
        for (i, choice) in item.choices.iter().enumerate() {
            println!("   {}) {choice}", i + 1);
        }
        match &item.submitted_answer {
            Some(answer) if is_answered(answer) => println!("   Your answer: {answer}"),
            _ => println!("   Your answer: (none)"),
        }
    }
}

fn print_question(controller: &TestSessionController) {
    let index = controller.current_index();
    let question = controller.current_question();
    println!();
    println!(
        "Question {}/{}  [{}]",
        index + 1,
        controller.question_count(),
        controller.remaining_display()
    );
    println!("{}", question.prompt());
    if question.kind() == QuestionKind::MultipleChoice {
        for (i, choice) in question.choices().iter().enumerate() {
            println!("  {}) {choice}", i + 1);
        }
    }
    match controller.answer(index) {
        Some(answer) if is_answered(&answer) => println!("Current answer: {answer}"),
        _ => println!("Not answered yet."),
    }
}

fn print_status(controller: &TestSessionController) {
    let progress = controller.progress();
    println!(
        "Time left {}; answered {}/{}",
        controller.remaining_display(),
        progress.answered,
        progress.total
    );
}

fn report(err: &ControllerError) {
    log::debug!("command failed: {err}");
    println!("{}", err.user_message());
}

async fn confirm_submit<R>(
    controller: &TestSessionController,
    lines: &mut Lines<R>,
) -> Result<(), Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
{
    let progress = controller.progress();
    if progress.unanswered > 0 {
        println!("{} question(s) are still unanswered.", progress.unanswered);
    }
    println!("Submit your answers now? [y/N]");
    let Some(reply) = lines.next_line().await? else {
        return Ok(());
    };
    if !is_yes(&reply) {
        println!("Submission cancelled.");
        return Ok(());
    }

    match controller.submit(SubmitTrigger::Manual).await {
        Ok(SubmitOutcome::Submitted) => {}
        Ok(SubmitOutcome::Ignored) => println!("Your answers are already being submitted."),
        // the notifier already told the student what went wrong
        Err(ControllerError::SubmissionFailed(_)) => {}
        Err(err) => report(&err),
    }
    Ok(())
}

async fn handle_input<R>(
    controller: &TestSessionController,
    lines: &mut Lines<R>,
    input: Input,
) -> Result<Flow, Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
{
    match input {
        Input::Empty => {}
        Input::Start => println!("The test is already running."),
        Input::Next | Input::Prev => {
            let delta = if input == Input::Next { 1 } else { -1 };
            match controller.step(delta) {
                Ok(_) => print_question(controller),
                Err(err) => report(&err),
            }
        }
        Input::Goto(index) => match controller.set_current_index(index) {
            Ok(_) => print_question(controller),
            Err(err) => report(&err),
        },
        Input::Answer(text) => match controller.answer_current(text) {
            Ok(()) => println!("Saved."),
            Err(err) => report(&err),
        },
        Input::Submit => confirm_submit(controller, lines).await?,
        Input::Time => print_status(controller),
        Input::Help => print_help(),
        Input::Quit => {
            if controller.phase() == Phase::InProgress {
                println!("Leaving without submitting. Your answers were not sent.");
            }
            return Ok(Flow::Quit);
        }
        Input::Unknown(line) => println!("Unknown command `{line}`. Type `help` for a list."),
    }
    Ok(Flow::Continue)
}

/// Drive one attempt interactively on stdin/stdout until it is submitted or the
/// student quits.
///
/// # Errors
///
/// Returns an error when stdin cannot be read or the attempt cannot be started.
pub async fn run_attempt(controller: TestSessionController) -> Result<(), Box<dyn Error>> {
    println!("{}", controller.title());
    let description = controller.description();
    if !description.is_empty() {
        println!("{description}");
    }

    if let EntryView::Results(review) = controller.entry() {
        print_review(&review);
        return Ok(());
    }

    println!(
        "{} question(s), {} to complete. Type `start` to begin or `q` to quit.",
        controller.question_count(),
        controller.remaining_display()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        match parse_input(&line) {
            Input::Start => break,
            Input::Quit => return Ok(()),
            _ => println!("Type `start` to begin or `q` to quit."),
        }
    }

    controller.start()?;
    print_help();
    print_question(&controller);

    let mut status = tokio::time::interval(Duration::from_secs(1));
    status.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut warned = false;

    while controller.phase() != Phase::Submitted {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if handle_input(&controller, &mut lines, parse_input(&line)).await? == Flow::Quit {
                    break;
                }
            }
            _ = status.tick() => {
                if !warned && controller.is_low_time() {
                    warned = true;
                    println!("Less than five minutes left ({}).", controller.remaining_display());
                }
            }
        }
    }

    Ok(())
}
