use crate::infra::{in_memory_service, parse_user, DEFAULT_USER};
use clap::Args;
use fin_advisor::config::AppConfig;
use fin_advisor::error::AppError;
use fin_advisor::workflows::advisor::slots::fields;
use fin_advisor::workflows::advisor::{EngineReply, SessionId};
use std::io::{BufRead, Write};

const DEMO_QUESTION: &str = "Can I afford to hire a new employee?";
const MAX_DEMO_TURNS: usize = 12;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Monthly payroll cost of the hire under consideration.
    #[arg(long, default_value_t = 20000.0)]
    pub(crate) payroll: f64,
    /// User the demo conversation runs as.
    #[arg(long, default_value = DEFAULT_USER)]
    pub(crate) user: String,
}

#[derive(Args, Debug)]
pub(crate) struct ChatArgs {
    /// User the conversation runs as.
    #[arg(long, default_value = DEFAULT_USER)]
    pub(crate) user: String,
    /// Session identifier; reuse it to continue an earlier dialogue.
    #[arg(long, default_value = "local-session")]
    pub(crate) session: String,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let user = parse_user(&args.user).map_err(invalid_input)?;
    let (service, repository) = in_memory_service(config.evaluation);
    let session = SessionId("demo-session".to_string());

    println!("Financial decision advisor demo");
    println!("> {}", DEMO_QUESTION);
    let mut reply = service.handle_turn(&user, &session, DEMO_QUESTION)?;
    println!("{}", render_reply(&reply));

    for _ in 0..MAX_DEMO_TURNS {
        let field = match &reply {
            EngineReply::DataNeeded { data_needed } => data_needed.field.clone(),
            _ => break,
        };
        let answer = demo_answer(&field, args.payroll);
        println!("> {}", answer);
        reply = service.handle_turn(&user, &session, &answer)?;
        println!("{}", render_reply(&reply));
    }

    println!("> try again");
    let retried = service.retry(&user, &session)?;
    println!("{}", render_reply(&retried));

    let snapshot = service.health_snapshot(&user)?;
    println!(
        "Stored baseline health score: {} ({})",
        snapshot.financial_health_score, snapshot.score_interpretation
    );
    println!(
        "Decisions recorded: {}, recommendations recorded: {}",
        repository.decisions().len(),
        repository.recommendation_count()
    );
    Ok(())
}

pub(crate) fn run_chat(args: ChatArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let user = parse_user(&args.user).map_err(invalid_input)?;
    let (service, _) = in_memory_service(config.evaluation);
    let session = SessionId(args.session);

    println!("Ask a financial question (\"cancel\" drops it, \"try again\" re-runs it, empty line exits).");
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        match service.handle_turn(&user, &session, &line) {
            Ok(reply) => println!("{}", render_reply(&reply)),
            Err(err) => println!("[{}] {}", err.code(), err.user_message()),
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    Ok(())
}

fn demo_answer(field: &str, payroll: f64) -> String {
    match field {
        fields::MONTHLY_REVENUE => "150000".to_string(),
        fields::MONTHLY_EXPENSES => "80000".to_string(),
        fields::OWNER_WITHDRAWALS => "10000".to_string(),
        fields::STAFF_PAYROLL => format!("{payroll}"),
        fields::CURRENT_SAVINGS => "60000".to_string(),
        _ => "0".to_string(),
    }
}

fn invalid_input(message: String) -> AppError {
    AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, message))
}

pub(crate) fn render_reply(reply: &EngineReply) -> String {
    match reply {
        EngineReply::DataNeeded { data_needed } => {
            let mut line = String::new();
            if let Some(error) = &data_needed.validation_error {
                line.push_str(&format!("({}) ", error));
            }
            line.push_str(&data_needed.prompt);
            if let Some(options) = &data_needed.options {
                line.push_str(&format!(" [{}]", options.join(" / ")));
            }
            line
        }
        EngineReply::Decision(result) => {
            let mut lines = vec![
                format!(
                    "{} ({}) - health score {} ({})",
                    result.decision_result,
                    result.decision_status,
                    result.financial_health_score,
                    result.score_interpretation
                ),
                format!("  {}", result.explanation),
            ];
            for step in &result.next_steps {
                lines.push(format!("  - {}", step));
            }
            for (metric, value) in &result.numeric_breakdown {
                lines.push(format!("  {}: {:.2}", metric, value));
            }
            lines.join("\n")
        }
        EngineReply::Clarification { clarification } => {
            let mut line = clarification.message.clone();
            if !clarification.suggested_actions.is_empty() {
                line.push_str(&format!(
                    " Try: {}",
                    clarification.suggested_actions.join("; ")
                ));
            }
            line
        }
        EngineReply::Cancelled { cancelled } => cancelled.message.clone(),
    }
}
