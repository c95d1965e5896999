use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use frequency_quiz::{
    config::{get_config, init_config},
    dto::admin_dto::ResponseListParams,
    models::{quiz_response::QuizResponse, tier::Tier, user::UserData},
    services::{
        admin_service::AdminSession,
        persistence_service::{FileStorage, SessionPersistence},
        progression_service::QuizStore,
        report_service::{ReportOptions, ReportService},
        upgrade_service::UpgradeStatus,
    },
    utils::time::now,
    AppState,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use validator::Validate;

type Input = Lines<BufReader<Stdin>>;
type Store = QuizStore<FileStorage>;

enum Command {
    Quiz,
    Reset,
    Upgrade(Tier),
    UpgradeStatus(String),
    AdminExport(PathBuf),
    AdminPreview { response_id: String, tier: Tier },
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let Some(flag) = args.next() else {
            return Ok(Command::Quiz);
        };
        let mut value = |name: &str| {
            args.next()
                .with_context(|| format!("{} expects a value", name))
        };

        let command = match flag.as_str() {
            "--reset" => Command::Reset,
            "--upgrade" => Command::Upgrade(parse_tier(&value("--upgrade")?)?),
            "--upgrade-status" => Command::UpgradeStatus(value("--upgrade-status")?),
            "--admin-export" => Command::AdminExport(PathBuf::from(value("--admin-export")?)),
            "--admin-preview" => {
                let response_id = value("--admin-preview")?;
                let tier = parse_tier(&value("--admin-preview")?)?;
                Command::AdminPreview { response_id, tier }
            }
            other => bail!(
                "Unknown option {}. Usage: frequency-quiz [--reset | --upgrade <3|7> | \
                 --upgrade-status <session_id> | --admin-export <file.xlsx> | \
                 --admin-preview <response_id> <1|3|7>]",
                other
            ),
        };
        Ok(command)
    }
}

fn parse_tier(raw: &str) -> anyhow::Result<Tier> {
    let value: u8 = raw.trim().parse().context("Tier must be 1, 3 or 7")?;
    Ok(Tier::try_from(value)?)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    init_config()?;
    let config = get_config()?;

    let command = Command::parse(std::env::args().skip(1))?;
    let state = AppState::new(config)?;
    let mut store = QuizStore::open(SessionPersistence::new(FileStorage::new(
        &config.session_store_dir,
    )));
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    match command {
        Command::Quiz => {
            let response = run_quiz(&state, &mut store, &mut input).await?;
            write_report(&response, &config.report_output_dir)?;
        }
        Command::Reset => {
            store.reset();
            println!("Saved quiz session cleared.");
        }
        Command::Upgrade(target) => {
            let response = completed_response(&store)?;
            let email = store
                .snapshot()
                .user_data
                .as_ref()
                .map(|u| u.email.clone())
                .or_else(|| response.email.clone())
                .unwrap_or_default();
            let session = state
                .upgrade_service
                .start_checkout(&email, &response, target)
                .await?;
            println!("Complete your payment at: {}", session.url);
            await_upgrade(&state, &mut store, session.session_id, &config.report_output_dir).await?;
        }
        Command::UpgradeStatus(session_id) => {
            await_upgrade(&state, &mut store, session_id, &config.report_output_dir).await?;
        }
        Command::AdminExport(path) => {
            let mut session = admin_session(config.admin_token.as_deref())?;
            let bytes = state
                .admin_service
                .export_responses(&mut session, &ResponseListParams::default())
                .await?;
            tokio::fs::write(&path, bytes)
                .await
                .with_context(|| format!("Could not write {}", path.display()))?;
            println!("Exported responses to {}", path.display());
        }
        Command::AdminPreview { response_id, tier } => {
            let mut session = admin_session(config.admin_token.as_deref())?;
            let report = state
                .admin_service
                .preview_report(&mut session, &response_id, tier)
                .await?;
            let path = ReportService::write_json(&report, &config.report_output_dir)?;
            println!("Preview written to {}", path.display());
        }
    }

    Ok(())
}

async fn prompt(input: &mut Input, label: &str) -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    match input.next_line().await? {
        Some(line) => Ok(line.trim().to_string()),
        None => bail!("Input closed"),
    }
}

async fn read_user_data(input: &mut Input) -> anyhow::Result<UserData> {
    println!("Welcome to the Seven Frequencies quiz.");
    let first_name = prompt(input, "First name: ").await?;
    let last_name = prompt(input, "Last name: ").await?;
    let email = prompt(input, "Email: ").await?;
    let license_code = prompt(input, "License code: ").await?;
    let consent = prompt(input, "I agree to the terms and privacy policy [y/N]: ")
        .await?
        .eq_ignore_ascii_case("y");

    let user_data = UserData {
        first_name,
        last_name,
        email,
        license_code,
        consent,
        start_time: now(),
    };
    user_data.validate()?;
    Ok(user_data)
}

async fn run_quiz(
    state: &AppState,
    store: &mut Store,
    input: &mut Input,
) -> anyhow::Result<QuizResponse> {
    if let Some(response) = store.snapshot().quiz_response.clone() {
        println!("You have already completed the quiz.");
        return Ok(response);
    }

    if store.snapshot().user_data.is_none() {
        let user_data = read_user_data(input).await?;
        state
            .license_service
            .require_valid(&user_data.license_code)
            .await?;
        store.start_quiz(&state.api, user_data).await?;
    } else if store.is_complete() {
        println!("All questions are answered. Submitting your saved answers.");
    } else {
        println!(
            "Resuming your quiz at question {} of {}.",
            store.snapshot().current_question_index + 1,
            store.snapshot().questions.len()
        );
    }

    answer_questions(store, input).await?;

    let mut outcome = state.submission_service.submit_if_complete(store).await;
    loop {
        match outcome {
            Ok(Some(response)) => return Ok(response),
            Ok(None) => {
                return store
                    .snapshot()
                    .quiz_response
                    .clone()
                    .context("Quiz is not complete yet");
            }
            Err(err) => {
                eprintln!("Submission failed: {}", err.user_message());
                let again = prompt(input, "Try again? [y/N]: ").await?;
                if !again.eq_ignore_ascii_case("y") {
                    return Err(err.into());
                }
                outcome = state.submission_service.retry(store).await;
            }
        }
    }
}

async fn answer_questions(store: &mut Store, input: &mut Input) -> anyhow::Result<()> {
    while let Some(question) = store.snapshot().current_question().cloned() {
        let snapshot = store.snapshot();
        println!(
            "\n[{}/{}] {}",
            snapshot.current_question_index + 1,
            snapshot.questions.len(),
            question.description
        );
        if let Some(answer) = snapshot.current_answer() {
            println!("Current answer: {}", answer.value);
        }

        let line = prompt(input, "Rate 1-5 (b = back, n = next): ").await?;
        match line.as_str() {
            "b" | "B" => {
                if !store.go_to_previous_question() {
                    println!("This is the first question.");
                }
            }
            "n" | "N" | "" => {
                if !store.go_to_next_question() {
                    println!("Answer this question first.");
                }
            }
            raw => match raw.parse::<u8>() {
                Ok(value) => match store.answer_question(value) {
                    Ok(()) => {
                        store.go_to_next_question();
                    }
                    Err(err) => println!("{}", err.user_message()),
                },
                Err(_) => println!("Please enter a number from 1 to 5."),
            },
        }
    }
    Ok(())
}

fn completed_response(store: &Store) -> anyhow::Result<QuizResponse> {
    store
        .snapshot()
        .quiz_response
        .clone()
        .context("Complete the quiz before upgrading")
}

fn write_report(response: &QuizResponse, dir: &Path) -> anyhow::Result<()> {
    let tier = response.current_tier();
    let options = ReportOptions {
        tier,
        preview: false,
    };
    let report = ReportService::render_for_tier(response, options)?;
    let path = ReportService::write_json(&report, dir)?;
    println!("\nYour tier {} report is ready: {}", tier, path.display());

    for upgrade in tier.upgrades() {
        let pricing = upgrade.pricing();
        println!(
            "  Unlock {} (tier {}) for {}: run with --upgrade {}",
            pricing.name,
            upgrade,
            pricing.price_display(),
            upgrade
        );
    }
    Ok(())
}

async fn await_upgrade(
    state: &AppState,
    store: &mut Store,
    session_id: String,
    report_dir: &Path,
) -> anyhow::Result<()> {
    let mut poller = state.upgrade_service.poller(session_id.clone());
    let mut updates = poller.subscribe();
    let cancel = poller.cancel_token();

    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            if let UpgradeStatus::Verifying { attempt } = &*updates.borrow_and_update() {
                println!("Verifying payment (check {})...", attempt + 1);
            }
        }
    });
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let status = poller.run().await;
    interrupt.abort();
    progress.abort();

    match status {
        UpgradeStatus::Completed { new_tier, .. } => {
            store.apply_upgrade(new_tier);
            println!("Upgrade confirmed: you now have tier {}.", new_tier);
            match store.snapshot().quiz_response.clone() {
                Some(response) => write_report(&response, report_dir)?,
                None => warn!("Upgrade confirmed but no completed quiz is stored locally"),
            }
        }
        UpgradeStatus::Failed => {
            println!("The payment did not go through. You have not been charged for the upgrade.");
        }
        UpgradeStatus::GaveUp { attempts } => {
            info!(attempts, session_id = %session_id, "Upgrade still pending");
            println!(
                "Your payment is still processing. Check again later with --upgrade-status {}",
                session_id
            );
        }
        UpgradeStatus::Cancelled | UpgradeStatus::Verifying { .. } => {
            println!("Stopped checking the upgrade status.");
        }
    }
    Ok(())
}

fn admin_session(token: Option<&str>) -> anyhow::Result<AdminSession> {
    let token = token.context("ADMIN_TOKEN is not set")?;
    let mut session = AdminSession::new();
    session.sign_in(token)?;
    Ok(session)
}
