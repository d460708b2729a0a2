use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use message::{Change, DirectLevelChange, Difficulty, Language, QuestionType};
use prot::request::DEFAULT_CONTEXT_ID;
use prot::{ChangeForm, Environment, GenerateForm, Launcher, Theme};
use quizgen::follow::follow;
use quizgen::render;
use quizgen::store::Store;

const DEFAULT_URL: &str = "ws://127.0.0.1:8080/";
const DEFAULT_STORE: &str = "quizgen.json";

#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[arg(long, help = "Service address (overrides QUIZGEN_URL)")]
    url: Option<String>,
    #[arg(long, help = "Local question store (overrides QUIZGEN_STORE)")]
    store: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Lang::PtBr)]
    language: Lang,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Generate {
        #[arg(short = 'n', long, default_value_t = 3, help = "Number of questions (1-30)")]
        questions: u8,
        #[arg(short, long, default_value_t = 5, help = "Alternatives per question (2-6)")]
        alternatives: u8,
        #[arg(short, long, value_enum, default_value_t = Level::Medium)]
        difficulty: Level,
        #[arg(short = 't', long = "type", value_enum, default_value_t = Kind::MultipleChoice)]
        kind: Kind,
        #[arg(long, requires = "content_code", help = "Theme module name")]
        module_name: Option<String>,
        #[arg(long, requires = "module_name", help = "Theme content code")]
        content_code: Option<String>,
        #[arg(long, help = "Theme context id")]
        context_id: Option<String>,
        #[arg(long, help = "Free text to generate the questionnaire from")]
        text: Option<String>,
        #[arg(long, default_value = "")]
        professor_input: String,
    },
    Change {
        #[arg(help = "ID of the question")]
        question_id: String,
        #[arg(long, help = "ID of the questionnaire (defaults to the last one generated)")]
        questionnaire: Option<String>,
        #[command(flatten)]
        change: ChangeArgs,
    },
    Show,
}

#[derive(Debug, ClapArgs)]
#[group(required = true, multiple = false)]
struct ChangeArgs {
    #[arg(long, help = "Custom modification instructions")]
    instruction: Option<String>,
    #[arg(long, value_enum)]
    level: Option<Level>,
    #[arg(long)]
    easier: bool,
    #[arg(long)]
    harder: bool,
    #[arg(long, value_enum)]
    to_type: Option<Kind>,
}

impl ChangeArgs {
    fn into_change(self) -> Option<Change> {
        if let Some(text) = self.instruction {
            return Some(Change::Instruction(text));
        }
        if let Some(level) = self.level {
            return Some(Change::Level(level.into()));
        }
        if self.easier {
            return Some(Change::Direct(DirectLevelChange::Easier));
        }
        if self.harder {
            return Some(Change::Direct(DirectLevelChange::Harder));
        }
        self.to_type.map(|kind| Change::Type(kind.into()))
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Level {
    Easy,
    Medium,
    Hard,
}

impl From<Level> for Difficulty {
    fn from(level: Level) -> Self {
        match level {
            Level::Easy => Difficulty::Easy,
            Level::Medium => Difficulty::Medium,
            Level::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    MultipleChoice,
    AssertionReason,
}

impl From<Kind> for QuestionType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::MultipleChoice => QuestionType::MultipleChoice,
            Kind::AssertionReason => QuestionType::AssertionReason,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Lang {
    PtBr,
    En,
    Es,
}

impl From<Lang> for Language {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::PtBr => Language::PtBr,
            Lang::En => Language::En,
            Lang::Es => Language::Es,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(io::stderr)
        .init();

    // wss:// needs a process-wide crypto provider; ignore it being set already.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let url = args
        .url
        .unwrap_or_else(|| env::var("QUIZGEN_URL").unwrap_or(DEFAULT_URL.to_owned()));
    let store_path = args.store.unwrap_or_else(|| {
        env::var("QUIZGEN_STORE")
            .unwrap_or(DEFAULT_STORE.to_owned())
            .into()
    });

    let env = Environment {
        language: args.language.into(),
        ..Default::default()
    };
    let mut store = Store::open(&store_path);
    let mut launcher = Launcher::new(url, env);

    let started = match args.command {
        Commands::Generate {
            questions,
            alternatives,
            difficulty,
            kind,
            module_name,
            content_code,
            context_id,
            text,
            professor_input,
        } => {
            let theme = module_name.zip(content_code).map(|(module_name, content_code)| Theme {
                module_name,
                content_code,
                context_id: context_id.unwrap_or(DEFAULT_CONTEXT_ID.to_owned()),
            });
            let form = GenerateForm {
                theme,
                custom_input: text,
                professor_input,
                number_of_questions: questions,
                number_of_alternatives: alternatives,
                difficulty: difficulty.into(),
                question_type: kind.into(),
            };
            launcher.generate(&form)
        }
        Commands::Change {
            question_id,
            questionnaire,
            change,
        } => {
            let questionnaire_id = questionnaire
                .or_else(|| store.last_questionnaire_id().map(str::to_owned))
                .unwrap_or_default();
            let Some(change) = change.into_change() else {
                error!("No modification given");
                process::exit(2);
            };
            let form = ChangeForm {
                question_id,
                questionnaire_id,
                change,
            };
            launcher.change(&form)
        }
        Commands::Show => {
            if let Some(id) = store.last_questionnaire_id() {
                println!("ID do Questionário: {}", id);
            }
            render::questions(&mut io::stdout().lock(), store.questions())?;
            return Ok(());
        }
    };

    let updates = match started {
        Ok(updates) => updates,
        Err(prot::Error::Validation(err)) => {
            error!(%err, "Invalid input");
            process::exit(2);
        }
        Err(err) => return Err(err.into()),
    };

    let ok = follow(updates, &mut store, &mut io::stdout()).await?;
    launcher.shutdown().await;

    if !ok {
        process::exit(1);
    }

    Ok(())
}
