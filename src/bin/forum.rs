use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forum_backend::auth::{issue_token, JwtSessionProvider, SessionProvider};
use forum_backend::config::ForumConfig;
use forum_backend::db::{self, schema::ensure_schema, services};
use forum_backend::error::AppError;
use forum_backend::models::{
    CreateQuestionParams, EditQuestionParams, PaginatedSearchParams, RegisteredUser, UserView,
};
use forum_backend::response::ActionResponse;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Bearer token identifying the acting user
    #[arg(long, global = true, env = "FORUM_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct PageArgs {
    #[arg(long)]
    page: Option<u64>,
    #[arg(long)]
    page_size: Option<u64>,
    #[arg(short, long)]
    query: Option<String>,
    #[arg(short, long)]
    filter: Option<String>,
}

impl From<PageArgs> for PaginatedSearchParams {
    fn from(args: PageArgs) -> Self {
        PaginatedSearchParams {
            page: args.page,
            page_size: args.page_size,
            query: args.query,
            filter: args.filter,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the tables if they do not exist
    Init,
    /// Register an author and print a token for them
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// Ask a new question
    Ask {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Repeat or comma-separate: `--tag rust,async`
        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Edit one of your questions
    Edit {
        question_id: i32,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,
    },
    Show {
        question_id: i32,
    },
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    Tags {
        #[command(flatten)]
        page: PageArgs,
    },
    TagQuestions {
        tag_id: i32,
        #[command(flatten)]
        page: PageArgs,
    },
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "forum.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // stdout carries the response envelope.
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
}

/// Prints the envelope and reports whether it carried data.
fn emit<T: Serialize>(response: ActionResponse<T>) -> Result<bool, serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(response.is_success())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = match ForumConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load forum configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);

    let db = match db::connect(&config.database_url, config.max_connections).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    let provider = JwtSessionProvider::new(config.jwt_secret.clone(), args.token);
    let session = provider.resolve_session().await;
    let limits = &config.limits;

    let success = match args.command {
        Command::Init => {
            ensure_schema(&db).await?;
            info!("Schema is up to date.");
            emit(ActionResponse::ok(serde_json::json!({ "initialized": true })))?
        }
        Command::AddUser {
            name,
            username,
            image,
        } => {
            let result = async {
                let user = services::create_user(&db, &name, &username, image.as_deref()).await?;
                let token = issue_token(&user, &config.jwt_secret, config.token_ttl_hours)?;
                Ok::<_, AppError>(RegisteredUser {
                    user: UserView::from(user),
                    token,
                })
            }
            .await;
            emit(ActionResponse::from_created(result))?
        }
        Command::Ask {
            title,
            content,
            tags,
        } => {
            let params = CreateQuestionParams {
                title,
                content,
                tags,
            };
            let result = services::create_question(&db, limits, session.as_ref(), params).await;
            emit(ActionResponse::from_created(result))?
        }
        Command::Edit {
            question_id,
            title,
            content,
            tags,
        } => {
            let params = EditQuestionParams {
                question_id,
                title,
                content,
                tags,
            };
            let result = services::edit_question(&db, limits, session.as_ref(), params).await;
            emit(ActionResponse::from(result))?
        }
        Command::Show { question_id } => {
            emit(ActionResponse::from(services::get_question(&db, question_id).await))?
        }
        Command::List { page } => {
            emit(ActionResponse::from(services::list_questions(&db, page.into()).await))?
        }
        Command::Tags { page } => {
            emit(ActionResponse::from(services::list_tags(&db, page.into()).await))?
        }
        Command::TagQuestions { tag_id, page } => emit(ActionResponse::from(
            services::get_tag_questions(&db, tag_id, page.into()).await,
        ))?,
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
