use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, error};
use std::path::PathBuf;
use std::process::ExitCode;

use nutriscan::auth::{FirebaseAuthClient, IdpCredential};
use nutriscan::config::{load_config, AppConfig};
use nutriscan::language::{language_name, SUPPORTED_LANGUAGES};
use nutriscan::preferences::{FileStore, LanguagePreference};
use nutriscan::{render, FoodAnalyzer, FoodSearch, NutritionResult, NutritionixClient};

#[derive(Parser)]
#[command(name = "nutriscan")]
#[command(about = "Recognise food from a photo or description and look up its nutrition")]
struct Cli {
    /// Answer language code (defaults to the saved preference)
    #[arg(long, global = true)]
    lang: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Html,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a food photo
    Image {
        /// Image file (jpeg, png, webp, gif, heic)
        path: PathBuf,
    },
    /// Analyse a food description
    Text {
        /// e.g. "grilled chicken breast"
        description: String,
    },
    /// Search the nutrition database
    Search { query: String },
    /// Show, list or save the preferred answer language
    Language {
        /// Language code to save
        code: Option<String>,

        /// List supported languages
        #[arg(long)]
        list: bool,
    },
    /// Sign in with email and password, or a social provider token
    Signin {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Google ID token obtained from Google sign-in
        #[arg(long, conflicts_with_all = ["email", "password", "facebook_token"])]
        google_token: Option<String>,
        /// Facebook access token obtained from Facebook login
        #[arg(long, conflicts_with_all = ["email", "password"])]
        facebook_token: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let preference = LanguagePreference::new(FileStore::new(config.preferences.resolved_path()));

    match cli.command {
        Commands::Image { path } => {
            let language = resolve_language(cli.lang, &preference).await;
            let outcome = FoodAnalyzer::builder()
                .config(config)
                .image(path)
                .language(language)
                .build()
                .await;
            print_outcome(cli.format, outcome)?;
        }
        Commands::Text { description } => {
            let language = resolve_language(cli.lang, &preference).await;
            let outcome = FoodAnalyzer::builder()
                .config(config)
                .text(description)
                .language(language)
                .build()
                .await;
            print_outcome(cli.format, outcome)?;
        }
        Commands::Search { query } => search(&config, &query, cli.format).await?,
        Commands::Language { code, list } => {
            if list {
                for (code, name) in SUPPORTED_LANGUAGES {
                    println!("{code}\t{name}");
                }
            } else if let Some(code) = code {
                preference.save(&code).await?;
                println!("Saved language: {}", language_name(&code));
            } else {
                let code = preference.load().await;
                println!("{}\t{}", code, language_name(&code));
            }
        }
        Commands::Signin {
            email,
            password,
            google_token,
            facebook_token,
        } => {
            let client = FirebaseAuthClient::new(&config.firebase, config.request_timeout())?;
            let session = if let Some(id_token) = google_token {
                client
                    .sign_in_with_idp(&IdpCredential::Google { id_token })
                    .await?
            } else if let Some(access_token) = facebook_token {
                client
                    .sign_in_with_idp(&IdpCredential::Facebook { access_token })
                    .await?
            } else {
                client
                    .sign_in_with_password(
                        email.as_deref().unwrap_or_default(),
                        password.as_deref().unwrap_or_default(),
                    )
                    .await?
            };
            println!("Signed in as {}", session.email.as_deref().unwrap_or(&session.user_id));
        }
        Commands::Signup {
            email,
            password,
            confirm_password,
        } => {
            let client = FirebaseAuthClient::new(&config.firebase, config.request_timeout())?;
            let session = client.sign_up(&email, &password, &confirm_password).await?;
            println!("Account created for {}", session.email.as_deref().unwrap_or(&email));
        }
    }

    Ok(())
}

async fn resolve_language(flag: Option<String>, preference: &LanguagePreference<FileStore>) -> String {
    match flag {
        Some(code) => code,
        None => preference.load().await,
    }
}

fn print_outcome(
    format: OutputFormat,
    outcome: Result<NutritionResult, nutriscan::AnalysisError>,
) -> Result<(), Box<dyn std::error::Error>> {
    match (format, outcome) {
        (OutputFormat::Text, Ok(result)) => print!("{}", render::to_text(&result)),
        (OutputFormat::Json, Ok(result)) => println!("{}", serde_json::to_string_pretty(&result)?),
        (OutputFormat::Html, Ok(result)) => print!("{}", render::to_html(&result)),
        (OutputFormat::Html, Err(e)) => {
            print!("{}", render::error_html(&e.to_string()));
            return Err(e.into());
        }
        (_, Err(e)) => return Err(e.into()),
    }
    Ok(())
}

async fn search(
    config: &AppConfig,
    query: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = NutritionixClient::new(&config.nutritionix, config.request_timeout())?;
    let suggestions = client.search(query).await?;
    debug!("{} suggestions", suggestions.len());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&suggestions)?),
        OutputFormat::Text | OutputFormat::Html => {
            for suggestion in &suggestions {
                println!("{}", render::suggestion_text(suggestion));
            }
        }
    }
    Ok(())
}
