use anyhow::Context;
use bookshelf_app::{books::BookId, App};
use bookshelf_kernel::settings::Settings;
use clap::{ArgGroup, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Book catalog and reservations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Manage the catalog directly
    #[command(subcommand)]
    Books(BooksCommand),
}

#[derive(Debug, Subcommand)]
enum BooksCommand {
    /// List books ordered by title
    List {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a book to the catalog
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
    },
    /// Reserve a book by title or id
    #[command(group(ArgGroup::new("target").required(true).args(["title", "id"])))]
    Reserve {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        id: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load().with_context(|| "failed to load Bookshelf settings")?;
    if !matches!(cli.command, Command::Serve) {
        // Keep stdout for command output.
        settings.telemetry.log_filter = "warn".to_string();
    }
    bookshelf_telemetry::init(&settings.telemetry)?;

    let app = App::build(settings).await?;

    match cli.command {
        Command::Serve => app.serve().await?,
        Command::Migrate => {
            println!("applied {} migration(s)", app.migrations_applied());
        }
        Command::Books(command) => run_books(&app, command).await?,
    }

    Ok(())
}

async fn run_books(app: &App, command: BooksCommand) -> anyhow::Result<()> {
    let catalog = app.catalog();

    match command {
        BooksCommand::List { json } => {
            let books = catalog.list_books().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&books)?);
            } else {
                for book in books {
                    let state = if book.reserved { "reserved" } else { "available" };
                    println!("{}\t{}\t{}\t{}", book.id, book.title, book.author, state);
                }
            }
        }
        BooksCommand::Add { title, author } => {
            let id = catalog.add_book(&title, &author).await?;
            println!("added book {}", id);
        }
        BooksCommand::Reserve { title, id } => {
            let book = match (title, id) {
                (Some(title), _) => catalog.reserve_book(&title).await?,
                (None, Some(id)) => catalog.reserve_book_by_id(BookId(id)).await?,
                (None, None) => anyhow::bail!("either --title or --id is required"),
            };
            println!("reserved book {} '{}'", book.id, book.title);
        }
    }

    Ok(())
}
