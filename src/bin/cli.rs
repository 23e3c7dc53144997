//! Command line client for the CLUBBEE backend.
//!
//! Membership, RSVP and creation fall back to local overrides when the
//! backend is unreachable, so the tool stays usable offline.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use clubbee::{
    client::{
        filter::{filter, Searchable},
        store::fetch_or_defaults,
        ClientConfig, Session, Stats,
    },
    entity::{Club, ClubDraft, Event, EventDraft, NewsArticle},
};
use envconfig::Envconfig;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "clubbee-cli")]
#[command(about = "Browse clubs, events and news; join clubs and RSVP to events")]
struct Cli {
    /// Skip the backend and work from built-in data plus local overrides
    #[arg(long, global = true)]
    offline: bool,

    /// Print raw JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Clubs(ClubCommand),
    #[command(subcommand)]
    Events(EventCommand),
    /// List news, newest first
    News {
        #[command(flatten)]
        filters: Filters,
    },
    /// Dashboard counters
    Stats {
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Args, Debug)]
struct Filters {
    /// Case-insensitive text to look for in names, titles and descriptions
    #[arg(long)]
    search: Option<String>,
    /// Exact category (for events, the organizing club's name)
    #[arg(long)]
    category: Option<String>,
}

impl Filters {
    fn apply<T: Searchable>(&self, list: Vec<T>) -> Vec<T> {
        filter(list, self.search.as_deref(), self.category.as_deref())
    }
}

#[derive(Args, Debug)]
struct Who {
    /// User identifier
    #[arg(long)]
    user: String,
    /// Name shown on the roster
    #[arg(long)]
    name: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ClubCommand {
    List {
        #[command(flatten)]
        filters: Filters,
    },
    Join {
        id: String,
        #[command(flatten)]
        who: Who,
    },
    Leave {
        id: String,
        #[arg(long)]
        user: String,
    },
    /// Create a club; kept locally when the backend is unreachable
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum EventCommand {
    List {
        #[command(flatten)]
        filters: Filters,
    },
    Rsvp {
        id: String,
        #[command(flatten)]
        who: Who,
    },
    Cancel {
        id: String,
        #[arg(long)]
        user: String,
    },
    /// Create an event; kept locally when the backend is unreachable
    Create {
        #[arg(long)]
        title: String,
        /// RFC 3339 timestamp or YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        date: DateTime<Utc>,
        #[arg(long)]
        description: Option<String>,
        /// Identifier of the organizing club
        #[arg(long)]
        organizer: Option<String>,
    },
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(|| format!("`{s}` is neither RFC 3339 nor YYYY-MM-DD"))
}

impl Who {
    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.user)
    }
}

fn print<T: Serialize>(json: bool, value: &T, summary: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        summary(value);
    }
    Ok(())
}

fn print_clubs(clubs: &Vec<Club>) {
    for club in clubs {
        println!("{:>4}  {:<24} {:<12} {} members", club.id, club.name, club.category, club.members.len());
    }
}

fn print_club(club: &Club) {
    let names: Vec<_> = club.members.iter().map(|m| m.display_name()).collect();
    println!("{} ({}): {}", club.name, club.id, names.join(", "));
}

fn print_events(events: &Vec<Event>) {
    for event in events {
        println!(
            "{:>4}  {}  {:<28} {} attending",
            event.id,
            event.date.format("%Y-%m-%d"),
            event.title,
            event.attendees.len()
        );
    }
}

fn print_event(event: &Event) {
    let names: Vec<_> = event.attendees.iter().map(|a| a.display_name()).collect();
    println!("{} ({}): {}", event.title, event.id, names.join(", "));
}

fn print_news(news: &Vec<NewsArticle>) {
    for article in news {
        println!(
            "{}  [{}] {} by {}",
            article.date.format("%Y-%m-%d"),
            article.category,
            article.title,
            article.author.name
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::init_from_env()?;
    config.offline |= cli.offline;

    let mut session = Session::connect(&config)?;
    let json = cli.json;

    match cli.command {
        Command::Clubs(ClubCommand::List { filters }) => {
            let clubs = filters.apply(session.clubs.refresh().await.to_vec());
            print(json, &clubs, print_clubs)?;
        }
        Command::Clubs(ClubCommand::Join { id, who }) => {
            session.clubs.refresh().await;
            let club = session.clubs.join(&id, &who.user, who.display_name()).await?;
            print(json, &club, print_club)?;
        }
        Command::Clubs(ClubCommand::Leave { id, user }) => {
            session.clubs.refresh().await;
            let club = session.clubs.leave(&id, &user).await?;
            print(json, &club, print_club)?;
        }
        Command::Clubs(ClubCommand::Create {
            name,
            category,
            description,
        }) => {
            session.clubs.refresh().await;
            let club = session
                .clubs
                .create(ClubDraft {
                    name,
                    category,
                    description,
                })
                .await?;
            print(json, &club, print_club)?;
        }
        Command::Events(EventCommand::List { filters }) => {
            let events = filters.apply(session.events.refresh().await.to_vec());
            print(json, &events, print_events)?;
        }
        Command::Events(EventCommand::Rsvp { id, who }) => {
            session.events.refresh().await;
            let event = session.events.rsvp(&id, &who.user, who.display_name()).await?;
            print(json, &event, print_event)?;
        }
        Command::Events(EventCommand::Cancel { id, user }) => {
            session.events.refresh().await;
            let event = session.events.cancel(&id, &user).await?;
            print(json, &event, print_event)?;
        }
        Command::Events(EventCommand::Create {
            title,
            date,
            description,
            organizer,
        }) => {
            session.events.refresh().await;
            let event = session
                .events
                .create(EventDraft {
                    title,
                    date,
                    description,
                    organizer_id: organizer,
                })
                .await?;
            print(json, &event, print_event)?;
        }
        Command::News { filters } => {
            let news: Vec<NewsArticle> = filters.apply(fetch_or_defaults(session.news.as_ref()).await);
            print(json, &news, print_news)?;
        }
        Command::Stats { user } => {
            let clubs = session.clubs.refresh().await.to_vec();
            let events = session.events.refresh().await.to_vec();
            let news: Vec<NewsArticle> = fetch_or_defaults(session.news.as_ref()).await;
            let stats = Stats::compute(&clubs, &events, &news, user.as_deref(), Utc::now());
            print(json, &stats, |stats| {
                println!("clubs:           {}", stats.total_clubs);
                println!("upcoming events: {}", stats.upcoming_events);
                println!("news:            {}", stats.total_news);
                if user.is_some() {
                    println!("my clubs:        {}", stats.my_clubs);
                }
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubbee::sample::Defaults;

    #[test]
    fn dates_accept_rfc3339_or_a_plain_day() {
        assert_eq!(
            parse_date("2025-11-02").unwrap(),
            parse_date("2025-11-02T00:00:00Z").unwrap()
        );
        assert_eq!(parse_date("2025-11-02T20:00:00+02:00").unwrap().to_rfc3339(), "2025-11-02T18:00:00+00:00");
        assert!(parse_date("next friday").is_err());
    }

    #[test]
    fn list_filters_parse() {
        let cli = Cli::try_parse_from(["clubbee-cli", "clubs", "list", "--search", "robot", "--category", "Technology"]).unwrap();
        let Command::Clubs(ClubCommand::List { filters }) = cli.command else {
            panic!("expected clubs list");
        };
        assert_eq!(filters.search.as_deref(), Some("robot"));
        assert_eq!(filters.apply(Club::defaults()).len(), 1);
    }
}
