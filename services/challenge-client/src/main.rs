use challenge_client::display::{EntryRow, Tone, format_ratio};
use challenge_client::leaderboard::LeaderboardView;
use challenge_client::models::ChallengeMessage;
use challenge_client::names::{NameCache, NoNames};
use challenge_client::signer::PromptSigner;
use challenge_client::{ChallengeSession, ClientConfig, RankingClient};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;
use types::leaderboard::{LeaderboardOrderBy, SubmitMessageRequest};

#[derive(Parser, Debug)]
#[command(name = "challenge-client")]
#[command(author, version, about = "FlashBlock speed challenge client", long_about = None)]
struct Args {
    /// Ranking service base URL (overrides KRT_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Your wallet address; its rows are labelled as your own
    #[arg(long, global = true)]
    own_address: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the leaderboard
    Leaderboard {
        /// ratio | reaction_millis | flash_block_millis | block_millis | submit_date
        #[arg(long, default_value = "ratio")]
        order_by: LeaderboardOrderBy,
    },
    /// Print a fresh challenge message to sign elsewhere
    Message,
    /// Submit a message that was signed elsewhere
    Submit {
        #[arg(long)]
        message: String,
        #[arg(long)]
        signature: String,
    },
    /// Build, sign (by pasting a signature) and submit in one go
    Attempt,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.api_url {
        config.base_url = url;
    }
    let client = RankingClient::from_config(&config)?;
    let own_address = args.own_address.as_deref();

    match args.command {
        Command::Leaderboard { order_by } => {
            let mut view = LeaderboardView::with_order(client, order_by);
            view.load().await?;
            let mut names = NameCache::new(NoNames, config.name_cache_size);
            print_rows(&view.rows(&mut names, own_address).await);
        }
        Command::Message => {
            println!("{}", ChallengeMessage::new().to_payload()?);
        }
        Command::Submit { message, signature } => {
            let entry = client.submit(&SubmitMessageRequest { message, signature }).await?;
            let mut names = NameCache::new(NoNames, config.name_cache_size);
            let name = names.label(&entry.address, own_address).await;
            print_rows(&[EntryRow::new(&entry, name)]);
        }
        Command::Attempt => {
            let signer = PromptSigner::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
            let session = ChallengeSession::new(client, signer);
            let attempt = session.attempt().await?;
            let entry = &attempt.entry;
            println!();
            println!("Position:      #{}", entry.position);
            println!("Reaction:      {}ms", entry.reaction_millis);
            println!("Flashblock:    {}ms", entry.flash_block_millis);
            println!("Full block:    {}ms", entry.block_millis);
            println!("Ratio:         {}", format_ratio(entry.ratio));
            println!("Transaction:   {}", entry.transaction_hash);
        }
    }

    Ok(())
}

fn paint(text: &str, tone: Tone) -> String {
    match tone {
        Tone::Default => text.to_string(),
        _ => format!("\x1b[{}m{}\x1b[0m", tone.ansi_code(), text),
    }
}

fn print_rows(rows: &[EntryRow]) {
    println!("{:<6} {:<14} {:>10} {:>10} {:>10} {:>6}", "#", "Address", "Reaction", "Flash", "Block", "Ratio");
    for row in rows {
        // Pad before painting so escape codes don't skew the columns
        println!(
            "{} {:<14} {} {} {} {}",
            paint(&format!("{:<6}", row.position.text), row.position.tone),
            row.name,
            paint(&format!("{:>10}", row.reaction.text), row.reaction.tone),
            paint(&format!("{:>10}", row.flash_block.text), row.flash_block.tone),
            paint(&format!("{:>10}", row.block.text), row.block.tone),
            paint(&format!("{:>6}", row.ratio.text), row.ratio.tone),
        );
    }
}
