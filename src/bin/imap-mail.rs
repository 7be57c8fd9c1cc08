#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for inspecting the test INBOX with the same steps tests use

use clap::{Parser, Subcommand};
use imap_mail_steps::{Email, ImapConfig, ImapMail, extract, spam};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imap-mail")]
#[command(about = "Inspect the IMAP test INBOX: list, open, spam-check, purge")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List emails in mailbox order
    List {
        /// Only emails addressed (To, Cc or Bcc) to this address
        #[arg(long)]
        to: Option<String>,

        /// Maximum number of emails to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Open the N-th email (1-based) and show its fields
    Show {
        /// Position in the (filtered) inbox
        n: usize,

        /// Only emails addressed (To, Cc or Bcc) to this address
        #[arg(long)]
        to: Option<String>,
    },

    /// Check X-Spam-Status on every email; fails if any is spam
    SpamCheck {
        /// Only emails addressed (To, Cc or Bcc) to this address
        #[arg(long)]
        to: Option<String>,
    },

    /// Delete every email in the INBOX
    Purge,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ImapConfig::from_env()?;
    let mut mail = ImapMail::before(config).await?;

    let outcome = match &args.command {
        Command::List { to, limit } => cmd_list(&mut mail, &args, to.as_deref(), *limit).await,
        Command::Show { n, to } => cmd_show(&mut mail, &args, *n, to.as_deref()).await,
        Command::SpamCheck { to } => cmd_spam_check(&mut mail, &args, to.as_deref()).await,
        Command::Purge => cmd_purge(&mut mail).await,
    };

    mail.disconnect(false).await?;
    outcome
}

async fn load(mail: &mut ImapMail, to: Option<&str>) -> anyhow::Result<()> {
    mail.fetch_emails().await?;
    if let Some(address) = to {
        mail.access_inbox_for(address);
    }
    Ok(())
}

async fn cmd_list(
    mail: &mut ImapMail,
    args: &Args,
    to: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    load(mail, to).await?;
    let display: Vec<&Email> = mail.current_inbox().into_iter().take(limit).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&display)?);
    } else {
        print_email_table(&display);
    }

    Ok(())
}

async fn cmd_show(
    mail: &mut ImapMail,
    args: &Args,
    n: usize,
    to: Option<&str>,
) -> anyhow::Result<()> {
    anyhow::ensure!(n > 0, "positions start at 1");
    load(mail, to).await?;

    for _ in 1..n {
        mail.open_next_unread_email()?;
    }
    let email = mail.open_next_unread_email()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(email)?);
    } else {
        print_email_detail(email);
    }

    Ok(())
}

async fn cmd_spam_check(
    mail: &mut ImapMail,
    args: &Args,
    to: Option<&str>,
) -> anyhow::Result<()> {
    load(mail, to).await?;

    let mut flagged = 0;
    let mut report = Vec::new();
    for email in mail.current_inbox() {
        let verdict = spam::check_spam_status(&email.raw_headers);
        if verdict.is_err() {
            flagged += 1;
        }
        report.push(serde_json::json!({
            "uid": email.uid,
            "subject": email.subject,
            "spam_status": spam::spam_status(&email.raw_headers),
            "passed": verdict.is_ok(),
        }));

        if !args.json {
            let status = if verdict.is_ok() { "PASS" } else { "FAIL" };
            println!(
                "{status:<6} {:<8} {:<40} {}",
                email.uid,
                truncate(&email.subject, 38),
                spam::spam_status(&email.raw_headers).unwrap_or("-"),
            );
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    anyhow::ensure!(flagged == 0, "{flagged} email(s) flagged as spam");
    Ok(())
}

async fn cmd_purge(mail: &mut ImapMail) -> anyhow::Result<()> {
    mail.delete_all_emails().await?;
    println!("INBOX purged.");
    Ok(())
}

fn print_email_table(emails: &[&Email]) {
    if emails.is_empty() {
        println!("No emails found.");
        return;
    }

    let header = format!(
        "{:<8} {:<20} {:<30} {}",
        "UID", "Date", "Sender", "Subject"
    );
    println!("{header}");
    println!("{}", "-".repeat(100));

    for email in emails {
        println!(
            "{:<8} {:<20} {:<30} {}",
            email.uid,
            email
                .date
                .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string()),
            truncate(extract::sender(email).unwrap_or("-"), 28),
            truncate(&email.subject, 40),
        );
    }

    println!("\n{} email(s)", emails.len());
}

fn print_email_detail(email: &Email) {
    println!("UID:        {}", email.uid);
    if let Some(date) = email.date {
        println!("Date:       {}", date.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("Sender:     {}", extract::sender(email).unwrap_or("-"));
    println!("To:         {}", extract::to(email));
    println!("CC:         {}", extract::cc(email));
    println!("BCC:        {}", extract::bcc(email));
    println!("Reply-To:   {}", extract::reply_to(email));
    println!("Subject:    {}", extract::subject(email));
    if let Some(priority) = extract::priority(email) {
        println!("Priority:   {priority}");
    }
    println!(
        "Spam:       {}",
        spam::spam_status(&email.raw_headers).unwrap_or("-")
    );

    println!("\n--- Body ---\n");
    println!("{}", extract::body(email));
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
