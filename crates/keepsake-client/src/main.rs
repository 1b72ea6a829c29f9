use std::io::Write;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use keepsake_client::feed::{Subscription, WsFeed};
use keepsake_client::store::HttpStore;
use keepsake_client::view::GuestbookView;
use keepsake_types::models::Message;

/// Which form field the next input line fills.
enum Phase {
    Name,
    Text,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keepsake_client=info".into()),
        )
        .init();

    let server_url =
        std::env::var("KEEPSAKE_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".into());

    let feed = WsFeed::new(&server_url)?;
    let mut view = GuestbookView::new(HttpStore::new(&server_url));
    let mut subscription = view.mount(&feed).await;

    println!("Baby's First Website 👶🌟");
    println!("Leave a short message or milestone for the baby!");
    println!();
    println!("Messages");
    if view.messages.is_empty() {
        println!("  (none yet)");
    }
    for message in &view.messages {
        println!("  {}", render_entry(message));
    }
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut phase = Phase::Name;
    let mut prompt = prompt_for(&phase, &view);
    print!("{prompt}");
    flush()?;

    loop {
        tokio::select! {
            notification = next_notification(&mut subscription) => {
                match notification {
                    Some(message) => {
                        view.apply(message);
                        println!();
                        println!("* {}", render_entry(&view.messages[0]));
                        print!("{prompt}");
                        flush()?;
                    }
                    None => {
                        // The form keeps working; new entries just stop
                        // arriving until the next run.
                        warn!("feed closed, live updates stopped");
                        subscription = None;
                    }
                }
            }
            line = lines.next_line() => {
                // End of input (Ctrl-D) tears the view down.
                let Some(line) = line? else { break };
                match phase {
                    Phase::Name => {
                        // An empty line keeps whatever the field already holds.
                        if !line.trim().is_empty() {
                            view.name = line;
                        }
                        phase = Phase::Text;
                    }
                    Phase::Text => {
                        if !line.trim().is_empty() {
                            view.text = line;
                        }
                        submit_form(&mut view).await?;
                        phase = Phase::Name;
                    }
                }
                prompt = prompt_for(&phase, &view);
                print!("{prompt}");
                flush()?;
            }
        }
    }

    if let Some(mut subscription) = subscription.take() {
        subscription.unsubscribe();
    }
    println!();
    Ok(())
}

/// Run the submit and narrate the outcome. The view keeps the fields on
/// failure, so "Enter twice" resubmits the same message.
async fn submit_form(view: &mut GuestbookView<HttpStore>) -> anyhow::Result<()> {
    let will_send = !view.name.trim().is_empty() && !view.text.trim().is_empty();
    if will_send {
        print!("Saving… ");
        flush()?;
    }
    view.submit().await;
    if !will_send {
        println!("(name and message are both required; nothing was sent)");
    } else if view.name.is_empty() {
        println!("saved — it will appear once the feed delivers it");
    } else {
        println!("could not save; your message is kept — press Enter twice to retry");
    }
    Ok(())
}

async fn next_notification(subscription: &mut Option<Subscription>) -> Option<Message> {
    match subscription {
        Some(subscription) => subscription.next().await,
        // No feed: park this select arm forever.
        None => std::future::pending().await,
    }
}

fn prompt_for(phase: &Phase, view: &GuestbookView<HttpStore>) -> String {
    match phase {
        Phase::Name if view.name.is_empty() => "Your name: ".to_string(),
        Phase::Name => format!("Your name [{}]: ", view.name),
        Phase::Text if view.text.is_empty() => "Message (e.g., 'First smile!'): ".to_string(),
        Phase::Text => format!("Message [{}]: ", view.text),
    }
}

fn render_entry(message: &Message) -> String {
    format!(
        "{} — {} ({})",
        message.name,
        message.message,
        message
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
    )
}

fn flush() -> std::io::Result<()> {
    std::io::stdout().flush()
}
