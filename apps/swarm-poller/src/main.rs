use clap::Parser;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod board;
mod render;

use board::Poller;

#[derive(Parser)]
#[command(name = "swarm-poller")]
#[command(about = "Polls a swarm board replica and renders what it serves", long_about = None)]
struct Args {
    /// Board base URL; behind the Swarm ingress each poll may hit another replica
    #[arg(long, env = "SWARM_URL", default_value = "http://localhost:3000")]
    base_url: String,
    /// Seconds between polls
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 5)]
    interval_secs: u64,
    /// Messages fetched per poll (the board caps this at 100)
    #[arg(long, default_value_t = 10)]
    limit: usize,
    /// Poll once and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swarm_poller=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Polling {} every {}s", args.base_url, args.interval_secs);

    let interval = Duration::from_secs(args.interval_secs.max(1));
    let mut poller = Poller::new(&args.base_url, args.limit, interval)?;
    let mut ticker = tokio::time::interval(interval);

    // One listener for the whole run so a Ctrl+C during a fetch is not lost.
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => break,
        }

        tokio::select! {
            view = poller.tick() => println!("{}\n", render::render(view)),
            _ = &mut shutdown => break,
        }

        if args.once {
            break;
        }
    }
    tracing::info!("Stopped polling");

    if args.once && poller.view().error.is_some() {
        anyhow::bail!("Board at {} is unreachable", args.base_url);
    }

    Ok(())
}
