mod config;
mod device;
mod session;

use config::Config;
use device::Device;
use session::Session;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::mpsc};
use wifidice::{HistoryPolicy, OsEntropy, RandomSource, SessionState};

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("io: {0}")]
    IO(#[from] std::io::Error),
    #[error("config: {0}")]
    Config(#[from] config::Error),
}

const EVENT_QUEUE: usize = 256;

struct Server {
    listener: TcpListener,
    clients: Arc<session::Store>,
    config: Config,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self, Error> {
        let listener = TcpListener::bind(config.listen).await?;
        Ok(Self {
            listener,
            clients: Default::default(),
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self, rng: impl RandomSource + Send + 'static) -> Result<(), Error> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let mut device = Device::new(
            SessionState::new(self.config.history),
            rng,
            self.clients.clone(),
            self.config.error_replies,
        );
        device.start();
        tokio::spawn(device.run(events_rx));

        loop {
            let (stream, from) = self.listener.accept().await?;
            let session = Session::new(from, self.config.channel_capacity);
            let events = events_tx.clone();
            tokio::spawn(async move {
                if let Err(err) = session.run(stream, events).await {
                    tracing::warn!(%err, %from, "session ended with error");
                }
            });
        }
    }
}

fn init_logging() {
    const LOG_ENV: &str = "RUST_LOG";
    use std::str::FromStr;
    use tracing::Level;
    use tracing_subscriber::EnvFilter;

    let filter = std::env::var(LOG_ENV)
        .map(|env| {
            EnvFilter::from_str(env.as_str())
                .unwrap_or_else(|err| panic!("invalid `{}` environment variable {}", LOG_ENV, err))
        })
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn start() -> Result<(), Error> {
    let config = Config::from_env()?;
    if config.history == HistoryPolicy::Legacy {
        tracing::warn!("legacy history policy: zero draws are dropped and gaps may repeat entries");
    }
    let server = Server::new(config).await?;
    tracing::info!(address = %server.local_addr()?, "Starting server");
    server.run(OsEntropy).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    start().await?;
    Ok(())
}
