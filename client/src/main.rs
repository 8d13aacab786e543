mod session;

use session::Session;
use tokio::sync::mpsc;
use wifidice::{ServerFrame, Snapshot};

fn init_logging() {
    const LOG_ENV: &str = "RUST_LOG";
    use std::str::FromStr;
    use tracing::Level;

    let level = std::env::var(LOG_ENV)
        .map(|env| {
            Level::from_str(env.to_uppercase().as_str())
                .unwrap_or_else(|err| panic!("invalid `{}` environment variable {}", LOG_ENV, err))
        })
        .unwrap_or(Level::INFO);

    let log_file_path = match xdg::BaseDirectories::with_prefix("wifidice") {
        Ok(dirs) => dirs.get_cache_home().join("client.log"),
        Err(err) => {
            eprintln!("no cache directory for logs: {}", err);
            return;
        }
    };
    let log_file = log_file_path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| {
            std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&log_file_path)
        });
    match log_file {
        Ok(log_file) => tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(log_file))
            .with_ansi(false)
            .with_max_level(level)
            .init(),
        Err(err) => eprintln!("cannot open {}: {}", log_file_path.display(), err),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Roll(u32),
    Repeat,
    Quit,
    Invalid,
}

impl Input {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Repeat,
            "q" | "quit" => Self::Quit,
            line => line
                .strip_prefix(|c| c == 'd' || c == 'D')
                .unwrap_or(line)
                .parse()
                .map_or(Self::Invalid, Self::Roll),
        }
    }
}

fn render(snapshot: &Snapshot) -> String {
    let history = snapshot
        .toss_history
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "rolled {} (d{})  history: {}",
        snapshot.random_number, snapshot.upper_bound, history
    )
}

fn read_lines(tx: mpsc::Sender<String>) {
    let term = console::Term::stdout();
    loop {
        match term.read_line() {
            Ok(line) => {
                if tx.blocking_send(line).is_err() {
                    return;
                }
            }
            Err(err) => {
                tracing::error!(%err, "terminal read failed");
                return;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("ws://127.0.0.1:{}", wifidice::PORT));
    let (mut tx, mut rx) = Session::connect(&url).await?.split();

    let (lines_tx, mut lines) = mpsc::channel(8);
    // the terminal blocks, keep it off the runtime so exiting never waits on it
    std::thread::spawn(move || read_lines(lines_tx));

    let term = console::Term::stdout();
    term.write_line("die size to roll, enter to repeat, q to quit")?;
    let mut last = None;
    loop {
        tokio::select! {
            frame = rx.next() => match frame? {
                Some(ServerFrame::Greeting) => term.write_line("connected")?,
                Some(ServerFrame::Snapshot(snapshot)) => term.write_line(&render(&snapshot))?,
                Some(ServerFrame::Error { error }) => term.write_line(&format!("error: {}", error))?,
                None => {
                    term.write_line("connection closed")?;
                    break;
                }
            },
            line = lines.recv() => {
                let bound = match line.as_deref().map(Input::parse) {
                    None | Some(Input::Quit) => break,
                    Some(Input::Roll(bound)) => Some(bound),
                    Some(Input::Repeat) => last,
                    Some(Input::Invalid) => {
                        term.write_line("enter a number, e.g. 6 or d20")?;
                        None
                    }
                };
                if let Some(bound) = bound {
                    last = Some(bound);
                    tx.roll(bound).await?;
                }
            }
        }
    }
    Ok(())
}
