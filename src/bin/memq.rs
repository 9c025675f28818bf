//! memq – interactive shell and demo over an in-process queue.
//
//  $ memq shell --queue orders
//  > send order {"id":1}
//  > receive
//  > complete
//
//  $ memq demo --messages 20
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::info;

use memq::config::{load_config, CONFIG};
use memq::logging::init_logging;
use memq::{Config, MemoryMessageQueue, Message, MessageQueue, MessageReceiver, QueueManager};

#[derive(Debug, Parser)]
#[command(name = "memq", version, about = "memq in-process message queue shell & demo")]
struct Cli {
    /// Path to config TOML (env MEMQ_CONFIG overrides the default location)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Drive a queue interactively.
    Shell {
        /// Queue name
        #[arg(short, long, default_value = "default")]
        queue: String,
    },
    /// Produce messages and consume them with a background listener.
    Demo {
        /// Number of messages to produce
        #[arg(short, long, default_value_t = 10)]
        messages: u64,
        /// Listen interval in milliseconds (overrides config)
        #[arg(long, default_value_t = 10)]
        listen_interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config: Config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CONFIG.clone(),
    };
    init_logging(&config.logging.level);

    match cli.cmd {
        Command::Shell { queue } => shell(config, &queue).await?,
        Command::Demo {
            messages,
            listen_interval_ms,
        } => demo(config, messages, listen_interval_ms).await?,
    }
    Ok(())
}

/// Prints each delivered message and completes it.
struct PrintReceiver;

#[async_trait]
impl MessageReceiver for PrintReceiver {
    async fn receive_message(
        &self,
        message: &mut Message,
        queue: &dyn MessageQueue,
    ) -> anyhow::Result<()> {
        println!("< {} {}", message.message_id(), message);
        queue.complete(message).await?;
        Ok(())
    }
}

/// Counts delivered messages and completes them.
#[derive(Default)]
struct CountingReceiver {
    handled: AtomicU64,
}

#[async_trait]
impl MessageReceiver for CountingReceiver {
    async fn receive_message(
        &self,
        message: &mut Message,
        queue: &dyn MessageQueue,
    ) -> anyhow::Result<()> {
        queue.complete(message).await?;
        self.handled.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────
// Interactive REPL shell
// ───────────────────────────────────────────────────────────
async fn shell(config: Config, name: &str) -> anyhow::Result<()> {
    let manager = QueueManager::new(config);
    let queue: Arc<MemoryMessageQueue> = manager.get_or_create(name)?;
    queue.open("shell").await?;

    let mut rl: Editor<(), DefaultHistory> = DefaultEditor::new()?;
    let mut current: Option<Message> = None;
    let mut listener = None;

    println!("Queue {queue} ready. Type `help` for commands.");

    loop {
        let Ok(line) = rl.readline("> ") else { break };
        let _ = rl.add_history_entry(line.as_str());

        match line.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["help"] => println!(
                "send <type> <payload> | peek | peek-batch <n> | receive [ms] | complete | abandon | \
                 dead-letter | renew <ms> | count | clear | stats | listen | unlisten | exit"
            ),
            ["exit" | "quit"] => break,

            ["send", message_type, rest @ ..] => {
                let message = Message::new("shell", *message_type, rest.join(" "));
                queue.send("shell", message).await?;
                println!("> sent");
            }

            ["peek"] => match queue.peek("shell").await? {
                Some(m) => println!("> {} {}", m.message_id(), m),
                None => println!("> (empty)"),
            },

            ["peek-batch", n] => match n.parse::<usize>() {
                Ok(n) => {
                    for m in queue.peek_batch("shell", n).await? {
                        println!("> {} {}", m.message_id(), m);
                    }
                }
                Err(_) => println!("Usage: peek-batch <n>"),
            },

            ["receive", rest @ ..] => {
                let timeout_ms = rest.first().and_then(|v| v.parse().ok()).unwrap_or(1000);
                match queue
                    .receive("shell", Duration::from_millis(timeout_ms))
                    .await?
                {
                    Some(m) => {
                        let token = m.lock_token().map(|t| t.value()).unwrap_or_default();
                        println!("> {} {} (lock {token})", m.message_id(), m);
                        current = Some(m);
                    }
                    None => println!("> (timed out)"),
                }
            }

            ["complete"] => settle(&queue, &mut current, Settle::Complete).await?,
            ["abandon"] => settle(&queue, &mut current, Settle::Abandon).await?,
            ["dead-letter"] => settle(&queue, &mut current, Settle::DeadLetter).await?,

            ["renew", ms] => match (ms.parse::<u64>(), &current) {
                (Ok(ms), Some(m)) => {
                    queue.renew_lock(m, Duration::from_millis(ms)).await?;
                    println!("> renewed");
                }
                (Err(_), _) => println!("Usage: renew <ms>"),
                (_, None) => println!("> nothing received"),
            },

            ["count"] => println!("> {}", queue.read_message_count().await?),
            ["clear"] => {
                queue.clear("shell").await?;
                current = None;
                println!("> cleared");
            }
            ["stats"] => print!("{}", queue.counters().snapshot(queue.name())),

            ["listen"] => {
                if listener.is_none() {
                    listener = Some(queue.begin_listen("shell", Arc::new(PrintReceiver)));
                    println!("> listening");
                }
            }
            ["unlisten"] => {
                if let Some(handle) = listener.take() {
                    queue.end_listen("shell");
                    let _ = handle.await;
                    println!("> stopped");
                }
            }

            _ => println!("Unknown cmd. Type `help`."),
        }
    }

    queue.close("shell").await?;
    if let Some(handle) = listener {
        let _ = handle.await;
    }
    Ok(())
}

enum Settle {
    Complete,
    Abandon,
    DeadLetter,
}

async fn settle(
    queue: &MemoryMessageQueue,
    current: &mut Option<Message>,
    how: Settle,
) -> anyhow::Result<()> {
    let Some(mut message) = current.take() else {
        println!("> nothing received");
        return Ok(());
    };
    match how {
        Settle::Complete => queue.complete(&mut message).await?,
        Settle::Abandon => queue.abandon(&mut message).await?,
        Settle::DeadLetter => queue.move_to_dead_letter(&mut message).await?,
    }
    println!("> done");
    Ok(())
}

// ───────────────────────────────────────────────────────────
// Demo: producer + background listener
// ───────────────────────────────────────────────────────────
async fn demo(mut config: Config, messages: u64, listen_interval_ms: u64) -> anyhow::Result<()> {
    config.defaults.listen_interval_ms = listen_interval_ms.max(1);
    config.validate()?;

    let manager = QueueManager::new(config);
    let queue = manager.get_or_create("demo")?;
    queue.open("demo").await?;

    let receiver = Arc::new(CountingReceiver::default());
    let handle = queue.begin_listen("demo", receiver.clone());

    for i in 0..messages {
        queue
            .send_as_object("demo", "tick", &serde_json::json!({ "seq": i }))
            .await?;
    }
    info!(messages, "Produced messages");

    let deadline = tokio::time::Instant::now()
        + Duration::from_millis(listen_interval_ms.max(1) * (messages + 10));
    while receiver.handled.load(Ordering::Relaxed) < messages
        && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    queue.end_listen("demo");
    let _ = handle.await;
    queue.close("demo").await?;

    print!("{}", queue.counters().snapshot(queue.name()));
    Ok(())
}
