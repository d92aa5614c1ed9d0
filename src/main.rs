use anyhow::{ anyhow, bail, Context, Result };
use futures::stream::{ self, StreamExt };
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

use topichub::{
    arguments::{
        get_arg_value,
        get_arg_values,
        get_enabled_debug_modes,
        is_help_requested,
        print_help,
    },
    config::{ self, CONFIG_FILE_PATH },
    global,
    hub::{ ChannelEvent, Connection, HubEvent, TopicChannel },
    logger::{ self, LogTag },
};

/// Main entry point for topichub
///
/// Connects, subscribes to every `--topic`, and logs each event until
/// `--duration` elapses or Ctrl-C.
#[tokio::main]
async fn main() {
    logger::init();

    if is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "topichub starting up...");

    let debug_modes = get_enabled_debug_modes();
    if !debug_modes.is_empty() {
        logger::info(LogTag::System, &format!("Debug modes: {}", debug_modes.join(", ")));
    }

    if let Err(e) = run().await {
        logger::error(LogTag::System, &format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Outcome of the first identify handshake
enum Startup {
    Identified,
    Rejected(Value),
}

async fn run() -> Result<()> {
    let config_path = get_arg_value("--config").unwrap_or_else(|| CONFIG_FILE_PATH.to_string());
    config::load_config_from_path(&config_path).context("loading configuration")?;

    let mut cfg = config::get_config_clone();
    if let Some(url) = get_arg_value("--url") {
        cfg.connection.url = url;
    }

    let token = get_arg_value("--token").ok_or_else(|| anyhow!("--token is required"))?;
    let topic_names = get_arg_values("--topic");
    if topic_names.is_empty() {
        bail!("at least one --topic is required");
    }
    let invitation = get_arg_value("--invitation");
    let duration = match get_arg_value("--duration") {
        Some(secs) => {
            let secs: u64 = secs.parse().with_context(|| format!("invalid --duration '{}'", secs))?;
            Some(Duration::from_secs(secs))
        }
        None => None,
    };

    let connection = Connection::websocket(&cfg);
    global::install(connection.clone());

    let (startup_tx, mut startup_rx) = mpsc::unbounded_channel();
    let rejected_tx = startup_tx.clone();
    connection
        .on(HubEvent::Identify, move |_| {
            let _ = startup_tx.send(Startup::Identified);
        })
        .on(HubEvent::IdentifyRejected, move |payload| {
            let _ = rejected_tx.send(Startup::Rejected(payload.clone()));
        })
        .on(HubEvent::Disconnect, |payload| {
            logger::warning(LogTag::Connection, &format!("Disconnected: {}", payload));
        });

    logger::info(LogTag::System, &format!("Connecting to {}", cfg.connection.url));
    connection.connect(&token)?;

    tokio::select! {
        startup = startup_rx.recv() => {
            match startup {
                Some(Startup::Identified) => {}
                Some(Startup::Rejected(payload)) => bail!("server rejected token: {}", payload),
                None => bail!("connection dropped before identify"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            connection.disconnect();
            return Ok(());
        }
    }

    let mut channels = Vec::new();
    for name in &topic_names {
        let topic = match &invitation {
            Some(invitation) => {
                let invitation = invitation.clone();
                connection.topic_with_token(name, move || Some(invitation.clone()))
            }
            None => connection.topic(name),
        };
        let channel = TopicChannel::new(&topic);
        topic.subscribe(None).await.with_context(|| format!("subscribing to {}", name))?;
        logger::info(LogTag::Topic, &format!("Listening on {}", name));
        channels.push(channel);
    }

    let mut events = stream::select_all(
        channels.into_iter().map(|channel| {
            let name = channel.topic().name().to_string();
            channel.map(move |event| (name.clone(), event))
        })
    );

    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            next = events.next() => {
                match next {
                    Some((name, event)) => log_event(&name, &event),
                    None => {
                        logger::info(LogTag::System, "Every topic closed");
                        break;
                    }
                }
            }
            _ = &mut deadline => {
                logger::info(LogTag::System, "Duration elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                logger::info(LogTag::System, "Interrupted");
                break;
            }
        }
    }

    connection.disconnect();
    drop(events);
    global::take();

    let metrics = serde_json::to_string(&connection.metrics())?;
    logger::info(
        LogTag::System,
        &format!("Session ended after {}s: {}", global::uptime_secs(), metrics)
    );
    Ok(())
}

fn log_event(topic: &str, event: &ChannelEvent) {
    match event {
        ChannelEvent::Topic { event, payload } => {
            logger::info(LogTag::Channel, &format!("[{}] {} {}", topic, event, payload));
        }
        ChannelEvent::Presence { op, diff } => {
            logger::info(LogTag::Channel, &format!("[{}] {} {}", topic, op.event(), diff));
        }
        ChannelEvent::Status(status) => {
            logger::info(LogTag::Channel, &format!("[{}] status {}", topic, status));
        }
    }
}
