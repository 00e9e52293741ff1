//! Node binary entry point. Grounded on this codebase's forwarder
//! `main.rs`: parse args, init tracing from `RUST_LOG`, load config or
//! exit(1), then run. Unlike the forwarder's synchronous stub, this
//! binary is `#[tokio::main]` since a running node juggles inbound link
//! acceptance, outbound dialing, the dispatch loop, and the status HTTP
//! server concurrently.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use mesh_protocol::{Message, MessageType, Priority, Validator};
use mesh_transport::{build_heartbeat_frame, run_link_loop, Backoff, BackoffPolicy, LinkLoopConfig, PriorityQueue, TransportError};
use node::{config, dispatch, http};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use node::state::AppState;

#[derive(Parser)]
#[command(name = "mesh-node", about = "Mesh overlay node")]
struct Cli {
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new mesh and become its first (leader) member.
    Seed,
    /// Join an existing mesh through an already-online introducer.
    Join {
        introducer_id: String,
        introducer_addr: String,
    },
    /// Start serving without changing membership (node was seeded/joined
    /// on a prior run and its state was reloaded from persistence).
    Run,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = match config::load_config(Some(&cli.config)) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(error = %err, path = %cli.config.display(), "failed to load config");
            std::process::exit(1);
        }
    };

    let state = AppState::new(cfg);

    run(state, cli.command).await;
}

/// Runs the node until ctrl-c / SIGTERM: brings membership up per
/// `command`, dials configured seeds, accepts inbound links, drains
/// dispatched messages, and serves the status HTTP surface. All tasks
/// share `inbound_tx`; `run_dispatch_loop` is the sole consumer of
/// `inbound_rx`. The dispatch loop is started before `command` is acted
/// on, since `Command::Join` needs it running to receive the
/// introducer's reply.
async fn run(state: Arc<AppState>, command: Command) {
    let (inbound_tx, inbound_rx) = mpsc::channel::<Message>(1024);

    let dispatch_handle = tokio::spawn(dispatch::run_dispatch_loop(state.clone(), inbound_rx));

    match command {
        Command::Seed => {
            let mesh_id = state.config.mesh_id.clone();
            let mesh_name = state.config.mesh_name.clone();
            let join_policy = state.config.join_policy;
            if let Err(err) = state.seed_mesh(mesh_id, mesh_name, join_policy, None).await {
                tracing::error!(error = %err, "failed to seed mesh");
                std::process::exit(1);
            }
        }
        Command::Join { introducer_id, introducer_addr } => {
            if dial_introducer(state.clone(), &introducer_addr, inbound_tx.clone()).await.is_err() {
                tracing::error!(introducer_addr = %introducer_addr, "failed to dial introducer");
                std::process::exit(1);
            }

            let mesh_id = state.config.mesh_id.clone();
            let mesh_name = state.config.mesh_name.clone();
            let join_policy = state.config.join_policy;
            if let Err(err) = state
                .join_mesh(introducer_id, introducer_addr, mesh_id, mesh_name, join_policy)
                .await
            {
                tracing::error!(error = %err, "failed to join mesh");
                std::process::exit(1);
            }
        }
        Command::Run => {
            if let Err(err) = state.start_mesh().await {
                tracing::error!(error = %err, "failed to resume mesh membership");
                std::process::exit(1);
            }
        }
    }

    for seed_addr in state.config.seeds.clone() {
        tokio::spawn(dial_seed_loop(state.clone(), seed_addr, inbound_tx.clone()));
    }

    let http_state = state.clone();
    let http_bind = state.config.status_http_bind.clone();
    let http_handle = tokio::spawn(async move {
        let router = http::router(http_state);
        match tokio::net::TcpListener::bind(&http_bind).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, router).await {
                    tracing::error!(error = %err, "status http server exited");
                }
            }
            Err(err) => tracing::error!(error = %err, bind = %http_bind, "failed to bind status http"),
        }
    });

    let ws_state = state.clone();
    let ws_listen_addr = state.config.listen_addr.clone();
    let ws_inbound_tx = inbound_tx.clone();
    let ws_handle = tokio::spawn(async move {
        let app = axum::Router::new()
            .route(
                "/mesh/ws",
                axum::routing::get({
                    let state = ws_state.clone();
                    let inbound_tx = ws_inbound_tx.clone();
                    move |ws: axum::extract::ws::WebSocketUpgrade| {
                        let state = state.clone();
                        let inbound_tx = inbound_tx.clone();
                        async move {
                            mesh_transport::listener::ws_link_upgrade(ws, move |sink, stream| {
                                accept_link(state, inbound_tx, sink, stream)
                            })
                            .await
                        }
                    }
                }),
            );
        match tokio::net::TcpListener::bind(&ws_listen_addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, app).await {
                    tracing::error!(error = %err, "mesh link listener exited");
                }
            }
            Err(err) => tracing::error!(error = %err, bind = %ws_listen_addr, "failed to bind mesh link listener"),
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
        _ = sigterm() => {
            tracing::info!("received sigterm, shutting down");
        }
    }

    dispatch_handle.abort();
    http_handle.abort();
    ws_handle.abort();
}

#[cfg(unix)]
async fn sigterm() {
    let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("installing a SIGTERM handler should not fail");
    term.recv().await;
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}

/// Exchanges node ids over a freshly accepted link, registers it, then
/// hands off to `run_link_loop` for the life of the connection.
async fn accept_link<Si, St>(state: Arc<AppState>, inbound_tx: mpsc::Sender<Message>, sink: Si, stream: St)
where
    Si: Sink<Vec<u8>, Error = TransportError> + Unpin + Send + 'static,
    St: Stream<Item = Result<Vec<u8>, TransportError>> + Unpin + Send + 'static,
{
    run_established_link(state, inbound_tx, sink, stream).await;
}

/// Dials `seed_addr` with backoff, forever, re-dialing whenever the link
/// drops — the long-lived reconnect behavior seed/peer links need.
async fn dial_seed_loop(state: Arc<AppState>, seed_addr: String, inbound_tx: mpsc::Sender<Message>) {
    loop {
        let backoff = Backoff::new(BackoffPolicy::default());
        // `max_attempts: None` retries forever, so this only returns `Ok`.
        if let Ok((sink, stream)) = mesh_transport::dialer::dial_with_backoff(&seed_addr, backoff, None).await {
            run_established_link(state.clone(), inbound_tx.clone(), sink, stream).await;
        }
    }
}

/// Shared by inbound-accepted and outbound-dialed links: exchange a
/// `NodeDiscovery` frame to learn the peer's node id, register the link,
/// then drive it with `run_link_loop` until it closes.
async fn run_established_link<Si, St>(state: Arc<AppState>, inbound_tx: mpsc::Sender<Message>, sink: Si, stream: St)
where
    Si: Sink<Vec<u8>, Error = TransportError> + Unpin + Send + 'static,
    St: Stream<Item = Result<Vec<u8>, TransportError>> + Unpin + Send + 'static,
{
    if let Some((peer_id, sink, stream, queue)) = handshake_and_register(&state, sink, stream).await {
        drive_link(state, peer_id, sink, stream, queue, inbound_tx).await;
    }
}

/// Exchanges the `NodeDiscovery` hello frame, learns the peer's node id
/// from its reply, and registers the link's send queue — the portion of
/// link establishment both inbound accepts and outbound dials need
/// before they can differ on how long they drive the resulting loop.
async fn handshake_and_register<Si, St>(state: &Arc<AppState>, mut sink: Si, mut stream: St) -> Option<(String, Si, St, PriorityQueue)>
where
    Si: Sink<Vec<u8>, Error = TransportError> + Unpin + Send + 'static,
    St: Stream<Item = Result<Vec<u8>, TransportError>> + Unpin + Send + 'static,
{
    let hello = mesh_protocol::ManagementPayload {
        sub_type: mesh_protocol::ManagementSubType::NodeDiscovery,
        data: mesh_protocol::payload::ManagementData::NodeDiscovery {
            node_id: state.node_id.clone(),
            mesh_id: state.config.mesh_id.clone(),
            address: state.config.listen_addr.clone(),
            capabilities: Vec::new(),
            metadata: serde_json::Map::new(),
        },
    };
    let Ok(hello_body) = serde_json::to_vec(&hello) else {
        tracing::error!("failed to encode node discovery hello");
        return None;
    };
    let header = state.framer.header(MessageType::Management, "", Priority::High, 30);
    let hello_message = Message::new(header, hello_body);
    let Ok(hello_frame) = hello_message.to_frame() else {
        tracing::error!("failed to frame node discovery hello");
        return None;
    };
    if sink.send(hello_frame).await.is_err() {
        tracing::warn!("link closed before handshake could be sent");
        return None;
    }

    let peer_id = match stream.next().await {
        Some(Ok(frame)) => match Message::from_frame(&frame) {
            Ok(message) => message.header.from,
            Err(err) => {
                tracing::warn!(error = %err, "malformed handshake frame, dropping link");
                return None;
            }
        },
        _ => {
            tracing::warn!("link closed during handshake");
            return None;
        }
    };

    let (sender, queue) = PriorityQueue::new(state.config.credit_window.message_capacity as usize);
    state.link_registry.register(peer_id.clone(), sender);
    Some((peer_id, sink, stream, queue))
}

/// Drives an already-registered link with `run_link_loop` until it
/// closes, then deregisters it.
async fn drive_link<Si, St>(state: Arc<AppState>, peer_id: String, sink: Si, stream: St, queue: PriorityQueue, inbound_tx: mpsc::Sender<Message>)
where
    Si: Sink<Vec<u8>, Error = TransportError> + Unpin + Send + 'static,
    St: Stream<Item = Result<Vec<u8>, TransportError>> + Unpin + Send + 'static,
{
    let framer_peer = peer_id.clone();
    let framer_state = state.clone();
    let heartbeat_frame = move || build_heartbeat_frame(&framer_state.framer, &framer_peer);

    run_link_loop(
        peer_id.clone(),
        sink,
        stream,
        queue,
        inbound_tx,
        Validator::default(),
        LinkLoopConfig { heartbeat_interval: Duration::from_secs(state.config.heartbeat_interval_s) },
        heartbeat_frame,
    )
    .await;

    state.link_registry.remove(&peer_id);
    tracing::info!(peer_id, "link closed");
}

/// Dials `introducer_addr` once (no retry — `mesh-node join` is a single
/// explicit operator action, not a long-lived reconnect like
/// `dial_seed_loop`), completes the handshake so `link_registry` has a
/// route to the introducer, then hands the link to `drive_link` in the
/// background so `join_mesh`'s `NodeDiscovery` request has somewhere to
/// go and its reply has somewhere to arrive from.
async fn dial_introducer(state: Arc<AppState>, introducer_addr: &str, inbound_tx: mpsc::Sender<Message>) -> Result<(), ()> {
    let (sink, stream) = mesh_transport::dialer::dial(introducer_addr).await.map_err(|err| {
        tracing::error!(error = %err, introducer_addr, "failed to dial introducer");
    })?;
    let Some((peer_id, sink, stream, queue)) = handshake_and_register(&state, sink, stream).await else {
        return Err(());
    };
    tokio::spawn(drive_link(state, peer_id, sink, stream, queue, inbound_tx));
    Ok(())
}
