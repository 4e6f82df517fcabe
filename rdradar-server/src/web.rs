use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{debug, trace};
use rdradar_core::{SyncState, SyncStats};
use rdradar_server::{pipeline::TargetMessage, Session, VERSION};
use serde::Serialize;
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_graceful_shutdown::SubsystemHandle;

const STATUS_URI: &str = "/api/v1/status";
const FORMAT_URI: &str = "/api/v1/format";
const TARGETS_URI: &str = "/api/v1/targets";

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Socket operation failed")]
    Io(#[from] io::Error),
    #[error("No port configured for the web server")]
    NoPort,
}

#[derive(Clone)]
pub struct Web {
    session: Session,
    shutdown_tx: broadcast::Sender<()>,
}

impl Web {
    pub fn new(session: Session) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Web {
            session,
            shutdown_tx,
        }
    }

    fn router(self) -> Router {
        Router::new()
            .route(STATUS_URI, get(get_status))
            .route(FORMAT_URI, get(get_format))
            .route(TARGETS_URI, get(targets_handler))
            .with_state(self)
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), WebError> {
        let port = self.session.read().args.port.ok_or(WebError::NoPort)?;
        let listener =
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port))
                .await
                .map_err(WebError::Io)?;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown_tx = self.shutdown_tx.clone();

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        log::info!("Starting HTTP web server on port {}", port);

        tokio::select! { biased;
            _ = subsys.on_shutdown_requested() => {
                let _ = shutdown_tx.send(());
            },
            r = axum::serve(listener, app)
                    .with_graceful_shutdown(
                        async move {
                            _ = shutdown_rx.recv().await;
                        }
                    ) => {
                return r.map_err(WebError::Io);
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusApi {
    version: &'static str,
    format: String,
    state: SyncState,
    stats: SyncStats,
}

#[debug_handler]
async fn get_status(State(state): State<Web>) -> Response {
    let inner = state.session.read();
    let status = StatusApi {
        version: VERSION,
        format: inner.format.name.clone(),
        state: inner.state,
        stats: inner.stats.clone(),
    };
    Json(status).into_response()
}

#[debug_handler]
async fn get_format(State(state): State<Web>) -> Response {
    let format = state.session.read().format.clone();
    Json(format).into_response()
}

#[debug_handler]
async fn targets_handler(
    State(state): State<Web>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    debug!("targets request from {}", addr);

    let shutdown_rx = state.shutdown_tx.subscribe();
    let targets_rx = state.session.subscribe_targets();
    ws.on_upgrade(move |socket| targets_stream(socket, targets_rx, shutdown_rx))
}

/// Forward decoded frames to one websocket client
async fn targets_stream(
    mut socket: WebSocket,
    mut targets_rx: broadcast::Receiver<TargetMessage>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Shutdown of websocket");
                break;
            },
            r = targets_rx.recv() => {
                match r {
                    Ok(message) => {
                        let json = match serde_json::to_string(&message) {
                            Ok(json) => json,
                            Err(e) => {
                                log::warn!("Cannot serialize target message: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = socket.send(Message::Text(json.into())).await {
                            log::warn!("Error on send to websocket: {}", e);
                            break;
                        }
                        trace!("Sent frame at offset {}", message.offset);
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        log::warn!("Websocket receiver lagged, skipped {} messages", n);
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("TargetMessage channel closed");
                        break;
                    }
                }
            }
        }
    }
}
