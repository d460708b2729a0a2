use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::session::{Action, Ingress, Session, Update};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// How long to wait for the server to acknowledge our close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Runs one session to completion over a real WebSocket: connects, feeds
/// every channel event to the session machine in order and carries out what
/// it asks for.
pub async fn run(
    url: String,
    mut session: Session,
    updates: mpsc::UnboundedSender<Update>,
    mut cancel: oneshot::Receiver<()>,
) {
    debug!(%url, "Connecting");

    let connected = tokio::select! {
        res = connect_async(url.as_str()) => Some(res),
        _ = &mut cancel => None,
    };

    let mut ws = match connected {
        Some(Ok((ws, resp))) => {
            info!(status = %resp.status(), "Connected");
            ws
        }
        Some(Err(err)) => {
            let actions = session.handle(Ingress::TransportError(err.to_string()));
            emit_all(actions, &updates);
            return;
        }
        None => {
            let actions = session.handle(Ingress::Cancel);
            emit_all(actions, &updates);
            return;
        }
    };

    let mut watching_cancel = true;
    let mut pending = vec![Ingress::Opened];

    loop {
        for ingress in pending.drain(..) {
            let actions = session.handle(ingress);
            if let Err(err) = perform(&mut ws, actions, &updates).await {
                let actions = session.handle(Ingress::TransportError(err.to_string()));
                emit_all(actions, &updates);
            }
        }

        if session.is_finished() {
            break;
        }

        tokio::select! {
            item = ws.next() => match item {
                Some(Ok(msg)) => {
                    if let Some(ingress) = ingress_of(msg) {
                        pending.push(ingress);
                    }
                }
                Some(Err(err)) => {
                    pending.push(Ingress::TransportError(err.to_string()));
                    pending.push(Ingress::Closed(None));
                }
                None => pending.push(Ingress::Closed(None)),
            },
            res = &mut cancel, if watching_cancel => {
                watching_cancel = false;
                match res {
                    Ok(()) => pending.push(Ingress::Cancel),
                    // Handle dropped without closing; keep running detached.
                    Err(_) => debug!("Session handle dropped"),
                }
            }
        }
    }

    drain(&mut ws).await;
}

fn ingress_of(msg: Message) -> Option<Ingress> {
    match msg {
        Message::Text(text) => Some(Ingress::Frame(text.as_str().to_owned())),
        Message::Binary(data) => Some(Ingress::Frame(String::from_utf8_lossy(&data).into_owned())),
        Message::Close(frame) => {
            debug!(?frame, "Close frame received");
            Some(Ingress::Closed(frame.map(|f| u16::from(f.code))))
        }
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}

async fn perform(
    ws: &mut WsStream,
    actions: Vec<Action>,
    updates: &mpsc::UnboundedSender<Update>,
) -> crate::Result<()> {
    for action in actions {
        match action {
            Action::Send(text) => {
                trace!(%text, "Sending request");
                ws.send(Message::Text(text.into())).await?;
            }
            Action::Close => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "".into(),
                };
                // The peer may already be gone; nothing is waiting on this.
                if let Err(err) = ws.close(Some(frame)).await {
                    debug!(%err, "Closing channel");
                }
            }
            Action::Emit(update) => emit(update, updates),
        }
    }
    Ok(())
}

fn emit_all(actions: Vec<Action>, updates: &mpsc::UnboundedSender<Update>) {
    for action in actions {
        if let Action::Emit(update) = action {
            emit(update, updates);
        }
    }
}

fn emit(update: Update, updates: &mpsc::UnboundedSender<Update>) {
    if updates.send(update).is_err() {
        trace!("Nobody is listening for updates");
    }
}

// Read until the server answers the close handshake or the grace period ends.
async fn drain(ws: &mut WsStream) {
    let res = timeout(CLOSE_GRACE, async {
        while let Some(item) = ws.next().await {
            match item {
                Ok(msg) => trace!(?msg, "Discarding message after session finished"),
                Err(_) => break,
            }
        }
    })
    .await;

    if res.is_err() {
        warn!("Server did not finish the close handshake");
    }
}
