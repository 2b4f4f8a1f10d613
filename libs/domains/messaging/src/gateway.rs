//! WebSocket session: authenticated before the upgrade, then one reader loop
//! per socket plus a writer task draining the hub channel.

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::error::MessagingError;
use crate::events::{ClientCommand, ServerEvent};
use crate::hub::{Client, ClientId};
use crate::models::{Identity, SendMessage};
use crate::repository::MessagingRepository;
use crate::service::MessagingService;

/// How long queued events may take to flush once the reader stops
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Removes the client from the hub however the session ends
struct ConnectionGuard<R: MessagingRepository> {
    service: Arc<MessagingService<R>>,
    client_id: ClientId,
}

impl<R: MessagingRepository> Drop for ConnectionGuard<R> {
    fn drop(&mut self) {
        self.service.disconnect(self.client_id);
    }
}

pub(crate) async fn run_session<R: MessagingRepository + 'static>(
    service: Arc<MessagingService<R>>,
    identity: Identity,
    socket: WebSocket,
) {
    let (client, mut outbound) = match service.connect(identity) {
        Ok(connected) => connected,
        Err(e) => {
            tracing::warn!(error = %e, "Socket dropped after upgrade");
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();
    let client_id = client.id;
    let mut writer = tokio::spawn(async move {
        while let Some(json) = outbound.recv().await {
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
        tracing::debug!(client_id = %client_id, "Socket writer finished");
    });

    {
        let _guard = ConnectionGuard {
            service: Arc::clone(&service),
            client_id,
        };
        read_loop(&service, &client, &mut stream).await;
    }

    // the hub no longer holds the sender; the writer ends once the queue drains
    drop(client);
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut writer).await.is_err() {
        tracing::debug!(client_id = %client_id, "Socket writer timed out");
        writer.abort();
    }
}

async fn read_loop<R: MessagingRepository>(
    service: &MessagingService<R>,
    client: &Client,
    stream: &mut SplitStream<WebSocket>,
) {
    let mut shutdown = service.shutdown().subscribe();
    if service.shutdown().is_shutting_down() {
        return;
    }

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                client.send(&ServerEvent::error("unavailable", "Server is shutting down"));
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_text(service, client, text.as_str()).await,
                Some(Ok(Message::Binary(_))) => {
                    client.send(&ServerEvent::error("bad_request", "Binary frames are not supported"));
                }
                Some(Ok(Message::Close(_))) | None => break,
                // ping/pong are answered by axum
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(client_id = %client.id, error = %e, "Socket error");
                    break;
                }
            }
        }
    }
}

/// Malformed frames are answered with an error; the socket stays open
pub(crate) async fn handle_text<R: MessagingRepository>(
    service: &MessagingService<R>,
    client: &Client,
    text: &str,
) {
    match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => dispatch(service, client, command).await,
        Err(e) => {
            tracing::debug!(client_id = %client.id, error = %e, "Malformed command");
            client.send(&ServerEvent::error(
                "bad_request",
                format!("Malformed command: {e}"),
            ));
        }
    }
}

/// Runs one command; a failure goes back to this socket as an `error` event
pub async fn dispatch<R: MessagingRepository>(
    service: &MessagingService<R>,
    client: &Client,
    command: ClientCommand,
) {
    let identity = &client.identity;
    let result = match command {
        ClientCommand::Join { thread_id } => service.join(client, thread_id).await.map(drop),
        ClientCommand::Leave { thread_id } => {
            service.leave(client, thread_id);
            Ok(())
        }
        ClientCommand::Send {
            thread_id,
            body,
            attachments,
            client_ref,
        } => {
            let input = SendMessage {
                body,
                attachments,
                client_ref,
            };
            service
                .send_message(identity, thread_id, input, Some(client))
                .await
                .map(drop)
        }
        ClientCommand::Delivered { message_ids } => {
            service.mark_delivered(identity, message_ids).await.map(drop)
        }
        ClientCommand::Read { thread_id, up_to } => {
            service.mark_read(identity, thread_id, up_to).await.map(drop)
        }
        ClientCommand::Typing {
            thread_id,
            is_typing,
        } => service.typing(client, thread_id, is_typing),
        ClientCommand::Ping => {
            client.send(&ServerEvent::Pong);
            Ok(())
        }
    };

    if let Err(e) = result {
        match &e {
            MessagingError::Database(db) => {
                tracing::error!(client_id = %client.id, error = %db, "Socket command failed")
            }
            other => tracing::debug!(client_id = %client.id, error = %other, "Socket command rejected"),
        }
        client.send(&ServerEvent::error(e.code(), e.client_message()));
    }
}
