//! Opening push connections

use std::future::Future;

use futures::stream::{BoxStream, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use crate::error::ConnectionError;

/// Text payloads received on one push connection. The stream ends when the
/// connection closes; dropping it closes the connection locally.
pub type PushStream = BoxStream<'static, Result<String, ConnectionError>>;

/// Factory for push connections, injected into the connection manager
pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &str) -> impl Future<Output = Result<PushStream, ConnectionError>> + Send;
}

/// WebSocket push channel
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    async fn open(&self, url: &str) -> Result<PushStream, ConnectionError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;

        let stream = ws_stream.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Close(frame)) => Some(Err(ConnectionError::Closed(
                    frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                ))),
                Ok(_) => {
                    tracing::trace!("Ignoring non-text push frame");
                    None
                }
                Err(e) => Some(Err(e.into())),
            }
        });

        Ok(stream.boxed())
    }
}


#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use futures::SinkExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    use super::*;

    /// Accept one WebSocket client, send `frames`, then wait for it to hang up.
    async fn serve(frames: Vec<Message>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            for frame in frames {
                ws.send(frame).await.unwrap();
            }
            while let Some(Ok(_)) = ws.next().await {}
        });
        format!("ws://{addr}/ws")
    }

    #[tokio::test]
    async fn only_text_frames_are_yielded() {
        let url = serve(vec![
            Message::Ping(vec![1, 2]),
            Message::Binary(vec![0xde, 0xad]),
            Message::Text(r#"{"isPlaying":true}"#.to_string()),
            Message::Pong(vec![3]),
            Message::Text("second".to_string()),
        ])
        .await;

        let mut stream = WsConnector.open(&url).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), r#"{"isPlaying":true}"#);
        assert_eq!(stream.next().await.unwrap().unwrap(), "second");
    }

    #[tokio::test]
    async fn close_frame_ends_with_closed_error() {
        let url = serve(vec![
            Message::Text("last".to_string()),
            Message::Close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: Cow::Borrowed("server restart"),
            })),
        ])
        .await;

        let mut stream = WsConnector.open(&url).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "last");
        match stream.next().await {
            Some(Err(ConnectionError::Closed(reason))) => assert_eq!(reason, "server restart"),
            other => panic!("expected a close, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = WsConnector.open(&format!("ws://{addr}/ws")).await;
        assert!(matches!(result, Err(ConnectionError::WebSocket(_))));
    }
}
