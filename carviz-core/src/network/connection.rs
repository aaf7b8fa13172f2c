use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

use crate::codec::MessageCodec;

/// Inbound half: yields one [`Decoded`](crate::codec::Decoded) per segment.
pub type MessageReader<R> = FramedRead<R, MessageCodec>;

/// Outbound half: accepts [`AppMessage`](crate::AppMessage)s.
pub type MessageWriter<W> = FramedWrite<W, MessageCodec>;

/// A framed connection to one peer over any byte stream.
///
/// The two halves are independent: the reader loop owns one, the
/// telemetry writer owns the other.
#[derive(Debug)]
pub struct Connection<T> {
    reader: MessageReader<ReadHalf<T>>,
    writer: MessageWriter<WriteHalf<T>>,
}

impl<T: AsyncRead + AsyncWrite> Connection<T> {
    pub fn new(stream: T) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: FramedRead::new(read_half, MessageCodec::new()),
            writer: FramedWrite::new(write_half, MessageCodec::new()),
        }
    }

    pub fn into_split(self) -> (MessageReader<ReadHalf<T>>, MessageWriter<WriteHalf<T>>) {
        (self.reader, self.writer)
    }
}

impl Connection<TcpStream> {
    pub async fn connect(conn_info: &ConnectionInfo) -> Result<Self, std::io::Error> {
        let stream = TcpStream::connect(conn_info.to_string()).await?;
        stream.set_nodelay(true)?;
        debug!("connected to {conn_info}");
        Ok(Self::new(stream))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`.
    pub fn parse(addr: &str) -> Option<Self> {
        let (host, port) = addr.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        Some(Self::new(host, port.parse().ok()?))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::AppMessage;
    use futures::{SinkExt, StreamExt};

    #[test]
    fn parse_connection_info() {
        let info = ConnectionInfo::parse("127.0.0.1:4433").unwrap();
        assert_eq!(info.host(), "127.0.0.1");
        assert_eq!(info.port(), 4433);
        assert_eq!(info.to_string(), "127.0.0.1:4433");
        assert!(ConnectionInfo::parse("nohost").is_none());
        assert!(ConnectionInfo::parse(":80").is_none());
        assert!(ConnectionInfo::parse("host:port").is_none());
    }

    #[tokio::test]
    async fn halves_are_independent() {
        let (a, b) = tokio::io::duplex(64);
        let (_, mut a_writer) = Connection::new(a).into_split();
        let (mut b_reader, _b_writer) = Connection::new(b).into_split();

        a_writer
            .send(AppMessage::L2Error { val: 1.25 })
            .await
            .unwrap();
        let got = b_reader.next().await.unwrap().unwrap().unwrap();
        assert_eq!(got, AppMessage::L2Error { val: 1.25 });
    }
}
