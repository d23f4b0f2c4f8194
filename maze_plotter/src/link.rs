// link.rs - Half-duplex line transport to the plotter controller

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error_handling::{PlotError, Result};
use crate::protocol::{parse_ack, Ack, DeviceCommand};

/// One command in flight at a time: write, then wait for the answer line.
pub struct DeviceLink {
    reader: Box<dyn AsyncBufRead + Unpin + Send>,
    writer: Box<dyn AsyncWrite + Unpin + Send>,
    ack_timeout: Duration,
    // Partial answer left behind by a timed-out read.
    pending: Vec<u8>,
    // Acknowledgments still owed for commands that timed out.
    stale_acks: usize,
}

impl DeviceLink {
    pub fn new<R, W>(reader: R, writer: W, ack_timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            reader: Box::new(BufReader::new(reader)),
            writer: Box::new(writer),
            ack_timeout,
            pending: Vec::new(),
            stale_acks: 0,
        }
    }

    /// Line protocol over TCP, e.g. a serial-to-network bridge.
    pub async fn connect_tcp(addr: &str, ack_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        log::info!("Connected to plotter at {addr}");
        Ok(Self::new(reader, writer, ack_timeout))
    }

    /// Send `command` and wait for its acknowledgment. Running out of time
    /// is not an error: the caller carries on as if the device said `OK`.
    pub async fn send(&mut self, command: &DeviceCommand) -> Result<Ack> {
        log::trace!("-> {command}");
        self.writer.write_all(command.to_wire().as_bytes()).await?;
        self.writer.flush().await?;

        match tokio::time::timeout(self.ack_timeout, self.read_reply(command)).await {
            Ok(line) => parse_ack(command, &line?),
            Err(_) => {
                self.stale_acks += 1;
                log::warn!(
                    "No acknowledgment for {command} within {:?}, continuing",
                    self.ack_timeout
                );
                Ok(Ack::TimedOut)
            }
        }
    }

    /// Next reply line for `command`. A late `OK` owed to a timed-out
    /// command is skipped when `command` answers with text; for other
    /// commands it stands in for their own `OK`, which then becomes the
    /// owed one.
    async fn read_reply(&mut self, command: &DeviceCommand) -> Result<String> {
        loop {
            let line = self.read_line().await?;
            log::trace!("<- {line}");
            if command.expects_text() && self.stale_acks > 0 && line == "OK" {
                self.stale_acks -= 1;
                log::debug!("Dropped late acknowledgment before {command}");
                continue;
            }
            return Ok(line);
        }
    }

    async fn read_line(&mut self) -> Result<String> {
        loop {
            let n = self.reader.read_until(b'\n', &mut self.pending).await?;
            if n == 0 {
                return Err(PlotError::ConnectionClosed);
            }
            let line = String::from_utf8_lossy(&self.pending).trim().to_string();
            self.pending.clear();
            if !line.is_empty() {
                return Ok(line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split, AsyncReadExt};

    #[tokio::test]
    async fn test_round_trip_over_duplex() {
        let (client, server) = duplex(256);
        let (r, w) = split(client);
        let mut link = DeviceLink::new(r, w, Duration::from_secs(1));

        let device = tokio::spawn(async move {
            let (mut r, mut w) = split(server);
            let mut buf = [0u8; 64];
            let n = r.read(&mut buf).await.unwrap();
            w.write_all(b"\r\nOK\r\n").await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        let ack = link.send(&DeviceCommand::Motors(true)).await.unwrap();
        assert_eq!(ack, Ack::Ok);
        assert_eq!(device.await.unwrap(), "EM,1,1\r");
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_device_times_out_without_error() {
        let (client, _server) = duplex(256);
        let (r, w) = split(client);
        let mut link = DeviceLink::new(r, w, Duration::from_millis(200));
        let ack = link.send(&DeviceCommand::Motors(false)).await.unwrap();
        assert_eq!(ack, Ack::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_ok_is_not_read_as_version() {
        let (client, server) = duplex(256);
        let (r, w) = split(client);
        let mut link = DeviceLink::new(r, w, Duration::from_millis(200));

        tokio::spawn(async move {
            let (mut r, mut w) = split(server);
            let mut buf = [0u8; 64];
            // answer the motor command only after the link gave up on it
            let _ = r.read(&mut buf).await;
            tokio::time::sleep(Duration::from_millis(300)).await;
            w.write_all(b"OK\r\n").await.unwrap();
            let _ = r.read(&mut buf).await;
            w.write_all(b"EBBv13_and_above Firmware Version 2.8.1\r\n").await.unwrap();
        });

        let ack = link.send(&DeviceCommand::Motors(true)).await.unwrap();
        assert_eq!(ack, Ack::TimedOut);
        let version = link.send(&DeviceCommand::Version).await.unwrap();
        assert_eq!(version, Ack::Text("EBBv13_and_above Firmware Version 2.8.1".into()));
    }

    #[tokio::test]
    async fn test_closed_device_is_reported() {
        let (client, server) = duplex(256);
        let (r, w) = split(client);
        let mut link = DeviceLink::new(r, w, Duration::from_secs(1));
        tokio::spawn(async move {
            let (mut r, _w) = split(server);
            let mut buf = [0u8; 16];
            let _ = r.read(&mut buf).await;
        });
        let err = link.send(&DeviceCommand::Version).await.unwrap_err();
        assert!(matches!(err, PlotError::ConnectionClosed), "{err:?}");
    }

    #[tokio::test]
    async fn test_error_reply_propagates() {
        let (client, server) = duplex(256);
        let (r, w) = split(client);
        let mut link = DeviceLink::new(r, w, Duration::from_secs(1));
        tokio::spawn(async move {
            let (mut r, mut w) = split(server);
            let mut buf = [0u8; 16];
            let _ = r.read(&mut buf).await;
            let _ = w.write_all(b"!8 Err: Unknown command\r\n").await;
        });
        let err = link.send(&DeviceCommand::ServoRate(150)).await.unwrap_err();
        assert!(matches!(err, PlotError::UnexpectedResponse { .. }));
    }
}
