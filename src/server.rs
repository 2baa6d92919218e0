//! cellterm TCP Server
//!
//! Listens for application connections and viewer connections.
//! Applications send commands as JSON lines; a dedicated engine thread
//! owns the session and executes them in order.
//! Viewers connect via telnet, receive frames as ANSI, and their
//! keyboard and mouse input is pushed into the session's input queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};

use crate::core::Size;
use crate::error::{EngineError, Result};
use crate::input::{Event, InputParser, InputSender};
use crate::protocol::{execute, parse_command, serialize_response, Command, Response};
use crate::renderer::{AnsiEncoder, Frame, Surface};
use crate::session::Session;

pub const DEFAULT_COMMAND_PORT: u16 = 6140;
pub const DEFAULT_VIEWER_PORT: u16 = 6141;

// Telnet protocol constants
const IAC: u8 = 255; // Interpret As Command
const WILL: u8 = 251;
const WONT: u8 = 252;
const DO: u8 = 253;
const DONT: u8 = 254;
const SB: u8 = 250; // Subnegotiation Begin
const SE: u8 = 240; // Subnegotiation End

// Telnet options
const ECHO: u8 = 1;
const SUPPRESS_GO_AHEAD: u8 = 3;
const LINEMODE: u8 = 34;

/// Telnet negotiation to enable raw mode (character-at-a-time, no local echo)
fn telnet_raw_mode() -> Vec<u8> {
    vec![
        IAC, WILL, ECHO,              // Server will echo (client should not)
        IAC, WILL, SUPPRESS_GO_AHEAD, // No line buffering
        IAC, DO, SUPPRESS_GO_AHEAD,   // Client should not buffer
        IAC, DONT, LINEMODE,          // Disable line mode
    ]
}

/// Strip telnet IAC sequences from viewer input
fn filter_telnet_commands(data: &[u8]) -> Vec<u8> {
    let mut filtered = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] != IAC || i + 1 >= data.len() {
            filtered.push(data[i]);
            i += 1;
            continue;
        }
        match data[i + 1] {
            // IAC + command + option
            WILL | WONT | DO | DONT => i += 3,
            SB => {
                // Skip until IAC SE
                i += 2;
                while i < data.len() {
                    if data[i] == IAC && data.get(i + 1) == Some(&SE) {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            IAC => {
                // Escaped IAC (255 255) = literal 255
                filtered.push(IAC);
                i += 2;
            }
            _ => i += 2,
        }
    }
    filtered
}

/// Surface that publishes frames to every connected viewer
pub struct WatchSurface {
    frames: watch::Sender<Option<Arc<Frame>>>,
    title: watch::Sender<String>,
}

/// Viewer side of a `WatchSurface`
#[derive(Clone)]
pub struct WatchReceivers {
    pub frames: watch::Receiver<Option<Arc<Frame>>>,
    pub title: watch::Receiver<String>,
}

impl WatchSurface {
    pub fn new() -> (Self, WatchReceivers) {
        let (frames, frames_rx) = watch::channel(None);
        let (title, title_rx) = watch::channel(String::new());
        (
            Self { frames, title },
            WatchReceivers {
                frames: frames_rx,
                title: title_rx,
            },
        )
    }
}

impl Surface for WatchSurface {
    fn name(&self) -> &str {
        "watch"
    }

    fn init(&mut self, title: &str, size: Size, cell_size: Size) -> Result<()> {
        debug!("Watch surface: {} cells of {}", size, cell_size);
        self.title.send_replace(title.to_string());
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.frames.send_replace(Some(Arc::new(frame.clone())));
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        self.title.send_replace(title.to_string());
    }

    fn shutdown(&mut self) {
        self.frames.send_replace(None);
    }
}

/// A command waiting for the engine thread
struct Request {
    command: Command,
    reply: oneshot::Sender<Response>,
}

/// Handle for submitting commands to the engine thread
#[derive(Clone)]
pub struct EngineHandle {
    requests: mpsc::Sender<Request>,
}

impl EngineHandle {
    /// Run `command` on the engine thread and wait for its response
    pub async fn submit(&self, command: Command) -> Response {
        let closed = || Response::Error {
            message: EngineError::EngineClosed.to_string(),
        };
        let (reply, rx) = oneshot::channel();
        if self.requests.send(Request { command, reply }).await.is_err() {
            return closed();
        }
        rx.await.unwrap_or_else(|_| closed())
    }
}

/// Move `session` onto its own thread; it lives until every handle is
/// dropped.
pub fn spawn_engine(mut session: Session) -> std::io::Result<EngineHandle> {
    let (requests, mut rx) = mpsc::channel::<Request>(64);
    thread::Builder::new().name("cellterm-engine".to_string()).spawn(move || {
        while let Some(request) = rx.blocking_recv() {
            let response = execute(&mut session, request.command);
            let _ = request.reply.send(response);
        }
        session.close();
        info!("Engine thread finished");
    })?;
    Ok(EngineHandle { requests })
}

/// cellterm Server
pub struct Server {
    /// Application port (applications connect here to send commands)
    pub command_port: u16,
    /// Viewer port (viewers connect here via telnet)
    pub viewer_port: u16,
    /// Command port bind address (127.0.0.1 for local, 0.0.0.0 for network)
    pub bind: String,
    /// Option string applied right after the session opens
    pub options: Option<String>,
}

impl Server {
    pub fn new(command_port: u16, viewer_port: u16, bind: String) -> Self {
        Self {
            command_port,
            viewer_port,
            bind,
            options: None,
        }
    }

    pub fn with_options(mut self, options: Option<String>) -> Self {
        self.options = options;
        self
    }

    /// Run the server
    pub async fn run(&self) -> std::result::Result<(), Box<dyn std::error::Error>> {
        info!("Starting cellterm server...");
        info!("Command port: {} (bind: {})", self.command_port, self.bind);
        info!("Viewer port: {}", self.viewer_port);

        let command_listener = TcpListener::bind(format!("{}:{}", self.bind, self.command_port)).await?;
        let viewer_listener = TcpListener::bind(format!("0.0.0.0:{}", self.viewer_port)).await?;
        self.serve(command_listener, viewer_listener).await
    }

    /// Open a session and serve both listeners until they fail
    pub async fn serve(
        &self,
        command_listener: TcpListener,
        viewer_listener: TcpListener,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let (surface, receivers) = WatchSurface::new();
        let mut session = Session::new(Box::new(surface));
        session.open()?;
        if let Some(options) = &self.options {
            session.set(options)?;
        }
        session.refresh()?;
        let sender = session.input_sender();
        let engine = spawn_engine(session)?;

        info!("cellterm server listening");

        let viewers = Arc::new(AtomicUsize::new(0));

        // Handle application connections
        let command_handle = tokio::spawn(async move {
            loop {
                match command_listener.accept().await {
                    Ok((socket, addr)) => {
                        info!("Application connected from {}", addr);
                        tokio::spawn(handle_command_connection(socket, engine.clone()));
                    }
                    Err(e) => {
                        error!("Command accept error: {}", e);
                    }
                }
            }
        });

        // Handle viewer connections
        let viewer_handle = tokio::spawn(async move {
            loop {
                match viewer_listener.accept().await {
                    Ok((socket, addr)) => {
                        info!("Viewer connected from {}", addr);
                        tokio::spawn(handle_viewer_connection(
                            socket,
                            addr.to_string(),
                            sender.clone(),
                            receivers.clone(),
                            viewers.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Viewer accept error: {}", e);
                    }
                }
            }
        });

        // Wait for both
        let _ = tokio::try_join!(command_handle, viewer_handle)?;

        Ok(())
    }
}

/// Handle an application connection (JSON commands in, responses out)
async fn handle_command_connection(socket: TcpStream, engine: EngineHandle) {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!("Application disconnected");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!("Command: {}", trimmed);

                let response = match parse_command(trimmed) {
                    Ok(command) => engine.submit(command).await,
                    Err(e) => Response::Error {
                        message: format!("Invalid command: {}", e),
                    },
                };
                let json = serialize_response(&response);
                if let Err(e) = writer.write_all(format!("{}\n", json).as_bytes()).await {
                    error!("Failed to send response: {}", e);
                    break;
                }
                let _ = writer.flush().await;
            }
            Err(e) => {
                error!("Application read error: {}", e);
                break;
            }
        }
    }
}

/// Handle a viewer connection; the last viewer leaving requests close
async fn handle_viewer_connection(
    socket: TcpStream,
    addr: String,
    sender: InputSender,
    receivers: WatchReceivers,
    viewers: Arc<AtomicUsize>,
) {
    viewers.fetch_add(1, Ordering::SeqCst);
    if let Err(e) = serve_viewer(socket, &sender, receivers).await {
        warn!("Viewer {} error: {}", addr, e);
    }
    info!("Viewer {} disconnected", addr);
    if viewers.fetch_sub(1, Ordering::SeqCst) == 1 {
        info!("Last viewer left, requesting close");
        sender.push(Event::Close);
    }
}

async fn serve_viewer(socket: TcpStream, sender: &InputSender, mut receivers: WatchReceivers) -> std::io::Result<()> {
    let (mut reader, mut writer) = socket.into_split();
    let mut encoder = AnsiEncoder::new();

    // Send telnet negotiation to enable raw mode (suppress local echo)
    writer.write_all(&telnet_raw_mode()).await?;
    writer.write_all(&encoder.init()).await?;
    let title = receivers.title.borrow_and_update().clone();
    writer.write_all(&encoder.title(&title)).await?;
    let current = receivers.frames.borrow_and_update().clone();
    if let Some(frame) = current {
        writer.write_all(&encoder.render(&frame)).await?;
    }
    writer.flush().await?;

    let mut parser = InputParser::new();
    let mut buf = [0u8; 256];

    loop {
        tokio::select! {
            changed = receivers.frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = receivers.frames.borrow_and_update().clone();
                if let Some(frame) = frame {
                    writer.write_all(&encoder.render(&frame)).await?;
                    writer.flush().await?;
                }
            }
            changed = receivers.title.changed() => {
                if changed.is_err() {
                    break;
                }
                let title = receivers.title.borrow_and_update().clone();
                writer.write_all(&encoder.title(&title)).await?;
                writer.flush().await?;
            }
            // Read from socket
            result = reader.read(&mut buf) => {
                let n = result?;
                if n == 0 {
                    break;
                }
                // Filter out telnet protocol commands
                let filtered = filter_telnet_commands(&buf[..n]);
                if filtered.is_empty() {
                    continue;
                }
                parser.set_cell_size(sender.cell_size());
                for event in parser.parse(&filtered) {
                    debug!("Viewer input: {:?}", event);
                    sender.push(event);
                }
            }
        }
    }

    let _ = writer.write_all(&encoder.shutdown()).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;
    use crate::font::Bitmap;
    use crate::input::keys::TK_CLOSE;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_telnet_commands() {
        let data = [b'a', IAC, DO, ECHO, b'b', IAC, IAC, IAC, SB, 31, 0, 80, IAC, SE, b'c', IAC, 241];
        assert_eq!(filter_telnet_commands(&data), vec![b'a', b'b', IAC, b'c']);
    }

    #[test]
    fn test_raw_mode_negotiation() {
        let raw = telnet_raw_mode();
        assert_eq!(raw.len(), 12);
        assert_eq!(&raw[..3], &[IAC, WILL, ECHO]);
    }

    #[test]
    fn test_watch_surface_publishes() {
        let (mut surface, receivers) = WatchSurface::new();
        surface.init("demo", Size::new(1, 1), Size::new(2, 2)).unwrap();
        assert_eq!(*receivers.title.borrow(), "demo");

        let frame = Frame {
            size: Size::new(1, 1),
            cell_size: Size::new(2, 2),
            pixels: Bitmap::new(Size::new(2, 2), Color::BLACK),
            cells: vec![Default::default()],
        };
        surface.present(&frame).unwrap();
        assert_eq!(receivers.frames.borrow().as_deref(), Some(&frame));
        surface.shutdown();
        assert!(receivers.frames.borrow().is_none());
    }

    #[tokio::test]
    async fn test_engine_executes_in_order() {
        let mut session = Session::headless();
        session.open().unwrap();
        let engine = spawn_engine(session).unwrap();

        let put = parse_command(r#"{"cmd":"put","x":1,"y":1,"code":"Q"}"#).unwrap();
        assert_eq!(engine.submit(put).await, Response::Ok);
        let pick = parse_command(r#"{"cmd":"pick","x":1,"y":1}"#).unwrap();
        assert_eq!(engine.submit(pick).await, Response::Int { value: 'Q' as i32 });
        assert_eq!(engine.submit(Command::Close).await, Response::Ok);
        assert_eq!(engine.submit(Command::Read).await, Response::Int { value: TK_CLOSE });
    }

    #[tokio::test]
    async fn test_command_port_round_trip() {
        let commands = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let viewers = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = commands.local_addr().unwrap();
        tokio::spawn(async move {
            let server = Server::new(0, 0, "127.0.0.1".to_string()).with_options(Some("window.size=20x10".to_string()));
            let _ = server.serve(commands, viewers).await;
        });

        let socket = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = socket.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        writer.write_all(b"{\"cmd\":\"get\",\"key\":\"window.size\"}\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim(), r#"{"type":"string","value":"20x10"}"#);

        line.clear();
        writer.write_all(b"not json\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains(r#""type":"error""#));
    }
}
