//! Telnet line transport for the interactive shell.
//!
//! Single-session server over `std::net` (works on the host and on the
//! ESP-IDF std runtime).  The socket is non-blocking; `poll_line` is called
//! once per cooperative cycle and hands out at most one complete line.
//! A second client connecting while a session is active is turned away.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};

use log::{info, warn};

use crate::app::ports::ShellIo;

/// Telnet command bytes we need to recognize to strip option negotiation.
const IAC: u8 = 255;
const SB: u8 = 250;
const SE: u8 = 240;

const LINE_LIMIT: usize = 256;

#[derive(Clone, Copy, PartialEq)]
enum IacState {
    Data,
    Command,
    Option,
    Subnegotiation,
}

pub struct TelnetServer {
    listener: TcpListener,
    client: Option<TcpStream>,
    line: Vec<u8>,
    iac: IacState,
    just_connected: bool,
}

impl TelnetServer {
    pub fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        info!("telnet shell listening on {addr}");
        Ok(Self {
            listener,
            client: None,
            line: Vec::new(),
            iac: IacState::Data,
            just_connected: false,
        })
    }

    /// True exactly once per new session; the caller greets the client.
    pub fn take_connected(&mut self) -> bool {
        core::mem::take(&mut self.just_connected)
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Accept/read without blocking; returns at most one complete line.
    pub fn poll_line(&mut self) -> Option<String> {
        self.accept();
        // Take the stream out so the read loop and the IAC filter do not
        // fight over the borrow.
        let mut stream = self.client.take()?;

        let mut buf = [0u8; 128];
        let mut keep = true;
        let mut line = None;
        loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    info!("telnet client disconnected");
                    keep = false;
                    break;
                }
                Ok(n) => {
                    line = self.ingest(&buf[..n]);
                    if line.is_some() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("telnet read error: {e}");
                    keep = false;
                    break;
                }
            }
        }
        if keep {
            self.client = Some(stream);
        } else {
            self.line.clear();
        }
        line
    }

    fn accept(&mut self) {
        match self.listener.accept() {
            Ok((mut stream, peer)) => {
                if self.client.is_some() {
                    // One session at a time.
                    let _ = stream.write_all(b"busy: another session is active\r\n");
                    return;
                }
                if stream.set_nonblocking(true).is_err() {
                    return;
                }
                info!("telnet client connected from {peer}");
                self.client = Some(stream);
                self.line.clear();
                self.iac = IacState::Data;
                self.just_connected = true;
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => warn!("telnet accept error: {e}"),
        }
    }

    /// Feed raw bytes through the IAC filter into the line buffer.
    fn ingest(&mut self, data: &[u8]) -> Option<String> {
        let mut done: Option<String> = None;
        for &b in data {
            match self.iac {
                IacState::Command => {
                    self.iac = match b {
                        SB => IacState::Subnegotiation,
                        // WILL/WONT/DO/DONT carry one option byte.
                        251..=254 => IacState::Option,
                        _ => IacState::Data,
                    };
                }
                IacState::Option => self.iac = IacState::Data,
                IacState::Subnegotiation => {
                    if b == SE {
                        self.iac = IacState::Data;
                    }
                }
                IacState::Data => match b {
                    IAC => self.iac = IacState::Command,
                    b'\r' | 0 => {}
                    b'\n' => {
                        if done.is_none() {
                            done = Some(String::from_utf8_lossy(&self.line).into_owned());
                        }
                        self.line.clear();
                    }
                    _ => {
                        if self.line.len() < LINE_LIMIT {
                            self.line.push(b);
                        }
                    }
                },
            }
        }
        done
    }

    fn drop_client(&mut self) {
        self.client = None;
        self.line.clear();
    }
}

impl ShellIo for TelnetServer {
    fn print(&mut self, text: &str) {
        let crlf = text.replace('\n', "\r\n");
        let failed = match self.client.as_mut() {
            Some(stream) => stream.write_all(crlf.as_bytes()).is_err(),
            None => false,
        };
        if failed {
            self.drop_client();
        }
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.client.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        self.line.clear();
    }
}
