//! Fakes shared by the unit tests.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rand_core::CryptoRngCore;

use crate::bootstrap::{DialPolicy, ProtocolDialer};
use crate::config::Config;
use crate::enroll::{KeyMaterial, Terminal};
use crate::net::resolver::{srv_name, DirectoryLookup};
use crate::net::{Dialer, NetError, Stream};
use crate::startup::Ui;
use crate::tls::TlsPolicy;

/// Method selection "no auth" followed by a successful CONNECT reply.
pub fn socks5_success() -> Vec<u8> {
    vec![5, 0, 5, 0, 0, 1, 0, 0, 0, 0, 0, 0]
}

/// Stream that replays canned bytes and records what is written to it.
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    output: Arc<Mutex<Vec<u8>>>,
    open: Arc<AtomicUsize>,
}

impl ScriptedStream {
    pub fn new(input: Vec<u8>) -> Self {
        Self::with_output(
            input,
            Arc::new(Mutex::new(Vec::new())),
            Arc::new(AtomicUsize::new(0)),
        )
    }

    fn with_output(input: Vec<u8>, output: Arc<Mutex<Vec<u8>>>, open: Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self {
            input: Cursor::new(input),
            output,
            open,
        }
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Base dialer that hands out scripted streams and records every address.
#[derive(Clone)]
pub struct RecordingDialer {
    replies: Vec<u8>,
    dialed: Arc<Mutex<Vec<String>>>,
    written: Arc<Mutex<Vec<u8>>>,
    open: Arc<AtomicUsize>,
}

impl RecordingDialer {
    pub fn new(replies: Vec<u8>) -> Self {
        Self {
            replies,
            dialed: Arc::new(Mutex::new(Vec::new())),
            written: Arc::new(Mutex::new(Vec::new())),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Streams handed out and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn dialed(&self) -> Vec<String> {
        self.dialed.lock().unwrap().clone()
    }

    /// Everything written to any stream this dialer returned.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

impl Dialer for RecordingDialer {
    fn dial(&self, addr: &str) -> Result<Box<dyn Stream>, NetError> {
        self.dialed.lock().unwrap().push(String::from(addr));
        Ok(Box::new(ScriptedStream::with_output(
            self.replies.clone(),
            self.written.clone(),
            self.open.clone(),
        )))
    }
}

/// Directory lookup with a fixed answer that counts its calls.
pub struct CountingLookup {
    answer: Option<(String, u16)>,
    domains: Mutex<Vec<String>>,
}

impl CountingLookup {
    pub fn answering(host: &str, port: u16) -> Self {
        Self {
            answer: Some((String::from(host), port)),
            domains: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            domains: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.domains.lock().unwrap().len()
    }

    pub fn domains(&self) -> Vec<String> {
        self.domains.lock().unwrap().clone()
    }
}

impl DirectoryLookup for CountingLookup {
    fn resolve(&self, domain: &str) -> Result<(String, u16), NetError> {
        self.domains.lock().unwrap().push(String::from(domain));
        self.answer.clone().ok_or(NetError::NoRecords {
            name: srv_name(domain),
        })
    }
}

/// Terminal fed from a queue of answers. Running out of answers is end of input.
#[derive(Default)]
pub struct ScriptedTerminal {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub infos: Vec<String>,
    pub alerts: Vec<String>,
    /// Prompt in effect when each answer was read.
    pub asked: Vec<String>,
    pub password: Option<String>,
}

impl ScriptedTerminal {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| String::from(*a)).collect(),
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(String::from(password));
        self
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    pub fn last_prompt(&self) -> Option<&str> {
        self.prompts.last().map(String::as_str)
    }
}

impl Terminal for ScriptedTerminal {
    fn set_prompt(&mut self, prompt: &str) {
        self.prompts.push(String::from(prompt));
    }

    fn read_line(&mut self) -> io::Result<String> {
        let prompt = self.prompts.last().cloned().unwrap_or_default();
        self.asked.push(prompt);
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
    }

    fn info(&mut self, msg: &str) {
        self.infos.push(String::from(msg));
    }

    fn alert(&mut self, msg: &str) {
        self.alerts.push(String::from(msg));
    }
}

impl Ui for ScriptedTerminal {
    fn ask_for_password(&mut self, _config: &Config) -> io::Result<String> {
        self.password
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no password entered"))
    }
}

/// Key material that accepts files starting with `(privkeys`.
#[derive(Default)]
pub struct FakeKey {
    bytes: Vec<u8>,
    pub generated: usize,
}

impl KeyMaterial for FakeKey {
    fn generate(&mut self, rng: &mut dyn CryptoRngCore) {
        let mut bytes = vec![0u8; 16];
        rng.fill_bytes(&mut bytes);
        self.bytes = bytes;
        self.generated += 1;
    }

    fn import(&mut self, raw: &[u8]) -> bool {
        if !raw.starts_with(b"(privkeys") {
            return false;
        }
        self.bytes = raw.to_vec();
        true
    }

    fn serialize(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// What the protocol layer was handed on one dial.
#[derive(Debug, Clone)]
pub struct DialCall {
    pub address: String,
    pub local_part: String,
    pub domain: String,
    pub password: String,
    pub trusted_address: bool,
    pub archive: bool,
    pub tls: TlsPolicy,
    pub had_conn: bool,
    pub had_log: bool,
    pub create_callback: Option<u32>,
    pub first_bytes: Vec<u8>,
}

/// Protocol dialer that records its inputs instead of speaking XMPP.
#[derive(Default)]
pub struct RecordingProtocol {
    fail_with: Option<String>,
    read_len: usize,
    calls: Mutex<Vec<DialCall>>,
}

impl RecordingProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(String::from(reason)),
            ..Default::default()
        }
    }

    /// Reads `len` bytes from the pre-opened transport on each dial.
    pub fn reading(len: usize) -> Self {
        Self {
            read_len: len,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<DialCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProtocolDialer for RecordingProtocol {
    type Session = String;
    type Callback = u32;
    type Error = String;

    fn dial(
        &self,
        address: &str,
        local_part: &str,
        domain: &str,
        password: &str,
        policy: DialPolicy<u32>,
    ) -> Result<String, String> {
        let mut first_bytes = vec![0u8; self.read_len];
        let had_conn = policy.conn.is_some();
        if let Some(mut conn) = policy.conn {
            conn.read_exact(&mut first_bytes).map_err(|e| e.to_string())?;
        }

        let mut calls = self.calls.lock().unwrap();
        if let Some(reason) = &self.fail_with {
            return Err(reason.clone());
        }
        calls.push(DialCall {
            address: String::from(address),
            local_part: String::from(local_part),
            domain: String::from(domain),
            password: String::from(password),
            trusted_address: policy.trusted_address,
            archive: policy.archive,
            tls: policy.tls,
            had_conn,
            had_log: policy.log.is_some(),
            create_callback: policy.create_callback,
            first_bytes,
        });
        Ok(format!("session-{}", calls.len()))
    }
}
