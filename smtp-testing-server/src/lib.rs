use std::{future::Future, io, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufStream},
    net::{TcpListener, TcpStream},
    sync::Mutex,
    task::JoinHandle,
};
use tracing::{debug, trace, warn};

/// Spawn an SMTP server for testing purpose, run the given task then
/// stop the server. The port is randomly picked by the system, so
/// multiple servers can be spawned at the same time.
///
/// The server accepts one single account, authenticated with the
/// given login and password using the `PLAIN` mechanism. Emails are
/// not delivered anywhere: sessions are recorded and exposed by
/// [`SmtpTestingServer::sessions`].
pub async fn with_smtp_testing_server<F: Future<Output = ()>>(
    login: impl ToString,
    passwd: impl ToString,
    task: impl FnOnce(SmtpTestingServer) -> F,
) {
    let server = SmtpTestingServer::spawn(login, passwd)
        .await
        .expect("should spawn smtp testing server");

    task(server.clone()).await;

    server.shutdown();
}

/// What the server saw during one SMTP session.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Session {
    /// The name given by the client to EHLO or HELO.
    pub ehlo: Option<String>,
    /// The login the client successfully authenticated with.
    pub login: Option<String>,
    /// The reverse path given to MAIL FROM.
    pub mail_from: Option<String>,
    /// The forward paths given to RCPT TO, in order.
    pub rcpt_to: Vec<String>,
    /// The message received after DATA, dot-unstuffed.
    pub data: Option<Vec<u8>>,
    /// Whether the client closed the session with QUIT.
    pub quit: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.login.is_some()
    }

    pub fn data_to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.data.as_deref().unwrap_or_default()).to_string()
    }
}

type Sessions = Arc<Mutex<Vec<Session>>>;

#[derive(Clone, Debug)]
struct Credentials {
    login: String,
    passwd: String,
}

/// Handle on a running SMTP testing server.
#[derive(Clone, Debug)]
pub struct SmtpTestingServer {
    port: u16,
    sessions: Sessions,
    handle: Arc<JoinHandle<()>>,
}

impl SmtpTestingServer {
    /// Bind a random local port and start accepting connections.
    pub async fn spawn(login: impl ToString, passwd: impl ToString) -> io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        debug!("smtp testing server listening on port {port}");

        let creds = Arc::new(Credentials {
            login: login.to_string(),
            passwd: passwd.to_string(),
        });
        let sessions = Sessions::default();
        let handle = tokio::spawn(accept(listener, creds, sessions.clone()));

        Ok(Self {
            port,
            sessions,
            handle: Arc::new(handle),
        })
    }

    /// The host the server listens on.
    pub fn host(&self) -> &'static str {
        "127.0.0.1"
    }

    /// The port the server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a snapshot of all the sessions, in connection order.
    pub async fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().await.clone()
    }

    /// Stop accepting connections.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

async fn accept(listener: TcpListener, creds: Arc<Credentials>, sessions: Sessions) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!("cannot accept smtp connection: {err}");
                continue;
            }
        };

        debug!("accepting smtp connection from {addr}");

        let id = {
            let mut sessions = sessions.lock().await;
            sessions.push(Session::default());
            sessions.len() - 1
        };

        let creds = creds.clone();
        let sessions = sessions.clone();
        tokio::spawn(async move {
            if let Err(err) = serve(stream, id, &creds, &sessions).await {
                debug!("smtp session {id} ended with error: {err}");
            }
        });
    }
}

/// Serve one SMTP session.
///
/// The session record is always updated before the reply is written,
/// so that a client that got a reply can observe its effect.
async fn serve(
    stream: TcpStream,
    id: usize,
    creds: &Credentials,
    sessions: &Sessions,
) -> io::Result<()> {
    let mut stream = BufStream::new(stream);

    reply(&mut stream, "220 localhost ESMTP smtp-testing-server").await?;

    while let Some(line) = read_line(&mut stream).await? {
        let (verb, arg) = match line.split_once(' ') {
            Some((verb, arg)) => (verb.to_ascii_uppercase(), arg.trim()),
            None => (line.to_ascii_uppercase(), ""),
        };

        match verb.as_str() {
            "EHLO" | "HELO" => {
                sessions.lock().await[id].ehlo = Some(arg.to_owned());
                reply(&mut stream, "250-localhost\r\n250-AUTH PLAIN\r\n250 8BITMIME").await?;
            }
            "AUTH" => {
                let (mechanism, initial_response) = arg.split_once(' ').unwrap_or((arg, ""));

                if !mechanism.eq_ignore_ascii_case("PLAIN") {
                    reply(&mut stream, "504 5.5.4 Unrecognized authentication type").await?;
                    continue;
                }

                let response = if initial_response.is_empty() {
                    reply(&mut stream, "334 ").await?;
                    read_line(&mut stream).await?.unwrap_or_default()
                } else {
                    initial_response.to_owned()
                };

                match decode_plain(&response) {
                    Some((login, passwd)) if login == creds.login && passwd == creds.passwd => {
                        sessions.lock().await[id].login = Some(login);
                        reply(&mut stream, "235 2.7.0 Authentication successful").await?;
                    }
                    _ => {
                        reply(&mut stream, "535 5.7.8 Authentication credentials invalid").await?;
                    }
                }
            }
            "MAIL" => {
                let mut sessions_guard = sessions.lock().await;
                let session = &mut sessions_guard[id];

                if !session.is_authenticated() {
                    drop(sessions_guard);
                    reply(&mut stream, "530 5.7.0 Authentication required").await?;
                    continue;
                }

                session.mail_from = Some(path(arg));
                drop(sessions_guard);
                reply(&mut stream, "250 2.1.0 OK").await?;
            }
            "RCPT" => {
                sessions.lock().await[id].rcpt_to.push(path(arg));
                reply(&mut stream, "250 2.1.5 OK").await?;
            }
            "DATA" => {
                reply(&mut stream, "354 Start mail input; end with <CRLF>.<CRLF>").await?;
                let data = read_data(&mut stream).await?;
                sessions.lock().await[id].data = Some(data);
                reply(&mut stream, "250 2.0.0 OK queued").await?;
            }
            "RSET" => {
                {
                    let mut sessions = sessions.lock().await;
                    let session = &mut sessions[id];
                    session.mail_from = None;
                    session.rcpt_to.clear();
                    session.data = None;
                }
                reply(&mut stream, "250 2.0.0 OK").await?;
            }
            "NOOP" => {
                reply(&mut stream, "250 2.0.0 OK").await?;
            }
            "QUIT" => {
                sessions.lock().await[id].quit = true;
                reply(&mut stream, "221 2.0.0 Bye").await?;
                break;
            }
            _ => {
                reply(&mut stream, "502 5.5.2 Command not recognized").await?;
            }
        }
    }

    Ok(())
}

async fn reply(stream: &mut BufStream<TcpStream>, reply: &str) -> io::Result<()> {
    trace!(">> {reply}");
    stream.write_all(reply.as_bytes()).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await
}

async fn read_line(stream: &mut BufStream<TcpStream>) -> io::Result<Option<String>> {
    let mut line = String::new();

    if stream.read_line(&mut line).await? == 0 {
        return Ok(None);
    }

    let line = line.trim_end_matches(['\r', '\n']).to_owned();
    trace!("<< {line}");
    Ok(Some(line))
}

/// Read the message that follows DATA, up to the line made of a
/// single dot.
async fn read_data(stream: &mut BufStream<TcpStream>) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();

        if stream.read_until(b'\n', &mut line).await? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }

        if line == b".\r\n" || line == b".\n" {
            break;
        }

        match line.strip_prefix(b".") {
            Some(unstuffed) => data.extend_from_slice(unstuffed),
            None => data.extend_from_slice(&line),
        }
    }

    trace!("<< {} bytes of data", data.len());
    Ok(data)
}

/// Extract the address of a MAIL FROM or RCPT TO argument.
fn path(arg: &str) -> String {
    let arg = arg.split_once(':').map(|(_, path)| path).unwrap_or(arg);

    match (arg.find('<'), arg.find('>')) {
        (Some(start), Some(end)) if start < end => arg[start + 1..end].to_owned(),
        _ => arg.split_whitespace().next().unwrap_or_default().to_owned(),
    }
}

/// Decode a PLAIN SASL response into a login and a password.
fn decode_plain(response: &str) -> Option<(String, String)> {
    let decoded = STANDARD.decode(response.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let mut parts = decoded.split('\0');
    let _authzid = parts.next()?;
    let login = parts.next()?;
    let passwd = parts.next()?;
    Some((login.to_owned(), passwd.to_owned()))
}
