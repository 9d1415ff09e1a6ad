//! Email alerts over SMTP with implicit TLS (port 465).
//!
//! The message is a `multipart/mixed` MIME document: a plain-text body plus the
//! cycle's frame attached as `image.jpg`. Authentication is `AUTH PLAIN` with the
//! sender address and its app password.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use super::{Alert, Notifier};
use crate::config::EmailOptions;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const SMTPS_PORT: u16 = 465;

const IO_TIMEOUT: Duration = Duration::from_secs(15);
const BASE64_LINE_LEN: usize = 76;

pub struct SmtpEmail {
    options: EmailOptions,
}

impl SmtpEmail {
    pub fn new(options: &EmailOptions) -> Self {
        Self {
            options: options.clone(),
        }
    }

    fn host(&self) -> &str {
        self.options
            .host
            .as_deref()
            .filter(|host| !host.trim().is_empty())
            .unwrap_or(DEFAULT_SMTP_HOST)
    }
}

impl Notifier for SmtpEmail {
    fn channel(&self) -> &'static str {
        "email"
    }

    fn send(&self, alert: &Alert<'_>) -> Result<()> {
        let jpeg = alert.frame.to_jpeg()?;
        let boundary = format!("edgeloop-{}", uuid::Uuid::new_v4().simple());
        let message = compose_message(
            alert,
            &self.options.from_email,
            &self.options.to_email,
            &jpeg,
            &boundary,
        );
        let stream = connect_tls(self.host())?;
        let mut session = SmtpSession::new(stream);
        session.deliver(
            &self.options.from_email,
            &self.options.to_email,
            &self.options.email_password,
            &message,
        )
    }
}

fn compose_message(alert: &Alert<'_>, from: &str, to: &str, jpeg: &[u8], boundary: &str) -> String {
    let subject = format!(
        "Your detector [{}] detected an anomaly",
        alert.detector_name
    );
    let body = format!(
        "{}\r\n\r\nThe image of the anomaly is attached below.",
        alert.summary()
    );
    let encoded = base64::engine::general_purpose::STANDARD.encode(jpeg);

    let mut msg = String::with_capacity(encoded.len() + 1024);
    msg.push_str(&format!("From: {}\r\n", from));
    msg.push_str(&format!("To: {}\r\n", to));
    msg.push_str(&format!("Subject: {}\r\n", subject));
    msg.push_str("MIME-Version: 1.0\r\n");
    msg.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
        boundary
    ));

    msg.push_str(&format!("--{}\r\n", boundary));
    msg.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
    msg.push_str(&body);
    msg.push_str("\r\n");

    msg.push_str(&format!("--{}\r\n", boundary));
    msg.push_str("Content-Type: image/jpeg\r\n");
    msg.push_str("Content-Transfer-Encoding: base64\r\n");
    msg.push_str("Content-Disposition: attachment; filename=\"image.jpg\"\r\n\r\n");
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
        // base64 output is ASCII
        msg.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        msg.push_str("\r\n");
    }
    msg.push_str(&format!("--{}--\r\n", boundary));
    msg
}

fn connect_tls(host: &str) -> Result<rustls::StreamOwned<rustls::ClientConnection, TcpStream>> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
        .map_err(|e| anyhow!("invalid smtp host '{}': {}", host, e))?;
    let conn = rustls::ClientConnection::new(Arc::new(config), server_name)
        .context("start smtp tls session")?;
    let sock = TcpStream::connect((host, SMTPS_PORT))
        .with_context(|| format!("connect to {}:{}", host, SMTPS_PORT))?;
    sock.set_read_timeout(Some(IO_TIMEOUT))?;
    sock.set_write_timeout(Some(IO_TIMEOUT))?;
    Ok(rustls::StreamOwned::new(conn, sock))
}

struct SmtpSession<S: Read + Write> {
    stream: BufReader<S>,
}

impl<S: Read + Write> SmtpSession<S> {
    fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    fn deliver(&mut self, from: &str, to: &str, password: &str, message: &str) -> Result<()> {
        self.expect(220)?;
        self.command("EHLO edgeloop", 250)?;
        let credentials = format!("\0{}\0{}", from, password);
        let token = base64::engine::general_purpose::STANDARD.encode(credentials);
        self.command(&format!("AUTH PLAIN {}", token), 235)
            .context("smtp authentication failed")?;
        self.command(&format!("MAIL FROM:<{}>", from), 250)?;
        self.command(&format!("RCPT TO:<{}>", to), 250)?;
        self.command("DATA", 354)?;
        self.write_data(message)?;
        self.expect(250)?;
        if let Err(e) = self.command("QUIT", 221) {
            log::debug!("smtp quit: {:#}", e);
        }
        Ok(())
    }

    fn command(&mut self, line: &str, expected: u16) -> Result<()> {
        let writer = self.stream.get_mut();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\r\n")?;
        writer.flush()?;
        let verb = line.split_whitespace().next().unwrap_or(line);
        self.expect(expected)
            .with_context(|| format!("smtp {}", verb))
    }

    fn write_data(&mut self, message: &str) -> Result<()> {
        let writer = self.stream.get_mut();
        let message = message.strip_suffix("\r\n").unwrap_or(message);
        for line in message.split("\r\n") {
            if line.starts_with('.') {
                writer.write_all(b".")?;
            }
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\r\n")?;
        }
        writer.write_all(b".\r\n")?;
        writer.flush()?;
        Ok(())
    }

    fn expect(&mut self, expected: u16) -> Result<()> {
        let (code, text) = self.read_reply()?;
        if code != expected {
            return Err(anyhow!(
                "unexpected smtp reply {} {} (wanted {})",
                code,
                text.trim(),
                expected
            ));
        }
        Ok(())
    }

    /// Reads a possibly multi-line reply (`250-...` continuation lines).
    fn read_reply(&mut self) -> Result<(u16, String)> {
        let mut text = String::new();
        loop {
            let mut line = String::new();
            if self.stream.read_line(&mut line)? == 0 {
                return Err(anyhow!("smtp connection closed"));
            }
            let line = line.trim_end();
            let code: u16 = line
                .get(..3)
                .and_then(|code| code.parse().ok())
                .ok_or_else(|| anyhow!("malformed smtp reply '{}'", line))?;
            text.push_str(line.get(4..).unwrap_or(""));
            text.push(' ');
            if line.as_bytes().get(3) != Some(&b'-') {
                return Ok((code, text));
            }
        }
    }
}
