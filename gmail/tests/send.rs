use std::io::Write;

use gmail::{Email, Error, MailSender, SmtpConfig, SmtpEncryptionKind};
use mail_parser::{MessageParser, MimeHeaders};
use smtp_testing_server::{with_smtp_testing_server, SmtpTestingServer};
use tempfile::Builder;

fn sender(server: &SmtpTestingServer, login: &str, passwd: &str) -> MailSender {
    let config =
        SmtpConfig::new(server.host(), server.port()).with_encryption(SmtpEncryptionKind::None);
    MailSender::new(login, passwd).with_smtp_config(config)
}

#[test_log::test(tokio::test)]
async fn send_plain_email() {
    with_smtp_testing_server("alice@localhost", "password", |server| async move {
        let email = Email::new(
            "alice@localhost",
            ["bob@localhost", "carol@localhost"],
            "Plain message!",
            "<h1>Plain message!</h1>",
        )
        .with_profile("Alice");

        sender(&server, "alice@localhost", "password")
            .send(&email)
            .await
            .unwrap();

        let sessions = server.sessions().await;
        assert_eq!(1, sessions.len());

        let session = &sessions[0];
        assert_eq!(session.login.as_deref(), Some("alice@localhost"));
        assert_eq!(session.mail_from.as_deref(), Some("alice@localhost"));
        assert_eq!(session.rcpt_to, vec!["bob@localhost", "carol@localhost"]);
        assert!(session.quit);

        let data = session.data.as_deref().unwrap();
        let msg = MessageParser::default().parse(data).unwrap();
        assert_eq!(msg.subject(), Some("Plain message!"));
        assert_eq!(msg.html_body_count(), 1);
        assert_eq!(msg.attachment_count(), 0);

        let raw = session.data_to_string_lossy();
        assert!(raw.contains("From: =?utf-8?b?QWxpY2U=?= <alice@localhost>\r\n"));
        assert!(raw.contains("To: bob@localhost,carol@localhost\r\n"));
    })
    .await
}

#[test_log::test(tokio::test)]
async fn send_email_with_attachment() {
    let mut attachment = Builder::new()
        .prefix("report")
        .suffix(".pdf")
        .rand_bytes(0)
        .tempfile()
        .unwrap();
    attachment.write_all(b"%PDF-1.4 fake report").unwrap();
    let attachment_path = attachment.path().to_owned();

    with_smtp_testing_server("alice@localhost", "password", |server| async move {
        let email = Email::new(
            "alice@localhost",
            "bob@localhost",
            "Report",
            "<p>See attached.</p>",
        )
        .with_attachments(attachment_path);

        sender(&server, "alice@localhost", "password")
            .send(&email)
            .await
            .unwrap();

        let sessions = server.sessions().await;
        let session = &sessions[0];
        assert_eq!(session.rcpt_to, vec!["bob@localhost"]);

        let data = session.data.as_deref().unwrap();
        let msg = MessageParser::default().parse(data).unwrap();
        assert_eq!(msg.html_body_count(), 1);
        assert_eq!(msg.attachment_count(), 1);

        let part = msg.attachment(0).unwrap();
        assert_eq!(part.attachment_name(), Some("report.pdf"));
        assert_eq!(part.contents(), b"%PDF-1.4 fake report");
    })
    .await
}

#[test_log::test(tokio::test)]
async fn send_to_bcc_only() {
    with_smtp_testing_server("alice@localhost", "password", |server| async move {
        let email = Email::new(
            "alice@localhost",
            ["a@localhost", "b@localhost"],
            "Hidden",
            "<p>Hidden</p>",
        )
        .with_cc("c@localhost")
        .with_bcc("d@localhost");

        sender(&server, "alice@localhost", "password")
            .send(&email)
            .await
            .unwrap();

        let sessions = server.sessions().await;
        let session = &sessions[0];
        assert_eq!(session.rcpt_to, vec!["d@localhost"]);

        let raw = session.data_to_string_lossy();
        assert!(raw.contains("To: a@localhost,b@localhost\r\n"));
        assert!(raw.contains("Cc: c@localhost\r\n"));
        assert!(raw.contains("Bcc: d@localhost\r\n"));
    })
    .await
}

#[test_log::test(tokio::test)]
async fn send_with_bad_credentials() {
    with_smtp_testing_server("alice@localhost", "password", |server| async move {
        let email = Email::new("alice@localhost", "bob@localhost", "Hi", "<p>Hi</p>");

        let err = sender(&server, "alice@localhost", "wrong")
            .send(&email)
            .await
            .unwrap_err();

        assert!(err.is_authentication_error());
        match err {
            Error::AuthenticateError(_, login) => assert_eq!(login, "alice@localhost"),
            err => panic!("unexpected error: {err:?}"),
        }

        let sessions = server.sessions().await;
        assert_eq!(1, sessions.len());
        assert!(!sessions[0].is_authenticated());
        assert_eq!(sessions[0].data, None);
    })
    .await
}

#[test_log::test(tokio::test)]
async fn send_with_unreadable_attachment() {
    with_smtp_testing_server("alice@localhost", "password", |server| async move {
        let email = Email::new("alice@localhost", "bob@localhost", "Hi", "<p>Hi</p>")
            .with_attachments(["/this/attachment/does/not/exist.pdf"]);

        let err = sender(&server, "alice@localhost", "password")
            .send(&email)
            .await
            .unwrap_err();

        assert!(err.is_io_error());
        match err {
            Error::ReadAttachmentError(_, path) => {
                assert_eq!(path.to_str(), Some("/this/attachment/does/not/exist.pdf"))
            }
            err => panic!("unexpected error: {err:?}"),
        }

        assert!(server.sessions().await.is_empty());
    })
    .await
}

#[test_log::test(tokio::test)]
async fn send_requires_start_tls_by_default() {
    with_smtp_testing_server("alice@localhost", "password", |server| async move {
        let sender = MailSender::new("alice@localhost", "password")
            .with_smtp_config(SmtpConfig::new(server.host(), server.port()));
        let email = Email::new("alice@localhost", "bob@localhost", "Hi", "<p>Hi</p>");

        match sender.send(&email).await.unwrap_err() {
            Error::ConnectTlsError(_, host, port) => {
                assert_eq!(host, server.host());
                assert_eq!(port, server.port());
            }
            err => panic!("unexpected error: {err:?}"),
        }

        // the server does not advertise STARTTLS, credentials must
        // not be sent in clear
        let sessions = server.sessions().await;
        assert_eq!(1, sessions.len());
        assert!(!sessions[0].is_authenticated());
        assert_eq!(sessions[0].mail_from, None);
    })
    .await
}

#[test_log::test(tokio::test)]
async fn send_to_unreachable_relay() {
    // grab a free port then release it, so nothing listens on it
    let port = {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        listener.local_addr().unwrap().port()
    };

    let config = SmtpConfig::new("127.0.0.1", port).with_encryption(false);
    let sender = MailSender::new("alice@localhost", "password").with_smtp_config(config);
    let email = Email::new("alice@localhost", "bob@localhost", "Hi", "<p>Hi</p>");

    match sender.send(&email).await.unwrap_err() {
        Error::ConnectTcpError(_, host, p) => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(p, port);
        }
        err => panic!("unexpected error: {err:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn send_twice_opens_two_sessions() {
    with_smtp_testing_server("alice@localhost", "password", |server| async move {
        let sender = sender(&server, "alice@localhost", "password");
        let email = Email::new("alice@localhost", "bob@localhost", "Hi", "<p>Hi</p>");

        sender.send(&email).await.unwrap();
        sender.send(&email).await.unwrap();

        let sessions = server.sessions().await;
        assert_eq!(2, sessions.len());
        assert!(sessions.iter().all(|session| session.quit));
    })
    .await
}
