use std::io::Read as _;
use std::net::TcpStream;
use std::path::Path;
use std::time::Instant;

use reqwest::blocking::Client;
use serde_json::Value;
use ssh2::Session;

use crate::backend::{DestinationBackend, SaveOutcome, TestOutcome};
use crate::config::{FtpConfig, SftpConfig};
use crate::error::DestinationError;

/// FTP destination. The upstream system models FTP with the same
/// request/response shape as HTTP (PUT semantics over a bearer token)
/// rather than speaking the FTP wire protocol directly.
#[derive(Debug, Default)]
pub struct FtpBackend;

impl DestinationBackend for FtpBackend {
    fn save(
        &self,
        source_file_path: &Path,
        relative_path: &str,
        config: &Value,
    ) -> Result<SaveOutcome, DestinationError> {
        let config: FtpConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let bytes = std::fs::read(source_file_path)?;
        let url = format!("{}/{}", config.url.trim_end_matches('/'), relative_path);

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client builds with default tls backend");
        let mut request = client.put(&url).body(bytes);
        if let Some(token) = &config.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;
        if response.status().is_success() {
            Ok(SaveOutcome::ok(url))
        } else {
            Ok(SaveOutcome::failed(format!(
                "destination responded with status {}",
                response.status()
            )))
        }
    }

    fn test(
        &self,
        config: &Value,
        _test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError> {
        let config: FtpConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let body = test_content.unwrap_or(b"reef connectivity test").to_vec();
        let started = Instant::now();
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client builds with default tls backend");
        let mut request = client.head(&config.url);
        if let Some(token) = &config.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;
        let elapsed = started.elapsed().as_millis() as u64;
        Ok(TestOutcome {
            success: response.status().is_success(),
            final_path: None,
            bytes: Some(body.len() as u64),
            response_ms: Some(elapsed),
            message: Some(format!("status {}", response.status())),
        })
    }
}

fn open_sftp_session(config: &SftpConfig) -> Result<(Session, TcpStream), DestinationError> {
    let address = format!("{}:{}", config.host, config.port);
    let tcp = TcpStream::connect(&address)?;
    let mut session = Session::new().map_err(|e| DestinationError::Ssh(e.to_string()))?;
    session.set_tcp_stream(tcp.try_clone()?);
    session
        .handshake()
        .map_err(|e| DestinationError::Ssh(e.to_string()))?;

    if let Some(key_path) = &config.private_key_path {
        session
            .userauth_pubkey_file(
                &config.username,
                None,
                Path::new(key_path),
                config.private_key_passphrase.as_deref(),
            )
            .map_err(|e| DestinationError::Ssh(e.to_string()))?;
    } else if let Some(password) = &config.password {
        session
            .userauth_password(&config.username, password)
            .map_err(|e| DestinationError::Ssh(e.to_string()))?;
    } else {
        return Err(DestinationError::Config(
            "sftp destination requires either privateKeyPath or password".into(),
        ));
    }

    if !session.authenticated() {
        return Err(DestinationError::Ssh("sftp authentication failed".into()));
    }
    Ok((session, tcp))
}

/// SFTP destination backed by a real SSH session.
#[derive(Debug, Default)]
pub struct SftpBackend;

impl DestinationBackend for SftpBackend {
    fn save(
        &self,
        source_file_path: &Path,
        relative_path: &str,
        config: &Value,
    ) -> Result<SaveOutcome, DestinationError> {
        let config: SftpConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let (session, _tcp) = open_sftp_session(&config)?;
        let sftp = session.sftp().map_err(|e| DestinationError::Ssh(e.to_string()))?;

        let remote_path = Path::new(&config.base_path).join(relative_path);
        if let Some(parent) = remote_path.parent() {
            let _ = sftp.mkdir(parent, 0o755);
        }

        let mut local_file = std::fs::File::open(source_file_path)?;
        let mut bytes = Vec::new();
        local_file.read_to_end(&mut bytes)?;

        let mut remote_file = sftp
            .create(&remote_path)
            .map_err(|e| DestinationError::Ssh(e.to_string()))?;
        std::io::Write::write_all(&mut remote_file, &bytes)?;

        Ok(SaveOutcome::ok(remote_path.display().to_string()))
    }

    fn test(
        &self,
        config: &Value,
        test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError> {
        let config: SftpConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let started = Instant::now();
        let (session, _tcp) = open_sftp_session(&config)?;
        let sftp = session.sftp().map_err(|e| DestinationError::Ssh(e.to_string()))?;

        let content = test_content.unwrap_or(b"reef connectivity test");
        let name = test_name.unwrap_or("reef-connectivity-test.tmp");
        let remote_path = Path::new(&config.base_path).join(name);

        let mut remote_file = sftp
            .create(&remote_path)
            .map_err(|e| DestinationError::Ssh(e.to_string()))?;
        std::io::Write::write_all(&mut remote_file, content)?;
        drop(remote_file);
        sftp.unlink(&remote_path).ok();

        let elapsed = started.elapsed().as_millis() as u64;
        Ok(TestOutcome {
            success: true,
            final_path: Some(remote_path.display().to_string()),
            bytes: Some(content.len() as u64),
            response_ms: Some(elapsed),
            message: None,
        })
    }

    // compensate: not supported for SFTP (§4.C6); falls through to the
    // trait default rather than deleting the remote file.
}
