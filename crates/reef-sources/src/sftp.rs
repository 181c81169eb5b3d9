use std::io::Read as _;
use std::net::TcpStream;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;
use ssh2::Session;

use crate::backend::SourceBackend;
use crate::config::SftpSourceConfig;
use crate::error::SourceError;
use crate::item::SourceListing;

fn open_session(config: &SftpSourceConfig) -> Result<(Session, TcpStream), SourceError> {
    let address = format!("{}:{}", config.host, config.port);
    let tcp = TcpStream::connect(&address)?;
    let mut session = Session::new().map_err(|e| SourceError::Ssh(e.to_string()))?;
    session.set_tcp_stream(tcp.try_clone()?);
    session.handshake().map_err(|e| SourceError::Ssh(e.to_string()))?;

    if let Some(key_path) = &config.private_key_path {
        session
            .userauth_pubkey_file(
                &config.username,
                None,
                Path::new(key_path),
                config.private_key_passphrase.as_deref(),
            )
            .map_err(|e| SourceError::Ssh(e.to_string()))?;
    } else if let Some(password) = &config.password {
        session
            .userauth_password(&config.username, password)
            .map_err(|e| SourceError::Ssh(e.to_string()))?;
    } else {
        return Err(SourceError::Config(
            "sftp source requires either privateKeyPath or password".into(),
        ));
    }

    if !session.authenticated() {
        return Err(SourceError::Ssh("sftp authentication failed".into()));
    }
    Ok((session, tcp))
}

fn matches_pattern(name: &str, pattern: &str) -> bool {
    glob::Pattern::new(pattern).map(|p| p.matches(name)).unwrap_or(true)
}

/// SFTP source backed by a real SSH session.
#[derive(Debug, Default)]
pub struct SftpSourceBackend;

impl SourceBackend for SftpSourceBackend {
    fn list(&self, config: &Value, pattern: &str) -> Result<Vec<SourceListing>, SourceError> {
        let config: SftpSourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        let (session, _tcp) = open_session(&config)?;
        let sftp = session.sftp().map_err(|e| SourceError::Ssh(e.to_string()))?;
        let entries = sftp
            .readdir(Path::new(&config.base_path))
            .map_err(|e| SourceError::Ssh(e.to_string()))?;

        let mut listings = Vec::new();
        for (path, stat) in entries {
            if stat.is_dir() {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !matches_pattern(&name, pattern) {
                continue;
            }
            let modified = stat
                .mtime
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0));
            listings.push(SourceListing {
                identifier: name,
                modified,
            });
        }
        Ok(listings)
    }

    fn fetch_one(&self, config: &Value, identifier: &str) -> Result<Vec<u8>, SourceError> {
        let config: SftpSourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        let (session, _tcp) = open_session(&config)?;
        let sftp = session.sftp().map_err(|e| SourceError::Ssh(e.to_string()))?;
        let remote_path = Path::new(&config.base_path).join(identifier);
        let mut file = sftp
            .open(&remote_path)
            .map_err(|e| SourceError::Ssh(e.to_string()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn archive(&self, config: &Value, identifier: &str) -> Result<(), SourceError> {
        let config: SftpSourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        let archive_path = config
            .archive_path
            .clone()
            .ok_or_else(|| SourceError::Config("archivePath not configured".into()))?;
        let (session, _tcp) = open_session(&config)?;
        let sftp = session.sftp().map_err(|e| SourceError::Ssh(e.to_string()))?;
        let source = Path::new(&config.base_path).join(identifier);
        let destination = Path::new(&archive_path).join(identifier);
        sftp.rename(&source, &destination, None)
            .map_err(|e| SourceError::Ssh(e.to_string()))?;
        Ok(())
    }
}
