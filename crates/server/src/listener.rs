// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binds a domain's configured sockets and spawns one session task per
//! accepted connection (§6).
//!
//! `ux:`/`tcp:` bind directly; `tls:` wraps every accepted stream in a
//! `tokio_rustls::TlsAcceptor` before handing it to the session; `utls:`
//! binds plain TCP and peeks the first byte to decide, per connection,
//! whether to upgrade — a TLS `ClientHello`'s first record-layer byte is
//! always `0x16`, so one peeked byte is enough to decide without
//! consuming it (the same stream is handed to the TLS acceptor or read
//! directly from afterwards).

use std::io;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, CertificateRevocationListDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use tokio::net::{TcpListener, TcpStream, UnixListener};
use tokio_rustls::TlsAcceptor;

use crate::config::{DomainConfig, ListenAddr, SocketConfig, TlsOverrides};
use crate::domain::UserIdentity;
use crate::error::ConfigError;
use crate::runtime::DomainRuntime;

const TLS_CLIENT_HELLO_FIRST_BYTE: u8 = 0x16;

enum BoundSocket {
    Unix(UnixListener),
    Tcp(TcpListener),
    Tls(TcpListener, TlsAcceptor),
    AutoTls(TcpListener, TlsAcceptor),
}

/// Every socket a domain listens on, plus the runtime new connections on
/// any of them should join.
pub struct Listener {
    sockets: Vec<BoundSocket>,
    runtime: Arc<DomainRuntime>,
}

impl Listener {
    /// Binds every socket `domain` declares. Assumes `domain` already
    /// passed [`DomainConfig::validate`].
    pub async fn bind(domain: &DomainConfig, runtime: Arc<DomainRuntime>) -> Result<Self, ConfigError> {
        let mut sockets = Vec::with_capacity(domain.sockets.len());
        for socket in &domain.sockets {
            sockets.push(bind_one(socket).await?);
        }
        Ok(Listener { sockets, runtime })
    }

    /// Accepts connections on every bound socket until the process is
    /// torn down, spawning one `tokio::task` per connection (§5).
    pub async fn run(self) {
        let mut tasks = tokio::task::JoinSet::new();
        for socket in self.sockets {
            let runtime = Arc::clone(&self.runtime);
            tasks.spawn(accept_loop(socket, runtime));
        }
        while tasks.join_next().await.is_some() {}
    }
}

async fn bind_one(socket: &SocketConfig) -> Result<BoundSocket, ConfigError> {
    let addr: ListenAddr = socket.addr.parse().map_err(ConfigError::BadListenAddr)?;
    match addr {
        ListenAddr::Unix(path) => {
            let _ = std::fs::remove_file(&path);
            let listener = UnixListener::bind(&path)
                .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
            Ok(BoundSocket::Unix(listener))
        }
        ListenAddr::Tcp(addr) => {
            let listener = bind_tcp(&addr).await?;
            Ok(BoundSocket::Tcp(listener))
        }
        ListenAddr::Tls(addr) => {
            let listener = bind_tcp(&addr).await?;
            let acceptor = build_acceptor(socket.tls.as_ref())?;
            Ok(BoundSocket::Tls(listener, acceptor))
        }
        ListenAddr::AutoTls(addr) => {
            let listener = bind_tcp(&addr).await?;
            let acceptor = build_acceptor(socket.tls.as_ref())?;
            Ok(BoundSocket::AutoTls(listener, acceptor))
        }
    }
}

async fn bind_tcp(addr: &str) -> Result<TcpListener, ConfigError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ConfigError::Read { path: addr.to_string(), source })
}

async fn accept_loop(socket: BoundSocket, runtime: Arc<DomainRuntime>) {
    loop {
        match &socket {
            BoundSocket::Unix(listener) => match listener.accept().await {
                Ok((stream, _)) => {
                    let (reader, writer) = stream.into_split();
                    let runtime = Arc::clone(&runtime);
                    tokio::spawn(async move {
                        run_session(runtime, UserIdentity::local_socket(), reader, writer).await;
                    });
                }
                Err(err) => tracing::error!(error = %err, "unix accept failed"),
            },
            BoundSocket::Tcp(listener) => match listener.accept().await {
                Ok((stream, peer)) => {
                    let user = UserIdentity(peer.ip().to_string());
                    let (reader, writer) = stream.into_split();
                    let runtime = Arc::clone(&runtime);
                    tokio::spawn(async move {
                        run_session(runtime, user, reader, writer).await;
                    });
                }
                Err(err) => tracing::error!(error = %err, "tcp accept failed"),
            },
            BoundSocket::Tls(listener, acceptor) => match listener.accept().await {
                Ok((stream, peer)) => {
                    let acceptor = acceptor.clone();
                    let runtime = Arc::clone(&runtime);
                    tokio::spawn(async move { accept_tls(acceptor, runtime, stream, peer.ip().to_string()).await });
                }
                Err(err) => tracing::error!(error = %err, "tls accept failed"),
            },
            BoundSocket::AutoTls(listener, acceptor) => match listener.accept().await {
                Ok((stream, peer)) => {
                    let acceptor = acceptor.clone();
                    let runtime = Arc::clone(&runtime);
                    tokio::spawn(async move { accept_auto_tls(acceptor, runtime, stream, peer.ip().to_string()).await });
                }
                Err(err) => tracing::error!(error = %err, "utls accept failed"),
            },
        }
    }
}

async fn accept_tls(acceptor: TlsAcceptor, runtime: Arc<DomainRuntime>, stream: TcpStream, peer_ip: String) {
    match acceptor.accept(stream).await {
        Ok(tls_stream) => {
            let user = client_identity(&tls_stream, peer_ip);
            let (reader, writer) = tokio::io::split(tls_stream);
            run_session(runtime, user, reader, writer).await;
        }
        Err(err) => tracing::warn!(error = %err, "tls handshake failed"),
    }
}

async fn accept_auto_tls(acceptor: TlsAcceptor, runtime: Arc<DomainRuntime>, stream: TcpStream, peer_ip: String) {
    let mut probe = [0u8; 1];
    let looks_like_tls = match stream.peek(&mut probe).await {
        Ok(0) => return,
        Ok(_) => probe[0] == TLS_CLIENT_HELLO_FIRST_BYTE,
        Err(err) => {
            tracing::warn!(error = %err, "utls peek failed");
            return;
        }
    };
    if looks_like_tls {
        accept_tls(acceptor, runtime, stream, peer_ip).await;
    } else {
        let user = UserIdentity(peer_ip);
        let (reader, writer) = stream.into_split();
        run_session(runtime, user, reader, writer).await;
    }
}

fn client_identity<T>(tls_stream: &tokio_rustls::server::TlsStream<T>, peer_ip: String) -> UserIdentity {
    let (_, session) = tls_stream.get_ref();
    match session.peer_certificates().and_then(|certs| certs.first()) {
        Some(leaf) => UserIdentity(subject_key_id(leaf)),
        None => UserIdentity(peer_ip),
    }
}

/// A stand-in for a real X.509 subject-key-id extension lookup: a hash of
/// the leaf certificate's DER encoding, stable for the life of the
/// certificate and unique per key the way a subject-key-id is.
fn subject_key_id(cert: &CertificateDer<'_>) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    cert.as_ref().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

async fn run_session<R, W>(runtime: Arc<DomainRuntime>, user: UserIdentity, reader: R, writer: W)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin,
{
    if let Err(err) = crate::session::run(runtime, user, reader, writer, pathfinder_wire::Framing::NewlineDelimited).await {
        tracing::warn!(error = %err, "session ended");
    }
}

fn build_acceptor(overrides: Option<&TlsOverrides>) -> Result<TlsAcceptor, ConfigError> {
    let overrides = overrides.cloned().unwrap_or_default();
    let cert_path = overrides.cert.ok_or_else(|| ConfigError::MissingTlsMaterial("tls socket missing cert".into()))?;
    let key_path = overrides.key.ok_or_else(|| ConfigError::MissingTlsMaterial("tls socket missing key".into()))?;

    let cert_chain = load_certs(Path::new(&cert_path))?;
    let key = load_key(Path::new(&key_path))?;

    let builder = ServerConfig::builder();
    let config = if let Some(tc_path) = overrides.tc {
        let roots = load_root_store(Path::new(&tc_path))?;
        let crls = match overrides.crl {
            Some(crl_path) => load_crls(Path::new(&crl_path))?,
            None => Vec::new(),
        };
        let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
            .with_crls(crls)
            .build()
            .map_err(|source| ConfigError::Read { path: tc_path, source: io::Error::other(source) })?;
        builder
            .with_client_cert_verifier(verifier)
            .with_single_cert(cert_chain, key)
            .map_err(|source| ConfigError::Read { path: cert_path, source: io::Error::other(source) })?
    } else {
        builder
            .with_no_client_auth()
            .with_single_cert(cert_chain, key)
            .map_err(|source| ConfigError::Read { path: cert_path, source: io::Error::other(source) })?
    };

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    let mut reader = io::BufReader::new(
        std::fs::File::open(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?,
    );
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, ConfigError> {
    let mut reader = io::BufReader::new(
        std::fs::File::open(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?,
    );
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?
        .ok_or_else(|| ConfigError::Read {
            path: path.display().to_string(),
            source: io::Error::new(io::ErrorKind::InvalidData, "no private key found in file"),
        })
}

fn load_root_store(path: &Path) -> Result<RootCertStore, ConfigError> {
    let certs = load_certs(path)?;
    let mut store = RootCertStore::empty();
    for cert in certs {
        store
            .add(cert)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source: io::Error::other(source) })?;
    }
    Ok(store)
}

fn load_crls(path: &Path) -> Result<Vec<CertificateRevocationListDer<'static>>, ConfigError> {
    let mut reader = io::BufReader::new(
        std::fs::File::open(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?,
    );
    rustls_pemfile::crls(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_self_signed_pair(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .expect("self-signed cert generation");
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&cert_path, cert.cert.pem()).expect("write cert");
        std::fs::write(&key_path, cert.key_pair.serialize_pem()).expect("write key");
        (cert_path, key_path)
    }

    #[test]
    fn build_acceptor_loads_cert_and_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (cert_path, key_path) = write_self_signed_pair(&dir);
        let overrides = TlsOverrides {
            cert: Some(cert_path.display().to_string()),
            key: Some(key_path.display().to_string()),
            tc: None,
            crl: None,
        };
        assert!(build_acceptor(Some(&overrides)).is_ok());
    }

    #[test]
    fn build_acceptor_requires_cert_and_key() {
        assert!(matches!(build_acceptor(None), Err(ConfigError::MissingTlsMaterial(_))));
    }

    #[test]
    fn subject_key_id_is_stable_per_cert() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (cert_path, _) = write_self_signed_pair(&dir);
        let pem = std::fs::read_to_string(&cert_path).expect("read cert");
        let der = rustls_pemfile::certs(&mut pem.as_bytes())
            .next()
            .expect("one cert")
            .expect("valid cert");
        assert_eq!(subject_key_id(&der), subject_key_id(&der));
    }
}
