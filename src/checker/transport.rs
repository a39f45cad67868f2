//! Instrumented outbound HTTP/1.1 transport.
//!
//! Each hop resolves, connects, optionally negotiates TLS and performs one
//! request on a fresh connection, marking the probe at every phase boundary.
//! Connections are never pooled, so every hop observes its own DNS, connect
//! and TLS phases.

use std::collections::BTreeMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use hyper::header::{HeaderValue, ACCEPT, HOST, LOCATION, USER_AGENT};
use hyper::{HeaderMap, Method, Request, StatusCode, Version};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use url::{Host, Position, Url};

use crate::checker::error::CheckError;
use crate::checker::probe::{Phase, Probe};
use crate::checker::result;
use crate::config::CheckerConfig;

/// A fully read response from one hop.
#[derive(Debug)]
pub struct Fetched {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Fetched {
    /// Status line, headers and body, as sent on the wire.
    pub fn dump(&self) -> String {
        let mut dump = format!("{:?} {}\r\n", self.version, self.status);
        for (name, value) in &self.headers {
            dump.push_str(name.as_str());
            dump.push_str(": ");
            dump.push_str(&String::from_utf8_lossy(value.as_bytes()));
            dump.push_str("\r\n");
        }
        dump.push_str("\r\n");
        dump.push_str(&String::from_utf8_lossy(&self.body));
        dump
    }

    /// Headers grouped by name, values in arrival order.
    pub fn header_map(&self) -> result::HeaderMap {
        let mut map: result::HeaderMap = BTreeMap::new();
        for (name, value) in &self.headers {
            map.entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        map
    }

    /// Target of a redirect response, resolved against `base`.
    ///
    /// `None` when the response is not a redirect or carries no `Location`.
    pub fn redirect_location(&self, base: &Url) -> Result<Option<Url>, CheckError> {
        if !matches!(self.status.as_u16(), 301 | 302 | 303 | 307 | 308) {
            return Ok(None);
        }
        let Some(location) = self.headers.get(LOCATION) else {
            return Ok(None);
        };
        let raw = String::from_utf8_lossy(location.as_bytes()).into_owned();
        let next = base
            .join(&raw)
            .map_err(|_| CheckError::InvalidRedirect(raw.clone()))?;
        match next.scheme() {
            "http" | "https" => Ok(Some(next)),
            _ => Err(CheckError::InvalidRedirect(raw)),
        }
    }
}

/// Dials targets and performs single GET exchanges.
pub struct Transport {
    tls: TlsConnector,
    user_agent: HeaderValue,
    max_body_bytes: usize,
}

impl Transport {
    pub fn new(config: &CheckerConfig) -> Result<Self, CheckError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| CheckError::Build(format!("tls configuration: {e}")))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| CheckError::Build(format!("user agent: {e}")))?;

        Ok(Self {
            tls: TlsConnector::from(Arc::new(tls)),
            user_agent,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Perform one GET against `url`, without following redirects.
    pub async fn fetch(&self, url: &Url, probe: &mut Probe) -> Result<Fetched, CheckError> {
        let host = url
            .host()
            .ok_or_else(|| CheckError::Build(format!("'{url}' has no host")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| CheckError::UnsupportedScheme(url.scheme().to_string()))?;

        let addrs = match &host {
            Host::Domain(domain) => resolve(domain, port, probe).await?,
            Host::Ipv4(ip) => vec![SocketAddr::new(IpAddr::V4(*ip), port)],
            Host::Ipv6(ip) => vec![SocketAddr::new(IpAddr::V6(*ip), port)],
        };
        let stream = connect(&addrs, probe).await?;
        let request = self.build_request(url)?;

        if url.scheme() == "https" {
            let server_name = server_name(&host)?;
            probe.mark(Phase::TlsStart);
            let stream = self
                .tls
                .connect(server_name, stream)
                .await
                .map_err(|source| CheckError::Tls {
                    host: host.to_string(),
                    source,
                })?;
            probe.mark(Phase::TlsDone);
            self.exchange(stream, request, probe).await
        } else {
            self.exchange(stream, request, probe).await
        }
    }

    fn build_request(&self, url: &Url) -> Result<Request<Body>, CheckError> {
        let path = &url[Position::BeforePath..Position::AfterQuery];
        let authority = &url[Position::BeforeHost..Position::AfterPort];

        Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(HOST, authority)
            .header(USER_AGENT, self.user_agent.clone())
            .header(ACCEPT, "*/*")
            .body(Body::empty())
            .map_err(|e| CheckError::Build(e.to_string()))
    }

    async fn exchange<S>(
        &self,
        io: S,
        request: Request<Body>,
        probe: &mut Probe,
    ) -> Result<Fetched, CheckError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(io)).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "Check connection closed with error");
            }
        });
        probe.mark(Phase::ConnAcquired);

        let response = sender.send_request(request).await?;
        probe.mark(Phase::FirstByte);

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| CheckError::Body(e.to_string()))?;

        Ok(Fetched {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            body,
        })
    }
}

async fn resolve(domain: &str, port: u16, probe: &mut Probe) -> Result<Vec<SocketAddr>, CheckError> {
    probe.mark(Phase::DnsStart);
    let lookup = tokio::net::lookup_host((domain, port)).await;
    probe.mark(Phase::DnsDone);

    let addrs: Vec<SocketAddr> = lookup
        .map_err(|e| CheckError::Dns {
            host: domain.to_string(),
            reason: e.to_string(),
        })?
        .collect();
    if addrs.is_empty() {
        return Err(CheckError::Dns {
            host: domain.to_string(),
            reason: "no addresses found".into(),
        });
    }
    Ok(addrs)
}

/// Try each resolved address in order until one accepts.
async fn connect(addrs: &[SocketAddr], probe: &mut Probe) -> Result<TcpStream, CheckError> {
    probe.mark(Phase::ConnectStart);
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                probe.mark(Phase::ConnectDone);
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::trace!(error = %e, "Failed to set TCP_NODELAY");
                }
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "Connect attempt failed");
                last_error = Some((*addr, e));
            }
        }
    }
    let (addr, source) = last_error.unwrap_or_else(|| {
        (
            SocketAddr::from(([0, 0, 0, 0], 0)),
            io::Error::new(io::ErrorKind::AddrNotAvailable, "no address to connect to"),
        )
    });
    Err(CheckError::Connect {
        addr: addr.to_string(),
        source,
    })
}

fn server_name(host: &Host<&str>) -> Result<ServerName<'static>, CheckError> {
    match host {
        Host::Domain(domain) => ServerName::try_from(domain.to_string()).map_err(|e| CheckError::Tls {
            host: domain.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
        }),
        Host::Ipv4(ip) => Ok(ServerName::IpAddress(IpAddr::V4(*ip).into())),
        Host::Ipv6(ip) => Ok(ServerName::IpAddress(IpAddr::V6(*ip).into())),
    }
}
