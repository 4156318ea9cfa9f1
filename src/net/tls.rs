//! Assembly of the rustls client configuration from the stream's trust and
//! certificate settings.

use rustls::client::{ServerCertVerified, ServerCertVerifier, ServerName};
use rustls::{Certificate, ClientConfig, OwnedTrustAnchor, PrivateKey, RootCertStore};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Trust and certificate settings collected before `open`.
///
/// Setting any of them switches the stream to TLS.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct TlsSettings {
    pub(crate) trust_file: Option<PathBuf>,
    pub(crate) trust_directory: Option<PathBuf>,
    pub(crate) use_root_certificates: bool,
    pub(crate) certificate_file: Option<PathBuf>,
}

impl TlsSettings {
    pub(crate) fn is_tls(&self) -> bool {
        self.trust_file.is_some()
            || self.trust_directory.is_some()
            || self.use_root_certificates
            || self.certificate_file.is_some()
    }

    /// Whether peer verification is required.
    pub(crate) fn is_verified(&self) -> bool {
        self.trust_file.is_some() || self.trust_directory.is_some() || self.use_root_certificates
    }

    pub(crate) fn client_config(&self) -> std::io::Result<ClientConfig> {
        let builder = ClientConfig::builder().with_safe_defaults();

        let config = if self.is_verified() {
            let mut root_store = RootCertStore::empty();

            if self.use_root_certificates {
                root_store.add_server_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(
                    |ta| {
                        OwnedTrustAnchor::from_subject_spki_name_constraints(
                            ta.subject,
                            ta.spki,
                            ta.name_constraints,
                        )
                    },
                ));
            }

            if let Some(trust_file) = &self.trust_file {
                let (n_ok, n_err) = root_store.add_parsable_certificates(&read_certs(trust_file)?);
                if n_ok == 0 {
                    warn!("No trust anchor in {} was accepted", trust_file.display());
                } else if n_err > 0 {
                    warn!(
                        "Not all trust anchors in {} were accepted",
                        trust_file.display()
                    );
                }
            }

            if let Some(trust_directory) = &self.trust_directory {
                let mut t_ok = 0;
                let mut t_err = 0;
                for trust_file in pem_files(trust_directory)? {
                    trace!("Trying trust anchor file {trust_file:?}");
                    let (n_ok, n_err) =
                        root_store.add_parsable_certificates(&read_certs(&trust_file)?);
                    t_ok += n_ok;
                    t_err += n_err;
                }
                if t_ok == 0 {
                    warn!(
                        "No trust anchor in directory {} was accepted",
                        trust_directory.display()
                    );
                } else if t_err > 0 {
                    warn!(
                        "Not all trust anchors in directory {} were accepted",
                        trust_directory.display()
                    );
                }
            }

            let builder = builder.with_root_certificates(root_store);

            match &self.certificate_file {
                Some(certificate_file) => {
                    let certs = read_certs(certificate_file)?
                        .into_iter()
                        .map(Certificate)
                        .collect();
                    let key = read_private_key(certificate_file)?;
                    builder.with_client_auth_cert(certs, key).map_err(|error| {
                        std::io::Error::new(std::io::ErrorKind::InvalidInput, error)
                    })?
                }
                None => builder.with_no_client_auth(),
            }
        } else {
            // A certificate was configured without trust anchors: the session
            // is TLS-protected but the peer is not verified.
            let builder =
                builder.with_custom_certificate_verifier(Arc::new(NoCertificateVerification {}));

            match &self.certificate_file {
                Some(certificate_file) => {
                    let certs = read_certs(certificate_file)?
                        .into_iter()
                        .map(Certificate)
                        .collect();
                    let key = read_private_key(certificate_file)?;
                    builder.with_client_auth_cert(certs, key).map_err(|error| {
                        std::io::Error::new(std::io::ErrorKind::InvalidInput, error)
                    })?
                }
                None => builder.with_no_client_auth(),
            }
        };

        Ok(config)
    }
}

fn read_certs(path: &Path) -> std::io::Result<Vec<Vec<u8>>> {
    let mut reader = BufReader::new(std::fs::File::open(path)?);
    rustls_pemfile::certs(&mut reader)
}

// The certificate file also carries the private key (PEM), in any of the
// encodings rustls-pemfile understands.
fn read_private_key(path: &Path) -> std::io::Result<PrivateKey> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;

    for item in rustls_pemfile::read_all(&mut &bytes[..])? {
        match item {
            rustls_pemfile::Item::PKCS8Key(key)
            | rustls_pemfile::Item::RSAKey(key)
            | rustls_pemfile::Item::ECKey(key) => return Ok(PrivateKey(key)),
            _ => {}
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("no private key found in {}", path.display()),
    ))
}

fn pem_files(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    Ok(std::fs::read_dir(directory)?
        .filter_map(Result::ok)
        .filter(|dir_entry| {
            dir_entry
                .file_type()
                .map(|file_type| file_type.is_file())
                .unwrap_or(false)
        })
        .map(|dir_entry| dir_entry.path())
        .filter(|path| path.extension() == Some(std::ffi::OsStr::new("pem")))
        .collect())
}

struct NoCertificateVerification {}

impl ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: std::time::SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}
