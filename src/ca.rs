//! Certificate authority bootstrap and leaf issuance
//!
//! A self-signed root authority lives under a fixed directory layout:
//! `private/cakey.pem`, `cacert.pem`, `serial`, `index.txt`, and the
//! toolchain configuration. Each named service endpoint gets its own
//! key/CSR/certificate triple under `private/` and `certs/`.
//!
//! Every step converges idempotently: evidence of a prior run on disk means
//! the step is skipped, so a partially completed bootstrap resumes where it
//! stopped rather than starting over. Key and certificate existence are
//! checked independently for the same reason.

use log::debug;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::{Result, SetupError};
use crate::exec::run_tool;
use crate::options::CertSubject;

/// Common name of the root certificate.
const ROOT_COMMON_NAME: &str = "keysmith-ca";

/// RSA key size for the root and every leaf.
const KEY_BITS: &str = "2048";

/// Validity of the root certificate in days.
const ROOT_DAYS: &str = "3650";

/// Self-signed root authority plus per-endpoint issuance.
#[derive(Debug, Clone)]
pub struct CertificateAuthority {
    root: PathBuf,
    subject: CertSubject,
    verify: bool,
}

impl CertificateAuthority {
    pub fn new(root: impl Into<PathBuf>, subject: CertSubject, verify: bool) -> Self {
        Self {
            root: root.into(),
            subject,
            verify,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    fn private_dir(&self) -> PathBuf {
        self.root.join("private")
    }

    fn certs_dir(&self) -> PathBuf {
        self.root.join("certs")
    }

    fn ca_key(&self) -> PathBuf {
        self.private_dir().join("cakey.pem")
    }

    fn ca_cert(&self) -> PathBuf {
        self.root.join("cacert.pem")
    }

    fn serial_file(&self) -> PathBuf {
        self.root.join("serial")
    }

    fn index_file(&self) -> PathBuf {
        self.root.join("index.txt")
    }

    fn config_file(&self) -> PathBuf {
        self.root.join("openssl.cnf")
    }

    /// Key path for a named endpoint.
    pub fn key_path(&self, name: &str) -> PathBuf {
        self.private_dir().join(format!("{name}.key.pem"))
    }

    /// CSR path for a named endpoint.
    pub fn csr_path(&self, name: &str) -> PathBuf {
        self.certs_dir().join(format!("{name}.csr.pem"))
    }

    /// Certificate path for a named endpoint.
    pub fn cert_path(&self, name: &str) -> PathBuf {
        self.certs_dir().join(format!("{name}.cert.pem"))
    }

    /// Converge the authority to ready: directories, issuance database,
    /// toolchain configuration, root key, root certificate. Each step
    /// no-ops when its artifact already exists.
    pub fn ensure_ready(&self) -> Result<()> {
        fs::create_dir_all(self.private_dir())?;
        fs::set_permissions(self.private_dir(), fs::Permissions::from_mode(0o700))?;
        fs::create_dir_all(self.certs_dir())?;

        if !self.serial_file().exists() {
            fs::write(self.serial_file(), "01\n")?;
            println!("  created authority serial file");
        }
        if !self.index_file().exists() {
            fs::write(self.index_file(), "")?;
            println!("  created authority issuance index");
        }
        if !self.config_file().exists() {
            fs::write(self.config_file(), self.toolchain_config())?;
            debug!("wrote toolchain configuration to {:?}", self.config_file());
        }

        if self.ca_key().exists() {
            debug!("authority key already exists at {:?}", self.ca_key());
        } else {
            run_tool(
                "openssl",
                &["genrsa", "-out", &path_str(&self.ca_key()), KEY_BITS],
            )?;
            tighten_key(&self.ca_key())?;
            println!("  generated authority private key");
        }

        if self.ca_cert().exists() {
            debug!("authority certificate already exists at {:?}", self.ca_cert());
        } else {
            run_tool(
                "openssl",
                &[
                    "req",
                    "-x509",
                    "-new",
                    "-nodes",
                    "-sha256",
                    "-days",
                    ROOT_DAYS,
                    "-config",
                    &path_str(&self.config_file()),
                    "-key",
                    &path_str(&self.ca_key()),
                    "-subj",
                    &self.subject.subj_arg(ROOT_COMMON_NAME),
                    "-out",
                    &path_str(&self.ca_cert()),
                ],
            )?;
            publish_cert(&self.ca_cert())?;
            println!("  generated self-signed authority certificate");
        }

        Ok(())
    }

    /// Issue (or find) the certificate for a named endpoint.
    ///
    /// The private key and the certificate are converged independently: an
    /// existing key without a certificate is valid, and only the missing
    /// artifact is produced. After issuance - or after finding a prior
    /// certificate - the leaf is verified against the root unless
    /// verification was skipped at the command line.
    pub fn issue(&self, name: &str, common_name: &str) -> Result<()> {
        self.ensure_ready()?;

        let key = self.key_path(name);
        if key.exists() {
            println!("  {name} key already exists");
        } else {
            run_tool("openssl", &["genrsa", "-out", &path_str(&key), KEY_BITS])?;
            tighten_key(&key)?;
            println!("  generated {name} private key");
        }

        let cert = self.cert_path(name);
        if cert.exists() {
            println!("  {name} certificate already exists");
        } else {
            let csr = self.csr_path(name);
            run_tool(
                "openssl",
                &[
                    "req",
                    "-new",
                    "-config",
                    &path_str(&self.config_file()),
                    "-key",
                    &path_str(&key),
                    "-subj",
                    &self.subject.subj_arg(common_name),
                    "-out",
                    &path_str(&csr),
                ],
            )?;
            run_tool(
                "openssl",
                &[
                    "ca",
                    "-batch",
                    "-notext",
                    "-config",
                    &path_str(&self.config_file()),
                    "-in",
                    &path_str(&csr),
                    "-out",
                    &path_str(&cert),
                ],
            )?;
            publish_cert(&cert)?;
            println!("  issued {name} certificate (CN={common_name})");
        }

        if self.verify {
            self.verify_leaf(&cert)?;
        }
        Ok(())
    }

    /// Validate a leaf against the root. The toolchain prints exactly
    /// `<path>: OK` on success; anything else is fatal.
    fn verify_leaf(&self, cert: &Path) -> Result<()> {
        let output = run_tool(
            "openssl",
            &[
                "verify",
                "-CAfile",
                &path_str(&self.ca_cert()),
                &path_str(cert),
            ],
        )?;
        let expected = format!("{}: OK", cert.display());
        if output.stdout.trim() == expected {
            println!("  verified {} against the authority", cert.display());
            Ok(())
        } else {
            Err(SetupError::verify(format!(
                "{} did not validate against the authority\n--- stdout ---\n{}\n--- stderr ---\n{}",
                cert.display(),
                output.stdout,
                output.stderr
            )))
        }
    }

    /// Toolchain configuration covering both CSR creation and CA signing.
    fn toolchain_config(&self) -> String {
        format!(
            "[ ca ]\n\
             default_ca = keysmith_ca\n\
             \n\
             [ keysmith_ca ]\n\
             dir              = {dir}\n\
             database         = $dir/index.txt\n\
             serial           = $dir/serial\n\
             new_certs_dir    = $dir/certs\n\
             certificate      = $dir/cacert.pem\n\
             private_key      = $dir/private/cakey.pem\n\
             default_md       = sha256\n\
             default_days     = 365\n\
             policy           = keysmith_policy\n\
             x509_extensions  = keysmith_extensions\n\
             copy_extensions  = none\n\
             unique_subject   = no\n\
             \n\
             [ keysmith_policy ]\n\
             countryName            = optional\n\
             stateOrProvinceName    = optional\n\
             localityName           = optional\n\
             organizationName       = optional\n\
             organizationalUnitName = optional\n\
             commonName             = supplied\n\
             emailAddress           = optional\n\
             \n\
             [ keysmith_extensions ]\n\
             basicConstraints = CA:false\n\
             \n\
             [ req ]\n\
             distinguished_name = req_distinguished_name\n\
             \n\
             [ req_distinguished_name ]\n",
            dir = self.root.display()
        )
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

/// Private keys are owner-only the moment they exist.
fn tighten_key(path: &Path) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

/// Certificates are public material and stay world-readable.
fn publish_cert(path: &Path) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o666))?;
    Ok(())
}
