use base64::{Engine, engine::general_purpose};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// How checksum problems are treated when validation is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ChecksumPolicy {
    /// Any mismatch, unreadable file, or missing file stops the whole run.
    #[default]
    Abort,
    /// The offending row is reported and left out; the run continues.
    SkipRecord,
}

/// Digests of one file in every encoding the catalog might use.
#[derive(Debug, Clone)]
pub struct FileDigests {
    pub sha1_base64: String,
    pub sha1_hex: String,
    pub sha256_base64: String,
    pub sha256_hex: String,
}

impl FileDigests {
    pub fn matches(&self, expected: &str) -> bool {
        let expected = expected.trim();
        expected == self.sha1_base64
            || expected == self.sha256_base64
            || expected.eq_ignore_ascii_case(&self.sha1_hex)
            || expected.eq_ignore_ascii_case(&self.sha256_hex)
    }
}

/// Hash a file once with SHA-1 and SHA-256.
pub fn digest_file(path: &Path) -> Result<FileDigests, io::Error> {
    let mut file = fs::File::open(path)?;
    let mut sha1 = Sha1::new();
    let mut sha256 = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sha1.update(&buf[..n]);
        sha256.update(&buf[..n]);
    }
    let sha1 = sha1.finalize();
    let sha256 = sha256.finalize();

    Ok(FileDigests {
        sha1_base64: general_purpose::STANDARD.encode(sha1),
        sha1_hex: to_hex(&sha1),
        sha256_base64: general_purpose::STANDARD.encode(sha256),
        sha256_hex: to_hex(&sha256),
    })
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
