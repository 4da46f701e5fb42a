//! Encrypted session storage
//!
//! Session cookies are kept in `~/.config/chapar/session.enc`, encrypted
//! with AES-256-GCM under a key derived from machine-specific identifiers.
//! Sessions are keyed by backend base URL so several servers can coexist.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result, anyhow};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::paths;

const NONCE_SIZE: usize = 12;

/// Cookie name → value for one backend
pub type Cookies = BTreeMap<String, String>;

type Sessions = BTreeMap<String, Cookies>;

/// Best-effort stable identifier for this machine
fn machine_id() -> String {
    #[cfg(target_os = "linux")]
    {
        for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(id) = fs::read_to_string(path) {
                return id.trim().to_string();
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(output) = std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if let Some(uuid) = stdout
                .lines()
                .find(|line| line.contains("IOPlatformUUID"))
                .and_then(|line| line.split('"').nth(3))
            {
                return uuid.to_string();
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(output) = std::process::Command::new("reg")
            .args([
                "query",
                r"HKLM\SOFTWARE\Microsoft\Cryptography",
                "/v",
                "MachineGuid",
            ])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if let Some(guid) = stdout
                .lines()
                .find(|line| line.contains("MachineGuid"))
                .and_then(|line| line.split_whitespace().last())
            {
                return guid.to_string();
            }
        }
    }

    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "chapar-fallback-key".to_string())
}

fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(machine_id().as_bytes());
    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }
    hasher.update(b"chapar-session-vault-v1");
    hasher.finalize().into()
}

fn cipher() -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&derive_key()).map_err(|_| anyhow!("Invalid vault key length"))
}

/// Encrypted file holding session cookies
#[derive(Debug, Clone)]
pub struct SessionVault {
    path: PathBuf,
}

impl SessionVault {
    /// Vault at the default location
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(paths::session_path()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Sessions> {
        if !self.path.exists() {
            return Ok(Sessions::new());
        }

        let encrypted = fs::read(&self.path).context("Failed to read session file")?;
        if encrypted.len() < NONCE_SIZE {
            return Ok(Sessions::new());
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let plaintext = cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| anyhow!("Failed to decrypt session file"))?;

        serde_json::from_slice(&plaintext).context("Corrupt session file")
    }

    fn write_all(&self, sessions: &Sessions) -> Result<()> {
        let json = serde_json::to_vec(sessions)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill(&mut nonce_bytes);

        let ciphertext = cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), json.as_slice())
            .map_err(|_| anyhow!("Failed to encrypt session file"))?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        fs::write(&self.path, output).context("Failed to write session file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Cookies stored for `base_url`; empty when none
    pub fn load(&self, base_url: &str) -> Result<Cookies> {
        Ok(self.read_all()?.remove(base_url).unwrap_or_default())
    }

    /// Replace the cookies for `base_url`; an empty jar removes the entry
    pub fn save(&self, base_url: &str, cookies: &Cookies) -> Result<()> {
        // An unreadable file is replaced rather than blocking login
        let mut sessions = self.read_all().unwrap_or_default();
        if cookies.is_empty() {
            sessions.remove(base_url);
        } else {
            sessions.insert(base_url.to_string(), cookies.clone());
        }
        debug!(base_url, count = cookies.len(), "saving session");
        self.write_all(&sessions)
    }

    pub fn clear(&self, base_url: &str) -> Result<()> {
        self.save(base_url, &Cookies::new())
    }
}
