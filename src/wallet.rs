//! Test actors and the key material they are loaded from

use anyhow::{anyhow, bail, Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::types::ActorRole;

/// Source of serialized secret keys
pub trait KeySource: Send + Sync {
    /// Raw 64-byte secret key for `role`
    fn load_secret_key(&self, role: ActorRole) -> Result<Zeroizing<Vec<u8>>>;
}

/// Reads Solana CLI keypair files (JSON byte array), base58 secret keys or
/// raw 64-byte files
#[derive(Debug, Clone, Default)]
pub struct FileKeySource {
    paths: HashMap<ActorRole, PathBuf>,
}

impl FileKeySource {
    pub fn new(paths: HashMap<ActorRole, PathBuf>) -> Self {
        Self { paths }
    }

    pub fn with_path(mut self, role: ActorRole, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(role, path.into());
        self
    }
}

impl KeySource for FileKeySource {
    fn load_secret_key(&self, role: ActorRole) -> Result<Zeroizing<Vec<u8>>> {
        let path = self
            .paths
            .get(&role)
            .ok_or_else(|| anyhow!("No key file configured for {}", role))?;
        read_keypair_bytes(path)
    }
}

/// Parse a keypair file into its 64 secret key bytes
pub fn read_keypair_bytes(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    let file_bytes = Zeroizing::new(
        std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path.display()))?,
    );

    let bytes = if file_bytes.len() == 64 {
        Zeroizing::new(file_bytes.to_vec())
    } else if file_bytes.trim_ascii_start().starts_with(b"[") {
        let json: Vec<u8> = serde_json::from_slice(&file_bytes)
            .with_context(|| format!("Failed to parse keypair JSON: {}", path.display()))?;
        Zeroizing::new(json)
    } else {
        // Base58 secret key, as exported by browser wallets
        let text = std::str::from_utf8(&file_bytes)
            .with_context(|| format!("Keypair file is not valid UTF-8: {}", path.display()))?;
        let decoded = bs58::decode(text.trim())
            .into_vec()
            .with_context(|| format!("Failed to parse base58 keypair: {}", path.display()))?;
        Zeroizing::new(decoded)
    };

    validate_secret_key(&bytes)?;
    Ok(bytes)
}

fn validate_secret_key(bytes: &[u8]) -> Result<()> {
    if bytes.len() != 64 {
        bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
    }
    if bytes.iter().all(|&b| b == 0) {
        bail!("Invalid keypair: all-zero key rejected");
    }
    Ok(())
}

/// Fixed in-memory keys, for tests and throwaway runs
#[derive(Default)]
pub struct InMemoryKeySource {
    keys: HashMap<ActorRole, Zeroizing<Vec<u8>>>,
}

impl InMemoryKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh random keypair for every role
    pub fn generated() -> Self {
        let mut source = Self::new();
        for role in ActorRole::ALL {
            source = source.with_keypair(role, &Keypair::new());
        }
        source
    }

    pub fn with_keypair(mut self, role: ActorRole, keypair: &Keypair) -> Self {
        self.keys
            .insert(role, Zeroizing::new(keypair.to_bytes().to_vec()));
        self
    }
}

impl KeySource for InMemoryKeySource {
    fn load_secret_key(&self, role: ActorRole) -> Result<Zeroizing<Vec<u8>>> {
        self.keys
            .get(&role)
            .cloned()
            .ok_or_else(|| anyhow!("No in-memory key for {}", role))
    }
}

/// A keypair with the role it plays
pub struct Actor {
    role: ActorRole,
    keypair: Arc<Keypair>,
}

impl Actor {
    pub fn load(source: &dyn KeySource, role: ActorRole) -> Result<Self> {
        let bytes = source.load_secret_key(role)?;
        validate_secret_key(&bytes)?;
        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|e| anyhow!("Invalid keypair bytes for {}: {}", role, e))?;
        Ok(Self::from_keypair(role, keypair))
    }

    pub fn from_keypair(role: ActorRole, keypair: Keypair) -> Self {
        Self {
            role,
            keypair: Arc::new(keypair),
        }
    }

    pub fn role(&self) -> ActorRole {
        self.role
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl Clone for Actor {
    fn clone(&self) -> Self {
        Self {
            role: self.role,
            keypair: Arc::clone(&self.keypair),
        }
    }
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("role", &self.role)
            .field("pubkey", &self.pubkey())
            .finish()
    }
}

/// The four actors a scenario run uses, loaded once at startup
#[derive(Debug, Clone)]
pub struct Actors {
    pub payer: Actor,
    pub leader: Actor,
    pub user: Actor,
    pub backend_wallet: Actor,
}

impl Actors {
    pub fn load(source: &dyn KeySource) -> Result<Self> {
        Ok(Self {
            payer: Actor::load(source, ActorRole::Payer)?,
            leader: Actor::load(source, ActorRole::Leader)?,
            user: Actor::load(source, ActorRole::User)?,
            backend_wallet: Actor::load(source, ActorRole::BackendWallet)?,
        })
    }

    pub fn get(&self, role: ActorRole) -> &Actor {
        match role {
            ActorRole::Payer => &self.payer,
            ActorRole::Leader => &self.leader,
            ActorRole::User => &self.user,
            ActorRole::BackendWallet => &self.backend_wallet,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        ActorRole::ALL.into_iter().map(move |role| self.get(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_json_keypair_file() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let source = FileKeySource::default().with_path(ActorRole::Leader, file.path());
        let actor = Actor::load(&source, ActorRole::Leader).unwrap();
        assert_eq!(actor.pubkey(), keypair.pubkey());
        assert_eq!(actor.role(), ActorRole::Leader);
    }

    #[test]
    fn test_load_raw_keypair_file() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&keypair.to_bytes()).unwrap();

        let bytes = read_keypair_bytes(file.path()).unwrap();
        assert_eq!(bytes.as_slice(), &keypair.to_bytes()[..]);
    }

    #[test]
    fn test_load_base58_keypair_file() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", keypair.to_base58_string()).unwrap();

        let bytes = read_keypair_bytes(file.path()).unwrap();
        assert_eq!(bytes.as_slice(), &keypair.to_bytes()[..]);
    }

    #[test]
    fn test_rejects_bad_key_material() {
        let mut zero = tempfile::NamedTempFile::new().unwrap();
        zero.write_all(&[0u8; 64]).unwrap();
        assert!(read_keypair_bytes(zero.path()).is_err());

        let mut short = tempfile::NamedTempFile::new().unwrap();
        short.write_all(b"[1,2,3]").unwrap();
        assert!(read_keypair_bytes(short.path()).is_err());

        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        garbage.write_all(b"not-a-key-0OIl").unwrap();
        assert!(read_keypair_bytes(garbage.path()).is_err());

        let source = FileKeySource::default();
        assert!(source.load_secret_key(ActorRole::Payer).is_err());
    }

    #[test]
    fn test_actors_from_memory() {
        let leader = Keypair::new();
        let source = InMemoryKeySource::generated().with_keypair(ActorRole::Leader, &leader);
        let actors = Actors::load(&source).unwrap();

        assert_eq!(actors.leader.pubkey(), leader.pubkey());
        assert_eq!(actors.iter().count(), 4);
        assert_ne!(actors.payer.pubkey(), actors.user.pubkey());
        assert_eq!(actors.get(ActorRole::BackendWallet).role(), ActorRole::BackendWallet);
    }

    #[test]
    fn test_missing_in_memory_key() {
        let source = InMemoryKeySource::new();
        assert!(Actors::load(&source).is_err());
    }
}
