//! Session identity resolution.
//!
//! An explicit session id wins. Without one, the working directory is hashed
//! so that repeated invocations from the same directory share one state file.

/// Number of hex characters of the cwd digest used as the identity key.
pub const CWD_HASH_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIdentity {
    /// Supplied by the environment.
    Explicit(String),
    /// First `CWD_HASH_LEN` hex chars of `md5(cwd)`.
    CwdHash(String),
}

impl SessionIdentity {
    /// Pure: the same inputs always produce the same identity.
    /// An empty session id counts as absent.
    pub fn resolve(session_id: Option<&str>, cwd: &str) -> Self {
        match session_id.filter(|id| !id.is_empty()) {
            Some(id) => SessionIdentity::Explicit(id.to_string()),
            None => SessionIdentity::CwdHash(cwd_hash(cwd)),
        }
    }

    /// File-name-safe key for this identity.
    pub fn key(&self) -> String {
        match self {
            SessionIdentity::Explicit(id) => Self::sanitize(id),
            SessionIdentity::CwdHash(hash) => hash.clone(),
        }
    }

    /// Replaces anything outside `[A-Za-z0-9._-]` so an id can never
    /// introduce path separators into a file name.
    ///
    /// Not injective: ids differing only in replaced characters (`a/b`, `a_b`)
    /// share a state file. Host session ids are UUIDs, which pass unchanged.
    pub fn sanitize(id: &str) -> String {
        id.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

fn cwd_hash(cwd: &str) -> String {
    let digest = format!("{:x}", md5::compute(cwd));
    digest[..CWD_HASH_LEN].to_string()
}
