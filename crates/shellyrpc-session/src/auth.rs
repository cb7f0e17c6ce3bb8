use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};
use shellyrpc_wire::{AuthChallenge, AuthResponse, SHA256_ALGORITHM};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::AuthError;

const DIGEST_HA2_INPUT: &str = "dummy_method:dummy_uri";
const DIGEST_QOP: &str = "auth";

/// Where a connection stands with respect to digest auth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No credential cached; requests go out without `auth`.
    Unauthenticated,
    /// A challenge is being answered.
    Challenged,
    /// A credential is cached and attached to every request.
    Authenticated,
}

/// Username/password pair used to answer challenges.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field(
                "password",
                &format_args!("<redacted:{} bytes>", self.password.len()),
            )
            .finish()
    }
}

/// Connection-wide digest auth state.
///
/// One negotiator is shared by every handle of a connection, so a single
/// challenge round authenticates all later callers. The cached credential is
/// read under the lock, computed outside it, and swapped in under it.
pub struct Negotiator {
    username: String,
    password: Option<String>,
    cache: Mutex<Cache>,
    rounds: AtomicU64,
}

struct Cache {
    state: AuthState,
    response: Option<AuthResponse>,
}

impl Negotiator {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password: password.filter(|p| !p.is_empty()),
            cache: Mutex::new(Cache {
                state: AuthState::Unauthenticated,
                response: None,
            }),
            rounds: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.username.clone(), config.password().map(str::to_string))
    }

    /// The locally configured credentials, if complete.
    pub fn credentials(&self) -> Result<Credentials, AuthError> {
        if self.username.is_empty() {
            return Err(AuthError::MissingCredentials("username"));
        }
        let Some(password) = &self.password else {
            return Err(AuthError::MissingCredentials("password"));
        };
        Ok(Credentials {
            username: self.username.clone(),
            password: password.clone(),
        })
    }

    /// The cached credential to attach to the next request.
    pub fn current(&self) -> Option<AuthResponse> {
        self.lock().response.clone()
    }

    pub fn state(&self) -> AuthState {
        self.lock().state
    }

    /// Number of challenges answered so far.
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }

    /// Answer the challenge carried by a 401 error message and cache the result.
    pub fn answer(&self, message: &str) -> Result<AuthResponse, AuthError> {
        let credentials = self.credentials()?;
        let challenge = AuthChallenge::parse(message)?;

        let previous = {
            let mut cache = self.lock();
            let previous = cache.state;
            cache.state = AuthState::Challenged;
            previous
        };

        let cnonce = u64::from(rand::random::<u32>());
        let response = match digest_response(&challenge, &credentials, cnonce) {
            Ok(response) => response,
            Err(err) => {
                self.lock().state = previous;
                return Err(err);
            }
        };

        {
            let mut cache = self.lock();
            cache.response = Some(response.clone());
            cache.state = AuthState::Authenticated;
        }
        let round = self.rounds.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(realm = %response.realm, round, "answered auth challenge");

        Ok(response)
    }

    /// Drop the cached credential.
    pub fn reset(&self) {
        let mut cache = self.lock();
        if cache.response.take().is_some() {
            debug!("cleared cached auth credential");
        }
        cache.state = AuthState::Unauthenticated;
    }

    /// Drop the cached credential only if it is still `sent`.
    ///
    /// A concurrent caller may already have replaced it after a newer
    /// challenge; that credential is kept. Returns whether the cache was
    /// cleared.
    pub fn reset_if_current(&self, sent: &AuthResponse) -> bool {
        let mut cache = self.lock();
        let current = cache
            .response
            .as_ref()
            .is_some_and(|cached| cached.nonce == sent.nonce && cached.cnonce == sent.cnonce);
        if current {
            cache.response = None;
            cache.state = AuthState::Unauthenticated;
            debug!("cleared rejected auth credential");
        }
        current
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiator")
            .field("username", &self.username)
            .field("has_password", &self.password.is_some())
            .field("state", &self.state())
            .field("rounds", &self.rounds())
            .finish()
    }
}

/// Compute the digest credential for a challenge.
///
/// ```text
/// ha1      = sha256("<user>:<realm>:<password>")
/// ha2      = sha256("dummy_method:dummy_uri")
/// response = sha256("<ha1>:<nonce>:<nc>:<cnonce>:auth:<ha2>")
/// ```
pub fn digest_response(
    challenge: &AuthChallenge,
    credentials: &Credentials,
    cnonce: u64,
) -> Result<AuthResponse, AuthError> {
    if !challenge.algorithm.eq_ignore_ascii_case(SHA256_ALGORITHM) {
        return Err(AuthError::UnsupportedAlgorithm(challenge.algorithm.clone()));
    }

    let ha1 = sha256_hex(&format!(
        "{}:{}:{}",
        credentials.username, challenge.realm, credentials.password
    ));
    let ha2 = sha256_hex(DIGEST_HA2_INPUT);
    let response = sha256_hex(&format!(
        "{ha1}:{}:{}:{cnonce}:{DIGEST_QOP}:{ha2}",
        challenge.nonce,
        challenge.nonce_count()
    ));

    Ok(AuthResponse {
        realm: challenge.realm.clone(),
        username: credentials.username.clone(),
        nonce: challenge.nonce,
        cnonce,
        response,
        algorithm: SHA256_ALGORITHM.to_string(),
    })
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
