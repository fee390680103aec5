use secrecy::Secret;

use crate::models::{TenantContext, TokenPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Unauthenticated,
    Authenticated,
}

/// Credential view taken when a request is sent.
#[derive(Debug, Clone)]
pub(crate) struct CredentialSnapshot {
    pub access_token: Option<Secret<String>>,
    pub generation: u64,
}

/// Shared session state. Only `SessionManager` mutates it.
///
/// `generation` increases on every credential change (login, refresh,
/// context switch, purge). A 401 observed for an older generation is
/// answered with the current credential instead of another refresh.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    tokens: Option<TokenPair>,
    context: Option<TenantContext>,
    generation: u64,
}

impl SessionState {
    pub fn status(&self) -> AuthStatus {
        if self.tokens.is_some() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Unauthenticated
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> CredentialSnapshot {
        CredentialSnapshot {
            access_token: self.access_token().cloned(),
            generation: self.generation,
        }
    }

    pub fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    pub fn access_token(&self) -> Option<&Secret<String>> {
        self.tokens.as_ref().map(|t| &t.access_token)
    }

    pub fn refresh_token(&self) -> Option<&Secret<String>> {
        self.tokens.as_ref().and_then(|t| t.refresh_token.as_ref())
    }

    pub fn context(&self) -> Option<&TenantContext> {
        self.context.as_ref()
    }

    /// Install a new credential and tenant context together.
    pub fn install(&mut self, tokens: TokenPair, context: Option<TenantContext>) {
        self.tokens = Some(tokens);
        self.context = context;
        self.generation += 1;
    }

    /// Replace the credential after a refresh. The tenant context is kept.
    pub fn rotate(&mut self, tokens: TokenPair) {
        self.tokens = Some(tokens);
        self.generation += 1;
    }

    pub fn purge(&mut self) {
        self.tokens = None;
        self.context = None;
        self.generation += 1;
    }
}
