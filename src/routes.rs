//! Route guard.
//!
//! The chat view requires a session; login and the admin dashboard do
//! not. Guarding happens once per view entry, against the injected
//! [`Session`].

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Chat,
    Admin,
}

impl Route {
    /// Map an app path to a route. `/` and unknown paths land on chat.
    pub fn parse(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/login" => Route::Login,
            "/admin" => Route::Admin,
            _ => Route::Chat,
        }
    }

    pub fn requires_session(&self) -> bool {
        matches!(self, Route::Chat)
    }

    /// Where a visit to this route actually ends up.
    pub fn resolve(self, session: &Session) -> Route {
        if self.requires_session() && !session.is_authenticated() {
            tracing::debug!(route = ?self, "no session, redirecting to login");
            Route::Login
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryTokenStore;

    #[test]
    fn parse_paths() {
        assert_eq!(Route::parse("/"), Route::Chat);
        assert_eq!(Route::parse("/chat"), Route::Chat);
        assert_eq!(Route::parse("/admin/"), Route::Admin);
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/nowhere"), Route::Chat);
    }

    #[test]
    fn chat_without_token_goes_to_login() {
        let session = Session::in_memory();
        assert_eq!(Route::Chat.resolve(&session), Route::Login);
        assert_eq!(Route::Admin.resolve(&session), Route::Admin);
    }

    #[test]
    fn chat_with_token_is_allowed() {
        let session = Session::new(Box::new(MemoryTokenStore::with_token("t")));
        assert_eq!(Route::Chat.resolve(&session), Route::Chat);
        session.sign_out().unwrap();
        assert_eq!(Route::Chat.resolve(&session), Route::Login);
    }
}
