//! `salesdash login`, `logout` and `whoami`

use std::io::{self, BufRead, Write};

use chrono::Utc;
use clap::Args;

use super::Context;
use crate::gateway::Gateway;
use crate::session::{Credentials, Session, SessionStore, UserProfile};
use crate::types::{DashError, Result};

/// Sign in with email and password
#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    /// Read from stdin when omitted
    #[arg(long)]
    pub password: Option<String>,
}

impl LoginArgs {
    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let password = match self.password {
            Some(password) => password,
            None => prompt_password()?,
        };
        let credentials = Credentials::new(self.email, password);
        let gateway = ctx.anonymous_gateway()?;

        // Demo sessions never reach the store; a live run would send the fake token
        let store = (!ctx.is_demo()).then(|| ctx.store());
        let session = login(gateway.as_ref(), store, &credentials)?;

        let profile = session.profile();
        println!(
            "Signed in as {} ({})",
            profile.display_name, profile.account_name
        );
        Ok(())
    }
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Validate, sign in, then persist the session
pub fn login(
    gateway: &dyn Gateway,
    store: Option<&SessionStore>,
    credentials: &Credentials,
) -> Result<Session> {
    credentials.validate()?;
    let session = gateway.sign_in(credentials.email.trim(), &credentials.password)?;
    if let Some(store) = store {
        store.save(&session)?;
        tracing::info!(path = %store.path().display(), "Session saved");
    }
    Ok(session)
}

/// The stored session, refreshed first when its access token has expired.
/// A refreshed session replaces the stored one.
pub fn resume(gateway: &dyn Gateway, store: &SessionStore) -> Result<Session> {
    let Some(session) = store.load_stored() else {
        return Err(DashError::Session(
            "Not signed in. Run `salesdash login` first.".into(),
        ));
    };
    if !session.is_expired(Utc::now()) {
        return Ok(session);
    }
    if session.refresh_token.is_empty() {
        return Err(DashError::Session(
            "Session expired. Run `salesdash login` again.".into(),
        ));
    }

    let refreshed = gateway.refresh_session(&session.refresh_token).map_err(|e| {
        tracing::warn!(error = %e, "Session refresh failed");
        DashError::Session("Session expired. Run `salesdash login` again.".into())
    })?;
    store.save(&refreshed)?;
    tracing::info!("Session refreshed");
    Ok(refreshed)
}

/// Revoke the stored session remotely and forget it locally.
/// Returns false when nobody was signed in.
pub fn logout(gateway: &dyn Gateway, store: &SessionStore) -> Result<bool> {
    let Some(session) = store.load_stored() else {
        store.clear()?;
        return Ok(false);
    };
    if let Err(e) = gateway.sign_out(&session) {
        // The local session is dropped regardless
        tracing::warn!(error = %e, "Remote sign-out failed");
    }
    store.clear()?;
    Ok(true)
}

pub fn run_logout(ctx: &Context) -> anyhow::Result<()> {
    if ctx.is_demo() {
        println!("Demo mode has no stored session");
        return Ok(());
    }
    let gateway = ctx.anonymous_gateway()?;
    if logout(gateway.as_ref(), ctx.store())? {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

pub fn run_whoami(ctx: &Context) -> anyhow::Result<()> {
    let (session, _) = ctx.signed_in()?;
    print!("{}", render_profile(&session.profile()));
    Ok(())
}

fn render_profile(profile: &UserProfile) -> String {
    let email = if profile.email.is_empty() {
        "-"
    } else {
        profile.email.as_str()
    };
    format!(
        "Name:        {}\nEmail:       {}\nAccount:     {} {}\nLast login:  {}\n",
        profile.display_name, email, profile.account_name, profile.account_number, profile.last_login
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::types::Agent;
    use tempfile::TempDir;

    fn gateway() -> MemoryGateway {
        MemoryGateway::new(vec![Agent::new(1, "Amna")], Vec::new())
    }

    #[test]
    fn test_login_saves_session() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        let credentials = Credentials::new(" sara@acme.com ", "secret");

        let session = login(&gateway(), Some(&store), &credentials).unwrap();
        assert_eq!(session.user.email.as_deref(), Some("sara@acme.com"));
        assert_eq!(store.load(), Some(session));
    }

    #[test]
    fn test_login_validates_before_request() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());

        let err = login(&gateway(), Some(&store), &Credentials::new("sara", "secret")).unwrap_err();
        assert_eq!(err.message(), "Invalid email format");
        let err = login(&gateway(), Some(&store), &Credentials::new("", "")).unwrap_err();
        assert_eq!(err.message(), "Email and password are required");
        assert!(store.load().is_none());
    }

    #[test]
    fn test_login_rejected_keeps_store_empty() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        let gateway = gateway().failing("sign_in");

        let err = login(&gateway, Some(&store), &Credentials::new("sara@acme.com", "x")).unwrap_err();
        assert!(matches!(err, DashError::Auth(_)));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_logout_clears_even_when_remote_fails() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        let credentials = Credentials::new("sara@acme.com", "secret");
        login(&gateway(), Some(&store), &credentials).unwrap();

        assert!(logout(&gateway().failing("sign_out"), &store).unwrap());
        assert!(store.load().is_none());
        assert!(!logout(&gateway(), &store).unwrap());
    }

    fn stored(store: &SessionStore, expires_at: i64, refresh_token: &str) {
        let mut session = gateway().sign_in("sara@acme.com", "secret").unwrap();
        session.expires_at = expires_at;
        session.refresh_token = refresh_token.to_string();
        store.save(&session).unwrap();
    }

    #[test]
    fn test_resume_requires_stored_session() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        let err = resume(&gateway(), &store).unwrap_err();
        assert!(matches!(err, DashError::Session(ref m) if m.starts_with("Not signed in")));
    }

    #[test]
    fn test_resume_keeps_live_session() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        stored(&store, Utc::now().timestamp() + 3600, "ref-1");

        let session = resume(&gateway().failing("refresh_session"), &store).unwrap();
        assert_eq!(session.access_token, "demo-access-token");
    }

    #[test]
    fn test_resume_refreshes_expired_session() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        stored(&store, Utc::now().timestamp() - 60, "ref-1");

        let session = resume(&gateway(), &store).unwrap();
        assert_eq!(session.access_token, "refreshed-ref-1");
        assert_eq!(store.load(), Some(session));
    }

    #[test]
    fn test_resume_expired_without_refresh() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        stored(&store, Utc::now().timestamp() - 60, "");
        let err = resume(&gateway(), &store).unwrap_err();
        assert!(matches!(err, DashError::Session(ref m) if m.starts_with("Session expired")));

        stored(&store, Utc::now().timestamp() - 60, "ref-1");
        let err = resume(&gateway().failing("refresh_session"), &store).unwrap_err();
        assert!(matches!(err, DashError::Session(ref m) if m.starts_with("Session expired")));
    }

    #[test]
    fn test_render_profile() {
        let profile = UserProfile {
            display_name: "sara".into(),
            account_name: "ACME".into(),
            account_number: "#SDabc123".into(),
            last_login: "Just now".into(),
            email: String::new(),
        };
        let text = render_profile(&profile);
        assert!(text.contains("Name:        sara"));
        assert!(text.contains("Email:       -"));
        assert!(text.contains("Account:     ACME #SDabc123"));
    }
}
