use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use teletype_common::{
    error::{Result, TeletypeError},
    types::{TerminalConfig, TerminalSnapshot},
};
use tokio::sync::{watch, RwLock};
use tracing::{info, instrument, warn};

use crate::{Terminal, TerminalHandle};

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new unique session ID
    pub fn new() -> Self {
        Self(SESSION_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Session metadata
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: SessionId,
    pub title: String,
    pub created_at: u64,
    pub commands: usize,
}

impl SessionInfo {
    pub fn new(title: String, commands: usize) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Self {
            id: SessionId::new(),
            title,
            created_at,
            commands,
        }
    }
}

struct Session {
    info: SessionInfo,
    config: TerminalConfig,
    handle: TerminalHandle,
}

/// Tracks independent terminals shown side by side, e.g. one per page
/// section.
pub struct SessionManager {
    sessions: Arc<RwLock<Vec<Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Spawn a terminal with an entropy-seeded random source
    pub async fn create_session(&self, title: String, config: TerminalConfig) -> SessionInfo {
        let terminal = Terminal::new(config.clone());
        self.create_session_with(title, config, terminal).await
    }

    /// Spawn a prepared terminal. `config` is what [`restart`] goes back to.
    ///
    /// [`restart`]: SessionManager::restart
    #[instrument(skip(self, config, terminal))]
    pub async fn create_session_with(
        &self,
        title: String,
        config: TerminalConfig,
        terminal: Terminal,
    ) -> SessionInfo {
        let info = SessionInfo::new(title, config.commands.len());
        info!("Spawning terminal {} ({})", info.id, info.title);
        let handle = terminal.spawn();
        let mut sessions = self.sessions.write().await;
        sessions.push(Session {
            info: info.clone(),
            config,
            handle,
        });
        info
    }

    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|s| s.info.clone())
            .collect()
    }

    pub async fn snapshot(&self, id: SessionId) -> Result<TerminalSnapshot> {
        let sessions = self.sessions.read().await;
        find(&sessions, id).map(|s| s.handle.snapshot())
    }

    pub async fn snapshot_receiver(&self, id: SessionId) -> Result<watch::Receiver<TerminalSnapshot>> {
        let sessions = self.sessions.read().await;
        find(&sessions, id).map(|s| s.handle.snapshot_receiver())
    }

    /// Type the session's configured commands again from the top
    pub async fn restart(&self, id: SessionId) -> Result<()> {
        let sessions = self.sessions.read().await;
        let session = find(&sessions, id)?;
        session.handle.reconfigure(session.config.clone()).await
    }

    pub async fn restart_all(&self) -> Result<()> {
        let sessions = self.sessions.read().await;
        for session in sessions.iter() {
            session.handle.reconfigure(session.config.clone()).await?;
        }
        Ok(())
    }

    /// Pause or resume typing in every session
    pub async fn set_typing_all(&self, enabled: bool) -> Result<()> {
        let sessions = self.sessions.read().await;
        for session in sessions.iter() {
            session.handle.set_typing(enabled).await?;
        }
        Ok(())
    }

    /// Tear down one session
    pub async fn remove_session(&self, id: SessionId) -> Result<()> {
        let session = {
            let mut sessions = self.sessions.write().await;
            let index = sessions
                .iter()
                .position(|s| s.info.id == id)
                .ok_or_else(|| TeletypeError::UnknownSession(id.to_string()))?;
            sessions.remove(index)
        };
        session.handle.shutdown().await
    }

    /// Tear down every session, waiting for all tasks to exit
    #[instrument(skip(self))]
    pub async fn close_all(&self) -> Result<()> {
        let drained: Vec<Session> = self.sessions.write().await.drain(..).collect();
        info!("Closing {} terminals", drained.len());
        let results = join_all(drained.into_iter().map(|s| s.handle.shutdown())).await;
        for result in &results {
            if let Err(e) = result {
                warn!("Terminal did not shut down cleanly: {}", e);
            }
        }
        results.into_iter().collect()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn find(sessions: &[Session], id: SessionId) -> Result<&Session> {
    sessions
        .iter()
        .find(|s| s.info.id == id)
        .ok_or_else(|| TeletypeError::UnknownSession(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedRng;
    use std::time::Duration;
    use teletype_common::types::Phase;

    fn quiet(commands: &[&str]) -> TerminalConfig {
        TerminalConfig::new(commands.iter().copied()).with_glitch_probability(0.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_are_independent() {
        let manager = SessionManager::new();
        let hero = manager.create_session("hero".into(), quiet(&["whoami"])).await;
        let contact = manager
            .create_session("contact".into(), quiet(&["contact --method"]))
            .await;
        assert_ne!(hero.id, contact.id);
        assert_eq!(manager.list_sessions().await.len(), 2);

        manager.remove_session(contact.id).await.unwrap();
        assert!(manager.snapshot(contact.id).await.is_err());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let snapshot = manager.snapshot(hero.id).await.unwrap();
        assert_eq!(snapshot.lines, vec!["whoami".to_string()]);
        assert_eq!(snapshot.phase, Phase::Finished);

        manager.close_all().await.unwrap();
        assert!(manager.list_sessions().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_types_again() {
        let manager = SessionManager::new();
        let config = quiet(&["ok"]);
        let info = manager
            .create_session_with(
                "status".into(),
                config.clone(),
                Terminal::with_rng(config, ScriptedRng::constant(0.5)),
            )
            .await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(manager.snapshot(info.id).await.unwrap().is_finished());

        manager.restart(info.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let snapshot = manager.snapshot(info.id).await.unwrap();
        assert_eq!(snapshot.phase, Phase::AwaitingFirstChar);
        assert_eq!(snapshot.lines, vec![String::new()]);

        manager.close_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let manager = SessionManager::new();
        let err = manager.remove_session(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, TeletypeError::UnknownSession(_)));
    }
}
