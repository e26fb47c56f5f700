//! Read side of the duty session lifecycle.

use std::sync::Arc;

use uuid::Uuid;

use super::DutyError;
use crate::models::duty::DutySession;
use crate::models::user::User;
use crate::store::DutyStore;

/// Answers "is this user on duty, and in which session".
#[derive(Clone)]
pub struct SessionQuery {
    store: Arc<dyn DutyStore>,
}

impl SessionQuery {
    pub fn new(store: Arc<dyn DutyStore>) -> Self {
        Self { store }
    }

    /// The user's open session, or `None` when off duty.
    pub async fn active_session(&self, user: &User) -> Result<Option<DutySession>, DutyError> {
        Ok(self.store.find_open_session(user.id).await?)
    }

    /// Precondition for operations that only make sense on duty, such as
    /// safety-checklist submission.
    ///
    /// When `session_id` is given it must name the open session.
    pub async fn require_active(
        &self,
        user: &User,
        session_id: Option<Uuid>,
    ) -> Result<DutySession, DutyError> {
        match self.active_session(user).await? {
            Some(session) if session_id.is_none_or(|id| id == session.id) => Ok(session),
            _ => Err(DutyError::NoActiveSession),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::duty::DutySessionManager;
    use crate::models::duty::{ClockIn, ClockOut};
    use crate::models::user::{Role, UserProfile};
    use crate::store::MemoryStore;

    fn guard() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            external_id: "ext_q".into(),
            profile: UserProfile::default(),
            role: Role::Guard,
            created_at: now,
            updated_at: now,
        }
    }

    fn services() -> (DutySessionManager, SessionQuery) {
        let store = Arc::new(MemoryStore::new());
        (
            DutySessionManager::new(store.clone()),
            SessionQuery::new(store),
        )
    }

    #[tokio::test]
    async fn off_duty_is_none_not_error() {
        let (_, query) = services();
        assert_eq!(query.active_session(&guard()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn tracks_clock_in_and_out() {
        let (manager, query) = services();
        let user = guard();

        let open = manager.clock_in(&user, ClockIn::default()).await.unwrap();
        assert_eq!(query.active_session(&user).await.unwrap(), Some(open.clone()));

        manager
            .clock_out(
                &user,
                ClockOut {
                    duty_session_id: open.id,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(query.active_session(&user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn require_active_checks_session_id() {
        let (manager, query) = services();
        let user = guard();

        assert!(matches!(
            query.require_active(&user, None).await,
            Err(DutyError::NoActiveSession)
        ));

        let open = manager.clock_in(&user, ClockIn::default()).await.unwrap();
        assert_eq!(query.require_active(&user, None).await.unwrap().id, open.id);
        assert_eq!(
            query.require_active(&user, Some(open.id)).await.unwrap().id,
            open.id
        );
        assert!(matches!(
            query.require_active(&user, Some(Uuid::new_v4())).await,
            Err(DutyError::NoActiveSession)
        ));
    }
}
