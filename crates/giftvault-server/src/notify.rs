//! Notification collaborator boundary.
//!
//! Notifications are fire-and-forget: dispatch happens on a spawned task
//! after the ledger mutation has committed, and a failed dispatch is
//! logged, never surfaced to the client or rolled into the financial
//! operation's result.

use std::sync::Arc;

use uuid::Uuid;

/// Kinds of user-facing notification events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    CardMinted,
    CardRecharged,
    CardSpent,
    ChangeIssued,
    RewardGranted,
    WalletBound,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::CardMinted => "card_minted",
            NotificationKind::CardRecharged => "card_recharged",
            NotificationKind::CardSpent => "card_spent",
            NotificationKind::ChangeIssued => "change_issued",
            NotificationKind::RewardGranted => "reward_granted",
            NotificationKind::WalletBound => "wallet_bound",
        }
    }
}

/// External notification service, treated as a black box.
pub trait Notifier: Send + Sync + 'static {
    fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: String,
        message: String,
        related_card_id: Option<Uuid>,
    );
}

/// Notifier that emits structured log events.
///
/// Stands in for a real push/email dispatcher; the ledger only depends on
/// the `Notifier` trait.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: String,
        message: String,
        related_card_id: Option<Uuid>,
    ) {
        tracing::info!(
            user_id = %user_id,
            kind = kind.as_str(),
            card_id = ?related_card_id,
            title = %title,
            "notification: {}",
            message
        );
    }
}

/// Dispatches a notification off the request path.
pub fn dispatch(
    notifier: &Arc<dyn Notifier>,
    user_id: Uuid,
    kind: NotificationKind,
    title: impl Into<String>,
    message: impl Into<String>,
    related_card_id: Option<Uuid>,
) {
    let notifier = Arc::clone(notifier);
    let title = title.into();
    let message = message.into();
    tokio::spawn(async move {
        notifier.notify(user_id, kind, title, message, related_card_id);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingNotifier(AtomicUsize);

    impl Notifier for CountingNotifier {
        fn notify(&self, _: Uuid, _: NotificationKind, _: String, _: String, _: Option<Uuid>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_dispatch_reaches_notifier() {
        let notifier: Arc<CountingNotifier> = Arc::new(CountingNotifier(AtomicUsize::new(0)));
        let as_trait: Arc<dyn Notifier> = notifier.clone();

        dispatch(
            &as_trait,
            Uuid::new_v4(),
            NotificationKind::CardRecharged,
            "Card recharged",
            "Your card was topped up",
            None,
        );

        // Give the spawned task a chance to run
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }
}
