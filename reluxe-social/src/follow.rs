//! Optimistic follow toggle. The displayed state flips the instant the user
//! clicks; network confirmations settle by epoch so reordered responses can
//! never clobber a later click.

use std::sync::Arc;

use async_trait::async_trait;

use reluxe_shared::errors::AppResult;

#[async_trait]
pub trait SocialApi: Send + Sync {
    /// Persist the follow relation toward a designer. The backend replies
    /// with an empty success envelope; displayed state is owned locally.
    async fn set_following(&self, designer: &str, follow: bool) -> AppResult<()>;

    /// Suggestion strings for a partially typed search keyword.
    async fn guide_keyword(&self, keyword: &str) -> AppResult<Vec<String>>;
}

/// One in-flight toggle, identified by the epoch it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowIntent {
    epoch: u64,
    pub follow: bool,
}

#[derive(Debug)]
pub struct FollowControl {
    displayed: bool,
    epoch: u64,
}

impl FollowControl {
    pub fn new(following: bool) -> Self {
        Self {
            displayed: following,
            epoch: 0,
        }
    }

    pub fn displayed(&self) -> bool {
        self.displayed
    }

    /// Flip synchronously; the returned intent settles later.
    pub fn toggle(&mut self) -> FollowIntent {
        self.epoch += 1;
        self.displayed = !self.displayed;
        FollowIntent {
            epoch: self.epoch,
            follow: self.displayed,
        }
    }

    /// The mutation for `intent` succeeded. The displayed state already
    /// reflects the latest click, so a stale confirmation changes nothing.
    pub fn confirm(&mut self, _intent: FollowIntent) {}

    /// The mutation for `intent` failed. Roll back only if no newer toggle
    /// owns the state now.
    pub fn fail(&mut self, intent: FollowIntent) {
        if intent.epoch == self.epoch {
            self.displayed = !intent.follow;
        }
    }
}

/// A designer card's follow button, driving the REST call.
pub struct FollowButton {
    api: Arc<dyn SocialApi>,
    designer: String,
    control: FollowControl,
}

impl FollowButton {
    pub fn new(api: Arc<dyn SocialApi>, designer: impl Into<String>, following: bool) -> Self {
        Self {
            api,
            designer: designer.into(),
            control: FollowControl::new(following),
        }
    }

    pub fn displayed(&self) -> bool {
        self.control.displayed()
    }

    pub fn label(&self) -> &'static str {
        if self.control.displayed() {
            "Following"
        } else {
            "Follow"
        }
    }

    /// Synchronous part of a click: flip the button, hand back the intent.
    pub fn toggle(&mut self) -> FollowIntent {
        self.control.toggle()
    }

    /// Asynchronous part: persist the intent and settle.
    pub async fn resolve(&mut self, intent: FollowIntent) -> AppResult<()> {
        match self.api.set_following(&self.designer, intent.follow).await {
            Ok(()) => {
                self.control.confirm(intent);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(designer = %self.designer, error = %e, "follow toggle failed");
                self.control.fail(intent);
                Err(e)
            }
        }
    }
}
