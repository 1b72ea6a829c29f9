use tracing::error;

use keepsake_types::api::SubmitMessageRequest;
use keepsake_types::models::Message;

use crate::feed::{ChangeFeed, Subscription};
use crate::store::MessageStore;

/// The guestbook view: the message list, the two form fields, and the
/// in-flight flag. One instance owns all of it; there is only ever a single
/// logical writer, so none of this is shared or locked.
pub struct GuestbookView<S> {
    store: S,
    /// Most recent known first: `created_at` descending as of the initial
    /// load, then feed arrival order in front of that.
    pub messages: Vec<Message>,
    pub name: String,
    pub text: String,
    pub submitting: bool,
}

impl<S: MessageStore> GuestbookView<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            messages: Vec::new(),
            name: String::new(),
            text: String::new(),
            submitting: false,
        }
    }

    /// Initial load, then the change-feed subscription. The returned handle
    /// is the teardown contract: release it exactly once when the view goes
    /// away. `None` means the feed could not be reached; the view still works,
    /// just without live updates.
    pub async fn mount<F: ChangeFeed>(&mut self, feed: &F) -> Option<Subscription> {
        self.load_messages().await;
        match feed.subscribe().await {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                error!("change feed subscription failed: {}", e);
                None
            }
        }
    }

    /// Fetch the full list, newest first. Success replaces the local list
    /// wholesale; failure leaves it untouched and goes only to the log.
    pub async fn load_messages(&mut self) {
        match self.store.select_all().await {
            Ok(messages) => self.messages = messages,
            Err(e) => error!("loading messages failed: {}", e),
        }
    }

    /// Submit the current form. Empty-after-trim fields make this a no-op.
    /// On success the form clears; the list is not touched here — the new row
    /// comes back through the change feed like everyone else's.
    pub async fn submit(&mut self) {
        if self.name.trim().is_empty() || self.text.trim().is_empty() {
            return;
        }

        self.submitting = true;
        let row = SubmitMessageRequest {
            name: self.name.clone(),
            message: self.text.clone(),
        };
        match self.store.insert(&row).await {
            Ok(()) => {
                self.name.clear();
                self.text.clear();
            }
            // Fields stay put so the user can resubmit without retyping.
            Err(e) => error!("saving message failed: {}", e),
        }
        self.submitting = false;
    }

    /// Apply one feed notification: prepend, whatever its timestamp. The list
    /// is "load order, then arrival order" — never re-sorted, never deduped.
    pub fn apply(&mut self, message: Message) {
        self.messages.insert(0, message);
    }
}
