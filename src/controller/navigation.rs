//! Library paging

use super::AppController;

impl AppController {
    /// Fetches the next library page and merges it, skipping tracks already held.
    pub async fn load_next_library_page(&self) {
        let Some(offset) = self.model.start_library_page().await else {
            tracing::debug!("Library page already loading or library exhausted");
            return;
        };

        match self.backends.library.fetch_library_page(offset, self.page_size).await {
            Ok(page) => {
                let received = page.tracks.len();
                let has_more = page.has_more;
                let added = self.model.append_library_page(page).await;
                tracing::info!(offset, received, added, has_more, "Library page loaded");
                self.model.clamp_selections().await;
            }
            Err(e) => {
                tracing::error!(offset, error = %e, "Loading library page failed");
                self.model.library_page_failed().await;
                self.model.set_error(Self::format_error(&e)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::testing::{harness, track, FakeBackend};

    #[tokio::test]
    async fn pages_until_the_library_is_exhausted() {
        let h = harness(FakeBackend {
            library: (1..=5).map(track).collect(),
            ..Default::default()
        });

        for _ in 0..5 {
            h.controller.load_next_library_page().await;
        }

        let content = h.controller.model.get_content_state().await;
        let ids: Vec<u64> = content.library.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(!content.library_has_more);
        assert!(!content.library_loading);
    }
}
