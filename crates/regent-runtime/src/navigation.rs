//! Fragment-driven navigation.

use regent_core::hash_state::keys as hash_keys;
use regent_core::queues;
use tracing::info;

use crate::context::Context;
use crate::orchestrator::{Dispatch, Layout};

impl Context {
    /// Load the console from the fragment.
    ///
    /// With `Some(fragment)` the fragment is replaced first. The fragment
    /// is re-parsed into the hash state (full replace) and merged into the
    /// global state, keeping unrelated keys, before the content renderer is
    /// laid out into the content region. The content view hosts the
    /// navigator and main regions; when the fragment names a `main` view it
    /// is laid out as well.
    pub fn navigate(&self, fragment: Option<&str>) -> Dispatch {
        let fragment = match fragment {
            Some(f) => f.to_owned(),
            None => self.fragment(),
        };
        let hash = self.reset_fragment(&fragment);
        for (key, value) in hash.iter() {
            self.set_state(key, value);
        }
        if let Some(client) = hash.get(hash_keys::CLIENT) {
            self.set_state(regent_core::state::keys::CLIENT_ID, client);
        }

        let regions = &self.config().regions;
        info!(
            target: "regent.hash",
            renderer = %regions.content_renderer,
            region = %regions.content,
            "navigating"
        );
        let main_view = hash.get(hash_keys::MAIN).map(str::to_owned);
        Layout::new(regions.content_renderer.clone(), regions.content.clone())
            .on_success(move |ctx, content| {
                let regions = &ctx.config().regions;
                let _ = ctx.ensure_region(content, &regions.navigator);
                let _ = ctx.ensure_region(content, &regions.main);
                if let Some(view) = main_view {
                    Layout::new(view, regions.main.clone()).issue(ctx);
                }
            })
            .issue(self)
    }

    /// Show a top-level view: lay it out into the main region, record it
    /// under `main` in the fragment and let the navigator re-measure.
    pub fn show_view(&self, renderer: &str) -> Dispatch {
        let regions = &self.config().regions;
        let dispatch = Layout::new(renderer, regions.main.clone()).issue(self);
        self.publish_hash(hash_keys::MAIN, Some(renderer));
        self.publish(queues::GEOMETRY_CHANGE, regions.navigator.as_str());
        dispatch
    }
}
