//! Pipeline context -- collaborators shared by every track of a run.

use crate::catalog::CatalogApi;
use crate::config::Config;
use crate::dedup::DedupIndex;
use crate::naming::NamingResolver;
use crate::stream::ContentStreamProvider;
use crate::tagging::TagWriter;
use crate::transcode::Transcoder;
use crate::types::Event;
use indicatif::MultiProgress;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Explicit run context threaded through every pipeline step.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub(crate) struct PipelineContext {
    pub(crate) config: Arc<Config>,
    pub(crate) catalog: Arc<dyn CatalogApi>,
    pub(crate) streams: Arc<dyn ContentStreamProvider>,
    pub(crate) transcoder: Arc<dyn Transcoder>,
    pub(crate) tag_writer: Arc<dyn TagWriter>,
    pub(crate) dedup: Arc<DedupIndex>,
    pub(crate) naming: NamingResolver,
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Terminal area shared by the batch bar and per-track spinners
    pub(crate) display: MultiProgress,
}

impl PipelineContext {
    /// Publish an event; having no subscribers is fine.
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    pub(crate) fn show_spinner(&self) -> bool {
        self.config.output.show_spinner
    }
}
