use log::{info, warn};

use exam_core::model::{MaterialId, SubmitTrigger};

/// User-facing notifications raised by the controller.
///
/// Calls are synchronous and happen on the controller's own task, so
/// implementations should hand off rather than block.
pub trait SessionNotifier: Send + Sync {
    /// Time ran out. Raised before the automatic submission request is sent.
    fn auto_submit_notice(&self, material_id: &MaterialId);

    /// The server accepted the answers.
    fn submitted(&self, material_id: &MaterialId, trigger: SubmitTrigger) {
        let _ = (material_id, trigger);
    }

    /// A submission failed; `message` is already in plain language.
    fn submission_failed(&self, material_id: &MaterialId, message: &str);
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl SessionNotifier for LogNotifier {
    fn auto_submit_notice(&self, material_id: &MaterialId) {
        info!("time is up for {material_id}; submitting answers automatically");
    }

    fn submitted(&self, material_id: &MaterialId, trigger: SubmitTrigger) {
        info!("answers for {material_id} submitted ({trigger:?})");
    }

    fn submission_failed(&self, material_id: &MaterialId, message: &str) {
        warn!("submission for {material_id} failed: {message}");
    }
}
