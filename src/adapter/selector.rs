
use super::result::AdapterError;
use crate::backend::{BackendFactory, BackendKind};

/// Libraries to try, in order, for a requested library.
/// `wxauto` is the floor: requesting it never falls back.
pub fn fallback_order(requested: BackendKind) -> &'static [BackendKind] {
    match requested {
        BackendKind::Extended => &[BackendKind::Extended, BackendKind::Standard],
        BackendKind::Standard => &[BackendKind::Standard],
    }
}

/// Resolve which library to load by probing candidates in fallback order
pub async fn select_backend(
    factory: &dyn BackendFactory,
    requested: BackendKind,
) -> Result<BackendKind, AdapterError> {
    let mut failures = Vec::new();

    for &candidate in fallback_order(requested) {
        tracing::info!("Probing WeChat library {}", candidate);
        let report = factory.probe(candidate).await;

        if report.available {
            if candidate != requested {
                tracing::warn!(
                    "{} unavailable, falling back to {} ({})",
                    requested, candidate, report.details
                );
            } else {
                tracing::info!("{} available: {}", candidate, report.details);
            }
            return Ok(candidate);
        }

        tracing::warn!("{} unavailable: {}", candidate, report.details);
        failures.push(format!("{}: {}", candidate, report.details));
    }

    Err(AdapterError::FatalInit(format!(
        "no usable WeChat library ({})",
        failures.join("; ")
    )))
}
