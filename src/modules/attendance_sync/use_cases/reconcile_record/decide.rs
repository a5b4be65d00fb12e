use crate::modules::attendance_sync::core::fingerprint::Fingerprint;
use crate::modules::attendance_sync::core::identity::IdentityMapping;
use crate::modules::attendance_sync::use_cases::reconcile_record::decision::Decision;

/// Fingerprint equality is the only signal for whether a write is needed.
pub fn decide_reconcile(existing: Option<&IdentityMapping>, fingerprint: &Fingerprint) -> Decision {
    match existing {
        None => Decision::Create,
        Some(mapping) if mapping.fingerprint != *fingerprint => Decision::Update {
            downstream_id: mapping.downstream_id.clone(),
        },
        Some(mapping) => Decision::Skip {
            downstream_id: mapping.downstream_id.clone(),
        },
    }
}
