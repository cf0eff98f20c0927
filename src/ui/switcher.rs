use crate::data::store::SourceIdentity;

/// Whether activating `current` after `previous` requires resynchronizing the list
/// and the selection highlight. Re-activating the same store does not, so an open
/// selection and the list scroll position survive it.
pub fn source_changed(previous: Option<SourceIdentity>, current: SourceIdentity) -> bool {
    previous != Some(current)
}
