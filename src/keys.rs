//! Key layout for the record store and blob store. Every key the service
//! reads or writes is built here so the deletion flow and the cleanup
//! handlers cannot drift apart.

use uuid::Uuid;

/// Sentinel partition holding every cleanup queue item.
pub const CLEANUP_PARTITION: &str = "CLEANUP#QUEUE";

/// Sort key of a member's profile record inside their partition.
pub const PROFILE_SORT_KEY: &str = "PROFILE";

/// Renditions stored alongside every uploaded artwork.
const ART_VARIANTS: [&str; 4] = ["original", "display", "preview", "thumb"];

pub fn member_partition(member_id: Uuid) -> String {
    format!("MEMBER#{member_id}")
}

pub fn art_sort_key(art_id: Uuid) -> String {
    format!("ART#{art_id}")
}

/// Prefix under which all of a member's blobs live.
pub fn member_blob_prefix(member_id: Uuid) -> String {
    format!("members/{member_id}/")
}

/// The four blob keys of one artwork: the original plus three renditions.
pub fn art_variant_keys(owner_id: Uuid, art_id: Uuid) -> Vec<String> {
    ART_VARIANTS
        .iter()
        .map(|variant| format!("members/{owner_id}/art/{art_id}/{variant}"))
        .collect()
}
