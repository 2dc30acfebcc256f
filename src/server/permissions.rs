//! Viewer permissions
//!
//! Computes `files.*` permissions for one viewer. Results are attached to the
//! entry copy being returned and never cached.

use crate::drive::{DriveEntry, EntryPermissions, ShareableLink};

pub struct SetPermissions;

impl SetPermissions {
    /// Return `entry` with permissions computed for `viewer`
    pub fn execute(
        mut entry: DriveEntry,
        viewer: Option<u64>,
        link: Option<&ShareableLink>,
    ) -> DriveEntry {
        entry.permissions = Self::compute(&entry, viewer, link);
        entry
    }

    fn compute(
        entry: &DriveEntry,
        viewer: Option<u64>,
        link: Option<&ShareableLink>,
    ) -> EntryPermissions {
        if let Some(user) = viewer.and_then(|id| entry.user(id)) {
            if user.owns_entry {
                return EntryPermissions::ALL;
            }
            let grants = user.entry_permissions;
            return EntryPermissions {
                create: grants.can_edit(),
                update: grants.can_edit(),
                delete: grants.can_edit(),
                download: grants.can_download(),
            };
        }

        match link {
            Some(link) => EntryPermissions {
                create: link.allow_edit,
                update: link.allow_edit,
                delete: link.allow_edit,
                download: link.allow_download,
            },
            None => EntryPermissions::NONE,
        }
    }
}
