//! User/group privilege drop.
//!
//! Runs once, after the frontend/backend/status sockets are bound and before the first fork —
//! binding privileged ports needs root, but the forked worker pool never should have it.

use nix::unistd::{Group, User, setgid, setuid};
use tracing::info;

use crate::error::{BrokerError, BrokerResult};

/// Drops to `group` then `user`, skipping either that is unset (defaulting to the invoking
/// process's existing effective id).
///
/// Group must be dropped before user: once the uid is no longer root, `setgid` typically loses
/// the permission to change the group id at all.
pub fn drop_privileges(user: Option<&str>, group: Option<&str>) -> BrokerResult<()> {
    if let Some(name) = group {
        let group = Group::from_name(name)
            .map_err(|err| {
                BrokerError::PrivilegeDrop(format!("group lookup for {name:?} failed: {err}"))
            })?
            .ok_or_else(|| BrokerError::PrivilegeDrop(format!("unknown group {name:?}")))?;
        setgid(group.gid).map_err(|err| {
            BrokerError::PrivilegeDrop(format!("setgid({}) failed: {err}", group.gid))
        })?;
        info!(group = name, "dropped to group");
    }

    if let Some(name) = user {
        let user = User::from_name(name)
            .map_err(|err| {
                BrokerError::PrivilegeDrop(format!("user lookup for {name:?} failed: {err}"))
            })?
            .ok_or_else(|| BrokerError::PrivilegeDrop(format!("unknown user {name:?}")))?;
        setuid(user.uid).map_err(|err| {
            BrokerError::PrivilegeDrop(format!("setuid({}) failed: {err}", user.uid))
        })?;
        info!(user = name, "dropped to user");
    }

    Ok(())
}
