//! Owner name lookup for the owner column, sort mode and group mode.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

/// uid → user name. Lookups hit the user database, which can be slow on directory-backed
/// systems, so results are kept for the life of the process.
static OWNER_CACHE: LazyLock<RwLock<HashMap<u32, Option<String>>>> = LazyLock::new(|| RwLock::new(HashMap::new()));

/// Resolves a numeric owner id to a user name. `None` if the id is unknown to the system.
pub fn owner_name(uid: u32) -> Option<String> {
    if let Ok(cache) = OWNER_CACHE.read()
        && let Some(name) = cache.get(&uid)
    {
        return name.clone();
    }

    let name = lookup(uid);
    if name.is_none() {
        log::debug!("Owner: no user for uid {}", uid);
    }
    if let Ok(mut cache) = OWNER_CACHE.write() {
        cache.insert(uid, name.clone());
    }
    name
}

#[cfg(unix)]
fn lookup(uid: u32) -> Option<String> {
    uzers::get_user_by_uid(uid).map(|u| u.name().to_string_lossy().into_owned())
}

#[cfg(not(unix))]
fn lookup(_uid: u32) -> Option<String> {
    None
}

/// Owner text for an item's metadata, falling back to the raw id.
pub fn owner_label(owner: Option<u32>) -> Option<String> {
    owner.map(|uid| owner_name(uid).unwrap_or_else(|| uid.to_string()))
}
