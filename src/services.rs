use std::fmt::Display;

use crate::models::store::{Action, Store};

pub mod projects;
pub mod shell;
pub mod tasks;
pub mod time_entries;
pub mod timeline;

/// Logs a failed operation and exposes it to the user through the store.
pub(crate) fn report<E: Display>(store: &mut Store, error: &E) {
    log::error!("{error}");
    store.dispatch(Action::SetError(Some(error.to_string())));
}

/// Finds the single item whose name contains `needle`, ignoring case.
/// An exact match wins over partial ones.
pub(crate) fn fuzzy_find<'a, T>(
    items: impl Iterator<Item = &'a T>,
    needle: &str,
    name: impl Fn(&T) -> &str,
) -> Result<&'a T, Vec<String>>
where
    T: 'a,
{
    let needle = needle.trim().to_lowercase();
    let matches: Vec<&T> = items
        .filter(|item| name(*item).to_lowercase().contains(&needle))
        .collect();

    if let Some(exact) = matches
        .iter()
        .find(|item| name(**item).to_lowercase() == needle)
    {
        return Ok(*exact);
    }

    match matches.as_slice() {
        [single] => Ok(*single),
        many => Err(many.iter().map(|item| name(*item).to_string()).collect()),
    }
}
