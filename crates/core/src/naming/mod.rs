//! Service naming: canonical hierarchical names and pluggable resolution
//! backends.
//!
//! A canonical name is a `/`-rooted, slash-normalized path such as
//! `/100/dir/service`: it begins with `/`, contains no `//`, and does not
//! end with `/` (except the single-character root). The helpers here are
//! pure string transforms; resolution itself is delegated to a [`Naming`]
//! backend obtained through the process-wide [`factory`] registry.

pub mod factory;
pub mod memory;

use crate::error::NamingError;

pub use factory::{
    NamingFactory, get_naming_factory, set_naming_factory, teardown_naming_factories,
};
pub use memory::{MemoryNaming, MemoryNamingFactory};

/// A name-resolution backend: binds service names to transport urls and
/// resolves them back.
pub trait Naming: Send + Sync {
    /// Bind `url` to `name`. Fails with [`NamingError::UrlRegistered`] when
    /// the pair is already bound.
    fn register(&self, name: &str, url: &str) -> Result<(), NamingError>;

    /// Drop every binding of `name`. Fails with
    /// [`NamingError::UrlNotBinded`] when nothing is bound.
    fn unregister(&self, name: &str) -> Result<(), NamingError>;

    /// All urls bound to `name`, in registration order.
    fn resolve(&self, name: &str) -> Result<Vec<String>, NamingError>;
}

/// Compose a canonical name from `(app_id, service_dir, service)`.
///
/// Consecutive slashes are collapsed and a trailing slash is stripped, so
/// `service_dir` may come with or without surrounding slashes:
///
/// ```
/// use rpckit::naming::make_name;
///
/// assert_eq!(make_name(100, "/a/", "b"), "/100/a/b");
/// assert_eq!(make_name(100, "a", "b"), "/100/a/b");
/// ```
pub fn make_name(app_id: i64, service_dir: &str, service: &str) -> String {
    let mut raw = format!("/{app_id}");
    if !service_dir.starts_with('/') {
        raw.push('/');
    }
    raw.push_str(service_dir);
    if !service_dir.ends_with('/') {
        raw.push('/');
    }
    raw.push_str(service);

    let mut name = String::with_capacity(raw.len());
    let mut prev_slash = false;
    for c in raw.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        name.push(c);
    }
    if name.len() > 1 && name.ends_with('/') {
        name.pop();
    }
    name
}

/// Rename a canonical name to a dotted-authority transport url:
/// `/100/a/b` with instance `9` becomes `tbuspp://100.a.b/9`.
pub fn make_tbuspp_url(name: &str, inst_id: i64) -> String {
    let mut url = String::from("tbuspp://");
    for c in name.chars().skip(1) {
        url.push(if c == '/' { '.' } else { c });
    }
    url.push('/');
    url.push_str(&inst_id.to_string());
    url
}

/// Normalize a user-supplied name string into canonical form.
///
/// Returns `None` for empty input. A string without any `/` has its dots
/// converted to slashes first; a missing leading `/` is prepended and a
/// single trailing `/` is stripped. Idempotent: formatting an already
/// canonical name returns it unchanged.
pub fn format_name_str(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    let mut out = if name.contains('/') {
        name.to_string()
    } else {
        name.replace('.', "/")
    };
    if !out.starts_with('/') {
        out.insert(0, '/');
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    Some(out)
}
