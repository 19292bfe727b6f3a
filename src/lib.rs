//! Whitelist based HTML purifier
//!
//! Takes untrusted markup and returns markup that only holds the elements and attributes a
//! policy allows, properly nested and with every attribute value validated.
//!
//! ```
//! use purifier::{ConfigStore, Purifier};
//!
//! let store = ConfigStore::new().unwrap();
//! store.set_from_str("html.allowed", "p,b,a[href]").unwrap();
//!
//! let purifier = Purifier::from_store(&store).unwrap();
//! assert_eq!(
//!     purifier.purify(r#"<p onclick="evil()">Hi <a href="javascript:x()">there</a></p>"#),
//!     "<p>Hi <a>there</a></p>"
//! );
//! ```

pub use purifier_config::settings::Setting;
pub use purifier_config::storage::{JsonStorageAdapter, MemoryStorageAdapter};
pub use purifier_config::{ConfigStore, StorageAdapter};
pub use purifier_html::diagnostics::{Diagnostic, ErrorCollector, ErrorSink, Report, Severity};
pub use purifier_html::errors::Error;
pub use purifier_html::injector::{Injector, Needed, Step, StreamView};
pub use purifier_html::purifier::{Policy, Purified, Purifier};
pub use purifier_html::settings::Settings;
pub use purifier_shared::location::Location;

/// Purifies the given markup with the default settings
pub fn purify(html: &str) -> Result<String, Error> {
    purifier_html::purify(html)
}
