//! Read-only access to launcher settings from templates.

use std::collections::HashMap;

/// A string-keyed, read-only view over a namespaced settings tree.
///
/// Keys are dotted paths such as `amqp.exchange.name`. A key that is missing
/// (or holds a value that cannot be read as a string) yields an empty string.
pub trait ConfigProvider {
    /// Gets the value at the given dotted key.
    fn get_string(&self, key: &str) -> String;
}

impl ConfigProvider for config::Config {
    fn get_string(&self, key: &str) -> String {
        config::Config::get_string(self, key).unwrap_or_default()
    }
}

impl ConfigProvider for HashMap<String, String> {
    fn get_string(&self, key: &str) -> String {
        self.get(key).cloned().unwrap_or_default()
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProvider for &T {
    fn get_string(&self, key: &str) -> String {
        (**self).get_string(key)
    }
}
