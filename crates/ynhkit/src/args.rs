//! Encoding of `--args` values for `app install` and `app config set`.
//!
//! YunoHost takes app arguments as a single urlencoded query string.

use std::collections::BTreeMap;

/// Encode arguments as `key=value&key=value`, keys in sorted order.
pub fn encode_args(args: &BTreeMap<String, String>) -> String {
    args.iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
