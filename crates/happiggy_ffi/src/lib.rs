//! FFI surface for the Happiggy-bank mobile host.

pub mod api;
