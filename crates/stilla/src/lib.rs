#![forbid(unsafe_code)]

pub use stilla_c14n as c14n;
pub use stilla_core as core;
pub use stilla_xml as xml;
