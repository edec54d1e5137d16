pub mod totango_api;

pub use totango_api::{Method, ScimResource, TotangoApi, TotangoError, TotangoTransport, UpdateMethod};
