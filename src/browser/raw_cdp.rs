//! A generic CDP command wrapper letting subsystems issue arbitrary
//! `domain.method` calls with JSON params when chromiumoxide doesn't (yet)
//! expose a typed command for it. Grounded on `code-browser`'s
//! `RawCdpCommand`: serialize only the params, carry the method name as the
//! `chromiumoxide_types::Method` identifier.

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct RawCdpCommand {
    method: String,
    params: Value,
}

impl RawCdpCommand {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

impl serde::Serialize for RawCdpCommand {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.params.serialize(serializer)
    }
}

impl chromiumoxide_types::Method for RawCdpCommand {
    fn identifier(&self) -> chromiumoxide_types::MethodId {
        self.method.clone().into()
    }
}

impl chromiumoxide_types::Command for RawCdpCommand {
    type Response = Value;
}
