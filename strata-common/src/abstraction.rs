//! Identificadores de abstração.
//!
//! Cada camada marca as mensagens que emite com o seu id. O id viaja no
//! envelope de rede, e é ele que permite ao BEB reconhecer as entregas que
//! lhe pertencem e a cada instância de EP filtrar o tráfego da sua época.

use crate::value::Timestamp;

pub const APP: &str = "app";
pub const UC: &str = "uc";
pub const EC: &str = "ec";
pub const ELD: &str = "eld";
pub const EPFD: &str = "epfd";
pub const BEB: &str = "beb";
pub const PL: &str = "pl";
pub const HUB: &str = "hub";

const EP_PREFIX: &str = "ep.";

/// Id of the epoch consensus instance running epoch `ets`.
pub fn ep(ets: Timestamp) -> String {
    format!("{EP_PREFIX}{ets}")
}

/// Parses the epoch timestamp back out of an `ep.<ets>` id.
pub fn ep_timestamp(abstraction_id: &str) -> Option<Timestamp> {
    abstraction_id.strip_prefix(EP_PREFIX)?.parse().ok()
}
