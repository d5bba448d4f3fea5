// ── API-to-domain type conversions ──
//
// Bridges raw `tagwatch_api` wire types into canonical domain types.

use tagwatch_api::models::{AccountState, ChipoloRecord, PhoneRecord as ApiPhoneRecord};

use crate::model::{DeviceKind, PairingCandidate, PhoneRecord, Snapshot, TagRecord};

const DEFAULT_TAG_NAME: &str = "Chipolo";
const DEFAULT_PHONE_NAME: &str = "Phone";

impl From<ChipoloRecord> for TagRecord {
    fn from(r: ChipoloRecord) -> Self {
        Self {
            id: r.mac,
            name: r.data.name,
            connected: r.ble_connected,
            battery_low: r.data.battery_low,
            battery_empty: r.data.battery_empty,
        }
    }
}

impl From<ApiPhoneRecord> for PhoneRecord {
    fn from(r: ApiPhoneRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            battery_level: r.battery_level,
        }
    }
}

impl From<AccountState> for Snapshot {
    fn from(state: AccountState) -> Self {
        Snapshot::new(
            state.chipolos.into_iter().map(TagRecord::from).collect(),
            state.devices.into_iter().map(PhoneRecord::from).collect(),
        )
    }
}

/// Everything in a snapshot the user could pair, tags first.
pub fn pairing_candidates(snapshot: &Snapshot) -> Vec<PairingCandidate> {
    let tags = snapshot.tags.iter().map(|t| PairingCandidate {
        id: t.id.clone(),
        name: non_empty(t.name.as_deref()).unwrap_or(DEFAULT_TAG_NAME).to_owned(),
        kind: DeviceKind::Tag,
    });
    let phones = snapshot.phones.iter().map(|p| PairingCandidate {
        id: p.id.clone(),
        name: non_empty(p.name.as_deref())
            .unwrap_or(DEFAULT_PHONE_NAME)
            .to_owned(),
        kind: DeviceKind::Phone,
    });
    tags.chain(phones).collect()
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}
