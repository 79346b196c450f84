//! Trading-mode selection: whether portfolio actions apply to the personal
//! account or to a competition entry. Owns the persisted mode keys.

use crate::store::{
    CredentialStore, KEY_COMPETITION_ID, KEY_COMPETITION_NAME, KEY_TRADING_MODE,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TradingMode {
    Personal,
    Competition { id: u64, name: String },
}

pub struct ModeSelector<S: CredentialStore> {
    store: S,
    mode: TradingMode,
}

impl<S: CredentialStore> ModeSelector<S> {
    /// Restores the persisted selection. A competition marker without a
    /// usable id is partial state and degrades to `Personal`.
    pub fn load(store: S) -> Self {
        let mode = match store.get(KEY_TRADING_MODE).as_deref() {
            Some("competition") => {
                let id = store
                    .get(KEY_COMPETITION_ID)
                    .and_then(|raw| raw.parse::<u64>().ok());
                match id {
                    Some(id) => TradingMode::Competition {
                        id,
                        name: store.get(KEY_COMPETITION_NAME).unwrap_or_default(),
                    },
                    None => TradingMode::Personal,
                }
            }
            _ => TradingMode::Personal,
        };
        Self { store, mode }
    }

    pub fn current(&self) -> &TradingMode {
        &self.mode
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn competition_id(&self) -> Option<u64> {
        match &self.mode {
            TradingMode::Competition { id, .. } => Some(*id),
            TradingMode::Personal => None,
        }
    }

    /// Overwrites the variant and its persisted mirror in one commit.
    pub fn set_competition_mode(&mut self, id: u64, name: &str) {
        self.store.apply(&[
            (KEY_TRADING_MODE, Some("competition")),
            (KEY_COMPETITION_ID, Some(id.to_string().as_str())),
            (KEY_COMPETITION_NAME, Some(name)),
        ]);
        self.mode = TradingMode::Competition {
            id,
            name: name.to_string(),
        };
    }

    /// Selecting personal clears the competition fields; the two variants
    /// are mutually exclusive in storage as well as in memory.
    pub fn set_personal_mode(&mut self) {
        self.store.apply(&[
            (KEY_TRADING_MODE, Some("personal")),
            (KEY_COMPETITION_ID, None),
            (KEY_COMPETITION_NAME, None),
        ]);
        self.mode = TradingMode::Personal;
    }

    /// Leaves competition mode. From `Personal` this is a no-op: entering a
    /// competition requires an explicit selection, so there is nothing to
    /// toggle into.
    pub fn toggle_mode(&mut self) {
        match self.mode {
            TradingMode::Competition { .. } => self.set_personal_mode(),
            TradingMode::Personal => {}
        }
    }
}
