// streamchat - A terminal chat client for streaming model endpoints
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use super::local::KeyValueStore;

const PREMIUM_CODE_KEY: &str = "premium_code";
const PREMIUM_VALID_KEY: &str = "premium_code_valid";
const USER_ID_KEY: &str = "user_id";

/// Identity and premium capability. The code is an opaque token: the
/// server decides what it unlocks; the client only remembers the verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    pub access_code: Option<String>,
    pub premium: bool,
}

impl Credentials {
    /// Read persisted credentials, minting and saving a user id on first run.
    pub fn load(store: &mut dyn KeyValueStore) -> Self {
        let user_id = match store.get(USER_ID_KEY).filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                if let Err(e) = store.set(USER_ID_KEY, id.clone()) {
                    tracing::warn!("failed to persist user id: {e:#}");
                }
                id
            }
        };
        let access_code = store.get(PREMIUM_CODE_KEY).filter(|c| !c.is_empty());
        let premium =
            access_code.is_some() && store.get(PREMIUM_VALID_KEY).as_deref() == Some("true");
        Self { user_id, access_code, premium }
    }

    /// Remember a code the server accepted.
    pub fn save_access_code(&mut self, store: &mut dyn KeyValueStore, code: &str) {
        self.access_code = Some(code.to_owned());
        self.premium = true;
        let result = store
            .set(PREMIUM_CODE_KEY, code.to_owned())
            .and_then(|()| store.set(PREMIUM_VALID_KEY, "true".to_owned()));
        if let Err(e) = result {
            tracing::warn!("failed to persist access code: {e:#}");
        }
    }

    /// Forget the code; the user id is kept.
    pub fn clear(&mut self, store: &mut dyn KeyValueStore) {
        self.access_code = None;
        self.premium = false;
        let result = store.remove(PREMIUM_CODE_KEY).and_then(|()| store.remove(PREMIUM_VALID_KEY));
        if let Err(e) = result {
            tracing::warn!("failed to clear access code: {e:#}");
        }
    }
}
