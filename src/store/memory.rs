//! In-memory RemoteBlob double for store and registry tests.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{RemoteBlob, StoreError, VersionToken};

struct State {
    content: String,
    version: u64,
    unavailable: bool,
}

pub struct MemoryBlob {
    state: Mutex<State>,
}

impl MemoryBlob {
    pub fn new(content: &str) -> Self {
        MemoryBlob {
            state: Mutex::new(State {
                content: content.to_string(),
                version: 0,
                unavailable: false,
            }),
        }
    }

    /// Replace the content out-of-band, simulating a competing writer.
    pub fn overwrite(&self, content: &str) {
        let mut state = self.state.lock().unwrap();
        state.content = content.to_string();
        state.version += 1;
    }

    /// Make every subsequent fetch/store fail with Unavailable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn content(&self) -> String {
        self.state.lock().unwrap().content.clone()
    }
}

#[async_trait]
impl RemoteBlob for MemoryBlob {
    async fn fetch(&self) -> Result<(String, VersionToken), StoreError> {
        let state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(StoreError::Unavailable("memory blob offline".to_string()));
        }
        Ok((state.content.clone(), VersionToken(state.version.to_string())))
    }

    async fn store(&self, content: &str, token: &VersionToken) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(StoreError::Unavailable("memory blob offline".to_string()));
        }
        if token.0 != state.version.to_string() {
            return Err(StoreError::ConcurrentModification);
        }
        state.content = content.to_string();
        state.version += 1;
        Ok(())
    }
}
